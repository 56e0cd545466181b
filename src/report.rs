// Response assembly - combines detected stack and scores into one result
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::extractor::LanguageLibraries;
use crate::ingest::LanguageSources;
use crate::language::Language;
use crate::rules::RuleStore;
use crate::scoring::{Scorer, SkillScore};

/// Number of skill names returned as recommendations.
pub const RECOMMENDATION_COUNT: usize = 3;

pub const NO_SOURCES_MESSAGE: &str = "No supported source files found";

/// When `error` is set, `libraries`, `skills` and `recommendations` are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub filename: String,
    #[serde(rename = "language")]
    pub primary_language: Language,
    pub libraries: BTreeSet<String>,
    /// Highest score first
    pub skills: Vec<SkillScore>,
    pub recommendations: Vec<String>,
    pub error: Option<String>,
    /// RFC 3339 / ISO-8601, UTC
    pub timestamp: String,
}

impl AnalysisResult {
    pub fn assemble(filename: impl Into<String>, stack: &LanguageLibraries, rules: &RuleStore) -> Self {
        let skills = Scorer::new(rules).score(stack);
        let recommendations = skills
            .iter()
            .take(RECOMMENDATION_COUNT)
            .map(|s| s.name.clone())
            .collect();

        Self {
            filename: filename.into(),
            primary_language: stack.primary_language(),
            libraries: stack.all_libraries(),
            skills,
            recommendations,
            error: None,
            timestamp: now(),
        }
    }

    pub fn failed(filename: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            primary_language: Language::Unknown,
            libraries: BTreeSet::new(),
            skills: Vec::new(),
            recommendations: Vec::new(),
            error: Some(error.into()),
            timestamp: now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Full pipeline over ingested sources. Nothing to analyze is reported in
/// the result's `error` field rather than as a failure.
pub fn analyze_sources(filename: &str, sources: &LanguageSources, rules: &RuleStore) -> AnalysisResult {
    if sources.is_empty() {
        return AnalysisResult::failed(filename, NO_SOURCES_MESSAGE);
    }
    AnalysisResult::assemble(filename, &sources.libraries(), rules)
}

fn now() -> String {
    Utc::now().to_rfc3339()
}
