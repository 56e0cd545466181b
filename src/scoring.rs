// Skill scoring - weighted category counts turned into normalized scores
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::extractor::LanguageLibraries;
use crate::rules::{LearningResource, RuleStore};

/// Points a detected language adds to its category.
pub const LANGUAGE_WEIGHT: u32 = 3;
/// Points a detected library adds to its category.
pub const LIBRARY_WEIGHT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillScore {
    pub name: String,
    /// Always within `[0, 1]`
    pub score: f64,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_resources: Option<Vec<LearningResource>>,
}

impl SkillScore {
    /// Build a score, clamping `score` into `[0, 1]` (NaN becomes 0).
    pub fn new(name: impl Into<String>, score: f64, category: impl Into<String>) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            name: name.into(),
            score,
            category: category.into(),
            description: None,
            learning_resources: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_resources(mut self, resources: Vec<LearningResource>) -> Self {
        self.learning_resources = Some(resources);
        self
    }
}

/// Skill tiers, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Beginner => "Beginner",
            Tier::Intermediate => "Intermediate",
            Tier::Advanced => "Advanced",
            Tier::Expert => "Expert",
        }
    }

    /// Bucket a 0-100 score.
    pub fn from_percent(percent: f64) -> Self {
        if percent < 40.0 {
            Tier::Beginner
        } else if percent < 70.0 {
            Tier::Intermediate
        } else if percent < 90.0 {
            Tier::Advanced
        } else {
            Tier::Expert
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert raw category counts into integer percentages of `total`.
///
/// Each value is `floor(100 * count / total)`, capped at 100. When `total`
/// is zero every category scores 0. Input order is preserved.
pub fn calculate_percentages(counts: &[(String, u32)], total: u32) -> Vec<(String, u32)> {
    counts
        .iter()
        .map(|(category, count)| {
            let percent = if total == 0 {
                0
            } else {
                ((u64::from(*count) * 100) / u64::from(total)).min(100) as u32
            };
            (category.clone(), percent)
        })
        .collect()
}

pub struct Scorer<'a> {
    rules: &'a RuleStore,
}

impl<'a> Scorer<'a> {
    pub fn new(rules: &'a RuleStore) -> Self {
        Self { rules }
    }

    /// Category hit counts (insertion ordered) and their total.
    pub fn tally(&self, stack: &LanguageLibraries) -> (Vec<(String, u32)>, u32) {
        let mut counts: Vec<(String, u32)> = Vec::new();
        let mut total = 0u32;

        let mut bump = |category: &str, weight: u32| {
            match counts.iter_mut().find(|(name, _)| name == category) {
                Some((_, count)) => *count += weight,
                None => counts.push((category.to_string(), weight)),
            }
            total += weight;
        };

        for (language, libraries) in stack.iter() {
            if let Some(category) = self.rules.language_category(*language) {
                bump(category, LANGUAGE_WEIGHT);
            }
            for library in libraries {
                if let Some(category) = self.rules.library_category(library) {
                    bump(category, LIBRARY_WEIGHT);
                }
            }
        }

        (counts, total)
    }

    /// Category scores for a detected stack, highest first. Equal scores keep
    /// the order in which their categories were first counted.
    pub fn score(&self, stack: &LanguageLibraries) -> Vec<SkillScore> {
        let (counts, total) = self.tally(stack);

        let mut skills: Vec<SkillScore> = calculate_percentages(&counts, total)
            .into_iter()
            .map(|(category, percent)| {
                SkillScore::new(category.clone(), f64::from(percent) / 100.0, category.clone())
                    .with_description(self.rules.category_description(&category))
                    .with_resources(self.rules.category_resources(&category))
            })
            .collect();

        skills.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        skills
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDistribution {
    #[serde(rename = "Beginner")]
    pub beginner: u32,
    #[serde(rename = "Intermediate")]
    pub intermediate: u32,
    #[serde(rename = "Advanced")]
    pub advanced: u32,
    #[serde(rename = "Expert")]
    pub expert: u32,
}

pub fn level_distribution(skills: &[SkillScore]) -> LevelDistribution {
    let mut distribution = LevelDistribution::default();
    for skill in skills {
        match Tier::from_percent(skill.score * 100.0) {
            Tier::Beginner => distribution.beginner += 1,
            Tier::Intermediate => distribution.intermediate += 1,
            Tier::Advanced => distribution.advanced += 1,
            Tier::Expert => distribution.expert += 1,
        }
    }
    distribution
}

/// Mean score (0-100, rounded) of the skills in `category`; 0 when there are none.
pub fn category_average(skills: &[SkillScore], category: &str) -> u32 {
    let matching: Vec<f64> = skills
        .iter()
        .filter(|s| s.category.eq_ignore_ascii_case(category))
        .map(|s| s.score)
        .collect();

    if matching.is_empty() {
        return 0;
    }

    let mean = matching.iter().sum::<f64>() / matching.len() as f64;
    (mean * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use std::collections::BTreeSet;

    fn libs(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn counts(items: &[(&str, u32)]) -> Vec<(String, u32)> {
        items.iter().map(|(c, n)| (c.to_string(), *n)).collect()
    }

    #[test]
    fn test_scores_are_clamped() {
        assert_eq!(SkillScore::new("a", 1.7, "Other").score, 1.0);
        assert_eq!(SkillScore::new("a", -0.2, "Other").score, 0.0);
        assert_eq!(SkillScore::new("a", f64::NAN, "Other").score, 0.0);
        assert_eq!(SkillScore::new("a", 0.42, "Other").score, 0.42);
    }

    #[test]
    fn test_percentages_floor() {
        let result = calculate_percentages(&counts(&[("Backend", 4), ("Data Science", 1), ("Other", 1)]), 6);
        assert_eq!(result, counts(&[("Backend", 66), ("Data Science", 16), ("Other", 16)]));
    }

    #[test]
    fn test_zero_total_scores_zero() {
        let result = calculate_percentages(&counts(&[("Backend", 0), ("Frontend", 0)]), 0);
        assert_eq!(result, counts(&[("Backend", 0), ("Frontend", 0)]));
    }

    #[test]
    fn test_percentages_are_scale_invariant() {
        let base = counts(&[("Backend", 4), ("Frontend", 3), ("Database", 2)]);
        let doubled: Vec<(String, u32)> = base.iter().map(|(c, n)| (c.clone(), n * 2)).collect();
        assert_eq!(calculate_percentages(&base, 9), calculate_percentages(&doubled, 18));
    }

    #[test]
    fn test_python_example_scores() {
        let rules = RuleStore::defaults().unwrap();
        let scorer = Scorer::new(&rules);
        let stack: LanguageLibraries =
            [(Language::Python, libs(&["flask", "pandas"]))].into_iter().collect();

        let skills = scorer.score(&stack);
        assert_eq!(skills.len(), 2);
        assert_eq!(skills[0].name, "Backend");
        assert_eq!(skills[0].score, 0.8);
        assert_eq!(skills[1].name, "Data Science");
        assert_eq!(skills[1].score, 0.2);
        assert!(skills[0].learning_resources.as_ref().is_some_and(|r| !r.is_empty()));
    }

    #[test]
    fn test_equal_scores_keep_counting_order() {
        let rules = RuleStore::defaults().unwrap();
        let scorer = Scorer::new(&rules);
        let stack: LanguageLibraries = [
            (Language::Python, BTreeSet::new()),
            (Language::JavaScript, BTreeSet::new()),
        ]
        .into_iter()
        .collect();

        let names: Vec<String> = scorer.score(&stack).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Backend", "Frontend"]);
    }

    #[test]
    fn test_unmapped_stack_is_empty() {
        let rules = RuleStore::defaults().unwrap();
        let scorer = Scorer::new(&rules);
        let stack: LanguageLibraries =
            [(Language::Unknown, libs(&["left-pad"]))].into_iter().collect();

        let (tally, total) = scorer.tally(&stack);
        assert!(tally.is_empty());
        assert_eq!(total, 0);
        assert!(scorer.score(&stack).is_empty());
    }

    #[test]
    fn test_level_distribution_and_averages() {
        let skills = vec![
            SkillScore::new("Frontend", 0.3, "Frontend"),
            SkillScore::new("react", 0.6, "frontend"),
            SkillScore::new("Backend", 0.8, "Backend"),
            SkillScore::new("Data", 0.95, "Data Science"),
        ];

        let distribution = level_distribution(&skills);
        assert_eq!(
            distribution,
            LevelDistribution {
                beginner: 1,
                intermediate: 1,
                advanced: 1,
                expert: 1,
            }
        );

        assert_eq!(category_average(&skills, "Frontend"), 45);
        assert_eq!(category_average(&skills, "Backend"), 80);
        assert_eq!(category_average(&skills, "Mobile"), 0);
    }
}
