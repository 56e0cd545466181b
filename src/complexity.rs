// Complexity and diversity estimation - feeds the developer rank
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::language::Language;
use crate::scoring::Tier;

/// Keywords that mark a line as a control structure in the line heuristic.
const CONTROL_MARKERS: &[&str] = &[
    "if ", "else ", "for ", "while ", "switch", "case ", "try ", "catch ",
];
const HEURISTIC_SCALE: f64 = 10.0;

lazy_static! {
    static ref PY_DEF: Regex = Regex::new(r"^(?:async\s+)?def\s+\w+").unwrap();
    static ref PY_DECISION: Regex =
        Regex::new(r"\b(?:if|elif|for|while|except|with|assert|and|or|lambda)\b").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperRank {
    pub complexity_score: f64,
    pub diversity_score: u32,
    pub rank: Tier,
}

/// Cyclomatic complexity of every function and method in a Python source.
///
/// Blocks are found from `def` lines and indentation. Each block starts at 1
/// and gains one point per decision keyword on its own lines; lines of a
/// nested function count toward the nested function only. Lines inside
/// triple-quoted strings are ignored.
pub fn python_block_complexities(code: &str) -> Vec<u32> {
    let mut blocks: Vec<u32> = Vec::new();
    // (indent of the def line, index into `blocks`)
    let mut open: Vec<(usize, usize)> = Vec::new();
    let mut in_string = false;

    for line in code.lines() {
        let trimmed = line.trim_start();
        let quotes = trimmed.matches("\"\"\"").count() + trimmed.matches("'''").count();

        if in_string {
            if quotes % 2 == 1 {
                in_string = false;
            }
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indent = line.len() - trimmed.len();
        while open.last().is_some_and(|(def_indent, _)| indent <= *def_indent) {
            open.pop();
        }

        if PY_DEF.is_match(trimmed) {
            blocks.push(1);
            open.push((indent, blocks.len() - 1));
        } else if let Some((_, idx)) = open.last() {
            blocks[*idx] += PY_DECISION.find_iter(trimmed).count() as u32;
        }

        if quotes % 2 == 1 {
            in_string = true;
        }
    }

    blocks
}

/// Line heuristic for languages without structural analysis:
/// `control-structure lines / total lines * 10`.
pub fn estimate_line_complexity(code: &str) -> f64 {
    let lines: Vec<&str> = code.split('\n').collect();
    let control = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| CONTROL_MARKERS.iter().any(|kw| l.contains(kw)))
        .count();

    control as f64 / lines.len() as f64 * HEURISTIC_SCALE
}

/// Average complexity over all analyzed blocks, rounded to one decimal.
///
/// Python contributes one block per function or method (files without any
/// contribute none). Every other file counts as a single block scored by
/// `estimate_line_complexity`. No blocks at all yields 0.0.
pub fn average_complexity<'a>(files: impl IntoIterator<Item = (Language, &'a str)>) -> f64 {
    let mut total = 0.0;
    let mut blocks = 0usize;

    for (language, content) in files {
        if language == Language::Python {
            for complexity in python_block_complexities(content) {
                total += f64::from(complexity);
                blocks += 1;
            }
        } else {
            total += estimate_line_complexity(content);
            blocks += 1;
        }
    }

    let average = total / blocks.max(1) as f64;
    (average * 10.0).round() / 10.0
}

/// Distinct known languages plus distinct (case-insensitive) libraries.
pub fn tech_diversity(
    languages: impl IntoIterator<Item = Language>,
    libraries: &BTreeSet<String>,
) -> u32 {
    let languages: HashSet<Language> = languages.into_iter().filter(|l| l.is_known()).collect();
    let libraries: HashSet<String> = libraries.iter().map(|l| l.to_lowercase()).collect();
    (languages.len() + libraries.len()) as u32
}

/// Each tier has a complexity ceiling and a diversity ceiling; a profile
/// lands in the first tier where it is under both. Anything past the
/// Advanced ceilings is Expert.
pub fn developer_rank(complexity_score: f64, diversity_score: u32) -> Tier {
    if complexity_score < 2.0 && diversity_score < 3 {
        Tier::Beginner
    } else if complexity_score < 3.0 && diversity_score < 5 {
        Tier::Intermediate
    } else if complexity_score < 4.0 && diversity_score < 8 {
        Tier::Advanced
    } else {
        Tier::Expert
    }
}

pub fn rank_profile<'a>(
    files: impl IntoIterator<Item = (Language, &'a str)>,
    libraries: &BTreeSet<String>,
    languages: impl IntoIterator<Item = Language>,
) -> DeveloperRank {
    let complexity_score = average_complexity(files);
    let diversity_score = tech_diversity(languages, libraries);
    DeveloperRank {
        complexity_score,
        diversity_score,
        rank: developer_rank(complexity_score, diversity_score),
    }
}
