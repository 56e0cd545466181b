// Rule store - skill categories, language/library mappings and learning resources
//
// Both tables live as JSON files in the data directory. Missing files are
// bootstrapped from the defaults compiled into the binary; after loading the
// store is read-only and shared by reference.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::language::Language;

pub const SKILL_RULES_FILE: &str = "skill_rules.json";
pub const RESOURCES_FILE: &str = "resources.json";

const DEFAULT_SKILL_RULES: &str = include_str!("../data/skill_rules.json");
const DEFAULT_RESOURCES: &str = include_str!("../data/resources.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningResource {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl LearningResource {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub description: String,
    #[serde(default)]
    pub libraries: Vec<String>,
    #[serde(default)]
    pub learning_resources: Vec<LearningResource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleTable {
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryRule>,
    /// Language label -> category
    #[serde(default)]
    pub languages: HashMap<String, String>,
    /// Library name -> category
    #[serde(default)]
    pub libraries: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillInfo {
    pub name: String,
    pub category: String,
    pub description: String,
    #[serde(default)]
    pub resources: Vec<LearningResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSummary {
    pub name: String,
    pub category: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillBrief {
    pub name: String,
    pub description: String,
}

pub struct RuleStore {
    rules: RuleTable,
    /// Keyed by lower-cased skill name
    catalog: BTreeMap<String, SkillInfo>,
}

impl RuleStore {
    /// Load both rule files from `data_dir`, writing the defaults for any that are missing.
    pub fn load_or_bootstrap(data_dir: &Path) -> Result<Self> {
        let rules_path = data_dir.join(SKILL_RULES_FILE);
        let resources_path = data_dir.join(RESOURCES_FILE);

        bootstrap_file(&rules_path, DEFAULT_SKILL_RULES)?;
        bootstrap_file(&resources_path, DEFAULT_RESOURCES)?;

        let rules: RuleTable = read_json(&rules_path)?;
        let catalog: BTreeMap<String, SkillInfo> = read_json(&resources_path)?;

        info!(
            "Loaded {} categories, {} library rules and {} resource entries from {}",
            rules.categories.len(),
            rules.libraries.len(),
            catalog.len(),
            data_dir.display()
        );

        Ok(Self::from_parts(rules, catalog))
    }

    /// Store built from the defaults compiled into the binary.
    pub fn defaults() -> Result<Self> {
        let rules: RuleTable =
            serde_json::from_str(DEFAULT_SKILL_RULES).context("Default skill rules are invalid")?;
        let catalog: BTreeMap<String, SkillInfo> =
            serde_json::from_str(DEFAULT_RESOURCES).context("Default resources are invalid")?;
        Ok(Self::from_parts(rules, catalog))
    }

    pub fn from_parts(rules: RuleTable, catalog: BTreeMap<String, SkillInfo>) -> Self {
        let catalog = catalog
            .into_iter()
            .map(|(key, info)| (key.to_lowercase(), info))
            .collect();
        Self { rules, catalog }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn language_category(&self, language: Language) -> Option<&str> {
        self.rules
            .languages
            .get(language.label())
            .map(String::as_str)
    }

    pub fn library_category(&self, library: &str) -> Option<&str> {
        self.rules
            .libraries
            .get(library)
            .or_else(|| self.rules.libraries.get(&library.to_lowercase()))
            .map(String::as_str)
    }

    pub fn category_description(&self, category: &str) -> String {
        self.rules
            .categories
            .get(category)
            .map(|c| c.description.clone())
            .unwrap_or_else(|| format!("{} skills", category))
    }

    pub fn category_resources(&self, category: &str) -> Vec<LearningResource> {
        match self.rules.categories.get(category) {
            Some(rule) if !rule.learning_resources.is_empty() => rule.learning_resources.clone(),
            _ => vec![LearningResource::new(
                format!("{} Tutorial", category),
                format!(
                    "https://www.youtube.com/results?search_query={}+programming+tutorial",
                    query_term(category)
                ),
            )],
        }
    }

    /// Catalog entry for a skill, looked up case-insensitively. Unknown
    /// skills get a synthesized entry with a search link instead of an error.
    pub fn skill_info(&self, skill_name: &str) -> SkillInfo {
        let key = skill_name.trim().to_lowercase();
        if let Some(info) = self.catalog.get(&key) {
            return info.clone();
        }

        debug!("No catalog entry for '{}', synthesizing one", key);
        let title = title_case(&key);
        SkillInfo {
            name: title.clone(),
            category: self.guess_category(&key),
            description: format!("{} programming skill", title),
            resources: vec![LearningResource {
                title: format!("Learn {}", title),
                url: format!(
                    "https://www.google.com/search?q=learn+{}+programming",
                    query_term(&key)
                ),
                description: Some(format!("Search for {} tutorials and courses", title)),
            }],
        }
    }

    /// Category for a skill name that has no catalog entry.
    pub fn guess_category(&self, skill_name: &str) -> String {
        let key = skill_name.to_lowercase();
        if let Some(category) = self.library_category(&key) {
            return category.to_string();
        }
        self.rules
            .languages
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(&key))
            .map(|(_, category)| category.clone())
            .unwrap_or_else(|| "Other".to_string())
    }

    /// Every catalog skill, sorted by display name.
    pub fn skills(&self) -> Vec<SkillSummary> {
        let mut skills: Vec<SkillSummary> = self
            .catalog
            .values()
            .map(|info| SkillSummary {
                name: info.name.clone(),
                category: info.category.clone(),
                description: info.description.clone(),
            })
            .collect();
        skills.sort_by(|a, b| a.name.cmp(&b.name));
        skills
    }

    /// Catalog skills grouped by category, each group sorted by name.
    pub fn skills_by_category(&self) -> BTreeMap<String, Vec<SkillBrief>> {
        let mut grouped: BTreeMap<String, Vec<SkillBrief>> = BTreeMap::new();
        for skill in self.skills() {
            grouped.entry(skill.category).or_default().push(SkillBrief {
                name: skill.name,
                description: skill.description,
            });
        }
        grouped
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write `default_content` to `path` unless the file already exists.
/// The write goes through a temporary sibling file and a rename.
fn bootstrap_file(path: &Path, default_content: &str) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(default_content.as_bytes())?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Created default {}", path.display());
    Ok(true)
}

/// Write the default rule files into `data_dir`. Returns the paths created.
pub fn init_rule_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for (name, content) in [
        (SKILL_RULES_FILE, DEFAULT_SKILL_RULES),
        (RESOURCES_FILE, DEFAULT_RESOURCES),
    ] {
        let path = data_dir.join(name);
        if bootstrap_file(&path, content)? {
            created.push(path);
        }
    }
    Ok(created)
}

fn query_term(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("+")
}

/// Upper-case the first letter of every alphabetic run: `scikit-learn` -> `Scikit-Learn`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_parse() {
        let store = RuleStore::defaults().unwrap();
        assert!(store.rules().categories.contains_key("Backend"));
        assert!(store.rules().categories.contains_key("Other"));
        assert_eq!(store.language_category(Language::Python), Some("Backend"));
        assert_eq!(store.library_category("pandas"), Some("Data Science"));
        assert_eq!(store.library_category("Flask"), Some("Backend"));
        assert_eq!(store.library_category("left-pad"), None);
    }

    #[test]
    fn test_bootstrap_writes_missing_files_once() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("nested").join("data");

        let store = RuleStore::load_or_bootstrap(&data_dir).unwrap();
        assert!(data_dir.join(SKILL_RULES_FILE).exists());
        assert!(data_dir.join(RESOURCES_FILE).exists());
        assert_eq!(store.library_category("react"), Some("Frontend"));

        // Existing files are left alone.
        assert!(init_rule_files(&data_dir).unwrap().is_empty());
    }

    #[test]
    fn test_existing_rules_are_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let custom = r#"{"categories": {}, "languages": {"Python": "Data Science"}, "libraries": {}}"#;
        fs::write(dir.path().join(SKILL_RULES_FILE), custom).unwrap();

        let store = RuleStore::load_or_bootstrap(dir.path()).unwrap();
        assert_eq!(store.language_category(Language::Python), Some("Data Science"));
        assert_eq!(fs::read_to_string(dir.path().join(SKILL_RULES_FILE)).unwrap(), custom);
    }

    #[test]
    fn test_corrupt_rules_fail_to_load() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SKILL_RULES_FILE), "{ not json").unwrap();
        assert!(RuleStore::load_or_bootstrap(dir.path()).is_err());
    }

    #[test]
    fn test_skill_info_is_case_insensitive() {
        let store = RuleStore::defaults().unwrap();
        let info = store.skill_info("ReAcT");
        assert_eq!(info.name, "React");
        assert_eq!(info.category, "Frontend");
        assert!(!info.resources.is_empty());
    }

    #[test]
    fn test_unknown_skill_gets_fallback() {
        let store = RuleStore::defaults().unwrap();

        let info = store.skill_info("Elixir");
        assert_eq!(info.name, "Elixir");
        assert_eq!(info.category, "Other");
        assert_eq!(info.resources.len(), 1);
        assert_eq!(
            info.resources[0].url,
            "https://www.google.com/search?q=learn+elixir+programming"
        );

        // Known library without a catalog entry takes its rule category.
        assert_eq!(store.skill_info("numpy").category, "Data Science");
        assert_eq!(store.skill_info("kotlin").category, "Mobile");
    }

    #[test]
    fn test_category_resources_fallback() {
        let store = RuleStore::defaults().unwrap();
        assert_eq!(store.category_resources("Backend").len(), 3);

        let fallback = store.category_resources("Game Dev");
        assert_eq!(fallback.len(), 1);
        assert!(fallback[0].url.contains("Game+Dev+programming+tutorial"));
        assert_eq!(store.category_description("Game Dev"), "Game Dev skills");
    }

    #[test]
    fn test_skill_listings_are_sorted() {
        let store = RuleStore::defaults().unwrap();
        let names: Vec<String> = store.skills().into_iter().map(|s| s.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        let grouped = store.skills_by_category();
        let backend: Vec<&str> = grouped["Backend"].iter().map(|s| s.name.as_str()).collect();
        assert_eq!(backend, vec!["Django", "Express", "FastAPI", "Flask", "Python"]);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("scikit-learn"), "Scikit-Learn");
        assert_eq!(title_case("machine learning"), "Machine Learning");
        assert_eq!(title_case("c++"), "C++");
    }
}
