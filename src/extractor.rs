// Library extraction - regex matching over import statements, plus skill signal confidences
use crate::language::{guess_from_content, Language};
use crate::patterns::ImportSyntax;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Token added when source text pulls in the UI framework.
pub const UI_FRAMEWORK_MARKER: &str = "react";

const UI_FRAMEWORK_HINTS: &[&str] = &["import React", "from 'react'", "from \"react\""];

/// Extract the set of non-standard library names imported by `content`.
///
/// Detection is regex based: text inside comments or string literals that
/// looks like an import is reported too.
pub fn extract_libraries(content: &str, language: Language) -> BTreeSet<String> {
    let mut libraries = BTreeSet::new();

    let Some(syntax) = ImportSyntax::for_language(language) else {
        return libraries;
    };
    let table = syntax.table();

    for pattern in &table.patterns {
        for caps in pattern.captures_iter(content) {
            if let Some(name) = caps.get(1) {
                let name = name.as_str().trim();
                if !name.is_empty() && !table.is_excluded(name) {
                    libraries.insert(name.to_string());
                }
            }
        }
    }

    if syntax.has_ui_markup() && UI_FRAMEWORK_HINTS.iter().any(|hint| content.contains(hint)) {
        libraries.insert(UI_FRAMEWORK_MARKER.to_string());
    }

    debug!("{} libraries found in {} source", libraries.len(), language);
    libraries
}

/// Libraries per language, in the order languages were first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageLibraries {
    entries: Vec<(Language, BTreeSet<String>)>,
}

impl LanguageLibraries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a file of `language`; its libraries are unioned into any earlier entry.
    pub fn add(&mut self, language: Language, libraries: BTreeSet<String>) {
        match self.entries.iter_mut().find(|(lang, _)| *lang == language) {
            Some((_, existing)) => existing.extend(libraries),
            None => self.entries.push((language, libraries)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Language, BTreeSet<String>)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First language encountered, or `Unknown` for an empty stack.
    pub fn primary_language(&self) -> Language {
        self.entries
            .first()
            .map(|(lang, _)| *lang)
            .unwrap_or(Language::Unknown)
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.entries.iter().map(|(lang, _)| *lang)
    }

    pub fn all_libraries(&self) -> BTreeSet<String> {
        self.entries
            .iter()
            .flat_map(|(_, libs)| libs.iter().cloned())
            .collect()
    }
}

impl FromIterator<(Language, BTreeSet<String>)> for LanguageLibraries {
    fn from_iter<I: IntoIterator<Item = (Language, BTreeSet<String>)>>(iter: I) -> Self {
        let mut stack = LanguageLibraries::new();
        for (language, libraries) in iter {
            stack.add(language, libraries);
        }
        stack
    }
}

// Skill signals: a coarser pass that scores how strongly a file exhibits a
// framework, rather than whether it imports it.

const MATCH_INCREMENT: f64 = 0.05;
const PATTERN_CAP: f64 = 0.3;
const LANGUAGE_CONFIDENCE: f64 = 0.8;

type Signature = (&'static str, Vec<Regex>);

fn signature(name: &'static str, patterns: &[&str]) -> Signature {
    (
        name,
        patterns
            .iter()
            .map(|p| Regex::new(p).expect("signature pattern must compile"))
            .collect(),
    )
}

lazy_static! {
    static ref PYTHON_SIGNATURES: Vec<Signature> = vec![
        signature("pandas", &[r"import\s+pandas", r"from\s+pandas", r"DataFrame"]),
        signature("numpy", &[r"import\s+numpy", r"from\s+numpy", r"np\."]),
        signature("flask", &[r"from\s+flask", r"Flask\(", r"app\.route"]),
        signature("django", &[r"from\s+django", r"urls\.py", r"models\.Model"]),
        signature("fastapi", &[r"from\s+fastapi", r"FastAPI\(", r"@app\."]),
        signature("tensorflow", &[r"import\s+tensorflow", r"from\s+tensorflow", r"tf\."]),
        signature("pytorch", &[r"import\s+torch", r"from\s+torch", r"nn\.Module"]),
        signature("scikit-learn", &[r"from\s+sklearn", r"import\s+sklearn"]),
        signature("matplotlib", &[r"import\s+matplotlib", r"from\s+matplotlib", r"plt\."]),
        signature("seaborn", &[r"import\s+seaborn", r"from\s+seaborn", r"sns\."]),
    ];
    static ref JAVASCRIPT_SIGNATURES: Vec<Signature> = vec![
        signature(
            "react",
            &[
                r#"import\s+.*\s+from\s+['"]react['"]"#,
                r"React\.",
                r"useState",
                r"useEffect",
                r"<\w+\s+",
                r"</\w+>",
            ],
        ),
        signature("vue", &[r#"import\s+.*\s+from\s+['"]vue['"]"#, r"createApp", r"Vue\."]),
        signature(
            "angular",
            &[r#"import\s+.*\s+from\s+['"]@angular"#, r"NgModule", r"Component"],
        ),
        signature(
            "express",
            &[
                r#"import\s+.*\s+from\s+['"]express['"]"#,
                r#"require\(['"]express['"]\)"#,
                r"app\.get",
                r"app\.post",
            ],
        ),
        signature(
            "node",
            &[r#"import\s+.*\s+from\s+['"]node:"#, r#"require\(['"]node:"#, r"process\.env"],
        ),
        signature(
            "next",
            &[r#"import\s+.*\s+from\s+['"]next"#, r"NextPage", r"getServerSideProps"],
        ),
        signature(
            "mongodb",
            &[r#"import\s+.*\s+from\s+['"]mongodb['"]"#, r"MongoClient", r"ObjectId"],
        ),
        signature(
            "mongoose",
            &[r#"import\s+.*\s+from\s+['"]mongoose['"]"#, r"Schema", r"model\("],
        ),
        signature(
            "redux",
            &[r#"import\s+.*\s+from\s+['"]redux['"]"#, r"createStore", r"useSelector"],
        ),
        signature("axios", &[r#"import\s+.*\s+from\s+['"]axios['"]"#, r"axios\."]),
    ];
    static ref JAVA_SIGNATURES: Vec<Signature> = vec![
        signature(
            "spring",
            &[r"import\s+org\.springframework", r"@Controller", r"@RestController", r"@Service"],
        ),
        signature("hibernate", &[r"import\s+org\.hibernate", r"@Entity", r"SessionFactory"]),
        signature("junit", &[r"import\s+org\.junit", r"@Test", r"Assert\."]),
    ];
    static ref HTML_SIGNATURES: Vec<Signature> = vec![
        signature(
            "bootstrap",
            &[r#"class="[^"]*btn[^"]*""#, r#"class="[^"]*container[^"]*""#, r"bootstrap\."],
        ),
        signature(
            "tailwind",
            &[r#"class="[^"]*text-\w+[^"]*""#, r#"class="[^"]*bg-\w+[^"]*""#, r"tailwind"],
        ),
    ];
}

fn signatures_for(language: Language) -> &'static [Signature] {
    match language {
        Language::Python => &PYTHON_SIGNATURES,
        Language::JavaScript | Language::TypeScript => &JAVASCRIPT_SIGNATURES,
        Language::Java => &JAVA_SIGNATURES,
        Language::Html => &HTML_SIGNATURES,
        _ => &[],
    }
}

/// Languages the signal pass recognizes from a file extension.
fn signal_language(filename: &str) -> Option<Language> {
    match Language::from_extension(filename) {
        lang @ (Language::Python
        | Language::JavaScript
        | Language::TypeScript
        | Language::Java
        | Language::Html
        | Language::Css) => Some(lang),
        _ => None,
    }
}

/// Confidence per skill for one file.
///
/// Every signature pattern contributes `0.05` per match, capped at `0.3` per
/// pattern; a skill's total is capped at `1.0`. The detected language is
/// reported as a skill with a fixed confidence of `0.8`. Without a usable
/// extension the language is guessed from the content.
pub fn extract_signals(code: &str, filename: Option<&str>) -> (Language, BTreeMap<String, f64>) {
    let language = filename
        .and_then(signal_language)
        .unwrap_or_else(|| guess_from_content(code));

    let mut skills = BTreeMap::new();

    for (skill, patterns) in signatures_for(language) {
        let confidence: f64 = patterns
            .iter()
            .map(|re| re.find_iter(code).count())
            .filter(|&hits| hits > 0)
            .map(|hits| (hits as f64 * MATCH_INCREMENT).min(PATTERN_CAP))
            .sum();

        if confidence > 0.0 {
            skills.insert(skill.to_string(), confidence.min(1.0));
        }
    }

    if language.is_known() {
        skills.insert(language.label().to_lowercase(), LANGUAGE_CONFIDENCE);
    }

    (language, skills)
}

/// Merge per-file confidences by keeping the highest value seen for each
/// skill. Many small files mentioning a framework do not add up to more
/// confidence than the single strongest file.
pub fn merge_signals(into: &mut BTreeMap<String, f64>, other: BTreeMap<String, f64>) {
    for (skill, confidence) in other {
        into.entry(skill)
            .and_modify(|current| *current = current.max(confidence))
            .or_insert(confidence);
    }
}
