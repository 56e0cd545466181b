// Language detection - extension lookup table with a keyword-count fallback
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Extensions accepted by the skill analysis endpoints.
pub const ANALYSIS_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".jsx", ".ts", ".tsx", ".html", ".css", ".zip",
];

/// Extensions accepted by the rank and summary endpoints.
pub const EXTENDED_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".jsx", ".ts", ".tsx", ".html", ".css", ".java", ".c", ".cpp", ".go", ".rb",
    ".php", ".zip",
];

/// Every extension with a language mapping, plus archives. Used for local
/// analysis of whole projects.
pub const KNOWN_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".jsx", ".ts", ".tsx", ".html", ".css", ".scss", ".sass", ".less", ".php",
    ".java", ".rb", ".go", ".rs", ".c", ".cpp", ".cs", ".swift", ".kt", ".dart", ".zip",
];

const EXTENSION_MAP: &[(&str, Language)] = &[
    ("py", Language::Python),
    ("js", Language::JavaScript),
    ("jsx", Language::JavaScript),
    ("ts", Language::TypeScript),
    ("tsx", Language::TypeScript),
    ("html", Language::Html),
    ("css", Language::Css),
    ("scss", Language::Scss),
    ("sass", Language::Sass),
    ("less", Language::Less),
    ("php", Language::Php),
    ("java", Language::Java),
    ("rb", Language::Ruby),
    ("go", Language::Go),
    ("rs", Language::Rust),
    ("c", Language::C),
    ("cpp", Language::Cpp),
    ("cs", Language::CSharp),
    ("swift", Language::Swift),
    ("kt", Language::Kotlin),
    ("dart", Language::Dart),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Html,
    Css,
    Scss,
    Sass,
    Less,
    Php,
    Java,
    Ruby,
    Go,
    Rust,
    C,
    Cpp,
    CSharp,
    Swift,
    Kotlin,
    Dart,
    Unknown,
}

impl Language {
    pub const ALL: [Language; 20] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Html,
        Language::Css,
        Language::Scss,
        Language::Sass,
        Language::Less,
        Language::Php,
        Language::Java,
        Language::Ruby,
        Language::Go,
        Language::Rust,
        Language::C,
        Language::Cpp,
        Language::CSharp,
        Language::Swift,
        Language::Kotlin,
        Language::Dart,
        Language::Unknown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Html => "HTML",
            Language::Css => "CSS",
            Language::Scss => "SCSS",
            Language::Sass => "Sass",
            Language::Less => "Less",
            Language::Php => "PHP",
            Language::Java => "Java",
            Language::Ruby => "Ruby",
            Language::Go => "Go",
            Language::Rust => "Rust",
            Language::C => "C",
            Language::Cpp => "C++",
            Language::CSharp => "C#",
            Language::Swift => "Swift",
            Language::Kotlin => "Kotlin",
            Language::Dart => "Dart",
            Language::Unknown => "Unknown",
        }
    }

    /// Look up a language from an extension (`py`, `.py`) or a file name (`app.py`).
    /// Unmapped extensions yield `Language::Unknown`.
    pub fn from_extension(ext_or_name: &str) -> Self {
        let ext = match ext_or_name.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => ext_or_name,
        };

        let ext = ext.to_ascii_lowercase();
        EXTENSION_MAP
            .iter()
            .find(|(mapped, _)| *mapped == ext)
            .map(|(_, language)| *language)
            .unwrap_or(Language::Unknown)
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Language::from_extension)
            .unwrap_or(Language::Unknown)
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Language::ALL
            .iter()
            .copied()
            .find(|lang| lang.label().eq_ignore_ascii_case(label))
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Language::Unknown)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Language {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Language::from_label(&label).unwrap_or(Language::Unknown))
    }
}

/// Lower-cased dotted extension of a file name, if it has one.
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

pub fn is_allowed(filename: &str, allowed: &[&str]) -> bool {
    extension_of(filename).is_some_and(|ext| allowed.contains(&ext.as_str()))
}

lazy_static! {
    // Iteration order is the tie-break order for `guess_from_content`.
    static ref CONTENT_MARKERS: Vec<(Language, Vec<Regex>)> = vec![
        (
            Language::Python,
            vec![
                Regex::new(r"import\s+\w+").unwrap(),
                Regex::new(r"from\s+\w+\s+import").unwrap(),
                Regex::new(r"def\s+\w+\(").unwrap(),
                Regex::new(r"class\s+\w+:").unwrap(),
            ],
        ),
        (
            Language::JavaScript,
            vec![
                Regex::new(r"const\s+\w+\s*=").unwrap(),
                Regex::new(r"let\s+\w+\s*=").unwrap(),
                Regex::new(r"function\s+\w+\(").unwrap(),
                Regex::new(r"import\s+.*\s+from").unwrap(),
            ],
        ),
        (
            Language::TypeScript,
            vec![
                Regex::new(r"interface\s+\w+").unwrap(),
                Regex::new(r"type\s+\w+\s*=").unwrap(),
                Regex::new(r"const\s+\w+:\s*\w+").unwrap(),
            ],
        ),
        (
            Language::Java,
            vec![
                Regex::new(r"public\s+class").unwrap(),
                Regex::new(r"private\s+\w+\s+\w+;").unwrap(),
                Regex::new(r"package\s+\w+").unwrap(),
            ],
        ),
        (
            Language::Html,
            vec![
                Regex::new(r"<!DOCTYPE\s+html>").unwrap(),
                Regex::new(r"<html").unwrap(),
                Regex::new(r"<head").unwrap(),
                Regex::new(r"<body").unwrap(),
            ],
        ),
        (
            Language::Css,
            vec![
                Regex::new(r"\.\w+\s*\{").unwrap(),
                Regex::new(r"#\w+\s*\{").unwrap(),
                Regex::new(r"@media").unwrap(),
            ],
        ),
    ];
}

/// Guess a language from source text by counting syntax markers.
///
/// The language with the most hits wins. Ties go to the language listed
/// first in `CONTENT_MARKERS` (Python, JavaScript, TypeScript, Java, HTML,
/// CSS). Text with no hits at all is `Language::Unknown`.
pub fn guess_from_content(code: &str) -> Language {
    let mut best = Language::Unknown;
    let mut best_hits = 0usize;

    for (language, markers) in CONTENT_MARKERS.iter() {
        let hits: usize = markers.iter().map(|re| re.find_iter(code).count()).sum();
        if hits > best_hits {
            best = *language;
            best_hits = hits;
        }
    }

    best
}
