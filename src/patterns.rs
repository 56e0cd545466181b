// Import pattern tables - per-language regexes that capture library names
use crate::language::Language;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// Ordered import regexes for one language family. Capture group 1 of every
/// pattern is the candidate library name.
pub struct PatternSet {
    pub patterns: Vec<Regex>,
    pub excluded: HashSet<&'static str>,
}

impl PatternSet {
    fn new(patterns: &[&str], excluded: &[&'static str]) -> Self {
        Self {
            patterns: patterns
                .iter()
                .map(|p| Regex::new(p).expect("import pattern must compile"))
                .collect(),
            excluded: excluded.iter().copied().collect(),
        }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.contains(name)
    }
}

/// Import grammars with a pattern table. Languages without one yield no libraries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSyntax {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Go,
    Ruby,
    Rust,
}

impl ImportSyntax {
    pub fn for_language(language: Language) -> Option<Self> {
        match language {
            Language::Python => Some(ImportSyntax::Python),
            Language::JavaScript => Some(ImportSyntax::JavaScript),
            Language::TypeScript => Some(ImportSyntax::TypeScript),
            Language::Java => Some(ImportSyntax::Java),
            Language::Go => Some(ImportSyntax::Go),
            Language::Ruby => Some(ImportSyntax::Ruby),
            Language::Rust => Some(ImportSyntax::Rust),
            Language::Html
            | Language::Css
            | Language::Scss
            | Language::Sass
            | Language::Less
            | Language::Php
            | Language::C
            | Language::Cpp
            | Language::CSharp
            | Language::Swift
            | Language::Kotlin
            | Language::Dart
            | Language::Unknown => None,
        }
    }

    pub fn table(&self) -> &'static PatternSet {
        match self {
            ImportSyntax::Python => &PYTHON,
            ImportSyntax::JavaScript => &JAVASCRIPT,
            ImportSyntax::TypeScript => &TYPESCRIPT,
            ImportSyntax::Java => &JAVA,
            ImportSyntax::Go => &GO,
            ImportSyntax::Ruby => &RUBY,
            ImportSyntax::Rust => &RUST,
        }
    }

    /// Languages whose sources may pull in a UI framework through markup.
    pub fn has_ui_markup(&self) -> bool {
        matches!(self, ImportSyntax::JavaScript | ImportSyntax::TypeScript)
    }
}

const NODE_BUILTINS: &[&str] = &[
    "path",
    "fs",
    "util",
    "http",
    "https",
    "url",
    "querystring",
    "crypto",
    "os",
    "events",
    "stream",
    "child_process",
];

lazy_static! {
    static ref PYTHON: PatternSet = PatternSet::new(
        &[
            r"(?m)^\s*import\s+(\w+)",
            r"(?m)^\s*from\s+(\w+)(?:\.\w+)*\s+import",
            r"(?m)^\s*import\s+(\w+)\s+as\s+\w+",
        ],
        &[
            "os",
            "sys",
            "re",
            "json",
            "time",
            "datetime",
            "math",
            "random",
            "typing",
            "pathlib",
            "collections",
            "itertools",
            "functools",
            "subprocess",
            "logging",
            "unittest",
            "asyncio",
            "abc",
            "dataclasses",
            "enum",
            "io",
            "shutil",
            "tempfile",
            "hashlib",
            "copy",
            "csv",
            "glob",
            "argparse",
            "uuid",
            "base64",
            "string",
            "__future__",
        ],
    );
    static ref JAVASCRIPT: PatternSet = PatternSet::new(
        &[
            r#"import\s+.*\s+from\s+['"]([^.][^'"/]+)['"]"#,
            r#"import\s+['"]([^.][^'"/]+)['"]"#,
            r#"require\(['"]([^.][^'"/]+)['"]\)"#,
        ],
        NODE_BUILTINS,
    );
    static ref TYPESCRIPT: PatternSet = PatternSet::new(
        &[
            r#"import\s+.*\s+from\s+['"]([^.][^'"/]+)['"]"#,
            r#"import\s+['"]([^.][^'"/]+)['"]"#,
        ],
        NODE_BUILTINS,
    );
    static ref JAVA: PatternSet = PatternSet::new(
        &[r"(?m)^\s*import\s+(?:static\s+)?(?:org|com|io|net)\.(\w+)"],
        &["oracle", "sun"],
    );
    static ref GO: PatternSet = PatternSet::new(
        &[r#""(?:github\.com|gitlab\.com|bitbucket\.org)/[\w.-]+/([\w.-]+)[^"]*""#],
        &[],
    );
    static ref RUBY: PatternSet = PatternSet::new(
        &[r#"(?m)^\s*require\s+['"]([\w-]+)['"]"#],
        &["json", "set", "date", "time", "yaml", "fileutils", "securerandom", "net", "open3"],
    );
    static ref RUST: PatternSet = PatternSet::new(
        &[r"(?m)^\s*(?:pub\s+)?use\s+(\w+)::", r"(?m)^\s*extern\s+crate\s+(\w+)"],
        &["std", "core", "alloc", "crate", "self", "super"],
    );
}
