// Upload ingestion - single files, zip archives and directories into per-language sources
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor};
use std::path::Path;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::extractor::{extract_libraries, extract_signals, merge_signals, LanguageLibraries};
use crate::language::{
    extension_of, is_allowed, Language, ANALYSIS_EXTENSIONS, EXTENDED_EXTENSIONS, KNOWN_EXTENSIONS,
};

const ARCHIVE_EXTENSION: &str = ".zip";
const TOP_LANGUAGES: usize = 5;
const COMMENT_PREFIXES: &[&str] = &["#", "//", "/*", "*", "<!--"];
/// Dependency and build directories, never the user's own code.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "target", "venv", ".venv", "__pycache__", "dist", "build"];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid file type '{filename}'. Supported types: {allowed}")]
    UnsupportedType { filename: String, allowed: String },

    #[error("Could not read archive: {0}")]
    CorruptArchive(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// Path relative to the upload or archive root
    pub name: String,
    pub language: Language,
    pub content: String,
}

/// Decoded source files of one request, in ingestion order.
#[derive(Debug, Clone, Default)]
pub struct LanguageSources {
    files: Vec<SourceFile>,
}

impl LanguageSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, language: Language, content: impl Into<String>) {
        self.files.push(SourceFile {
            name: name.into(),
            language,
            content: content.into(),
        });
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Languages in the order they were first seen.
    pub fn languages(&self) -> Vec<Language> {
        let mut seen = Vec::new();
        for file in &self.files {
            if !seen.contains(&file.language) {
                seen.push(file.language);
            }
        }
        seen
    }

    pub fn contents(&self) -> impl Iterator<Item = (Language, &str)> {
        self.files.iter().map(|f| (f.language, f.content.as_str()))
    }

    pub fn libraries(&self) -> LanguageLibraries {
        self.files
            .iter()
            .map(|f| (f.language, extract_libraries(&f.content, f.language)))
            .collect()
    }

    /// Skill confidences merged across files by maximum. The reported
    /// language is the one detected for the first file.
    pub fn signals(&self) -> (Language, BTreeMap<String, f64>) {
        let mut language = Language::Unknown;
        let mut merged = BTreeMap::new();

        for (i, file) in self.files.iter().enumerate() {
            let (detected, skills) = extract_signals(&file.content, Some(file.name.as_str()));
            if i == 0 {
                language = detected;
            }
            merge_signals(&mut merged, skills);
        }

        (language, merged)
    }

    /// Line statistics for the upload. Files without code lines are not counted.
    pub fn summary(&self, processing_time_ms: f64) -> UploadSummary {
        let mut per_language: Vec<(String, u64)> = Vec::new();
        let mut total_files = 0;
        let mut lines_of_code = 0;

        for file in &self.files {
            let lines = count_code_lines(&file.content);
            if lines == 0 {
                continue;
            }
            total_files += 1;
            lines_of_code += lines;

            let label = file.language.label();
            match per_language.iter_mut().find(|(name, _)| name == label) {
                Some((_, count)) => *count += lines,
                None => per_language.push((label.to_string(), lines)),
            }
        }

        per_language.sort_by(|a, b| b.1.cmp(&a.1));
        per_language.truncate(TOP_LANGUAGES);

        UploadSummary {
            total_files,
            lines_of_code,
            most_used_languages: per_language,
            processing_time_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSummary {
    pub total_files: usize,
    pub lines_of_code: u64,
    /// Top languages by line count, largest first
    #[serde(serialize_with = "ordered_map")]
    pub most_used_languages: Vec<(String, u64)>,
    pub processing_time_ms: f64,
}

fn ordered_map<S: Serializer>(entries: &[(String, u64)], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (language, lines) in entries {
        map.serialize_entry(language, lines)?;
    }
    map.end()
}

/// Non-blank lines that do not start with a comment marker.
pub fn count_code_lines(content: &str) -> u64 {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !COMMENT_PREFIXES.iter().any(|p| line.starts_with(p)))
        .count() as u64
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Turns uploads into `LanguageSources`, restricted to an extension allow-list.
#[derive(Debug, Clone, Copy)]
pub struct Ingestor {
    allowed: &'static [&'static str],
    max_member_bytes: u64,
}

impl Ingestor {
    /// Allow-list of the skill analysis endpoints.
    pub fn analysis(max_member_bytes: u64) -> Self {
        Self {
            allowed: ANALYSIS_EXTENSIONS,
            max_member_bytes,
        }
    }

    /// Wider allow-list of the rank and summary endpoints.
    pub fn extended(max_member_bytes: u64) -> Self {
        Self {
            allowed: EXTENDED_EXTENSIONS,
            max_member_bytes,
        }
    }

    /// Every extension the language map knows, for local project analysis.
    pub fn all_known(max_member_bytes: u64) -> Self {
        Self {
            allowed: KNOWN_EXTENSIONS,
            max_member_bytes,
        }
    }

    pub fn allowed_list(&self) -> String {
        self.allowed.join(", ")
    }

    pub fn validate(&self, filename: &str) -> Result<(), IngestError> {
        if is_allowed(filename, self.allowed) {
            Ok(())
        } else {
            Err(IngestError::UnsupportedType {
                filename: filename.to_string(),
                allowed: self.allowed_list(),
            })
        }
    }

    /// Ingest an uploaded file: a zip archive is extracted and walked, any
    /// other allowed file becomes a single source decoded lossily as UTF-8.
    pub fn ingest_upload(&self, filename: &str, bytes: &[u8]) -> Result<LanguageSources, IngestError> {
        self.validate(filename)?;

        if extension_of(filename).as_deref() == Some(ARCHIVE_EXTENSION) {
            return self.ingest_archive(bytes);
        }

        let mut sources = LanguageSources::new();
        sources.push(
            filename,
            Language::from_extension(filename),
            String::from_utf8_lossy(bytes).into_owned(),
        );
        Ok(sources)
    }

    /// Extract into a temporary directory removed before returning.
    pub fn ingest_archive(&self, bytes: &[u8]) -> Result<LanguageSources, IngestError> {
        let workdir = TempDir::new()?;
        self.extract_archive(bytes, workdir.path())?;
        self.ingest_dir(workdir.path())
    }

    /// Write the allowed members of a zip archive under `dest`. Members
    /// escaping `dest`, oversized members and other file types are skipped.
    /// Returns the number of files written.
    pub fn extract_archive(&self, bytes: &[u8], dest: &Path) -> Result<usize, IngestError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| IngestError::CorruptArchive(e.to_string()))?;

        let mut written = 0;
        for i in 0..archive.len() {
            let mut member = archive
                .by_index(i)
                .map_err(|e| IngestError::CorruptArchive(e.to_string()))?;

            if member.is_dir() {
                continue;
            }
            let Some(relative) = member.enclosed_name().map(|p| p.to_path_buf()) else {
                warn!("Skipping archive member with unsafe path: {}", member.name());
                continue;
            };
            if !self.is_source(&relative) {
                continue;
            }
            if member.size() > self.max_member_bytes {
                debug!("Skipping oversized archive member {}", relative.display());
                continue;
            }

            let target = dest.join(&relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&target)?;
            io::copy(&mut member, &mut out)
                .map_err(|e| IngestError::CorruptArchive(format!("{}: {}", relative.display(), e)))?;
            written += 1;
        }

        debug!("Extracted {} source files from archive", written);
        Ok(written)
    }

    /// Walk `root` in file-name order and read every allowed source file.
    pub fn ingest_dir(&self, root: &Path) -> Result<LanguageSources, IngestError> {
        let mut sources = LanguageSources::new();

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if !self.is_source(path) {
                continue;
            }
            if entry.metadata().map(|m| m.len()).unwrap_or(0) > self.max_member_bytes {
                debug!("Skipping oversized file {}", path.display());
                continue;
            }

            let bytes = fs::read(path)?;
            let name = path
                .strip_prefix(root)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            sources.push(
                name,
                Language::from_path(path),
                String::from_utf8_lossy(&bytes).into_owned(),
            );
        }

        debug!("Ingested {} files from {}", sources.len(), root.display());
        Ok(sources)
    }

    /// Allowed and not itself an archive.
    fn is_source(&self, path: &Path) -> bool {
        let name = path.to_string_lossy();
        is_allowed(&name, self.allowed) && extension_of(&name).as_deref() != Some(ARCHIVE_EXTENSION)
    }
}
