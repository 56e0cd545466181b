// Result cache module - one JSON file per key with a wall-clock expiry
use anyhow::{Context, Result};
use md5::{Digest, Md5};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Hex md5 of `source`, used as a cache file stem.
pub fn cache_key(source: &str) -> String {
    let digest = Md5::digest(source.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Save data under `key`. The file is written beside its final name and
    /// renamed into place, so readers never see a partial entry.
    pub fn put<T: Serialize>(&self, key: &str, data: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache dir {}", self.dir.display()))?;

        let bytes = serde_json::to_vec(data)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.persist(self.path(key))
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write cache entry {}", key))?;

        debug!("Cached {}", key);
        Ok(())
    }

    /// Load a fresh entry. Expired and unreadable entries are deleted and
    /// reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path(key);

        if !path.exists() {
            return Ok(None);
        }

        // Check age
        let modified = fs::metadata(&path)?.modified()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        if age > self.ttl {
            debug!("Cache entry {} expired", key);
            self.remove(key)?;
            return Ok(None);
        }

        let bytes = fs::read(&path)?;
        match serde_json::from_slice(&bytes) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                warn!("Dropping corrupt cache entry {}: {}", key, e);
                self.remove(key)?;
                Ok(None)
            }
        }
    }

    /// Clear a specific cache entry
    pub fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            // A concurrent reader may have removed it first
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Clear all cache
    pub fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        if !self.dir.exists() {
            return Ok(CacheStats {
                cache_dir: self.dir.clone(),
                ..Default::default()
            });
        }

        let mut total_size = 0u64;
        let mut file_count = 0usize;

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|e| e == "json") {
                total_size += entry.metadata()?.len();
                file_count += 1;
            }
        }

        Ok(CacheStats {
            total_size,
            file_count,
            cache_dir: self.dir.clone(),
        })
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    pub total_size: u64,
    pub file_count: usize,
    pub cache_dir: PathBuf,
}

impl CacheStats {
    pub fn format_size(&self) -> String {
        crate::cli_output::format_size(self.total_size)
    }
}
