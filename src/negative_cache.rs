//! Negative cache for class discovery
//!
//! Remembers class names that the reflector could not find, so repeated
//! lookups of unknown identifiers skip reflection. The set only grows while
//! the process runs.
//!
//! When backed by a file the set is loaded once and written back with a
//! configurable probability after each new miss. The file format is
//!
//! ```json
//! {"version": 1, "misses": ["App::Missing", "Other::Thing"]}
//! ```
//!
//! A missing, unreadable or corrupt file reads as an empty cache. Write
//! failures are logged and otherwise ignored.

use ahash::RandomState;
use dashmap::DashSet;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[cfg(feature = "logging")]
use tracing::debug;

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    misses: Vec<String>,
}

/// Set of class names known to have no descriptor
pub struct NegativeCache {
    misses: DashSet<String, RandomState>,
    path: Option<PathBuf>,
    persist_probability: f64,
}

impl NegativeCache {
    /// In-memory cache that is never persisted
    pub fn in_memory() -> Self {
        Self {
            misses: DashSet::with_hasher(RandomState::new()),
            path: None,
            persist_probability: 0.0,
        }
    }

    /// Cache backed by `path`, loaded immediately.
    ///
    /// `persist_probability` is clamped to `[0, 1]`.
    pub fn with_file(path: impl Into<PathBuf>, persist_probability: f64) -> Self {
        let path = path.into();
        let misses = DashSet::with_hasher(RandomState::new());
        for name in load(&path) {
            misses.insert(name);
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            path = %path.display(),
            entries = misses.len(),
            "Negative cache loaded"
        );

        Self {
            misses,
            path: Some(path),
            persist_probability: if persist_probability.is_nan() {
                0.0
            } else {
                persist_probability.clamp(0.0, 1.0)
            },
        }
    }

    /// Whether `class_name` is a recorded miss
    #[inline]
    pub fn is_miss(&self, class_name: &str) -> bool {
        self.misses.contains(class_name)
    }

    /// Record a miss. Returns false if it was already recorded.
    pub fn mark_miss(&self, class_name: &str) -> bool {
        if !self.misses.insert(class_name.to_string()) {
            return false;
        }

        if self.path.is_some() && self.should_persist() {
            if let Err(_error) = self.persist() {
                #[cfg(feature = "logging")]
                debug!(
                    target: "autowire_di",
                    error = %_error,
                    "Failed to persist negative cache, ignoring"
                );
            }
        }
        true
    }

    fn should_persist(&self) -> bool {
        self.persist_probability >= 1.0
            || (self.persist_probability > 0.0 && rand::rng().random_bool(self.persist_probability))
    }

    /// Write the cache to its file now.
    ///
    /// Writes to a temporary file next to the target and renames it into
    /// place. Does nothing for an in-memory cache.
    pub fn persist(&self) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut misses: Vec<String> = self.misses.iter().map(|r| r.key().clone()).collect();
        misses.sort();
        let contents = serde_json::to_vec(&CacheFile {
            version: FORMAT_VERSION,
            misses,
        })?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&contents)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "autowire_di",
            path = %path.display(),
            entries = self.misses.len(),
            "Negative cache persisted"
        );
        Ok(())
    }

    /// Backing file, if any
    #[inline]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[inline]
    pub fn persist_probability(&self) -> f64 {
        self.persist_probability
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.misses.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.misses.is_empty()
    }
}

impl Default for NegativeCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for NegativeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NegativeCache")
            .field("path", &self.path)
            .field("persist_probability", &self.persist_probability)
            .field("entries", &self.len())
            .finish()
    }
}

fn load(path: &Path) -> Vec<String> {
    let Ok(contents) = std::fs::read(path) else {
        return Vec::new();
    };
    match serde_json::from_slice::<CacheFile>(&contents) {
        Ok(file) if file.version == FORMAT_VERSION => file.misses,
        _ => {
            #[cfg(feature = "logging")]
            debug!(
                target: "autowire_di",
                path = %path.display(),
                "Negative cache file is corrupt, starting empty"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory() {
        let cache = NegativeCache::in_memory();
        assert!(cache.is_empty());
        assert!(!cache.is_miss("App::Missing"));

        assert!(cache.mark_miss("App::Missing"));
        assert!(!cache.mark_miss("App::Missing"));
        assert!(cache.is_miss("App::Missing"));
        assert_eq!(cache.len(), 1);

        // No file, nothing to do
        assert!(cache.persist().is_ok());
        assert!(cache.path().is_none());
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("misses.json");

        let cache = NegativeCache::with_file(&path, 1.0);
        cache.mark_miss("App::Missing");
        cache.mark_miss("App::Also::Missing");
        assert!(path.exists());

        let reloaded = NegativeCache::with_file(&path, 1.0);
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.is_miss("App::Missing"));
        assert!(reloaded.is_miss("App::Also::Missing"));
    }

    #[test]
    fn test_file_is_sorted_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("misses.json");

        let cache = NegativeCache::with_file(&path, 0.0);
        cache.mark_miss("B");
        cache.mark_miss("A");
        assert!(!path.exists());

        cache.persist().unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, r#"{"version":1,"misses":["A","B"]}"#);
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("misses.json");
        std::fs::write(&path, b"{not json").unwrap();

        let cache = NegativeCache::with_file(&path, 1.0);
        assert!(cache.is_empty());

        // And gets replaced by a valid file on the next miss
        cache.mark_miss("App::Missing");
        assert!(NegativeCache::with_file(&path, 0.0).is_miss("App::Missing"));
    }

    #[test]
    fn test_unknown_version_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("misses.json");
        std::fs::write(&path, br#"{"version":2,"misses":["X"]}"#).unwrap();

        assert!(NegativeCache::with_file(&path, 0.0).is_empty());
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache").join("misses.json");

        let cache = NegativeCache::with_file(&path, 1.0);
        cache.mark_miss("App::Missing");
        assert!(path.exists());
    }

    #[test]
    fn test_probability_clamped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("misses.json");

        assert_eq!(NegativeCache::with_file(&path, 7.5).persist_probability(), 1.0);
        assert_eq!(NegativeCache::with_file(&path, -1.0).persist_probability(), 0.0);
        assert_eq!(NegativeCache::with_file(&path, f64::NAN).persist_probability(), 0.0);
    }
}
