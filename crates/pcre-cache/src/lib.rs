//! Parsed-AST cache backends.
//!
//! Parsing is the expensive step for large pattern corpora, so the facade
//! caches one canonical AST per pattern behind a small interface. Two
//! backends ship here: a bounded in-memory map and a filesystem store with
//! atomic writes. Keys include the crate version, so upgrading the
//! analyzer invalidates everything at once.

use std::collections::VecDeque;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use pcre_ast::Node;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Cache failures. Reads are best-effort and never fail; writes can.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem problem
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization problem
    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Derive the cache key for a pattern.
///
/// The key is the md5 of the crate version and the pattern text; the
/// version salt invalidates all entries on upgrade.
pub fn generate_key(pattern: &str) -> String {
    let digest = md5::compute(format!("{}\x00{}", env!("CARGO_PKG_VERSION"), pattern));
    format!("{digest:x}")
}

/// Storage interface for parsed ASTs.
pub trait AstCache: Send + Sync {
    /// Key derivation; overridable for stores with their own scheme.
    fn generate_key(&self, pattern: &str) -> String {
        generate_key(pattern)
    }

    /// Fetch a cached tree. Corrupt or missing entries read as `None`.
    fn load(&self, key: &str) -> Option<Node>;

    /// Store a tree.
    fn write(&self, key: &str, ast: &Node) -> Result<(), CacheError>;

    /// Drop all entries.
    fn clear(&self) -> Result<(), CacheError>;

    /// When the entry was written, if known.
    fn timestamp(&self, key: &str) -> Option<SystemTime>;
}

/// Bounded in-memory cache with FIFO eviction.
pub struct InMemoryAstCache {
    inner: Mutex<MemoryInner>,
}

struct MemoryInner {
    entries: FxHashMap<String, (Node, SystemTime)>,
    order: VecDeque<String>,
    max_entries: usize,
}

impl InMemoryAstCache {
    /// Cache holding up to `max_entries` trees.
    pub fn new(max_entries: usize) -> Self {
        InMemoryAstCache {
            inner: Mutex::new(MemoryInner {
                entries: FxHashMap::default(),
                order: VecDeque::new(),
                max_entries: max_entries.max(1),
            }),
        }
    }
}

impl Default for InMemoryAstCache {
    fn default() -> Self {
        InMemoryAstCache::new(256)
    }
}

impl AstCache for InMemoryAstCache {
    fn load(&self, key: &str) -> Option<Node> {
        self.inner.lock().entries.get(key).map(|(node, _)| node.clone())
    }

    fn write(&self, key: &str, ast: &Node) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        if inner.entries.contains_key(key) {
            return Ok(());
        }
        if inner.order.len() >= inner.max_entries {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        inner.order.push_back(key.to_string());
        inner
            .entries
            .insert(key.to_string(), (ast.clone(), SystemTime::now()));
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
        Ok(())
    }

    fn timestamp(&self, key: &str) -> Option<SystemTime> {
        self.inner.lock().entries.get(key).map(|(_, t)| *t)
    }
}

/// Filesystem cache: serialized trees under two-level hash paths, written
/// atomically via a temp file and rename.
pub struct FileAstCache {
    root: PathBuf,
}

impl FileAstCache {
    /// Cache rooted at a directory (created on demand).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileAstCache { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let (shard, rest) = key.split_at(key.len().min(2));
        self.root.join(shard).join(format!("{rest}.json"))
    }
}

impl AstCache for FileAstCache {
    fn load(&self, key: &str) -> Option<Node> {
        let bytes = fs::read(self.path_for(key)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn write(&self, key: &str, ast: &Node) -> Result<(), CacheError> {
        let path = self.path_for(key);
        let dir = path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec(ast)?)?;
        tmp.persist(&path).map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        if self.root.exists() {
            fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }

    fn timestamp(&self, key: &str) -> Option<SystemTime> {
        fs::metadata(self.path_for(key)).ok()?.modified().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcre_parser::Parser;

    fn ast(source: &str) -> Node {
        Parser::new().parse(source).unwrap()
    }

    #[test]
    fn keys_are_stable_and_distinct() {
        assert_eq!(generate_key("/a/"), generate_key("/a/"));
        assert_ne!(generate_key("/a/"), generate_key("/b/"));
    }

    #[test]
    fn memory_cache_round_trips() {
        let cache = InMemoryAstCache::new(4);
        let node = ast("/a+b/");
        let key = cache.generate_key("/a+b/");
        assert!(cache.load(&key).is_none());
        cache.write(&key, &node).unwrap();
        assert_eq!(cache.load(&key), Some(node));
        assert!(cache.timestamp(&key).is_some());
        cache.clear().unwrap();
        assert!(cache.load(&key).is_none());
    }

    #[test]
    fn memory_cache_evicts_fifo() {
        let cache = InMemoryAstCache::new(1);
        cache.write("k1", &ast("/a/")).unwrap();
        cache.write("k2", &ast("/b/")).unwrap();
        assert!(cache.load("k1").is_none());
        assert!(cache.load("k2").is_some());
    }

    #[test]
    fn file_cache_round_trips_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileAstCache::new(dir.path().join("ast-cache"));
        let node = ast("/(x|y)z{2}/i");
        let key = cache.generate_key("/(x|y)z{2}/i");
        cache.write(&key, &node).unwrap();
        assert_eq!(cache.load(&key), Some(node));
        assert!(cache.timestamp(&key).is_some());
        cache.clear().unwrap();
        assert!(cache.load(&key).is_none());
    }

    #[test]
    fn file_cache_ignores_corrupt_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileAstCache::new(dir.path());
        let key = cache.generate_key("/a/");
        let path = dir.path().join(&key[..2]).join(format!("{}.json", &key[2..]));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not json").unwrap();
        assert!(cache.load(&key).is_none());
    }
}
