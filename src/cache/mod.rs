//! Cache module for incremental generation
//!
//! Tracks a hash of every post's raw CMS document so detail pages whose
//! document did not change are not rendered again. A change in the site
//! configuration or in the generator version forces a full rebuild.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::config::SiteConfig;

/// Cache directory, relative to the site directory
pub const CACHE_DIR: &str = ".blog-cache";

/// Cache file name
const CACHE_FILE: &str = ".blog-cache/db.json";

/// Represents a cached entry for one post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Hash of the raw CMS document
    pub content_hash: u64,
    /// Output path relative to public dir
    pub output_path: String,
}

/// Cache database for tracking document changes
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheDb {
    /// Version of the cache format
    pub version: u32,
    /// Hash of the site config (changes trigger full rebuild)
    pub config_hash: u64,
    /// Cached entries for posts, keyed by uid
    pub posts: HashMap<String, CacheEntry>,
}

impl CacheDb {
    /// Current cache format version
    const VERSION: u32 = 1;

    /// Load cache from disk, or create a new empty cache
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = base_dir.join(CACHE_FILE);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            if let Ok(cache) = serde_json::from_str::<CacheDb>(&content) {
                if cache.version == Self::VERSION {
                    return cache;
                }
                tracing::info!("Cache version mismatch, rebuilding cache");
            }
        }
        Self::default()
    }

    /// Save cache to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        fs::create_dir_all(base_dir.join(CACHE_DIR))?;

        let cache_path = base_dir.join(CACHE_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(cache_path, content)?;
        Ok(())
    }

    /// Create a new cache with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

/// Change detection result
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Posts that need rendering (uid)
    pub changed_posts: Vec<String>,
    /// Cached posts that disappeared from the CMS (uid)
    pub deleted_posts: Vec<String>,
    /// Whether to render every post regardless of hashes
    pub full_rebuild: bool,
}

impl ChangeSet {
    /// Create a changeset indicating full rebuild is needed; deletions
    /// still have to be applied
    pub fn full_rebuild(deleted_posts: Vec<String>) -> Self {
        Self {
            deleted_posts,
            full_rebuild: true,
            ..Default::default()
        }
    }

    /// Whether the post with this uid must be rendered
    pub fn needs_render(&self, uid: &str) -> bool {
        self.full_rebuild || self.changed_posts.iter().any(|u| u == uid)
    }

    /// Check if any changes were detected
    pub fn has_changes(&self) -> bool {
        self.full_rebuild || !self.changed_posts.is_empty() || !self.deleted_posts.is_empty()
    }

    /// Get summary of changes for logging
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.full_rebuild {
            parts.push("full rebuild required".to_string());
        } else if !self.changed_posts.is_empty() {
            parts.push(format!("{} posts changed", self.changed_posts.len()));
        }
        if !self.deleted_posts.is_empty() {
            parts.push(format!("{} posts deleted", self.deleted_posts.len()));
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Calculate a hash for document content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Hash of the effective configuration plus the generator version
pub fn hash_config(config: &SiteConfig) -> Result<u64> {
    let serialized = serde_yaml::to_string(config)?;
    Ok(hash_content(&format!(
        "{}\n{}",
        env!("CARGO_PKG_VERSION"),
        serialized
    )))
}

/// Detect changes between the current documents and the cached state
pub fn detect_changes(
    cache: &CacheDb,
    config_hash: u64,
    current_posts: &[(String, u64)], // (uid, hash)
) -> ChangeSet {
    let uids: Vec<&str> = current_posts.iter().map(|(u, _)| u.as_str()).collect();
    let deleted = deleted_posts(cache, &uids);

    if config_hash != cache.config_hash && cache.config_hash != 0 {
        tracing::info!("Config changed, full rebuild required");
        return ChangeSet::full_rebuild(deleted);
    }

    let mut changeset = ChangeSet {
        deleted_posts: deleted,
        ..Default::default()
    };

    for (uid, hash) in current_posts {
        match cache.posts.get(uid) {
            Some(cached) if cached.content_hash == *hash => {}
            Some(_) => {
                tracing::debug!("Post changed: {}", uid);
                changeset.changed_posts.push(uid.clone());
            }
            None => {
                tracing::debug!("New post: {}", uid);
                changeset.changed_posts.push(uid.clone());
            }
        }
    }

    changeset
}

/// Cached uids that are not among `current`, sorted
pub fn deleted_posts(cache: &CacheDb, current: &[&str]) -> Vec<String> {
    let current: HashSet<&str> = current.iter().copied().collect();
    let mut deleted: Vec<String> = cache
        .posts
        .keys()
        .filter(|uid| !current.contains(uid.as_str()))
        .cloned()
        .collect();
    deleted.sort();
    for uid in &deleted {
        tracing::debug!("Deleted post: {}", uid);
    }
    deleted
}

/// Track a single post written outside a full generation run
pub fn record_post(
    cache: &mut CacheDb,
    config_hash: u64,
    uid: &str,
    hash: u64,
    output_path: &str,
) {
    cache.version = CacheDb::VERSION;
    if cache.config_hash == 0 {
        cache.config_hash = config_hash;
    }
    cache.posts.insert(
        uid.to_string(),
        CacheEntry {
            content_hash: hash,
            output_path: output_path.to_string(),
        },
    );
}

/// Replace the cached state with the current documents
pub fn update_cache(
    cache: &mut CacheDb,
    config_hash: u64,
    posts: &[(String, u64, String)], // (uid, hash, output_path)
) {
    cache.version = CacheDb::VERSION;
    cache.config_hash = config_hash;

    cache.posts.clear();
    for (uid, hash, output_path) in posts {
        cache.posts.insert(
            uid.clone(),
            CacheEntry {
                content_hash: *hash,
                output_path: output_path.clone(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache_with(posts: &[(&str, u64)]) -> CacheDb {
        let mut cache = CacheDb::new();
        let entries: Vec<_> = posts
            .iter()
            .map(|(uid, hash)| (uid.to_string(), *hash, format!("post/{}/index.html", uid)))
            .collect();
        update_cache(&mut cache, 42, &entries);
        cache
    }

    #[test]
    fn test_hash_content() {
        assert_eq!(hash_content("a"), hash_content("a"));
        assert_ne!(hash_content("a"), hash_content("b"));
    }

    #[test]
    fn test_detect_changes() {
        let cache = cache_with(&[("same", 1), ("edited", 2), ("gone", 3)]);
        let current = vec![
            ("same".to_string(), 1),
            ("edited".to_string(), 20),
            ("new".to_string(), 4),
        ];
        let changes = detect_changes(&cache, 42, &current);

        assert!(!changes.full_rebuild);
        assert!(changes.needs_render("edited"));
        assert!(changes.needs_render("new"));
        assert!(!changes.needs_render("same"));
        assert_eq!(changes.deleted_posts, vec!["gone".to_string()]);
        assert_eq!(changes.summary(), "2 posts changed, 1 posts deleted");
    }

    #[test]
    fn test_config_change_forces_full_rebuild() {
        let cache = cache_with(&[("same", 1), ("gone", 2)]);
        let changes = detect_changes(&cache, 7, &[("same".to_string(), 1)]);
        assert!(changes.full_rebuild);
        assert!(changes.needs_render("same"));
        assert_eq!(changes.deleted_posts, vec!["gone".to_string()]);
        assert_eq!(changes.summary(), "full rebuild required, 1 posts deleted");
    }

    #[test]
    fn test_deleted_posts_are_sorted() {
        let cache = cache_with(&[("b", 1), ("a", 2), ("kept", 3)]);
        assert_eq!(deleted_posts(&cache, &["kept"]), vec!["a", "b"]);
        assert!(deleted_posts(&CacheDb::new(), &["kept"]).is_empty());
    }

    #[test]
    fn test_record_post_keeps_other_entries() {
        let mut cache = cache_with(&[("a", 1)]);
        record_post(&mut cache, 99, "b", 2, "post/b/index.html");
        assert_eq!(cache.config_hash, 42);
        assert_eq!(cache.posts["a"].content_hash, 1);
        assert_eq!(cache.posts["b"].output_path, "post/b/index.html");

        let mut empty = CacheDb::default();
        record_post(&mut empty, 99, "c", 3, "post/c/index.html");
        assert_eq!(empty.config_hash, 99);
        assert_eq!(empty.version, CacheDb::VERSION);
    }

    #[test]
    fn test_hash_config_tracks_settings() {
        let config = SiteConfig::default();
        let mut other = SiteConfig::default();
        other.content.words_per_minute = 250;
        assert_eq!(hash_config(&config).unwrap(), hash_config(&config).unwrap());
        assert_ne!(hash_config(&config).unwrap(), hash_config(&other).unwrap());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let cache = cache_with(&[("a", 1)]);
        cache.save(dir.path()).unwrap();

        let loaded = CacheDb::load(dir.path());
        assert_eq!(loaded.config_hash, 42);
        assert_eq!(loaded.posts["a"].content_hash, 1);

        let missing = CacheDb::load(&dir.path().join("nope"));
        assert!(missing.is_empty());
    }
}
