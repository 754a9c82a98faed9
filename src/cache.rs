//! In-process cache of repository discovery results

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Default lifetime of a cache entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

type CacheKey = (PathBuf, usize);

/// A single discovery result for one base directory and depth.
#[derive(Debug, Clone)]
pub struct DiscoveryCacheEntry {
    pub result_paths: BTreeSet<PathBuf>,
    pub created_at: Instant,
    pub ttl: Duration,
}

impl DiscoveryCacheEntry {
    pub fn new(result_paths: BTreeSet<PathBuf>, ttl: Duration) -> Self {
        Self {
            result_paths,
            created_at: Instant::now(),
            ttl,
        }
    }

    /// An entry is fresh until `ttl` has elapsed since it was created.
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) < self.ttl
    }
}

/// Age-expired cache keyed by resolved base directory and search depth.
///
/// Clones share the same underlying map. There is no invalidation hook:
/// repositories created after an entry was stored stay invisible until the
/// entry expires.
#[derive(Debug, Clone)]
pub struct DiscoveryCache {
    entries: Arc<RwLock<HashMap<CacheKey, DiscoveryCacheEntry>>>,
    ttl: Duration,
}

impl DiscoveryCache {
    /// Create an empty cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh result for `base` scanned to `max_depth`, if any. Expired
    /// entries are dropped.
    pub fn get(&self, base: &Path, max_depth: usize) -> Result<Option<Vec<PathBuf>>> {
        let now = Instant::now();
        let key = (base.to_path_buf(), max_depth);
        {
            let entries = self.entries.read().map_err(|_| poisoned())?;
            match entries.get(&key) {
                Some(entry) if entry.is_fresh(now) => {
                    return Ok(Some(entry.result_paths.iter().cloned().collect()))
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        if entries.get(&key).is_some_and(|e| !e.is_fresh(now)) {
            entries.remove(&key);
        }
        Ok(None)
    }

    /// Store a result for `base` scanned to `max_depth`. Concurrent writers
    /// race; the last one wins.
    pub fn insert<I>(&self, base: PathBuf, max_depth: usize, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let entry = DiscoveryCacheEntry::new(paths.into_iter().collect(), self.ttl);
        self.insert_entry(base, max_depth, entry)
    }

    /// Store a pre-built entry, e.g. to seed a cache in tests.
    pub fn insert_entry(
        &self,
        base: PathBuf,
        max_depth: usize,
        entry: DiscoveryCacheEntry,
    ) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert((base, max_depth), entry);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.entries.write().map_err(|_| poisoned())?.clear();
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(|_| poisoned())?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for DiscoveryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

fn poisoned() -> Error {
    Error::LockPoisoned {
        context: "discovery cache".to_string(),
    }
}
