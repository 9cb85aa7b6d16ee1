//! Bounded, persisted set of permalinks that were already delivered or seeded.
//!
//! All monitor tasks share one [`DedupCache`]; every operation takes the same
//! lock, so reads, inserts and saves never interleave. Eviction is FIFO by
//! first insertion and the order survives a save/load cycle.

mod persister;

pub use persister::{spawn_cache_persister, DEFAULT_PERSIST_INTERVAL_SECS};

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::CacheError;

pub const CACHE_CAPACITY: usize = 100;
pub const DEFAULT_CACHE_FILE: &str = "cache.json";

/// Whether a [`DedupCache::save`] call touched the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    Skipped,
}

/// How [`DedupCache::ensure_usable`] made the cache ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// State was read from disk (or no file existed yet).
    Loaded { entries: usize },
    /// The file was unreadable; it was archived and a fresh cache written.
    Recovered { archived_to: Option<PathBuf> },
}

struct CacheState {
    order: VecDeque<String>,
    members: HashSet<String>,
    last_update: DateTime<Utc>,
    last_persisted: DateTime<Utc>,
}

impl CacheState {
    fn empty() -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            last_update: DateTime::<Utc>::UNIX_EPOCH,
            last_persisted: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// On-disk layout; compatible with caches written by earlier releases.
#[derive(Serialize, Deserialize)]
struct CacheFile {
    #[serde(default, with = "ordered_permalinks")]
    processed_permalinks: VecDeque<String>,
    #[serde(default = "epoch")]
    last_cache_update: DateTime<Utc>,
    #[serde(default = "epoch")]
    last_persisted: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

pub struct DedupCache {
    state: Mutex<CacheState>,
    capacity: usize,
}

impl Default for DedupCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DedupCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedupCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl DedupCache {
    pub fn new() -> Self {
        Self::with_capacity(CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::empty()),
            capacity: capacity.max(1),
        }
    }

    // A panic while holding the lock cannot leave the set half-updated, so a
    // poisoned guard is still safe to use.
    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the in-memory state with the contents of `path`.
    ///
    /// A missing file leaves the cache empty and is not an error.
    pub fn load(&self, path: &Path) -> Result<(), CacheError> {
        let mut state = self.state();

        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No cache file found, starting with an empty cache");
                return Ok(());
            }
            Err(e) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let file: CacheFile =
            serde_json::from_slice(&content).map_err(|e| CacheError::Corrupt {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut fresh = CacheState::empty();
        for link in file.processed_permalinks {
            if fresh.members.insert(link.clone()) {
                fresh.order.push_back(link);
            }
        }
        // Keep the newest entries if the file holds more than we allow.
        while fresh.order.len() > self.capacity {
            if let Some(oldest) = fresh.order.pop_front() {
                fresh.members.remove(&oldest);
            }
        }
        fresh.last_update = file.last_cache_update;
        fresh.last_persisted = modified_at(path).unwrap_or(file.last_persisted);

        *state = fresh;
        info!(
            path = %path.display(),
            entries = state.order.len(),
            "Loaded dedup cache"
        );
        Ok(())
    }

    pub fn is_processed(&self, permalink: &str) -> bool {
        self.state().members.contains(permalink)
    }

    /// Record `permalink`, evicting the oldest entry first when full.
    pub fn mark_processed(&self, permalink: &str) {
        let mut state = self.state();

        if !state.members.contains(permalink) {
            if state.order.len() >= self.capacity {
                if let Some(evicted) = state.order.pop_front() {
                    state.members.remove(&evicted);
                    debug!(permalink = %evicted, "Evicted oldest cache entry");
                }
            }
            state.members.insert(permalink.to_string());
            state.order.push_back(permalink.to_string());
        }

        state.last_update = Utc::now();
    }

    /// Write the cache to `path` unless the file on disk is already newer
    /// than the last in-memory change.
    pub fn save(&self, path: &Path) -> Result<SaveOutcome, CacheError> {
        let mut state = self.state();
        Self::save_locked(&mut state, path)
    }

    fn save_locked(state: &mut CacheState, path: &Path) -> Result<SaveOutcome, CacheError> {
        if let Some(on_disk) = modified_at(path) {
            if on_disk > state.last_update {
                debug!(path = %path.display(), "Cache unchanged since last save, skipping persistence");
                return Ok(SaveOutcome::Skipped);
            }
        }

        let now = Utc::now();
        let file = CacheFile {
            processed_permalinks: state.order.clone(),
            last_cache_update: state.last_update,
            last_persisted: now,
        };
        let encoded = serde_json::to_vec(&file)?;
        write_atomically(path, &encoded)?;

        state.last_persisted = now;
        info!(path = %path.display(), entries = state.order.len(), "Cache persisted to disk");
        Ok(SaveOutcome::Written)
    }

    /// Load `path`, or archive it and start over if it cannot be read.
    ///
    /// Only a failure to write the replacement cache is returned as an error.
    pub fn ensure_usable(&self, path: &Path) -> Result<CacheStatus, CacheError> {
        match self.load(path) {
            Ok(()) => Ok(CacheStatus::Loaded {
                entries: self.len(),
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cache unusable, archiving and recreating");
                let archived_to = archive(path);

                let mut state = self.state();
                *state = CacheState::empty();
                state.last_update = Utc::now();
                state.last_persisted = state.last_update;
                Self::save_locked(&mut state, path)?;

                Ok(CacheStatus::Recovered { archived_to })
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.state().last_update
    }

    pub fn last_persisted(&self) -> DateTime<Utc> {
        self.state().last_persisted
    }

    /// Non-empty and touched within `stale_after` of now.
    pub fn is_fresh(&self, stale_after: Duration) -> bool {
        let state = self.state();
        if state.order.is_empty() {
            return false;
        }
        let age = Utc::now().signed_duration_since(state.last_update);
        age.to_std().map(|age| age <= stale_after).unwrap_or(true)
    }

    /// Permalinks in eviction order, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.state().order.iter().cloned().collect()
    }
}

fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from)
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), CacheError> {
    let io_err = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
    file.write_all(contents).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(io_err)
}

fn archive(path: &Path) -> Option<PathBuf> {
    if !path.exists() {
        return None;
    }
    let mut archive_name = path.as_os_str().to_owned();
    archive_name.push(".archive.bak");
    let archive_path = PathBuf::from(archive_name);

    match fs::rename(path, &archive_path) {
        Ok(()) => {
            info!(archive = %archive_path.display(), "Archived unreadable cache");
            Some(archive_path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to archive unreadable cache");
            None
        }
    }
}

/// (De)serializes the permalink set as a `{permalink: true}` map, keeping
/// insertion order in both directions.
mod ordered_permalinks {
    use std::collections::VecDeque;
    use std::fmt;

    use serde::de::{self, MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(links: &VecDeque<String>, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(links.len()))?;
        for link in links {
            map.serialize_entry(link, &true)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<VecDeque<String>, D::Error> {
        struct LinksVisitor;

        impl<'de> Visitor<'de> for LinksVisitor {
            type Value = VecDeque<String>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of permalinks to booleans")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(VecDeque::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut links = VecDeque::new();
                while let Some((link, seen)) = access.next_entry::<String, bool>()? {
                    if seen {
                        links.push_back(link);
                    }
                }
                Ok(links)
            }
        }

        d.deserialize_any(LinksVisitor)
    }
}
