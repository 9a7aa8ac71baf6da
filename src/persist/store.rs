//! Profile Persistence
//!
//! One JSON document keyed by opaque resume token, rewritten on flush.
//! Writes are debounced: callers mark the store dirty after mutations
//! and a periodic `snapshot_if_due` call serializes the document at most
//! once per interval. The blocking disk write happens on the returned
//! [`FlushJob`], outside whatever lock guards the store, so a slow disk
//! never stalls message handling. The clock is injected so tests drive
//! time.
//!
//! A failed write is re-marked dirty by the caller and retried on the
//! next cycle; in-memory state is never rolled back.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::game::player::Profile;

/// Minimum interval between disk writes.
pub const FLUSH_INTERVAL_MS: u64 = 3_000;

/// Profile store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure while loading.
    #[error("profile store io: {0}")]
    Io(#[from] io::Error),

    /// Document failed to parse.
    #[error("profile store corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable key-value store of player progression.
pub struct ProfileStore {
    path: PathBuf,
    profiles: HashMap<String, Profile>,
    dirty: bool,
    last_flush_ms: u64,
}

impl ProfileStore {
    /// Load the store from disk. A missing file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let profiles = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), profiles = profiles.len(), "profile store loaded");
        Ok(Self {
            path,
            profiles,
            dirty: false,
            last_flush_ms: 0,
        })
    }

    /// Look up a profile by token.
    pub fn get(&self, token: &str) -> Option<&Profile> {
        self.profiles.get(token)
    }

    /// Insert or replace a profile and mark the store dirty.
    pub fn upsert(&mut self, token: &str, profile: Profile) {
        self.profiles.insert(token.to_string(), profile);
        self.dirty = true;
    }

    /// Mark the store as needing a flush.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether unflushed changes exist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of stored profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the store holds no profiles.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Serialize for writing if dirty and the debounce interval elapsed.
    pub fn snapshot_if_due(&mut self, now_ms: u64) -> Option<FlushJob> {
        if !self.dirty || now_ms.saturating_sub(self.last_flush_ms) < FLUSH_INTERVAL_MS {
            return None;
        }
        self.snapshot(now_ms)
    }

    /// Serialize the document now, ignoring the debounce interval.
    ///
    /// The dirty flag clears optimistically; a caller whose write fails
    /// re-marks the store so the next cycle retries. The interval timer
    /// advances either way, even when serialization itself fails.
    pub fn snapshot(&mut self, now_ms: u64) -> Option<FlushJob> {
        if !self.dirty {
            return None;
        }
        self.last_flush_ms = now_ms;
        match serde_json::to_string(&self.profiles) {
            Ok(payload) => {
                self.dirty = false;
                debug!(profiles = self.profiles.len(), "profile store serialized");
                Some(FlushJob {
                    path: self.path.clone(),
                    payload,
                })
            }
            Err(e) => {
                error!(error = %e, "profile serialization failed");
                None
            }
        }
    }
}

/// A serialized document ready to be written to disk.
///
/// Detached from the store so the blocking write can run without
/// holding the lock that guards it.
pub struct FlushJob {
    path: PathBuf,
    payload: String,
}

impl FlushJob {
    /// Target file of the write.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Perform the blocking write.
    pub fn write(self) -> io::Result<()> {
        fs::write(&self.path, self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::{pick_color, Player};

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("tidepool-store-{}.json", uuid::Uuid::new_v4()))
    }

    fn sample_profile(name: &str) -> Profile {
        let mut player = Player::new("p".to_string(), (0.0, 0.0), pick_color(0));
        player.name = name.to_string();
        player.gold = 321;
        player.to_profile()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let store = ProfileStore::load(temp_path()).unwrap();
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_upsert_and_get() {
        let mut store = ProfileStore::load(temp_path()).unwrap();
        store.upsert("tok-1", sample_profile("Marlin"));

        assert!(store.is_dirty());
        assert_eq!(store.get("tok-1").unwrap().name, "Marlin");
        assert!(store.get("tok-2").is_none());
    }

    #[test]
    fn test_flush_round_trip() {
        let path = temp_path();
        {
            let mut store = ProfileStore::load(&path).unwrap();
            store.upsert("tok-1", sample_profile("Marlin"));
            store.snapshot(10_000).unwrap().write().unwrap();
            assert!(!store.is_dirty());
        }

        let reloaded = ProfileStore::load(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("tok-1").unwrap().gold, 321);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_snapshot_if_due_debounces() {
        let path = temp_path();
        let mut store = ProfileStore::load(&path).unwrap();
        store.upsert("tok-1", sample_profile("Marlin"));
        store.snapshot(1_000).unwrap().write().unwrap();

        // Dirty again, but inside the interval: no write.
        store.upsert("tok-1", sample_profile("Marlin II"));
        assert!(store.snapshot_if_due(2_000).is_none());
        assert!(store.is_dirty());

        // Interval elapsed: write happens.
        let job = store.snapshot_if_due(4_100).unwrap();
        assert!(!store.is_dirty());
        job.write().unwrap();

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_snapshot_if_due_skips_clean_store() {
        let mut store = ProfileStore::load(temp_path()).unwrap();
        assert!(store.snapshot_if_due(1_000_000).is_none());
    }

    #[test]
    fn test_failed_write_retried_after_remark() {
        // Path inside a directory that does not exist: the write fails
        // but the in-memory profiles survive for the next cycle.
        let path = std::env::temp_dir()
            .join(format!("tidepool-missing-{}", uuid::Uuid::new_v4()))
            .join("store.json");
        let mut store = ProfileStore::load(&path).unwrap();
        store.upsert("tok-1", sample_profile("Marlin"));

        let job = store.snapshot(1_000).unwrap();
        assert!(job.write().is_err());
        assert!(!store.is_dirty());

        store.mark_dirty();
        assert!(store.snapshot(2_000).is_some());
        assert_eq!(store.get("tok-1").unwrap().gold, 321);
    }
}
