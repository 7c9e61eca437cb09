//! Offline cache: one JSON file per key, each value wrapped in a versioned
//! envelope `{v, savedAt, data}`. Every operation is best-effort — quota,
//! IO and serialization failures degrade to a cache miss.

pub mod cache;

pub use cache::PwaStore;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::models::now_iso;

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    v: u32,
    #[serde(rename = "savedAt")]
    saved_at: String,
    data: T,
}

pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::debug!("cache dir {:?} unavailable: {e}", dir);
        }
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        let envelope = Envelope { v: 1, saved_at: now_iso(), data: value };
        match serde_json::to_vec(&envelope) {
            Ok(bytes) => {
                if let Err(e) = fs::write(self.path(key), bytes) {
                    tracing::debug!("cache write {key} failed: {e}");
                }
            }
            Err(e) => tracing::debug!("cache encode {key} failed: {e}"),
        }
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = fs::read(self.path(key)).ok()?;
        if let Ok(envelope) = serde_json::from_slice::<Envelope<T>>(&raw) {
            return Some(envelope.data);
        }
        // compat with values stored before the envelope existed
        serde_json::from_slice(&raw).ok()
    }

    pub fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.path(key));
    }

    pub fn has(&self, key: &str) -> bool {
        self.path(key).exists()
    }

    pub fn clear_prefix(&self, prefix: &str) {
        let Ok(entries) = fs::read_dir(&self.dir) else { return };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(prefix) {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn temp_store() -> LocalStore {
    LocalStore::open(std::env::temp_dir().join(format!("chat_relay_test_{}", uuid::Uuid::new_v4())))
}
