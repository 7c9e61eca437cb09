//! Typed documents over [`LocalStore`], one per localStorage key the PWA
//! uses: user profile, room list, per-room history, photo cache, last
//! position.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::{now_iso, ChatMessage};
use crate::store::LocalStore;

pub const K_USER: &str          = "pwa_user";
pub const K_ROOMS: &str         = "pwa_rooms";
pub const K_PHOTOS: &str        = "pwa_photos";
pub const K_LAST_POSITION: &str = "pwa_last_position";
pub const ROOM_PREFIX: &str     = "pwa_room_";

/// Most-recent entries kept per room; older ones are discarded on save.
pub const HISTORY_CAP: usize = 300;

pub fn room_key(room_name: &str) -> String {
    format!("{ROOM_PREFIX}{room_name}")
}

/* ---------------- documents ---------------- */

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub pseudo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_base64: Option<String>,
    pub updated_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients_count: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomsCache {
    pub rooms: Vec<RoomInfo>,
    pub updated_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomHistory {
    pub room_name: String,
    pub messages: Vec<ChatMessage>,
    pub updated_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    pub base64: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PhotosCache {
    pub items: Vec<Photo>,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LastPosition {
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub captured_at: String,
}

/* ---------------- typed store ---------------- */

pub struct PwaStore {
    local: LocalStore,
}

impl PwaStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { local: LocalStore::open(dir) }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /* ---- user ---- */
    pub fn user(&self) -> Option<UserProfile> {
        self.local.get_json(K_USER)
    }

    pub fn save_user(&self, pseudo: &str, photo_base64: Option<String>) -> UserProfile {
        let user = UserProfile { pseudo: pseudo.into(), photo_base64, updated_at: now_iso() };
        self.local.set_json(K_USER, &user);
        user
    }

    /* ---- rooms ---- */
    pub fn rooms_cache(&self) -> Option<RoomsCache> {
        self.local.get_json(K_ROOMS)
    }

    pub fn save_rooms_cache(&self, rooms: Vec<RoomInfo>) {
        self.local.set_json(K_ROOMS, &RoomsCache { rooms, updated_at: now_iso() });
    }

    /* ---- room history ---- */
    pub fn room_history(&self, room_name: &str) -> RoomHistory {
        self.local.get_json(&room_key(room_name)).unwrap_or_else(|| RoomHistory {
            room_name: room_name.into(),
            messages: Vec::new(),
            updated_at: now_iso(),
        })
    }

    /// Persist a room's history, keeping only the `HISTORY_CAP` newest
    /// entries (oldest discarded).
    pub fn save_room_history(&self, mut history: RoomHistory) {
        if history.messages.len() > HISTORY_CAP {
            let overflow = history.messages.len() - HISTORY_CAP;
            history.messages.drain(..overflow);
        }
        history.updated_at = now_iso();
        self.local.set_json(&room_key(&history.room_name), &history);
    }

    pub fn add_message(&self, room_name: &str, msg: ChatMessage) {
        let mut history = self.room_history(room_name);
        history.messages.push(msg);
        self.save_room_history(history);
    }

    /* ---- photos ---- */
    pub fn photos(&self) -> PhotosCache {
        self.local.get_json(K_PHOTOS).unwrap_or_default()
    }

    pub fn save_photos(&self, mut cache: PhotosCache) {
        cache.updated_at = now_iso();
        self.local.set_json(K_PHOTOS, &cache);
    }

    /// Newest first, like the PWA's camera roll.
    pub fn add_photo(&self, room_name: Option<String>, base64: &str) -> Photo {
        let photo = Photo {
            id: format!("photo_{}", uuid::Uuid::new_v4()),
            room_name,
            base64: base64.into(),
            created_at: now_iso(),
            synced: Some(false),
        };
        let mut cache = self.photos();
        cache.items.insert(0, photo.clone());
        self.save_photos(cache);
        photo
    }

    /* ---- geo ---- */
    pub fn last_position(&self) -> Option<LastPosition> {
        self.local.get_json(K_LAST_POSITION)
    }

    pub fn save_last_position(&self, pos: &LastPosition) {
        self.local.set_json(K_LAST_POSITION, pos);
    }
}
