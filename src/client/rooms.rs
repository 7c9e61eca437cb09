//! Management-API client: room list, room registration, HTTP history
//! fallback for clients that cannot hold a socket open.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::client::normalize_history;
use crate::error::{bad, AppResult};
use crate::models::ChatMessage;

#[derive(Deserialize, Clone, Debug)]
pub struct RoomDetails {
    #[serde(rename = "clientsCount")]
    pub clients_count: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RoomsDoc {
    pub rooms: Vec<String>,
    #[serde(default)]
    pub details: HashMap<String, RoomDetails>,
}

pub struct RoomsClient {
    http: reqwest::Client,
    base: String,
}

impl RoomsClient {
    pub fn new(base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    /// A failure's display string is what the UI shows the user.
    pub async fn fetch_rooms(&self) -> AppResult<RoomsDoc> {
        let doc = self.http
            .get(format!("{}/api/rooms", self.base))
            .send().await?
            .error_for_status()?
            .json().await?;
        Ok(doc)
    }

    pub async fn ensure_room(&self, name: &str) -> AppResult<String> {
        let res = self.http
            .post(format!("{}/api/ensure-room/{name}", self.base))
            .send().await?;
        if !res.status().is_success() {
            let msg = res.text().await.unwrap_or_default();
            return Err(bad(if msg.is_empty() { "invalid room name".to_string() } else { msg }));
        }
        Ok(name.to_string())
    }

    /// Tries the candidate endpoints in order, ignoring failures until one
    /// answers; exhausting them all yields an empty history.
    pub async fn fetch_history(&self, room: &str) -> Vec<ChatMessage> {
        let candidates = [
            format!("{}/api/messages/{room}", self.base),
            format!("{}/api/history/{room}", self.base),
        ];
        for url in candidates {
            let Ok(res) = self.http.get(&url).send().await else { continue };
            if !res.status().is_success() {
                continue;
            }
            if let Ok(payload) = res.json::<Value>().await {
                return normalize_history(&payload);
            }
        }
        Vec::new()
    }
}
