//! Wire protocol: JSON frames `{ "event": <name>, "data": <payload> }`.
//!
//! The canonical family is `room:*` / `message:*` / `photo:*`; the older
//! `chat-*` names are kept as inbound aliases so either front-end variant
//! can talk to this server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ChatMessage;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserRef {
    pub pseudo: String,
}

/* ---------------- client → server ---------------- */
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "room:join", rename_all = "camelCase")]
    Join { room_id: String, user: UserRef },

    #[serde(rename = "message:send", rename_all = "camelCase")]
    SendText { room_id: String, user: UserRef, text: String },

    #[serde(rename = "photo:send", rename_all = "camelCase")]
    SendPhoto { room_id: String, user: UserRef, data_url: String },

    #[serde(rename = "chat-get-history", rename_all = "camelCase")]
    GetHistory { room_name: String },

    // legacy aliases
    #[serde(rename = "chat-join-room", rename_all = "camelCase")]
    LegacyJoin { pseudo: String, room_name: String },

    #[serde(rename = "chat-msg", rename_all = "camelCase")]
    LegacySend { content: String, room_name: String },
}

/* ---------------- server → client ---------------- */
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "hello")]
    Hello { ts: i64 },

    #[serde(rename = "room:joined", rename_all = "camelCase")]
    Joined { room_id: String, history: Vec<ChatMessage> },

    #[serde(rename = "message:new")]
    MessageNew(RoomMessage),

    #[serde(rename = "photo:new")]
    PhotoNew(RoomMessage),

    /// Reply to `chat-get-history`. Left as a raw value: servers in the
    /// wild answer with `{roomName, history}` or a bare array.
    #[serde(rename = "chat-history")]
    History(Value),
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RoomMessage {
    #[serde(rename = "roomId")]
    pub room_id: String,
    #[serde(flatten)]
    pub msg: ChatMessage,
}
