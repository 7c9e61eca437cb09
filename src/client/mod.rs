//! The PWA-side half: websocket handle, per-room subscription state, and
//! the management-API client.

pub mod room;
pub mod rooms;
pub mod socket;

pub use room::RoomClient;
pub use rooms::RoomsClient;
pub use socket::ChatSocket;

use serde_json::Value;

use crate::models::{now_ms, Category, ChatMessage, Kind};

/// A backlog payload arrives wrapped (`{history: [...]}`, `{messages: ...}`,
/// `{data: ...}`) or as a bare array, with messages in either shape seen on
/// the wire. Unusable elements are dropped.
pub fn normalize_history(payload: &Value) -> Vec<ChatMessage> {
    let items = if let Some(arr) = payload.as_array() {
        arr
    } else if let Some(arr) = payload.get("history").and_then(Value::as_array) {
        arr
    } else if let Some(arr) = payload.get("messages").and_then(Value::as_array) {
        arr
    } else if let Some(arr) = payload.get("data").and_then(Value::as_array) {
        arr
    } else {
        return Vec::new();
    };
    items.iter().filter_map(coerce_message).collect()
}

fn coerce_message(v: &Value) -> Option<ChatMessage> {
    if let Ok(msg) = serde_json::from_value::<ChatMessage>(v.clone()) {
        return Some(msg);
    }

    let pseudo = v
        .get("user").and_then(|u| u.get("pseudo")).and_then(Value::as_str)
        .or_else(|| v.get("user").and_then(Value::as_str))
        .or_else(|| v.get("pseudo").and_then(Value::as_str))
        .unwrap_or("unknown");

    let (content, kind) = if let Some(t) = v.get("text").and_then(Value::as_str) {
        (t, Kind::Text)
    } else if let Some(c) = v.get("content").and_then(Value::as_str) {
        (c, Kind::Text)
    } else if let Some(d) = v.get("dataUrl").and_then(Value::as_str) {
        (d, Kind::Photo)
    } else {
        return None;
    };

    Some(ChatMessage {
        pseudo: pseudo.into(),
        content: content.into(),
        kind,
        category: Category::Message,
        ts: v.get("ts").and_then(Value::as_i64).unwrap_or_else(now_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_and_wrapped_arrays() {
        let bare = json!([{"pseudo":"a","content":"x","kind":"text","category":"MESSAGE","ts":1}]);
        assert_eq!(normalize_history(&bare).len(), 1);

        let wrapped = json!({"roomName":"r1","history":[
            {"pseudo":"a","content":"x","kind":"text","category":"MESSAGE","ts":1}
        ]});
        assert_eq!(normalize_history(&wrapped).len(), 1);

        assert!(normalize_history(&json!({"nothing":"here"})).is_empty());
        assert!(normalize_history(&json!(null)).is_empty());
    }

    #[test]
    fn foreign_shapes_are_coerced() {
        let legacy = json!([
            {"roomId":"r1","user":"bob","text":"hello","kind":"text","ts":5},
            {"user":{"pseudo":"eve"},"dataUrl":"data:image/jpeg;base64,zz","ts":6},
            {"ts":7}
        ]);
        let msgs = normalize_history(&legacy);
        assert_eq!(msgs.len(), 2);                      // bodyless element dropped
        assert_eq!(msgs[0].pseudo, "bob");
        assert_eq!(msgs[0].content, "hello");
        assert_eq!(msgs[1].pseudo, "eve");
        assert_eq!(msgs[1].kind, Kind::Photo);
    }
}
