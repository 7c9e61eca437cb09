//! Management API: room listing, registration, HTTP history fallback.

use axum::{
    extract::Path,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};

use crate::error::{AppErr, AppResult};
use crate::state::RoomMap;

pub fn router() -> Router {
    Router::new()
        .route("/rooms", get(list_rooms))
        .route("/ensure-room/:name", post(ensure_room))
        .route("/history/:room", get(room_history))
}

/// `[a-zA-Z0-9_-]{1,32}`, surrounding whitespace stripped.
pub fn valid_room_name(raw: &str) -> Option<&str> {
    let name = raw.trim();
    if name.is_empty() || name.len() > 32 {
        return None;
    }
    if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
        return None;
    }
    Some(name)
}

async fn list_rooms(Extension(rooms): Extension<RoomMap>) -> Json<Value> {
    let m = rooms.read().await;
    let mut names: Vec<&String> = m.keys().collect();
    names.sort();

    let details: serde_json::Map<String, Value> = names.iter()
        .map(|n| ((*n).clone(), json!({ "clientsCount": m[*n].members.len() })))
        .collect();

    Json(json!({ "rooms": names, "details": details }))
}

async fn ensure_room(
    Path(raw): Path<String>,
    Extension(rooms): Extension<RoomMap>,
) -> AppResult<Json<Value>> {
    let Some(name) = valid_room_name(&raw) else {
        return Err(AppErr::Bad("invalid room name".into()));
    };
    rooms.write().await.entry(name.to_string()).or_default();
    Ok(Json(json!({ "ok": true, "name": name })))
}

async fn room_history(
    Path(room): Path<String>,
    Extension(rooms): Extension<RoomMap>,
) -> Json<Value> {
    let m = rooms.read().await;
    let history = m.get(&room).map(|st| st.history.clone()).unwrap_or_default();
    Json(json!({ "room": room, "history": history }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_name_rules() {
        assert_eq!(valid_room_name("abc-1"), Some("abc-1"));
        assert_eq!(valid_room_name("under_score"), Some("under_score"));
        assert_eq!(valid_room_name("  padded  "), Some("padded"));

        assert_eq!(valid_room_name("abc def"), None);
        assert_eq!(valid_room_name(&"a".repeat(33)), None);
        assert_eq!(valid_room_name(""), None);
        assert_eq!(valid_room_name("éclair"), None);
    }

    #[tokio::test]
    async fn listing_and_registration() {
        let rooms = RoomMap::default();

        let Json(v) = list_rooms(Extension(rooms.clone())).await;
        assert_eq!(v["rooms"], json!([]));

        ensure_room(Path("beta".into()), Extension(rooms.clone())).await.unwrap();
        ensure_room(Path("alpha".into()), Extension(rooms.clone())).await.unwrap();
        // registering twice is fine
        ensure_room(Path("alpha".into()), Extension(rooms.clone())).await.unwrap();

        let Json(v) = list_rooms(Extension(rooms.clone())).await;
        assert_eq!(v["rooms"], json!(["alpha", "beta"]));
        assert_eq!(v["details"]["alpha"]["clientsCount"], 0);

        let err = ensure_room(Path("abc def".into()), Extension(rooms)).await;
        assert!(matches!(err, Err(AppErr::Bad(_))));
    }

    #[tokio::test]
    async fn history_of_unknown_room_is_empty() {
        let rooms = RoomMap::default();
        let Json(v) = room_history(Path("ghost".into()), Extension(rooms)).await;
        assert_eq!(v["room"], "ghost");
        assert_eq!(v["history"], json!([]));
    }
}
