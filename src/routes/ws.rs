//! The relay itself: one task per connection, one forward pump per joined
//! room, room state behind [`RoomMap`].

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::models::{now_ms, ChatMessage};
use crate::proto::{ClientEvent, RoomMessage, ServerEvent};
use crate::state::{ConnId, RoomMap, Tx};

static NEXT_CONN: AtomicU64 = AtomicU64::new(1);

type Out = mpsc::UnboundedSender<String>;

pub fn router() -> Router {
    Router::new().route("/chat", get(ws_handler))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(rooms): Extension<RoomMap>,
) -> impl IntoResponse {
    ws.on_upgrade(move |s| relay(s, rooms))
}

fn send(out: &Out, ev: &ServerEvent) {
    if let Ok(frame) = serde_json::to_string(ev) {
        let _ = out.send(frame);
    }
}

fn fanout(tx: &Tx, ev: &ServerEvent) {
    if let Ok(frame) = serde_json::to_string(ev) {
        let _ = tx.send(frame);
    }
}

/* ---------------- per connection ---------------- */
async fn relay(sock: WebSocket, rooms: RoomMap) {
    let conn_id = NEXT_CONN.fetch_add(1, Ordering::Relaxed);
    let (mut sink, mut stream) = sock.split();

    let (out, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    send(&out, &ServerEvent::Hello { ts: now_ms() });
    tracing::debug!("conn {conn_id} open");

    let mut pseudo = String::from("anon");
    let mut pumps: HashMap<String, JoinHandle<()>> = HashMap::new();

    while let Some(Ok(msg)) = stream.next().await {
        let Message::Text(raw) = msg else { continue };
        let ev = match serde_json::from_str::<ClientEvent>(&raw) {
            Ok(ev) => ev,
            Err(e) => {
                tracing::debug!("conn {conn_id}: unreadable frame: {e}");
                continue;
            }
        };

        match ev {
            ClientEvent::Join { room_id, user } => {
                pseudo = user.pseudo;
                join(&rooms, &out, &mut pumps, conn_id, &room_id, &pseudo).await;
            }
            ClientEvent::LegacyJoin { pseudo: p, room_name } => {
                pseudo = p;
                join(&rooms, &out, &mut pumps, conn_id, &room_name, &pseudo).await;
            }
            ClientEvent::SendText { room_id, user, text } => {
                publish(&rooms, &room_id, ChatMessage::text(&user.pseudo, &text), false).await;
            }
            ClientEvent::LegacySend { content, room_name } => {
                publish(&rooms, &room_name, ChatMessage::text(&pseudo, &content), false).await;
            }
            ClientEvent::SendPhoto { room_id, user, data_url } => {
                publish(&rooms, &room_id, ChatMessage::photo(&user.pseudo, &data_url), true).await;
            }
            ClientEvent::GetHistory { room_name } => {
                let history = rooms.read().await
                    .get(&room_name)
                    .map(|st| st.history.clone())
                    .unwrap_or_default();
                send(&out, &ServerEvent::History(json!({
                    "roomName": room_name,
                    "history": history,
                })));
            }
        }
    }

    // disconnect: leave every joined room, stop the pumps
    {
        let mut m = rooms.write().await;
        for room in pumps.keys() {
            if let Some(st) = m.get_mut(room) {
                st.members.remove(&conn_id);
            }
        }
    }
    for pump in pumps.into_values() {
        pump.abort();
    }
    writer.abort();
    tracing::debug!("conn {conn_id} closed");
}

/// Membership, join notice, subscription, backlog — in that order. The
/// notice is published before this connection subscribes, so the joiner
/// never sees their own arrival. Rejoining an already-joined room only
/// refreshes the pseudonym and resends the backlog.
async fn join(
    rooms: &RoomMap,
    out: &Out,
    pumps: &mut HashMap<String, JoinHandle<()>>,
    conn_id: ConnId,
    room: &str,
    pseudo: &str,
) {
    let (tx, history, first_join) = {
        let mut m = rooms.write().await;
        let st = m.entry(room.to_string()).or_default();
        let first = st.members.insert(conn_id, pseudo.to_string()).is_none();
        (st.tx.clone(), st.history.clone(), first)
    };

    if first_join {
        // not appended to the backlog
        fanout(&tx, &ServerEvent::MessageNew(RoomMessage {
            room_id: room.to_string(),
            msg: ChatMessage::info(format!("{pseudo} joined")),
        }));
    }

    if !pumps.contains_key(room) {
        let mut rx = tx.subscribe();
        let out = out.clone();
        pumps.insert(room.to_string(), tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(frame) => {
                        if out.send(frame).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::debug!("room pump lagged by {n}");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }

    send(out, &ServerEvent::Joined { room_id: room.to_string(), history });
}

/// Append to the backlog and fan out to every member, sender included.
/// An unknown room is silently created.
async fn publish(rooms: &RoomMap, room: &str, msg: ChatMessage, photo: bool) {
    let tx = {
        let mut m = rooms.write().await;
        let st = m.entry(room.to_string()).or_default();
        st.history.push(msg.clone());
        st.tx.clone()
    };
    let rm = RoomMessage { room_id: room.to_string(), msg };
    let ev = if photo { ServerEvent::PhotoNew(rm) } else { ServerEvent::MessageNew(rm) };
    fanout(&tx, &ev);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ChatSocket, RoomClient, RoomsClient};
    use crate::models::Category;
    use crate::store::PwaStore;
    use std::sync::Arc;
    use std::time::Duration;

    async fn spawn_server() -> (String, RoomMap) {
        let rooms = RoomMap::default();
        let app = Router::new()
            .merge(crate::routes::router())
            .layer(Extension(rooms.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service()).await.unwrap();
        });
        (format!("127.0.0.1:{}", addr.port()), rooms)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no event within 5s")
            .expect("event stream ended")
    }

    fn temp_pwa() -> Arc<PwaStore> {
        Arc::new(PwaStore::open(
            std::env::temp_dir().join(format!("chat_relay_test_{}", uuid::Uuid::new_v4())),
        ))
    }

    #[tokio::test]
    async fn relay_round_trip_persists_on_the_client() {
        let (addr, _rooms) = spawn_server().await;
        let store = temp_pwa();

        let (socket, mut events) = ChatSocket::connect(&format!("ws://{addr}/ws/chat"))
            .await
            .unwrap();
        let mut client = RoomClient::new("r1", "alice", store.clone());
        client.try_join(&socket);

        let ev = next_event(&mut events).await;
        assert!(matches!(ev, ServerEvent::Hello { .. }));

        let ev = next_event(&mut events).await;
        let ServerEvent::Joined { ref room_id, ref history } = ev else {
            panic!("expected room:joined, got {ev:?}");
        };
        assert_eq!(room_id, "r1");
        assert!(history.is_empty());
        client.handle_event(&ev);

        // reply to the history request; empty for a fresh room
        let ev = next_event(&mut events).await;
        assert!(matches!(ev, ServerEvent::History(_)));
        client.handle_event(&ev);

        assert!(client.send_message(&socket, "hi"));
        let ev = next_event(&mut events).await;
        let ServerEvent::MessageNew(ref rm) = ev else {
            panic!("expected message:new, got {ev:?}");
        };
        assert_eq!(rm.msg.pseudo, "alice");
        assert_eq!(rm.msg.content, "hi");
        client.handle_event(&ev);

        assert_eq!(client.messages().len(), 1);
        let persisted = store.room_history("r1");
        assert_eq!(persisted.messages.len(), 1);
        assert_eq!(persisted.messages[0].content, "hi");
    }

    #[tokio::test]
    async fn join_notice_reaches_others_but_not_the_joiner() {
        let (addr, _rooms) = spawn_server().await;
        let url = format!("ws://{addr}/ws/chat");

        let (sock_a, mut ev_a) = ChatSocket::connect(&url).await.unwrap();
        let mut alice = RoomClient::new("r1", "alice", temp_pwa());
        alice.try_join(&sock_a);
        for _ in 0..3 {
            // hello, room:joined, chat-history
            let ev = next_event(&mut ev_a).await;
            assert!(!matches!(ev, ServerEvent::MessageNew(_)));
        }

        let (sock_b, mut ev_b) = ChatSocket::connect(&url).await.unwrap();
        let mut bob = RoomClient::new("r1", "bob", temp_pwa());
        bob.try_join(&sock_b);

        // alice sees the system notice about bob
        let ev = next_event(&mut ev_a).await;
        let ServerEvent::MessageNew(rm) = ev else { panic!("expected notice, got {ev:?}") };
        assert_eq!(rm.msg.category, Category::Info);
        assert_eq!(rm.msg.pseudo, "system");
        assert!(rm.msg.content.contains("bob"));

        // bob only sees his own join sequence, no notice
        for _ in 0..3 {
            let ev = next_event(&mut ev_b).await;
            assert!(!matches!(ev, ServerEvent::MessageNew(_)));
        }
    }

    #[tokio::test]
    async fn management_api_and_http_history_fallback() {
        let (addr, rooms) = spawn_server().await;
        let api = RoomsClient::new(&format!("http://{addr}"));

        api.ensure_room("abc-1").await.unwrap();
        assert!(api.ensure_room("abc def").await.is_err());
        assert!(api.ensure_room(&"a".repeat(33)).await.is_err());

        let doc = api.fetch_rooms().await.unwrap();
        assert_eq!(doc.rooms, vec!["abc-1"]);
        assert_eq!(doc.details["abc-1"].clients_count, 0);

        rooms.write().await
            .entry("abc-1".to_string())
            .or_default()
            .history
            .push(ChatMessage::text("bob", "hey"));

        // /api/messages/:room does not exist; the fallback lands on /api/history/:room
        let history = api.fetch_history("abc-1").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hey");

        assert!(api.fetch_history("ghost").await.is_empty());
    }

    #[tokio::test]
    async fn legacy_events_drive_the_same_room() {
        let (addr, rooms) = spawn_server().await;
        let (socket, mut events) = ChatSocket::connect(&format!("ws://{addr}/ws/chat"))
            .await
            .unwrap();

        // speak the old chat-* dialect directly
        socket.emit(&ClientEvent::LegacyJoin { pseudo: "carol".into(), room_name: "r9".into() });
        socket.emit(&ClientEvent::LegacySend { content: "old style".into(), room_name: "r9".into() });

        let mut got_message = false;
        for _ in 0..4 {
            if let ServerEvent::MessageNew(rm) = next_event(&mut events).await {
                assert_eq!(rm.room_id, "r9");
                assert_eq!(rm.msg.pseudo, "carol");
                assert_eq!(rm.msg.content, "old style");
                got_message = true;
                break;
            }
        }
        assert!(got_message);

        let m = rooms.read().await;
        assert_eq!(m["r9"].history.len(), 1);
        assert_eq!(m["r9"].members.len(), 1);
    }
}
