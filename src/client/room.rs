//! Per-room subscription: Disconnected → Joining → Joined, with history
//! reconciliation against the local cache.

use std::collections::HashSet;
use std::sync::Arc;

use crate::client::{normalize_history, ChatSocket};
use crate::models::ChatMessage;
use crate::proto::{ClientEvent, ServerEvent, UserRef};
use crate::store::cache::RoomHistory;
use crate::store::PwaStore;

pub struct RoomClient {
    room: String,
    pseudo: String,
    joined: bool,
    messages: Vec<ChatMessage>,
    store: Arc<PwaStore>,
}

impl RoomClient {
    /// Seeds the in-memory history from the local cache, so the room is
    /// readable before (or without) a connection.
    pub fn new(room: &str, pseudo: &str, store: Arc<PwaStore>) -> Self {
        let messages = store.room_history(room).messages;
        Self { room: room.into(), pseudo: pseudo.into(), joined: false, messages, store }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn has_joined(&self) -> bool {
        self.joined
    }

    /// Idempotent join: emits the join request and one history request at
    /// most once per (connection, room, user). No-op while the socket is
    /// down or either identifier is blank.
    pub fn try_join(&mut self, socket: &ChatSocket) {
        if self.joined || !socket.is_open() {
            return;
        }
        let room = self.room.trim();
        let pseudo = self.pseudo.trim();
        if room.is_empty() || pseudo.is_empty() {
            return;
        }

        socket.emit(&ClientEvent::Join {
            room_id: room.into(),
            user: UserRef { pseudo: pseudo.into() },
        });
        socket.emit(&ClientEvent::GetHistory { room_name: room.into() });
        self.joined = true;
    }

    /// Call after a reconnect so the next `try_join` goes out again.
    pub fn reset_join(&mut self) {
        self.joined = false;
    }

    pub fn set_pseudo(&mut self, pseudo: &str) {
        if pseudo != self.pseudo {
            self.pseudo = pseudo.into();
            self.joined = false;
        }
    }

    /// Changing rooms reloads the cache for the new room and clears the
    /// joined flag.
    pub fn switch_room(&mut self, room: &str) {
        if room != self.room {
            self.room = room.into();
            self.messages = self.store.room_history(room).messages;
            self.joined = false;
        }
    }

    pub fn handle_event(&mut self, ev: &ServerEvent) {
        match ev {
            ServerEvent::Joined { room_id, history } if *room_id == self.room => {
                self.merge_history(history.clone());
            }
            ServerEvent::History(payload) => {
                if let Some(name) = payload.get("roomName").and_then(|v| v.as_str()) {
                    if name != self.room {
                        return;
                    }
                }
                self.merge_history(normalize_history(payload));
            }
            ServerEvent::MessageNew(rm) | ServerEvent::PhotoNew(rm) if rm.room_id == self.room => {
                self.messages.push(rm.msg.clone());
                self.persist();
            }
            _ => {}
        }
    }

    /// Backlog first, then the cached messages, keeping the first
    /// occurrence of each (ts, pseudo, content) triple. The result replaces
    /// both the in-memory list and the persisted cache.
    fn merge_history(&mut self, backlog: Vec<ChatMessage>) {
        if backlog.is_empty() {
            return;
        }
        let mut seen = HashSet::new();
        let mut merged = Vec::with_capacity(backlog.len() + self.messages.len());
        for msg in backlog.into_iter().chain(std::mem::take(&mut self.messages)) {
            if seen.insert((msg.ts, msg.pseudo.clone(), msg.content.clone())) {
                merged.push(msg);
            }
        }
        self.messages = merged;
        self.persist();
    }

    /// Trims the text and drops empty sends. The message is not appended
    /// locally; it comes back through the server echo.
    pub fn send_message(&self, socket: &ChatSocket, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        socket.emit(&ClientEvent::SendText {
            room_id: self.room.clone(),
            user: UserRef { pseudo: self.pseudo.clone() },
            text: text.into(),
        })
    }

    pub fn send_photo(&self, socket: &ChatSocket, data_url: &str) -> bool {
        socket.emit(&ClientEvent::SendPhoto {
            room_id: self.room.clone(),
            user: UserRef { pseudo: self.pseudo.clone() },
            data_url: data_url.into(),
        })
    }

    fn persist(&self) {
        self.store.save_room_history(RoomHistory {
            room_name: self.room.clone(),
            messages: self.messages.clone(),
            updated_at: String::new(),      // stamped on save
        });
    }
}
