use std::{collections::HashMap, sync::Arc};
use tokio::sync::{broadcast, RwLock};

use crate::models::ChatMessage;

pub type Tx = broadcast::Sender<String>;

/// Per-connection id handed out by the ws route.
pub type ConnId = u64;

/* ------------ room registry ------------ */
pub struct RoomState {
    pub tx:      Tx,                          // fan-out to connected members
    pub members: HashMap<ConnId, String>,     // conn id -> pseudo
    pub history: Vec<ChatMessage>,            // append-only backlog
}

impl Default for RoomState {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx, members: HashMap::new(), history: Vec::new() }
    }
}

/// Rooms are created implicitly on first join/send/ensure; state lives only
/// in process memory and is lost on restart.
pub type RoomMap = Arc<RwLock<HashMap<String, RoomState>>>;
