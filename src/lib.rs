//! Room-scoped chat relay and its offline-first client.
//!
//! The server half ([`routes`], [`state`]) relays JSON events between room
//! members and keeps a per-room backlog in memory. The client half
//! ([`client`], [`store`]) joins rooms, reconciles server history with the
//! local cache, and persists capped per-room histories for offline viewing.

pub mod client;
pub mod error;
pub mod models;
pub mod proto;
pub mod routes;
pub mod state;
pub mod store;
