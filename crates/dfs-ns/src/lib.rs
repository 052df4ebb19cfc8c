//! Naming Service: authoritative mount namespace, server/client
//! registries, and request dispatch (spec §4.1-§4.5).

pub mod cache;
pub mod client_registry;
pub mod client_task;
pub mod context;
pub mod dispatch;
pub mod handle;
pub mod handshake;
pub mod outgoing;
pub mod registry;
pub mod server;
pub mod trie;

pub use context::NsContext;
