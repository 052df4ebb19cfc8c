//! Client library: the Naming Service request/response/ACK cycle and
//! direct storage-server bulk I/O (spec §4.5, §4.7, §5), assembled
//! from `Client/Client.c`, `Client/ClientFunc.c`,
//! `Client/DirectConnFunc.c` and `Client/IndirectConnFunc.c`.
//!
//! The interactive shell those files also implement (prompt, command
//! parsing, colored output, signal handling) is explicitly out of
//! scope (spec §1); this crate exposes [`Client`] as a plain async API
//! for embedding programs to drive directly.

pub mod bulk;
pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use error::{ClientError, ClientResult};
