//! Wire protocol, shared constants and ambient plumbing for the
//! distributed file system's three cooperating roles (Naming Service,
//! Storage Server, Client).
//!
//! This crate owns everything the spec calls out as part of the wire
//! contract in its own §6: fixed-size frames, operation/error codes,
//! and the codec that reads and writes them over a `TcpStream`. It also
//! carries the ambient concerns (logging, config) shared by every
//! binary in the workspace.

pub mod codec;
pub mod config;
pub mod frame;
pub mod ids;
pub mod logging;
pub mod ops;
pub mod sentinel;

pub use codec::{BULK_FRAME_LEN, FrameError, FrameResult, read_buffer_frame, write_buffer_frame};
pub use frame::{Ack, PathInfo, Request, Response, StorageServerInit};
pub use ops::{AckFlag, ErrorCode, Operation, RequestFlag, ResponseFlag};

/// Maximum length in bytes of the `path`/`data` fields in every frame.
pub const MAX_BUFFER_SIZE: usize = 1024;

/// Maximum length of a single path token (the segment between `/`s).
pub const TOKEN_MAX: usize = 32;

/// Default NS port that accepts client connections.
pub const NS_CLIENT_PORT: u16 = 8080;

/// Default NS port that accepts storage server connections.
pub const NS_SERVER_PORT: u16 = 8081;

/// Default loopback address the reference deployment binds to.
pub const LOCAL_MACHINE_IP: &str = "127.0.0.1";

/// Number of backup replicas assigned to each storage server (may be 0).
pub const DEFAULT_BACKUP_SERVERS: usize = 1;

/// Fixed capacity of the NS resolution cache.
pub const DEFAULT_CACHE_SIZE: usize = 128;

/// Client polling interval against the NS liveness link.
pub const POLL_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

/// Backoff between client reconnect attempts after a lost NS link.
pub const SLEEP_TIME: std::time::Duration = std::time::Duration::from_secs(5);

/// Retries the NS performs when opening its reverse connection to a new SS.
pub const MAX_CONN_REQ: u32 = 10;

/// Delay between NS→SS reverse-connect retries.
pub const CONN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);
