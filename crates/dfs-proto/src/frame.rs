//! Fixed-size wire frames (spec §6).
//!
//! Every record is encoded as a sequence of big-endian integers
//! followed/interleaved with a fixed-width, NUL-padded byte field for
//! path/data payloads, mirroring the teacher's XDR serializer
//! (`src/serializer/mod.rs`) without its 4-byte alignment padding,
//! since these records are plain C-struct frames, not XDR.

use crate::MAX_BUFFER_SIZE;
use crate::ops::{AckFlag, ErrorCode, Operation, ResponseFlag};

/// `REQUEST` (client→NS, client→SS, NS→SS).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub operation: Operation,
    pub client_id: u64,
    pub path: String,
    pub flags: i32,
}

impl Request {
    pub fn new(operation: Operation, client_id: u64, path: impl Into<String>, flags: i32) -> Self {
        Self { operation, client_id, path: path.into(), flags }
    }
}

/// `RESPONSE` (NS→client, SS→client, SS→NS).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub operation: Operation,
    pub error_code: ErrorCode,
    pub data: String,
    pub flags: ResponseFlag,
    pub server_id: u64,
}

impl Response {
    pub fn success(operation: Operation, data: impl Into<String>, server_id: u64) -> Self {
        Self {
            operation,
            error_code: ErrorCode::Success,
            data: data.into(),
            flags: ResponseFlag::Success,
            server_id,
        }
    }

    pub fn backup(operation: Operation, data: impl Into<String>, server_id: u64) -> Self {
        Self {
            operation,
            error_code: ErrorCode::Success,
            data: data.into(),
            flags: ResponseFlag::BackupResponse,
            server_id,
        }
    }

    pub fn failure(operation: Operation, error_code: ErrorCode) -> Self {
        Self {
            operation,
            error_code,
            data: String::new(),
            flags: ResponseFlag::Failure,
            server_id: 0,
        }
    }
}

/// `ACK` (NS→client, after an SS-forwarded mutation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub error_code: ErrorCode,
    pub data: String,
    pub flags: AckFlag,
}

impl Ack {
    pub fn success(data: impl Into<String>) -> Self {
        Self { error_code: ErrorCode::Success, data: data.into(), flags: AckFlag::Success }
    }

    pub fn failure(error_code: ErrorCode, data: impl Into<String>) -> Self {
        Self { error_code, data: data.into(), flags: AckFlag::Failure }
    }
}

/// `STORAGE_SERVER_INIT` (SS→NS, once at registration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageServerInit {
    pub client_port: u16,
    pub ns_port: u16,
    /// `\n`-terminated list of mount-relative paths this SS exports.
    pub mount_paths: String,
}

impl StorageServerInit {
    /// Splits [`Self::mount_paths`] into its component tokens, dropping
    /// any trailing empty segment produced by the terminating `\n`.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.mount_paths.split('\n').filter(|s| !s.is_empty())
    }
}

/// `PATH_INFO` (SS→client, after an INFO `RESPONSE`).
///
/// Per REDESIGN FLAGS §9, size and timestamp fields are widened to
/// 64-bit since this implementation never interoperates with the
/// original 32-bit-`int` C peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    pub path: String,
    pub path_type: u32,
    pub size: u64,
    pub permission: u32,
    pub ctime: i64,
    pub mtime: i64,
    pub atime: i64,
    pub links: u32,
}

pub(crate) fn truncate_field(s: &str) -> &str {
    if s.len() > MAX_BUFFER_SIZE { &s[..MAX_BUFFER_SIZE] } else { s }
}
