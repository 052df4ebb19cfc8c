//! Operation codes, flags and error codes from spec §6.

use num_derive::{FromPrimitive, ToPrimitive};

/// Operation carried in a [`crate::frame::Request`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(i32)]
pub enum Operation {
    Read = 1,
    Write = 2,
    Create = 3,
    Delete = 4,
    Info = 5,
    List = 6,
    Move = 7,
    Copy = 8,
    Rename = 9,
    CloseConnection = 10,
}

/// Flag on a [`crate::frame::Response`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(i32)]
pub enum ResponseFlag {
    Success = 0,
    Failure = -1,
    BackupResponse = 1,
}

/// Flag on a write [`crate::frame::Request`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(i32)]
pub enum RequestFlag {
    Append = 0,
    Overwrite = 1,
}

/// Flag on an [`crate::frame::Ack`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(i32)]
pub enum AckFlag {
    Success = 0,
    Failure = -1,
}

/// Naming-Service-side error codes (spec §6).
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 200,
    PathNotFound = 201,
    InvalidOperation = 202,
    ServerUnavailable = 203,
    BackupUnavailable = 204,
    ErrorGettingMountPaths = 205,
    FwdFailed = 206,
    // Storage-server-side codes (spec §6), kept in the same wire space
    // since RESPONSE.error_code travels across both roles unmodified.
    InvalidPath = 300,
    InvalidFlag = 301,
    InvalidAccess = 302,
    InvalidAuthentication = 303,
}
