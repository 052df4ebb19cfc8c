//! Async encode/decode of the fixed-size frames in [`crate::frame`].
//!
//! Each frame is read into an exact-size byte buffer with
//! [`tokio::io::AsyncReadExt::read_exact`] and then decoded
//! synchronously with `byteorder`, and encoded the same way in reverse —
//! keeping the async I/O boundary and the byte-level parsing separate.

use std::io::{self, Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use num_traits::{FromPrimitive, ToPrimitive};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::MAX_BUFFER_SIZE;
use crate::frame::{Ack, PathInfo, Request, Response, StorageServerInit, truncate_field};
use crate::ops::{AckFlag, ErrorCode, Operation, ResponseFlag};

pub type FrameResult<T> = Result<T, FrameError>;

/// Errors surfaced while decoding a frame off the wire.
///
/// A short/zero-byte read is treated as connection-fatal: callers tear
/// the connection down rather than try to resynchronize mid-frame.
#[derive(Debug)]
pub enum FrameError {
    Io(io::Error),
    UnknownOperation(i32),
    UnknownResponseFlag(i32),
    UnknownAckFlag(i32),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Io(e) => write!(f, "frame io error: {e}"),
            FrameError::UnknownOperation(v) => write!(f, "unknown operation code: {v}"),
            FrameError::UnknownResponseFlag(v) => write!(f, "unknown response flag: {v}"),
            FrameError::UnknownAckFlag(v) => write!(f, "unknown ack flag: {v}"),
        }
    }
}

impl std::error::Error for FrameError {}

impl From<io::Error> for FrameError {
    fn from(e: io::Error) -> Self {
        FrameError::Io(e)
    }
}

const REQUEST_LEN: usize = 4 + 8 + MAX_BUFFER_SIZE + 4;
const RESPONSE_LEN: usize = 4 + 4 + MAX_BUFFER_SIZE + 4 + 8;
const ACK_LEN: usize = 4 + MAX_BUFFER_SIZE + 4;
const INIT_LEN: usize = 4 + 4 + MAX_BUFFER_SIZE;
const PATH_INFO_LEN: usize = MAX_BUFFER_SIZE + 4 + 8 + 4 + 8 + 8 + 8 + 4;

fn write_fixed_field(dest: &mut impl Write, s: &str) -> io::Result<()> {
    let s = truncate_field(s);
    let mut buf = [0u8; MAX_BUFFER_SIZE];
    let bytes = s.as_bytes();
    buf[..bytes.len()].copy_from_slice(bytes);
    dest.write_all(&buf)
}

fn read_fixed_field(src: &mut impl Read) -> io::Result<String> {
    let mut buf = [0u8; MAX_BUFFER_SIZE];
    src.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

fn operation_from_i32(v: i32) -> FrameResult<Operation> {
    Operation::from_i32(v).ok_or(FrameError::UnknownOperation(v))
}

fn error_code_from_i32(v: i32) -> ErrorCode {
    // An unrecognized error code on the wire is treated as an opaque
    // internal failure rather than a framing violation: the connection
    // stays usable and the caller sees a generic failure.
    ErrorCode::from_i32(v).unwrap_or(ErrorCode::ServerUnavailable)
}

impl Request {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(REQUEST_LEN);
        buf.write_i32::<BigEndian>(self.operation.to_i32().unwrap()).unwrap();
        buf.write_u64::<BigEndian>(self.client_id).unwrap();
        write_fixed_field(&mut buf, &self.path).unwrap();
        buf.write_i32::<BigEndian>(self.flags).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> FrameResult<Self> {
        let mut cur = Cursor::new(bytes);
        let operation = operation_from_i32(cur.read_i32::<BigEndian>()?)?;
        let client_id = cur.read_u64::<BigEndian>()?;
        let path = read_fixed_field(&mut cur)?;
        let flags = cur.read_i32::<BigEndian>()?;
        Ok(Self { operation, client_id, path, flags })
    }

    pub async fn read_from<R: AsyncRead + Unpin>(src: &mut R) -> FrameResult<Self> {
        let mut buf = vec![0u8; REQUEST_LEN];
        src.read_exact(&mut buf).await?;
        Self::decode(&buf)
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, dest: &mut W) -> FrameResult<()> {
        dest.write_all(&self.encode()).await?;
        Ok(())
    }
}

impl Response {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RESPONSE_LEN);
        buf.write_i32::<BigEndian>(self.operation.to_i32().unwrap()).unwrap();
        buf.write_i32::<BigEndian>(self.error_code.to_i32().unwrap()).unwrap();
        write_fixed_field(&mut buf, &self.data).unwrap();
        buf.write_i32::<BigEndian>(self.flags.to_i32().unwrap()).unwrap();
        buf.write_u64::<BigEndian>(self.server_id).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> FrameResult<Self> {
        let mut cur = Cursor::new(bytes);
        let operation = operation_from_i32(cur.read_i32::<BigEndian>()?)?;
        let error_code = error_code_from_i32(cur.read_i32::<BigEndian>()?);
        let data = read_fixed_field(&mut cur)?;
        let flags_raw = cur.read_i32::<BigEndian>()?;
        let flags =
            ResponseFlag::from_i32(flags_raw).ok_or(FrameError::UnknownResponseFlag(flags_raw))?;
        let server_id = cur.read_u64::<BigEndian>()?;
        Ok(Self { operation, error_code, data, flags, server_id })
    }

    pub async fn read_from<R: AsyncRead + Unpin>(src: &mut R) -> FrameResult<Self> {
        let mut buf = vec![0u8; RESPONSE_LEN];
        src.read_exact(&mut buf).await?;
        Self::decode(&buf)
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, dest: &mut W) -> FrameResult<()> {
        dest.write_all(&self.encode()).await?;
        Ok(())
    }
}

impl Ack {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ACK_LEN);
        buf.write_i32::<BigEndian>(self.error_code.to_i32().unwrap()).unwrap();
        write_fixed_field(&mut buf, &self.data).unwrap();
        buf.write_i32::<BigEndian>(self.flags.to_i32().unwrap()).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> FrameResult<Self> {
        let mut cur = Cursor::new(bytes);
        let error_code = error_code_from_i32(cur.read_i32::<BigEndian>()?);
        let data = read_fixed_field(&mut cur)?;
        let flags_raw = cur.read_i32::<BigEndian>()?;
        let flags = AckFlag::from_i32(flags_raw).ok_or(FrameError::UnknownAckFlag(flags_raw))?;
        Ok(Self { error_code, data, flags })
    }

    pub async fn read_from<R: AsyncRead + Unpin>(src: &mut R) -> FrameResult<Self> {
        let mut buf = vec![0u8; ACK_LEN];
        src.read_exact(&mut buf).await?;
        Self::decode(&buf)
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, dest: &mut W) -> FrameResult<()> {
        dest.write_all(&self.encode()).await?;
        Ok(())
    }
}

impl StorageServerInit {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(INIT_LEN);
        buf.write_i32::<BigEndian>(self.client_port as i32).unwrap();
        buf.write_i32::<BigEndian>(self.ns_port as i32).unwrap();
        write_fixed_field(&mut buf, &self.mount_paths).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> FrameResult<Self> {
        let mut cur = Cursor::new(bytes);
        let client_port = cur.read_i32::<BigEndian>()? as u16;
        let ns_port = cur.read_i32::<BigEndian>()? as u16;
        let mount_paths = read_fixed_field(&mut cur)?;
        Ok(Self { client_port, ns_port, mount_paths })
    }

    pub async fn read_from<R: AsyncRead + Unpin>(src: &mut R) -> FrameResult<Self> {
        let mut buf = vec![0u8; INIT_LEN];
        src.read_exact(&mut buf).await?;
        Self::decode(&buf)
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, dest: &mut W) -> FrameResult<()> {
        dest.write_all(&self.encode()).await?;
        Ok(())
    }
}

impl PathInfo {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PATH_INFO_LEN);
        write_fixed_field(&mut buf, &self.path).unwrap();
        buf.write_u32::<BigEndian>(self.path_type).unwrap();
        buf.write_u64::<BigEndian>(self.size).unwrap();
        buf.write_u32::<BigEndian>(self.permission).unwrap();
        buf.write_i64::<BigEndian>(self.ctime).unwrap();
        buf.write_i64::<BigEndian>(self.mtime).unwrap();
        buf.write_i64::<BigEndian>(self.atime).unwrap();
        buf.write_u32::<BigEndian>(self.links).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> FrameResult<Self> {
        let mut cur = Cursor::new(bytes);
        let path = read_fixed_field(&mut cur)?;
        let path_type = cur.read_u32::<BigEndian>()?;
        let size = cur.read_u64::<BigEndian>()?;
        let permission = cur.read_u32::<BigEndian>()?;
        let ctime = cur.read_i64::<BigEndian>()?;
        let mtime = cur.read_i64::<BigEndian>()?;
        let atime = cur.read_i64::<BigEndian>()?;
        let links = cur.read_u32::<BigEndian>()?;
        Ok(Self { path, path_type, size, permission, ctime, mtime, atime, links })
    }

    pub async fn read_from<R: AsyncRead + Unpin>(src: &mut R) -> FrameResult<Self> {
        let mut buf = vec![0u8; PATH_INFO_LEN];
        src.read_exact(&mut buf).await?;
        Self::decode(&buf)
    }

    pub async fn write_to<W: AsyncWrite + Unpin>(&self, dest: &mut W) -> FrameResult<()> {
        dest.write_all(&self.encode()).await?;
        Ok(())
    }
}

/// Size in bytes of a bulk-transfer payload/sentinel frame (spec §6).
pub const BULK_FRAME_LEN: usize = MAX_BUFFER_SIZE;

/// Writes one fixed-size bulk-transfer frame, zero-padding `bytes` (or
/// truncating it) to exactly [`BULK_FRAME_LEN`]. Shared by the storage
/// server and the client for both directions of READ/WRITE/INFO's data
/// channel (spec §6).
pub async fn write_buffer_frame<W: AsyncWrite + Unpin>(dest: &mut W, bytes: &[u8]) -> FrameResult<()> {
    let mut buf = [0u8; BULK_FRAME_LEN];
    let n = bytes.len().min(BULK_FRAME_LEN);
    buf[..n].copy_from_slice(&bytes[..n]);
    dest.write_all(&buf).await?;
    Ok(())
}

/// Reads one fixed-size bulk-transfer frame.
pub async fn read_buffer_frame<R: AsyncRead + Unpin>(src: &mut R) -> FrameResult<[u8; BULK_FRAME_LEN]> {
    let mut buf = [0u8; BULK_FRAME_LEN];
    src.read_exact(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let req = Request::new(Operation::Read, 42, "/a/f1", 0);
        let bytes = req.encode();
        assert_eq!(bytes.len(), REQUEST_LEN);
        let decoded = Request::decode(&bytes).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn response_round_trips_all_flags() {
        for (flag, code) in [
            (ResponseFlag::Success, ErrorCode::Success),
            (ResponseFlag::Failure, ErrorCode::PathNotFound),
            (ResponseFlag::BackupResponse, ErrorCode::Success),
        ] {
            let resp = Response {
                operation: Operation::Read,
                error_code: code,
                data: "127.0.0.1 9090".to_string(),
                flags: flag,
                server_id: 7,
            };
            let bytes = resp.encode();
            assert_eq!(bytes.len(), RESPONSE_LEN);
            let decoded = Response::decode(&bytes).unwrap();
            assert_eq!(decoded, resp);
        }
    }

    #[test]
    fn overlong_path_is_truncated_not_panicking() {
        let long = "a".repeat(MAX_BUFFER_SIZE * 2);
        let req = Request::new(Operation::Read, 1, long.clone(), 0);
        let bytes = req.encode();
        assert_eq!(bytes.len(), REQUEST_LEN);
        let decoded = Request::decode(&bytes).unwrap();
        assert_eq!(decoded.path.len(), MAX_BUFFER_SIZE);
    }

    #[test]
    fn storage_server_init_paths_split_on_newline() {
        let init = StorageServerInit {
            client_port: 9090,
            ns_port: 9091,
            mount_paths: "./a/f1\n./a/f2\n./b/g1\n".to_string(),
        };
        let parsed: Vec<&str> = init.paths().collect();
        assert_eq!(parsed, vec!["./a/f1", "./a/f2", "./b/g1"]);
    }

    #[test]
    fn path_info_round_trips() {
        let info = PathInfo {
            path: "/a/f1".to_string(),
            path_type: 0o100000,
            size: 4096,
            permission: 0o644,
            ctime: 1_700_000_000,
            mtime: 1_700_000_001,
            atime: 1_700_000_002,
            links: 1,
        };
        let bytes = info.encode();
        assert_eq!(bytes.len(), PATH_INFO_LEN);
        let decoded = PathInfo::decode(&bytes).unwrap();
        assert_eq!(decoded, info);
    }

    #[tokio::test]
    async fn buffer_frame_round_trips_and_pads() {
        let mut buf = Vec::new();
        write_buffer_frame(&mut buf, b"hello").await.unwrap();
        assert_eq!(buf.len(), BULK_FRAME_LEN);
        let mut cur = std::io::Cursor::new(buf);
        let frame = read_buffer_frame(&mut cur).await.unwrap();
        assert_eq!(&frame[..5], b"hello");
        assert!(frame[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let mut buf = vec![0u8; REQUEST_LEN];
        BigEndian::write_i32(&mut buf[0..4], 99);
        let err = Request::decode(&buf).unwrap_err();
        assert!(matches!(err, FrameError::UnknownOperation(99)));
    }
}
