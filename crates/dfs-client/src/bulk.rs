//! Direct client↔storage-server bulk I/O (spec §4.7, §6's bulk
//! transfer protocol), grounded on `Client/DirectConnFunc.c`'s
//! `Rcmd`/`Wcmd`/`Icmd`.
//!
//! Each call opens a fresh connection to the storage server endpoint
//! the NS handed back, resends the same `REQUEST`, then speaks the
//! sentinel-bracketed frame protocol shared with [`dfs_ss::handlers`]
//! (reused here via `dfs_proto::{read_buffer_frame, write_buffer_frame}`).

use std::net::SocketAddr;

use dfs_proto::{BULK_FRAME_LEN, PathInfo, Request, Response, ResponseFlag, read_buffer_frame, write_buffer_frame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{ClientError, ClientResult};

/// Reads a `RESPONSE.data` field of the form `"<ip> <port>"` into a
/// connectable address.
pub fn parse_endpoint(data: &str) -> ClientResult<SocketAddr> {
    let mut parts = data.split_whitespace();
    let ip = parts.next().ok_or_else(|| ClientError::MalformedEndpoint(data.to_string()))?;
    let port = parts.next().ok_or_else(|| ClientError::MalformedEndpoint(data.to_string()))?;
    let port: u16 = port.parse().map_err(|_| ClientError::MalformedEndpoint(data.to_string()))?;
    format!("{ip}:{port}").parse().map_err(|_| ClientError::MalformedEndpoint(data.to_string()))
}

/// Streams a file's full contents from `addr`, re-sending `request`
/// as the storage server expects.
///
/// The storage server sends the real byte count as a plain `u64`
/// right after the sentinel (see `dfs_ss::handlers::stream_file`), so
/// the last frame's genuine length is known rather than guessed from
/// its content — a file whose true length is a multiple of
/// `BULK_FRAME_LEN`, or whose real trailing bytes are themselves zero,
/// is received byte-for-byte instead of being silently truncated.
pub async fn read_file(addr: SocketAddr, request: &Request) -> ClientResult<Vec<u8>> {
    let mut socket = TcpStream::connect(addr).await?;
    request.write_to(&mut socket).await?;

    read_buffer_frame(&mut socket).await?;
    let total_len = socket.read_u64().await?;

    let mut contents = Vec::with_capacity(total_len as usize);
    let mut remaining = total_len;
    while remaining > 0 {
        let frame = read_buffer_frame(&mut socket).await?;
        let take = remaining.min(BULK_FRAME_LEN as u64) as usize;
        contents.extend_from_slice(&frame[..take]);
        remaining -= take as u64;
    }

    // Drain the server's trailing sentinel frame; `total_len` already
    // accounted for every real byte, so its content no longer matters.
    read_buffer_frame(&mut socket).await?;

    let response = Response::read_from(&mut socket).await?;
    if response.flags == ResponseFlag::Failure {
        return Err(ClientError::Remote(response.error_code));
    }
    Ok(contents)
}

/// Sends `contents` to `addr`, re-sending `request` first (its
/// `flags` field must already carry `APPEND`/`OVERWRITE`).
///
/// Sends `contents.len()` as a plain `u64` right after the sentinel,
/// before any payload frame, so `dfs_ss::handlers::receive_into_file`
/// never has to infer the real length of the final frame from its
/// content (see `read_file` above for the matching read-side fix).
pub async fn write_file(addr: SocketAddr, request: &Request, contents: &[u8]) -> ClientResult<()> {
    let mut socket = TcpStream::connect(addr).await?;
    request.write_to(&mut socket).await?;

    let sentinel = read_buffer_frame(&mut socket).await?;
    socket.write_u64(contents.len() as u64).await?;

    for chunk in contents.chunks(BULK_FRAME_LEN) {
        write_buffer_frame(&mut socket, chunk).await?;
    }
    write_buffer_frame(&mut socket, &sentinel).await?;

    let response = Response::read_from(&mut socket).await?;
    if response.flags == ResponseFlag::Failure {
        return Err(ClientError::Remote(response.error_code));
    }
    Ok(())
}

/// Fetches path metadata from `addr`.
pub async fn info_file(addr: SocketAddr, request: &Request) -> ClientResult<PathInfo> {
    let mut socket = TcpStream::connect(addr).await?;
    request.write_to(&mut socket).await?;

    let response = Response::read_from(&mut socket).await?;
    if response.flags == ResponseFlag::Failure {
        return Err(ClientError::Remote(response.error_code));
    }

    Ok(PathInfo::read_from(&mut socket).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ip_and_port() {
        let addr = parse_endpoint("127.0.0.1 9090").unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:9090");
    }

    #[test]
    fn rejects_malformed_endpoint() {
        assert!(parse_endpoint("not-an-endpoint").is_err());
    }
}
