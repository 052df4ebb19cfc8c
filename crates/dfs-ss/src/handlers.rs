//! Client-direct and NS-forwarded request handlers (spec §4.7).

use std::os::unix::fs::MetadataExt;
use std::sync::Arc;

use dfs_proto::ops::{ErrorCode, RequestFlag};
use dfs_proto::{Operation, PathInfo, Request, Response, read_buffer_frame, write_buffer_frame};
use num_traits::FromPrimitive;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::warn;

use crate::context::SsContext;
use crate::scan::resolve_fs_path;
use crate::trie::SsTrieError;

async fn respond(socket: &mut TcpStream, response: Response) -> std::io::Result<()> {
    response.write_to(socket).await.map_err(std::io::Error::other)
}

async fn send_error_and_sentinel(
    socket: &mut TcpStream,
    message: &str,
    sentinel: &[u8],
) -> std::io::Result<()> {
    write_buffer_frame(socket, message.as_bytes()).await.map_err(std::io::Error::other)?;
    write_buffer_frame(socket, sentinel).await.map_err(std::io::Error::other)?;
    Ok(())
}

/// Operations that must arrive via the NS, never straight from a
/// client on this port (spec §4.7's "only authorization boundary").
pub async fn reject_direct(socket: &mut TcpStream, request: &Request) -> std::io::Result<()> {
    warn!("rejecting direct {:?} on client port (must be NS-forwarded)", request.operation);
    respond(socket, Response::failure(request.operation, ErrorCode::InvalidAuthentication)).await
}

pub async fn handle_read(
    ctx: &Arc<SsContext>,
    socket: &mut TcpStream,
    request: &Request,
) -> std::io::Result<()> {
    let sentinel = dfs_proto::sentinel::generate();
    write_buffer_frame(socket, &sentinel).await.map_err(std::io::Error::other)?;

    let lock = { ctx.trie.lock().unwrap().lookup(&request.path).map(|n| n.lock.clone()) };
    let Some(lock) = lock else {
        send_error_and_sentinel(socket, "path not found", &sentinel).await?;
        return respond(socket, Response::failure(Operation::Read, ErrorCode::InvalidPath)).await;
    };

    let Some(fs_path) = resolve_fs_path(&ctx.root, &request.path) else {
        send_error_and_sentinel(socket, "path not found", &sentinel).await?;
        return respond(socket, Response::failure(Operation::Read, ErrorCode::InvalidPath)).await;
    };

    lock.read_lock().await;
    let result = stream_file(socket, &fs_path).await;
    lock.read_unlock().await;

    match result {
        Ok(()) => {
            write_buffer_frame(socket, &sentinel).await.map_err(std::io::Error::other)?;
            respond(socket, Response::success(Operation::Read, "", request.client_id)).await
        }
        Err(e) => {
            warn!("read of {} failed: {e}", request.path);
            write_buffer_frame(socket, &sentinel).await.map_err(std::io::Error::other)?;
            respond(socket, Response::failure(Operation::Read, ErrorCode::InvalidAccess)).await
        }
    }
}

/// Streams `fs_path`'s full contents as fixed-size frames, preceded by
/// the real byte count as a plain `u64` so the reader on the other end
/// never has to guess how many of the final frame's bytes are real
/// content versus zero padding — a frame boundary can fall anywhere,
/// including exactly on a file whose true length is a multiple of
/// `BULK_FRAME_LEN` or whose genuine trailing bytes are themselves
/// `0x00`.
async fn stream_file(socket: &mut TcpStream, fs_path: &std::path::Path) -> std::io::Result<()> {
    let mut file = tokio::fs::File::open(fs_path).await?;
    let total_len = file.metadata().await?.len();
    socket.write_u64(total_len).await?;

    let mut buf = vec![0u8; dfs_proto::BULK_FRAME_LEN];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        write_buffer_frame(socket, &buf[..n]).await.map_err(std::io::Error::other)?;
    }
    Ok(())
}

pub async fn handle_write(
    ctx: &Arc<SsContext>,
    socket: &mut TcpStream,
    request: &Request,
) -> std::io::Result<()> {
    let Some(flag) = RequestFlag::from_i32(request.flags) else {
        return respond(socket, Response::failure(Operation::Write, ErrorCode::InvalidFlag)).await;
    };

    let sentinel = dfs_proto::sentinel::generate();
    write_buffer_frame(socket, &sentinel).await.map_err(std::io::Error::other)?;

    let lock = { ctx.trie.lock().unwrap().lookup(&request.path).map(|n| n.lock.clone()) };
    let Some(lock) = lock else {
        send_error_and_sentinel(socket, "path not found", &sentinel).await?;
        return respond(socket, Response::failure(Operation::Write, ErrorCode::InvalidPath)).await;
    };

    let Some(fs_path) = resolve_fs_path(&ctx.root, &request.path) else {
        send_error_and_sentinel(socket, "path not found", &sentinel).await?;
        return respond(socket, Response::failure(Operation::Write, ErrorCode::InvalidPath)).await;
    };

    // The client sends this right after reading the sentinel above
    // (see `dfs_client::bulk::write_file`), unconditionally, before it
    // knows whether the path check above passed.
    let total_len = socket.read_u64().await.map_err(std::io::Error::other)?;

    let _guard = lock.write_lock().await;
    let result = receive_into_file(socket, &fs_path, flag, total_len).await;
    drop(_guard);

    match result {
        Ok(()) => respond(socket, Response::success(Operation::Write, "", request.client_id)).await,
        Err(e) => {
            warn!("write to {} failed: {e}", request.path);
            respond(socket, Response::failure(Operation::Write, ErrorCode::InvalidAccess)).await
        }
    }
}

/// Receives exactly `total_len` real bytes from `socket` into
/// `fs_path`, reading fixed-size frames and taking only as many bytes
/// from the final one as `total_len` calls for. Knowing the real byte
/// count up front (sent by the client before it streams any payload
/// frames) means the last frame never needs to be distinguished from a
/// zero-padded short tail by inspecting its content — which silently
/// corrupted any write whose genuine final bytes were themselves zero
/// or whose length was an exact multiple of `BULK_FRAME_LEN`.
async fn receive_into_file(
    socket: &mut TcpStream,
    fs_path: &std::path::Path,
    flag: RequestFlag,
    total_len: u64,
) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(flag == RequestFlag::Overwrite)
        .append(flag == RequestFlag::Append)
        .open(fs_path)
        .await?;

    let mut remaining = total_len;
    while remaining > 0 {
        let frame = read_buffer_frame(socket).await.map_err(std::io::Error::other)?;
        let take = remaining.min(dfs_proto::BULK_FRAME_LEN as u64) as usize;
        file.write_all(&frame[..take]).await?;
        remaining -= take as u64;
    }

    // Drain the client's trailing sentinel frame; `total_len` already
    // accounted for every real byte, so its content no longer matters.
    read_buffer_frame(socket).await.map_err(std::io::Error::other)?;
    Ok(())
}

pub async fn handle_info(
    ctx: &Arc<SsContext>,
    socket: &mut TcpStream,
    request: &Request,
) -> std::io::Result<()> {
    let lock = { ctx.trie.lock().unwrap().lookup(&request.path).map(|n| n.lock.clone()) };
    let Some(lock) = lock else {
        return respond(socket, Response::failure(Operation::Info, ErrorCode::InvalidPath)).await;
    };
    let Some(fs_path) = resolve_fs_path(&ctx.root, &request.path) else {
        return respond(socket, Response::failure(Operation::Info, ErrorCode::InvalidPath)).await;
    };

    lock.read_lock().await;
    let metadata = tokio::fs::metadata(&fs_path).await;
    lock.read_unlock().await;

    let metadata = match metadata {
        Ok(m) => m,
        Err(e) => {
            warn!("stat of {} failed: {e}", request.path);
            return respond(socket, Response::failure(Operation::Info, ErrorCode::InvalidAccess)).await;
        }
    };

    respond(socket, Response::success(Operation::Info, "", request.client_id)).await?;

    let info = PathInfo {
        path: request.path.clone(),
        path_type: metadata.mode() & libc::S_IFMT,
        size: metadata.size(),
        permission: metadata.mode() & 0o777,
        ctime: metadata.ctime(),
        mtime: metadata.mtime(),
        atime: metadata.atime(),
        links: metadata.nlink() as u32,
    };
    info.write_to(socket).await.map_err(std::io::Error::other)
}

/// NS-forwarded RENAME (spec §4.7). `request.path` carries
/// `"<source_path> <new_name>"`, forwarded unchanged by the NS — the
/// client built it this way (`Client/IndirectConnFunc.c`'s `Rncmd`
/// sends `"%s %s"` from `<source> <target>`), matching scenario S6's
/// literal `path="/a/f1 f1new"`.
pub async fn handle_forwarded_rename(
    ctx: &Arc<SsContext>,
    ns_socket: &mut TcpStream,
    request: &Request,
) -> std::io::Result<()> {
    let Some((source_path, new_name)) = request.path.split_once(' ') else {
        return respond_to_ns(ns_socket, request, ErrorCode::InvalidPath, "bad rename payload").await;
    };

    let Some(old_fs_path) = resolve_fs_path(&ctx.root, source_path) else {
        return respond_to_ns(ns_socket, request, ErrorCode::InvalidPath, "invalid source path").await;
    };

    let lock = { ctx.trie.lock().unwrap().lookup(source_path).map(|n| n.lock.clone()) };
    let Some(lock) = lock else {
        return respond_to_ns(ns_socket, request, ErrorCode::InvalidPath, "source not found").await;
    };

    let _guard = lock.write_lock().await;
    let rename_result = {
        let mut trie = ctx.trie.lock().unwrap();
        if !trie.contains(source_path) {
            None
        } else {
            Some(trie.rename(source_path, new_name))
        }
    };

    let response = match rename_result {
        None => (ErrorCode::InvalidPath, "source not found".to_string()),
        Some(Err(SsTrieError::AlreadyExists)) => {
            (ErrorCode::InvalidPath, "target already exists".to_string())
        }
        Some(Err(SsTrieError::NotFound)) => (ErrorCode::InvalidPath, "source not found".to_string()),
        Some(Ok(())) => {
            let new_fs_path = old_fs_path.with_file_name(new_name);
            match tokio::fs::rename(&old_fs_path, &new_fs_path).await {
                Ok(()) => (ErrorCode::Success, "renamed".to_string()),
                Err(e) => {
                    warn!("os rename {} -> {} failed: {e}", old_fs_path.display(), new_fs_path.display());
                    (ErrorCode::InvalidAccess, "rename failed".to_string())
                }
            }
        }
    };
    drop(_guard);

    respond_to_ns(ns_socket, request, response.0, &response.1).await
}

async fn respond_to_ns(
    ns_socket: &mut TcpStream,
    request: &Request,
    error_code: ErrorCode,
    message: &str,
) -> std::io::Result<()> {
    let data = format!("{} {message}", request.client_id);
    let response = if error_code == ErrorCode::Success {
        Response::success(Operation::Rename, data, 0)
    } else {
        let mut r = Response::failure(Operation::Rename, error_code);
        r.data = data;
        r
    };
    respond(ns_socket, response).await
}
