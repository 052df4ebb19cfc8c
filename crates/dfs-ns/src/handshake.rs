//! Server handshake state machine (spec §4.4).
//!
//! Grounded on `Naming Sever/NS.c`'s `Storage_Server_Handler_Thread`.
//! States {Connected, Initialized, Linked, Serving, Disconnected-*}
//! map onto this function's phases in order; reaching `serve_responses`
//! is "Serving".

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use dfs_proto::{Ack, Operation, Response, ResponseFlag};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, tcp::OwnedReadHalf};
use tracing::{info, warn};

use crate::context::NsContext;
use crate::handle::ServerHandle;
use crate::outgoing::OutgoingFrame;

/// Runs the full handshake and then the per-server serving loop for
/// one newly accepted storage-server connection.
pub async fn handle_server_connection(ctx: Arc<NsContext>, socket: TcpStream, peer: SocketAddr) {
    let ip: Ipv4Addr = match peer.ip() {
        std::net::IpAddr::V4(v4) => v4,
        std::net::IpAddr::V6(_) => {
            warn!("rejecting non-IPv4 storage server connection from {peer}");
            return;
        }
    };
    let registration_port = peer.port();

    // Step 2-3: count toward / wait for quorum before proceeding.
    ctx.signal_server_connected();
    ctx.wait_for_quorum().await;

    let (mut read_half, mut write_half) = socket.into_split();

    // Step 4: receive STORAGE_SERVER_INIT.
    let init = match dfs_proto::StorageServerInit::read_from(&mut read_half).await {
        Ok(init) => init,
        Err(e) => {
            warn!("storage server {peer} failed handshake: {e}");
            return;
        }
    };

    let server_id = dfs_proto::ids::server_id(ip, registration_port);
    let handle = ServerHandle::new(server_id, ip, registration_port, init.client_port, init.ns_port);

    if let Err(e) = ctx.servers.add_server(handle.clone()) {
        warn!("could not register storage server {server_id}: {e:?}");
        return;
    }

    // Step 5: insert every exported path into the trie.
    {
        let mut trie = ctx.trie.lock().unwrap();
        for path in init.paths() {
            trie.insert(path, handle.clone());
        }
    }
    ctx.cache.flush();

    // Step 6: assign backups.
    if let Err(e) = ctx.servers.assign_backups(server_id, ctx.config.backup_servers) {
        warn!("could not assign backups for server {server_id}: {e:?}");
    }

    // Step 7: reply with the assigned server_id.
    if write_half.write_u64(server_id).await.is_err() {
        warn!("failed to send assigned server_id to {peer}");
        return;
    }

    // Step 8: open the reverse NS→SS write connection, retrying.
    let reverse_addr = SocketAddr::new(std::net::IpAddr::V4(ip), init.ns_port);
    let mut attempts = 0;
    let reverse = loop {
        match TcpStream::connect(reverse_addr).await {
            Ok(stream) => break Some(stream),
            Err(e) if attempts < dfs_proto::MAX_CONN_REQ => {
                attempts += 1;
                warn!("retry {attempts}/{} connecting back to {reverse_addr}: {e}", dfs_proto::MAX_CONN_REQ);
                tokio::time::sleep(dfs_proto::CONN_TIMEOUT).await;
            }
            Err(e) => {
                warn!("giving up connecting back to {reverse_addr}: {e}");
                break None;
            }
        }
    };

    let Some(reverse) = reverse else {
        let _ = ctx.servers.remove_server(server_id);
        return;
    };
    *handle.write_socket.lock().await = Some(reverse);

    info!("storage server {server_id} ({peer}) is now Serving");

    // Step 9: read RESPONSE frames from the SS and route by client_id.
    serve_responses(&ctx, read_half).await;

    ctx.servers.set_inactive(server_id).ok();
    info!("storage server {server_id} ({peer}) disconnected");
}

async fn serve_responses(ctx: &Arc<NsContext>, mut read_half: OwnedReadHalf) {
    loop {
        let response = match Response::read_from(&mut read_half).await {
            Ok(response) => response,
            Err(_) => break,
        };

        if response.operation == Operation::Rename {
            route_rename_ack(ctx, &response);
        }
    }
}

/// Parses the `"<client_id> <message>"` data field the SS emits for a
/// forwarded RENAME (spec §4.7) and routes the resulting ACK. On
/// success, also relocates the namespace trie entry and invalidates
/// both the old and new cache keys (REDESIGN FLAGS §9 — the original
/// source never does this, leaving a stale `path→server` entry behind).
fn route_rename_ack(ctx: &Arc<NsContext>, response: &Response) {
    let Some((id_str, message)) = response.data.split_once(' ') else {
        return;
    };
    let Ok(client_id) = id_str.parse::<u64>() else {
        return;
    };

    let pending = ctx.pop_pending_rename(client_id);

    if response.flags == ResponseFlag::Success {
        if let Some((source_path, target_path)) = &pending {
            if let Err(e) = ctx.trie.lock().unwrap().rename(source_path, last_token(target_path)) {
                warn!("NS trie out of sync after SS confirmed rename {source_path} -> {target_path}: {e:?}");
            }
            ctx.invalidate_cache(source_path);
            ctx.invalidate_cache(target_path);
        }
        ctx.route_ack(client_id, OutgoingFrame::Ack(Ack::success(message)));
    } else {
        ctx.route_ack(client_id, OutgoingFrame::Ack(Ack::failure(response.error_code, message)));
    }
}

fn last_token(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
