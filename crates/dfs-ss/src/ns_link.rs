//! Registration with, and the reverse connection from, the Naming
//! Service (spec §4.4 steps 4-9, from the SS's side).

use std::sync::Arc;

use dfs_proto::{Request, StorageServerInit};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::context::SsContext;
use crate::handlers;

/// Connects to the NS's server port, sends `STORAGE_SERVER_INIT`, and
/// returns the assigned `server_id`.
pub async fn register(ctx: &SsContext, client_port: u16, ns_port: u16) -> anyhow::Result<u64> {
    let addr = std::net::SocketAddr::new(ctx.config.ns_ip.into(), ctx.config.ns_server_port);
    let mut socket = TcpStream::connect(addr).await?;

    let mount_paths = ctx.trie.lock().unwrap().flattened_paths();
    let init = StorageServerInit { client_port, ns_port, mount_paths };
    init.write_to(&mut socket).await?;

    let server_id = socket.read_u64().await?;
    ctx.set_server_id(server_id);
    info!("registered with naming service as server {server_id}");
    Ok(server_id)
}

/// Accepts the NS's reverse connection and serves forwarded RENAMEs on
/// it for as long as the NS keeps it open.
///
/// Spec §1's only non-goal-exempted authentication: a peer whose IP
/// does not match the configured `ns_ip` is rejected outright, since
/// this listener only ever expects the single naming service this
/// storage server registered with.
pub async fn run_reverse_listener(ctx: Arc<SsContext>, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                if peer.ip() != std::net::IpAddr::V4(ctx.config.ns_ip) {
                    warn!("rejecting reverse link from non-allow-listed peer {peer}");
                    continue;
                }
                info!("naming service linked back from {peer}");
                let ctx = ctx.clone();
                tokio::spawn(async move { serve_ns(ctx, socket).await });
            }
            Err(e) => warn!("reverse-link accept failed: {e}"),
        }
    }
}

async fn serve_ns(ctx: Arc<SsContext>, mut socket: TcpStream) {
    loop {
        let request = match Request::read_from(&mut socket).await {
            Ok(request) => request,
            Err(e) => {
                warn!("naming service link closed: {e}");
                break;
            }
        };

        if request.operation != dfs_proto::Operation::Rename {
            warn!("naming service forwarded unsupported op {:?}", request.operation);
            continue;
        }

        if let Err(e) = handlers::handle_forwarded_rename(&ctx, &mut socket, &request).await {
            warn!("forwarded rename handling failed: {e}");
            break;
        }
    }
}
