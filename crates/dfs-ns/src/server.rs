//! Connection acceptors (spec §4.4, §4.5).
//!
//! Two listeners, matching the original's two-socket design
//! (`NS_CLIENT_PORT`/`NS_SERVER_PORT`): one for storage servers
//! registering, one for clients issuing requests. Each accepted
//! connection gets its own `tokio::spawn`'d task, the same
//! one-task-per-connection shape as the teacher's `handle_forever`
//! (`src/lib.rs`).

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::client_task::handle_client_connection;
use crate::context::NsContext;
use crate::handshake::handle_server_connection;

pub async fn run_client_acceptor(ctx: Arc<NsContext>, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                info!("client connected from {peer}");
                let ctx = ctx.clone();
                tokio::spawn(async move { handle_client_connection(ctx, socket, peer).await });
            }
            Err(e) => warn!("client accept failed: {e}"),
        }
    }
}

pub async fn run_server_acceptor(ctx: Arc<NsContext>, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                info!("storage server connecting from {peer}");
                let ctx = ctx.clone();
                tokio::spawn(async move { handle_server_connection(ctx, socket, peer).await });
            }
            Err(e) => warn!("storage server accept failed: {e}"),
        }
    }
}
