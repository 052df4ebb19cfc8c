//! Client-facing acceptor and per-connection dispatch (spec §4.7).

use std::sync::Arc;

use dfs_proto::{Operation, Request};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::context::SsContext;
use crate::handlers;

pub async fn run_client_acceptor(ctx: Arc<SsContext>, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                info!("client connected from {peer}");
                let ctx = ctx.clone();
                tokio::spawn(async move { serve_client(ctx, socket).await });
            }
            Err(e) => tracing::warn!("client accept failed: {e}"),
        }
    }
}

async fn serve_client(ctx: Arc<SsContext>, mut socket: tokio::net::TcpStream) {
    loop {
        let request = match Request::read_from(&mut socket).await {
            Ok(request) => request,
            Err(e) => {
                debug!("client connection ended: {e}");
                break;
            }
        };

        let result = match request.operation {
            Operation::CloseConnection => break,
            Operation::Read => handlers::handle_read(&ctx, &mut socket, &request).await,
            Operation::Write => handlers::handle_write(&ctx, &mut socket, &request).await,
            Operation::Info => handlers::handle_info(&ctx, &mut socket, &request).await,
            Operation::Create
            | Operation::Delete
            | Operation::Copy
            | Operation::Move
            | Operation::Rename
            | Operation::List => handlers::reject_direct(&mut socket, &request).await,
        };

        if let Err(e) = result {
            debug!("handler error, closing connection: {e}");
            break;
        }
    }
}
