//! Per-client connection tasks (spec §4.5, §3's ClientHandle).
//!
//! Mirrors the teacher's `ReadTask`/`StreamWriter` split
//! (`src/read_task.rs`, `src/stream_writer.rs`): one task owns the read
//! half and drives dispatch, the other owns the write half and drains
//! an outgoing queue. Unlike the teacher, there is no separate VfsTask
//! actor — [`crate::dispatch::dispatch`] only touches `&NsContext`
//! state behind its own locks, so the read task can call it inline
//! without needing exclusive ownership of anything.
//!
//! The write task is what lets a deferred RENAME `ACK` (pushed from
//! [`crate::handshake::handle_server_connection`] via
//! [`NsContext::route_ack`]) reach the client without racing the
//! immediate `RESPONSE` the read task just queued for the same
//! request.
//!
//! `client_id` is formed from the peer address the instant the NS
//! accepts the connection (`dfs_proto::ids::client_id`, identical to
//! how `server_id` is formed) and sent to the client as a bare 8-byte
//! unsigned before anything else — matching `Client/Client.c`'s
//! connect-then-recv-id handshake. The client then echoes this id
//! back in every `REQUEST` it sends.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use dfs_proto::Request;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::context::NsContext;
use crate::dispatch::{DispatchOutcome, dispatch};
use crate::handle::ClientHandle;
use crate::outgoing::OutgoingFrame;

pub async fn handle_client_connection(ctx: Arc<NsContext>, socket: TcpStream, peer: SocketAddr) {
    let IpAddr::V4(ip) = peer.ip() else {
        warn!("rejecting non-IPv4 client connection from {peer}");
        return;
    };
    let client_id = dfs_proto::ids::client_id(ip, peer.port());

    let (read_half, mut write_half) = socket.into_split();
    if write_half.write_u64(client_id).await.is_err() {
        warn!("failed to send client_id to {peer}");
        return;
    }

    if ctx.clients.add(ClientHandle { client_id, ip, port: peer.port() }).is_err() {
        warn!("client registry full, rejecting client {peer}");
        return;
    }

    let (tx, rx) = mpsc::unbounded_channel::<OutgoingFrame>();
    ctx.register_outgoing(client_id, tx.clone());

    let writer = ClientWriteTask::spawn(write_half, rx);
    ClientReadTask::new(ctx.clone(), read_half, peer, tx).run().await;

    ctx.unregister_outgoing(client_id);
    ctx.clients.remove(client_id);
    writer.abort();
}

struct ClientReadTask {
    ctx: Arc<NsContext>,
    read_half: OwnedReadHalf,
    peer: SocketAddr,
    tx: mpsc::UnboundedSender<OutgoingFrame>,
}

impl ClientReadTask {
    fn new(
        ctx: Arc<NsContext>,
        read_half: OwnedReadHalf,
        peer: SocketAddr,
        tx: mpsc::UnboundedSender<OutgoingFrame>,
    ) -> Self {
        Self { ctx, read_half, peer, tx }
    }

    /// Reads and dispatches requests until the connection closes or a
    /// `CLOSE_CONNECTION` is seen.
    async fn run(mut self) {
        loop {
            let request = match Request::read_from(&mut self.read_half).await {
                Ok(request) => request,
                Err(e) => {
                    debug!("client {} connection ended: {e}", self.peer);
                    break;
                }
            };

            let outcome = dispatch(&self.ctx, &request).await;
            match outcome {
                DispatchOutcome::Reply(response) => {
                    if self.tx.send(OutgoingFrame::Response(response)).is_err() {
                        break;
                    }
                }
                DispatchOutcome::ReplyAndClose(response) => {
                    let _ = self.tx.send(OutgoingFrame::Response(response));
                    break;
                }
            }
        }
    }
}

struct ClientWriteTask {
    write_half: OwnedWriteHalf,
    rx: mpsc::UnboundedReceiver<OutgoingFrame>,
}

impl ClientWriteTask {
    fn spawn(write_half: OwnedWriteHalf, rx: mpsc::UnboundedReceiver<OutgoingFrame>) -> JoinHandle<()> {
        tokio::spawn(Self { write_half, rx }.run())
    }

    async fn run(mut self) {
        while let Some(frame) = self.rx.recv().await {
            let result = match frame {
                OutgoingFrame::Response(response) => response.write_to(&mut self.write_half).await,
                OutgoingFrame::Ack(ack) => ack.write_to(&mut self.write_half).await,
            };
            if let Err(e) = result {
                debug!("write to client failed, closing: {e}");
                break;
            }
        }
    }
}
