//! Connection to the Naming Service, with the liveness-poll-and-reconnect
//! behavior of `Client/Client.c`'s `pollServer`.
//!
//! The original client polls its NS socket with `poll(2)` before every
//! command and transparently reconnects, fetching a fresh `client_id`,
//! on timeout. A `tokio::net::TcpStream` surfaces that same condition
//! as an I/O error on the next read or write, so here reconnection is
//! triggered reactively instead of pre-emptively: [`NsLink::call`]
//! retries exactly once across a fresh connection after any I/O
//! failure, which is observably equivalent for a single-client-at-a-time
//! session.

use std::net::SocketAddr;

use dfs_proto::{Request, Response};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{ClientError, ClientResult};

pub struct NsLink {
    ns_addr: SocketAddr,
    socket: Mutex<TcpStream>,
    client_id: std::sync::atomic::AtomicU64,
}

impl NsLink {
    /// Connects to the NS and reads the `client_id` it assigns
    /// (spec §3: `ClientHandle` lifecycle bound to the TCP connection).
    pub async fn connect(ns_addr: SocketAddr) -> ClientResult<Self> {
        let (socket, client_id) = Self::connect_and_fetch_id(ns_addr).await?;
        Ok(Self { ns_addr, socket: Mutex::new(socket), client_id: std::sync::atomic::AtomicU64::new(client_id) })
    }

    async fn connect_and_fetch_id(ns_addr: SocketAddr) -> ClientResult<(TcpStream, u64)> {
        let mut socket = TcpStream::connect(ns_addr).await?;
        let client_id = socket.read_u64().await?;
        Ok((socket, client_id))
    }

    /// Closes the current socket and reconnects, backing off
    /// [`dfs_proto::SLEEP_TIME`] between attempts, mirroring
    /// `pollServer`'s retry loop.
    async fn reconnect(&self) {
        loop {
            match Self::connect_and_fetch_id(self.ns_addr).await {
                Ok((socket, client_id)) => {
                    *self.socket.lock().await = socket;
                    self.client_id.store(client_id, std::sync::atomic::Ordering::SeqCst);
                    return;
                }
                Err(e) => {
                    warn!("reconnect to naming service {} failed: {e}, retrying", self.ns_addr);
                    tokio::time::sleep(dfs_proto::SLEEP_TIME).await;
                }
            }
        }
    }

    pub fn client_id(&self) -> u64 {
        self.client_id.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Sends `request` and reads back exactly one `RESPONSE` (spec
    /// §4.5's one-request-one-response guarantee). On I/O failure,
    /// reconnects once and retries the same request.
    pub async fn call(&self, request: &Request) -> ClientResult<Response> {
        match self.try_call(request).await {
            Ok(response) => Ok(response),
            Err(ClientError::Io(e)) => {
                warn!("naming service link failed ({e}), reconnecting");
                self.reconnect().await;
                Ok(self.try_call(request).await?)
            }
            Err(other) => Err(other),
        }
    }

    async fn try_call(&self, request: &Request) -> ClientResult<Response> {
        let mut socket = self.socket.lock().await;
        request.write_to(&mut *socket).await?;
        Ok(Response::read_from(&mut *socket).await?)
    }

    /// Holds the connection lock across both the `RESPONSE` and the
    /// deferred `ACK` for a RENAME, exactly as `Rncmd` does with two
    /// back-to-back blocking `recv`s — the only way to read the ACK
    /// unambiguously, since the wire format carries no frame-type tag.
    pub async fn call_with_ack(&self, request: &Request) -> ClientResult<(Response, dfs_proto::Ack)> {
        let mut socket = self.socket.lock().await;
        request.write_to(&mut *socket).await?;
        let response = Response::read_from(&mut *socket).await?;
        if response.flags != dfs_proto::ResponseFlag::Success {
            // Forwarding itself failed; no ACK will ever follow.
            return Err(ClientError::Remote(response.error_code));
        }
        let ack = dfs_proto::Ack::read_from(&mut *socket).await?;
        Ok((response, ack))
    }

    /// Sends `CLOSE_CONNECTION` without waiting for a reply (spec
    /// §4.5 treats it as a break-the-loop signal the NS never answers).
    pub async fn close(&self) -> ClientResult<()> {
        let request = Request::new(dfs_proto::Operation::CloseConnection, self.client_id(), "", 0);
        let mut socket = self.socket.lock().await;
        request.write_to(&mut *socket).await?;
        Ok(())
    }
}
