//! `ServerHandle`/`ClientHandle` (spec §3).

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// A registered storage server.
///
/// `write_socket` is the NS→SS reverse connection opened during the
/// handshake (spec §4.4 step 8); it carries forwarded mutating
/// requests. It is behind a `Mutex` because the forwarding path and
/// the handshake retry loop both need to install/use it, and framed
/// writes must not interleave.
pub struct ServerHandle {
    pub server_id: u64,
    pub ip: Ipv4Addr,
    pub registration_port: u16,
    pub client_port: u16,
    pub ns_port: u16,
    pub write_socket: Mutex<Option<TcpStream>>,
}

impl ServerHandle {
    pub fn new(
        server_id: u64,
        ip: Ipv4Addr,
        registration_port: u16,
        client_port: u16,
        ns_port: u16,
    ) -> Arc<Self> {
        Arc::new(Self {
            server_id,
            ip,
            registration_port,
            client_port,
            ns_port,
            write_socket: Mutex::new(None),
        })
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("server_id", &self.server_id)
            .field("ip", &self.ip)
            .field("client_port", &self.client_port)
            .finish()
    }
}

/// A connected client.
#[derive(Debug)]
pub struct ClientHandle {
    pub client_id: u64,
    pub ip: Ipv4Addr,
    pub port: u16,
}
