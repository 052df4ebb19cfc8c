//! High-level client API (spec §4.5 as seen from the client, plus
//! §4.7's direct bulk I/O), assembling [`crate::connection::NsLink`]
//! and [`crate::bulk`] into one call per user-facing operation.

use dfs_proto::{Ack, Operation, PathInfo, Request, RequestFlag, Response, ResponseFlag};

use crate::bulk;
use crate::connection::NsLink;
use crate::error::{ClientError, ClientResult};

pub struct Client {
    ns: NsLink,
}

impl Client {
    pub async fn connect(config: &dfs_proto::config::ClientConfig) -> ClientResult<Self> {
        let ns_addr = std::net::SocketAddr::new(config.ns_ip.into(), config.ns_client_port);
        Ok(Self { ns: NsLink::connect(ns_addr).await? })
    }

    pub fn client_id(&self) -> u64 {
        self.ns.client_id()
    }

    /// Reads the full contents of `path` (spec §4.7 Client-direct READ).
    pub async fn read(&self, path: &str) -> ClientResult<Vec<u8>> {
        let request = Request::new(Operation::Read, self.client_id(), path, 0);
        let response = self.ns.call(&request).await?;
        let addr = self.direct_endpoint(&response)?;
        bulk::read_file(addr, &request).await
    }

    /// Writes `contents` to `path` (spec §4.7 Client-direct WRITE).
    pub async fn write(&self, path: &str, flag: RequestFlag, contents: &[u8]) -> ClientResult<()> {
        let request = Request::new(Operation::Write, self.client_id(), path, flag as i32);
        let response = self.ns.call(&request).await?;
        let addr = self.direct_endpoint(&response)?;
        bulk::write_file(addr, &request, contents).await
    }

    /// Fetches metadata for `path` (spec §4.7 Client-direct INFO).
    pub async fn info(&self, path: &str) -> ClientResult<PathInfo> {
        let request = Request::new(Operation::Info, self.client_id(), path, 0);
        let response = self.ns.call(&request).await?;
        let addr = self.direct_endpoint(&response)?;
        bulk::info_file(addr, &request).await
    }

    /// Lists the subtree rooted at `path` (spec §4.5 LIST): the NS
    /// answers this entirely out of its own trie, no SS connection.
    pub async fn list(&self, path: &str) -> ClientResult<String> {
        let request = Request::new(Operation::List, self.client_id(), path, 0);
        let response = self.ns.call(&request).await?;
        if response.flags != ResponseFlag::Success {
            return Err(ClientError::Remote(response.error_code));
        }
        Ok(response.data)
    }

    /// Renames `path` to `new_name` within its parent directory (spec
    /// §4.5/§4.7 RENAME, §5's ordering note). Waits out both the
    /// immediate forwarding `RESPONSE` and the deferred `ACK` on the
    /// same connection before returning, matching `Rncmd`'s strictly
    /// synchronous command loop — the only wire-safe way to read an
    /// ACK, since nothing on the wire tags a frame as one or the other.
    pub async fn rename(&self, path: &str, new_name: &str) -> ClientResult<String> {
        let combined = format!("{path} {new_name}");
        let request = Request::new(Operation::Rename, self.client_id(), combined, 0);
        let (_response, ack): (Response, Ack) = self.ns.call_with_ack(&request).await?;
        if ack.flags != dfs_proto::AckFlag::Success {
            return Err(ClientError::Remote(ack.error_code));
        }
        Ok(ack.data)
    }

    /// Sends `CLOSE_CONNECTION` without waiting for a reply (spec
    /// §4.5: the NS breaks its loop without answering).
    pub async fn close(&self) -> ClientResult<()> {
        self.ns.close().await
    }

    fn direct_endpoint(&self, response: &Response) -> ClientResult<std::net::SocketAddr> {
        if response.flags == ResponseFlag::Failure {
            return Err(ClientError::Remote(response.error_code));
        }
        bulk::parse_endpoint(&response.data)
    }
}
