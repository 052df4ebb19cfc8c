//! Client request dispatch (spec §4.5).
//!
//! One `RESPONSE` (or, for RENAME, a `RESPONSE` now plus a later
//! `ACK`) per `REQUEST`, in the order requests arrive on a connection
//! — enforced by the caller awaiting this function to completion
//! before reading the next `REQUEST` off the same socket.

use std::sync::Arc;

use dfs_proto::{ErrorCode, Operation, Request, Response, ResponseFlag};

use crate::context::NsContext;
use crate::handle::ServerHandle;

/// Outcome of dispatching one request.
pub enum DispatchOutcome {
    /// Send this response back to the client now.
    Reply(Response),
    /// Reply, and the client connection should close (CLOSE_CONNECTION).
    ReplyAndClose(Response),
}

/// Resolves `path`, consulting the cache before the trie, populating
/// the cache on a trie hit (spec §4.2).
fn resolve(ctx: &NsContext, path: &str) -> Option<Arc<ServerHandle>> {
    if let Some(handle) = ctx.cache.get(path) {
        return Some(handle);
    }
    let handle = ctx.trie.lock().unwrap().resolve(path)?;
    ctx.cache.put(path.to_string(), handle.clone());
    Some(handle)
}

pub async fn dispatch(ctx: &NsContext, request: &Request) -> DispatchOutcome {
    match request.operation {
        Operation::CloseConnection => {
            DispatchOutcome::ReplyAndClose(Response::success(Operation::CloseConnection, "", 0))
        }

        Operation::Read | Operation::Info => reply_read_or_info(ctx, request),

        Operation::Write => reply_write(ctx, request),

        Operation::List => reply_list(ctx, request),

        Operation::Rename => reply_rename(ctx, request).await,

        // CREATE/DELETE/COPY/MOVE are not handled at the NS (spec §4.5
        // only names CLOSE_CONNECTION/READ/INFO/WRITE/LIST/RENAME);
        // they fall through to INVALID_OPERATION, same as the rest of
        // the unknown-op space.
        Operation::Create | Operation::Delete | Operation::Copy | Operation::Move => {
            DispatchOutcome::Reply(Response::failure(request.operation, ErrorCode::InvalidOperation))
        }
    }
}

fn reply_read_or_info(ctx: &NsContext, request: &Request) -> DispatchOutcome {
    let Some(primary) = resolve(ctx, &request.path) else {
        return DispatchOutcome::Reply(Response::failure(request.operation, ErrorCode::PathNotFound));
    };

    if ctx.servers.is_active(primary.server_id).unwrap_or(false) {
        let data = format!("{} {}", primary.ip, primary.client_port);
        return DispatchOutcome::Reply(Response::success(
            request.operation,
            data,
            primary.server_id,
        ));
    }

    let backups = ctx.servers.assign_backups(primary.server_id, ctx.config.backup_servers);
    let backup_id = backups.ok().and_then(|list| ctx.servers.get_active_backup(&list));

    match backup_id.and_then(|id| ctx.servers.get_handle(id)) {
        Some(backup) => {
            let data = format!("{} {}", backup.ip, backup.client_port);
            DispatchOutcome::Reply(Response::backup(request.operation, data, backup.server_id))
        }
        None => {
            DispatchOutcome::Reply(Response::failure(request.operation, ErrorCode::BackupUnavailable))
        }
    }
}

fn reply_write(ctx: &NsContext, request: &Request) -> DispatchOutcome {
    let Some(primary) = resolve(ctx, &request.path) else {
        return DispatchOutcome::Reply(Response::failure(request.operation, ErrorCode::PathNotFound));
    };

    // Writes never fall back to a backup: that would diverge replicas.
    if !ctx.servers.is_active(primary.server_id).unwrap_or(false) {
        return DispatchOutcome::Reply(Response::failure(
            request.operation,
            ErrorCode::ServerUnavailable,
        ));
    }

    let data = format!("{} {}", primary.ip, primary.client_port);
    DispatchOutcome::Reply(Response::success(request.operation, data, primary.server_id))
}

fn reply_list(ctx: &NsContext, request: &Request) -> DispatchOutcome {
    match ctx.trie.lock().unwrap().subtree_dump(&request.path) {
        Ok(dump) => DispatchOutcome::Reply(Response::success(request.operation, dump, 0)),
        Err(_) => {
            DispatchOutcome::Reply(Response::failure(request.operation, ErrorCode::PathNotFound))
        }
    }
}

/// `request.path` carries `"<source_path> <new_name>"` (the client
/// builds it this way; see `dfs_client::Client::rename`, grounded on
/// `Client/IndirectConnFunc.c`'s `Rncmd`, which `snprintf`s `"%s %s"`
/// from `<source> <target>` in that order). Only the source half is a
/// resolvable path, so it must be split out before consulting the
/// cache/trie — forwarding still sends the whole, unsplit string on to
/// the SS unchanged, exactly as spec §4.5 describes.
fn split_rename_path(path: &str) -> Option<(&str, &str)> {
    path.split_once(' ')
}

async fn reply_rename(ctx: &NsContext, request: &Request) -> DispatchOutcome {
    let Some((source_path, new_name)) = split_rename_path(&request.path) else {
        return DispatchOutcome::Reply(Response::failure(request.operation, ErrorCode::PathNotFound));
    };

    let Some(primary) = resolve(ctx, source_path) else {
        return DispatchOutcome::Reply(Response::failure(request.operation, ErrorCode::PathNotFound));
    };

    if !ctx.servers.is_active(primary.server_id).unwrap_or(false) {
        return DispatchOutcome::Reply(Response::failure(
            request.operation,
            ErrorCode::ServerUnavailable,
        ));
    }

    let mut socket_guard = primary.write_socket.lock().await;
    let Some(socket) = socket_guard.as_mut() else {
        return DispatchOutcome::Reply(Response::failure(request.operation, ErrorCode::FwdFailed));
    };

    if request.write_to(socket).await.is_err() {
        return DispatchOutcome::Reply(Response::failure(request.operation, ErrorCode::FwdFailed));
    }
    drop(socket_guard);

    let target_path = sibling_path(source_path, new_name);
    ctx.push_pending_rename(request.client_id, source_path.to_string(), target_path);

    DispatchOutcome::Reply(Response::success(
        request.operation,
        "Request forwarded to server",
        primary.server_id,
    ))
}

/// Replaces the last token of `path` with `new_name`, to compute the
/// namespace path the rename will resolve to once it completes.
fn sibling_path(path: &str, new_name: &str) -> String {
    match path.rsplit_once('/') {
        Some((parent, _)) => format!("{parent}/{new_name}"),
        None => new_name.to_string(),
    }
}
