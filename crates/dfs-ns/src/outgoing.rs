//! Frames queued to a client's write half.
//!
//! Mirrors the teacher's `Reply`/`EarlyReply` split
//! (`src/message_types.rs`): a `RESPONSE` is the immediate reply to
//! the request the client just sent, while an `ACK` may arrive later,
//! out of band, once the storage server finishes a forwarded RENAME
//! (spec §4.5, §4.4 step 9). Both travel down the same per-connection
//! queue so writes to the socket never interleave.

use dfs_proto::{Ack, Response};

pub enum OutgoingFrame {
    Response(Response),
    Ack(Ack),
}
