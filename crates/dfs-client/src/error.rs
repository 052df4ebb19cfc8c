//! Library-level error type (spec §7's abstract error kinds, as seen
//! from the client side).

use dfs_proto::ErrorCode;

#[derive(Debug)]
pub enum ClientError {
    /// A framing read/write failed (short read, zero-byte read, I/O
    /// error). Connection-fatal; the caller should reconnect.
    Io(std::io::Error),
    /// The NS or SS returned `RESPONSE_FLAG_FAILURE` with this error
    /// code.
    Remote(ErrorCode),
    /// The NS's response data did not parse as `"<ip> <port>"`.
    MalformedEndpoint(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Io(e) => write!(f, "i/o error: {e}"),
            ClientError::Remote(code) => write!(f, "remote error: {code:?}"),
            ClientError::MalformedEndpoint(data) => {
                write!(f, "malformed storage server endpoint in response: {data:?}")
            }
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Io(e)
    }
}

impl From<dfs_proto::FrameError> for ClientError {
    fn from(e: dfs_proto::FrameError) -> Self {
        match e {
            dfs_proto::FrameError::Io(io) => ClientError::Io(io),
            other => ClientError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
