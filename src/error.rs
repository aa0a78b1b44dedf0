use std::{error::Error as StdError, fmt, io, result::Result as StdResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// Envelope without our namespace, or neither request nor response.
    ProtocolMismatch(String),
    /// Path text that does not parse as comma-separated indices.
    InvalidPath(String),
    /// Pushed payload that does not decode into the expected state type.
    MalformedPayload { kind: String, reason: String },
    /// The client was torn down before a response arrived.
    Abandoned,
    /// The host closed the channel while the client was running.
    ChannelClosed,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProtocolMismatch(msg) => write!(f, "Protocol mismatch: {msg}"),
            Self::InvalidPath(text) => write!(f, "Invalid path: {text:?}"),
            Self::MalformedPayload { kind, reason } => {
                write!(f, "Malformed {kind} payload: {reason}")
            }
            Self::Abandoned => write!(f, "Request abandoned before a response arrived"),
            Self::ChannelClosed => write!(f, "Channel closed"),
        }
    }
}

impl StdError for RpcError {}

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Rpc(RpcError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Rpc(e) => write!(f, "RPC error: {e}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Rpc(e) => Some(e),
        }
    }
}

impl From<RpcError> for Error {
    fn from(e: RpcError) -> Self {
        Self::Rpc(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = StdResult<T, Error>;
