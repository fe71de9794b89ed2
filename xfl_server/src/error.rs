use thiserror::Error;
use xfl_protocol::codec::CodecError;
use xfl_protocol::{ErrorKind, RpcError};

/// Failure of a single call. Every variant except `Decode` leaves the
/// session open.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CallError {
    #[error("malformed request: {0}")]
    Decode(String),
    #[error("unknown procedure: {0}")]
    UnknownProcedure(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{requested} points exceed the capacity of {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },
    #[error("{0}")]
    OperationFailed(String),
    #[error("server is stopping")]
    ServerStopping,
    #[error("cannot encode result: {0}")]
    Encode(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CallError::Decode(_) => ErrorKind::DecodeError,
            CallError::UnknownProcedure(_) => ErrorKind::UnknownProcedure,
            CallError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            CallError::NotFound(_) => ErrorKind::NotFound,
            CallError::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            CallError::OperationFailed(_) => ErrorKind::OperationFailed,
            CallError::ServerStopping => ErrorKind::ServerStopping,
            CallError::Encode(_) => ErrorKind::EncodeError,
            CallError::Internal(_) => ErrorKind::InternalError,
        }
    }

    pub fn to_wire(&self) -> RpcError {
        RpcError::new(self.kind(), self.to_string())
    }
}

impl From<CodecError> for CallError {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Decode(msg) => CallError::Decode(msg),
            CodecError::Encode(msg) => CallError::Encode(msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("websocket handshake failed: {0}")]
    Handshake(String),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("call failed: {0}")]
    Call(#[from] RpcError),
}
