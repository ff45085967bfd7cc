use thiserror::Error;

use crate::dispatch::ItemError;

/// Why a client call did not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// The server answered the call with an error tuple.
    #[error("{0}")]
    Rpc(ItemError),

    /// The outbound batch carrying the call failed as a whole.
    #[error("{0}")]
    Transport(String),

    /// The outbound batch succeeded but carried no result for this call id.
    #[error("no result for call {0}")]
    MissingResult(String),

    /// The multiplexer shut down before the call resolved.
    #[error("client closed")]
    Closed,

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Status carried by a server-side error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Rpc(err) => Some(err.status),
            _ => None,
        }
    }
}

/// Failure of one outbound batch.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP Error: {status} - {reason}")]
    Status { status: u16, reason: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}
