//! Error types for the protocol layer.
//!
//! Each crate in sessiond defines its own error enum. A `ProtocolError`
//! always means the problem is in turning bytes into envelopes (or back),
//! never in session state or credentials.

use crate::RpcCode;

/// Errors that can occur while encoding or decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a body that isn't an
    /// object, or an envelope member of the wrong type.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}

impl ProtocolError {
    /// The wire code a client sees when this error ends a request.
    pub fn rpc_code(&self) -> RpcCode {
        match self {
            Self::Decode(_) => RpcCode::ParseError,
            Self::Encode(_) => RpcCode::InternalError,
        }
    }
}
