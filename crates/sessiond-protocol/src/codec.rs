//! Codec trait and implementations for serializing/deserializing envelopes.
//!
//! The dispatcher doesn't care HOW envelopes become bytes; it only needs
//! something that implements [`Codec`]. [`JsonCodec`] is the one the
//! server speaks today.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust types to bytes and decodes bytes back.
///
/// `Send + Sync + 'static` because a single codec value is shared by every
/// request task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use sessiond_protocol::{Codec, JsonCodec, Request};
///
/// let codec = JsonCodec;
/// let req: Request = codec
///     .decode(br#"{"jsonrpc":"2.0","id":1,"method":"keepalive","params":{"session_id":"s"}}"#)
///     .unwrap();
/// assert_eq!(req.method, "keepalive");
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
