//! Core protocol types for sessiond's wire format.
//!
//! Everything here travels "on the wire": the JSON-RPC 2.0 request and
//! response envelopes, the error object, and the strongly-typed parameter
//! and result payloads of the three session methods.
//!
//! The envelope itself is deliberately loose (`id` and `params` are raw
//! JSON values) because its shape is only checked once the method is known.
//! See [`RpcCall`](crate::RpcCall) for the typed view.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::RpcCode;

/// The only protocol version string we ever emit.
pub const JSONRPC_VERSION: &str = "2.0";

/// Reads an explicit `null` the same as an absent field.
///
/// Pair with `#[serde(default)]` so a missing field also gets `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// An opaque session token issued on login.
///
/// A newtype over `String` so a session id can't be confused with a
/// username or a proof string in a function signature. `#[serde(transparent)]`
/// keeps it a plain JSON string on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Borrows the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// An inbound JSON-RPC request envelope.
///
/// `id` and `params` are kept as raw JSON. An explicit `null` is treated the
/// same as an absent field: `Option<Value>` deserializes both to `None`.
/// A request without an `id` is a notification.
///
/// A missing or `null` method decodes to `""`, which matches no handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, deserialize_with = "null_as_default")]
    pub jsonrpc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    /// Returns `true` if this request expects no response id.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl From<RpcCode> for RpcError {
    fn from(code: RpcCode) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_owned(),
        }
    }
}

/// An outbound JSON-RPC response envelope.
///
/// Exactly one of `result` / `error` is set by the constructors below.
/// Absent members are omitted from the JSON entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Response {
    /// Builds an error response carrying the canonical message for `code`.
    pub fn error(id: Option<Value>, code: RpcCode) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            error: Some(code.into()),
            result: None,
        }
    }

    /// Builds a success response from any serializable result.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`](crate::ProtocolError::Encode) if
    /// the result can't be represented as JSON.
    pub fn success<T: Serialize>(
        id: Option<Value>,
        result: &T,
    ) -> Result<Self, crate::ProtocolError> {
        let result =
            serde_json::to_value(result).map_err(crate::ProtocolError::Encode)?;
        Ok(Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            id,
            error: None,
            result: Some(result),
        })
    }

    /// The wire error code, if this is an error response.
    pub fn error_code(&self) -> Option<RpcCode> {
        self.error.as_ref().and_then(|e| RpcCode::from_code(e.code))
    }
}

// ---------------------------------------------------------------------------
// Method payloads
// ---------------------------------------------------------------------------

/// How the client proves its identity in a `login` call.
///
/// On the wire this is a bare integer (`"type": 1`). Integers we don't
/// recognise decode to [`AuthMethod::Unsupported`] instead of failing, so
/// an unknown method is an authentication failure rather than a malformed
/// request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum AuthMethod {
    /// One-time code. Not implemented; always rejected. Tag 0, so also
    /// what an absent `type` decodes to.
    #[default]
    Code,
    /// Hex-encoded password digest checked against the credential store.
    Digest,
    /// Bearer token. Not implemented; always rejected.
    Token,
    /// Any other tag.
    Unsupported(i64),
}

impl From<i64> for AuthMethod {
    fn from(tag: i64) -> Self {
        match tag {
            0 => Self::Code,
            1 => Self::Digest,
            2 => Self::Token,
            other => Self::Unsupported(other),
        }
    }
}

impl From<AuthMethod> for i64 {
    fn from(method: AuthMethod) -> Self {
        match method {
            AuthMethod::Code => 0,
            AuthMethod::Digest => 1,
            AuthMethod::Token => 2,
            AuthMethod::Unsupported(other) => other,
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code => f.write_str("code"),
            Self::Digest => f.write_str("digest"),
            Self::Token => f.write_str("token"),
            Self::Unsupported(tag) => write!(f, "unsupported({tag})"),
        }
    }
}

/// Parameters of a `login` call.
///
/// Missing or `null` fields take their zero value (`type` 0, empty
/// strings), so an incomplete login fails authentication rather than
/// envelope validation. Only a field of the wrong JSON type is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginParams {
    /// Client protocol version. Logged, not enforced.
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: i64,

    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub method: AuthMethod,

    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,

    /// The proof material (for [`AuthMethod::Digest`], 64 hex characters).
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: String,
}

/// Parameters of `keepalive` and `logout`.
///
/// A missing `session_id` is the empty id, which never names a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    #[serde(default, deserialize_with = "null_as_default")]
    pub session_id: SessionId,
}

/// Result of a successful `login` or `keepalive`.
///
/// `interval` is the keep-alive interval in whole seconds; clients should
/// call `keepalive` at least this often.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGrant {
    pub session_id: SessionId,
    pub interval: u64,
}

// =========================================================================
// Tests
// =========================================================================
