//! Numeric error codes carried in the `error.code` member of a response.
//!
//! The negative 32xxx range is the standard JSON-RPC space. The small
//! negative codes are private to sessiond: `-1xx` for authentication,
//! `-2xx` for session lifecycle.

/// Every error code the server can put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcCode {
    /// The body is not a well-formed request envelope.
    ParseError,
    /// The envelope is well-formed but its shape is wrong for the method.
    InvalidRequest,
    /// No handler for the requested method.
    MethodNotFound,
    /// Reserved; handlers report bad params as `InvalidRequest`.
    InvalidParams,
    /// Reserved for failures that aren't the caller's fault.
    InternalError,
    /// The credential verifier rejected the login.
    AuthenticationFailed,
    /// The session id is unknown (never issued, logged out, or reaped).
    SessionNotFound,
    /// The session exists but missed its keep-alive deadline.
    SessionExpired,
}

impl RpcCode {
    /// The integer sent on the wire.
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::AuthenticationFailed => -101,
            Self::SessionNotFound => -201,
            Self::SessionExpired => -202,
        }
    }

    /// The canonical human-readable message for this code.
    pub const fn message(self) -> &'static str {
        match self {
            Self::ParseError => "parse error",
            Self::InvalidRequest => "invalid request",
            Self::MethodNotFound => "method not found",
            Self::InvalidParams => "invalid method parameters",
            Self::InternalError => "internal error",
            Self::AuthenticationFailed => "authentication failed",
            Self::SessionNotFound => "session not found",
            Self::SessionExpired => "session expired",
        }
    }

    /// Maps a wire integer back to a code. Unknown integers yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -101 => Self::AuthenticationFailed,
            -201 => Self::SessionNotFound,
            -202 => Self::SessionExpired,
            _ => return None,
        })
    }
}

impl std::fmt::Display for RpcCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message(), self.code())
    }
}
