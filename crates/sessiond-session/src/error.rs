//! Error types for the session layer.

use sessiond_protocol::{RpcCode, SessionId};

/// Errors that can occur during login or session refresh.
///
/// Each variant maps onto exactly one wire code, see [`SessionError::rpc_code`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The credential verifier rejected the login. The reason is for server
    /// logs only; clients just see "authentication failed".
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No session exists for this id. It was never issued, was logged out,
    /// or has already been swept.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// The session missed its keep-alive deadline.
    #[error("session {0} expired")]
    Expired(SessionId),
}

impl SessionError {
    pub fn rpc_code(&self) -> RpcCode {
        match self {
            Self::AuthFailed(_) => RpcCode::AuthenticationFailed,
            Self::NotFound(_) => RpcCode::SessionNotFound,
            Self::Expired(_) => RpcCode::SessionExpired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_code_mapping() {
        let id = SessionId::from("s");
        assert_eq!(
            SessionError::AuthFailed("x".into()).rpc_code(),
            RpcCode::AuthenticationFailed
        );
        assert_eq!(
            SessionError::NotFound(id.clone()).rpc_code(),
            RpcCode::SessionNotFound
        );
        assert_eq!(SessionError::Expired(id).rpc_code(), RpcCode::SessionExpired);
    }

    #[test]
    fn test_display_names_the_session() {
        let err = SessionError::Expired(SessionId::from("abc"));
        assert_eq!(err.to_string(), "session abc expired");
    }
}
