//! The typed view of a request: which method, with which parameters.
//!
//! A [`Request`] is converted exactly once into an [`RpcCall`]. After that,
//! handlers never look at raw JSON again. The conversion enforces the
//! per-method envelope rules:
//!
//! | method      | `id`     | `params`  |
//! |-------------|----------|-----------|
//! | `login`     | required | required  |
//! | `keepalive` | required | required  |
//! | `logout`    | absent   | required  |
//!
//! Violations come back as a [`Rejected`] carrying the id to echo (if any)
//! and the wire code.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{LoginParams, Request, RpcCode, SessionParams};

pub const METHOD_LOGIN: &str = "login";
pub const METHOD_KEEPALIVE: &str = "keepalive";
pub const METHOD_LOGOUT: &str = "logout";

/// A request whose method and parameters have been validated.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcCall {
    Login { id: Value, params: LoginParams },
    KeepAlive { id: Value, params: SessionParams },
    /// Always a notification, so there is no id.
    Logout { params: SessionParams },
    /// The method name didn't match any handler.
    Unknown { method: String },
}

impl RpcCall {
    /// The method name as it appears on the wire.
    pub fn method(&self) -> &str {
        match self {
            Self::Login { .. } => METHOD_LOGIN,
            Self::KeepAlive { .. } => METHOD_KEEPALIVE,
            Self::Logout { .. } => METHOD_LOGOUT,
            Self::Unknown { method } => method,
        }
    }
}

/// Why a request couldn't become an [`RpcCall`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    /// The id to echo in the error envelope.
    pub id: Option<Value>,
    pub code: RpcCode,
}

impl Rejected {
    fn invalid(id: Option<Value>) -> Self {
        Self {
            id,
            code: RpcCode::InvalidRequest,
        }
    }
}

impl TryFrom<Request> for RpcCall {
    type Error = Rejected;

    fn try_from(req: Request) -> Result<Self, Self::Error> {
        match req.method.as_str() {
            METHOD_LOGIN => {
                let (id, params) = expect_call(req)?;
                Ok(Self::Login { id, params })
            }
            METHOD_KEEPALIVE => {
                let (id, params) = expect_call(req)?;
                Ok(Self::KeepAlive { id, params })
            }
            METHOD_LOGOUT => {
                if req.id.is_some() {
                    return Err(Rejected::invalid(None));
                }
                let raw = req.params.ok_or(Rejected::invalid(None))?;
                let params = decode_params(raw).ok_or(Rejected::invalid(None))?;
                Ok(Self::Logout { params })
            }
            _ => Ok(Self::Unknown { method: req.method }),
        }
    }
}

/// Checks the shape of a call that expects a response: both `id` and
/// `params` present, params decodable as `P`.
///
/// A missing id or missing params is rejected without echoing the id;
/// undecodable params echo it.
fn expect_call<P: DeserializeOwned>(
    req: Request,
) -> Result<(Value, P), Rejected> {
    let (Some(id), Some(raw)) = (req.id, req.params) else {
        return Err(Rejected::invalid(None));
    };
    match decode_params(raw) {
        Some(params) => Ok((id, params)),
        None => Err(Rejected::invalid(Some(id))),
    }
}

fn decode_params<P: DeserializeOwned>(raw: Value) -> Option<P> {
    serde_json::from_value(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthMethod, SessionId};
    use serde_json::json;

    fn request(value: Value) -> Request {
        serde_json::from_value(value).expect("valid envelope")
    }

    #[test]
    fn test_login_with_id_and_params_is_accepted() {
        let call = RpcCall::try_from(request(json!({
            "jsonrpc": "2.0", "id": 1, "method": "login",
            "params": {"version": 0, "type": 1, "username": "alice", "data": "ab"}
        })))
        .unwrap();

        match call {
            RpcCall::Login { id, params } => {
                assert_eq!(id, json!(1));
                assert_eq!(params.username, "alice");
                assert_eq!(params.method, AuthMethod::Digest);
            }
            other => panic!("expected Login, got {other:?}"),
        }
    }

    #[test]
    fn test_login_without_id_is_invalid_without_echo() {
        let err = RpcCall::try_from(request(json!({
            "method": "login",
            "params": {"type": 1, "username": "alice", "data": "ab"}
        })))
        .unwrap_err();
        assert_eq!(err, Rejected::invalid(None));
    }

    #[test]
    fn test_login_without_params_is_invalid() {
        let err = RpcCall::try_from(request(json!({"id": 3, "method": "login"})))
            .unwrap_err();
        assert_eq!(err.code, RpcCode::InvalidRequest);
        assert_eq!(err.id, None);
    }

    #[test]
    fn test_login_bad_params_echoes_id() {
        let err = RpcCall::try_from(request(json!({
            "id": "x", "method": "login", "params": {"type": "digest", "username": "alice"}
        })))
        .unwrap_err();
        assert_eq!(err, Rejected::invalid(Some(json!("x"))));
    }

    #[test]
    fn test_keepalive_requires_session_id_string() {
        let err = RpcCall::try_from(request(json!({
            "id": 2, "method": "keepalive", "params": {"session_id": 42}
        })))
        .unwrap_err();
        assert_eq!(err.code, RpcCode::InvalidRequest);
        assert_eq!(err.id, Some(json!(2)));
    }

    #[test]
    fn test_keepalive_accepted() {
        let call = RpcCall::try_from(request(json!({
            "id": 2, "method": "keepalive", "params": {"session_id": "s"}
        })))
        .unwrap();
        assert_eq!(
            call,
            RpcCall::KeepAlive {
                id: json!(2),
                params: SessionParams {
                    session_id: SessionId::from("s")
                },
            }
        );
    }

    #[test]
    fn test_login_incomplete_params_accepted_with_zero_values() {
        let call = RpcCall::try_from(request(json!({
            "id": 1, "method": "login", "params": {"username": "alice"}
        })))
        .unwrap();

        match call {
            RpcCall::Login { params, .. } => {
                assert_eq!(params.method, AuthMethod::Code);
                assert_eq!(params.data, "");
            }
            other => panic!("expected Login, got {other:?}"),
        }
    }

    #[test]
    fn test_keepalive_empty_params_accepted_with_empty_id() {
        let call = RpcCall::try_from(request(json!({
            "id": 2, "method": "keepalive", "params": {}
        })))
        .unwrap();
        assert_eq!(
            call,
            RpcCall::KeepAlive {
                id: json!(2),
                params: SessionParams {
                    session_id: SessionId::default()
                },
            }
        );
    }

    #[test]
    fn test_logout_must_be_notification() {
        let err = RpcCall::try_from(request(json!({
            "id": 5, "method": "logout", "params": {"session_id": "s"}
        })))
        .unwrap_err();
        // The id is never echoed for logout.
        assert_eq!(err, Rejected::invalid(None));
    }

    #[test]
    fn test_logout_notification_accepted() {
        let call = RpcCall::try_from(request(json!({
            "method": "logout", "params": {"session_id": "s"}
        })))
        .unwrap();
        assert_eq!(call.method(), "logout");
    }

    #[test]
    fn test_logout_malformed_params_rejected() {
        let err = RpcCall::try_from(request(json!({
            "method": "logout", "params": "s"
        })))
        .unwrap_err();
        assert_eq!(err, Rejected::invalid(None));
    }

    #[test]
    fn test_unknown_method_is_a_variant_not_an_error() {
        let call =
            RpcCall::try_from(request(json!({"id": 1, "method": "reboot"})))
                .unwrap();
        assert_eq!(
            call,
            RpcCall::Unknown {
                method: "reboot".into()
            }
        );
    }

    #[test]
    fn test_missing_method_is_unknown() {
        let call = RpcCall::try_from(request(json!({"id": 1}))).unwrap();
        assert_eq!(call, RpcCall::Unknown { method: String::new() });
    }
}
