//! Request dispatch: one HTTP body in, one reply out.
//!
//! The flow for every request is:
//!   1. Decode the body into a [`Request`], or reply `ParseError`
//!   2. Convert it into an [`RpcCall`], or reply with the rejection
//!   3. Run the handler for that call against the session store
//!
//! Handlers never fail outward. Every error becomes a wire error, and every
//! request gets exactly one [`Reply`].

use std::sync::Arc;

use serde_json::Value;
use sessiond_protocol::{
    Codec, JsonCodec, LoginParams, Rejected, Request, Response, RpcCall, RpcCode,
    SessionGrant, SessionId, SessionParams,
};
use sessiond_session::{Credential, CredentialVerifier, SessionError, SessionStore};

/// What goes back to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A JSON-RPC response envelope.
    Envelope(Response),
    /// A bare acknowledgement with an empty body. Only a successful
    /// `logout` produces this.
    Ack,
}

impl Reply {
    pub(crate) fn error(id: Option<Value>, code: RpcCode) -> Self {
        Self::Envelope(Response::error(id, code))
    }

    /// The response envelope, if this isn't an [`Ack`](Reply::Ack).
    pub fn envelope(&self) -> Option<&Response> {
        match self {
            Self::Envelope(response) => Some(response),
            Self::Ack => None,
        }
    }
}

/// Routes decoded calls to the login, keep-alive and logout handlers.
///
/// Shared by every request task behind an `Arc`. The only mutable state it
/// touches is the [`SessionStore`], which does its own locking.
pub struct Dispatcher<V, C = JsonCodec> {
    store: Arc<SessionStore>,
    verifier: V,
    codec: C,
}

impl<V: CredentialVerifier> Dispatcher<V, JsonCodec> {
    pub fn new(store: Arc<SessionStore>, verifier: V) -> Self {
        Self::with_codec(store, verifier, JsonCodec)
    }
}

impl<V, C> Dispatcher<V, C>
where
    V: CredentialVerifier,
    C: Codec,
{
    pub fn with_codec(store: Arc<SessionStore>, verifier: V, codec: C) -> Self {
        Self {
            store,
            verifier,
            codec,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Handles one raw request body.
    pub async fn handle(&self, body: &[u8]) -> Reply {
        let request: Request = match self.codec.decode(body) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "failed to decode request");
                return Reply::error(None, e.rpc_code());
            }
        };

        match RpcCall::try_from(request) {
            Ok(call) => self.dispatch(call).await,
            Err(Rejected { id, code }) => {
                tracing::debug!(?id, %code, "rejected request envelope");
                Reply::error(id, code)
            }
        }
    }

    /// Runs the handler for an already validated call.
    pub async fn dispatch(&self, call: RpcCall) -> Reply {
        match call {
            RpcCall::Login { id, params } => Reply::Envelope(self.login(id, params).await),
            RpcCall::KeepAlive { id, params } => Reply::Envelope(self.keepalive(id, params)),
            RpcCall::Logout { params } => self.logout(params),
            RpcCall::Unknown { method } => {
                tracing::debug!(%method, "method not found");
                Reply::error(None, RpcCode::MethodNotFound)
            }
        }
    }

    /// Serializes a reply into the HTTP body. An [`Ack`](Reply::Ack) is
    /// empty.
    pub fn encode(&self, reply: &Reply) -> Vec<u8> {
        let Reply::Envelope(response) = reply else {
            return Vec::new();
        };
        match self.codec.encode(response) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode response");
                let fallback = Response::error(response.id.clone(), e.rpc_code());
                self.codec.encode(&fallback).unwrap_or_default()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    async fn login(&self, id: Value, params: LoginParams) -> Response {
        let version = params.version;
        let credential = Credential::from(params);

        // The verifier may do I/O; no session state is touched until it
        // has answered.
        if !self.verifier.verify(&credential).await {
            let err = SessionError::AuthFailed(format!(
                "{} credential rejected",
                credential.method
            ));
            tracing::error!(
                subject = %credential.subject,
                method = %credential.method,
                version,
                error = %err,
                "login failed"
            );
            return Response::error(Some(id), err.rpc_code());
        }

        let session = self.store.create();
        tracing::info!(
            subject = %credential.subject,
            method = %credential.method,
            session_id = %session.id,
            "login ok"
        );
        self.grant(id, session.id)
    }

    fn keepalive(&self, id: Value, params: SessionParams) -> Response {
        match self.store.touch(&params.session_id) {
            Ok(session) => {
                tracing::debug!(session_id = %session.id, "keepalive ok");
                self.grant(id, session.id)
            }
            Err(e) => {
                tracing::error!(session_id = %params.session_id, error = %e, "keepalive rejected");
                Response::error(Some(id), e.rpc_code())
            }
        }
    }

    fn logout(&self, params: SessionParams) -> Reply {
        let existed = self.store.remove(&params.session_id);
        tracing::info!(session_id = %params.session_id, existed, "logout");
        Reply::Ack
    }

    fn grant(&self, id: Value, session_id: SessionId) -> Response {
        let grant = SessionGrant {
            session_id,
            interval: self.store.policy().keepalive_secs(),
        };
        Response::success(Some(id.clone()), &grant).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to build session grant");
            Response::error(Some(id), e.rpc_code())
        })
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::{Duration, Instant};

    use serde_json::json;
    use sessiond_protocol::AuthMethod;
    use sessiond_session::{SessionPolicy, StaticVerifier};

    use super::*;

    const ALICE_DIGEST: &str =
        "207cf410532f92a47dee245ce9b11ff71f578ebd763eb3bbea44ebd043d018fb";

    /// 20s expiration, 5s keep-alive, one static user.
    fn dispatcher() -> Dispatcher<StaticVerifier> {
        let store = Arc::new(SessionStore::new(SessionPolicy::new(
            Duration::from_secs(20),
            Duration::from_secs(5),
        )));
        let verifier = StaticVerifier::new(vec![Credential::new(
            AuthMethod::Digest,
            "alice",
            ALICE_DIGEST,
        )]);
        Dispatcher::new(store, verifier)
    }

    async fn call(d: &Dispatcher<StaticVerifier>, body: Value) -> Reply {
        d.handle(&serde_json::to_vec(&body).unwrap()).await
    }

    fn envelope(reply: Reply) -> Response {
        match reply {
            Reply::Envelope(response) => response,
            Reply::Ack => panic!("expected an envelope, got Ack"),
        }
    }

    fn login_body(id: Value, user: &str, data: &str) -> Value {
        json!({
            "jsonrpc": "2.0", "id": id, "method": "login",
            "params": {"version": 0, "type": 1, "username": user, "data": data}
        })
    }

    fn keepalive_body(id: Value, session_id: &str) -> Value {
        json!({
            "jsonrpc": "2.0", "id": id, "method": "keepalive",
            "params": {"session_id": session_id}
        })
    }

    fn logout_body(session_id: &str) -> Value {
        json!({"jsonrpc": "2.0", "method": "logout", "params": {"session_id": session_id}})
    }

    /// Logs alice in and returns the issued session id.
    async fn login(d: &Dispatcher<StaticVerifier>) -> String {
        let response = envelope(call(d, login_body(json!(1), "alice", ALICE_DIGEST)).await);
        let grant: SessionGrant = serde_json::from_value(response.result.unwrap()).unwrap();
        grant.session_id.0
    }

    // =====================================================================
    // login
    // =====================================================================

    #[tokio::test]
    async fn test_login_success_grants_session() {
        let d = dispatcher();

        let response =
            envelope(call(&d, login_body(json!("req-1"), "alice", ALICE_DIGEST)).await);

        assert_eq!(response.id, Some(json!("req-1")));
        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["interval"], json!(5));
        let session_id = result["session_id"].as_str().unwrap();
        assert!(d.store().get(&SessionId::from(session_id)).is_some());
    }

    #[tokio::test]
    async fn test_login_issues_unique_ids() {
        let d = dispatcher();
        let mut ids = HashSet::new();
        for _ in 0..20 {
            ids.insert(login(&d).await);
        }
        assert_eq!(ids.len(), 20);
        assert_eq!(d.store().len(), 20);
    }

    #[tokio::test]
    async fn test_login_wrong_proof_fails_without_session() {
        let d = dispatcher();
        let wrong = format!("{}0", &ALICE_DIGEST[..63]);

        let response = envelope(call(&d, login_body(json!(7), "alice", &wrong)).await);

        assert_eq!(response.error_code(), Some(RpcCode::AuthenticationFailed));
        assert_eq!(response.id, Some(json!(7)));
        assert!(d.store().is_empty());
    }

    #[tokio::test]
    async fn test_login_unknown_subject_fails() {
        let d = dispatcher();

        let response = envelope(call(&d, login_body(json!(1), "mallory", ALICE_DIGEST)).await);

        assert_eq!(response.error_code(), Some(RpcCode::AuthenticationFailed));
        assert!(d.store().is_empty());
    }

    #[tokio::test]
    async fn test_login_without_id_is_invalid_request() {
        let d = dispatcher();
        let body = json!({
            "jsonrpc": "2.0", "method": "login",
            "params": {"type": 1, "username": "alice", "data": ALICE_DIGEST}
        });

        let response = envelope(call(&d, body).await);

        assert_eq!(response.error_code(), Some(RpcCode::InvalidRequest));
        assert_eq!(response.id, None);
        assert!(d.store().is_empty());
    }

    #[tokio::test]
    async fn test_login_without_params_is_invalid_request() {
        let d = dispatcher();

        let response = envelope(call(&d, json!({"id": 4, "method": "login"})).await);

        assert_eq!(response.error_code(), Some(RpcCode::InvalidRequest));
        assert!(d.store().is_empty());
    }

    #[tokio::test]
    async fn test_login_mistyped_params_echo_id() {
        let d = dispatcher();

        let response = envelope(
            call(&d, json!({"id": 9, "method": "login", "params": {"username": 5}})).await,
        );

        assert_eq!(response.error_code(), Some(RpcCode::InvalidRequest));
        assert_eq!(response.id, Some(json!(9)));
    }

    #[tokio::test]
    async fn test_login_missing_fields_fail_authentication() {
        let d = dispatcher();

        let response = envelope(
            call(&d, json!({"id": 9, "method": "login", "params": {"username": "alice"}})).await,
        );

        assert_eq!(response.error_code(), Some(RpcCode::AuthenticationFailed));
        assert_eq!(response.id, Some(json!(9)));
        assert!(d.store().is_empty());
    }

    #[tokio::test]
    async fn test_login_null_fields_fail_authentication() {
        let d = dispatcher();
        let body = json!({
            "jsonrpc": null, "id": 3, "method": "login",
            "params": {"type": null, "username": "alice", "data": null}
        });

        let response = envelope(call(&d, body).await);

        assert_eq!(response.error_code(), Some(RpcCode::AuthenticationFailed));
        assert_eq!(response.id, Some(json!(3)));
    }

    // =====================================================================
    // keepalive
    // =====================================================================

    #[tokio::test]
    async fn test_keepalive_after_login_succeeds() {
        let d = dispatcher();
        let session_id = login(&d).await;

        let response = envelope(call(&d, keepalive_body(json!(2), &session_id)).await);

        assert_eq!(response.id, Some(json!(2)));
        let grant: SessionGrant = serde_json::from_value(response.result.unwrap()).unwrap();
        assert_eq!(grant.session_id.as_str(), session_id);
        assert_eq!(grant.interval, 5);
    }

    #[tokio::test]
    async fn test_keepalive_unknown_session_is_not_found() {
        let d = dispatcher();

        let response = envelope(call(&d, keepalive_body(json!(2), "no-such-session")).await);

        assert_eq!(response.error_code(), Some(RpcCode::SessionNotFound));
        assert_eq!(response.id, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_keepalive_expired_session_then_not_found() {
        let d = dispatcher();
        let long_ago = Instant::now()
            .checked_sub(Duration::from_secs(60))
            .expect("monotonic clock older than a minute");
        let session = d.store().create_at(long_ago);

        let first = envelope(call(&d, keepalive_body(json!(1), session.id.as_str())).await);
        assert_eq!(first.error_code(), Some(RpcCode::SessionExpired));

        let second = envelope(call(&d, keepalive_body(json!(2), session.id.as_str())).await);
        assert_eq!(second.error_code(), Some(RpcCode::SessionNotFound));
    }

    #[tokio::test]
    async fn test_keepalive_empty_params_is_not_found() {
        let d = dispatcher();
        login(&d).await;

        let response =
            envelope(call(&d, json!({"id": 6, "method": "keepalive", "params": {}})).await);

        assert_eq!(response.error_code(), Some(RpcCode::SessionNotFound));
        assert_eq!(response.id, Some(json!(6)));
    }

    #[tokio::test]
    async fn test_keepalive_without_id_is_invalid_request() {
        let d = dispatcher();
        let session_id = login(&d).await;
        let body = json!({"method": "keepalive", "params": {"session_id": session_id}});

        let response = envelope(call(&d, body).await);

        assert_eq!(response.error_code(), Some(RpcCode::InvalidRequest));
        assert_eq!(response.id, None);
    }

    // =====================================================================
    // logout
    // =====================================================================

    #[tokio::test]
    async fn test_logout_acks_and_removes_session() {
        let d = dispatcher();
        let session_id = login(&d).await;

        let reply = call(&d, logout_body(&session_id)).await;
        assert_eq!(reply, Reply::Ack);
        assert!(d.encode(&reply).is_empty());

        let response = envelope(call(&d, keepalive_body(json!(3), &session_id)).await);
        assert_eq!(response.error_code(), Some(RpcCode::SessionNotFound));
    }

    #[tokio::test]
    async fn test_logout_unknown_session_still_acks() {
        let d = dispatcher();
        assert_eq!(call(&d, logout_body("never-issued")).await, Reply::Ack);
    }

    #[tokio::test]
    async fn test_logout_with_id_is_invalid_request_without_id() {
        let d = dispatcher();
        let session_id = login(&d).await;
        let body = json!({"id": 5, "method": "logout", "params": {"session_id": session_id}});

        let response = envelope(call(&d, body).await);

        assert_eq!(response.error_code(), Some(RpcCode::InvalidRequest));
        assert_eq!(response.id, None);
        // Rejected before the store was touched.
        assert_eq!(d.store().len(), 1);
    }

    // =====================================================================
    // envelope errors
    // =====================================================================

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let d = dispatcher();

        let response = envelope(d.handle(b"{\"jsonrpc\": \"2.0\", \"id\":").await);

        assert_eq!(response.error_code(), Some(RpcCode::ParseError));
        assert_eq!(response.id, None);
    }

    #[tokio::test]
    async fn test_missing_method_is_method_not_found() {
        let d = dispatcher();
        let response = envelope(call(&d, json!({"jsonrpc": "2.0", "id": 1})).await);
        assert_eq!(response.error_code(), Some(RpcCode::MethodNotFound));
        assert_eq!(response.id, None);
    }

    #[tokio::test]
    async fn test_null_method_is_method_not_found() {
        let d = dispatcher();
        let response = envelope(call(&d, json!({"id": 1, "method": null})).await);
        assert_eq!(response.error_code(), Some(RpcCode::MethodNotFound));
    }

    #[tokio::test]
    async fn test_mistyped_method_is_parse_error() {
        let d = dispatcher();
        let response = envelope(call(&d, json!({"id": 1, "method": 7})).await);
        assert_eq!(response.error_code(), Some(RpcCode::ParseError));
    }

    #[tokio::test]
    async fn test_unknown_method_is_method_not_found() {
        let d = dispatcher();

        let response = envelope(call(&d, json!({"jsonrpc": "2.0", "id": 1, "method": "whoami"})).await);

        assert_eq!(response.error_code(), Some(RpcCode::MethodNotFound));
        assert_eq!(response.id, None);
    }

    #[tokio::test]
    async fn test_encoded_error_matches_wire_format() {
        let d = dispatcher();

        let reply = call(&d, json!({"id": 1, "method": "whoami"})).await;

        assert_eq!(
            d.encode(&reply),
            br#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"method not found"}}"#
        );
    }

    #[tokio::test]
    async fn test_reply_envelope_accessor() {
        let d = dispatcher();
        let reply = call(&d, json!({"id": 1, "method": "whoami"})).await;
        assert!(reply.envelope().is_some());
        assert!(Reply::Ack.envelope().is_none());
    }
}
