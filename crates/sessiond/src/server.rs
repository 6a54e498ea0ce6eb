//! `SessiondServer` builder and server loop.
//!
//! This is the entry point for running sessiond. It ties together all the
//! layers: HTTP → protocol → dispatcher → session store, plus the reaper
//! running beside them.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use sessiond_protocol::{Codec, JsonCodec, RpcCode};
use sessiond_reaper::{Reaper, ReaperConfig};
use sessiond_session::{CredentialVerifier, SessionPolicy, SessionStore};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::SessiondError;
use crate::config::{DEFAULT_RPC_PATH, Settings};
use crate::handler::{Dispatcher, Reply};

/// Largest request body read by default. Bigger bodies get a `ParseError`
/// envelope.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Builder for configuring and starting a sessiond server.
///
/// # Example
///
/// ```rust,ignore
/// use sessiond::prelude::*;
///
/// let server = SessiondServer::builder()
///     .bind("127.0.0.1:8080".parse()?)
///     .policy(SessionPolicy::new(Duration::from_secs(20), Duration::from_secs(5)))
///     .build(verifier)
///     .await?;
/// server.run(cancel).await
/// ```
pub struct SessiondServerBuilder {
    bind_addr: SocketAddr,
    rpc_path: String,
    policy: SessionPolicy,
    reaper: ReaperConfig,
    max_body_bytes: usize,
}

impl SessiondServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            rpc_path: DEFAULT_RPC_PATH.to_owned(),
            policy: SessionPolicy::default(),
            reaper: ReaperConfig::default(),
            max_body_bytes: MAX_BODY_BYTES,
        }
    }

    /// Sets the address to bind to. Port 0 picks a free port.
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the HTTP path that accepts JSON-RPC posts.
    pub fn rpc_path(mut self, path: impl Into<String>) -> Self {
        self.rpc_path = path.into();
        self
    }

    pub fn policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn reaper_config(mut self, config: ReaperConfig) -> Self {
        self.reaper = config;
        self
    }

    /// Caps the request body size. Defaults to [`MAX_BODY_BYTES`].
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Applies everything a validated config file specifies.
    pub fn settings(self, settings: Settings) -> Self {
        self.bind(settings.addr)
            .rpc_path(settings.rpc_path)
            .policy(settings.policy)
    }

    /// Binds the listener and assembles the server around `verifier`.
    ///
    /// Uses `JsonCodec` on the wire.
    pub async fn build<V: CredentialVerifier>(
        self,
        verifier: V,
    ) -> Result<SessiondServer<V>, SessiondError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let store = Arc::new(SessionStore::new(self.policy));

        Ok(SessiondServer {
            listener,
            rpc_path: self.rpc_path,
            dispatcher: Arc::new(Dispatcher::new(store, verifier)),
            reaper: self.reaper,
            max_body_bytes: self.max_body_bytes,
        })
    }
}

impl Default for SessiondServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound sessiond server.
///
/// Call [`run()`](Self::run) to start serving requests.
pub struct SessiondServer<V, C = JsonCodec> {
    listener: TcpListener,
    rpc_path: String,
    dispatcher: Arc<Dispatcher<V, C>>,
    reaper: ReaperConfig,
    max_body_bytes: usize,
}

impl SessiondServer<(), JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> SessiondServerBuilder {
        SessiondServerBuilder::new()
    }
}

impl<V, C> SessiondServer<V, C>
where
    V: CredentialVerifier,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The session store shared by the handlers and the reaper.
    pub fn store(&self) -> &Arc<SessionStore> {
        self.dispatcher.store()
    }

    /// The HTTP routes: a single POST endpoint at the RPC path.
    pub fn router(&self) -> Router {
        Router::new()
            .route(&self.rpc_path, post(rpc_endpoint::<V, C>))
            .with_state((Arc::clone(&self.dispatcher), self.max_body_bytes))
    }

    /// Serves requests and runs the reaper until `cancel` fires.
    ///
    /// On cancellation the listener stops accepting, in-flight requests
    /// finish, and the reaper is stopped and awaited.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), SessiondError> {
        let addr = self.local_addr()?;
        let router = self.router();
        let reaper = Reaper::spawn(Arc::clone(self.store()), self.reaper, cancel.clone());

        tracing::info!(%addr, rpc_path = %self.rpc_path, "sessiond listening");

        let served = axum::serve(self.listener, router)
            .with_graceful_shutdown(cancel.clone().cancelled_owned())
            .await;

        // The listener may have failed on its own; stop the reaper either way.
        cancel.cancel();
        match reaper.await {
            Ok(stats) => tracing::debug!(
                sweeps = stats.sweeps,
                evicted = stats.evicted,
                "reaper finished"
            ),
            Err(e) => tracing::warn!(error = %e, "reaper task failed"),
        }

        served?;
        tracing::info!("sessiond stopped");
        Ok(())
    }
}

/// Every reply is HTTP 200. Errors travel in the envelope, including a body
/// that is too large or can't be read.
async fn rpc_endpoint<V, C>(
    State((dispatcher, limit)): State<(Arc<Dispatcher<V, C>>, usize)>,
    body: Body,
) -> Response
where
    V: CredentialVerifier,
    C: Codec,
{
    let reply = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => dispatcher.handle(&bytes).await,
        Err(e) => {
            tracing::debug!(error = %e, limit, "failed to read request body");
            Reply::error(None, RpcCode::ParseError)
        }
    };
    match reply {
        Reply::Envelope(_) => {
            let bytes = dispatcher.encode(&reply);
            ([(header::CONTENT_TYPE, "application/json")], bytes).into_response()
        }
        Reply::Ack => StatusCode::OK.into_response(),
    }
}
