//! Wire protocol for sessiond.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`Request`], [`Response`], [`SessionGrant`], etc.) — the
//!   JSON-RPC 2.0 envelopes and the payloads of each method.
//! - **Calls** ([`RpcCall`]) — the closed set of methods, each with its own
//!   strongly-typed parameters, decided once per request.
//! - **Codes** ([`RpcCode`]) — the numeric errors that go on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — envelopes to/from bytes.
//!
//! ```text
//! HTTP body (bytes) → Codec → Request → RpcCall → handler → Response → Codec
//! ```

mod call;
mod code;
mod codec;
mod error;
mod types;

pub use call::{METHOD_KEEPALIVE, METHOD_LOGIN, METHOD_LOGOUT, Rejected, RpcCall};
pub use code::RpcCode;
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AuthMethod, JSONRPC_VERSION, LoginParams, Request, Response, RpcError,
    SessionGrant, SessionId, SessionParams,
};
