//! # Server Module
//!
//! Transport-facing types and the two listeners that feed the
//! [`Application`](crate::application::Application):
//!
//! - [`HttpEntry`] adapts `may_minihttp` requests into [`HttpRequest`] and
//!   writes [`HttpResponse`] back through a [`ResponseWriter`]
//! - [`RpcServer`] accepts TCP sockets on the `may` runtime and reads
//!   length-prefixed frames, one invocation per frame
//!
//! The orchestrator only sees [`HttpRequest`], [`ResponseWriter`] and
//! [`RpcConnection`], so tests drive it with in-memory implementations.

mod connection;
mod http_server;
mod request;
mod response;
mod rpc_server;

pub use connection::{ConnectionId, RpcConnection};
pub use http_server::{HttpEntry, HttpServer, ServerHandle};
pub use request::{
    parse_query_params, HeaderVec, HttpRequest, MAX_INLINE_HEADERS, SPAN_ID_HEADER,
    TRACE_ID_HEADER,
};
pub use response::{status_reason, HttpExchange, HttpResponse, ResponseWriter};
pub use rpc_server::{RpcServer, StreamConnection, DEFAULT_STACK_SIZE};
