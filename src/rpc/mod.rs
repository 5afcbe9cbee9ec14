//! # RPC Module
//!
//! Binary RPC over a persistent socket. Each length-prefixed frame carries one
//! packet that decodes to an [`RpcEnvelope`]; the envelope's `func` selects a
//! registered [`RpcService`]; the outcome is always written back as an encoded
//! [`RpcResult`], including on failure.
//!
//! ```text
//! frame bytes ─► RpcCodec::decode ─► RpcEnvelope ─► RpcDispatcher::dispatch
//!                                                        │
//! frame bytes ◄─ RpcCodec::encode ◄─ RpcResult ◄─────────┘
//! ```

mod codec;
mod dispatcher;
pub mod frame;
mod types;

pub use codec::{JsonCodec, RpcCodec};
pub use dispatcher::{RpcDispatcher, RpcService};
pub use types::{RpcEnvelope, RpcResult, RpcStatus};
