//! Error taxonomy for one invocation.
//!
//! Every failure raised while handling an HTTP request or an RPC packet is a
//! [`DispatchError`]. Errors travel up to the two entry points on
//! [`Application`](crate::application::Application), where they are converted
//! into a well-formed response: an error-handler response for HTTP, an error
//! [`RpcResult`](crate::rpc::RpcResult) for RPC. A rejected filter chain is
//! not an error and never produces one.

use std::io;

use thiserror::Error;

/// Errors surfaced while resolving, dispatching or encoding one invocation.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route matches the request path and method.
    #[error("route not found: uri={uri} method={method}")]
    RouteNotFound { uri: String, method: String },

    /// A route resolved to a handler that was never registered.
    #[error("no controller registered for handler '{handler}'")]
    ControllerNotFound { handler: String },

    /// The controller exists but does not implement the requested action.
    #[error("controller '{handler}' has no action '{action}'")]
    ActionNotFound { handler: String, action: String },

    /// The inbound RPC payload could not be decoded into an envelope.
    #[error("failed to decode rpc payload: {message}")]
    Decode { message: String },

    /// A result could not be encoded for the wire.
    #[error("failed to encode rpc result: {message}")]
    Encode { message: String },

    /// No RPC service is registered under the requested function name.
    #[error("rpc function not found: {func}")]
    ServiceNotFound { func: String },

    /// The handler raised during execution.
    #[error("{message}")]
    ServiceInvocation { code: i32, message: String },

    /// An inbound frame declared a length above the configured limit.
    #[error("frame of {size} bytes exceeds {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },

    /// IO failure on the underlying connection.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

impl DispatchError {
    /// Numeric code carried on the RPC wire for this error.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::RouteNotFound { .. }
            | Self::ControllerNotFound { .. }
            | Self::ActionNotFound { .. }
            | Self::ServiceNotFound { .. } => 404,
            Self::Decode { .. } => 400,
            Self::FrameTooLarge { .. } => 413,
            Self::Encode { .. } => 500,
            Self::Transport(_) => 503,
            Self::ServiceInvocation { code, .. } => *code,
        }
    }

    /// HTTP status used by the default error handler.
    ///
    /// Application codes outside the 4xx/5xx range map to 500.
    #[must_use]
    pub fn status(&self) -> u16 {
        match u16::try_from(self.code()) {
            Ok(status) if (400..=599).contains(&status) => status,
            _ => 500,
        }
    }

    pub fn route_not_found(uri: impl Into<String>, method: impl Into<String>) -> Self {
        Self::RouteNotFound {
            uri: uri.into(),
            method: method.into(),
        }
    }

    pub fn controller_not_found(handler: impl Into<String>) -> Self {
        Self::ControllerNotFound {
            handler: handler.into(),
        }
    }

    pub fn action_not_found(handler: impl Into<String>, action: impl Into<String>) -> Self {
        Self::ActionNotFound {
            handler: handler.into(),
            action: action.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    pub fn service_not_found(func: impl Into<String>) -> Self {
        Self::ServiceNotFound { func: func.into() }
    }

    /// Creates an application-defined invocation failure.
    pub fn invocation(code: i32, message: impl Into<String>) -> Self {
        Self::ServiceInvocation {
            code,
            message: message.into(),
        }
    }
}
