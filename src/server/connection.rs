use std::fmt;
use std::io;

/// Identifier of one inbound RPC connection/stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Outbound side of an RPC connection.
pub trait RpcConnection {
    /// Write one encoded reply to the connection identified by `id`.
    ///
    /// # Errors
    ///
    /// Returns the transport's IO error, or `NotConnected` if `id` does not
    /// belong to this connection.
    fn send(&mut self, id: ConnectionId, payload: &[u8]) -> io::Result<()>;
}
