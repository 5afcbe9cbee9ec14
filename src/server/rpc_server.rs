use std::io::{self, Write};
use std::net::ToSocketAddrs;
use std::sync::Arc;

use may::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::connection::{ConnectionId, RpcConnection};
use super::http_server::ServerHandle;
use crate::application::Application;
use crate::error::DispatchError;
use crate::rpc::frame::{read_frame, write_frame, DEFAULT_MAX_FRAME_BYTES};

/// Default coroutine stack size for connection handlers.
pub const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Length-prefixed RPC listener.
///
/// Each accepted socket gets its own coroutine. Every frame read from the
/// socket is one invocation of [`Application::handle_rpc`]; replies are
/// written back on the same socket in request order.
#[derive(Clone)]
pub struct RpcServer {
    app: Arc<Application>,
    max_frame_bytes: usize,
    stack_size: usize,
}

impl RpcServer {
    #[must_use]
    pub fn new(app: Arc<Application>) -> Self {
        Self {
            app,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }

    #[must_use]
    pub fn max_frame_bytes(mut self, max: usize) -> Self {
        self.max_frame_bytes = max;
        self
    }

    #[must_use]
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    /// Bind `addr` and start accepting connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the acceptor
    /// coroutine cannot be spawned.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let listener = TcpListener::bind(addr)?;
        let local = listener.local_addr()?;
        info!(addr = %local, max_frame_bytes = self.max_frame_bytes, "RPC server listening");

        // SAFETY: may marks spawn unsafe because coroutines must not block the
        // worker thread with thread-local state; the accept loop only uses
        // may's own non-blocking sockets.
        let handle = unsafe {
            may::coroutine::Builder::new()
                .name("rpc-acceptor".to_string())
                .stack_size(self.stack_size)
                .spawn(move || self.accept_loop(listener))
        }?;
        Ok(ServerHandle::new(local, handle))
    }

    fn accept_loop(self, listener: TcpListener) {
        let mut next_id = 0u64;
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "Failed to accept rpc connection");
                    continue;
                }
            };
            next_id += 1;
            let id = ConnectionId(next_id);
            let app = Arc::clone(&self.app);
            let max = self.max_frame_bytes;

            // SAFETY: same constraints as the acceptor; the handler owns its
            // stream and shares the application only through an Arc.
            let spawned = unsafe {
                may::coroutine::Builder::new()
                    .stack_size(self.stack_size)
                    .spawn(move || serve_connection(&app, stream, id, max))
            };
            if let Err(e) = spawned {
                warn!(connection = %id, error = %e, "Failed to spawn rpc connection handler");
            }
        }
    }
}

/// Read frames from one socket until it closes or misbehaves.
fn serve_connection(app: &Application, stream: TcpStream, id: ConnectionId, max_frame_bytes: usize) {
    let mut reader = match stream.try_clone() {
        Ok(r) => r,
        Err(e) => {
            warn!(connection = %id, error = %e, "Failed to clone rpc stream");
            return;
        }
    };
    let mut conn = StreamConnection::new(id, stream);
    debug!(connection = %id, "RPC connection opened");

    loop {
        match read_frame(&mut reader, max_frame_bytes) {
            Ok(Some(payload)) => app.handle_rpc(&mut conn, id, &payload),
            Ok(None) => break,
            Err(err @ DispatchError::FrameTooLarge { .. }) => {
                app.reply_rpc_error(&mut conn, id, &err);
                break;
            }
            Err(e) => {
                debug!(connection = %id, error = %e, "RPC connection aborted");
                break;
            }
        }
    }
    debug!(connection = %id, "RPC connection closed");
}

/// [`RpcConnection`] over one socket; replies are framed like requests.
pub struct StreamConnection<W> {
    id: ConnectionId,
    stream: W,
}

impl<W: Write> StreamConnection<W> {
    pub fn new(id: ConnectionId, stream: W) -> Self {
        Self { id, stream }
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}

impl<W: Write> RpcConnection for StreamConnection<W> {
    fn send(&mut self, id: ConnectionId, payload: &[u8]) -> io::Result<()> {
        if id != self.id {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("{id} is not served by {}", self.id),
            ));
        }
        write_frame(&mut self.stream, payload)
    }
}
