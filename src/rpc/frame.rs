//! Length-prefixed framing for the RPC socket.
//!
//! Each frame is a 4-byte big-endian payload length followed by the payload.

use std::io::{self, Read, Write};

use crate::error::DispatchError;

/// Size of the length prefix in bytes.
pub const FRAME_HEADER_LEN: usize = 4;

/// Default upper bound on a single payload (1 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1 << 20;

/// Read one frame.
///
/// Returns `Ok(None)` on a clean end of stream before any header byte.
///
/// # Errors
///
/// - `FrameTooLarge` when the declared length exceeds `max_frame_bytes`;
///   the payload is not consumed
/// - `Transport` on IO failure or a stream that ends mid-frame
pub fn read_frame<R: Read>(
    reader: &mut R,
    max_frame_bytes: usize,
) -> Result<Option<Vec<u8>>, DispatchError> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut filled = 0;
    while filled < FRAME_HEADER_LEN {
        match reader.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(DispatchError::Transport(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "stream ended inside frame header",
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(DispatchError::Transport(e)),
        }
    }

    let size = u32::from_be_bytes(header) as usize;
    if size > max_frame_bytes {
        return Err(DispatchError::FrameTooLarge {
            size,
            max: max_frame_bytes,
        });
    }

    let mut payload = vec![0u8; size];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

/// Write one frame and flush.
///
/// # Errors
///
/// Returns `InvalidInput` if the payload does not fit a 32-bit length, or the
/// writer's IO error.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame payload too large"))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()
}
