//! The frame envelope: every wire message travels as a 4-byte big-endian
//! length followed by that many payload bytes.
//!
//! Two quirks are part of the wire contract:
//!
//! - A decoded length of zero is a no-op frame.  It is skipped and reading
//!   continues; peers on some forks emit these as keep-alives, so turning
//!   them into an error would break interoperability.
//! - A length field that ends (fewer than 4 bytes) at hangup is a clean
//!   end of stream, not an error.  Hangup in the middle of a payload also
//!   surfaces as end of stream; the broken frame is never retried.

use crate::infrastructure::network::stream::ConnectionBuffers;
use crate::infrastructure::network::NetworkError;
use edgehop_core::protocol::codec::{decode_message, encode_message};
use edgehop_core::protocol::messages::{Message, MAX_FRAME_LENGTH};
use tracing::{debug, trace};

/// Queues one framed payload.  Returns `false` when the connection's output
/// is already closed.
///
/// The length prefix and payload go into the output ring in a single
/// append, so concurrent senders can never interleave partial frames.
pub fn write_frame(buffers: &ConnectionBuffers, payload: &[u8]) -> bool {
    let mut framed = Vec::with_capacity(4 + payload.len());
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(payload);
    buffers.write_output(&framed)
}

/// Awaits the next frame's payload.
///
/// Returns `Ok(None)` at end of stream (including hangup mid-frame) and
/// skips zero-length no-op frames.
///
/// # Errors
///
/// Returns [`NetworkError::FrameTooLarge`] when the declared length
/// exceeds [`MAX_FRAME_LENGTH`]; the connection should be dropped.
pub async fn read_frame(buffers: &ConnectionBuffers) -> Result<Option<Vec<u8>>, NetworkError> {
    loop {
        let Some(header) = buffers.read_exact(4).await else {
            return Ok(None);
        };
        let declared = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        if declared == 0 {
            // Documented wire quirk: an empty frame means "nothing".
            trace!("skipping zero-length no-op frame");
            continue;
        }
        if declared > MAX_FRAME_LENGTH {
            return Err(NetworkError::FrameTooLarge { declared });
        }
        match buffers.read_exact(declared).await {
            Some(payload) => return Ok(Some(payload)),
            None => {
                debug!("stream hung up {declared}-byte frame short; treating as end of stream");
                return Ok(None);
            }
        }
    }
}

/// Encodes and frames one message.  Returns `false` when the output is
/// closed.
///
/// # Errors
///
/// Returns [`NetworkError::Protocol`] only for a catalogue inconsistency,
/// which [`edgehop_core::protocol::codec::validate_catalogue`] rules out at
/// startup.
pub fn send_message(buffers: &ConnectionBuffers, msg: &Message) -> Result<bool, NetworkError> {
    let payload = encode_message(msg)?;
    Ok(write_frame(buffers, &payload))
}

/// Awaits and decodes the next message.  `Ok(None)` at end of stream.
///
/// # Errors
///
/// Oversized frames and undecodable payloads are protocol violations.
pub async fn recv_message(buffers: &ConnectionBuffers) -> Result<Option<Message>, NetworkError> {
    match read_frame(buffers).await? {
        Some(payload) => Ok(Some(decode_message(&payload)?)),
        None => Ok(None),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
