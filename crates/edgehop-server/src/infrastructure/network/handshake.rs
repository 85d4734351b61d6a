//! Server side of the greeting exchange.
//!
//! The server speaks first (magic name plus its protocol version) and
//! waits (bounded) for the client's greeting carrying its version and
//! declared screen name.  A newer client, or a test build meeting a
//! release build, is answered with an incompatible-version error before
//! the close; everything garbled is a protocol violation.

use crate::infrastructure::network::packet::{read_frame, send_message, write_frame};
use crate::infrastructure::network::stream::ConnectionBuffers;
use crate::infrastructure::network::NetworkError;
use edgehop_core::protocol::handshake::{
    encode_server_hello, is_compatible, parse_client_hello, Version, PROTOCOL_VERSION,
};
use edgehop_core::protocol::messages::{Message, MAX_HELLO_LENGTH};
use std::time::Duration;
use tracing::debug;

/// A client that gets no further than the greeting holds no resources past
/// this deadline.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    pub name: String,
    pub version: Version,
}

/// Runs the greeting exchange on a fresh connection.
///
/// On version incompatibility the error message is already queued toward
/// the client when this returns; the caller just closes the connection
/// (which drains the queue first).
///
/// # Errors
///
/// [`NetworkError::HandshakeTimeout`], [`NetworkError::ClosedDuringHandshake`],
/// [`NetworkError::HelloTooLong`], [`NetworkError::IncompatibleVersion`], or a
/// protocol violation for a garbled greeting.
pub async fn negotiate(
    buffers: &ConnectionBuffers,
    timeout: Duration,
) -> Result<Negotiated, NetworkError> {
    debug!("saying hello");
    write_frame(buffers, &encode_server_hello(PROTOCOL_VERSION));

    debug!("waiting for hello reply");
    let reply = tokio::time::timeout(timeout, read_frame(buffers))
        .await
        .map_err(|_| NetworkError::HandshakeTimeout)??
        .ok_or(NetworkError::ClosedDuringHandshake)?;
    if reply.len() > MAX_HELLO_LENGTH {
        return Err(NetworkError::HelloTooLong { len: reply.len() });
    }

    let (version, name) = parse_client_hello(&reply)?;
    if !is_compatible(PROTOCOL_VERSION, version) {
        send_message(buffers, &Message::Incompatible)?;
        return Err(NetworkError::IncompatibleVersion { version });
    }

    debug!("client \"{name}\" speaks version {version}");
    Ok(Negotiated { name, version })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
