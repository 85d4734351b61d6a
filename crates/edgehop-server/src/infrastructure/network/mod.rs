//! Network infrastructure for the Edgehop server.
//!
//! # Sub-modules
//!
//! - **`ring`** – the growable byte queue each connection direction buffers
//!   through.
//! - **`stream`** – the buffered stream pair: both rings behind one lock
//!   with the wake signals the I/O task and interpreter coordinate on.
//! - **`connection`** – single-owner socket handle plus the per-connection
//!   I/O task; encodes the teardown order once.
//! - **`packet`** – the length-prefixed frame envelope over a stream pair,
//!   and the message-level send/receive glue to the core codec.
//! - **`handshake`** – the server side of the greeting exchange and
//!   version gate.
//! - **`interpreter`** – the version-bound loop turning inbound client
//!   messages into session-table calls.
//! - **`link`** – the [`ScreenLink`](crate::application::session::ScreenLink)
//!   implementation that queues protocol messages onto a connection's
//!   output ring.

pub mod connection;
pub mod handshake;
pub mod interpreter;
pub mod link;
pub mod packet;
pub mod ring;
pub mod stream;

use crate::application::session::SessionError;
use edgehop_core::protocol::codec::ProtocolError;
use edgehop_core::protocol::handshake::Version;
use edgehop_core::protocol::messages::{MAX_FRAME_LENGTH, MAX_HELLO_LENGTH};
use std::net::SocketAddr;
use thiserror::Error;

/// Error type for the connection layer.
///
/// Everything here is fatal to one connection only; the accept loop and
/// other connections keep running.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("handshake timed out")]
    HandshakeTimeout,

    #[error("connection closed during handshake")]
    ClosedDuringHandshake,

    #[error("greeting of {len} bytes exceeds the {MAX_HELLO_LENGTH}-byte cap")]
    HelloTooLong { len: usize },

    /// Expected, well-formed outcome: reported to the client with an
    /// `EICV` message before the close, unlike a protocol violation.
    #[error("incompatible client version {version}")]
    IncompatibleVersion { version: Version },

    #[error("screen name \"{0}\" is already connected")]
    DuplicateName(String),

    #[error("frame declares {declared} bytes, cap is {MAX_FRAME_LENGTH}")]
    FrameTooLarge { declared: usize },

    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("client sent \"{tag}\", which only the server may send")]
    UnexpectedMessage { tag: String },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
