//! [`ScreenLink`] implementation over a connection's output ring.

use crate::application::session::ScreenLink;
use crate::infrastructure::network::packet::write_frame;
use crate::infrastructure::network::stream::ConnectionBuffers;
use edgehop_core::protocol::codec::encode_message;
use edgehop_core::protocol::messages::{tag_display, Message};
use std::sync::Arc;
use tracing::{debug, error};

/// Queues encoded, framed messages onto one connection's output ring.
/// Sending never blocks; the connection's I/O task delivers in order.
pub struct BufferLink {
    buffers: Arc<ConnectionBuffers>,
}

impl BufferLink {
    pub fn new(buffers: Arc<ConnectionBuffers>) -> Self {
        BufferLink { buffers }
    }
}

impl ScreenLink for BufferLink {
    fn send(&self, msg: &Message) {
        match encode_message(msg) {
            Ok(payload) => {
                if !write_frame(&self.buffers, &payload) {
                    // The connection is tearing down; the departure path
                    // will clean the record up.
                    debug!("dropped \"{}\" for a closing connection", tag_display(&msg.tag()));
                }
            }
            Err(e) => error!("cannot encode \"{}\": {e}", tag_display(&msg.tag())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
