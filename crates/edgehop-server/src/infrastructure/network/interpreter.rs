//! The version-bound protocol interpreter.
//!
//! One interpreter runs per connection after a successful handshake,
//! consuming framed messages and applying them to the session table
//! through the dispatcher.  Clients may send exactly four things (noop,
//! clipboard grab, clipboard data, and screen info); anything else is a
//! protocol violation that ends the connection.

use crate::application::dispatch::Dispatcher;
use crate::infrastructure::network::packet::recv_message;
use crate::infrastructure::network::stream::ConnectionBuffers;
use crate::infrastructure::network::NetworkError;
use edgehop_core::protocol::codec::ProtocolError;
use edgehop_core::protocol::handshake::Version;
use edgehop_core::protocol::messages::{tag_display, Message, CLIPBOARD_CHANNELS};
use tokio::sync::watch;
use tracing::trace;

/// Interprets one negotiated connection's inbound messages.
pub struct Interpreter {
    version: Version,
}

impl Interpreter {
    /// Picks the interpreter for a negotiated version.  There is a single
    /// wire generation today; this constructor is where a future minor
    /// revision would select different message handling.
    pub fn for_version(version: Version) -> Self {
        Interpreter { version }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Consumes messages until the peer disconnects, the server shuts
    /// down, or the client violates the protocol.
    ///
    /// # Errors
    ///
    /// Any [`NetworkError`] is fatal to this connection only.
    pub async fn run(
        &self,
        name: &str,
        buffers: &ConnectionBuffers,
        dispatcher: &Dispatcher,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<(), NetworkError> {
        loop {
            let msg = tokio::select! {
                res = recv_message(buffers) => match res? {
                    Some(msg) => msg,
                    None => return Ok(()),
                },
                _ = shutdown_rx.changed() => return Ok(()),
            };
            self.apply(name, msg, dispatcher)?;
        }
    }

    fn apply(&self, name: &str, msg: Message, dispatcher: &Dispatcher) -> Result<(), NetworkError> {
        trace!("\"{name}\" sent \"{}\"", tag_display(&msg.tag()));
        match msg {
            Message::Noop => Ok(()),
            Message::ScreenInfo { width, height, zone } => {
                dispatcher.update_screen_info(name, width, height, zone)?;
                Ok(())
            }
            Message::GrabClipboard { id } => {
                check_clipboard_id(id)?;
                dispatcher.handle_grab_clipboard(name, id);
                Ok(())
            }
            Message::ClipboardData { id, data } => {
                check_clipboard_id(id)?;
                dispatcher.handle_clipboard_data(name, id, data);
                Ok(())
            }
            other => Err(NetworkError::UnexpectedMessage { tag: tag_display(&other.tag()) }),
        }
    }
}

fn check_clipboard_id(id: u8) -> Result<(), NetworkError> {
    if id >= CLIPBOARD_CHANNELS {
        return Err(NetworkError::Protocol(ProtocolError::MalformedPayload(format!(
            "clipboard channel {id} is out of range"
        ))));
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatch::PrimaryScreen;
    use crate::application::session::{ScreenLink, SessionTable};
    use edgehop_core::domain::topology::ScreenMap;
    use edgehop_core::protocol::handshake::PROTOCOL_VERSION;
    use std::sync::Arc;

    struct SilentPrimary;
    impl PrimaryScreen for SilentPrimary {
        fn size(&self) -> (i32, i32) {
            (1920, 1080)
        }
        fn jump_zone(&self) -> i32 {
            1
        }
        fn cursor_pos(&self) -> (i32, i32) {
            (0, 0)
        }
        fn enter(&self, _x: i32, _y: i32) {}
        fn leave(&self) {}
        fn warp_cursor(&self, _x: i32, _y: i32) {}
        fn set_clipboard(&self, _id: u8, _data: &[u8]) {}
    }

    struct NullLink;
    impl ScreenLink for NullLink {
        fn send(&self, _msg: &Message) {}
    }

    fn dispatcher_with_ingrid() -> Dispatcher {
        let mut map = ScreenMap::new();
        map.add_screen("server");
        map.add_screen("ingrid");
        map.connect("server", edgehop_core::domain::topology::Direction::Right, "ingrid").unwrap();
        let table = SessionTable::new("server", 1920, 1080, 1, map).unwrap();
        let dispatcher = Dispatcher::new(table, Arc::new(SilentPrimary), 0);
        dispatcher.register_screen("ingrid", Arc::new(NullLink)).unwrap();
        dispatcher
    }

    #[test]
    fn test_screen_info_makes_the_screen_a_jump_destination() {
        let dispatcher = dispatcher_with_ingrid();
        let interp = Interpreter::for_version(PROTOCOL_VERSION);

        // Before the info report the screen has no usable geometry.
        dispatcher.on_mouse_move_primary(1919, 540);
        assert_eq!(dispatcher.active_screen_name(), "server");

        interp
            .apply("ingrid", Message::ScreenInfo { width: 1024, height: 768, zone: 1 }, &dispatcher)
            .unwrap();

        dispatcher.on_mouse_move_primary(1919, 540);
        assert_eq!(dispatcher.active_screen_name(), "ingrid");
    }

    #[test]
    fn test_one_pixel_screen_info_is_rejected() {
        let dispatcher = dispatcher_with_ingrid();
        let interp = Interpreter::for_version(PROTOCOL_VERSION);

        let result = interp.apply(
            "ingrid",
            Message::ScreenInfo { width: 1024, height: 1, zone: 1 },
            &dispatcher,
        );
        assert!(matches!(result, Err(NetworkError::Session(_))));
    }

    #[test]
    fn test_noop_is_accepted_silently() {
        let dispatcher = dispatcher_with_ingrid();
        let interp = Interpreter::for_version(PROTOCOL_VERSION);
        interp.apply("ingrid", Message::Noop, &dispatcher).unwrap();
    }

    #[test]
    fn test_server_only_messages_from_a_client_are_violations() {
        let dispatcher = dispatcher_with_ingrid();
        let interp = Interpreter::for_version(PROTOCOL_VERSION);

        for msg in [
            Message::Enter { x: 0, y: 0, mask: 0 },
            Message::Leave,
            Message::KeyDown { key: 1, mask: 0 },
            Message::QueryInfo,
            Message::Close,
        ] {
            let result = interp.apply("ingrid", msg, &dispatcher);
            assert!(matches!(result, Err(NetworkError::UnexpectedMessage { .. })));
        }
    }

    #[test]
    fn test_out_of_range_clipboard_channel_is_a_violation() {
        let dispatcher = dispatcher_with_ingrid();
        let interp = Interpreter::for_version(PROTOCOL_VERSION);

        let result =
            interp.apply("ingrid", Message::GrabClipboard { id: CLIPBOARD_CHANNELS }, &dispatcher);
        assert!(matches!(result, Err(NetworkError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_run_ends_cleanly_when_the_stream_hangs_up() {
        let dispatcher = dispatcher_with_ingrid();
        let interp = Interpreter::for_version(PROTOCOL_VERSION);
        let buffers = ConnectionBuffers::new();
        buffers.hangup_input();
        let (_tx, rx) = watch::channel(false);

        interp.run("ingrid", &buffers, &dispatcher, rx).await.unwrap();
    }

    #[tokio::test]
    async fn test_run_ends_when_shutdown_is_signalled() {
        let dispatcher = dispatcher_with_ingrid();
        let interp = Interpreter::for_version(PROTOCOL_VERSION);
        let buffers = ConnectionBuffers::new();
        let (tx, rx) = watch::channel(false);

        let run = interp.run("ingrid", &buffers, &dispatcher, rx);
        tx.send(true).unwrap();
        run.await.unwrap();
    }
}
