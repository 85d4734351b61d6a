//! Protocol module: the message catalogue, the binary codec, and the
//! handshake/version rules.

pub mod codec;
pub mod handshake;
pub mod messages;

pub use codec::{decode_message, encode_message, validate_catalogue, ProtocolError};
pub use handshake::{is_compatible, Version, PROTOCOL_VERSION};
pub use messages::*;
