//! # edgehop-core
//!
//! Shared library for Edgehop containing the wire-message catalogue and
//! binary codec, the handshake/version rules, the screen-topology map, and
//! the coordinate-remapping engine.
//!
//! This crate is used by the server application and by test clients.
//! It has zero dependencies on OS APIs, sockets, or the async runtime.
//!
//! # Architecture overview (for beginners)
//!
//! Edgehop is a software KVM switch: one computer (the "primary screen")
//! owns the physical keyboard and mouse, and several other computers
//! ("secondary screens") receive simulated input over TCP.  When the cursor
//! reaches the edge of one screen, control hops to the neighbouring machine
//! and the cursor appears on the far side at the proportionally equivalent
//! position.
//!
//! This crate (`edgehop-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – How bytes travel over the network.  Every message is
//!   a 4-ASCII-byte tag followed by a fixed, declared list of big-endian
//!   fields, carried inside a length-prefixed frame.  The handshake rules
//!   (magic string, version gate) also live here.
//!
//! - **`domain`** – Pure business logic with no OS dependencies.  The two
//!   pieces are the `ScreenMap` (named screens joined by four directional
//!   edges) and the remapping engine that decides which screen a departing
//!   cursor lands on, and where.

// Declare the two top-level modules.  Rust will look for each in a
// subdirectory with the same name (e.g., src/protocol/mod.rs).
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `edgehop_core::Message` instead of `edgehop_core::protocol::messages::Message`.
pub use domain::remap::{find_destination, Landing, ScreenShape, ShapeSource};
pub use domain::topology::{Direction, ScreenMap, TopologyError};
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::handshake::{is_compatible, Version, PROTOCOL_VERSION};
pub use protocol::messages::Message;
