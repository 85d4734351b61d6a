//! The Edgehop message catalogue.
//!
//! Every message on the wire is a 4-ASCII-byte tag followed by a fixed
//! sequence of typed fields in network byte order.  The catalogue below is
//! declarative: each message type appears exactly once as a tag plus an
//! ordered field-kind list, and the codec drives both encoding and decoding
//! from that single declaration.  A format string can drift from its
//! argument list; a schema table cannot.
//!
//! Tag naming convention (first letter):
//! - `C`: command, no reply expected
//! - `Q`: query, the peer must answer with the matching data message
//! - `D`: data, carries a payload
//! - `E`: error, the connection closes afterwards

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Default TCP contact port.
pub const DEFAULT_PORT: u16 = 50001;

/// Maximum total length of the client's hello reply, in bytes.
pub const MAX_HELLO_LENGTH: usize = 1024;

/// Frames declaring a payload longer than this are a protocol violation.
pub const MAX_FRAME_LENGTH: usize = 4 * 1024 * 1024;

/// Number of clipboard channels (selection + primary clipboard on X11-style
/// platforms; other platforms use channel 0 only).
pub const CLIPBOARD_CHANNELS: u8 = 2;

// ── Field typing ──────────────────────────────────────────────────────────────

/// A wire message tag: 4 ASCII bytes.
pub type Tag = [u8; 4];

/// Renders a tag for log output; non-ASCII bytes are escaped.
pub fn tag_display(tag: &Tag) -> String {
    tag.iter().flat_map(|b| (*b as char).escape_default()).collect()
}

/// The field widths a message may carry.
///
/// `Bytes` is a u32 length prefix followed by that many raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 1-byte unsigned integer (button and clipboard identifiers, flags).
    U8,
    /// 2-byte unsigned integer (modifier masks).
    U16,
    /// 4-byte unsigned integer (key identifiers, repeat counts).
    U32,
    /// 4-byte signed integer (coordinates, wheel deltas).
    I32,
    /// Length-prefixed byte string (clipboard payloads).
    Bytes,
}

/// A decoded or to-be-encoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    I32(i32),
    Bytes(Vec<u8>),
}

/// One row of the catalogue: a tag and its ordered field layout.
#[derive(Debug)]
pub struct MessageSchema {
    pub tag: Tag,
    pub fields: &'static [FieldKind],
}

// ── The catalogue ─────────────────────────────────────────────────────────────

use FieldKind::{Bytes, I32, U16, U32, U8};

/// Every message type, declared once.  Order matches [`Message`]'s variants.
pub const CATALOGUE: &[MessageSchema] = &[
    // Commands
    MessageSchema { tag: *b"CNOP", fields: &[] },
    MessageSchema { tag: *b"CBYE", fields: &[] },
    MessageSchema { tag: *b"CINN", fields: &[I32, I32, U16] },
    MessageSchema { tag: *b"COUT", fields: &[] },
    MessageSchema { tag: *b"CCLP", fields: &[U8] },
    MessageSchema { tag: *b"CSEC", fields: &[U8] },
    // Queries
    MessageSchema { tag: *b"QINF", fields: &[] },
    MessageSchema { tag: *b"QCLP", fields: &[U8] },
    // Data
    MessageSchema { tag: *b"DKDN", fields: &[U32, U16] },
    MessageSchema { tag: *b"DKRP", fields: &[U32, U16, U32] },
    MessageSchema { tag: *b"DKUP", fields: &[U32, U16] },
    MessageSchema { tag: *b"DMDN", fields: &[U8] },
    MessageSchema { tag: *b"DMUP", fields: &[U8] },
    MessageSchema { tag: *b"DMMV", fields: &[I32, I32] },
    MessageSchema { tag: *b"DMWM", fields: &[I32] },
    MessageSchema { tag: *b"DCLP", fields: &[U8, Bytes] },
    MessageSchema { tag: *b"DINF", fields: &[I32, I32, I32] },
    // Errors
    MessageSchema { tag: *b"EICV", fields: &[] },
    MessageSchema { tag: *b"EBSY", fields: &[] },
];

/// Looks up the schema row for a tag.
pub fn schema_for(tag: &Tag) -> Option<&'static MessageSchema> {
    CATALOGUE.iter().find(|s| &s.tag == tag)
}

// ── Typed messages ────────────────────────────────────────────────────────────

/// All Edgehop wire messages, discriminated by tag.
///
/// Direction notes: everything flows server → client except `Noop`,
/// `GrabClipboard`, `ClipboardData`, and `ScreenInfo`, which clients also
/// (or exclusively) send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// CNOP: no operation.
    Noop,
    /// CBYE: close the connection.
    Close,
    /// CINN: the cursor is entering this screen at (x, y) with the given
    /// toggle-modifier mask.
    Enter { x: i32, y: i32, mask: u16 },
    /// COUT: the cursor is leaving this screen.
    Leave,
    /// CCLP: some application grabbed clipboard `id`; cached contents for
    /// that channel are stale.
    GrabClipboard { id: u8 },
    /// CSEC: screen saver started (`on`) or stopped on the primary.
    ScreenSaver { on: bool },
    /// QINF: report your screen geometry with a `ScreenInfo`.
    QueryInfo,
    /// QCLP: send the contents of clipboard `id` with a `ClipboardData`.
    QueryClipboard { id: u8 },
    /// DKDN: key pressed.
    KeyDown { key: u32, mask: u16 },
    /// DKRP: key auto-repeat, `count` repeats.
    KeyRepeat { key: u32, mask: u16, count: u32 },
    /// DKUP: key released.
    KeyUp { key: u32, mask: u16 },
    /// DMDN: mouse button pressed.
    MouseDown { button: u8 },
    /// DMUP: mouse button released.
    MouseUp { button: u8 },
    /// DMMV: cursor moved to absolute (x, y) on the receiving screen.
    MouseMove { x: i32, y: i32 },
    /// DMWM: wheel turned; +120 per tick away from the user.
    MouseWheel { delta: i32 },
    /// DCLP: contents of clipboard `id`.
    ClipboardData { id: u8, data: Vec<u8> },
    /// DINF: the sender's width, height, and jump-zone size in pixels.
    ScreenInfo { width: i32, height: i32, zone: i32 },
    /// EICV: peer version is incompatible; connection closes.
    Incompatible,
    /// EBSY: the declared screen name is already connected; connection closes.
    NameInUse,
}

impl Message {
    /// Returns the wire tag for this message.
    pub fn tag(&self) -> Tag {
        match self {
            Message::Noop => *b"CNOP",
            Message::Close => *b"CBYE",
            Message::Enter { .. } => *b"CINN",
            Message::Leave => *b"COUT",
            Message::GrabClipboard { .. } => *b"CCLP",
            Message::ScreenSaver { .. } => *b"CSEC",
            Message::QueryInfo => *b"QINF",
            Message::QueryClipboard { .. } => *b"QCLP",
            Message::KeyDown { .. } => *b"DKDN",
            Message::KeyRepeat { .. } => *b"DKRP",
            Message::KeyUp { .. } => *b"DKUP",
            Message::MouseDown { .. } => *b"DMDN",
            Message::MouseUp { .. } => *b"DMUP",
            Message::MouseMove { .. } => *b"DMMV",
            Message::MouseWheel { .. } => *b"DMWM",
            Message::ClipboardData { .. } => *b"DCLP",
            Message::ScreenInfo { .. } => *b"DINF",
            Message::Incompatible => *b"EICV",
            Message::NameInUse => *b"EBSY",
        }
    }

    /// Flattens this message into its ordered field values.
    pub fn to_fields(&self) -> Vec<FieldValue> {
        use FieldValue as V;
        match self {
            Message::Noop
            | Message::Close
            | Message::Leave
            | Message::QueryInfo
            | Message::Incompatible
            | Message::NameInUse => vec![],
            Message::Enter { x, y, mask } => vec![V::I32(*x), V::I32(*y), V::U16(*mask)],
            Message::GrabClipboard { id } | Message::QueryClipboard { id } => vec![V::U8(*id)],
            Message::ScreenSaver { on } => vec![V::U8(u8::from(*on))],
            Message::KeyDown { key, mask } | Message::KeyUp { key, mask } => {
                vec![V::U32(*key), V::U16(*mask)]
            }
            Message::KeyRepeat { key, mask, count } => {
                vec![V::U32(*key), V::U16(*mask), V::U32(*count)]
            }
            Message::MouseDown { button } | Message::MouseUp { button } => vec![V::U8(*button)],
            Message::MouseMove { x, y } => vec![V::I32(*x), V::I32(*y)],
            Message::MouseWheel { delta } => vec![V::I32(*delta)],
            Message::ClipboardData { id, data } => vec![V::U8(*id), V::Bytes(data.clone())],
            Message::ScreenInfo { width, height, zone } => {
                vec![V::I32(*width), V::I32(*height), V::I32(*zone)]
            }
        }
    }
}
