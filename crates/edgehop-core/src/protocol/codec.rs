//! Binary codec for Edgehop wire messages.
//!
//! Wire format per message (inside a frame, see the server's packet layer):
//! ```text
//! [tag:4][field...]
//! ```
//! Fields are written in the order declared by the message's
//! [`MessageSchema`] row, all multi-byte integers big-endian, byte strings
//! as a u32 length prefix followed by the raw bytes.  Both directions run
//! off the same schema table, so an encoder and decoder can never disagree
//! about a message's layout.

use crate::protocol::messages::{
    schema_for, tag_display, FieldKind, FieldValue, Message, Tag, CATALOGUE,
};
use thiserror::Error;

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The byte slice ended before the declared fields did.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The 4-byte tag is not in the catalogue.
    #[error("unknown message tag: \"{}\"", tag_display(.0))]
    UnknownTag(Tag),

    /// A field value is out of range or the payload carries extra bytes.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The catalogue itself is inconsistent (duplicate or non-ASCII tag,
    /// or a message variant disagreeing with its declared layout).
    #[error("invalid message catalogue: {0}")]
    InvalidCatalogue(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Message`] into its wire bytes (tag plus fields).
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidCatalogue`] if the message's field values
/// disagree with its schema row, which [`validate_catalogue`] rules out at
/// startup.
///
/// # Examples
///
/// ```rust
/// use edgehop_core::protocol::{decode_message, encode_message, Message};
///
/// let msg = Message::MouseMove { x: 640, y: 480 };
/// let bytes = encode_message(&msg).unwrap();
/// assert_eq!(&bytes[..4], b"DMMV");
/// assert_eq!(decode_message(&bytes).unwrap(), msg);
/// ```
pub fn encode_message(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    let tag = msg.tag();
    let schema = schema_for(&tag).ok_or(ProtocolError::UnknownTag(tag))?;
    let values = msg.to_fields();
    if values.len() != schema.fields.len() {
        return Err(ProtocolError::InvalidCatalogue(format!(
            "\"{}\" carries {} fields but declares {}",
            tag_display(&tag),
            values.len(),
            schema.fields.len()
        )));
    }

    let mut buf = Vec::with_capacity(4 + encoded_fields_len(&values));
    buf.extend_from_slice(&tag);
    for (kind, value) in schema.fields.iter().zip(values) {
        write_field(&mut buf, *kind, value).map_err(|e| {
            ProtocolError::InvalidCatalogue(format!("\"{}\": {e}", tag_display(&tag)))
        })?;
    }
    Ok(buf)
}

/// Decodes one [`Message`] from `bytes`, which must hold exactly one message
/// (the framing layer guarantees this).
///
/// # Errors
///
/// Returns [`ProtocolError::UnknownTag`] for tags outside the catalogue and
/// [`ProtocolError::MalformedPayload`] when the fields do not fill the
/// payload exactly.
pub fn decode_message(bytes: &[u8]) -> Result<Message, ProtocolError> {
    if bytes.len() < 4 {
        return Err(ProtocolError::InsufficientData { needed: 4, available: bytes.len() });
    }
    let tag: Tag = [bytes[0], bytes[1], bytes[2], bytes[3]];
    let schema = schema_for(&tag).ok_or(ProtocolError::UnknownTag(tag))?;

    let mut reader = Reader { buf: &bytes[4..], pos: 0 };
    let mut values = Vec::with_capacity(schema.fields.len());
    for kind in schema.fields {
        values.push(reader.read_field(*kind)?);
    }
    if reader.pos != reader.buf.len() {
        return Err(ProtocolError::MalformedPayload(format!(
            "\"{}\": {} trailing byte(s) after the declared fields",
            tag_display(&tag),
            reader.buf.len() - reader.pos
        )));
    }
    message_from_fields(&tag, values)
}

/// Checks the catalogue once at startup: tags must be unique printable
/// ASCII, and every [`Message`] variant must agree with its declared layout.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidCatalogue`] describing the first
/// inconsistency found.
pub fn validate_catalogue() -> Result<(), ProtocolError> {
    for (i, schema) in CATALOGUE.iter().enumerate() {
        if !schema.tag.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            return Err(ProtocolError::InvalidCatalogue(format!(
                "tag \"{}\" is not upper-case ASCII",
                tag_display(&schema.tag)
            )));
        }
        if CATALOGUE[..i].iter().any(|other| other.tag == schema.tag) {
            return Err(ProtocolError::InvalidCatalogue(format!(
                "duplicate tag \"{}\"",
                tag_display(&schema.tag)
            )));
        }
    }
    // Exercise encode for one witness of every variant so a layout mismatch
    // is caught before the first connection, not in the middle of one.
    for msg in witness_messages() {
        encode_message(&msg)?;
    }
    Ok(())
}

fn encoded_fields_len(values: &[FieldValue]) -> usize {
    values
        .iter()
        .map(|v| match v {
            FieldValue::U8(_) => 1,
            FieldValue::U16(_) => 2,
            FieldValue::U32(_) | FieldValue::I32(_) => 4,
            FieldValue::Bytes(b) => 4 + b.len(),
        })
        .sum()
}

fn write_field(buf: &mut Vec<u8>, kind: FieldKind, value: FieldValue) -> Result<(), String> {
    match (kind, value) {
        (FieldKind::U8, FieldValue::U8(v)) => buf.push(v),
        (FieldKind::U16, FieldValue::U16(v)) => buf.extend_from_slice(&v.to_be_bytes()),
        (FieldKind::U32, FieldValue::U32(v)) => buf.extend_from_slice(&v.to_be_bytes()),
        (FieldKind::I32, FieldValue::I32(v)) => buf.extend_from_slice(&v.to_be_bytes()),
        (FieldKind::Bytes, FieldValue::Bytes(v)) => {
            buf.extend_from_slice(&(v.len() as u32).to_be_bytes());
            buf.extend_from_slice(&v);
        }
        (kind, value) => return Err(format!("field kind {kind:?} given value {value:?}")),
    }
    Ok(())
}

// ── Field reader ──────────────────────────────────────────────────────────────

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8], ProtocolError> {
        if self.buf.len() - self.pos < n {
            return Err(ProtocolError::InsufficientData {
                needed: self.pos + n,
                available: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_field(&mut self, kind: FieldKind) -> Result<FieldValue, ProtocolError> {
        Ok(match kind {
            FieldKind::U8 => FieldValue::U8(self.take(1)?[0]),
            FieldKind::U16 => {
                let b = self.take(2)?;
                FieldValue::U16(u16::from_be_bytes([b[0], b[1]]))
            }
            FieldKind::U32 => {
                let b = self.take(4)?;
                FieldValue::U32(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            FieldKind::I32 => {
                let b = self.take(4)?;
                FieldValue::I32(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            FieldKind::Bytes => {
                let b = self.take(4)?;
                let len = u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize;
                FieldValue::Bytes(self.take(len)?.to_vec())
            }
        })
    }
}

// ── Typed construction ────────────────────────────────────────────────────────

fn message_from_fields(tag: &Tag, values: Vec<FieldValue>) -> Result<Message, ProtocolError> {
    use FieldValue as V;
    let bad = || {
        ProtocolError::MalformedPayload(format!(
            "\"{}\": field values do not match the declared layout",
            tag_display(tag)
        ))
    };
    let msg = match tag {
        b"CNOP" => Message::Noop,
        b"CBYE" => Message::Close,
        b"CINN" => match values.as_slice() {
            [V::I32(x), V::I32(y), V::U16(mask)] => Message::Enter { x: *x, y: *y, mask: *mask },
            _ => return Err(bad()),
        },
        b"COUT" => Message::Leave,
        b"CCLP" => match values.as_slice() {
            [V::U8(id)] => Message::GrabClipboard { id: *id },
            _ => return Err(bad()),
        },
        b"CSEC" => match values.as_slice() {
            [V::U8(on)] => Message::ScreenSaver { on: *on != 0 },
            _ => return Err(bad()),
        },
        b"QINF" => Message::QueryInfo,
        b"QCLP" => match values.as_slice() {
            [V::U8(id)] => Message::QueryClipboard { id: *id },
            _ => return Err(bad()),
        },
        b"DKDN" => match values.as_slice() {
            [V::U32(key), V::U16(mask)] => Message::KeyDown { key: *key, mask: *mask },
            _ => return Err(bad()),
        },
        b"DKRP" => match values.as_slice() {
            [V::U32(key), V::U16(mask), V::U32(count)] => {
                Message::KeyRepeat { key: *key, mask: *mask, count: *count }
            }
            _ => return Err(bad()),
        },
        b"DKUP" => match values.as_slice() {
            [V::U32(key), V::U16(mask)] => Message::KeyUp { key: *key, mask: *mask },
            _ => return Err(bad()),
        },
        b"DMDN" => match values.as_slice() {
            [V::U8(button)] => Message::MouseDown { button: *button },
            _ => return Err(bad()),
        },
        b"DMUP" => match values.as_slice() {
            [V::U8(button)] => Message::MouseUp { button: *button },
            _ => return Err(bad()),
        },
        b"DMMV" => match values.as_slice() {
            [V::I32(x), V::I32(y)] => Message::MouseMove { x: *x, y: *y },
            _ => return Err(bad()),
        },
        b"DMWM" => match values.as_slice() {
            [V::I32(delta)] => Message::MouseWheel { delta: *delta },
            _ => return Err(bad()),
        },
        b"DCLP" => {
            let mut it = values.into_iter();
            match (it.next(), it.next(), it.next()) {
                (Some(V::U8(id)), Some(V::Bytes(data)), None) => {
                    Message::ClipboardData { id, data }
                }
                _ => return Err(bad()),
            }
        }
        b"DINF" => match values.as_slice() {
            [V::I32(width), V::I32(height), V::I32(zone)] => {
                Message::ScreenInfo { width: *width, height: *height, zone: *zone }
            }
            _ => return Err(bad()),
        },
        b"EICV" => Message::Incompatible,
        b"EBSY" => Message::NameInUse,
        other => return Err(ProtocolError::UnknownTag(*other)),
    };
    Ok(msg)
}

/// One witness value per message variant, used by [`validate_catalogue`] and
/// the tests.
pub(crate) fn witness_messages() -> Vec<Message> {
    vec![
        Message::Noop,
        Message::Close,
        Message::Enter { x: 1, y: 384, mask: 0 },
        Message::Leave,
        Message::GrabClipboard { id: 0 },
        Message::ScreenSaver { on: true },
        Message::QueryInfo,
        Message::QueryClipboard { id: 1 },
        Message::KeyDown { key: 0x61, mask: 0x0002 },
        Message::KeyRepeat { key: 0x61, mask: 0, count: 3 },
        Message::KeyUp { key: 0x61, mask: 0x0002 },
        Message::MouseDown { button: 1 },
        Message::MouseUp { button: 1 },
        Message::MouseMove { x: 1919, y: 540 },
        Message::MouseWheel { delta: -120 },
        Message::ClipboardData { id: 0, data: b"hello".to_vec() },
        Message::ScreenInfo { width: 1024, height: 768, zone: 1 },
        Message::Incompatible,
        Message::NameInUse,
    ]
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(msg: &Message) -> Message {
        let encoded = encode_message(msg).expect("encode failed");
        decode_message(&encoded).expect("decode failed")
    }

    #[test]
    fn test_catalogue_is_valid() {
        validate_catalogue().expect("catalogue must be internally consistent");
    }

    #[test]
    fn test_every_variant_survives_a_round_trip() {
        for msg in witness_messages() {
            assert_eq!(round_trip(&msg), msg, "round trip failed for {msg:?}");
        }
    }

    #[test]
    fn test_enter_encodes_big_endian_fields_after_tag() {
        let bytes = encode_message(&Message::Enter { x: 1, y: 384, mask: 0x2001 }).unwrap();
        assert_eq!(&bytes[..4], b"CINN");
        assert_eq!(&bytes[4..8], &1i32.to_be_bytes());
        assert_eq!(&bytes[8..12], &384i32.to_be_bytes());
        assert_eq!(&bytes[12..14], &0x2001u16.to_be_bytes());
        assert_eq!(bytes.len(), 14);
    }

    #[test]
    fn test_mouse_move_negative_coordinates_round_trip() {
        let msg = Message::MouseMove { x: -32, y: -1 };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_clipboard_data_length_prefix_is_u32() {
        let bytes =
            encode_message(&Message::ClipboardData { id: 1, data: b"abc".to_vec() }).unwrap();
        // tag(4) + id(1) + len(4) + data(3)
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[5..9], &3u32.to_be_bytes());
        assert_eq!(&bytes[9..], b"abc");
    }

    #[test]
    fn test_clipboard_data_empty_payload_round_trips() {
        let msg = Message::ClipboardData { id: 0, data: vec![] };
        assert_eq!(round_trip(&msg), msg);
    }

    #[test]
    fn test_screen_saver_decodes_any_nonzero_as_on() {
        let mut bytes = encode_message(&Message::ScreenSaver { on: true }).unwrap();
        bytes[4] = 0x7F;
        assert_eq!(decode_message(&bytes).unwrap(), Message::ScreenSaver { on: true });
    }

    #[test]
    fn test_decode_unknown_tag_is_an_error() {
        let result = decode_message(b"XXXX");
        assert_eq!(result, Err(ProtocolError::UnknownTag(*b"XXXX")));
    }

    #[test]
    fn test_decode_short_input_is_insufficient_data() {
        let result = decode_message(b"DM");
        assert!(matches!(result, Err(ProtocolError::InsufficientData { .. })));
    }

    #[test]
    fn test_decode_truncated_fields_is_an_error() {
        let bytes = encode_message(&Message::MouseMove { x: 10, y: 20 }).unwrap();
        let result = decode_message(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(ProtocolError::InsufficientData { .. })));
    }

    #[test]
    fn test_decode_trailing_bytes_is_an_error() {
        let mut bytes = encode_message(&Message::Leave).unwrap();
        bytes.push(0xAA);
        assert!(matches!(
            decode_message(&bytes),
            Err(ProtocolError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_clipboard_with_lying_length_prefix_is_an_error() {
        // Declares 100 bytes of data but provides 3.
        let mut bytes = vec![];
        bytes.extend_from_slice(b"DCLP");
        bytes.push(0);
        bytes.extend_from_slice(&100u32.to_be_bytes());
        bytes.extend_from_slice(b"abc");
        assert!(matches!(
            decode_message(&bytes),
            Err(ProtocolError::InsufficientData { .. })
        ));
    }
}
