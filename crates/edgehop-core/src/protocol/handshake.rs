//! Handshake payloads and the version-compatibility rule.
//!
//! On connect the server speaks first: the magic name plus its protocol
//! version.  The client answers with the same preamble plus its declared
//! screen name.  Both greetings travel inside ordinary frames; only their
//! payload layout is special (they predate the tag catalogue):
//!
//! ```text
//! server → client:  "Edgehop" [major:2][minor:2]
//! client → server:  "Edgehop" [major:2][minor:2][name_len:4][name...]
//! ```

use crate::protocol::codec::ProtocolError;
use std::fmt;

/// The magic name opening every greeting.
pub const HELLO_MAGIC: &[u8] = b"Edgehop";

/// A protocol version as carried in the greeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

/// The version this build speaks.
///
/// Major 0 marks test builds; the compatibility rule keeps those from ever
/// talking to release builds.
pub const PROTOCOL_VERSION: Version = Version { major: 1, minor: 0 };

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// The server-side accept rule.
///
/// A client is compatible iff it is not newer than the server (same major
/// with greater minor counts as newer) and the two sides agree on whether
/// they are test builds (major 0 on exactly one side is a mismatch).
pub fn is_compatible(server: Version, client: Version) -> bool {
    if client.major > server.major {
        return false;
    }
    if client.major == server.major && client.minor > server.minor {
        return false;
    }
    (client.major == 0) == (server.major == 0)
}

/// Encodes the server's greeting payload.
pub fn encode_server_hello(version: Version) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HELLO_MAGIC.len() + 4);
    buf.extend_from_slice(HELLO_MAGIC);
    buf.extend_from_slice(&version.major.to_be_bytes());
    buf.extend_from_slice(&version.minor.to_be_bytes());
    buf
}

/// Encodes the client's greeting payload (used by test clients).
pub fn encode_client_hello(version: Version, name: &str) -> Vec<u8> {
    let mut buf = encode_server_hello(version);
    buf.extend_from_slice(&(name.len() as u32).to_be_bytes());
    buf.extend_from_slice(name.as_bytes());
    buf
}

/// Parses a server greeting (client side; used by test clients).
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedPayload`] on a wrong magic name or a
/// short payload.
pub fn parse_server_hello(payload: &[u8]) -> Result<Version, ProtocolError> {
    let rest = strip_magic(payload)?;
    if rest.len() != 4 {
        return Err(ProtocolError::MalformedPayload(format!(
            "greeting carries {} version byte(s), expected 4",
            rest.len()
        )));
    }
    Ok(Version {
        major: u16::from_be_bytes([rest[0], rest[1]]),
        minor: u16::from_be_bytes([rest[2], rest[3]]),
    })
}

/// Parses a client greeting into its version and declared screen name.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedPayload`] on a wrong magic name, a
/// short payload, a name length disagreeing with the payload, or a name
/// that is not UTF-8.
pub fn parse_client_hello(payload: &[u8]) -> Result<(Version, String), ProtocolError> {
    let rest = strip_magic(payload)?;
    if rest.len() < 8 {
        return Err(ProtocolError::MalformedPayload(
            "greeting too short for version and name length".to_string(),
        ));
    }
    let version = Version {
        major: u16::from_be_bytes([rest[0], rest[1]]),
        minor: u16::from_be_bytes([rest[2], rest[3]]),
    };
    let name_len = u32::from_be_bytes([rest[4], rest[5], rest[6], rest[7]]) as usize;
    let name_bytes = &rest[8..];
    if name_bytes.len() != name_len {
        return Err(ProtocolError::MalformedPayload(format!(
            "greeting declares a {name_len}-byte name but carries {}",
            name_bytes.len()
        )));
    }
    let name = std::str::from_utf8(name_bytes)
        .map_err(|e| ProtocolError::MalformedPayload(format!("screen name is not UTF-8: {e}")))?
        .to_string();
    Ok((version, name))
}

fn strip_magic(payload: &[u8]) -> Result<&[u8], ProtocolError> {
    if payload.len() < HELLO_MAGIC.len() || &payload[..HELLO_MAGIC.len()] != HELLO_MAGIC {
        return Err(ProtocolError::MalformedPayload(
            "greeting does not start with the magic name".to_string(),
        ));
    }
    Ok(&payload[HELLO_MAGIC.len()..])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
