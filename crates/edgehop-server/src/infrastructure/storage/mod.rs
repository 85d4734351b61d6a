//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration (server identity,
//! network settings, declared screens, and topology links), applies
//! defaults for anything absent, and validates the topology before the
//! server ever binds a socket.

pub mod config;
