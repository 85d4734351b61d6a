//! Infrastructure layer for the Edgehop server.
//!
//! Contains the OS-facing adapters: TCP sockets and per-connection I/O,
//! the primary-screen seam implementations, and configuration-file
//! storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `edgehop_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod network;
pub mod screen;
pub mod storage;
