//! Application layer for the Edgehop server.
//!
//! Orchestrates the domain types from `edgehop-core` behind traits, with no
//! direct OS, socket, or file-system calls.  Infrastructure implements the
//! traits and may depend on this module; this module never imports
//! infrastructure.
//!
//! # Sub-modules
//!
//! - **`session`** – the session table: one record per connected screen,
//!   the active-screen pointer, the cursor, and clipboard ownership.
//!
//! - **`dispatch`** – the dispatch loop: receives local input callbacks and
//!   interpreter events, consults the remapping engine, and routes input to
//!   the primary screen or the active remote link.  This is the most
//!   critical path: it runs on every keystroke and mouse movement.

pub mod dispatch;
pub mod session;
