//! Domain logic for Edgehop.
//!
//! Pure business rules with no infrastructure dependencies: the screen
//! topology (who sits next to whom) and the remapping engine (where a
//! departing cursor lands).  Everything here compiles and tests on any
//! platform without sockets or a display.

pub mod remap;
pub mod topology;
