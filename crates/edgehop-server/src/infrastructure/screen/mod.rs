//! Primary-screen infrastructure.
//!
//! Platform input capture and injection are outside this repository; the
//! dispatcher only sees the
//! [`PrimaryScreen`](crate::application::dispatch::PrimaryScreen) trait.
//! Two implementations live here:
//!
//! - **`headless`** – a displayless stand-in with configured geometry,
//!   used by the binary so the full server can run (and be driven over
//!   TCP) on machines without a capture backend wired up.
//! - **`mock`** – a recording double for unit and integration tests.

pub mod headless;
pub mod mock;

pub use headless::HeadlessPrimaryScreen;
pub use mock::{RecordedCall, RecordingPrimaryScreen};
