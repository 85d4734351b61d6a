//! A primary screen with no display behind it.

use crate::application::dispatch::PrimaryScreen;
use std::sync::Mutex;
use tracing::{debug, info};

/// Configured-geometry primary screen that tracks the cursor in memory and
/// logs the calls a platform backend would act on.
pub struct HeadlessPrimaryScreen {
    width: i32,
    height: i32,
    jump_zone: i32,
    cursor: Mutex<(i32, i32)>,
}

impl HeadlessPrimaryScreen {
    pub fn new(width: i32, height: i32, jump_zone: i32) -> Self {
        HeadlessPrimaryScreen {
            width,
            height,
            jump_zone,
            cursor: Mutex::new((width / 2, height / 2)),
        }
    }
}

impl PrimaryScreen for HeadlessPrimaryScreen {
    fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn jump_zone(&self) -> i32 {
        self.jump_zone
    }

    fn cursor_pos(&self) -> (i32, i32) {
        *self.cursor.lock().expect("cursor lock poisoned")
    }

    fn enter(&self, x: i32, y: i32) {
        *self.cursor.lock().expect("cursor lock poisoned") = (x, y);
        info!("primary screen entered at {x},{y}");
    }

    fn leave(&self) {
        info!("primary screen left");
    }

    fn warp_cursor(&self, x: i32, y: i32) {
        *self.cursor.lock().expect("cursor lock poisoned") = (x, y);
        debug!("cursor warped to {x},{y}");
    }

    fn set_clipboard(&self, id: u8, data: &[u8]) {
        debug!("clipboard {id} set to {} byte(s)", data.len());
    }
}
