//! Recording primary-screen double for tests.

use crate::application::dispatch::PrimaryScreen;
use std::sync::Mutex;

/// One observed call on the primary-screen seam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Enter(i32, i32),
    Leave,
    Warp(i32, i32),
    SetClipboard(u8, Vec<u8>),
}

/// A primary screen that records every call for later assertions.
pub struct RecordingPrimaryScreen {
    width: i32,
    height: i32,
    jump_zone: i32,
    cursor: Mutex<(i32, i32)>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingPrimaryScreen {
    pub fn new(width: i32, height: i32, jump_zone: i32) -> Self {
        RecordingPrimaryScreen {
            width,
            height,
            jump_zone,
            cursor: Mutex::new((width / 2, height / 2)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Everything observed so far, in call order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("calls lock poisoned").clear();
    }
}

impl PrimaryScreen for RecordingPrimaryScreen {
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
        self.calls.lock().expect("calls lock poisoned").push(RecordedCall::Enter(x, y));
    }

    fn leave(&self) {
        self.calls.lock().expect("calls lock poisoned").push(RecordedCall::Leave);
    }

    fn warp_cursor(&self, x: i32, y: i32) {
        *self.cursor.lock().expect("cursor lock poisoned") = (x, y);
        self.calls.lock().expect("calls lock poisoned").push(RecordedCall::Warp(x, y));
    }

    fn set_clipboard(&self, id: u8, data: &[u8]) {
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(RecordedCall::SetClipboard(id, data.to_vec()));
    }
}
