//! The input dispatch loop.
//!
//! Receives local input callbacks from the platform layer and protocol
//! events from the per-connection interpreters, consults the remapping
//! engine, and routes every event to exactly one place: the local primary
//! screen or the active remote screen's link.
//!
//! All shared state lives in one [`SessionTable`] behind a single lock.
//! The lock is held across table reads/mutations and the non-blocking ring
//! pushes a [`ScreenLink`] performs, never across socket I/O.  A screen
//! switch is therefore atomic as seen by every other event: no event is
//! ever delivered to two screens.

use crate::application::session::{ScreenLink, SessionError, SessionTable};
use edgehop_core::domain::remap::find_destination;
use edgehop_core::domain::topology::Direction;
use edgehop_core::protocol::messages::Message;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, trace};

/// The local-platform seam: the screen whose physical keyboard and mouse
/// drive the server.  Implementations must not block: these are called
/// with the session lock held, from the platform's event thread.
pub trait PrimaryScreen: Send + Sync {
    /// Pixel extents of the primary display.
    fn size(&self) -> (i32, i32);
    /// Width in pixels of the edge margin that triggers a switch.
    fn jump_zone(&self) -> i32;
    /// Current cursor position in primary-screen coordinates.
    fn cursor_pos(&self) -> (i32, i32);
    /// The cursor is arriving at (x, y); show it and release input capture.
    fn enter(&self, x: i32, y: i32);
    /// The cursor is leaving; hide it and start capturing raw input.
    fn leave(&self);
    /// Teleport the physical cursor without a leave/enter cycle.
    fn warp_cursor(&self, x: i32, y: i32);
    /// Install remotely produced clipboard contents.
    fn set_clipboard(&self, id: u8, data: &[u8]);
}

/// Routes input between the primary screen and remote links.
pub struct Dispatcher {
    state: Mutex<SessionTable>,
    primary: Arc<dyn PrimaryScreen>,
    /// Pixel window for discarding the warp-back artifact right after a
    /// switch to a remote screen; 0 disables the heuristic.
    motion_deadband: i32,
    /// Set when control moves to a remote screen: the recentering warp may
    /// echo one small bogus delta, which the next event absorbs.
    recenter_pending: AtomicBool,
}

impl Dispatcher {
    pub fn new(table: SessionTable, primary: Arc<dyn PrimaryScreen>, motion_deadband: i32) -> Self {
        Dispatcher {
            state: Mutex::new(table),
            primary,
            motion_deadband,
            recenter_pending: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionTable> {
        self.state.lock().expect("session table lock poisoned")
    }

    // ── Local input callbacks ─────────────────────────────────────────────────

    pub fn on_key_down(&self, key: u32, mask: u16) {
        trace!("key down key={key} mask=0x{mask:04x}");
        let state = self.state();
        if let Some(link) = &state.active_record().link {
            link.send(&Message::KeyDown { key, mask });
        }
    }

    pub fn on_key_up(&self, key: u32, mask: u16) {
        trace!("key up key={key} mask=0x{mask:04x}");
        let state = self.state();
        if let Some(link) = &state.active_record().link {
            link.send(&Message::KeyUp { key, mask });
        }
    }

    pub fn on_key_repeat(&self, key: u32, mask: u16, count: u32) {
        trace!("key repeat key={key} mask=0x{mask:04x} count={count}");
        let state = self.state();
        if let Some(link) = &state.active_record().link {
            link.send(&Message::KeyRepeat { key, mask, count });
        }
    }

    pub fn on_mouse_down(&self, button: u8) {
        trace!("mouse down button={button}");
        let state = self.state();
        if let Some(link) = &state.active_record().link {
            link.send(&Message::MouseDown { button });
        }
    }

    pub fn on_mouse_up(&self, button: u8) {
        trace!("mouse up button={button}");
        let state = self.state();
        if let Some(link) = &state.active_record().link {
            link.send(&Message::MouseUp { button });
        }
    }

    pub fn on_mouse_wheel(&self, delta: i32) {
        trace!("mouse wheel {delta:+}");
        let state = self.state();
        if let Some(link) = &state.active_record().link {
            link.send(&Message::MouseWheel { delta });
        }
    }

    /// Absolute cursor motion on the primary display, delivered while the
    /// primary screen is active.  Decides whether the cursor entered a jump
    /// zone and, if so, which screen receives control.
    pub fn on_mouse_move_primary(&self, x: i32, y: i32) {
        let mut state = self.state();
        let active = state.active_record();
        if active.is_remote() {
            // Stale event from before a switch; the accumulated-delta path
            // owns the cursor now.
            trace!("dropping absolute move {x},{y} while a remote screen is active");
            return;
        }
        let name = active.name.clone();
        let (w, h, zone) = (active.width, active.height, active.jump_zone);

        // The exit coordinate is offset by the zone size so the overshoot
        // carries across the edge.
        let (mut ex, mut ey) = (x, y);
        let dir = if x < zone {
            ex -= zone;
            Direction::Left
        } else if x >= w - zone {
            ex += zone;
            Direction::Right
        } else if y < zone {
            ey -= zone;
            Direction::Top
        } else if y >= h - zone {
            ey += zone;
            Direction::Bottom
        } else {
            state.set_cursor(x, y);
            return;
        };
        debug!("switch toward {dir}");

        let landing = find_destination(state.map(), &*state, &name, dir, ex, ey);
        match landing {
            // No screen that way: the platform clamps the cursor for us.
            None => debug!("no neighbor on {dir} of \"{name}\""),
            Some(landing) => {
                if let Err(e) = self.switch_screen(&mut state, &landing.screen, landing.x, landing.y)
                {
                    error!("switch failed: {e}");
                }
            }
        }
    }

    /// Relative cursor motion while a remote screen is active.  Accumulates
    /// into the cursor state; crossing the remote screen's bounds runs the
    /// same neighbor search as the primary edges.
    pub fn on_mouse_move_secondary(&self, dx: i32, dy: i32) {
        let first_after_switch = self.recenter_pending.swap(false, Ordering::Relaxed);
        let mut state = self.state();
        let active = state.active_record();
        let Some(link) = active.link.clone() else {
            trace!("dropping relative move {dx:+},{dy:+} while the primary is active");
            return;
        };
        if first_after_switch
            && self.motion_deadband > 0
            && dx.abs() <= self.motion_deadband
            && dy.abs() <= self.motion_deadband
        {
            debug!("ignoring {dx:+},{dy:+} inside the recentering window");
            return;
        }
        let name = active.name.clone();
        let (w, h) = (active.width, active.height);

        let (x_old, y_old) = state.cursor();
        let (x, y) = (x_old + dx, y_old + dy);

        let dir = if x < 0 {
            Some(Direction::Left)
        } else if x > w - 1 {
            Some(Direction::Right)
        } else if y < 0 {
            Some(Direction::Top)
        } else if y > h - 1 {
            Some(Direction::Bottom)
        } else {
            None
        };

        let Some(dir) = dir else {
            if (x, y) != (x_old, y_old) {
                state.set_cursor(x, y);
                link.send(&Message::MouseMove { x, y });
            }
            return;
        };

        debug!("leave \"{name}\" on {dir}");
        match find_destination(state.map(), &*state, &name, dir, x, y) {
            Some(landing) => {
                if let Err(e) = self.switch_screen(&mut state, &landing.screen, landing.x, landing.y)
                {
                    error!("switch failed: {e}");
                }
            }
            None => {
                debug!("no neighbor; clamping");
                let (cx, cy) = (x.clamp(0, w - 1), y.clamp(0, h - 1));
                if (cx, cy) != (x_old, y_old) {
                    state.set_cursor(cx, cy);
                    link.send(&Message::MouseMove { x: cx, y: cy });
                }
            }
        }
    }

    /// An application on the primary grabbed clipboard `id`.
    pub fn on_grab_clipboard_local(&self, id: u8) {
        let mut state = self.state();
        let primary = state.primary_name().to_string();
        let Some(channel) = state.clipboard_mut(id) else {
            debug!("ignoring grab of unknown clipboard channel {id}");
            return;
        };
        channel.owner = primary.clone();
        channel.data = None;
        info!("clipboard {id} grabbed by \"{primary}\"");
        for link in state.remote_links_except(&primary) {
            link.send(&Message::GrabClipboard { id });
        }
    }

    /// Screen-saver state changed on the primary; mirror it everywhere.
    pub fn on_screensaver(&self, on: bool) {
        let state = self.state();
        debug!("screen saver {}", if on { "on" } else { "off" });
        let primary = state.primary_name().to_string();
        for link in state.remote_links_except(&primary) {
            link.send(&Message::ScreenSaver { on });
        }
    }

    // ── Interpreter-facing operations ─────────────────────────────────────────

    /// Registers a remote screen after a successful handshake.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateScreen`] when the declared name is
    /// already connected.
    pub fn register_screen(
        &self,
        name: &str,
        link: Arc<dyn ScreenLink>,
    ) -> Result<(), SessionError> {
        self.state().add_screen(name, link)
    }

    /// Applies a client's info report.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidGeometry`] for extents the remapping
    /// engine cannot rescale against; the caller treats this as a protocol
    /// violation.
    pub fn update_screen_info(
        &self,
        name: &str,
        width: i32,
        height: i32,
        zone: i32,
    ) -> Result<(), SessionError> {
        self.state().set_geometry(name, width, height, zone)?;
        info!("client \"{name}\" size={width}x{height} zone={zone}");
        Ok(())
    }

    /// A remote screen reports that an application there grabbed a
    /// clipboard.
    pub fn handle_grab_clipboard(&self, from: &str, id: u8) {
        let mut state = self.state();
        let Some(channel) = state.clipboard_mut(id) else {
            debug!("ignoring grab of unknown clipboard channel {id} from \"{from}\"");
            return;
        };
        channel.owner = from.to_string();
        channel.data = None;
        info!("clipboard {id} grabbed by \"{from}\"");
        for link in state.remote_links_except(from) {
            link.send(&Message::GrabClipboard { id });
        }
    }

    /// A remote screen delivers clipboard contents (normally in response to
    /// a query sent when the cursor left it).
    pub fn handle_clipboard_data(&self, from: &str, id: u8, data: Vec<u8>) {
        let mut state = self.state();
        let primary = state.primary_name().to_string();
        let Some(channel) = state.clipboard_mut(id) else {
            debug!("ignoring data for unknown clipboard channel {id} from \"{from}\"");
            return;
        };
        if channel.owner != from {
            debug!("ignoring clipboard {id} data from \"{from}\": owner is \"{}\"", channel.owner);
            return;
        }
        debug!("clipboard {id}: {} byte(s) from \"{from}\"", data.len());
        channel.data = Some(data.clone());
        if from != primary {
            self.primary.set_clipboard(id, &data);
        }
    }

    /// A remote screen's connection ended.  Its record is removed; if it
    /// was active, control reverts to the centre of the primary screen
    /// without waiting for another input event.
    pub fn screen_departed(&self, name: &str) {
        let mut state = self.state();
        let was_active = state.active_name() == name;
        if state.remove_screen(name).is_none() {
            return;
        }
        if was_active {
            let primary = state.primary_name().to_string();
            let (cx, cy) = match state.get(&primary) {
                Some(rec) => (rec.width / 2, rec.height / 2),
                None => (0, 0),
            };
            // The peer is already gone, so no leave is sent.
            info!("jump from \"{name}\" to \"{primary}\" at {cx},{cy}");
            if state.set_active(&primary).is_err() {
                error!("primary record \"{primary}\" missing while reverting control");
                return;
            }
            state.set_cursor(cx, cy);
            self.primary.enter(cx, cy);
        }
    }

    /// Tells every remote screen the server is going away.
    pub fn notify_shutdown(&self) {
        let state = self.state();
        let primary = state.primary_name().to_string();
        for link in state.remote_links_except(&primary) {
            link.send(&Message::Close);
        }
    }

    // ── Observation hooks ─────────────────────────────────────────────────────

    pub fn active_screen_name(&self) -> String {
        self.state().active_name().to_string()
    }

    pub fn cursor(&self) -> (i32, i32) {
        self.state().cursor()
    }

    pub fn connected_screens(&self) -> Vec<String> {
        self.state().screen_names()
    }

    /// Active screen and the full screen list observed under one lock
    /// acquisition, for invariant checks.
    pub fn snapshot(&self) -> (String, Vec<String>) {
        let state = self.state();
        (state.active_name().to_string(), state.screen_names())
    }

    // ── The switch itself ─────────────────────────────────────────────────────

    /// Leaves the old active screen, cuts over, and enters the new one.
    /// Wrapping onto the same screen degenerates to a warp.
    fn switch_screen(
        &self,
        state: &mut SessionTable,
        dst: &str,
        x: i32,
        y: i32,
    ) -> Result<(), SessionError> {
        if !state.contains(dst) {
            return Err(SessionError::UnknownScreen(dst.to_string()));
        }
        let old = state.active_name().to_string();

        if old == dst {
            // Leaving and re-entering the same screen is a waste of a
            // round-trip; just move the cursor.
            match state.active_record().link.clone() {
                Some(link) => link.send(&Message::MouseMove { x, y }),
                None => self.primary.warp_cursor(x, y),
            }
            state.set_cursor(x, y);
            return Ok(());
        }

        // Leave the old screen, asking it for any clipboard it owns whose
        // contents we have not seen yet.
        match state.get(&old).and_then(|r| r.link.clone()) {
            Some(link) => {
                for id in state.stale_clipboards_owned_by(&old) {
                    link.send(&Message::QueryClipboard { id });
                }
                link.send(&Message::Leave);
            }
            None => self.primary.leave(),
        }

        info!("switch from \"{old}\" to \"{dst}\" at {x},{y}");
        state.set_active(dst)?;

        match state.active_record().link.clone() {
            Some(link) => {
                link.send(&Message::Enter { x, y, mask: 0 });
                // Share what the other screens copied.
                for (id, data) in state.cached_clipboards_not_owned_by(dst) {
                    link.send(&Message::ClipboardData { id, data });
                }
                self.recenter_pending.store(true, Ordering::Relaxed);
            }
            None => self.primary.enter(x, y),
        }
        state.set_cursor(x, y);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
