//! The session table: runtime state for every connected screen.
//!
//! One [`ScreenRecord`] exists per connected screen, keyed by its unique
//! declared name.  The primary screen's record is created when the server
//! starts and lives until it stops; remote records are created when a
//! client completes its handshake and destroyed on disconnect.  The table
//! also owns the active-screen pointer, the cursor position, clipboard
//! ownership, and the topology map: everything the dispatch loop must see
//! under a single lock.

use edgehop_core::domain::remap::{ScreenShape, ShapeSource};
use edgehop_core::domain::topology::ScreenMap;
use edgehop_core::protocol::messages::{Message, CLIPBOARD_CHANNELS};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// The protocol-sender seam: queues one message toward a remote screen
/// without ever blocking.  The network layer implements this over a
/// connection's output ring; tests implement it with a recording double.
pub trait ScreenLink: Send + Sync {
    fn send(&self, msg: &Message);
}

/// Errors raised by session-table mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A screen with this name is already connected.
    #[error("screen \"{0}\" is already connected")]
    DuplicateScreen(String),

    /// The named screen is not in the table.
    #[error("screen \"{0}\" is not connected")]
    UnknownScreen(String),

    /// Geometry that the remapping engine could not rescale against.
    /// One-pixel axes divide by zero, so anything under 2×2 is refused at
    /// registration.
    #[error("screen \"{name}\" reported unusable geometry {width}x{height}")]
    InvalidGeometry { name: String, width: i32, height: i32 },
}

/// One connected screen.
pub struct ScreenRecord {
    pub name: String,
    /// Last reported extents; 0×0 until the first info report arrives.
    pub width: i32,
    pub height: i32,
    pub jump_zone: i32,
    /// Present for remote screens; `None` marks the primary.
    pub link: Option<Arc<dyn ScreenLink>>,
}

impl ScreenRecord {
    pub fn is_remote(&self) -> bool {
        self.link.is_some()
    }

    /// Live geometry, once usable.  A record that has not reported yet
    /// behaves like a disconnected screen for the remapping engine.
    pub fn shape(&self) -> Option<ScreenShape> {
        let shape =
            ScreenShape { width: self.width, height: self.height, jump_zone: self.jump_zone };
        shape.is_valid().then_some(shape)
    }
}

/// One clipboard channel's ownership and cached contents.
pub struct ClipboardChannel {
    /// Name of the screen that last grabbed this channel.
    pub owner: String,
    /// Contents as last reported by the owner; `None` while stale.
    pub data: Option<Vec<u8>>,
}

/// The server's shared state, guarded by one lock in the dispatcher.
pub struct SessionTable {
    screens: HashMap<String, ScreenRecord>,
    map: ScreenMap,
    primary: String,
    active: String,
    cursor: (i32, i32),
    clipboards: Vec<ClipboardChannel>,
}

impl SessionTable {
    /// Creates the table with the primary screen's record already present
    /// and active.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidGeometry`] when the primary screen is
    /// smaller than 2×2.
    pub fn new(
        primary_name: &str,
        width: i32,
        height: i32,
        jump_zone: i32,
        map: ScreenMap,
    ) -> Result<Self, SessionError> {
        if width < 2 || height < 2 {
            return Err(SessionError::InvalidGeometry {
                name: primary_name.to_string(),
                width,
                height,
            });
        }
        let mut screens = HashMap::new();
        screens.insert(
            primary_name.to_string(),
            ScreenRecord { name: primary_name.to_string(), width, height, jump_zone, link: None },
        );
        let clipboards = (0..CLIPBOARD_CHANNELS)
            .map(|_| ClipboardChannel { owner: primary_name.to_string(), data: None })
            .collect();
        Ok(SessionTable {
            screens,
            map,
            primary: primary_name.to_string(),
            active: primary_name.to_string(),
            cursor: (width / 2, height / 2),
            clipboards,
        })
    }

    // ── Screen records ────────────────────────────────────────────────────────

    /// Registers a remote screen at handshake completion.  Geometry stays
    /// 0×0 (unusable as a jump destination) until its first info report.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateScreen`] when the name is taken —
    /// the caller answers the client with a name-in-use error.
    pub fn add_screen(
        &mut self,
        name: &str,
        link: Arc<dyn ScreenLink>,
    ) -> Result<(), SessionError> {
        if self.screens.contains_key(name) {
            return Err(SessionError::DuplicateScreen(name.to_string()));
        }
        debug!("adding connection \"{name}\"");
        self.screens.insert(
            name.to_string(),
            ScreenRecord {
                name: name.to_string(),
                width: 0,
                height: 0,
                jump_zone: 0,
                link: Some(link),
            },
        );
        Ok(())
    }

    /// Removes a remote screen's record.  Clipboard channels it owned fall
    /// back to the primary (their cached data, if any, stays valid).
    pub fn remove_screen(&mut self, name: &str) -> Option<ScreenRecord> {
        debug!("removing connection \"{name}\"");
        let record = self.screens.remove(name)?;
        for channel in &mut self.clipboards {
            if channel.owner == name {
                channel.owner = self.primary.clone();
            }
        }
        Some(record)
    }

    /// Applies a screen's info report.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownScreen`] for unregistered names and
    /// [`SessionError::InvalidGeometry`] for extents under 2×2.
    pub fn set_geometry(
        &mut self,
        name: &str,
        width: i32,
        height: i32,
        jump_zone: i32,
    ) -> Result<(), SessionError> {
        if width < 2 || height < 2 {
            return Err(SessionError::InvalidGeometry { name: name.to_string(), width, height });
        }
        let record = self
            .screens
            .get_mut(name)
            .ok_or_else(|| SessionError::UnknownScreen(name.to_string()))?;
        record.width = width;
        record.height = height;
        record.jump_zone = jump_zone;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ScreenRecord> {
        self.screens.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.screens.contains_key(name)
    }

    /// Connected screen names, unordered.
    pub fn screen_names(&self) -> Vec<String> {
        self.screens.keys().cloned().collect()
    }

    /// Links of all connected remote screens except `except`.
    pub fn remote_links_except(&self, except: &str) -> Vec<Arc<dyn ScreenLink>> {
        self.screens
            .values()
            .filter(|r| r.name != except)
            .filter_map(|r| r.link.clone())
            .collect()
    }

    // ── Active screen & cursor ────────────────────────────────────────────────

    pub fn primary_name(&self) -> &str {
        &self.primary
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn active_record(&self) -> &ScreenRecord {
        // The active name always refers to a live record: transitions are
        // validated and removal reverts to the primary first.
        &self.screens[&self.active]
    }

    /// Points the table at a new active screen.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownScreen`] rather than ever leaving the
    /// pointer dangling.
    pub fn set_active(&mut self, name: &str) -> Result<(), SessionError> {
        if !self.screens.contains_key(name) {
            return Err(SessionError::UnknownScreen(name.to_string()));
        }
        self.active = name.to_string();
        Ok(())
    }

    pub fn cursor(&self) -> (i32, i32) {
        self.cursor
    }

    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.cursor = (x, y);
    }

    // ── Topology ──────────────────────────────────────────────────────────────

    pub fn map(&self) -> &ScreenMap {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut ScreenMap {
        &mut self.map
    }

    // ── Clipboards ────────────────────────────────────────────────────────────

    pub fn clipboard(&self, id: u8) -> Option<&ClipboardChannel> {
        self.clipboards.get(id as usize)
    }

    pub fn clipboard_mut(&mut self, id: u8) -> Option<&mut ClipboardChannel> {
        self.clipboards.get_mut(id as usize)
    }

    /// Channel ids owned by `name` whose contents are stale (grabbed but
    /// never reported).
    pub fn stale_clipboards_owned_by(&self, name: &str) -> Vec<u8> {
        self.clipboards
            .iter()
            .enumerate()
            .filter(|(_, c)| c.owner == name && c.data.is_none())
            .map(|(id, _)| id as u8)
            .collect()
    }

    /// Cached channel contents not owned by `name`, for pushing to a screen
    /// the cursor just entered.
    pub fn cached_clipboards_not_owned_by(&self, name: &str) -> Vec<(u8, Vec<u8>)> {
        self.clipboards
            .iter()
            .enumerate()
            .filter(|(_, c)| c.owner != name)
            .filter_map(|(id, c)| c.data.clone().map(|data| (id as u8, data)))
            .collect()
    }
}

impl ShapeSource for SessionTable {
    fn shape_of(&self, name: &str) -> Option<ScreenShape> {
        self.screens.get(name).and_then(ScreenRecord::shape)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct NullLink;
    impl ScreenLink for NullLink {
        fn send(&self, _msg: &Message) {}
    }

    fn table() -> SessionTable {
        let mut map = ScreenMap::new();
        map.add_screen("server");
        map.add_screen("ingrid");
        SessionTable::new("server", 1920, 1080, 1, map).unwrap()
    }

    #[test]
    fn test_new_table_has_primary_active_at_centre() {
        let table = table();
        assert_eq!(table.active_name(), "server");
        assert_eq!(table.primary_name(), "server");
        assert_eq!(table.cursor(), (960, 540));
        assert!(!table.active_record().is_remote());
    }

    #[test]
    fn test_new_table_rejects_one_pixel_primary() {
        let result = SessionTable::new("server", 1, 1080, 1, ScreenMap::new());
        assert!(matches!(result, Err(SessionError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_add_screen_rejects_duplicate_names() {
        let mut table = table();
        table.add_screen("ingrid", Arc::new(NullLink)).unwrap();

        let result = table.add_screen("ingrid", Arc::new(NullLink));
        assert_eq!(result, Err(SessionError::DuplicateScreen("ingrid".to_string())));
    }

    #[test]
    fn test_add_screen_rejects_the_primary_name() {
        let mut table = table();
        let result = table.add_screen("server", Arc::new(NullLink));
        assert!(matches!(result, Err(SessionError::DuplicateScreen(_))));
    }

    #[test]
    fn test_fresh_screen_has_no_shape_until_info_arrives() {
        let mut table = table();
        table.add_screen("ingrid", Arc::new(NullLink)).unwrap();
        assert_eq!(table.shape_of("ingrid"), None);

        table.set_geometry("ingrid", 1024, 768, 1).unwrap();
        assert_eq!(
            table.shape_of("ingrid"),
            Some(ScreenShape { width: 1024, height: 768, jump_zone: 1 })
        );
    }

    #[test]
    fn test_set_geometry_rejects_one_pixel_axes() {
        let mut table = table();
        table.add_screen("ingrid", Arc::new(NullLink)).unwrap();

        let result = table.set_geometry("ingrid", 1024, 1, 1);
        assert_eq!(
            result,
            Err(SessionError::InvalidGeometry { name: "ingrid".to_string(), width: 1024, height: 1 })
        );
    }

    #[test]
    fn test_set_geometry_rejects_unknown_screens() {
        let mut table = table();
        let result = table.set_geometry("ghost", 100, 100, 1);
        assert_eq!(result, Err(SessionError::UnknownScreen("ghost".to_string())));
    }

    #[test]
    fn test_set_active_refuses_unknown_names() {
        let mut table = table();
        assert!(table.set_active("ghost").is_err());
        assert_eq!(table.active_name(), "server");
    }

    #[test]
    fn test_remove_screen_reverts_clipboard_ownership_to_primary() {
        let mut table = table();
        table.add_screen("ingrid", Arc::new(NullLink)).unwrap();
        table.clipboard_mut(0).unwrap().owner = "ingrid".to_string();
        table.clipboard_mut(0).unwrap().data = Some(b"copied".to_vec());

        table.remove_screen("ingrid");

        let channel = table.clipboard(0).unwrap();
        assert_eq!(channel.owner, "server");
        assert_eq!(channel.data.as_deref(), Some(b"copied".as_slice()));
    }

    #[test]
    fn test_stale_and_cached_clipboard_queries() {
        let mut table = table();
        table.add_screen("ingrid", Arc::new(NullLink)).unwrap();
        // Channel 0: ingrid grabbed, nothing reported yet.
        table.clipboard_mut(0).unwrap().owner = "ingrid".to_string();
        // Channel 1: server owns with cached data.
        table.clipboard_mut(1).unwrap().data = Some(b"cached".to_vec());

        assert_eq!(table.stale_clipboards_owned_by("ingrid"), vec![0]);
        assert_eq!(
            table.cached_clipboards_not_owned_by("ingrid"),
            vec![(1, b"cached".to_vec())]
        );
        assert!(table.cached_clipboards_not_owned_by("server").is_empty());
    }

    #[test]
    fn test_remote_links_except_skips_the_named_screen_and_the_primary() {
        let mut table = table();
        table.map_mut().add_screen("third");
        table.add_screen("ingrid", Arc::new(NullLink)).unwrap();
        table.add_screen("third", Arc::new(NullLink)).unwrap();

        assert_eq!(table.remote_links_except("ingrid").len(), 1);
        assert_eq!(table.remote_links_except("server").len(), 2);
    }
}
