//! The screen topology: named screens joined by directional edges.
//!
//! A `ScreenMap` is configuration, not runtime state.  Screens and edges
//! are declared before (or while) the server runs, independently of which
//! screens happen to be connected at any moment.  An edge may point at a
//! screen that is declared but offline; neighbor lookup reports it anyway,
//! and the remapping engine is responsible for hopping over screens that
//! have no live geometry.
//!
//! Edges are one-way: `connect("a", Right, "b")` says nothing about what is
//! to the left of `b`.  Symmetry, where wanted, is declared explicitly.

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// The four sides of a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
    Top,
    Bottom,
}

impl Direction {
    pub const ALL: [Direction; 4] =
        [Direction::Left, Direction::Right, Direction::Top, Direction::Bottom];

    /// The side a cursor travelling in this direction arrives on.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Top => Direction::Bottom,
            Direction::Bottom => Direction::Top,
        }
    }

    /// Lower-case name for logs and config files.
    pub fn name(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Top => "top",
            Direction::Bottom => "bottom",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised while editing the topology.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    /// An edge would point a screen at itself.
    #[error("screen \"{0}\" cannot neighbor itself")]
    SelfLoop(String),

    /// An edge endpoint names a screen that was never declared.
    #[error("screen \"{0}\" is not declared in the topology")]
    UnknownScreen(String),
}

/// Named screens plus their directed neighbor edges.
#[derive(Debug, Clone, Default)]
pub struct ScreenMap {
    /// Declared screen names.  BTreeSet keeps iteration order stable for
    /// logs and tests.
    screens: BTreeSet<String>,
    /// `(source screen, side) → neighbor name`.
    edges: HashMap<(String, Direction), String>,
}

impl ScreenMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a screen.  Returns `false` if it was already declared.
    pub fn add_screen(&mut self, name: &str) -> bool {
        self.screens.insert(name.to_string())
    }

    /// Removes a screen declaration.
    ///
    /// Edges referencing the screen are left in place: an edge dies only by
    /// an explicit [`disconnect`](Self::disconnect), and lookups tolerate
    /// dangling targets.
    pub fn remove_screen(&mut self, name: &str) -> bool {
        self.screens.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.screens.contains(name)
    }

    /// Number of declared screens; bounds the remapping engine's hop count.
    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    /// Declared screen names in stable order.
    pub fn screens(&self) -> impl Iterator<Item = &str> {
        self.screens.iter().map(String::as_str)
    }

    /// Declares that `dst` sits on the `dir` side of `src`, replacing any
    /// previous edge on that side.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::SelfLoop`] when `src == dst` and
    /// [`TopologyError::UnknownScreen`] when either endpoint is undeclared.
    pub fn connect(&mut self, src: &str, dir: Direction, dst: &str) -> Result<(), TopologyError> {
        if src == dst {
            return Err(TopologyError::SelfLoop(src.to_string()));
        }
        for name in [src, dst] {
            if !self.screens.contains(name) {
                return Err(TopologyError::UnknownScreen(name.to_string()));
            }
        }
        self.edges.insert((src.to_string(), dir), dst.to_string());
        Ok(())
    }

    /// Removes the edge on the `dir` side of `src`, returning the old
    /// neighbor name if one was declared.
    pub fn disconnect(&mut self, src: &str, dir: Direction) -> Option<String> {
        self.edges.remove(&(src.to_string(), dir))
    }

    /// The declared neighbor on the `dir` side of `name`, whether or not
    /// that screen is currently connected.
    pub fn neighbor_of(&self, name: &str, dir: Direction) -> Option<&str> {
        self.edges.get(&(name.to_string(), dir)).map(String::as_str)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
