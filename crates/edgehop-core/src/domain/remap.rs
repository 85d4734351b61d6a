//! The coordinate-remapping engine.
//!
//! Given a cursor crossing one side of a screen, [`find_destination`]
//! answers two questions: which connected screen receives control, and
//! where on it the cursor appears.
//!
//! The walk follows topology edges in the travel direction.  Screens that
//! are declared but have no live geometry contribute zero extent and are
//! hopped over; each connected screen consumes its width (or height) from
//! the along-axis coordinate until the coordinate falls inside a screen or
//! the chain ends.  The cross-axis coordinate is then rescaled between the
//! source and destination resolutions, and the entry point is pushed out of
//! the destination's own jump-zone margin when the entered side could
//! trigger a jump straight back.
//!
//! The walk is bounded by the declared screen count: a topology whose
//! offline screens form a cycle yields "no neighbor" instead of spinning.

use crate::domain::topology::{Direction, ScreenMap};
use tracing::debug;

/// Live geometry of a connected screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenShape {
    pub width: i32,
    pub height: i32,
    pub jump_zone: i32,
}

impl ScreenShape {
    /// A shape is usable once both dimensions allow rescaling.
    /// One-pixel axes would divide by zero in the proportional mapping and
    /// are rejected at registration, so they never appear here.
    pub fn is_valid(&self) -> bool {
        self.width >= 2 && self.height >= 2
    }
}

/// Supplies geometry for currently connected screens.
///
/// Returning `None` marks a screen as offline (or never registered); the
/// walk treats it as zero-extent and continues past it.
pub trait ShapeSource {
    fn shape_of(&self, name: &str) -> Option<ScreenShape>;
}

/// Where a departing cursor ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landing {
    pub screen: String,
    pub x: i32,
    pub y: i32,
}

/// Finds the screen a cursor leaving `src` in direction `dir` lands on.
///
/// `x` and `y` are the exit coordinate in `src`'s space, already offset by
/// the jump-zone size so the along-axis value carries the overshoot.
/// Returns `None` when no connected screen lies in that direction; the
/// caller leaves the cursor where it is.
pub fn find_destination(
    map: &ScreenMap,
    shapes: &dyn ShapeSource,
    src: &str,
    dir: Direction,
    x: i32,
    y: i32,
) -> Option<Landing> {
    let src_shape = shapes.shape_of(src)?;
    // Every edge followed, including hops over offline screens, spends
    // one unit of budget, so a cycle of offline screens terminates.
    let mut budget = map.screen_count();

    let (mut x, mut y) = (x, y);
    let mut w = src_shape.width;
    let mut h = src_shape.height;
    let mut cur = src.to_string();
    let mut found: Option<ScreenShape> = None;

    let mut next = next_connected(map, shapes, &cur, dir, &mut budget);
    while let Some((name, shape)) = next.take() {
        match dir {
            Direction::Left => {
                w = shape.width;
                h = shape.height;
                x += w;
                cur = name;
                found = Some(shape);
                if x >= 0 {
                    break;
                }
            }
            Direction::Right => {
                x -= w;
                w = shape.width;
                h = shape.height;
                cur = name;
                found = Some(shape);
                if x < w {
                    break;
                }
            }
            Direction::Top => {
                w = shape.width;
                h = shape.height;
                y += h;
                cur = name;
                found = Some(shape);
                if y >= 0 {
                    break;
                }
            }
            Direction::Bottom => {
                y -= h;
                w = shape.width;
                h = shape.height;
                cur = name;
                found = Some(shape);
                if y < h {
                    break;
                }
            }
        }
        debug!("skipping over screen \"{cur}\"");
        next = next_connected(map, shapes, &cur, dir, &mut budget);
    }

    let dst_shape = found?;

    // A chain can run out while the coordinate is still beyond the last
    // screen; pin it inside rather than hand back an out-of-bounds entry.
    match dir {
        Direction::Left | Direction::Right => x = x.clamp(0, w - 1),
        Direction::Top | Direction::Bottom => y = y.clamp(0, h - 1),
    }

    // Rescale the cross-axis coordinate between the two resolutions.
    match dir {
        Direction::Left | Direction::Right => {
            y = rescale(y, src_shape.height, dst_shape.height);
        }
        Direction::Top | Direction::Bottom => {
            x = rescale(x, src_shape.width, dst_shape.width);
        }
    }

    clamp_out_of_entry_zone(map, &cur, dir, &dst_shape, &mut x, &mut y);

    Some(Landing { screen: cur, x, y })
}

/// Follows edges in `dir` from `from` until a screen with live geometry
/// appears, hopping over offline names.  Each edge costs one unit of
/// `budget`; exhaustion means "no neighbor".
fn next_connected(
    map: &ScreenMap,
    shapes: &dyn ShapeSource,
    from: &str,
    dir: Direction,
    budget: &mut usize,
) -> Option<(String, ScreenShape)> {
    let mut cur = from;
    loop {
        if *budget == 0 {
            debug!("neighbor walk from \"{from}\" exceeded the screen count; treating as no neighbor");
            return None;
        }
        *budget -= 1;
        let dst = map.neighbor_of(cur, dir)?;
        match shapes.shape_of(dst) {
            Some(shape) => return Some((dst.to_string(), shape)),
            None => {
                debug!("ignored \"{dst}\" on {dir} of \"{cur}\": not connected");
                cur = dst;
            }
        }
    }
}

/// Proportional cross-axis mapping.  Out-of-range input pins to the facing
/// edge pixel; in-range input maps `0..=src_len-1` onto `0..=dst_len-1`
/// with round-to-nearest.
fn rescale(v: i32, src_len: i32, dst_len: i32) -> i32 {
    if v < 0 {
        0
    } else if v >= src_len {
        dst_len - 1
    } else {
        (0.5 + v as f64 * (dst_len - 1) as f64 / (src_len - 1) as f64) as i32
    }
}

/// Moves the entry point out of the destination's jump-zone margin on the
/// entered side, but only when that side has a declared edge back.  A side
/// with no neighbor cannot provoke a jump, so the cursor may sit flush
/// against it.
fn clamp_out_of_entry_zone(
    map: &ScreenMap,
    dst: &str,
    dir: Direction,
    shape: &ScreenShape,
    x: &mut i32,
    y: &mut i32,
) {
    let zone = shape.jump_zone;
    match dir {
        // Travelling left we arrive on the destination's right side.
        Direction::Left => {
            if map.neighbor_of(dst, Direction::Right).is_some() && *x > shape.width - 1 - zone {
                *x = shape.width - 1 - zone;
            }
        }
        Direction::Right => {
            if map.neighbor_of(dst, Direction::Left).is_some() && *x < zone {
                *x = zone;
            }
        }
        Direction::Top => {
            if map.neighbor_of(dst, Direction::Bottom).is_some() && *y > shape.height - 1 - zone {
                *y = shape.height - 1 - zone;
            }
        }
        Direction::Bottom => {
            if map.neighbor_of(dst, Direction::Top).is_some() && *y < zone {
                *y = zone;
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Shapes(HashMap<String, ScreenShape>);

    impl Shapes {
        fn new(entries: &[(&str, i32, i32, i32)]) -> Self {
            Shapes(
                entries
                    .iter()
                    .map(|&(name, w, h, zone)| {
                        (name.to_string(), ScreenShape { width: w, height: h, jump_zone: zone })
                    })
                    .collect(),
            )
        }
    }

    impl ShapeSource for Shapes {
        fn shape_of(&self, name: &str) -> Option<ScreenShape> {
            self.0.get(name).copied()
        }
    }

    fn map_of(screens: &[&str], links: &[(&str, Direction, &str)]) -> ScreenMap {
        let mut map = ScreenMap::new();
        for s in screens {
            map.add_screen(s);
        }
        for (src, dir, dst) in links {
            map.connect(src, *dir, dst).unwrap();
        }
        map
    }

    // ── Basic transitions ─────────────────────────────────────────────────────

    #[test]
    fn test_no_edge_means_no_destination() {
        let map = map_of(&["server"], &[]);
        let shapes = Shapes::new(&[("server", 1920, 1080, 1)]);
        assert_eq!(
            find_destination(&map, &shapes, "server", Direction::Right, 1920, 540),
            None
        );
    }

    #[test]
    fn test_edge_to_offline_screen_means_no_destination() {
        let map = map_of(&["server", "ingrid"], &[("server", Direction::Right, "ingrid")]);
        let shapes = Shapes::new(&[("server", 1920, 1080, 1)]);
        assert_eq!(
            find_destination(&map, &shapes, "server", Direction::Right, 1920, 540),
            None
        );
    }

    #[test]
    fn test_right_transition_rescales_the_height_fraction() {
        let map = map_of(&["server", "ingrid"], &[("server", Direction::Right, "ingrid")]);
        let shapes = Shapes::new(&[("server", 1920, 1080, 1), ("ingrid", 1024, 768, 1)]);

        // Exit coordinate 1920 = the 1919 edge pixel plus the 1px zone.
        let landing =
            find_destination(&map, &shapes, "server", Direction::Right, 1920, 540).unwrap();

        assert_eq!(landing.screen, "ingrid");
        assert_eq!(landing.x, 0, "no back-edge declared, so no entry clamp");
        assert_eq!(landing.y, 384, "540 * 767/1079 rounds to 384");
    }

    #[test]
    fn test_entry_clamp_applies_when_the_entered_side_has_a_back_edge() {
        let map = map_of(
            &["server", "ingrid"],
            &[("server", Direction::Right, "ingrid"), ("ingrid", Direction::Left, "server")],
        );
        let shapes = Shapes::new(&[("server", 1920, 1080, 1), ("ingrid", 1024, 768, 1)]);

        let landing =
            find_destination(&map, &shapes, "server", Direction::Right, 1920, 540).unwrap();

        assert_eq!(landing.x, 1, "entry point pushed past ingrid's 1px jump zone");
        assert_eq!(landing.y, 384);
    }

    #[test]
    fn test_left_transition_back_maps_the_inverse_fraction() {
        let map = map_of(
            &["server", "ingrid"],
            &[("server", Direction::Right, "ingrid"), ("ingrid", Direction::Left, "server")],
        );
        let shapes = Shapes::new(&[("server", 1920, 1080, 1), ("ingrid", 1024, 768, 1)]);

        // Accumulated position crossed ingrid's left edge by one pixel.
        let landing =
            find_destination(&map, &shapes, "ingrid", Direction::Left, -1, 384).unwrap();

        assert_eq!(landing.screen, "server");
        assert_eq!(landing.x, 1918, "clamped short of the server's right jump zone");
        assert_eq!(landing.y, 540, "384 * 1079/767 rounds back to 540");
    }

    #[test]
    fn test_vertical_transition_rescales_the_width_fraction() {
        let map = map_of(&["server", "below"], &[("server", Direction::Bottom, "below")]);
        let shapes = Shapes::new(&[("server", 1920, 1080, 1), ("below", 3840, 2160, 1)]);

        let landing =
            find_destination(&map, &shapes, "server", Direction::Bottom, 960, 1081).unwrap();

        assert_eq!(landing.screen, "below");
        assert_eq!(landing.y, 1, "overshoot of one pixel past the bottom edge");
        assert_eq!(landing.x, 1921, "960 * 3839/1919 rounds to 1921");
    }

    // ── Skipping and hopping ──────────────────────────────────────────────────

    #[test]
    fn test_offline_middle_screen_is_skipped_with_zero_extent() {
        // bridge is declared between server and ingrid but never connected.
        let map = map_of(
            &["server", "bridge", "ingrid"],
            &[("server", Direction::Right, "bridge"), ("bridge", Direction::Right, "ingrid")],
        );
        let shapes = Shapes::new(&[("server", 1920, 1080, 1), ("ingrid", 1024, 768, 1)]);

        let landing =
            find_destination(&map, &shapes, "server", Direction::Right, 1920, 540).unwrap();

        assert_eq!(landing.screen, "ingrid");
        // Same height fraction as the direct link; the offline screen added
        // nothing to the along-axis offset.
        assert_eq!(landing.y, 384);
        assert_eq!(landing.x, 0);
    }

    #[test]
    fn test_large_overshoot_hops_across_connected_screens() {
        let map = map_of(
            &["a", "b", "c"],
            &[("a", Direction::Right, "b"), ("b", Direction::Right, "c")],
        );
        let shapes =
            Shapes::new(&[("a", 100, 100, 1), ("b", 50, 100, 1), ("c", 200, 100, 1)]);

        // Exit coordinate 160: past b (100 + 50), lands 10px into c.
        let landing = find_destination(&map, &shapes, "a", Direction::Right, 160, 50).unwrap();

        assert_eq!(landing.screen, "c");
        assert_eq!(landing.x, 10);
    }

    #[test]
    fn test_overshoot_past_the_last_screen_pins_inside_it() {
        let map = map_of(&["a", "b"], &[("a", Direction::Right, "b")]);
        let shapes = Shapes::new(&[("a", 100, 100, 1), ("b", 50, 100, 1)]);

        let landing = find_destination(&map, &shapes, "a", Direction::Right, 500, 50).unwrap();

        assert_eq!(landing.screen, "b");
        assert_eq!(landing.x, 49);
    }

    #[test]
    fn test_offline_cycle_terminates_as_no_neighbor() {
        let map = map_of(
            &["a", "b", "c"],
            &[
                ("a", Direction::Right, "b"),
                ("b", Direction::Right, "c"),
                ("c", Direction::Right, "b"),
            ],
        );
        // Only the source is connected; b and c cycle forever offline.
        let shapes = Shapes::new(&[("a", 100, 100, 1)]);

        assert_eq!(find_destination(&map, &shapes, "a", Direction::Right, 101, 50), None);
    }

    // ── Cross-axis pinning ────────────────────────────────────────────────────

    #[test]
    fn test_cross_axis_below_range_pins_to_zero() {
        let map = map_of(&["a", "b"], &[("a", Direction::Right, "b")]);
        let shapes = Shapes::new(&[("a", 100, 100, 1), ("b", 100, 300, 0)]);

        let landing = find_destination(&map, &shapes, "a", Direction::Right, 100, -5).unwrap();
        assert_eq!(landing.y, 0);
    }

    #[test]
    fn test_cross_axis_beyond_range_pins_to_last_pixel() {
        let map = map_of(&["a", "b"], &[("a", Direction::Right, "b")]);
        let shapes = Shapes::new(&[("a", 100, 100, 1), ("b", 100, 300, 0)]);

        let landing = find_destination(&map, &shapes, "a", Direction::Right, 100, 100).unwrap();
        assert_eq!(landing.y, 299);
    }

    // ── Jump-zone idempotence ─────────────────────────────────────────────────

    /// Entering a screen from any direction never lands inside that screen's
    /// own jump zone on the entry side, so arrival cannot re-trigger a jump.
    #[test]
    fn test_entry_never_lands_inside_the_jump_zone() {
        let zone = 8;
        let map = map_of(
            &["hub", "l", "r", "t", "b"],
            &[
                ("l", Direction::Right, "hub"),
                ("r", Direction::Left, "hub"),
                ("t", Direction::Bottom, "hub"),
                ("b", Direction::Top, "hub"),
                // Declared back-edges make every side of hub jump-capable.
                ("hub", Direction::Left, "l"),
                ("hub", Direction::Right, "r"),
                ("hub", Direction::Top, "t"),
                ("hub", Direction::Bottom, "b"),
            ],
        );
        let shapes = Shapes::new(&[
            ("hub", 640, 480, zone),
            ("l", 100, 100, 1),
            ("r", 100, 100, 1),
            ("t", 100, 100, 1),
            ("b", 100, 100, 1),
        ]);

        let cases = [
            ("l", Direction::Right, 101, 50),
            ("r", Direction::Left, -2, 50),
            ("t", Direction::Bottom, 50, 101),
            ("b", Direction::Top, 50, -2),
        ];
        for (src, dir, x, y) in cases {
            let landing = find_destination(&map, &shapes, src, dir, x, y).unwrap();
            assert_eq!(landing.screen, "hub");
            match dir {
                Direction::Right => assert!(landing.x >= zone, "left-side zone: {landing:?}"),
                Direction::Left => {
                    assert!(landing.x < 640 - zone, "right-side zone: {landing:?}")
                }
                Direction::Bottom => assert!(landing.y >= zone, "top-side zone: {landing:?}"),
                Direction::Top => {
                    assert!(landing.y < 480 - zone, "bottom-side zone: {landing:?}")
                }
            }
        }
    }
}
