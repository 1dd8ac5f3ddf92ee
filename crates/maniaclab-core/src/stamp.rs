//! Object footprints on the physics grid.
//!
//! A [`CellStamp`] is the 5×5 template describing what an object does to
//! each physics cell it covers; a [`Stamp`] is derived from its blocking
//! bits and carries two precomputed coordinate lists: the occupied cells
//! (row-major) and the border ring around them. Both types are immutable
//! value types; a `Stamp` never changes after construction and can be
//! shared freely across threads.

use smallvec::SmallVec;

use crate::consts::{CELL_STAMP_LENGTH, SUBDIVISION_COUNT};
use crate::types::{CoordInt, CoordPair, SimFloat};

/// What a stamp cell does to the physics cell underneath it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CellKind {
    /// No effect; skipped by all stamping.
    #[default]
    Clear,
    /// Blocks the physics cell; heat capacity comes from the object.
    Block,
    /// Spills a fixed amount of material into the cell each frame.
    Source,
    /// Removes a fixed amount of material from the cell each frame.
    Sink,
    /// Manipulates the air flow of the cell.
    Flow,
}

/// Which material a source or sink cell operates on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SinkSource {
    /// Air pressure.
    #[default]
    Air,
    /// Fog density.
    Fog,
}

/// One cell of a [`CellStamp`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellTemplate {
    /// Cell behaviour.
    pub kind: CellKind,
    /// Material moved by sources and sinks.
    pub sink_what: SinkSource,
    /// Amount moved by sources and sinks, per frame.
    pub amplitude: SimFloat,
    /// Northward flow applied by flow cells.
    pub flow_north: SimFloat,
    /// Westward flow applied by flow cells.
    pub flow_west: SimFloat,
}

/// The full 5×5 per-cell template grid of an object footprint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellStamp {
    /// Row-major cell templates.
    pub data: [CellTemplate; CELL_STAMP_LENGTH],
}

impl CellStamp {
    /// An all-clear stamp.
    pub const fn empty() -> Self {
        Self {
            data: [CellTemplate {
                kind: CellKind::Clear,
                sink_what: SinkSource::Air,
                amplitude: 0.0,
                flow_north: 0.0,
                flow_west: 0.0,
            }; CELL_STAMP_LENGTH],
        }
    }

    /// Build a stamp from blocking bits only; `true` becomes
    /// [`CellKind::Block`], `false` stays clear.
    pub fn from_blocking(blocking: [bool; CELL_STAMP_LENGTH]) -> Self {
        let mut stamp = Self::empty();
        for (template, &blocked) in stamp.data.iter_mut().zip(blocking.iter()) {
            if blocked {
                template.kind = CellKind::Block;
            }
        }
        stamp
    }

    /// Template at `(x, y)`.
    pub fn get_xy(&self, x: CoordInt, y: CoordInt) -> CellTemplate {
        self.data[(x + y * SUBDIVISION_COUNT) as usize]
    }

    /// Whether the cell at `(x, y)` blocks.
    pub fn is_blocking(&self, x: CoordInt, y: CoordInt) -> bool {
        self.get_xy(x, y).kind == CellKind::Block
    }
}

impl Default for CellStamp {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<[bool; CELL_STAMP_LENGTH]> for CellStamp {
    fn from(blocking: [bool; CELL_STAMP_LENGTH]) -> Self {
        Self::from_blocking(blocking)
    }
}

/// Coordinate list bounded by the stamp geometry. Typical footprints
/// fit inline; pathological masks spill.
pub type StampCoords = SmallVec<[CoordPair; 32]>;

/// A blocking mask with precomputed occupied and border coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stamp {
    map: [bool; CELL_STAMP_LENGTH],
    occupied: StampCoords,
    border: StampCoords,
}

impl Stamp {
    /// Derive a stamp from a cell template grid's blocking bits.
    pub fn new(stamp: &CellStamp) -> Self {
        let mut map = [false; CELL_STAMP_LENGTH];
        for (bit, template) in map.iter_mut().zip(stamp.data.iter()) {
            *bit = template.kind == CellKind::Block;
        }
        let occupied = Self::collect_occupied(&map);
        let border = Self::collect_border(&map);
        Self {
            map,
            occupied,
            border,
        }
    }

    /// Coordinates of all blocking cells, row-major.
    pub fn occupied(&self) -> &[CoordPair] {
        &self.occupied
    }

    /// Coordinates in `[-1..=SUB]²` adjacent to an occupied cell without
    /// being occupied themselves.
    pub fn border(&self) -> &[CoordPair] {
        &self.border
    }

    /// Number of blocking cells.
    pub fn popcount(&self) -> usize {
        self.occupied.len()
    }

    /// Whether the stamp blocks at least one cell.
    pub fn non_empty(&self) -> bool {
        !self.occupied.is_empty()
    }

    /// Whether the mask blocks at `(x, y)`; coordinates outside the 5×5
    /// grid are never blocked.
    pub fn blocks(&self, x: CoordInt, y: CoordInt) -> bool {
        if x < 0 || x >= SUBDIVISION_COUNT || y < 0 || y >= SUBDIVISION_COUNT {
            return false;
        }
        self.map[(y * SUBDIVISION_COUNT + x) as usize]
    }

    fn collect_occupied(map: &[bool; CELL_STAMP_LENGTH]) -> StampCoords {
        let mut coords = StampCoords::new();
        for y in 0..SUBDIVISION_COUNT {
            for x in 0..SUBDIVISION_COUNT {
                if map[(y * SUBDIVISION_COUNT + x) as usize] {
                    coords.push(CoordPair::new(x, y));
                }
            }
        }
        coords
    }

    fn collect_border(map: &[bool; CELL_STAMP_LENGTH]) -> StampCoords {
        let at = |x: CoordInt, y: CoordInt| -> bool {
            if x < 0 || x >= SUBDIVISION_COUNT || y < 0 || y >= SUBDIVISION_COUNT {
                return false;
            }
            map[(y * SUBDIVISION_COUNT + x) as usize]
        };

        let mut coords = StampCoords::new();
        for y in -1..=SUBDIVISION_COUNT {
            for x in -1..=SUBDIVISION_COUNT {
                let is_border = !at(x, y)
                    && (at(x, y - 1) || at(x, y + 1) || at(x - 1, y) || at(x + 1, y));
                if is_border {
                    coords.push(CoordPair::new(x, y));
                }
            }
        }
        coords
    }
}

impl From<&CellStamp> for Stamp {
    fn from(stamp: &CellStamp) -> Self {
        Self::new(stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Upper bound on the border list length: the `[-1..=SUB]²` ring.
    const BORDER_CAPACITY: usize =
        ((SUBDIVISION_COUNT + 2) * (SUBDIVISION_COUNT + 2)) as usize;

    fn stamp_from_bits(bits: u32) -> Stamp {
        let mut blocking = [false; CELL_STAMP_LENGTH];
        for (i, cell) in blocking.iter_mut().enumerate() {
            *cell = bits & (1 << i) != 0;
        }
        Stamp::new(&CellStamp::from_blocking(blocking))
    }

    #[test]
    fn empty_stamp_has_no_coords() {
        let stamp = Stamp::new(&CellStamp::empty());
        assert_eq!(stamp.popcount(), 0);
        assert!(!stamp.non_empty());
        assert!(stamp.border().is_empty());
    }

    #[test]
    fn single_center_cell() {
        let stamp = stamp_from_bits(1 << 12); // (2, 2)
        assert_eq!(stamp.occupied(), &[CoordPair::new(2, 2)]);
        let mut border: Vec<_> = stamp.border().to_vec();
        border.sort_by_key(|c| (c.y, c.x));
        assert_eq!(
            border,
            vec![
                CoordPair::new(2, 1),
                CoordPair::new(1, 2),
                CoordPair::new(3, 2),
                CoordPair::new(2, 3),
            ]
        );
    }

    #[test]
    fn full_stamp_border_is_the_ring_without_corners() {
        let stamp = stamp_from_bits((1 << 25) - 1);
        assert_eq!(stamp.popcount(), 25);
        // Each edge contributes SUB cells; the four ring corners have no
        // 4-neighbour inside the mask.
        assert_eq!(stamp.border().len(), 4 * SUBDIVISION_COUNT as usize);
        assert!(!stamp
            .border()
            .contains(&CoordPair::new(-1, -1)));
    }

    #[test]
    fn occupied_is_row_major() {
        let stamp = stamp_from_bits((1 << 1) | (1 << 5)); // (1,0) and (0,1)
        assert_eq!(
            stamp.occupied(),
            &[CoordPair::new(1, 0), CoordPair::new(0, 1)]
        );
    }

    proptest! {
        #[test]
        fn popcount_matches_mask(bits in 0u32..(1 << 25)) {
            let stamp = stamp_from_bits(bits);
            prop_assert_eq!(stamp.popcount(), bits.count_ones() as usize);
        }

        #[test]
        fn occupied_coords_are_unique_and_blocking(bits in 0u32..(1 << 25)) {
            let stamp = stamp_from_bits(bits);
            let mut seen = std::collections::HashSet::new();
            for &c in stamp.occupied() {
                prop_assert!(seen.insert((c.x, c.y)));
                prop_assert!(stamp.blocks(c.x, c.y));
            }
        }

        #[test]
        fn border_is_exactly_the_adjacent_unoccupied_ring(bits in 0u32..(1 << 25)) {
            let stamp = stamp_from_bits(bits);
            let border: std::collections::HashSet<_> =
                stamp.border().iter().map(|c| (c.x, c.y)).collect();
            prop_assert_eq!(border.len(), stamp.border().len());
            for y in -1..=SUBDIVISION_COUNT {
                for x in -1..=SUBDIVISION_COUNT {
                    let adjacent = stamp.blocks(x, y - 1)
                        || stamp.blocks(x, y + 1)
                        || stamp.blocks(x - 1, y)
                        || stamp.blocks(x + 1, y);
                    let expected = adjacent && !stamp.blocks(x, y);
                    prop_assert_eq!(border.contains(&(x, y)), expected);
                }
            }
        }

        #[test]
        fn reconstruction_is_deterministic(bits in 0u32..(1 << 25)) {
            let a = stamp_from_bits(bits);
            let b = stamp_from_bits(bits);
            prop_assert_eq!(a.occupied(), b.occupied());
            prop_assert_eq!(a.border(), b.border());
        }

        #[test]
        fn list_lengths_are_bounded(bits in 0u32..(1 << 25)) {
            let stamp = stamp_from_bits(bits);
            prop_assert!(stamp.occupied().len() <= CELL_STAMP_LENGTH);
            prop_assert!(stamp.border().len() <= BORDER_CAPACITY);
        }
    }
}
