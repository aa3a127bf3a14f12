//! Tile grids and the derivation of boundary line colliders from them.

use std::collections::{BTreeMap, HashSet};

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::api::TileSource;
use crate::collider::Collider;
use crate::types::Layers;

/// Side of a tile, as a bit so several can be combined.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CardinalDirections(pub u8);

impl CardinalDirections {
    pub const NONE: CardinalDirections = CardinalDirections(0);
    pub const WEST: CardinalDirections = CardinalDirections(1);
    pub const NORTH: CardinalDirections = CardinalDirections(1 << 1);
    pub const EAST: CardinalDirections = CardinalDirections(1 << 2);
    pub const SOUTH: CardinalDirections = CardinalDirections(1 << 3);

    pub fn contains(self, other: CardinalDirections) -> bool {
        (self.0 & other.0) == other.0 && other.0 != 0
    }
}

impl std::ops::BitOrAssign for CardinalDirections {
    fn bitor_assign(&mut self, rhs: CardinalDirections) {
        self.0 |= rhs.0;
    }
}

/// Per-edge layer overrides for tile-derived colliders.
/// `Layers::NONE` leaves the owning body's layers in effect.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeLayers {
    pub left: Layers,
    pub top: Layers,
    pub right: Layers,
    pub bottom: Layers,
}

/// Mapping from tile coordinates to body-local positions.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    pub tile_size: Vec2,
    pub offset: Vec2,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self { tile_size: Vec2::ONE, offset: Vec2::ZERO }
    }
}

impl TileGrid {
    pub fn new(tile_size: Vec2) -> Self {
        Self { tile_size, offset: Vec2::ZERO }
    }

    /// Lower-left corner of `tile`.
    pub fn tile_position(&self, tile: IVec2) -> Vec2 {
        self.offset + tile.as_vec2() * self.tile_size
    }
}

/// Sparse set of active tiles on a grid.
#[derive(Clone, Debug)]
pub struct TileMap {
    pub grid: TileGrid,
    active: HashSet<IVec2>,
    min: IVec2,
    max: IVec2,
}

impl Default for TileMap {
    fn default() -> Self {
        Self::new(TileGrid::default())
    }
}

impl TileMap {
    pub fn new(grid: TileGrid) -> Self {
        Self { grid, active: HashSet::new(), min: IVec2::MAX, max: IVec2::MIN }
    }

    /// Build a map from every tile in `[min, max]` for which `is_active` holds.
    pub fn from_fn(grid: TileGrid, min: IVec2, max: IVec2, is_active: impl Fn(IVec2) -> bool) -> Self {
        let mut map = Self::new(grid);
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                let tile = IVec2::new(x, y);
                if is_active(tile) {
                    map.set_tile(tile, true);
                }
            }
        }
        map
    }

    /// Build a map from rows of text, top row first; `#` marks an active tile.
    pub fn from_rows(grid: TileGrid, rows: &[&str]) -> Self {
        let mut map = Self::new(grid);
        let height = rows.len() as i32;
        for (row, line) in rows.iter().enumerate() {
            let y = height - 1 - row as i32;
            for (x, ch) in line.chars().enumerate() {
                if ch == '#' {
                    map.set_tile(IVec2::new(x as i32, y), true);
                }
            }
        }
        map
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    fn recompute_bounds(&mut self) {
        self.min = IVec2::MAX;
        self.max = IVec2::MIN;
        for t in &self.active {
            self.min = self.min.min(*t);
            self.max = self.max.max(*t);
        }
    }
}

impl TileSource for TileMap {
    fn has_active_tile_at(&self, tile: IVec2) -> bool {
        self.active.contains(&tile)
    }

    fn minimum_tile(&self) -> IVec2 {
        self.min
    }

    fn maximum_tile(&self) -> IVec2 {
        self.max
    }

    fn tile_position(&self, tile: IVec2) -> Vec2 {
        self.grid.tile_position(tile)
    }

    fn set_tile(&mut self, tile: IVec2, active: bool) -> bool {
        if active {
            if !self.active.insert(tile) {
                return false;
            }
            self.min = self.min.min(tile);
            self.max = self.max.max(tile);
        } else {
            if !self.active.remove(&tile) {
                return false;
            }
            if tile.x == self.min.x || tile.y == self.min.y || tile.x == self.max.x || tile.y == self.max.y {
                self.recompute_bounds();
            }
        }
        true
    }

    fn for_each_active_tile(&self, f: &mut dyn FnMut(IVec2)) {
        let mut tiles: Vec<IVec2> = self.active.iter().copied().collect();
        tiles.sort_unstable_by_key(|t| (t.y, t.x));
        for tile in tiles {
            f(tile);
        }
    }
}

/// Axis-aligned boundary segment between grid points, `start <= end`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileLineSegment {
    pub start: IVec2,
    pub end: IVec2,
    pub layers: Layers,
    /// Side of the active tile this segment bounds.
    pub side: CardinalDirections,
}

impl TileLineSegment {
    /// # Panics
    /// If the two points are neither horizontally nor vertically aligned.
    pub fn new(a: IVec2, b: IVec2, layers: Layers, side: CardinalDirections) -> Self {
        if a.x == b.x {
            Self { start: IVec2::new(a.x, a.y.min(b.y)), end: IVec2::new(a.x, a.y.max(b.y)), layers, side }
        } else if a.y == b.y {
            Self { start: IVec2::new(a.x.min(b.x), a.y), end: IVec2::new(a.x.max(b.x), a.y), layers, side }
        } else {
            panic!("tile line segment must be axis aligned: {a} -> {b}");
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.start.y == self.end.y
    }

    /// Coordinate along the segment's own axis.
    fn span(&self) -> (i32, i32) {
        if self.is_horizontal() { (self.start.x, self.end.x) } else { (self.start.y, self.end.y) }
    }

    /// Absorb `other` if it lies on the same line and touches or overlaps this segment.
    pub fn try_combine_with(&mut self, other: &TileLineSegment) -> bool {
        if self.group_key() != other.group_key() {
            return false;
        }
        let (s0, e0) = self.span();
        let (s1, e1) = other.span();
        if s1 > e0 || s0 > e1 {
            return false;
        }
        let (s, e) = (s0.min(s1), e0.max(e1));
        if self.is_horizontal() {
            self.start.x = s;
            self.end.x = e;
        } else {
            self.start.y = s;
            self.end.y = e;
        }
        true
    }

    /// Segments only merge within the same group: orientation, line, side and layers.
    fn group_key(&self) -> (bool, i32, CardinalDirections, u16) {
        let line = if self.is_horizontal() { self.start.y } else { self.start.x };
        (self.is_horizontal(), line, self.side, self.layers.0)
    }
}

/// Sides of `tile` whose neighbour is inactive.
fn exposed_edges(source: &dyn TileSource, tile: IVec2) -> CardinalDirections {
    let mut directions = CardinalDirections::NONE;
    if !source.has_active_tile_at(tile - IVec2::X) {
        directions |= CardinalDirections::WEST;
    }
    if !source.has_active_tile_at(tile + IVec2::Y) {
        directions |= CardinalDirections::NORTH;
    }
    if !source.has_active_tile_at(tile + IVec2::X) {
        directions |= CardinalDirections::EAST;
    }
    if !source.has_active_tile_at(tile - IVec2::Y) {
        directions |= CardinalDirections::SOUTH;
    }
    directions
}

/// One unit segment per exposed side of every active tile.
pub fn extract_segments(source: &dyn TileSource, overrides: &EdgeLayers) -> Vec<TileLineSegment> {
    let mut segments = Vec::new();
    source.for_each_active_tile(&mut |tile| {
        let directions = exposed_edges(source, tile);
        if directions.contains(CardinalDirections::WEST) {
            segments.push(TileLineSegment::new(tile, tile + IVec2::Y, overrides.left, CardinalDirections::WEST));
        }
        if directions.contains(CardinalDirections::NORTH) {
            segments.push(TileLineSegment::new(
                tile + IVec2::Y,
                tile + IVec2::ONE,
                overrides.top,
                CardinalDirections::NORTH,
            ));
        }
        if directions.contains(CardinalDirections::EAST) {
            segments.push(TileLineSegment::new(
                tile + IVec2::X,
                tile + IVec2::ONE,
                overrides.right,
                CardinalDirections::EAST,
            ));
        }
        if directions.contains(CardinalDirections::SOUTH) {
            segments.push(TileLineSegment::new(tile, tile + IVec2::X, overrides.bottom, CardinalDirections::SOUTH));
        }
    });
    segments
}

/// Combine touching collinear segments of the same group until none remain.
///
/// Output is ordered by group, then by position along the line.
pub fn merge_segments(segments: Vec<TileLineSegment>) -> Vec<TileLineSegment> {
    let mut groups: BTreeMap<(bool, i32, CardinalDirections, u16), Vec<TileLineSegment>> = BTreeMap::new();
    for segment in segments {
        groups.entry(segment.group_key()).or_default().push(segment);
    }

    let mut merged = Vec::new();
    for (_, mut line) in groups {
        line.sort_by_key(|s| s.span());
        let mut iter = line.into_iter();
        let Some(mut current) = iter.next() else { continue };
        for next in iter {
            // Sorted by start, so a failed combine means a gap: nothing later can touch `current`
            if !current.try_combine_with(&next) {
                merged.push(current);
                current = next;
            }
        }
        merged.push(current);
    }
    merged
}

/// Line colliders outlining the active region of `source`, in body-local space.
pub fn build_tile_colliders(source: &dyn TileSource, overrides: &EdgeLayers) -> Vec<Collider> {
    merge_segments(extract_segments(source, overrides))
        .into_iter()
        .map(|segment| {
            Collider::line(source.tile_position(segment.start), source.tile_position(segment.end))
                .with_layers(segment.layers)
        })
        .collect()
}
