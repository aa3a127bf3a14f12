use std::collections::{HashMap, HashSet};

use glam::{IVec2, Vec2};

use crate::types::*;

/// Colliders spanning more cells than this go to the oversized list instead of the grid.
const MAX_CELLS_PER_ENTRY: i64 = 1024;

/// Inclusive range of grid cells covered by a bounding area.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct CellRange {
    min: IVec2,
    max: IVec2,
}

impl CellRange {
    fn cell_count(&self) -> i64 {
        (self.max.x as i64 - self.min.x as i64 + 1) * (self.max.y as i64 - self.min.y as i64 + 1)
    }

    fn cells(&self) -> impl Iterator<Item = IVec2> + '_ {
        (self.min.y..=self.max.y).flat_map(move |y| (self.min.x..=self.max.x).map(move |x| IVec2::new(x, y)))
    }
}

struct Entry {
    area: BoundingArea,
    /// `None` for oversized entries.
    range: Option<CellRange>,
}

/// Broad phase: persistent uniform grid over collider bounding areas.
///
/// Entries are kept up to date by the physics system as colliders are
/// registered, moved, rebuilt or dropped. Queries return candidates only;
/// no shape-exact test happens here.
pub struct ColliderTree {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<ColliderId>>,
    entries: HashMap<ColliderId, Entry>,
    by_body: HashMap<BodyId, HashSet<ColliderId>>,
    oversized: HashSet<ColliderId>,
}

impl ColliderTree {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1e-5),
            cells: HashMap::new(),
            entries: HashMap::new(),
            by_body: HashMap::new(),
            oversized: HashSet::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ColliderId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Indexed bounds of `id`.
    pub fn area_of(&self, id: ColliderId) -> Option<BoundingArea> {
        self.entries.get(&id).map(|e| e.area)
    }

    fn world_to_cell(&self, x: f32, y: f32) -> IVec2 {
        IVec2::new((x / self.cell_size).floor() as i32, (y / self.cell_size).floor() as i32)
    }

    fn cell_range(&self, area: &BoundingArea) -> Option<CellRange> {
        if area.is_empty() || !area.minimum.is_finite() || !area.maximum.is_finite() {
            return None;
        }
        let range = CellRange {
            min: self.world_to_cell(area.minimum.x, area.minimum.y),
            max: self.world_to_cell(area.maximum.x, area.maximum.y),
        };
        (range.cell_count() <= MAX_CELLS_PER_ENTRY).then_some(range)
    }

    /// Index a collider. Re-inserting an existing id behaves like `update`.
    pub fn insert(&mut self, id: ColliderId, area: BoundingArea) {
        if self.entries.contains_key(&id) {
            self.update(id, area);
            return;
        }
        if area.is_empty() {
            // Degenerate colliders can never be hit; keep them out of the index
            return;
        }
        let range = self.cell_range(&area);
        match range {
            Some(range) => {
                for cell in range.cells() {
                    self.cells.entry((cell.x, cell.y)).or_default().push(id);
                }
            }
            None => {
                self.oversized.insert(id);
            }
        }
        self.entries.insert(id, Entry { area, range });
        self.by_body.entry(id.body).or_default().insert(id);
    }

    /// Move an indexed collider to new bounds. Unknown ids are inserted.
    pub fn update(&mut self, id: ColliderId, area: BoundingArea) {
        let Some(entry) = self.entries.get(&id) else {
            self.insert(id, area);
            return;
        };
        let range = self.cell_range(&area);
        if !area.is_empty() && range.is_some() && range == entry.range {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.area = area;
            }
            return;
        }
        self.remove(id);
        self.insert(id, area);
    }

    /// Drop a collider from the index. Returns whether it was present.
    pub fn remove(&mut self, id: ColliderId) -> bool {
        let Some(entry) = self.entries.remove(&id) else {
            return false;
        };
        match entry.range {
            Some(range) => {
                for cell in range.cells() {
                    if let Some(list) = self.cells.get_mut(&(cell.x, cell.y)) {
                        list.retain(|c| *c != id);
                        if list.is_empty() {
                            self.cells.remove(&(cell.x, cell.y));
                        }
                    }
                }
            }
            None => {
                self.oversized.remove(&id);
            }
        }
        if let Some(ids) = self.by_body.get_mut(&id.body) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_body.remove(&id.body);
            }
        }
        true
    }

    /// Drop every collider owned by `body`.
    pub fn remove_body(&mut self, body: BodyId) {
        for id in self.by_body.remove(&body).unwrap_or_default() {
            self.remove(id);
        }
    }

    /// Make the index hold exactly `entries` for `body`.
    pub fn sync_body(&mut self, body: BodyId, entries: &[(ColliderId, BoundingArea)]) {
        let incoming: HashSet<ColliderId> = entries.iter().map(|(id, _)| *id).collect();
        let stale: Vec<ColliderId> = self
            .by_body
            .get(&body)
            .map(|ids| ids.iter().copied().filter(|id| !incoming.contains(id)).collect())
            .unwrap_or_default();
        for id in stale {
            self.remove(id);
        }
        for (id, area) in entries {
            debug_assert_eq!(id.body, body, "collider synced under a foreign body");
            if area.is_empty() {
                self.remove(*id);
            } else {
                self.update(*id, *area);
            }
        }
    }

    /// Every indexed collider whose bounds overlap `area`, in ascending id order.
    ///
    /// The query collider itself is included when indexed; callers filter it.
    pub fn retrieve_potential_collisions(&self, area: &BoundingArea) -> Vec<ColliderId> {
        let mut out = Vec::new();
        if area.is_empty() {
            return out;
        }
        let mut seen = HashSet::new();
        let mut consider = |id: ColliderId, out: &mut Vec<ColliderId>| {
            if !seen.insert(id) {
                return;
            }
            if self.entries.get(&id).is_some_and(|e| e.area.overlaps(area)) {
                out.push(id);
            }
        };
        match self.cell_range(area) {
            Some(range) => {
                for cell in range.cells() {
                    if let Some(list) = self.cells.get(&(cell.x, cell.y)) {
                        for &id in list {
                            consider(id, &mut out);
                        }
                    }
                }
            }
            None => {
                // Query too large to walk cell by cell
                for &id in self.entries.keys() {
                    consider(id, &mut out);
                }
            }
        }
        for &id in &self.oversized {
            consider(id, &mut out);
        }
        out.sort();
        out
    }

    /// Colliders in the cells a ray passes through, in visiting order.
    ///
    /// `direction` must be unit length; cells are walked until `max_distance`.
    pub fn ray_candidates(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Vec<ColliderId> {
        let mut out = Vec::new();
        if !origin.is_finite() || direction.length_squared() == 0.0 {
            return out;
        }
        let cs = self.cell_size;
        let mut seen = HashSet::new();

        let mut cell = self.world_to_cell(origin.x, origin.y);
        let step_x = if direction.x > 0.0 { 1 } else if direction.x < 0.0 { -1 } else { 0 };
        let step_y = if direction.y > 0.0 { 1 } else if direction.y < 0.0 { -1 } else { 0 };
        let next_boundary = |c: i32, step: i32| -> f32 {
            if step > 0 { (c as f32 + 1.0) * cs } else { c as f32 * cs }
        };
        let mut t_max_x =
            if step_x != 0 { (next_boundary(cell.x, step_x) - origin.x) / direction.x } else { f32::INFINITY };
        let mut t_max_y =
            if step_y != 0 { (next_boundary(cell.y, step_y) - origin.y) / direction.y } else { f32::INFINITY };
        let t_delta_x = if step_x != 0 { cs / direction.x.abs() } else { f32::INFINITY };
        let t_delta_y = if step_y != 0 { cs / direction.y.abs() } else { f32::INFINITY };

        let mut t_curr = 0.0f32;
        for _ in 0..10_000 {
            if t_curr > max_distance {
                break;
            }
            if let Some(list) = self.cells.get(&(cell.x, cell.y)) {
                out.extend(list.iter().copied().filter(|id| seen.insert(*id)));
            }
            if t_max_x < t_max_y {
                cell.x = cell.x.saturating_add(step_x);
                t_curr = t_max_x;
                t_max_x += t_delta_x;
            } else {
                cell.y = cell.y.saturating_add(step_y);
                t_curr = t_max_y;
                t_max_y += t_delta_y;
            }
        }
        out.extend(self.oversized.iter().copied().filter(|id| seen.insert(*id)));
        out
    }

    /// Return occupancy numbers for the current index.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            colliders: self.entries.len(),
            cells: self.cells.len(),
            cell_entries: self.cells.values().map(Vec::len).sum(),
        }
    }
}
