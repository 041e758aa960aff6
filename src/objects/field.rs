//! CPU side of the instanced-object engine.
//!
//! The field stores its population as parallel arrays keyed by the dense
//! slot index of each [`EntityHandle`]. Every [`update`](ObjectField::update)
//! refreshes distances and visibility for all objects, reclassifies LOD
//! levels every [`LOD_INTERVAL`] frames, and gathers the visible objects into
//! one model-matrix batch per level.

use cgmath::{MetricSpace, Point3};

use crate::data_structures::handle::{EntityHandle, HandlePool};
use crate::data_structures::instance::InstanceRaw;
use crate::objects::lod::{LodDistances, LodLevel, classify};

/// Grid spacing between neighbouring objects.
pub const MIN_DISTANCE: f32 = 3.0;
/// Height of every object center (prisms are 1 unit tall).
pub const GRID_Y: f32 = 0.5;
/// LOD levels are recomputed once per this many frames.
pub const LOD_INTERVAL: u64 = 10;
/// Upper bound imposed by the 20-bit handle index.
pub const MAX_OBJECTS: usize = EntityHandle::MAX_INDEX as usize + 1;

/// Bucket sizes after an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LodCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub visible: usize,
    pub total: usize,
}

impl LodCounts {
    pub fn get(&self, level: LodLevel) -> usize {
        match level {
            LodLevel::High => self.high,
            LodLevel::Medium => self.medium,
            LodLevel::Low => self.low,
        }
    }
}

/// Model matrices of the visible objects, one array per level.
#[derive(Debug, Default, Clone)]
pub struct LodBatches {
    matrices: [Vec<InstanceRaw>; 3],
}

impl LodBatches {
    pub fn get(&self, level: LodLevel) -> &[InstanceRaw] {
        &self.matrices[level.index()]
    }

    /// Number of instanced draws these batches produce.
    pub fn non_empty_count(&self) -> usize {
        self.matrices.iter().filter(|m| !m.is_empty()).count()
    }

    pub fn total(&self) -> usize {
        self.matrices.iter().map(Vec::len).sum()
    }

    fn begin(&mut self, visible_hint: usize) {
        for level in LodLevel::ALL {
            let batch = &mut self.matrices[level.index()];
            batch.clear();
            batch.reserve(visible_hint * level.reserve_percent() / 100);
        }
    }
}

#[derive(Debug)]
pub struct ObjectField {
    pool: HandlePool,
    handles: Vec<EntityHandle>,
    positions: Vec<Point3<f32>>,
    distances: Vec<f32>,
    lods: Vec<LodLevel>,
    visible: Vec<bool>,
    culling_enabled: bool,
    lod_enabled: bool,
    frame: u64,
    lod_dirty: bool,
    batches: LodBatches,
    counts: LodCounts,
}

impl Default for ObjectField {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectField {
    pub fn new() -> Self {
        Self {
            pool: HandlePool::new(),
            handles: Vec::new(),
            positions: Vec::new(),
            distances: Vec::new(),
            lods: Vec::new(),
            visible: Vec::new(),
            culling_enabled: true,
            lod_enabled: true,
            frame: 0,
            lod_dirty: true,
            batches: LodBatches::default(),
            counts: LodCounts::default(),
        }
    }

    /// Rebuild the population as a centered square grid. Negative counts are
    /// treated as zero. Every previously issued handle becomes stale.
    pub fn set_object_count(&mut self, n: i64) {
        let mut n = n.max(0) as usize;
        if n > MAX_OBJECTS {
            log::warn!("object count {n} exceeds the handle space, clamping to {MAX_OBJECTS}");
            n = MAX_OBJECTS;
        }

        self.pool.clear();
        self.handles.clear();
        self.positions.clear();

        let side = grid_side(n);
        let offset = side.saturating_sub(1) as f32 * MIN_DISTANCE * 0.5;
        for i in 0..n {
            let Some(handle) = self.pool.allocate() else {
                break;
            };
            let (row, col) = (i / side, i % side);
            self.handles.push(handle);
            self.positions.push(Point3::new(
                col as f32 * MIN_DISTANCE - offset,
                GRID_Y,
                row as f32 * MIN_DISTANCE - offset,
            ));
        }

        let n = self.positions.len();
        self.distances = vec![0.0; n];
        self.lods = vec![LodLevel::High; n];
        self.visible = vec![false; n];
        self.batches.begin(0);
        self.counts = LodCounts {
            total: n,
            ..Default::default()
        };
        self.lod_dirty = true;
    }

    /// Refresh distances, visibility and (periodically) LOD levels, then
    /// rebuild the per-level batches. LOD recomputation is scheduled by
    /// frame count, so the frame time is not consulted.
    pub fn update(
        &mut self,
        camera_pos: Point3<f32>,
        cull_distance: f32,
        high_lod_distance: f32,
        medium_lod_distance: f32,
        _dt: f32,
    ) {
        for (distance, position) in self.distances.iter_mut().zip(&self.positions) {
            *distance = position.distance(camera_pos);
        }

        let mut visible_count = 0;
        for (visible, &distance) in self.visible.iter_mut().zip(&self.distances) {
            *visible = !self.culling_enabled || distance <= cull_distance;
            visible_count += *visible as usize;
        }

        if self.lod_dirty || self.frame % LOD_INTERVAL == 0 {
            for (lod, &distance) in self.lods.iter_mut().zip(&self.distances) {
                *lod = if self.lod_enabled {
                    classify(distance, high_lod_distance, medium_lod_distance)
                } else {
                    LodLevel::High
                };
            }
            self.lod_dirty = false;
        }
        self.frame = self.frame.wrapping_add(1);

        self.batches.begin(visible_count);
        for i in 0..self.positions.len() {
            if self.visible[i] {
                self.batches.matrices[self.lods[i].index()]
                    .push(InstanceRaw::from_position(self.positions[i]));
            }
        }

        self.counts = LodCounts {
            high: self.batches.get(LodLevel::High).len(),
            medium: self.batches.get(LodLevel::Medium).len(),
            low: self.batches.get(LodLevel::Low).len(),
            visible: visible_count,
            total: self.positions.len(),
        };
    }

    /// [`update`](Self::update) with the distances bundled together.
    pub fn update_with(&mut self, camera_pos: Point3<f32>, distances: LodDistances, dt: f32) {
        self.update(camera_pos, distances.cull, distances.high, distances.medium, dt);
    }

    pub fn set_culling_enabled(&mut self, enabled: bool) {
        if self.culling_enabled != enabled {
            self.culling_enabled = enabled;
            self.lod_dirty = true;
        }
    }

    pub fn set_lod_enabled(&mut self, enabled: bool) {
        if self.lod_enabled != enabled {
            self.lod_enabled = enabled;
            self.lod_dirty = true;
        }
    }

    /// Force a LOD recomputation on the next update, e.g. after the LOD
    /// distances changed.
    pub fn invalidate_lod(&mut self) {
        self.lod_dirty = true;
    }

    pub fn culling_enabled(&self) -> bool {
        self.culling_enabled
    }

    pub fn lod_enabled(&self) -> bool {
        self.lod_enabled
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn handles(&self) -> &[EntityHandle] {
        &self.handles
    }

    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    pub fn position(&self, handle: EntityHandle) -> Option<Point3<f32>> {
        self.pool.resolve(handle).map(|slot| self.positions[slot])
    }

    pub fn distance(&self, handle: EntityHandle) -> Option<f32> {
        self.pool.resolve(handle).map(|slot| self.distances[slot])
    }

    pub fn lod(&self, handle: EntityHandle) -> Option<LodLevel> {
        self.pool.resolve(handle).map(|slot| self.lods[slot])
    }

    pub fn is_visible(&self, handle: EntityHandle) -> Option<bool> {
        self.pool.resolve(handle).map(|slot| self.visible[slot])
    }

    /// Model matrix of a live object: always `translate(position)`.
    pub fn model_matrix(&self, handle: EntityHandle) -> Option<InstanceRaw> {
        self.position(handle).map(InstanceRaw::from_position)
    }

    pub fn batches(&self) -> &LodBatches {
        &self.batches
    }

    pub fn counts(&self) -> LodCounts {
        self.counts
    }
}

/// Smallest side whose square holds `n` objects.
fn grid_side(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let mut side = (n as f64).sqrt().ceil() as usize;
    while side * side < n {
        side += 1;
    }
    while side > 1 && (side - 1) * (side - 1) >= n {
        side -= 1;
    }
    side
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_side_is_the_ceiling_square_root() {
        assert_eq!(grid_side(0), 0);
        assert_eq!(grid_side(1), 1);
        assert_eq!(grid_side(4), 2);
        assert_eq!(grid_side(5), 3);
        assert_eq!(grid_side(500_000), 708);
    }

    #[test]
    fn grid_is_centered_on_the_origin() {
        let mut field = ObjectField::new();
        field.set_object_count(9);
        let positions = field.positions();
        assert_eq!(positions[0], Point3::new(-3.0, 0.5, -3.0));
        assert_eq!(positions[4], Point3::new(0.0, 0.5, 0.0));
        assert_eq!(positions[8], Point3::new(3.0, 0.5, 3.0));
    }
}
