//! Spatial hash broad phase
//!
//! The grid is rebuilt from scratch every tick before collision resolution.
//! Queries return candidate live-list indices and may contain false
//! positives; the narrow phase is the only authority on contact.

use hashbrown::HashMap;
use rustc_hash::FxHashSet;

use crate::sim::constants::spatial::CELL_SIZE;
use crate::util::vec2::Vec2;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_circle(center: Vec2, radius: f32) -> Self {
        let r = Vec2::new(radius, radius);
        Self {
            min: center - r,
            max: center + r,
        }
    }

    /// Rect from center and half-extents
    pub fn from_rect(center: Vec2, half_extent: Vec2) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Box covering a circle swept from `from` to `to`
    pub fn from_swept_circle(from: Vec2, to: Vec2, radius: f32) -> Self {
        let r = Vec2::new(radius, radius);
        Self {
            min: from.min(to) - r,
            max: from.max(to) + r,
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// Uniform-cell spatial hash over live-list indices
pub struct SpatialHash {
    cells: HashMap<(i32, i32), Vec<u32>>,
    inv_cell_size: f32,
}

impl SpatialHash {
    pub fn new() -> Self {
        Self::with_cell_size(CELL_SIZE)
    }

    pub fn with_cell_size(cell_size: f32) -> Self {
        Self {
            cells: HashMap::new(),
            inv_cell_size: 1.0 / cell_size,
        }
    }

    fn cell_of(&self, p: Vec2) -> (i32, i32) {
        (
            (p.x * self.inv_cell_size).floor() as i32,
            (p.y * self.inv_cell_size).floor() as i32,
        )
    }

    /// Clear all cells, keeping bucket allocations for reuse
    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
    }

    /// Insert an index into every cell its box touches
    pub fn insert(&mut self, index: u32, aabb: Aabb) {
        let (min_x, min_y) = self.cell_of(aabb.min);
        let (max_x, max_y) = self.cell_of(aabb.max);
        for cy in min_y..=max_y {
            for cx in min_x..=max_x {
                self.cells.entry((cx, cy)).or_default().push(index);
            }
        }
    }

    /// Candidate indices whose cells overlap the query box. Deduplicated,
    /// unordered, may include indices whose shapes do not actually touch.
    pub fn query(&self, aabb: Aabb) -> Vec<u32> {
        let (min_x, min_y) = self.cell_of(aabb.min);
        let (max_x, max_y) = self.cell_of(aabb.max);
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        for cy in min_y..=max_y {
            for cx in min_x..=max_x {
                if let Some(bucket) = self.cells.get(&(cx, cy)) {
                    for &index in bucket {
                        if seen.insert(index) {
                            out.push(index);
                        }
                    }
                }
            }
        }
        out
    }

    /// Candidates along a swept circle path
    pub fn query_swept(&self, from: Vec2, to: Vec2, radius: f32) -> Vec<u32> {
        self.query(Aabb::from_swept_circle(from, to, radius))
    }
}

impl Default for SpatialHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_finds_inserted_neighbor() {
        let mut grid = SpatialHash::new();
        grid.insert(7, Aabb::from_circle(Vec2::new(10.0, 10.0), 5.0));

        let hits = grid.query(Aabb::from_circle(Vec2::new(12.0, 12.0), 5.0));
        assert!(hits.contains(&7));
    }

    #[test]
    fn test_query_misses_distant_entity() {
        let mut grid = SpatialHash::new();
        grid.insert(7, Aabb::from_circle(Vec2::new(10.0, 10.0), 5.0));

        let hits = grid.query(Aabb::from_circle(Vec2::new(5000.0, 5000.0), 5.0));
        assert!(hits.is_empty());
    }

    #[test]
    fn test_large_entity_spans_multiple_cells() {
        let mut grid = SpatialHash::new();
        // Radius much larger than the cell size
        grid.insert(3, Aabb::from_circle(Vec2::ZERO, 200.0));

        // Query far from the center but still inside the big circle's box
        let hits = grid.query(Aabb::from_circle(Vec2::new(180.0, 0.0), 1.0));
        assert!(hits.contains(&3));
    }

    #[test]
    fn test_results_are_deduplicated() {
        let mut grid = SpatialHash::new();
        grid.insert(1, Aabb::from_circle(Vec2::ZERO, 300.0));

        let hits = grid.query(Aabb::from_circle(Vec2::ZERO, 300.0));
        assert_eq!(hits.iter().filter(|&&i| i == 1).count(), 1);
    }

    #[test]
    fn test_swept_query_covers_whole_path() {
        let mut grid = SpatialHash::new();
        // Obstacle midway along a long fast-projectile path
        grid.insert(9, Aabb::from_circle(Vec2::new(250.0, 0.0), 10.0));

        let hits = grid.query_swept(Vec2::ZERO, Vec2::new(500.0, 0.0), 4.0);
        assert!(hits.contains(&9));
    }

    #[test]
    fn test_query_superset_of_true_contacts() {
        // Broad phase may overreport but must never underreport: every pair
        // of actually-overlapping circles must appear in each other's query.
        let mut grid = SpatialHash::new();
        let circles = [
            (Vec2::new(0.0, 0.0), 20.0),
            (Vec2::new(30.0, 0.0), 20.0),
            (Vec2::new(63.9, 0.1), 15.0),
            (Vec2::new(-100.0, 64.0), 40.0),
            (Vec2::new(500.0, 500.0), 8.0),
        ];
        for (i, (c, r)) in circles.iter().enumerate() {
            grid.insert(i as u32, Aabb::from_circle(*c, *r));
        }

        for (i, (ca, ra)) in circles.iter().enumerate() {
            let hits = grid.query(Aabb::from_circle(*ca, *ra));
            for (j, (cb, rb)) in circles.iter().enumerate() {
                if i == j {
                    continue;
                }
                let touching = ca.distance_to(*cb) <= ra + rb;
                if touching {
                    assert!(hits.contains(&(j as u32)), "missed contact {} vs {}", i, j);
                }
            }
        }
    }

    #[test]
    fn test_clear_empties_cells() {
        let mut grid = SpatialHash::new();
        grid.insert(1, Aabb::from_circle(Vec2::ZERO, 10.0));
        grid.clear();
        assert!(grid.query(Aabb::from_circle(Vec2::ZERO, 10.0)).is_empty());
    }
}
