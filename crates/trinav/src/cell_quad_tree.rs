//! Quad tree spatial index for triangle cells
//!
//! Cells are stored by [`CellId`] in the deepest node whose XZ bounds fully
//! contain the cell's column bounds. Queries take the cell arena the ids refer
//! to.

use crate::{CellId, TriCell};
use nav_common::{rect_contains_point, rect_contains_rect, rect_intersects, xz, Error, Result, Vec2, Vec3};

const CHILD_COUNT: usize = 4;

/// A fixed-depth quad tree over the XZ plane
#[derive(Debug, Clone)]
pub struct CellQuadTree {
    bounds_min: Vec2,
    bounds_max: Vec2,
    depth: usize,
    max_depth: usize,
    cells: Vec<CellId>,
    children: Option<Box<[CellQuadTree; CHILD_COUNT]>>,
}

impl CellQuadTree {
    /// Creates an empty tree covering the given XZ bounds.
    ///
    /// `max_depth` is clamped to at least 1. Returns an error if the bounds
    /// are empty on either axis.
    pub fn new(min_x: f32, min_z: f32, max_x: f32, max_z: f32, max_depth: usize) -> Result<Self> {
        // Written to also reject NaN bounds.
        if !(min_x < max_x && min_z < max_z) {
            return Err(Error::InvalidArgument(format!(
                "invalid quad tree bounds ({}, {}) -> ({}, {})",
                min_x, min_z, max_x, max_z
            )));
        }
        Ok(Self::node(
            Vec2::new(min_x, min_z),
            Vec2::new(max_x, max_z),
            0,
            max_depth.max(1),
        ))
    }

    fn node(bounds_min: Vec2, bounds_max: Vec2, depth: usize, max_depth: usize) -> Self {
        Self {
            bounds_min,
            bounds_max,
            depth,
            max_depth,
            cells: Vec::new(),
            children: None,
        }
    }

    /// Minimum (x, z) of the tree
    pub fn bounds_min(&self) -> Vec2 {
        self.bounds_min
    }

    /// Maximum (x, z) of the tree
    pub fn bounds_max(&self) -> Vec2 {
        self.bounds_max
    }

    /// Maximum depth of the tree
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Child quadrant bounds. Quadrants are ordered (min, min), (min, max),
    /// (max, max), (max, min) in (x, z).
    fn child_bounds(&self, child: usize) -> (Vec2, Vec2) {
        let half = (self.bounds_max - self.bounds_min) * 0.5;
        let offset = match child {
            0 => Vec2::ZERO,
            1 => Vec2::new(0.0, half.y),
            2 => half,
            _ => Vec2::new(half.x, 0.0),
        };
        let min = self.bounds_min + offset;
        (min, min + half)
    }

    /// Adds a cell to the tree.
    ///
    /// Returns `false` if the cell does not fit within the tree bounds or is
    /// already stored.
    pub fn add(&mut self, id: CellId, cell: &TriCell) -> bool {
        let (cmin, cmax) = (cell.bounds_min(), cell.bounds_max());
        if !rect_contains_rect(self.bounds_min, self.bounds_max, cmin, cmax) {
            return false;
        }
        self.add_fitting(id, cmin, cmax)
    }

    fn add_fitting(&mut self, id: CellId, cmin: Vec2, cmax: Vec2) -> bool {
        if self.depth < self.max_depth {
            let target = (0..CHILD_COUNT).find(|&child| {
                let (min, max) = self.child_bounds(child);
                rect_contains_rect(min, max, cmin, cmax)
            });
            if let Some(child) = target {
                if self.children.is_none() {
                    let children = [0, 1, 2, 3].map(|i| {
                        let (min, max) = self.child_bounds(i);
                        CellQuadTree::node(min, max, self.depth + 1, self.max_depth)
                    });
                    self.children = Some(Box::new(children));
                }
                if let Some(children) = self.children.as_mut() {
                    return children[child].add_fitting(id, cmin, cmax);
                }
            }
        }

        if self.cells.contains(&id) {
            return false;
        }
        self.cells.push(id);
        true
    }

    /// All cells stored in the tree
    pub fn all_cells(&self) -> Vec<CellId> {
        let mut result = Vec::new();
        self.collect_all(&mut result);
        result
    }

    fn collect_all(&self, results: &mut Vec<CellId>) {
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.collect_all(results);
            }
        }
        results.extend_from_slice(&self.cells);
    }

    /// Cells whose column contains the point (x, z)
    pub fn cells_for_point(&self, cells: &[TriCell], p: Vec2) -> Vec<CellId> {
        let mut result = Vec::new();
        self.query_point(cells, p, &mut result);
        result
    }

    fn query_point(&self, cells: &[TriCell], p: Vec2, results: &mut Vec<CellId>) {
        if !rect_contains_point(self.bounds_min, self.bounds_max, p) {
            return;
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query_point(cells, p, results);
            }
        }
        results.extend(
            self.cells
                .iter()
                .copied()
                .filter(|id| cells.get(id.index()).is_some_and(|c| c.is_in_column(p))),
        );
    }

    /// Cells whose column overlaps the XZ rectangle
    pub fn cells_in_column(&self, cells: &[TriCell], min: Vec2, max: Vec2) -> Vec<CellId> {
        let mut result = Vec::new();
        self.query_rect(cells, min, max, &mut result);
        result
    }

    fn query_rect(&self, cells: &[TriCell], min: Vec2, max: Vec2, results: &mut Vec<CellId>) {
        if !rect_intersects(self.bounds_min, self.bounds_max, min, max) {
            return;
        }
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query_rect(cells, min, max, results);
            }
        }
        results.extend(
            self.cells
                .iter()
                .copied()
                .filter(|id| cells.get(id.index()).is_some_and(|c| c.intersects(min, max))),
        );
    }

    /// Finds the cell closest to `p` and the closest point on it.
    ///
    /// With `must_be_in_column` only cells whose column contains the point are
    /// considered and the vertically closest one wins; `None` is returned if
    /// there are none. Otherwise every cell in the tree is a candidate.
    pub fn closest_cell(
        &self,
        cells: &[TriCell],
        p: Vec3,
        must_be_in_column: bool,
    ) -> Option<(CellId, Vec3)> {
        if !must_be_in_column {
            let ids = self.all_cells();
            return TriCell::closest_cell(
                p,
                ids.into_iter()
                    .filter_map(|id| cells.get(id.index()).map(|c| (id, c))),
            );
        }

        let mut selected = None;
        let mut selected_delta = f32::MAX;
        for id in self.cells_for_point(cells, xz(p)) {
            let plane_y = cells[id.index()].plane_y(p.x, p.z);
            let delta = (plane_y - p.y).abs();
            if delta < selected_delta {
                selected_delta = delta;
                selected = Some((id, Vec3::new(p.x, plane_y, p.z)));
            }
        }
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_mesh_helpers::*;
    use nav_common::TOLERANCE_STD;

    fn corridor_tree(cells: &[TriCell]) -> CellQuadTree {
        let mut tree = CellQuadTree::new(-5.0, -3.0, 5.0, 4.0, 5).unwrap();
        for (i, cell) in cells.iter().enumerate() {
            assert!(tree.add(CellId(i), cell));
        }
        tree
    }

    fn sorted(mut ids: Vec<CellId>) -> Vec<CellId> {
        ids.sort();
        ids
    }

    #[test]
    fn test_construction() {
        let tree = CellQuadTree::new(-8.0, 2.0, 5.0, 7.0, 9).unwrap();
        assert_eq!(tree.bounds_min(), Vec2::new(-8.0, 2.0));
        assert_eq!(tree.bounds_max(), Vec2::new(5.0, 7.0));
        assert_eq!(tree.max_depth(), 9);
        assert!(tree.all_cells().is_empty());

        assert_eq!(CellQuadTree::new(0.0, 0.0, 1.0, 1.0, 0).unwrap().max_depth(), 1);
        assert!(CellQuadTree::new(1.0, 0.0, 1.0, 1.0, 3).is_err());
        assert!(CellQuadTree::new(0.0, 2.0, 1.0, 1.0, 3).is_err());
    }

    #[test]
    fn test_add() {
        let cells = corridor_cells();
        let mut tree = corridor_tree(&cells);

        // Duplicates are rejected.
        for (i, cell) in cells.iter().enumerate() {
            assert!(!tree.add(CellId(i), cell));
        }
        assert_eq!(sorted(tree.all_cells()), ids(&(0..POLY_COUNT).collect::<Vec<_>>()));
    }

    #[test]
    fn test_add_out_of_bounds() {
        let cells = corridor_cells();
        let mut tree = CellQuadTree::new(
            -5.0 + TOLERANCE_STD,
            -3.0 + TOLERANCE_STD,
            5.0 - TOLERANCE_STD,
            4.0 - TOLERANCE_STD,
            5,
        )
        .unwrap();

        // Cells touching the outer edge of the mesh no longer fit.
        for (i, cell) in cells.iter().enumerate() {
            let fits = cell.bounds_min().x > -5.0
                && cell.bounds_min().y > -3.0
                && cell.bounds_max().x < 5.0
                && cell.bounds_max().y < 4.0;
            assert_eq!(tree.add(CellId(i), cell), fits, "cell {}", i);
        }
    }

    #[test]
    fn test_cells_for_point_matches_scan() {
        let cells = corridor_cells();
        let tree = corridor_tree(&cells);

        let mut z = -3.0;
        while z <= 4.0 {
            let mut x = -5.0;
            while x <= 5.0 {
                let p = Vec2::new(x, z);
                let expected: Vec<CellId> = (0..cells.len())
                    .filter(|&i| cells[i].is_in_column(p))
                    .map(CellId)
                    .collect();
                assert_eq!(sorted(tree.cells_for_point(&cells, p)), expected);
                x += 0.35;
            }
            z += 0.35;
        }
        assert!(tree.cells_for_point(&cells, Vec2::new(6.0, 0.0)).is_empty());
    }

    #[test]
    fn test_cells_in_column_matches_scan() {
        let cells = corridor_cells();
        let tree = corridor_tree(&cells);

        for (min, max) in [
            (Vec2::new(-5.0, -3.0), Vec2::new(5.0, 4.0)),
            (Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0)),
            (Vec2::new(2.5, 2.5), Vec2::new(4.5, 3.5)),
            (Vec2::new(-4.9, -2.9), Vec2::new(-4.5, -2.5)),
        ] {
            let expected: Vec<CellId> = (0..cells.len())
                .filter(|&i| cells[i].intersects(min, max))
                .map(CellId)
                .collect();
            assert_eq!(sorted(tree.cells_in_column(&cells, min, max)), expected);
        }
    }

    #[test]
    fn test_closest_cell() {
        let cells = corridor_cells();
        let tree = corridor_tree(&cells);

        for i in 0..PATH_COUNT {
            let path = corridor_path(i);
            let (id, point) = tree.closest_cell(&cells, path.start, true).unwrap();
            assert_eq!(id, CellId(path.cells[0]));
            assert_eq!(point.x, path.start.x);
            assert_eq!(point.z, path.start.z);
            assert!((point.y - cells[id.index()].plane_y(point.x, point.z)).abs() < 1e-5);
        }

        // Outside every column.
        let outside = Vec3::new(6.0, 0.0, 0.0);
        assert!(tree.closest_cell(&cells, outside, true).is_none());
        let (id, point) = tree.closest_cell(&cells, outside, false).unwrap();
        assert!(cells[id.index()].is_in_column(xz(point)));
    }
}
