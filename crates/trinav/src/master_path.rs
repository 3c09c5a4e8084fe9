//! Cached cell corridors and the waypoint views built on them
//!
//! A [`MasterPath`] is the immutable result of a completed search: the cells
//! from start to goal plus the exit wall of each cell. It is shared through
//! `Rc` between the planner's cache and every [`Path`] handed to callers.
//! A [`Path`] pairs a master path with a goal point and produces waypoints
//! with a modified funnel algorithm.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use crate::{CellId, TriCell};
use nav_common::{
    signed_area_x2_2d, translate_toward, xz, Error, Result, Vec2, Vec3, TOLERANCE_STD,
};

/// Largest allowed funnel offset factor
pub const MAX_OFFSET_FACTOR: f32 = 0.5;

/// A shareable, immutable cell corridor
#[derive(Debug)]
pub struct MasterPath {
    id: u64,
    cell_ids: Vec<CellId>,
    cells: Vec<TriCell>,
    /// Exit wall of each cell, `None` for the goal cell
    wall_indices: Vec<Option<usize>>,
    plane_tolerance: f32,
    offset_factor: f32,
    disposed: Cell<bool>,
    timestamp: Cell<Instant>,
}

impl MasterPath {
    /// Creates a path from cells in `arena`.
    ///
    /// Every cell in `cell_ids` must link to the next one. The plane tolerance
    /// is clamped to at least `f32::EPSILON` and the offset factor to
    /// `0.0..=MAX_OFFSET_FACTOR`.
    pub fn new(
        id: u64,
        arena: &[TriCell],
        cell_ids: Vec<CellId>,
        plane_tolerance: f32,
        offset_factor: f32,
    ) -> Result<Self> {
        if cell_ids.is_empty() {
            return Err(Error::InvalidArgument("path has no cells".to_string()));
        }

        let mut cells = Vec::with_capacity(cell_ids.len());
        for &id in &cell_ids {
            let cell = arena.get(id.index()).ok_or(Error::IndexOutOfRange {
                kind: "cell",
                index: id.index(),
                len: arena.len(),
            })?;
            cells.push(cell.clone());
        }

        let mut wall_indices = Vec::with_capacity(cell_ids.len());
        for (i, pair) in cell_ids.windows(2).enumerate() {
            let wall = cells[i].link_index(pair[1]).ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "invalid path: no link from {} to {}",
                    pair[0], pair[1]
                ))
            })?;
            wall_indices.push(Some(wall));
        }
        wall_indices.push(None);

        Ok(Self {
            id,
            cell_ids,
            cells,
            wall_indices,
            plane_tolerance: plane_tolerance.max(f32::EPSILON),
            offset_factor: offset_factor.clamp(0.0, MAX_OFFSET_FACTOR),
            disposed: Cell::new(false),
            timestamp: Cell::new(Instant::now()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of cells in the path
    pub fn size(&self) -> usize {
        self.cell_ids.len()
    }

    pub fn start_cell(&self) -> CellId {
        self.cell_ids[0]
    }

    pub fn goal_cell(&self) -> CellId {
        self.cell_ids[self.cell_ids.len() - 1]
    }

    /// The cell at position `index` in the path
    pub fn cell(&self, index: usize) -> Result<CellId> {
        self.cell_ids
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                kind: "path cell",
                index,
                len: self.cell_ids.len(),
            })
    }

    /// Position of `cell` in the path
    pub fn cell_index(&self, cell: CellId) -> Option<usize> {
        self.cell_ids.iter().position(|&c| c == cell)
    }

    /// The path cells, start to goal
    pub fn raw_copy(&self) -> Vec<CellId> {
        self.cell_ids.clone()
    }

    pub fn cell_ids(&self) -> &[CellId] {
        &self.cell_ids
    }

    pub fn plane_tolerance(&self) -> f32 {
        self.plane_tolerance
    }

    pub fn offset_factor(&self) -> f32 {
        self.offset_factor
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Marks the path as no longer maintained. Waypoint queries fail afterwards.
    pub fn dispose(&self) {
        self.disposed.set(true);
    }

    pub fn timestamp(&self) -> Instant {
        self.timestamp.get()
    }

    /// Time since the path was created or last kept alive
    pub fn age(&self) -> Duration {
        self.timestamp.get().elapsed()
    }

    pub fn reset_timestamp(&self) {
        self.timestamp.set(Instant::now());
    }

    /// A view of this path leading to `goal`
    pub fn path(self: &Rc<Self>, goal: Vec3) -> Path {
        Path {
            root: Rc::clone(self),
            goal,
        }
    }

    /// Index of the path cell containing `p`.
    ///
    /// The first cell whose plane is within the plane tolerance wins,
    /// otherwise the vertically closest cell whose column contains the point.
    fn position_index(&self, p: Vec3) -> Option<usize> {
        let target = xz(p);
        let mut selected = None;
        let mut min_distance = f32::MAX;
        for (i, cell) in self.cells.iter().enumerate() {
            if !cell.is_in_column(target) {
                continue;
            }
            let y_distance = (cell.plane_y(p.x, p.z) - p.y).abs();
            if y_distance < self.plane_tolerance {
                return Some(i);
            }
            if y_distance < min_distance {
                selected = Some(i);
                min_distance = y_distance;
            }
        }
        selected
    }

    fn exit_wall_vertices(&self, index: usize, wall: usize) -> (Vec3, Vec3) {
        let verts = self.cells[index].vertices();
        (verts[wall], verts[(wall + 1) % verts.len()])
    }
}

/// A path to a specific goal, backed by a shared [`MasterPath`]
#[derive(Debug, Clone)]
pub struct Path {
    root: Rc<MasterPath>,
    goal: Vec3,
}

impl Path {
    pub fn goal(&self) -> Vec3 {
        self.goal
    }

    pub fn id(&self) -> u64 {
        self.root.id
    }

    pub fn is_disposed(&self) -> bool {
        self.root.is_disposed()
    }

    /// The shared corridor behind this path
    pub fn master(&self) -> &Rc<MasterPath> {
        &self.root
    }

    pub fn path_poly_count(&self) -> usize {
        self.root.cells.len()
    }

    pub fn path_vert_count(&self) -> usize {
        self.root.cells.len() * 3
    }

    /// Closest point to `p` on the surface of the path's cells
    pub fn force_to_path(&self, p: Vec3) -> Vec3 {
        TriCell::closest_cell(
            p,
            self.root
                .cell_ids
                .iter()
                .copied()
                .zip(self.root.cells.iter()),
        )
        .map(|(_, point)| point)
        .unwrap_or(p)
    }

    /// Snaps the y-value of `p` to the path surface.
    ///
    /// Returns `None` if the point is outside the path's columns.
    pub fn force_y_to_path(&self, p: Vec3) -> Option<Vec3> {
        let index = self.root.position_index(p)?;
        Some(Vec3::new(p.x, self.root.cells[index].plane_y(p.x, p.z), p.z))
    }

    /// True if the (x, z) point is within the column of any path cell
    pub fn is_in_path_column(&self, p: Vec2) -> bool {
        self.root.cells.iter().any(|cell| cell.is_in_column(p))
    }

    /// The path cells as an unshared triangle list.
    ///
    /// Returns 9 vertex values and 3 indices per cell.
    pub fn path_polys(&self) -> (Vec<f32>, Vec<usize>) {
        let mut verts = Vec::with_capacity(self.path_vert_count() * 3);
        let mut indices = Vec::with_capacity(self.path_vert_count());
        for (i, cell) in self.root.cells.iter().enumerate() {
            for v in cell.vertices() {
                verts.extend_from_slice(&[v.x, v.y, v.z]);
            }
            let base = i * 3;
            indices.extend_from_slice(&[base, base + 1, base + 2]);
        }
        (verts, indices)
    }

    /// The next waypoint when travelling from `from` toward the goal.
    ///
    /// Looks as far down the corridor as possible: returns the goal when it is
    /// visible, otherwise the funnel corner that blocks the view, pulled in
    /// along its wall by the path's offset factor. Returns `None` if the path
    /// is disposed or `from` is not within the path.
    pub fn target(&self, from: Vec3) -> Option<Vec3> {
        let root = &self.root;
        if root.is_disposed() {
            return None;
        }
        let mut start = root.position_index(from)?;
        let count = root.cells.len();
        if count == 1 {
            return Some(self.goal);
        }

        let offset = root.offset_factor;
        let (mut left, mut right);
        loop {
            let Some(wall) = root.wall_indices[start] else {
                return Some(self.goal);
            };
            (left, right) = root.exit_wall_vertices(start, wall);
            if from == left || from == right {
                // Standing on a corner of the exit wall; look from the next cell.
                start += 1;
            } else {
                break;
            }
        }

        let from_2d = xz(from);
        for index in (start + 1)..count {
            let Some(wall) = root.wall_indices[index] else {
                let goal_2d = xz(self.goal);
                if signed_area_x2_2d(from_2d, goal_2d, xz(right)) < TOLERANCE_STD {
                    if signed_area_x2_2d(from_2d, goal_2d, xz(left)) > -TOLERANCE_STD {
                        return Some(self.goal);
                    }
                    return Some(translate_toward(left, right, offset));
                }
                return Some(translate_toward(right, left, offset));
            };

            let (wall_left, wall_right) = root.exit_wall_vertices(index, wall);

            if xz(wall_right) != xz(right)
                && signed_area_x2_2d(from_2d, xz(wall_right), xz(right)) < TOLERANCE_STD
            {
                if signed_area_x2_2d(from_2d, xz(wall_right), xz(left)) > -TOLERANCE_STD {
                    right = wall_right;
                } else {
                    return Some(translate_toward(left, right, offset));
                }
            }

            if xz(wall_left) != xz(left)
                && signed_area_x2_2d(from_2d, xz(wall_left), xz(left)) > -TOLERANCE_STD
            {
                if signed_area_x2_2d(from_2d, xz(wall_left), xz(right)) < TOLERANCE_STD {
                    left = wall_left;
                } else {
                    return Some(translate_toward(right, left, offset));
                }
            }
        }

        None
    }
}
