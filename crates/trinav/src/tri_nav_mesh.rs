//! Navigation mesh of linked triangle cells
//!
//! [`TriNavMesh::build`] turns a triangle soup into a cell arena, indexes the
//! cells in a [`CellQuadTree`] and links every pair of cells that share a
//! wall.

use crate::{CellId, CellQuadTree, MeshBuildConfig, PathRelation, TriCell};
use nav_common::{xz, Error, Result, TriMesh, Vec2, Vec3, TOLERANCE_STD};

/// A built navigation mesh
#[derive(Debug, Clone)]
pub struct TriNavMesh {
    cells: Vec<TriCell>,
    tree: CellQuadTree,
    plane_tolerance: f32,
    offset_scale: f32,
}

impl TriNavMesh {
    /// Builds a mesh from a flat `[x, y, z, ...]` vertex buffer and three
    /// indices per triangle.
    ///
    /// Triangles must wind clockwise when viewed from above. Neighboring
    /// triangles are linked in both directions when they share a wall with
    /// exactly matching vertices.
    pub fn build(verts: &[f32], indices: &[usize], config: &MeshBuildConfig) -> Result<Self> {
        if verts.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "vertex buffer length {} is not a multiple of 3",
                verts.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "index buffer length {} is not a multiple of 3",
                indices.len()
            )));
        }
        if verts.is_empty() || indices.is_empty() {
            return Err(Error::InvalidMesh("mesh has no triangles".to_string()));
        }
        config.validate()?;

        let mut min = Vec2::new(verts[0], verts[2]);
        let mut max = min;
        for v in verts.chunks_exact(3) {
            let p = Vec2::new(v[0], v[2]);
            min = min.min(p);
            max = max.max(p);
        }

        let mut tree = CellQuadTree::new(min.x, min.y, max.x, max.y, config.spatial_depth)
            .map_err(|e| Error::InvalidMesh(format!("mesh has no area: {}", e)))?;

        let mut cells = Vec::with_capacity(indices.len() / 3);
        for tri in indices.chunks_exact(3) {
            let cell = TriCell::new(verts, tri[0], tri[1], tri[2])?;
            let id = CellId(cells.len());
            if !tree.add(id, &cell) {
                // Only possible for degenerate input.
                log::warn!("{} could not be added to the spatial index", id);
            }
            cells.push(cell);
        }

        let tolerance = Vec2::splat(TOLERANCE_STD);
        for i in 0..cells.len() {
            if cells[i].link_count() == crate::MAX_LINKS {
                continue;
            }
            let id = CellId(i);
            let neighbors = tree.cells_in_column(
                &cells,
                cells[i].bounds_min() - tolerance,
                cells[i].bounds_max() + tolerance,
            );
            for neighbor in neighbors {
                if TriCell::link_cells(&mut cells, id, neighbor, true)?.is_some()
                    && cells[i].link_count() == crate::MAX_LINKS
                {
                    break;
                }
            }
        }

        let mesh = Self {
            cells,
            tree,
            plane_tolerance: config.plane_tolerance.max(f32::EPSILON),
            offset_scale: config.offset_scale.max(0.0),
        };
        log::info!(
            "Built navigation mesh: {} cells, {} links",
            mesh.cells.len(),
            mesh.link_count()
        );
        Ok(mesh)
    }

    /// Builds a mesh from a loaded [`TriMesh`]
    pub fn from_tri_mesh(mesh: &TriMesh, config: &MeshBuildConfig) -> Result<Self> {
        Self::build(&mesh.vertices, &mesh.indices, config)
    }

    /// The cell arena
    pub fn cells(&self) -> &[TriCell] {
        &self.cells
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, id: CellId) -> Result<&TriCell> {
        self.cells.get(id.index()).ok_or(Error::IndexOutOfRange {
            kind: "cell",
            index: id.index(),
            len: self.cells.len(),
        })
    }

    /// Number of links between cells, counting each cross-link once
    pub fn link_count(&self) -> usize {
        self.cells.iter().map(TriCell::link_count).sum::<usize>() / 2
    }

    pub fn quad_tree(&self) -> &CellQuadTree {
        &self.tree
    }

    pub fn plane_tolerance(&self) -> f32 {
        self.plane_tolerance
    }

    pub fn offset_scale(&self) -> f32 {
        self.offset_scale
    }

    /// Finds the cell closest to `p` and the closest point on its surface.
    ///
    /// See [`CellQuadTree::closest_cell`].
    pub fn closest_cell(&self, p: Vec3, must_be_in_column: bool) -> Option<(CellId, Vec3)> {
        self.tree.closest_cell(&self.cells, p, must_be_in_column)
    }

    /// True if `p` is over a cell and within `y_tolerance` of its surface
    pub fn is_valid_position(&self, p: Vec3, y_tolerance: f32) -> bool {
        match self.closest_cell(p, true) {
            Some((_, on_mesh)) => (p.y - on_mesh.y).abs() <= y_tolerance,
            None => false,
        }
    }

    /// Line of sight between two points on this mesh.
    ///
    /// See [`TriNavMesh::has_los_in`].
    pub fn has_los(
        &self,
        start: Vec2,
        end: Vec2,
        start_cell: CellId,
        end_cell: CellId,
    ) -> Result<bool> {
        Self::has_los_in(&self.cells, start, end, start_cell, end_cell, self.offset_scale)
    }

    /// True if the straight xz line from `start` to `end` stays on linked cells.
    ///
    /// `start` must lie in the column of `start_cell` and `end` in the column
    /// of `end_cell`. Points on a vertex are first moved toward the cell's
    /// centroid by `offset_scale`.
    pub fn has_los_in(
        cells: &[TriCell],
        start: Vec2,
        end: Vec2,
        start_cell: CellId,
        end_cell: CellId,
        offset_scale: f32,
    ) -> Result<bool> {
        let lookup = |id: CellId| {
            cells.get(id.index()).ok_or(Error::IndexOutOfRange {
                kind: "cell",
                index: id.index(),
                len: cells.len(),
            })
        };

        let start = lookup(start_cell)?.safe_point(start, offset_scale);
        let end = lookup(end_cell)?.safe_point(end, offset_scale);

        let mut relation = lookup(start_cell)?.path_relationship(start, end);
        // A straight line cannot visit more cells than exist.
        for _ in 0..cells.len() {
            let PathRelation::ExitingCell { next, .. } = relation else {
                break;
            };
            let Some(next) = next else {
                // Hit a wall without a link.
                return Ok(false);
            };
            if next == end_cell {
                return Ok(true);
            }
            relation = lookup(next)?.path_relationship(start, end);
        }

        Ok(relation == PathRelation::EndingCell)
    }

    /// Snaps `p` onto the closest cell, ignoring its height if it is over the mesh.
    pub fn closest_point(&self, p: Vec3) -> Option<Vec3> {
        self.closest_cell(p, false).map(|(_, point)| point)
    }

    /// Cells whose column contains the xz position of `p`
    pub fn cells_at(&self, p: Vec3) -> Vec<CellId> {
        self.tree.cells_for_point(&self.cells, xz(p))
    }
}
