//! Triangle cells, the nodes of the navigation graph
//!
//! A [`TriCell`] is a single walkable triangle. Cells live in an arena
//! (a slice indexed by [`CellId`]) and refer to their neighbors by id, one
//! optional link per wall. Wall `i` runs from vertex `i` to vertex
//! `(i + 1) % 3`.
//!
//! Vertices must wind clockwise when viewed from above (looking down the
//! y-axis). With that winding the interior of the cell lies on the right side
//! of every wall.

use nav_common::{
    line_normal_2d, line_relationship, rect_contains_point, rect_intersects, sloppy_equals_2d,
    sloppy_equals_3d, xz, Error, LineRelation, PointLineRelation, Result, Vec2, Vec3,
    TOLERANCE_STD,
};

/// Number of vertices, walls and links of a cell
pub const MAX_LINKS: usize = 3;

/// Identifier of a cell within its owning arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct CellId(pub usize);

impl CellId {
    /// The arena index of the cell
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell {}", self.0)
    }
}

/// Relationship of a line segment A->B to a cell's column
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathRelation {
    /// The segment does not interact with the cell in a way relevant to traversal
    NoRelationship,
    /// Point B lies inside the column, or on its boundary
    EndingCell,
    /// The segment leaves the column through `wall`
    ExitingCell {
        /// Neighbor across the exit wall, `None` if the wall has no link
        next: Option<CellId>,
        /// Index of the exit wall
        wall: usize,
        /// Where the segment crosses the exit wall (xz)
        intersection: Vec2,
    },
}

#[inline]
fn check_index(kind: &'static str, index: usize) -> Result<usize> {
    if index < MAX_LINKS {
        Ok(index)
    } else {
        Err(Error::IndexOutOfRange {
            kind,
            index,
            len: MAX_LINKS,
        })
    }
}

#[inline]
fn next_vert(index: usize) -> usize {
    if index + 1 >= MAX_LINKS {
        0
    } else {
        index + 1
    }
}

/// A triangular navigation cell
#[derive(Debug, Clone)]
pub struct TriCell {
    verts: [Vec3; MAX_LINKS],
    centroid: Vec3,
    normal: Vec3,
    d: f32,
    bounds_min: Vec2,
    bounds_max: Vec2,
    wall_normals: [Vec2; MAX_LINKS],
    wall_midpoints: [Vec3; MAX_LINKS],
    /// Distance between the midpoints of each pair of walls
    midpoint_distances: [[f32; MAX_LINKS]; MAX_LINKS],
    links: [Option<CellId>; MAX_LINKS],
    link_walls: [Option<usize>; MAX_LINKS],
}

impl TriCell {
    /// Creates a cell from three vertex indices into a flat `[x, y, z, ...]` buffer.
    pub fn new(verts: &[f32], a: usize, b: usize, c: usize) -> Result<Self> {
        let vert_count = verts.len() / 3;
        let fetch = |i: usize| -> Result<Vec3> {
            if i >= vert_count {
                return Err(Error::IndexOutOfRange {
                    kind: "vertex",
                    index: i,
                    len: vert_count,
                });
            }
            let p = i * 3;
            Ok(Vec3::new(verts[p], verts[p + 1], verts[p + 2]))
        };
        Ok(Self::from_vertices(fetch(a)?, fetch(b)?, fetch(c)?))
    }

    /// Creates a cell directly from its three vertices.
    pub fn from_vertices(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let verts = [a, b, c];
        let normal = (b - a).cross(c - a).normalize_or_zero();
        let centroid = (a + b + c) / 3.0;
        let d = -centroid.dot(normal);

        let bounds_min = xz(a).min(xz(b)).min(xz(c));
        let bounds_max = xz(a).max(xz(b)).max(xz(c));

        let mut wall_normals = [Vec2::ZERO; MAX_LINKS];
        let mut wall_midpoints = [Vec3::ZERO; MAX_LINKS];
        for wall in 0..MAX_LINKS {
            let from = verts[wall];
            let to = verts[next_vert(wall)];
            wall_normals[wall] = line_normal_2d(xz(from), xz(to));
            wall_midpoints[wall] = (from + to) / 2.0;
        }

        let mut midpoint_distances = [[0.0; MAX_LINKS]; MAX_LINKS];
        for from in 0..MAX_LINKS {
            for to in (from + 1)..MAX_LINKS {
                let dist = wall_midpoints[from].distance(wall_midpoints[to]);
                midpoint_distances[from][to] = dist;
                midpoint_distances[to][from] = dist;
            }
        }

        Self {
            verts,
            centroid,
            normal,
            d,
            bounds_min,
            bounds_max,
            wall_normals,
            wall_midpoints,
            midpoint_distances,
            links: [None; MAX_LINKS],
            link_walls: [None; MAX_LINKS],
        }
    }

    /// The centroid of the cell
    pub fn centroid(&self) -> Vec3 {
        self.centroid
    }

    /// The unit normal of the cell's plane
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// The `d` constant of the plane equation `n · p + d = 0`
    pub fn d(&self) -> f32 {
        self.d
    }

    /// Minimum (x, z) of the cell's column
    pub fn bounds_min(&self) -> Vec2 {
        self.bounds_min
    }

    /// Maximum (x, z) of the cell's column
    pub fn bounds_max(&self) -> Vec2 {
        self.bounds_max
    }

    /// The three vertices of the cell
    pub fn vertices(&self) -> &[Vec3; MAX_LINKS] {
        &self.verts
    }

    /// The links of the cell, indexed by wall
    pub fn links(&self) -> &[Option<CellId>; MAX_LINKS] {
        &self.links
    }

    /// Maximum number of links the cell supports
    pub const fn max_links(&self) -> usize {
        MAX_LINKS
    }

    /// Number of walls that are linked to a neighbor
    pub fn link_count(&self) -> usize {
        self.links.iter().filter(|l| l.is_some()).count()
    }

    /// Gets the vertex at `index`.
    pub fn vertex(&self, index: usize) -> Result<Vec3> {
        Ok(self.verts[check_index("vertex", index)?])
    }

    /// Gets a single component (0 = x, 1 = y, 2 = z) of the vertex at `index`.
    pub fn vertex_value(&self, index: usize, axis: usize) -> Result<f32> {
        let v = self.verts[check_index("vertex", index)?];
        match axis {
            0 => Ok(v.x),
            1 => Ok(v.y),
            2 => Ok(v.z),
            _ => Err(Error::IndexOutOfRange {
                kind: "axis",
                index: axis,
                len: 3,
            }),
        }
    }

    /// Index of the vertex within `tolerance` of `p`, if any.
    pub fn vertex_index(&self, p: Vec3, tolerance: f32) -> Option<usize> {
        self.verts
            .iter()
            .position(|&v| sloppy_equals_3d(v, p, tolerance))
    }

    /// Index of the vertex within `tolerance` of `p` on the XZ plane, if any.
    pub fn vertex_index_2d(&self, p: Vec2, tolerance: f32) -> Option<usize> {
        self.verts
            .iter()
            .position(|&v| sloppy_equals_2d(xz(v), p, tolerance))
    }

    /// The neighbor linked across `wall`.
    pub fn link(&self, wall: usize) -> Result<Option<CellId>> {
        Ok(self.links[check_index("wall", wall)?])
    }

    /// The wall of the neighbor across `wall` that links back to this cell.
    pub fn link_wall(&self, wall: usize) -> Result<Option<usize>> {
        Ok(self.link_walls[check_index("wall", wall)?])
    }

    /// The wall index linking to `cell`, or `None` if it is not a neighbor.
    pub fn link_index(&self, cell: CellId) -> Option<usize> {
        self.links.iter().position(|&l| l == Some(cell))
    }

    /// Vertex at the start of `wall`
    pub fn wall_left_vertex(&self, wall: usize) -> Result<Vec3> {
        Ok(self.verts[check_index("wall", wall)?])
    }

    /// Vertex at the end of `wall`
    pub fn wall_right_vertex(&self, wall: usize) -> Result<Vec3> {
        Ok(self.verts[next_vert(check_index("wall", wall)?)])
    }

    /// Links cell `from` to cell `to` across their shared wall.
    ///
    /// The shared wall is found by exact vertex matching; the two cells must
    /// share the edge with opposite direction (consistent winding). When
    /// `cross_link` is true the reverse link is created as well.
    ///
    /// Returns the wall index on `from`, or `None` if the cells share no wall
    /// or the required wall is already linked.
    pub fn link_cells(
        cells: &mut [TriCell],
        from: CellId,
        to: CellId,
        cross_link: bool,
    ) -> Result<Option<usize>> {
        let len = cells.len();
        for id in [from, to] {
            if id.0 >= len {
                return Err(Error::IndexOutOfRange {
                    kind: "cell",
                    index: id.0,
                    len,
                });
            }
        }
        if from == to {
            return Ok(None);
        }

        let (this, other) = if from.0 < to.0 {
            let (left, right) = cells.split_at_mut(to.0);
            (&mut left[from.0], &mut right[0])
        } else {
            let (left, right) = cells.split_at_mut(from.0);
            (&mut right[0], &mut left[to.0])
        };

        let Some((wall, other_wall)) = this.shared_wall(other) else {
            return Ok(None);
        };

        if this.links[wall].is_some() {
            return Ok(None);
        }
        if cross_link && other.links[other_wall].is_some() {
            return Ok(None);
        }

        this.links[wall] = Some(to);
        this.link_walls[wall] = Some(other_wall);
        if cross_link {
            other.links[other_wall] = Some(from);
            other.link_walls[other_wall] = Some(wall);
        }

        Ok(Some(wall))
    }

    /// Finds the wall shared with `other` as (this wall, other wall).
    fn shared_wall(&self, other: &TriCell) -> Option<(usize, usize)> {
        // Walls are visited C->A, A->B, B->C.
        let order = [2usize, 0, 1];
        for &wall in &order {
            let v = self.verts[wall];
            let v_next = self.verts[next_vert(wall)];
            for &other_wall in &order {
                let o = other.verts[other_wall];
                let o_next = other.verts[next_vert(other_wall)];
                if v == o_next && v_next == o {
                    return Some((wall, other_wall));
                }
            }
        }
        None
    }

    fn signed_distance(&self, wall: usize, p: Vec2) -> f32 {
        self.wall_normals[wall].dot(p - xz(self.verts[wall]))
    }

    fn wall_relation(&self, wall: usize, p: Vec2) -> PointLineRelation {
        PointLineRelation::from_signed_distance(self.signed_distance(wall, p), TOLERANCE_STD)
    }

    /// Perpendicular distance from `p` to the line through `wall`.
    pub fn wall_distance(&self, p: Vec2, wall: usize) -> Result<f32> {
        Ok(self.signed_distance(check_index("wall", wall)?, p).abs())
    }

    /// Distance between the midpoints of two walls.
    pub fn link_point_distance(&self, from_wall: usize, to_wall: usize) -> Result<f32> {
        Ok(self.midpoint_distances[check_index("wall", from_wall)?][check_index("wall", to_wall)?])
    }

    /// Squared distance from `p` to the midpoint of `wall`.
    pub fn link_point_distance_sq(&self, p: Vec3, wall: usize) -> Result<f32> {
        Ok(p.distance_squared(self.wall_midpoints[check_index("wall", wall)?]))
    }

    /// Squared distance from `p` to the midpoint of `wall` on the XZ plane.
    pub fn link_point_distance_sq_2d(&self, p: Vec2, wall: usize) -> Result<f32> {
        Ok(p.distance_squared(xz(self.wall_midpoints[check_index("wall", wall)?])))
    }

    /// Midpoint of `wall`
    pub fn wall_midpoint(&self, wall: usize) -> Result<Vec3> {
        Ok(self.wall_midpoints[check_index("wall", wall)?])
    }

    /// Midpoint-to-midpoint distance for walls already known to be valid.
    pub(crate) fn midpoint_distance(&self, from_wall: usize, to_wall: usize) -> f32 {
        self.midpoint_distances[from_wall][to_wall]
    }

    /// Squared distance to a wall midpoint for a wall already known to be valid.
    pub(crate) fn midpoint_distance_sq(&self, p: Vec3, wall: usize) -> f32 {
        p.distance_squared(self.wall_midpoints[wall])
    }

    /// Height of the cell's plane at (x, z).
    ///
    /// Defined everywhere, including outside the cell's column. Returns zero
    /// for vertical cells.
    pub fn plane_y(&self, x: f32, z: f32) -> f32 {
        if self.normal.y != 0.0 {
            -((self.normal.x * x) + (self.normal.z * z) + self.d) / self.normal.y
        } else {
            0.0
        }
    }

    /// True if any part of the cell's column overlaps the rectangle.
    pub fn intersects(&self, min: Vec2, max: Vec2) -> bool {
        if !rect_intersects(min, max, self.bounds_min, self.bounds_max) {
            return false;
        }

        if self
            .verts
            .iter()
            .any(|&v| rect_contains_point(min, max, xz(v)))
        {
            return true;
        }

        // Separating axis test against each wall normal.
        let center = (min + max) / 2.0;
        let half = min - center;
        let rel = [
            xz(self.verts[0]) - center,
            xz(self.verts[1]) - center,
            xz(self.verts[2]) - center,
        ];
        // Each wall is tested with its own start vertex and the opposite vertex.
        let pairs = [(0usize, 2usize), (1, 0), (2, 1)];

        for (wall, &(on_wall, opposite)) in pairs.iter().enumerate() {
            let n = self.wall_normals[wall];
            let p_wall = rel[on_wall].dot(n);
            let p_opposite = rel[opposite].dot(n);
            let box_extent = (half.x * n.x).abs() + (half.y * n.y).abs();
            if p_wall.min(p_opposite) > box_extent || p_wall.max(p_opposite) < -box_extent {
                return false;
            }
        }

        true
    }

    /// True if `p` lies within the cell's column (boundary inclusive).
    pub fn is_in_column(&self, p: Vec2) -> bool {
        (0..MAX_LINKS).all(|wall| self.wall_relation(wall, p) != PointLineRelation::LeftSide)
    }

    /// Snaps a point outside the column to a location just inside it.
    ///
    /// Points in the column are returned unchanged. Otherwise the point is
    /// moved to where the segment from the centroid crosses the boundary, then
    /// pulled back toward the centroid by `offset_scale` of that distance.
    pub fn force_to_column(&self, p: Vec2, offset_scale: f32) -> Vec2 {
        let centroid = xz(self.centroid);
        match self.path_relationship(centroid, p) {
            PathRelation::ExitingCell { intersection, .. } => {
                centroid + (intersection - centroid) * (1.0 - offset_scale)
            }
            PathRelation::NoRelationship => centroid,
            PathRelation::EndingCell => p,
        }
    }

    /// Nudges a point off any vertex it sits on, toward the centroid.
    pub fn safe_point(&self, p: Vec2, offset_scale: f32) -> Vec2 {
        let centroid = xz(self.centroid);
        let mut result = p;
        for &v in &self.verts {
            let v = xz(v);
            if sloppy_equals_2d(p, v, TOLERANCE_STD) {
                result += (centroid - v) * offset_scale;
            }
        }
        result
    }

    /// Classifies the segment `a -> b` relative to this cell.
    ///
    /// When the segment passes through a shared vertex the wall reported is
    /// the first wall, in index order, whose crossing test succeeds.
    pub fn path_relationship(&self, a: Vec2, b: Vec2) -> PathRelation {
        let mut interior_count = 0;
        for wall in 0..MAX_LINKS {
            if self.wall_relation(wall, b) != PointLineRelation::LeftSide {
                interior_count += 1;
                continue;
            }
            if self.wall_relation(wall, a) == PointLineRelation::LeftSide {
                continue;
            }

            let wall_start = xz(self.verts[wall]);
            let wall_end = xz(self.verts[next_vert(wall)]);
            let crossing = match line_relationship(a, b, wall_start, wall_end) {
                LineRelation::SegmentsIntersect(p) | LineRelation::ALineCrossesBSeg(p) => Some(p),
                // Floating point error can push a vertex crossing just off the wall.
                LineRelation::BLineCrossesASeg(p) | LineRelation::LinesIntersect(p)
                    if sloppy_equals_2d(p, wall_start, TOLERANCE_STD)
                        || sloppy_equals_2d(p, wall_end, TOLERANCE_STD) =>
                {
                    Some(p)
                }
                _ => None,
            };

            if let Some(intersection) = crossing {
                return PathRelation::ExitingCell {
                    next: self.links[wall],
                    wall,
                    intersection,
                };
            }
        }

        if interior_count == MAX_LINKS {
            PathRelation::EndingCell
        } else {
            PathRelation::NoRelationship
        }
    }

    /// Finds the cell closest to `p` and the closest point on its surface.
    ///
    /// For a point within a cell's column the distance is vertical. For a
    /// point outside, it is measured to where the segment from the cell's
    /// centroid toward the point leaves the column.
    pub fn closest_cell<'a, I>(p: Vec3, cells: I) -> Option<(CellId, Vec3)>
    where
        I: IntoIterator<Item = (CellId, &'a TriCell)>,
    {
        let target = xz(p);
        let mut min_distance_sq = f32::MAX;
        let mut selected = None;

        for (id, cell) in cells {
            let (distance_sq, point) = match cell.path_relationship(xz(cell.centroid), target) {
                PathRelation::ExitingCell { intersection, .. } => {
                    let on_cell = Vec3::new(
                        intersection.x,
                        cell.plane_y(intersection.x, intersection.y),
                        intersection.y,
                    );
                    (on_cell.distance_squared(p), on_cell)
                }
                _ => {
                    let cell_y = cell.plane_y(p.x, p.z);
                    ((p.y - cell_y) * (p.y - cell_y), Vec3::new(p.x, cell_y, p.z))
                }
            };
            if distance_sq < min_distance_sq {
                min_distance_sq = distance_sq;
                selected = Some((id, point));
            }
        }

        selected
    }
}
