//! Test mesh fixtures
//!
//! The corridor mesh is a set of connected corridors that covers nearly every
//! traversal edge case: dead ends, single-link cells, three-way junctions and
//! unlinked walls. It has no overlapping cells and no large open areas.

use crate::{CellId, TriCell};
use nav_common::{Vec2, Vec3};

/// Number of cells in the corridor mesh
pub const POLY_COUNT: usize = 27;

/// Offset scale used by the corridor mesh tests
pub const OFFSET: f32 = 0.1;

/// Plane tolerance for the corridor mesh (it has no overlapping cells)
pub const PLANE_TOLERANCE: f32 = 0.5;

/// Sentinel used in the fixture tables for "no link"
const NONE: i32 = -1;

/// The minimum vertex of the mesh and the cells that share it
pub const MIN_VERTEX: [f32; 3] = [-5.0, 0.7, -3.0];
pub const MIN_VERTEX_POLYS: [usize; 3] = [11, 12, 13];

pub fn corridor_verts() -> Vec<f32> {
    vec![
        5.0, 0.5, -3.0, // 0
        -5.0, 1.0, 4.0,
        3.0, 0.5, 4.0,
        4.0, -1.0, 4.0,
        5.0, -1.0, 4.0,
        -4.0, 1.0, 3.0, // 5
        0.0, 0.5, 3.0,
        3.0, 0.5, 3.0,
        -1.0, 0.5, 2.0,
        4.0, -0.5, 2.0,
        -4.0, 1.0, 1.0, // 10
        -2.0, 1.5, 1.0,
        1.0, 0.5, 1.0,
        3.0, 0.0, 1.0,
        -3.0, 1.5, 0.0,
        -1.0, 0.3, 0.0, // 15
        1.0, 0.5, 0.0,
        3.0, 0.0, 0.0,
        -3.0, 0.5, -1.0,
        0.0, 0.5, -1.0,
        3.0, 0.0, -1.0, // 20
        5.0, -1.0, -1.0,
        -4.0, 0.7, -2.0,
        2.0, 0.4, -2.0,
        -5.0, 0.7, -3.0,
        1.0, 0.5, -3.0, // 25
        2.0, 0.5, -3.0, // 26
    ]
}

pub fn corridor_indices() -> Vec<usize> {
    vec![
        1, 6, 5, // 0
        1, 2, 6,
        6, 2, 7,
        6, 7, 12,
        6, 12, 8,
        8, 12, 15, // 5
        12, 16, 15,
        15, 16, 19,
        19, 16, 25,
        19, 25, 18,
        18, 25, 22, // 10
        22, 25, 24,
        10, 22, 24,
        1, 10, 24,
        1, 5, 10,
        5, 11, 10, // 15
        10, 11, 14,
        12, 13, 16,
        13, 17, 16,
        3, 4, 9,
        9, 4, 21, // 20
        13, 9, 17,
        17, 9, 21,
        17, 21, 20,
        20, 21, 0,
        20, 0, 26, // 25
        23, 20, 26, // 26
    ]
}

pub fn corridor_link_counts() -> [usize; POLY_COUNT] {
    [
        2, 2, 2, 2, 2, //
        2, 3, 2, 2, 2, //
        2, 2, 2, 2, 3, //
        2, 1, 2, 2, 1, //
        2, 2, 3, 2, 2, //
        2, 1,
    ]
}

/// Per cell and wall, the wall of the neighbor that links back
fn corridor_link_walls_raw() -> [i32; POLY_COUNT * 3] {
    [
        2, NONE, 0, // 0
        NONE, 0, 0,
        1, NONE, 0,
        2, NONE, 0,
        2, 0, NONE,
        1, 2, NONE, // 5
        2, 0, 1,
        1, 0, NONE,
        1, NONE, 0,
        2, 0, NONE,
        1, 0, NONE, // 10
        1, NONE, 1,
        NONE, 2, 1,
        2, 2, NONE,
        2, 2, 0,
        NONE, 0, 1, // 15
        1, NONE, NONE,
        NONE, 2, 0,
        2, NONE, 1,
        NONE, 0, NONE,
        1, NONE, 1, // 20
        NONE, 0, 0,
        1, 2, 0,
        2, 0, NONE,
        1, NONE, 0,
        2, NONE, 1, // 25
        NONE, 2, NONE, // 26
    ]
}

/// Per cell and wall, the linked neighbor cell
fn corridor_link_polys_raw() -> [i32; POLY_COUNT * 3] {
    [
        1, NONE, 14, // 0
        NONE, 2, 0,
        1, NONE, 3,
        2, NONE, 4,
        3, 5, NONE,
        4, 6, NONE, // 5
        17, 7, 5,
        6, 8, NONE,
        7, NONE, 9,
        8, 10, NONE,
        9, 11, NONE, // 10
        10, NONE, 12,
        NONE, 11, 13,
        14, 12, NONE,
        0, 15, 13,
        NONE, 16, 14, // 15
        15, NONE, NONE,
        NONE, 18, 6,
        21, NONE, 17,
        NONE, 20, NONE,
        19, NONE, 22, // 20
        NONE, 22, 18,
        21, 20, 23,
        22, 24, NONE,
        23, NONE, 25,
        24, NONE, 26, // 25
        NONE, 25, NONE, // 26
    ]
}

fn to_option(value: i32) -> Option<usize> {
    usize::try_from(value).ok()
}

/// Expected linked wall for `cell` at `wall`
pub fn expected_link_wall(cell: usize, wall: usize) -> Option<usize> {
    to_option(corridor_link_walls_raw()[cell * 3 + wall])
}

/// Expected linked neighbor for `cell` at `wall`
pub fn expected_link(cell: usize, wall: usize) -> Option<CellId> {
    to_option(corridor_link_polys_raw()[cell * 3 + wall]).map(CellId)
}

/// A single-goal test path: start point, goal point and expected cells
#[derive(Debug)]
pub struct TestPath {
    pub start: Vec3,
    pub goal: Vec3,
    pub cells: Vec<usize>,
}

/// Number of single-goal test paths.
///
/// Search for the start and goal cells by column; the points are not
/// guaranteed to resolve to the expected cells otherwise.
pub const PATH_COUNT: usize = 4;

pub fn corridor_path(index: usize) -> TestPath {
    let (start, goal, cells): ([f32; 3], [f32; 3], Vec<usize>) = match index {
        0 => (
            [2.4, 0.4, -1.8],
            [0.8, 0.5, -2.0],
            vec![26, 25, 24, 23, 22, 21, 18, 17, 6, 7, 8],
        ),
        1 => (
            [4.2, -0.75, 3.2],
            [1.2, 0.5, 3.2],
            vec![19, 20, 22, 21, 18, 17, 6, 5, 4, 3, 2],
        ),
        2 => (
            [-2.6, 1.5, 0.8],
            [-1.4, 0.5, -1.2],
            vec![16, 15, 14, 13, 12, 11, 10, 9],
        ),
        _ => (
            [4.8, -0.5, 2.4],
            [-4.2, 0.7, -1.4],
            vec![20, 22, 21, 18, 17, 6, 7, 8, 9, 10, 11, 12],
        ),
    };
    TestPath {
        start: Vec3::from_array(start),
        goal: Vec3::from_array(goal),
        cells,
    }
}

/// Number of multi-goal test paths
pub const MULTI_PATH_COUNT: usize = 4;

/// Index of the shortest multi-goal path
pub const SHORTEST_MULTI_PATH: usize = 3;

pub fn multi_path_start() -> Vec3 {
    Vec3::new(-2.6, 1.5, 0.8)
}

pub fn multi_path_goal_point(index: usize) -> Vec3 {
    match index {
        0 => Vec3::new(0.8, 0.5, -2.0),
        1 => Vec3::new(1.2, 0.5, 3.2),
        2 => Vec3::new(-1.4, 0.5, -1.2),
        _ => Vec3::new(-4.2, 0.7, -1.4),
    }
}

pub fn multi_path_cells(index: usize) -> Vec<usize> {
    match index {
        0 => vec![16, 15, 14, 13, 12, 11, 10, 9, 8],
        1 => vec![16, 15, 14, 0, 1, 2],
        2 => vec![16, 15, 14, 13, 12, 11, 10, 9],
        _ => vec![16, 15, 14, 13, 12],
    }
}

/// A line-of-sight case: start (xz), end (xz), start cell, end cell
#[derive(Debug)]
pub struct LosCase {
    pub start: Vec2,
    pub end: Vec2,
    pub start_cell: usize,
    pub end_cell: usize,
}

fn los_cases(points: &[f32], polys: &[usize]) -> Vec<LosCase> {
    points
        .chunks_exact(4)
        .zip(polys.chunks_exact(2))
        .map(|(p, c)| LosCase {
            start: Vec2::new(p[0], p[1]),
            end: Vec2::new(p[2], p[3]),
            start_cell: c[0],
            end_cell: c[1],
        })
        .collect()
}

/// Cases where line of sight exists
pub fn los_true_cases() -> Vec<LosCase> {
    los_cases(
        &[
            -4.4, 3.6, -3.0, 0.0, // end is a vertex
            0.2, -1.0, -1.4, -2.8, //
            0.0, 0.0, 1.0, -1.0, // start and end on a wall
            3.4, 0.2, -0.2, 1.2, //
            0.0, 3.0, 1.0, 0.0, // start and end on a vertex
        ],
        &[0, 16, 8, 11, 6, 8, 22, 5, 4, 6],
    )
}

/// Cases where line of sight is blocked
pub fn los_false_cases() -> Vec<LosCase> {
    los_cases(
        &[
            -3.8, 2.4, -1.4, 3.6, //
            -5.0, 2.2, 0.0, 0.0, // edge of mesh to a wall
            -2.6, 0.6, 3.6, 0.8, //
            -0.2, 2.4, 2.8, -2.6, //
            0.0, 3.0, 3.0, 0.0, // start and end on a vertex
        ],
        &[15, 1, 13, 7, 16, 22, 4, 25, 3, 18],
    )
}

/// Creates every cell of the mesh without links
pub fn unlinked_cells(verts: &[f32], indices: &[usize]) -> Vec<TriCell> {
    indices
        .chunks_exact(3)
        .map(|tri| TriCell::new(verts, tri[0], tri[1], tri[2]).unwrap())
        .collect()
}

/// Cross-links every pair of cells that share a wall
pub fn link_all_cells(cells: &mut [TriCell]) {
    for i in 0..cells.len() {
        for j in (i + 1)..cells.len() {
            TriCell::link_cells(cells, CellId(i), CellId(j), true).unwrap();
        }
    }
}

/// The fully linked corridor mesh cells
pub fn corridor_cells() -> Vec<TriCell> {
    let mut cells = unlinked_cells(&corridor_verts(), &corridor_indices());
    link_all_cells(&mut cells);
    cells
}

/// Converts raw indices to cell ids
pub fn ids(indices: &[usize]) -> Vec<CellId> {
    indices.iter().copied().map(CellId).collect()
}

/// Cell whose column contains `p`, closest to it vertically
pub fn column_cell(cells: &[TriCell], p: Vec3) -> Option<CellId> {
    let target = Vec2::new(p.x, p.z);
    cells
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_in_column(target))
        .min_by(|(_, a), (_, b)| {
            let da = (a.plane_y(p.x, p.z) - p.y).abs();
            let db = (b.plane_y(p.x, p.z) - p.y).abs();
            da.total_cmp(&db)
        })
        .map(|(i, _)| CellId(i))
}
