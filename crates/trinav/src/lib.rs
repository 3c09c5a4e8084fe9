//! Triangle-cell navigation graph and path planning
//!
//! This crate builds a navigation graph from a triangle mesh and finds paths
//! through it. Each triangle becomes a [`TriCell`] linked to the neighbors it
//! shares walls with. Searches run incrementally so their cost can be spread
//! over many frames.
//!
//! # Features
//!
//! - **Mesh building**: [`TriNavMesh`] links cells and indexes them in a
//!   [`CellQuadTree`]
//! - **Search**: resumable single-goal [`AStarSearch`] and multi-goal
//!   [`DijkstraSearch`]
//! - **Paths**: shared [`MasterPath`] corridors with funnel-based waypoint
//!   generation through [`Path`]
//! - **Planning**: a frame-sliced [`MasterPlanner`] with path caching and
//!   local repair, queried through [`NavRequest`] handles
//!
//! # Example
//!
//! ```rust,ignore
//! use trinav::{MasterPlanner, MeshBuildConfig, NavRequestState, PlannerConfig, TriNavMesh};
//!
//! let mesh = TriNavMesh::build(&verts, &indices, &MeshBuildConfig::default())?;
//! let mut planner = MasterPlanner::new(mesh, PlannerConfig::default());
//!
//! let request = planner.path_planner().get_path(start, goal);
//! while !request.is_finished() {
//!     planner.process(true);
//! }
//! if request.state() == NavRequestState::Complete {
//!     let path = request.data().unwrap();
//!     let next = path.target(start);
//! }
//! ```
//!
//! The planner and its handles use shared ownership without locking and are
//! meant to be driven from a single thread.

mod astar_search;
mod cell_quad_tree;
mod config;
mod dijkstra_search;
mod distance_heuristic;
mod master_path;
mod master_planner;
mod nav_request;
mod path_node;
mod status;
mod tri_cell;
mod tri_nav_mesh;

pub use astar_search::AStarSearch;
pub use cell_quad_tree::CellQuadTree;
pub use config::{MeshBuildConfig, PlannerConfig, TriNavConfig, MAX_TIMESLICE};
pub use dijkstra_search::DijkstraSearch;
pub use distance_heuristic::{longest_axis, manhattan, DistanceHeuristic};
pub use master_path::{MasterPath, Path, MAX_OFFSET_FACTOR};
pub use master_planner::{MasterPlanner, PathPlanner};
pub use nav_request::{MasterNavRequest, NavRequest};
pub use status::{NavRequestState, SearchState};
pub use tri_cell::{CellId, PathRelation, TriCell, MAX_LINKS};
pub use tri_nav_mesh::TriNavMesh;

pub use nav_common::{Error, Result, Vec2, Vec3};

#[cfg(test)]
mod test_mesh_helpers;

#[cfg(test)]
mod astar_search_tests;
