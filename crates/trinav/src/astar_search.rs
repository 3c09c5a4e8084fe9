//! Resumable single-goal A* search over linked cells
//!
//! The search is a reusable state machine: [`AStarSearch::initialize`] sets
//! up a query and each call to [`AStarSearch::process`] expands one node. The
//! cost between cells is the distance between the midpoints of the walls used
//! to enter and exit each cell, with the start point standing in for the
//! entry wall of the first cell.

use std::rc::Rc;

use crate::path_node::SearchFrontier;
use crate::{CellId, DistanceHeuristic, MasterPath, SearchState, TriCell};
use nav_common::Vec3;

/// A single-source, single-goal informed search
#[derive(Debug)]
pub struct AStarSearch {
    heuristic: DistanceHeuristic,
    frontier: SearchFrontier,
    state: SearchState,
    path_cells: Option<Vec<CellId>>,
    start: Vec3,
    goal: Vec3,
    start_cell: Option<CellId>,
    goal_cell: Option<CellId>,
}

impl AStarSearch {
    /// Creates an uninitialized search using `heuristic` for its estimates
    pub fn new(heuristic: DistanceHeuristic) -> Self {
        Self {
            heuristic,
            frontier: SearchFrontier::new(),
            state: SearchState::Uninitialized,
            path_cells: None,
            start: Vec3::ZERO,
            goal: Vec3::ZERO,
            start_cell: None,
            goal_cell: None,
        }
    }

    pub fn heuristic(&self) -> DistanceHeuristic {
        self.heuristic
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// True while the search is initialized or processing
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    pub fn goal(&self) -> Vec3 {
        self.goal
    }

    pub fn start_cell(&self) -> Option<CellId> {
        self.start_cell
    }

    pub fn goal_cell(&self) -> Option<CellId> {
        self.goal_cell
    }

    /// The found path, start to goal inclusive. Only available once complete.
    pub fn path_cells(&self) -> Option<&[CellId]> {
        match self.state {
            SearchState::Complete => self.path_cells.as_deref(),
            _ => None,
        }
    }

    /// Prepares a new search, discarding any previous state.
    ///
    /// `start` and `goal` are expected to lie within the columns of
    /// `start_cell` and `goal_cell`.
    pub fn initialize(
        &mut self,
        start: Vec3,
        goal: Vec3,
        start_cell: CellId,
        goal_cell: CellId,
    ) -> SearchState {
        self.reset();
        self.start = start;
        self.goal = goal;
        self.start_cell = Some(start_cell);
        self.goal_cell = Some(goal_cell);
        self.frontier.push_root(start_cell);
        self.state = SearchState::Initialized;
        self.state
    }

    /// Finds an existing path with the same start and goal cells as this search.
    ///
    /// Returns `None` if the search is not active.
    pub fn evaluate<'a, I>(&self, paths: I) -> Option<&'a Rc<MasterPath>>
    where
        I: IntoIterator<Item = &'a Rc<MasterPath>>,
    {
        if !self.is_active() {
            return None;
        }
        let (start_cell, goal_cell) = (self.start_cell?, self.goal_cell?);
        paths
            .into_iter()
            .find(|path| path.start_cell() == start_cell && path.goal_cell() == goal_cell)
    }

    /// Performs a single step of the search against the cell arena.
    pub fn process(&mut self, cells: &[TriCell]) -> SearchState {
        if self.state == SearchState::Initialized {
            self.state = SearchState::Processing;
            if let (Some(start), true) = (self.start_cell, self.start_cell == self.goal_cell) {
                self.complete(vec![start]);
            }
        }
        if self.state != SearchState::Processing {
            return self.state;
        }

        let Some(current) = self.frontier.pop() else {
            return self.fail();
        };
        let current_id = self.frontier.pool.cell(current);
        if Some(current_id) == self.goal_cell {
            let path = self.frontier.pool.load_path(current);
            self.complete(path);
            return self.state;
        }
        let Some(current_cell) = cells.get(current_id.index()) else {
            log::warn!("A* search reached {} outside the cell arena", current_id);
            return self.fail();
        };

        for (wall, link) in current_cell.links().iter().enumerate() {
            let Some(linked) = *link else {
                continue;
            };
            if self.frontier.is_closed(linked) {
                continue;
            }
            let Some(linked_cell) = cells.get(linked.index()) else {
                continue;
            };

            // Dead ends only matter if they are the goal.
            if linked_cell.link_count() == 1 {
                if Some(linked) == self.goal_cell {
                    let mut path = self.frontier.pool.load_path(current);
                    path.push(linked);
                    self.complete(path);
                    return self.state;
                }
                continue;
            }

            let (heuristic, centroid, goal) = (self.heuristic, linked_cell.centroid(), self.goal);
            self.frontier.relax(current, current_cell, linked, wall, self.start, || {
                heuristic.value(centroid, goal)
            });
        }

        if self.frontier.is_open_empty() {
            return self.fail();
        }
        self.state
    }

    /// Returns the search to the uninitialized state
    pub fn reset(&mut self) {
        self.frontier.clear();
        self.state = SearchState::Uninitialized;
        self.start = Vec3::ZERO;
        self.goal = Vec3::ZERO;
        self.start_cell = None;
        self.goal_cell = None;
        self.path_cells = None;
    }

    fn complete(&mut self, path: Vec<CellId>) {
        log::debug!(
            "A* search complete: {} cells from {:?} to {:?}",
            path.len(),
            self.start_cell,
            self.goal_cell
        );
        self.path_cells = Some(path);
        self.frontier.clear();
        self.state = SearchState::Complete;
    }

    fn fail(&mut self) -> SearchState {
        log::debug!(
            "A* search failed: no path from {:?} to {:?}",
            self.start_cell,
            self.goal_cell
        );
        self.frontier.clear();
        self.state = SearchState::Failed;
        self.state
    }
}
