//! Resumable multi-goal uniform cost search over linked cells
//!
//! Used for local path repair: a search from a new start position toward any
//! of the cells of an existing path, bounded by a maximum path size.

use crate::path_node::SearchFrontier;
use crate::{CellId, SearchState, TriCell};
use nav_common::{Error, Result, Vec3};

/// A single-source, multi-goal uninformed search
#[derive(Debug, Default)]
pub struct DijkstraSearch {
    frontier: SearchFrontier,
    state: SearchState,
    path_cells: Vec<Vec<CellId>>,
    select_first: bool,
    start: Vec3,
    goals: Option<Vec<f32>>,
    start_cell: Option<CellId>,
    goal_cells: Vec<CellId>,
    max_search_depth: usize,
}

impl DijkstraSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Number of paths found so far
    pub fn path_count(&self) -> usize {
        self.path_cells.len()
    }

    /// The path found at position `index`, in discovery order.
    ///
    /// Each path runs from the start cell to one of the goal cells.
    pub fn path_cells(&self, index: usize) -> Result<&[CellId]> {
        self.path_cells
            .get(index)
            .map(Vec::as_slice)
            .ok_or(Error::IndexOutOfRange {
                kind: "search path",
                index,
                len: self.path_cells.len(),
            })
    }

    /// The goal points passed to [`DijkstraSearch::initialize`], unmodified
    pub fn goals(&self) -> Option<&[f32]> {
        self.goals.as_deref()
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    pub fn start_cell(&self) -> Option<CellId> {
        self.start_cell
    }

    /// Goal cells not yet reached
    pub fn goal_cells(&self) -> &[CellId] {
        &self.goal_cells
    }

    pub fn max_search_depth(&self) -> usize {
        self.max_search_depth
    }

    /// Prepares a new search, discarding any previous state.
    ///
    /// `goals` optionally holds one (x, y, z) point per goal cell and is only
    /// stored for the caller. `max_search_depth` is the largest number of
    /// cells a path may contain before the goal cell is appended, and is
    /// clamped to at least 1. With `select_first` the search completes as
    /// soon as any goal is reached.
    ///
    /// Returns an error if `goals` does not hold exactly three values per
    /// goal cell.
    pub fn initialize(
        &mut self,
        start: Vec3,
        goals: Option<Vec<f32>>,
        start_cell: CellId,
        goal_cells: Vec<CellId>,
        max_search_depth: usize,
        select_first: bool,
    ) -> Result<SearchState> {
        if let Some(points) = &goals {
            if points.len() != goal_cells.len() * 3 {
                return Err(Error::InvalidArgument(format!(
                    "expected {} goal values for {} goal cells, got {}",
                    goal_cells.len() * 3,
                    goal_cells.len(),
                    points.len()
                )));
            }
        }

        self.reset();
        self.max_search_depth = max_search_depth.max(1);
        self.start = start;
        self.goals = goals;
        self.select_first = select_first;
        self.start_cell = Some(start_cell);
        self.goal_cells = goal_cells;
        self.frontier.push_root(start_cell);
        self.state = SearchState::Initialized;
        Ok(self.state)
    }

    /// Performs a single step of the search against the cell arena.
    pub fn process(&mut self, cells: &[TriCell]) -> SearchState {
        match self.state {
            SearchState::Initialized => self.state = SearchState::Processing,
            SearchState::Processing => {}
            state => return state,
        }

        let Some(current) = self.frontier.pop() else {
            return self.finish();
        };
        let current_id = self.frontier.pool.cell(current);
        let Some(current_cell) = cells.get(current_id.index()) else {
            log::warn!("Dijkstra search reached {} outside the cell arena", current_id);
            return self.finish();
        };

        for (wall, link) in current_cell.links().iter().enumerate() {
            let Some(linked) = *link else {
                continue;
            };
            if self.frontier.is_closed(linked) {
                continue;
            }

            if let Some(goal_index) = self.goal_cells.iter().position(|&g| g == linked) {
                let mut path = self.frontier.pool.load_path(current);
                path.push(linked);
                self.path_cells.push(path);
                if self.select_first || self.goal_cells.len() == 1 {
                    self.frontier.clear();
                    self.state = SearchState::Complete;
                    log::debug!(
                        "Dijkstra search complete: {} path(s) from {:?}",
                        self.path_cells.len(),
                        self.start_cell
                    );
                    return self.state;
                }
                self.goal_cells.remove(goal_index);
            }

            let Some(linked_cell) = cells.get(linked.index()) else {
                continue;
            };
            if linked_cell.link_count() == 1 {
                // Dead end.
                self.frontier.close(linked);
                continue;
            }
            if self.frontier.pool.path_size(current) >= self.max_search_depth {
                continue;
            }

            self.frontier
                .relax(current, current_cell, linked, wall, self.start, || 0.0);
        }

        if self.frontier.is_open_empty() {
            return self.finish();
        }
        self.state
    }

    /// Returns the search to the uninitialized state
    pub fn reset(&mut self) {
        self.frontier.clear();
        self.state = SearchState::Uninitialized;
        self.start = Vec3::ZERO;
        self.goals = None;
        self.start_cell = None;
        self.goal_cells.clear();
        self.path_cells.clear();
        self.select_first = false;
        self.max_search_depth = 0;
    }

    fn finish(&mut self) -> SearchState {
        self.frontier.clear();
        self.state = if self.path_cells.is_empty() {
            SearchState::Failed
        } else {
            SearchState::Complete
        };
        log::debug!(
            "Dijkstra search {}: {} path(s) from {:?}",
            self.state,
            self.path_cells.len(),
            self.start_cell
        );
        self.state
    }
}
