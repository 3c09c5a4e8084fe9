//! A* search tests against the corridor mesh
//!
//! Covers the expected paths, failure on disconnected goals, reuse of a
//! single search instance and matching against cached paths.

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::test_mesh_helpers::*;
    use crate::{AStarSearch, CellId, DistanceHeuristic, MasterPath, SearchState, TriCell, Vec3};

    /// Processes until the search leaves the processing state.
    fn run(search: &mut AStarSearch, cells: &[TriCell]) -> SearchState {
        // Each step closes one cell, so the bound is never reached.
        for _ in 0..=cells.len() {
            if !search.is_active() {
                break;
            }
            search.process(cells);
        }
        search.state()
    }

    fn initialize_path(search: &mut AStarSearch, cells: &[TriCell], path: &TestPath) {
        let start_cell = column_cell(cells, path.start).unwrap();
        let goal_cell = column_cell(cells, path.goal).unwrap();
        assert_eq!(start_cell, CellId(path.cells[0]));
        assert_eq!(goal_cell, CellId(*path.cells.last().unwrap()));
        assert_eq!(
            search.initialize(path.start, path.goal, start_cell, goal_cell),
            SearchState::Initialized
        );
    }

    #[test]
    fn test_corridor_paths() {
        let cells = corridor_cells();
        for heuristic in [DistanceHeuristic::LongestAxis, DistanceHeuristic::Manhattan] {
            // One instance for every path.
            let mut search = AStarSearch::new(heuristic);
            assert_eq!(search.heuristic(), heuristic);
            for i in 0..PATH_COUNT {
                let path = corridor_path(i);
                initialize_path(&mut search, &cells, &path);
                assert!(search.is_active());
                assert!(search.path_cells().is_none());

                assert_eq!(run(&mut search, &cells), SearchState::Complete, "path {}", i);
                assert_eq!(search.path_cells(), Some(ids(&path.cells).as_slice()), "path {}", i);
                assert_eq!(search.start(), path.start);
                assert_eq!(search.goal(), path.goal);
            }
        }
    }

    #[test]
    fn test_processing_is_incremental() {
        let cells = corridor_cells();
        let path = corridor_path(3);
        let mut search = AStarSearch::new(DistanceHeuristic::default());
        initialize_path(&mut search, &cells, &path);

        assert_eq!(search.process(&cells), SearchState::Processing);
        assert!(search.path_cells().is_none());
        assert_eq!(run(&mut search, &cells), SearchState::Complete);

        // Finished searches ignore further processing.
        assert_eq!(search.process(&cells), SearchState::Complete);
        assert_eq!(search.path_cells().unwrap().len(), path.cells.len());
    }

    #[test]
    fn test_disconnected_goal_fails() {
        let mut cells = corridor_cells();
        cells.push(TriCell::from_vertices(
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(10.0, 0.0, 11.0),
            Vec3::new(11.0, 0.0, 10.0),
        ));
        let isolated = CellId(cells.len() - 1);
        let path = corridor_path(0);
        let start_cell = CellId(path.cells[0]);

        let mut search = AStarSearch::new(DistanceHeuristic::LongestAxis);
        search.initialize(path.start, cells[isolated.index()].centroid(), start_cell, isolated);
        assert_eq!(run(&mut search, &cells), SearchState::Failed);
        assert!(search.path_cells().is_none());

        // Starting on the isolated cell fails as well.
        search.initialize(cells[isolated.index()].centroid(), path.goal, isolated, start_cell);
        assert_eq!(run(&mut search, &cells), SearchState::Failed);
        assert!(search.path_cells().is_none());
    }

    #[test]
    fn test_start_cell_is_goal_cell() {
        let cells = corridor_cells();
        let cell = CellId(6);
        let centroid = cells[cell.index()].centroid();

        let mut search = AStarSearch::new(DistanceHeuristic::LongestAxis);
        search.initialize(centroid, centroid, cell, cell);
        assert_eq!(search.process(&cells), SearchState::Complete);
        assert_eq!(search.path_cells(), Some([cell].as_slice()));
    }

    #[test]
    fn test_reset() {
        let cells = corridor_cells();
        let path = corridor_path(1);
        let mut search = AStarSearch::new(DistanceHeuristic::LongestAxis);
        initialize_path(&mut search, &cells, &path);
        run(&mut search, &cells);

        for _ in 0..2 {
            search.reset();
            assert_eq!(search.state(), SearchState::Uninitialized);
            assert!(!search.is_active());
            assert!(search.path_cells().is_none());
            assert_eq!(search.start_cell(), None);
            assert_eq!(search.goal_cell(), None);
            assert_eq!(search.start(), Vec3::ZERO);
            assert_eq!(search.goal(), Vec3::ZERO);
        }

        // Processing an uninitialized search does nothing.
        assert_eq!(search.process(&cells), SearchState::Uninitialized);

        // Re-initializing mid-search discards the previous search.
        let other = corridor_path(2);
        initialize_path(&mut search, &cells, &path);
        search.process(&cells);
        initialize_path(&mut search, &cells, &other);
        assert_eq!(run(&mut search, &cells), SearchState::Complete);
        assert_eq!(search.path_cells(), Some(ids(&other.cells).as_slice()));
    }

    #[test]
    fn test_evaluate() {
        let cells = corridor_cells();
        let mut cached = Vec::new();
        for i in 0..PATH_COUNT {
            let path = corridor_path(i);
            cached.push(Rc::new(
                MasterPath::new(i as u64, &cells, ids(&path.cells), PLANE_TOLERANCE, OFFSET).unwrap(),
            ));
        }

        let mut search = AStarSearch::new(DistanceHeuristic::LongestAxis);
        assert!(search.evaluate(cached.iter()).is_none());

        for i in 0..PATH_COUNT {
            let path = corridor_path(i);
            initialize_path(&mut search, &cells, &path);
            let found = search.evaluate(cached.iter()).unwrap();
            assert!(Rc::ptr_eq(found, &cached[i]));
        }

        // Same start, different goal.
        let path = corridor_path(0);
        search.initialize(path.start, path.goal, CellId(path.cells[0]), CellId(7));
        assert!(search.evaluate(cached.iter()).is_none());

        // Finished searches never match.
        initialize_path(&mut search, &cells, &path);
        run(&mut search, &cells);
        assert!(search.evaluate(cached.iter()).is_none());
    }
}
