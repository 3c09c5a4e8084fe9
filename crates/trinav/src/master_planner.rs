//! Frame-sliced path planning service
//!
//! Callers submit requests through a [`PathPlanner`] and receive
//! [`NavRequest`] handles. The owning [`MasterPlanner`] is driven from an
//! update loop with [`MasterPlanner::process`], [`MasterPlanner::process_once`]
//! or [`MasterPlanner::process_all`], which move pending work forward and
//! publish results through the handles.
//!
//! Processing order on every call:
//! 1. Admin: transfer new requests, apply cancellations and, if requested,
//!    maintenance (keep-alives and eviction of old paths).
//! 2. Guaranteed jobs: nearest and valid location queries, always finished.
//! 3. Path searches (A*) and path repairs (Dijkstra), one step per job per
//!    pass, for as many passes as the timeslice allows.
//!
//! Completed paths are cached while `max_path_age` is non-zero and reused by
//! later searches with the same start and goal cells.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use crate::{
    AStarSearch, CellId, DijkstraSearch, DistanceHeuristic, MasterNavRequest, MasterPath,
    NavRequest, NavRequestState, Path, PlannerConfig, SearchState, TriNavMesh,
};
use nav_common::Vec3;

struct PathJob {
    request: MasterNavRequest<Path>,
    search: AStarSearch,
    search_ready: bool,
    start: Vec3,
    goal: Vec3,
}

struct RepairJob {
    request: MasterNavRequest<Path>,
    search: DijkstraSearch,
    path: Path,
    source: Option<Rc<MasterPath>>,
    start: Vec3,
}

struct NearestLocationJob {
    request: MasterNavRequest<Vec3>,
    point: Vec3,
}

struct ValidLocationJob {
    request: MasterNavRequest<bool>,
    point: Vec3,
    y_tolerance: f32,
}

/// Request queues and search pools shared between the planner and its
/// [`PathPlanner`] handles.
struct PlannerShared {
    disposed: Cell<bool>,
    heuristic: DistanceHeuristic,
    path_requests: RefCell<VecDeque<PathJob>>,
    repair_requests: RefCell<VecDeque<RepairJob>>,
    nearest_requests: RefCell<VecDeque<NearestLocationJob>>,
    valid_requests: RefCell<VecDeque<ValidLocationJob>>,
    cancellations: RefCell<VecDeque<NavRequest<Path>>>,
    keep_alive_requests: RefCell<VecDeque<u64>>,
    search_pool: RefCell<Vec<AStarSearch>>,
    repair_pool: RefCell<Vec<DijkstraSearch>>,
}

/// Caller-facing request interface of a [`MasterPlanner`].
///
/// Handles are cheap to clone and stay valid after the planner is disposed;
/// requests made afterwards fail immediately.
#[derive(Clone)]
pub struct PathPlanner {
    shared: Rc<PlannerShared>,
}

impl std::fmt::Debug for PathPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathPlanner")
            .field("disposed", &self.shared.disposed.get())
            .field("heuristic", &self.shared.heuristic)
            .finish()
    }
}

fn failed<T>() -> NavRequest<T> {
    MasterNavRequest::with_state(NavRequestState::Failed)
        .request()
        .clone()
}

impl PathPlanner {
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.get()
    }

    /// Requests a path from `start` to `goal`.
    ///
    /// Both points must be within the column of a cell.
    pub fn get_path(&self, start: Vec3, goal: Vec3) -> NavRequest<Path> {
        if self.is_disposed() {
            return failed();
        }
        let search = self
            .shared
            .search_pool
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| AStarSearch::new(self.shared.heuristic));
        let job = PathJob {
            request: MasterNavRequest::new(),
            search,
            search_ready: false,
            start,
            goal,
        };
        let handle = job.request.request().clone();
        self.shared.path_requests.borrow_mut().push_back(job);
        handle
    }

    /// Requests a new path from `start` that rejoins `path`.
    ///
    /// The result leads to the same goal as `path`. Fails if `path` is no
    /// longer cached by the planner.
    pub fn repair_path(&self, start: Vec3, path: &Path) -> NavRequest<Path> {
        if self.is_disposed() || path.is_disposed() {
            return failed();
        }
        let search = self
            .shared
            .repair_pool
            .borrow_mut()
            .pop()
            .unwrap_or_default();
        let job = RepairJob {
            request: MasterNavRequest::new(),
            search,
            path: path.clone(),
            source: None,
            start,
        };
        let handle = job.request.request().clone();
        self.shared.repair_requests.borrow_mut().push_back(job);
        handle
    }

    /// Cancels a pending path or repair request. The request fails.
    pub fn discard_path_request(&self, request: &NavRequest<Path>) {
        if self.is_disposed() {
            return;
        }
        self.shared
            .cancellations
            .borrow_mut()
            .push_back(request.clone());
    }

    /// Resets the age of the cached path backing `path`
    pub fn keep_path_alive(&self, path: &Path) {
        if self.is_disposed() || path.is_disposed() {
            return;
        }
        self.shared
            .keep_alive_requests
            .borrow_mut()
            .push_back(path.id());
    }

    /// Requests the point on the mesh closest to `point`
    pub fn get_nearest_valid_location(&self, point: Vec3) -> NavRequest<Vec3> {
        if self.is_disposed() {
            return failed();
        }
        let job = NearestLocationJob {
            request: MasterNavRequest::new(),
            point,
        };
        let handle = job.request.request().clone();
        self.shared.nearest_requests.borrow_mut().push_back(job);
        handle
    }

    /// Requests whether `point` is over the mesh and within `y_tolerance` of
    /// its surface.
    pub fn is_valid_location(&self, point: Vec3, y_tolerance: f32) -> NavRequest<bool> {
        if self.is_disposed() {
            return MasterNavRequest::with_data(NavRequestState::Failed, false)
                .request()
                .clone();
        }
        let job = ValidLocationJob {
            request: MasterNavRequest::new(),
            point,
            y_tolerance: y_tolerance.max(0.0),
        };
        let handle = job.request.request().clone();
        self.shared.valid_requests.borrow_mut().push_back(job);
        handle
    }
}

/// Owns the navigation mesh, the path cache and all in-flight jobs
pub struct MasterPlanner {
    mesh: TriNavMesh,
    config: PlannerConfig,
    planner: PathPlanner,
    active_paths: Vec<Rc<MasterPath>>,
    path_jobs: Vec<PathJob>,
    repair_jobs: Vec<RepairJob>,
    nearest_jobs: VecDeque<NearestLocationJob>,
    valid_jobs: VecDeque<ValidLocationJob>,
    search_pool_max: usize,
    repair_pool_max: usize,
    next_path_id: u64,
}

impl std::fmt::Debug for MasterPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterPlanner")
            .field("config", &self.config)
            .field("cells", &self.mesh.cell_count())
            .field("active_paths", &self.active_paths.len())
            .field("path_jobs", &self.path_jobs.len())
            .field("repair_jobs", &self.repair_jobs.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl MasterPlanner {
    /// Creates a planner for `mesh`. Out of range configuration values are
    /// clamped.
    pub fn new(mesh: TriNavMesh, config: PlannerConfig) -> Self {
        let config = config.sanitized();
        let search_pool_max = config.search_pool_max;
        let repair_pool_max = if search_pool_max < 3 {
            search_pool_max
        } else {
            search_pool_max / 2
        };

        let shared = PlannerShared {
            disposed: Cell::new(false),
            heuristic: config.heuristic,
            path_requests: RefCell::new(VecDeque::new()),
            repair_requests: RefCell::new(VecDeque::new()),
            nearest_requests: RefCell::new(VecDeque::new()),
            valid_requests: RefCell::new(VecDeque::new()),
            cancellations: RefCell::new(VecDeque::new()),
            keep_alive_requests: RefCell::new(VecDeque::new()),
            search_pool: RefCell::new(Vec::with_capacity(search_pool_max)),
            repair_pool: RefCell::new(Vec::with_capacity(repair_pool_max)),
        };

        Self {
            mesh,
            config,
            planner: PathPlanner {
                shared: Rc::new(shared),
            },
            active_paths: Vec::new(),
            path_jobs: Vec::new(),
            repair_jobs: Vec::new(),
            nearest_jobs: VecDeque::new(),
            valid_jobs: VecDeque::new(),
            search_pool_max,
            repair_pool_max,
            next_path_id: 0,
        }
    }

    /// The request interface. Every call returns the same planner.
    pub fn path_planner(&self) -> &PathPlanner {
        &self.planner
    }

    pub fn mesh(&self) -> &TriNavMesh {
        &self.mesh
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn heuristic(&self) -> DistanceHeuristic {
        self.config.heuristic
    }

    pub fn max_path_age(&self) -> Duration {
        self.config.max_path_age
    }

    pub fn max_processing_timeslice(&self) -> Duration {
        self.config.max_processing_timeslice
    }

    pub fn repair_search_depth(&self) -> usize {
        self.config.repair_search_depth
    }

    pub fn is_disposed(&self) -> bool {
        self.planner.is_disposed()
    }

    /// Number of cached paths
    pub fn active_path_count(&self) -> usize {
        self.active_paths.len()
    }

    /// Path requests not yet picked up by processing
    pub fn path_request_count(&self) -> usize {
        self.planner.shared.path_requests.borrow().len()
    }

    /// Path searches in progress
    pub fn path_job_count(&self) -> usize {
        self.path_jobs.len()
    }

    pub fn repair_request_count(&self) -> usize {
        self.planner.shared.repair_requests.borrow().len()
    }

    pub fn repair_job_count(&self) -> usize {
        self.repair_jobs.len()
    }

    pub fn nearest_location_request_count(&self) -> usize {
        self.planner.shared.nearest_requests.borrow().len()
    }

    pub fn valid_location_request_count(&self) -> usize {
        self.planner.shared.valid_requests.borrow().len()
    }

    pub fn discard_path_request_count(&self) -> usize {
        self.planner.shared.cancellations.borrow().len()
    }

    pub fn keep_alive_request_count(&self) -> usize {
        self.planner.shared.keep_alive_requests.borrow().len()
    }

    /// Idle A* searches available for reuse
    pub fn path_search_pool_size(&self) -> usize {
        self.planner.shared.search_pool.borrow().len()
    }

    /// Idle repair searches available for reuse
    pub fn repair_pool_size(&self) -> usize {
        self.planner.shared.repair_pool.borrow().len()
    }

    /// Processes pending work until it is done or the timeslice runs out.
    ///
    /// Admin and location jobs always run. Returns the time spent.
    pub fn process(&mut self, include_maintenance: bool) -> Duration {
        if self.is_disposed() {
            return Duration::ZERO;
        }
        if self.config.processes_all() {
            return self.process_all(include_maintenance);
        }

        let start = Instant::now();
        self.process_admin(include_maintenance);
        self.process_guaranteed_jobs();
        loop {
            let more_paths = self.process_path_jobs();
            let more_repairs = self.process_repair_jobs();
            if !(more_paths || more_repairs)
                || start.elapsed() >= self.config.max_processing_timeslice
            {
                break;
            }
        }
        start.elapsed()
    }

    /// Advances every pending job by a single step
    pub fn process_once(&mut self, include_maintenance: bool) {
        if self.is_disposed() {
            return;
        }
        self.process_admin(include_maintenance);
        self.process_guaranteed_jobs();
        self.process_path_jobs();
        self.process_repair_jobs();
    }

    /// Runs every pending job to completion. Returns the time spent.
    pub fn process_all(&mut self, include_maintenance: bool) -> Duration {
        if self.is_disposed() {
            return Duration::ZERO;
        }
        let start = Instant::now();
        self.process_admin(include_maintenance);
        self.process_guaranteed_jobs();
        while self.process_path_jobs() {}
        while self.process_repair_jobs() {}
        start.elapsed()
    }

    /// Fails all pending requests and disposes every cached path.
    ///
    /// Later processing calls do nothing and later requests fail immediately.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        let shared = &self.planner.shared;
        shared.disposed.set(true);
        shared.keep_alive_requests.borrow_mut().clear();
        shared.cancellations.borrow_mut().clear();

        for job in shared.repair_requests.borrow_mut().drain(..) {
            job.request.set_state(NavRequestState::Failed);
        }
        for mut job in self.repair_jobs.drain(..) {
            job.request.set_state(NavRequestState::Failed);
            job.search.reset();
        }
        for job in shared.valid_requests.borrow_mut().drain(..) {
            job.request.set_state(NavRequestState::Failed);
        }
        for job in self.valid_jobs.drain(..) {
            job.request.set_state(NavRequestState::Failed);
        }
        for job in shared.nearest_requests.borrow_mut().drain(..) {
            job.request.set_state(NavRequestState::Failed);
        }
        for job in self.nearest_jobs.drain(..) {
            job.request.set_state(NavRequestState::Failed);
        }
        for job in shared.path_requests.borrow_mut().drain(..) {
            job.request.set_state(NavRequestState::Failed);
        }
        for mut job in self.path_jobs.drain(..) {
            job.request.set_state(NavRequestState::Failed);
            job.search.reset();
        }

        for path in self.active_paths.drain(..) {
            path.dispose();
        }
        shared.search_pool.borrow_mut().clear();
        shared.repair_pool.borrow_mut().clear();
        log::info!("Path planner disposed");
    }

    fn process_admin(&mut self, include_maintenance: bool) {
        self.transfer_requests();
        self.process_cancellations();
        if include_maintenance {
            self.perform_maintenance();
        }
    }

    fn transfer_requests(&mut self) {
        let shared = &self.planner.shared;
        self.path_jobs
            .extend(shared.path_requests.borrow_mut().drain(..));
        self.repair_jobs
            .extend(shared.repair_requests.borrow_mut().drain(..));
        self.nearest_jobs
            .extend(shared.nearest_requests.borrow_mut().drain(..));
        self.valid_jobs
            .extend(shared.valid_requests.borrow_mut().drain(..));
    }

    fn process_cancellations(&mut self) {
        let cancellations: Vec<NavRequest<Path>> = self
            .planner
            .shared
            .cancellations
            .borrow_mut()
            .drain(..)
            .collect();
        for request in cancellations {
            // Finished jobs are removed on the next processing pass.
            if let Some(job) = self
                .path_jobs
                .iter_mut()
                .find(|job| job.request.request() == &request)
            {
                job.request.set_state(NavRequestState::Failed);
                job.search.reset();
                continue;
            }
            if let Some(job) = self
                .repair_jobs
                .iter_mut()
                .find(|job| job.request.request() == &request)
            {
                job.request.set_state(NavRequestState::Failed);
                job.search.reset();
            }
        }
    }

    fn perform_maintenance(&mut self) {
        let keep_alive: Vec<u64> = self
            .planner
            .shared
            .keep_alive_requests
            .borrow_mut()
            .drain(..)
            .collect();
        for id in keep_alive {
            for path in self.active_paths.iter().filter(|path| path.id() == id) {
                path.reset_timestamp();
            }
        }

        let max_age = self.config.max_path_age;
        let before = self.active_paths.len();
        self.active_paths.retain(|path| {
            if path.age() > max_age {
                path.dispose();
                false
            } else {
                true
            }
        });
        let evicted = before - self.active_paths.len();
        if evicted > 0 {
            log::debug!("Evicted {} expired path(s)", evicted);
        }
    }

    fn process_guaranteed_jobs(&mut self) {
        while let Some(job) = self.nearest_jobs.pop_front() {
            match self.mesh.closest_point(job.point) {
                Some(point) => job.request.set(NavRequestState::Complete, point),
                None => job.request.set_state(NavRequestState::Failed),
            }
        }
        while let Some(job) = self.valid_jobs.pop_front() {
            let valid = self.mesh.is_valid_position(job.point, job.y_tolerance);
            job.request.set(NavRequestState::Complete, valid);
        }
    }

    /// Steps every A* job once. Returns true if any are still pending.
    fn process_path_jobs(&mut self) -> bool {
        let mut i = 0;
        while i < self.path_jobs.len() {
            if self.step_path_job(i) {
                let job = self.path_jobs.remove(i);
                self.recycle_search(job.search);
            } else {
                i += 1;
            }
        }
        !self.path_jobs.is_empty()
    }

    /// Returns true once the job is finished.
    fn step_path_job(&mut self, index: usize) -> bool {
        let Self {
            mesh,
            config,
            active_paths,
            path_jobs,
            next_path_id,
            ..
        } = self;
        let job = &mut path_jobs[index];

        if job.request.state() != NavRequestState::Processing {
            return true;
        }

        if !job.search_ready {
            let start_cell = mesh.closest_cell(job.start, true);
            let goal_cell = mesh.closest_cell(job.goal, true);
            let (Some((start_cell, _)), Some((goal_cell, _))) = (start_cell, goal_cell) else {
                log::debug!(
                    "Path request failed: {:?} -> {:?} is not on the mesh",
                    job.start,
                    job.goal
                );
                job.request.set_state(NavRequestState::Failed);
                return true;
            };
            job.search
                .initialize(job.start, job.goal, start_cell, goal_cell);
            job.search_ready = true;
        }

        if !job.search.is_active() {
            return true;
        }

        if job.search.state() == SearchState::Initialized {
            if let Some(existing) = job.search.evaluate(active_paths.iter()) {
                existing.reset_timestamp();
                log::debug!("Reusing cached path {}", existing.id());
                job.request
                    .set(NavRequestState::Complete, existing.path(job.search.goal()));
                return true;
            }
        }

        match job.search.process(mesh.cells()) {
            SearchState::Complete => {
                let cells = job.search.path_cells().map(<[CellId]>::to_vec);
                match cells.map(|cells| {
                    MasterPath::new(
                        *next_path_id,
                        mesh.cells(),
                        cells,
                        mesh.plane_tolerance(),
                        mesh.offset_scale(),
                    )
                }) {
                    Some(Ok(path)) => {
                        *next_path_id += 1;
                        let path = Rc::new(path);
                        log::debug!("Created path {} with {} cells", path.id(), path.size());
                        job.request
                            .set(NavRequestState::Complete, path.path(job.search.goal()));
                        if !config.max_path_age.is_zero() {
                            active_paths.push(path);
                        }
                    }
                    Some(Err(e)) => {
                        log::warn!("Search produced an unusable path: {}", e);
                        job.request.set_state(NavRequestState::Failed);
                    }
                    None => job.request.set_state(NavRequestState::Failed),
                }
                true
            }
            SearchState::Failed => {
                job.request.set_state(NavRequestState::Failed);
                true
            }
            _ => false,
        }
    }

    /// Steps every repair job once. Returns true if any are still pending.
    fn process_repair_jobs(&mut self) -> bool {
        let mut i = 0;
        while i < self.repair_jobs.len() {
            if self.step_repair_job(i) {
                let job = self.repair_jobs.remove(i);
                self.recycle_repair(job.search);
            } else {
                i += 1;
            }
        }
        !self.repair_jobs.is_empty()
    }

    /// Returns true once the job is finished.
    fn step_repair_job(&mut self, index: usize) -> bool {
        let Self {
            mesh,
            config,
            active_paths,
            repair_jobs,
            next_path_id,
            ..
        } = self;
        let job = &mut repair_jobs[index];

        if job.request.state() != NavRequestState::Processing {
            return true;
        }

        if job.search.state() == SearchState::Uninitialized {
            let source = active_paths
                .iter()
                .find(|path| path.id() == job.path.id())
                .cloned();
            let Some(source) = source else {
                log::debug!("Repair failed: path {} is no longer cached", job.path.id());
                job.request.set_state(NavRequestState::Failed);
                return true;
            };
            let Some((start_cell, _)) = mesh.closest_cell(job.start, true) else {
                log::debug!("Repair failed: {:?} is not on the mesh", job.start);
                job.request.set_state(NavRequestState::Failed);
                return true;
            };
            if let Err(e) = job.search.initialize(
                job.start,
                None,
                start_cell,
                source.raw_copy(),
                config.repair_search_depth,
                false,
            ) {
                log::warn!("Repair search rejected: {}", e);
                job.request.set_state(NavRequestState::Failed);
                return true;
            }
            job.source = Some(source);
        }

        if !job.search.is_active() {
            return true;
        }

        match job.search.process(mesh.cells()) {
            SearchState::Complete => {
                let merged = job
                    .source
                    .as_deref()
                    .and_then(|source| merge_repair(source, &job.search));
                let path = merged.map(|cells| {
                    MasterPath::new(
                        *next_path_id,
                        mesh.cells(),
                        cells,
                        mesh.plane_tolerance(),
                        mesh.offset_scale(),
                    )
                });
                match path {
                    Some(Ok(path)) => {
                        *next_path_id += 1;
                        let path = Rc::new(path);
                        log::debug!(
                            "Repaired path {} as path {} with {} cells",
                            job.path.id(),
                            path.id(),
                            path.size()
                        );
                        job.request
                            .set(NavRequestState::Complete, path.path(job.path.goal()));
                        if !config.max_path_age.is_zero() {
                            active_paths.push(path);
                        }
                    }
                    Some(Err(e)) => {
                        log::warn!("Repair produced an unusable path: {}", e);
                        job.request.set_state(NavRequestState::Failed);
                    }
                    None => job.request.set_state(NavRequestState::Failed),
                }
                true
            }
            SearchState::Failed => {
                job.request.set_state(NavRequestState::Failed);
                true
            }
            _ => false,
        }
    }

    fn recycle_search(&mut self, mut search: AStarSearch) {
        search.reset();
        let mut pool = self.planner.shared.search_pool.borrow_mut();
        if pool.len() < self.search_pool_max {
            pool.push(search);
        }
    }

    fn recycle_repair(&mut self, mut search: DijkstraSearch) {
        search.reset();
        let mut pool = self.planner.shared.repair_pool.borrow_mut();
        if pool.len() < self.repair_pool_max {
            pool.push(search);
        }
    }
}

/// Joins the repair result that reaches farthest along `source` with the
/// remainder of `source`.
fn merge_repair(source: &MasterPath, search: &DijkstraSearch) -> Option<Vec<CellId>> {
    let mut selected: Option<(&[CellId], usize)> = None;
    for i in 0..search.path_count() {
        let Ok(cells) = search.path_cells(i) else {
            continue;
        };
        let Some(goal_index) = cells.last().and_then(|&cell| source.cell_index(cell)) else {
            continue;
        };
        if selected.map_or(true, |(_, best)| goal_index > best) {
            selected = Some((cells, goal_index));
        }
    }

    let (cells, goal_index) = selected?;
    let mut merged = cells.to_vec();
    if merged.last() != Some(&source.goal_cell()) {
        merged.extend_from_slice(&source.cell_ids()[goal_index + 1..]);
    }
    Some(merged)
}
