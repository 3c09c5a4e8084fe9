//! Configuration for mesh building and path planning

use std::time::Duration;

use crate::DistanceHeuristic;
use nav_common::{Error, Result};

/// Upper bound for a finite processing timeslice
pub const MAX_TIMESLICE: Duration = Duration::from_secs(9);

/// Parameters used when building a [`TriNavMesh`](crate::TriNavMesh)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct MeshBuildConfig {
    /// Maximum depth of the cell quad tree
    pub spatial_depth: usize,
    /// Vertical distance within which a point is considered on a cell's plane
    pub plane_tolerance: f32,
    /// Fraction used to pull points away from cell walls and vertices
    pub offset_scale: f32,
}

impl Default for MeshBuildConfig {
    fn default() -> Self {
        Self {
            spatial_depth: 5,
            plane_tolerance: 0.5,
            offset_scale: 0.1,
        }
    }
}

impl MeshBuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_spatial_depth(mut self, spatial_depth: usize) -> Self {
        self.spatial_depth = spatial_depth;
        self
    }

    pub fn with_plane_tolerance(mut self, plane_tolerance: f32) -> Self {
        self.plane_tolerance = plane_tolerance;
        self
    }

    pub fn with_offset_scale(mut self, offset_scale: f32) -> Self {
        self.offset_scale = offset_scale;
        self
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if !self.plane_tolerance.is_finite() || self.plane_tolerance < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "plane tolerance must be a non-negative number, got {}",
                self.plane_tolerance
            )));
        }
        if !self.offset_scale.is_finite() || self.offset_scale < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "offset scale must be a non-negative number, got {}",
                self.offset_scale
            )));
        }
        Ok(())
    }
}

/// Policy parameters for a [`MasterPlanner`](crate::MasterPlanner)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct PlannerConfig {
    /// Heuristic used by path searches
    pub heuristic: DistanceHeuristic,
    /// Time budget for a single call to `process`.
    ///
    /// `Duration::MAX` processes all pending work on every call.
    #[cfg_attr(feature = "serialization", serde(with = "duration_ms"))]
    pub max_processing_timeslice: Duration,
    /// Age after which a cached path is discarded. Zero disables the cache.
    #[cfg_attr(feature = "serialization", serde(with = "duration_ms"))]
    pub max_path_age: Duration,
    /// Maximum path size explored when repairing a path
    pub repair_search_depth: usize,
    /// Maximum number of pooled search jobs
    pub search_pool_max: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            heuristic: DistanceHeuristic::LongestAxis,
            max_processing_timeslice: Duration::MAX,
            max_path_age: Duration::from_secs(60),
            repair_search_depth: 2,
            search_pool_max: 4,
        }
    }
}

impl PlannerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_heuristic(mut self, heuristic: DistanceHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_max_processing_timeslice(mut self, timeslice: Duration) -> Self {
        self.max_processing_timeslice = timeslice;
        self
    }

    pub fn with_max_path_age(mut self, max_path_age: Duration) -> Self {
        self.max_path_age = max_path_age;
        self
    }

    pub fn with_repair_search_depth(mut self, repair_search_depth: usize) -> Self {
        self.repair_search_depth = repair_search_depth;
        self
    }

    pub fn with_search_pool_max(mut self, search_pool_max: usize) -> Self {
        self.search_pool_max = search_pool_max;
        self
    }

    /// True if every call to `process` should finish all pending work
    pub fn processes_all(&self) -> bool {
        self.max_processing_timeslice == Duration::MAX
    }

    /// Validates the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.repair_search_depth == 0 {
            return Err(Error::InvalidArgument(
                "repair search depth must be at least 1".to_string(),
            ));
        }
        if self.search_pool_max == 0 {
            return Err(Error::InvalidArgument(
                "search pool size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// A copy with every value clamped into its valid range
    pub fn sanitized(&self) -> Self {
        let mut config = *self;
        if config.repair_search_depth == 0 {
            log::warn!("repair search depth 0 raised to 1");
            config.repair_search_depth = 1;
        }
        if config.search_pool_max == 0 {
            log::warn!("search pool size 0 raised to 1");
            config.search_pool_max = 1;
        }
        if !config.processes_all() && config.max_processing_timeslice > MAX_TIMESLICE {
            log::warn!(
                "processing timeslice {:?} lowered to {:?}",
                config.max_processing_timeslice,
                MAX_TIMESLICE
            );
            config.max_processing_timeslice = MAX_TIMESLICE;
        }
        config
    }
}

/// Combined mesh and planner configuration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct TriNavConfig {
    pub mesh: MeshBuildConfig,
    pub planner: PlannerConfig,
}

impl TriNavConfig {
    pub fn validate(&self) -> Result<()> {
        self.mesh.validate()?;
        self.planner.validate()
    }
}

#[cfg(feature = "serialization")]
impl TriNavConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidArgument(format!("invalid configuration: {}", e)))
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidArgument(format!("failed to serialize configuration: {}", e)))
    }

    #[cfg(feature = "std")]
    pub fn load_from_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

/// Stores a `Duration` as whole milliseconds, with `u64::MAX` standing for
/// `Duration::MAX`.
#[cfg(feature = "serialization")]
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = if *value == Duration::MAX {
            u64::MAX
        } else {
            u64::try_from(value.as_millis()).unwrap_or(u64::MAX)
        };
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(if millis == u64::MAX {
            Duration::MAX
        } else {
            Duration::from_millis(millis)
        })
    }
}
