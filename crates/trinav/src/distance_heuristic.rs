//! Distance estimates used by informed searches

use nav_common::Vec3;

/// Heuristic used to estimate the remaining cost from a cell to the goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum DistanceHeuristic {
    /// Largest absolute difference along any single axis
    #[default]
    LongestAxis,
    /// Sum of the absolute differences along each axis
    Manhattan,
}

impl DistanceHeuristic {
    /// Estimated distance between `a` and `b`
    pub fn value(self, a: Vec3, b: Vec3) -> f32 {
        match self {
            DistanceHeuristic::LongestAxis => longest_axis(a, b),
            DistanceHeuristic::Manhattan => manhattan(a, b),
        }
    }
}

impl std::fmt::Display for DistanceHeuristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceHeuristic::LongestAxis => write!(f, "longest-axis"),
            DistanceHeuristic::Manhattan => write!(f, "manhattan"),
        }
    }
}

impl std::str::FromStr for DistanceHeuristic {
    type Err = nav_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "longest-axis" => Ok(DistanceHeuristic::LongestAxis),
            "manhattan" => Ok(DistanceHeuristic::Manhattan),
            _ => Err(nav_common::Error::InvalidArgument(format!(
                "unknown heuristic '{}'",
                s
            ))),
        }
    }
}

/// Largest absolute per-axis difference between two points
#[inline]
pub fn longest_axis(a: Vec3, b: Vec3) -> f32 {
    (a - b).abs().max_element()
}

/// Sum of absolute per-axis differences between two points
#[inline]
pub fn manhattan(a: Vec3, b: Vec3) -> f32 {
    let d = (a - b).abs();
    d.x + d.y + d.z
}
