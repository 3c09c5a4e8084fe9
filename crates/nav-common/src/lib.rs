//! Common utilities and data structures shared by the triangle-cell navigation crates

mod geometry;
mod mesh;

pub use geometry::*;
pub use mesh::*;

/// Represents a 3D position
pub type Vec3 = glam::Vec3;

/// Represents a position on the XZ plane (`y` holds the z-value)
pub type Vec2 = glam::Vec2;

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input mesh: {0}")]
    InvalidMesh(String),

    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[cfg(feature = "std")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for navigation operations
pub type Result<T> = std::result::Result<T, Error>;
