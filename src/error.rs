use thiserror::Error;

/// Reasons a [Simulation](crate::Simulation) or
/// [RoadNetwork](crate::RoadNetwork) cannot be built from its configuration.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("grid must have at least one intersection, got {width}x{height}")]
    EmptyGrid { width: u32, height: u32 },

    #[error("{what} must be positive, got {got}")]
    NonPositive { what: &'static str, got: f64 },

    #[error("road width {road_width} does not fit in block size {block_size}")]
    RoadTooWide { road_width: f64, block_size: f64 },

    #[error("{what} must be at least one frame")]
    ZeroInterval { what: &'static str },

    #[error("{what} must be a probability, got {got}")]
    NotAProbability { what: &'static str, got: f64 },
}

pub type BuildResult<T> = Result<T, BuildError>;

/// Checks that `value` is strictly positive.
pub(crate) fn positive(what: &'static str, value: f64) -> BuildResult<f64> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(BuildError::NonPositive { what, got: value })
    }
}
