//! Crate-level error types.

use std::fmt;

use crate::gpu::GpuError;
use crate::trajectory::TrajectoryError;

/// Errors produced by the atomstream crate.
#[derive(Debug)]
pub enum AtomstreamError {
    /// GPU compute path failure.
    Gpu(GpuError),
    /// Failed to decode or validate a trajectory.
    Trajectory(TrajectoryError),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
}

impl fmt::Display for AtomstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Trajectory(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for AtomstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Trajectory(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::OptionsParse(_) => None,
        }
    }
}

impl From<GpuError> for AtomstreamError {
    fn from(e: GpuError) -> Self {
        Self::Gpu(e)
    }
}

impl From<TrajectoryError> for AtomstreamError {
    fn from(e: TrajectoryError) -> Self {
        Self::Trajectory(e)
    }
}

impl From<std::io::Error> for AtomstreamError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
