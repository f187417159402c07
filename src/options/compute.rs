use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Adapter power preference, mirrored from wgpu so it can be serialized.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PowerMode {
    /// Prefer the discrete / fastest adapter.
    #[default]
    HighPerformance,
    /// Prefer the integrated / power-saving adapter.
    LowPower,
}

impl From<PowerMode> for wgpu::PowerPreference {
    fn from(mode: PowerMode) -> Self {
        match mode {
            PowerMode::HighPerformance => Self::HighPerformance,
            PowerMode::LowPower => Self::LowPower,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Compute", inline)]
#[serde(default)]
/// Parallel-compute device selection and update-kernel source.
pub struct ComputeOptions {
    /// Try the GPU path before falling back to the host path.
    #[schemars(title = "Use GPU")]
    pub prefer_gpu: bool,
    /// Adapter power preference.
    #[schemars(title = "Adapter")]
    pub power_preference: PowerMode,
    /// Request a software (fallback) adapter.
    #[schemars(skip)]
    pub force_software_adapter: bool,
    /// Custom WGSL update kernel; the built-in pass-through is used when
    /// unset.
    #[schemars(skip)]
    pub kernel_path: Option<PathBuf>,
}

impl Default for ComputeOptions {
    fn default() -> Self {
        Self {
            prefer_gpu: true,
            power_preference: PowerMode::HighPerformance,
            force_software_adapter: false,
            kernel_path: None,
        }
    }
}
