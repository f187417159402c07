//! Centralized runtime options with TOML preset support.
//!
//! Playback cadence, compute-device selection and per-particle display
//! parameters are consolidated here. Options serialize to/from TOML so
//! presets can be stored next to trajectories.

mod compute;
mod display;
mod playback;

use std::path::Path;

pub use compute::{ComputeOptions, PowerMode};
pub use display::DisplayOptions;
pub use playback::PlaybackOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AtomstreamError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[playback]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Playback cadence.
    pub playback: PlaybackOptions,
    /// Compute device and kernel selection.
    pub compute: ComputeOptions,
    /// Per-particle display parameters.
    pub display: DisplayOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AtomstreamError::Io`] if the file cannot be read and
    /// [`AtomstreamError::OptionsParse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, AtomstreamError> {
        let content = std::fs::read_to_string(path).map_err(AtomstreamError::Io)?;
        toml::from_str(&content)
            .map_err(|e| AtomstreamError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`AtomstreamError::OptionsParse`] on serialization failure
    /// and [`AtomstreamError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), AtomstreamError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| AtomstreamError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(AtomstreamError::Io)?;
        }
        std::fs::write(path, content).map_err(AtomstreamError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }
}
