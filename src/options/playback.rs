use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Playback", inline)]
#[serde(default)]
/// Trajectory playback cadence.
pub struct PlaybackOptions {
    /// Frames advanced per second while playing.
    #[schemars(title = "Frame Rate", range(min = 0.1, max = 120.0), extend("step" = 0.5))]
    pub fps: f32,
    /// Start playing immediately after a trajectory loads.
    #[schemars(title = "Autoplay")]
    pub autoplay: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            fps: 10.0,
            autoplay: true,
        }
    }
}
