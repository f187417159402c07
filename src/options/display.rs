use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Display", inline)]
#[serde(default)]
/// Per-particle display parameters packed alongside positions.
pub struct DisplayOptions {
    /// Multiplier applied to element radii.
    #[schemars(title = "Atom Scale", range(min = 0.05, max = 2.0), extend("step" = 0.05))]
    pub radius_scale: f32,
    /// Opacity of unselected chains while a chain is selected.
    #[schemars(title = "Dim Unselected", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub unselected_alpha: f32,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            radius_scale: 0.25,
            unselected_alpha: 1.0,
        }
    }
}
