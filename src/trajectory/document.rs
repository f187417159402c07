//! Serde shape of the JSON trajectory document produced by the external
//! loader and the sample-data generators.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{Bounds, Particle, TrajectoryError};

/// Top-level trajectory document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrajectoryDocument {
    /// Descriptive metadata.
    pub metadata: MetadataRecord,
    /// `num_frames` frames of `num_atoms` particle records each.
    pub frames: Vec<Vec<ParticleRecord>>,
}

/// Document metadata. Unknown keys (e.g. `generated_by`) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataRecord {
    /// Source label.
    pub source: String,
    /// Optional display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Declared frame count.
    pub num_frames: usize,
    /// Declared particle count per frame.
    pub num_atoms: usize,
    /// Optional precomputed bounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<BoundsRecord>,
}

/// `{x, y, z}` point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PointRecord {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl From<PointRecord> for Vec3 {
    fn from(p: PointRecord) -> Self {
        Self::new(p.x, p.y, p.z)
    }
}

impl From<Vec3> for PointRecord {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

/// Bounding box as stored in the document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundsRecord {
    /// Minimum corner.
    pub min: PointRecord,
    /// Maximum corner.
    pub max: PointRecord,
    /// Center point.
    pub center: PointRecord,
}

impl From<BoundsRecord> for Bounds {
    fn from(b: BoundsRecord) -> Self {
        Self {
            min: b.min.into(),
            max: b.max.into(),
            center: b.center.into(),
        }
    }
}

impl From<Bounds> for BoundsRecord {
    fn from(b: Bounds) -> Self {
        Self {
            min: b.min.into(),
            max: b.max.into(),
            center: b.center.into(),
        }
    }
}

/// `{r, g, b}` color with channels nominally in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ColorRecord {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
}

/// One particle as it appears in a document frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticleRecord {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
    /// Element symbol.
    pub element: String,
    /// Atom display name.
    pub name: String,
    /// Residue name.
    pub residue: String,
    /// Chain identifier.
    pub chain: String,
    /// Residue sequence index, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residue_index: Option<i32>,
    /// Display color.
    pub color: ColorRecord,
}

impl ParticleRecord {
    /// Convert to a [`Particle`], rejecting non-finite coordinates and
    /// clamping color channels into range.
    pub(super) fn into_particle(
        self,
        frame_idx: usize,
        particle_idx: usize,
    ) -> Result<Particle, TrajectoryError> {
        let position = Vec3::new(self.x, self.y, self.z);
        if !position.is_finite() {
            return Err(TrajectoryError::Malformed(format!(
                "particle {particle_idx} in frame {frame_idx} has a non-finite position"
            )));
        }
        Ok(Particle {
            position,
            element: self.element,
            name: self.name,
            chain: self.chain,
            residue: self.residue,
            residue_index: self.residue_index,
            color: [
                clamp_channel(self.color.r),
                clamp_channel(self.color.g),
                clamp_channel(self.color.b),
            ],
        })
    }
}

fn clamp_channel(c: f32) -> f32 {
    if c.is_finite() {
        c.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_channels_are_clamped() {
        let record = ParticleRecord {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            element: "N".into(),
            name: "N".into(),
            residue: "GLY".into(),
            chain: "A".into(),
            residue_index: None,
            color: ColorRecord { r: 1.5, g: -0.2, b: f32::NAN },
        };
        let particle = record.into_particle(0, 0).unwrap();
        assert_eq!(particle.color, [1.0, 0.0, 0.5]);
    }

    #[test]
    fn residue_index_is_omitted_when_absent() {
        let record = ParticleRecord {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            element: "C".into(),
            name: "CA".into(),
            residue: "ALA".into(),
            chain: "A".into(),
            residue_index: None,
            color: ColorRecord { r: 0.5, g: 0.5, b: 0.5 },
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("residue_index"));
    }
}
