//! Trajectory data: frames of particle records plus derived metadata.
//!
//! A [`Trajectory`] is built once from a [`TrajectoryDocument`] and is
//! immutable afterwards. The [`TrajectoryStore`] swaps whole trajectories in
//! and out; consumers hold `Arc<Trajectory>` snapshots and never mutate them.

mod document;
mod elements;
mod store;
pub mod synth;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

pub use document::{
    BoundsRecord, ColorRecord, MetadataRecord, ParticleRecord, PointRecord,
    TrajectoryDocument,
};
pub use elements::element_radius;
use glam::Vec3;
pub use store::TrajectoryStore;

/// Errors produced while decoding or validating a trajectory document.
#[derive(Debug)]
pub enum TrajectoryError {
    /// The document is not valid JSON or does not match the record shape.
    Parse(serde_json::Error),
    /// Reading the document from disk failed.
    Io(std::io::Error),
    /// The document parsed but violates a structural invariant.
    Malformed(String),
}

impl fmt::Display for TrajectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "trajectory parse error: {e}"),
            Self::Io(e) => write!(f, "trajectory I/O error: {e}"),
            Self::Malformed(msg) => write!(f, "malformed trajectory: {msg}"),
        }
    }
}

impl std::error::Error for TrajectoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Malformed(_) => None,
        }
    }
}

impl From<serde_json::Error> for TrajectoryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

impl From<std::io::Error> for TrajectoryError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// A single atom or particle within one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Position in the trajectory's linear unit.
    pub position: Vec3,
    /// Element symbol (`"C"`, `"Au"`, ...).
    pub element: String,
    /// Display name (atom name such as `"CA"`).
    pub name: String,
    /// Chain identifier used for grouping and selection.
    pub chain: String,
    /// Residue name (`"ALA"`, `"HOH"`, ...).
    pub residue: String,
    /// Residue sequence index, when the source provides one.
    pub residue_index: Option<i32>,
    /// Display color, each channel in `0.0..=1.0`.
    pub color: [f32; 3],
}

impl Particle {
    /// Display radius for this particle's element.
    #[must_use]
    pub fn radius(&self) -> f32 {
        element_radius(&self.element)
    }
}

/// One timestep: every particle of the trajectory in index order.
pub type Frame = Vec<Particle>;

/// Axis-aligned bounding box with a representative center point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Component-wise minimum.
    pub min: Vec3,
    /// Component-wise maximum.
    pub max: Vec3,
    /// Center used for camera framing (mean position when derived).
    pub center: Vec3,
}

impl Bounds {
    /// Derive bounds from a set of positions. The center is the mean
    /// position, not the box midpoint.
    ///
    /// Returns `None` for an empty iterator.
    pub fn from_positions(positions: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = positions.into_iter();
        let first = iter.next()?;
        let (min, max, sum, count) = iter.fold(
            (first, first, first, 1usize),
            |(min, max, sum, count), p| (min.min(p), max.max(p), sum + p, count + 1),
        );
        Some(Self {
            min,
            max,
            center: sum / count as f32,
        })
    }

    /// Edge lengths of the box.
    #[must_use]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Descriptive and derived data for a loaded trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryMetadata {
    /// Where the data came from (file path or generator name).
    pub source: String,
    /// Human-readable title; defaults to `source`.
    pub title: String,
    /// Number of frames.
    pub num_frames: usize,
    /// Number of particles per frame.
    pub num_atoms: usize,
    /// Bounding box, from the document or derived from frame 0.
    pub bounds: Bounds,
}

/// An ordered, validated sequence of frames sharing particle identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    metadata: TrajectoryMetadata,
    frames: Vec<Frame>,
}

impl Trajectory {
    /// Validate a decoded document and convert it into a trajectory.
    ///
    /// # Errors
    ///
    /// Returns [`TrajectoryError::Malformed`] if the frame count disagrees
    /// with the metadata, a frame has the wrong particle count, a
    /// coordinate is not finite, or per-index particle identity changes
    /// between frames.
    pub fn from_document(doc: TrajectoryDocument) -> Result<Self, TrajectoryError> {
        let TrajectoryDocument { metadata, frames } = doc;

        if frames.is_empty() {
            return Err(TrajectoryError::Malformed("trajectory has no frames".into()));
        }
        if frames.len() != metadata.num_frames {
            return Err(TrajectoryError::Malformed(format!(
                "metadata declares {} frames but document has {}",
                metadata.num_frames,
                frames.len()
            )));
        }
        if metadata.num_atoms == 0 {
            return Err(TrajectoryError::Malformed("trajectory has no particles".into()));
        }

        let mut converted: Vec<Frame> = Vec::with_capacity(frames.len());
        for (frame_idx, records) in frames.into_iter().enumerate() {
            if records.len() != metadata.num_atoms {
                return Err(TrajectoryError::Malformed(format!(
                    "frame {frame_idx} has {} particles, expected {}",
                    records.len(),
                    metadata.num_atoms
                )));
            }
            let frame = records
                .into_iter()
                .enumerate()
                .map(|(i, record)| record.into_particle(frame_idx, i))
                .collect::<Result<Frame, _>>()?;
            if let Some(reference) = converted.first() {
                check_identity(reference, &frame, frame_idx)?;
            }
            converted.push(frame);
        }

        let bounds = match metadata.bounds {
            Some(b) => b.into(),
            None => Bounds::from_positions(converted[0].iter().map(|p| p.position))
                .ok_or_else(|| TrajectoryError::Malformed("frame 0 is empty".into()))?,
        };
        let title = metadata.title.unwrap_or_else(|| metadata.source.clone());

        log::debug!(
            "validated trajectory '{}': {} frames x {} particles",
            metadata.source,
            converted.len(),
            metadata.num_atoms
        );

        Ok(Self {
            metadata: TrajectoryMetadata {
                source: metadata.source,
                title,
                num_frames: converted.len(),
                num_atoms: metadata.num_atoms,
                bounds,
            },
            frames: converted,
        })
    }

    /// Decode and validate a JSON trajectory document.
    ///
    /// # Errors
    ///
    /// Returns [`TrajectoryError::Parse`] for invalid JSON and
    /// [`TrajectoryError::Malformed`] for structural violations.
    pub fn from_json(json: &str) -> Result<Self, TrajectoryError> {
        let doc: TrajectoryDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    /// Read, decode and validate a JSON trajectory file.
    ///
    /// # Errors
    ///
    /// Returns [`TrajectoryError::Io`] if the file cannot be read, otherwise
    /// as [`Trajectory::from_json`].
    pub fn load(path: &Path) -> Result<Self, TrajectoryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Trajectory metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrajectoryMetadata {
        &self.metadata
    }

    /// All frames in order.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Frame at `index`, if in range.
    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Number of frames.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of particles per frame.
    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.metadata.num_atoms
    }

    /// Wrap in an `Arc` for sharing with read-only consumers.
    #[must_use]
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

/// Per-index identity: chain and element must not change between frames.
fn check_identity(
    reference: &[Particle],
    frame: &[Particle],
    frame_idx: usize,
) -> Result<(), TrajectoryError> {
    let mismatch = reference
        .iter()
        .zip(frame)
        .position(|(a, b)| a.chain != b.chain || a.element != b.element);
    match mismatch {
        Some(i) => Err(TrajectoryError::Malformed(format!(
            "particle {i} in frame {frame_idx} changes identity ({} {} -> {} {})",
            reference[i].chain, reference[i].element, frame[i].chain, frame[i].element
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(chain: &str, x: f32) -> ParticleRecord {
        ParticleRecord {
            x,
            y: 0.0,
            z: 0.0,
            element: "C".into(),
            name: "CA".into(),
            residue: "ALA".into(),
            chain: chain.into(),
            residue_index: Some(1),
            color: ColorRecord { r: 0.5, g: 0.5, b: 0.5 },
        }
    }

    fn document(frames: Vec<Vec<ParticleRecord>>, num_atoms: usize) -> TrajectoryDocument {
        TrajectoryDocument {
            metadata: MetadataRecord {
                source: "test".into(),
                title: None,
                num_frames: frames.len(),
                num_atoms,
                bounds: None,
            },
            frames,
        }
    }

    #[test]
    fn rejects_inconsistent_particle_counts() {
        let doc = document(
            vec![
                vec![record("A", 0.0), record("A", 1.0)],
                vec![record("A", 0.0)],
            ],
            2,
        );
        let err = Trajectory::from_document(doc).unwrap_err();
        assert!(matches!(err, TrajectoryError::Malformed(_)));
    }

    #[test]
    fn rejects_frame_count_mismatch() {
        let mut doc = document(vec![vec![record("A", 0.0)]], 1);
        doc.metadata.num_frames = 3;
        assert!(matches!(
            Trajectory::from_document(doc),
            Err(TrajectoryError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_identity_change() {
        let doc = document(vec![vec![record("A", 0.0)], vec![record("B", 0.0)]], 1);
        assert!(matches!(
            Trajectory::from_document(doc),
            Err(TrajectoryError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        let doc = document(vec![vec![record("A", f32::NAN)]], 1);
        assert!(Trajectory::from_document(doc).is_err());
    }

    #[test]
    fn derives_bounds_from_first_frame() {
        let doc = document(
            vec![
                vec![record("A", -1.0), record("A", 3.0)],
                vec![record("A", 10.0), record("A", 20.0)],
            ],
            2,
        );
        let traj = Trajectory::from_document(doc).unwrap();
        let bounds = traj.metadata().bounds;
        assert_eq!(bounds.min.x, -1.0);
        assert_eq!(bounds.max.x, 3.0);
        assert_eq!(bounds.center.x, 1.0);
        assert_eq!(traj.metadata().title, "test");
    }

    #[test]
    fn parses_json_with_optional_fields() {
        let json = r#"{
            "metadata": {"source": "s", "num_frames": 1, "num_atoms": 1,
                         "generated_by": "tool"},
            "frames": [[{"x": 1.0, "y": 2.0, "z": 3.0, "element": "O",
                         "name": "O", "residue": "HOH", "chain": "W",
                         "color": {"r": 1.0, "g": 0.0, "b": 0.0}}]]
        }"#;
        let traj = Trajectory::from_json(json).unwrap();
        let p = &traj.frames()[0][0];
        assert_eq!(p.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.residue_index, None);
        assert_eq!(traj.frame_count(), 1);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(matches!(
            Trajectory::from_json("{not json"),
            Err(TrajectoryError::Parse(_))
        ));
    }
}
