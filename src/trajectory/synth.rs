//! Synthetic sample trajectories.
//!
//! Small procedurally animated systems for demos, tests and benchmarks:
//! a water box with thermal and wave motion, a breathing alpha helix, and a
//! vibrating metal nanocluster. Coordinates are in nanometers. Random
//! components use a seeded RNG so output is reproducible.

use std::f32::consts::PI;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    Bounds, BoundsRecord, ColorRecord, MetadataRecord, ParticleRecord,
    TrajectoryDocument,
};

const OXYGEN: ColorRecord = ColorRecord { r: 1.0, g: 0.0, b: 0.0 };
const HYDROGEN: ColorRecord = ColorRecord { r: 1.0, g: 1.0, b: 1.0 };
const CARBON: ColorRecord = ColorRecord { r: 0.5, g: 0.5, b: 0.5 };
const NITROGEN: ColorRecord = ColorRecord { r: 0.0, g: 0.0, b: 1.0 };
const GOLD: ColorRecord = ColorRecord { r: 1.0, g: 0.84, b: 0.0 };

/// Which sample system to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    /// [`water_box`]
    Water,
    /// [`helix`]
    Helix,
    /// [`nanocluster`]
    Nanocluster,
}

impl SampleKind {
    /// Generate the sample with its default size.
    #[must_use]
    pub fn generate(self, num_frames: usize, seed: u64) -> TrajectoryDocument {
        match self {
            Self::Water => water_box(27, num_frames, seed),
            Self::Helix => helix(20, num_frames),
            Self::Nanocluster => nanocluster(100, num_frames, seed),
        }
    }
}

fn record(
    pos: Vec3,
    element: &str,
    name: &str,
    residue: &str,
    residue_index: Option<i32>,
    color: ColorRecord,
) -> ParticleRecord {
    ParticleRecord {
        x: pos.x,
        y: pos.y,
        z: pos.z,
        element: element.into(),
        name: name.into(),
        residue: residue.into(),
        chain: "A".into(),
        residue_index,
        color,
    }
}

fn jitter(rng: &mut StdRng, amplitude: f32) -> Vec3 {
    Vec3::new(
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
    ) * amplitude
}

/// Side length of the smallest cube holding `n` grid cells.
fn grid_side(n: usize) -> usize {
    let mut side = 1;
    while side * side * side < n {
        side += 1;
    }
    side
}

fn grid_cells(n: usize) -> impl Iterator<Item = (usize, usize, usize)> {
    let side = grid_side(n);
    (0..side)
        .flat_map(move |i| (0..side).flat_map(move |j| (0..side).map(move |k| (i, j, k))))
        .take(n)
}

/// Water box: `num_molecules` waters on a cubic grid with small thermal
/// noise and a collective wave.
#[must_use]
pub fn water_box(num_molecules: usize, num_frames: usize, seed: u64) -> TrajectoryDocument {
    const SPACING: f32 = 0.3;
    let geometry: [(&str, &str, Vec3, ColorRecord); 3] = [
        ("O", "O", Vec3::ZERO, OXYGEN),
        ("H", "H1", Vec3::new(0.096, 0.0, 0.0), HYDROGEN),
        ("H", "H2", Vec3::new(-0.024, 0.093, 0.0), HYDROGEN),
    ];
    let mut rng = StdRng::seed_from_u64(seed);

    let frames = (0..num_frames)
        .map(|frame_idx| {
            let t = frame_idx as f32 * 0.1;
            let mut atoms = Vec::with_capacity(num_molecules * 3);
            for (mol_idx, (i, j, k)) in grid_cells(num_molecules).enumerate() {
                let (fi, fj, fk) = (i as f32, j as f32, k as f32);
                let base = Vec3::new(fi, fj, fk) * SPACING;
                let wave = Vec3::new(
                    (t + fi * 0.3).sin(),
                    (t + fj * 0.3).sin(),
                    (t + fk * 0.3).sin(),
                ) * 0.02;
                let thermal = jitter(&mut rng, 0.01);
                for (element, name, offset, color) in &geometry {
                    atoms.push(record(
                        base + *offset + thermal + wave,
                        element,
                        name,
                        "HOH",
                        Some(mol_idx as i32 + 1),
                        *color,
                    ));
                }
            }
            atoms
        })
        .collect();

    assemble(frames, "water_box_test")
}

/// Alpha-helix backbone (N, CA, C, O per residue) with a breathing radius.
#[must_use]
pub fn helix(num_residues: usize, num_frames: usize) -> TrajectoryDocument {
    const RISE: f32 = 0.15;
    const RADIUS: f32 = 0.23;
    let turn = 100.0 * PI / 180.0;

    let frames = (0..num_frames)
        .map(|frame_idx| {
            let f = frame_idx as f32;
            let breathing = 1.0 + 0.1 * (f * 0.2).sin();
            let r = RADIUS * breathing;
            let mut atoms = Vec::with_capacity(num_residues * 4);
            for res_idx in 0..num_residues {
                let z = res_idx as f32 * RISE;
                let angle = res_idx as f32 * turn;
                let flex = 0.02 * (f * 0.15 + res_idx as f32 * 0.5).sin();
                let ring = |phase: f32| Vec3::new(r * (angle + phase).cos(), r * (angle + phase).sin(), 0.0);
                let residue_index = Some(res_idx as i32 + 1);
                let backbone = [
                    ("N", "N", ring(0.0) + Vec3::new(flex, flex, z), NITROGEN),
                    ("C", "CA", ring(0.3) + Vec3::new(0.0, 0.0, z + 0.05), CARBON),
                    ("C", "C", ring(0.6) + Vec3::new(0.0, 0.0, z + 0.10), CARBON),
                    ("O", "O", ring(0.8) + Vec3::new(0.05, 0.05, z + 0.12), OXYGEN),
                ];
                for (element, name, pos, color) in backbone {
                    atoms.push(record(pos, element, name, "ALA", residue_index, color));
                }
            }
            atoms
        })
        .collect();

    assemble(frames, "protein_helix_test")
}

/// Gold nanocluster on a centered cubic lattice with a radial breathing
/// mode and thermal noise. Particles carry no residue index.
#[must_use]
pub fn nanocluster(num_atoms: usize, num_frames: usize, seed: u64) -> TrajectoryDocument {
    const LATTICE: f32 = 0.4;
    let mut base: Vec<Vec3> = grid_cells(num_atoms)
        .map(|(i, j, k)| Vec3::new(i as f32, j as f32, k as f32) * LATTICE)
        .collect();
    let center = Bounds::from_positions(base.iter().copied()).map_or(Vec3::ZERO, |b| b.center);
    for p in &mut base {
        *p -= center;
    }
    let mut rng = StdRng::seed_from_u64(seed);

    let frames = (0..num_frames)
        .map(|frame_idx| {
            let pulse = 0.05 * (frame_idx as f32 * 0.3).sin();
            base.iter()
                .map(|&p| {
                    let radial = p.normalize_or_zero() * pulse;
                    record(p + radial + jitter(&mut rng, 0.01), "Au", "AU", "AU", None, GOLD)
                })
                .collect()
        })
        .collect();

    assemble(frames, "nanocluster_test")
}

fn assemble(frames: Vec<Vec<ParticleRecord>>, source: &str) -> TrajectoryDocument {
    let bounds = frames.first().and_then(|frame| {
        Bounds::from_positions(frame.iter().map(|r| Vec3::new(r.x, r.y, r.z)))
    });
    TrajectoryDocument {
        metadata: MetadataRecord {
            source: source.into(),
            title: None,
            num_frames: frames.len(),
            num_atoms: frames.first().map_or(0, Vec::len),
            bounds: bounds.map(BoundsRecord::from),
        },
        frames,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::Trajectory;

    #[test]
    fn samples_validate() {
        for kind in [SampleKind::Water, SampleKind::Helix, SampleKind::Nanocluster] {
            let traj = Trajectory::from_document(kind.generate(5, 7)).unwrap();
            assert_eq!(traj.frame_count(), 5);
        }
    }

    #[test]
    fn water_box_has_three_atoms_per_molecule() {
        let doc = water_box(27, 2, 0);
        assert_eq!(doc.metadata.num_atoms, 81);
        assert_eq!(doc.frames[1].len(), 81);
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        assert_eq!(nanocluster(10, 3, 42), nanocluster(10, 3, 42));
    }

    #[test]
    fn helix_breathes_between_frames() {
        let doc = helix(2, 10);
        assert_ne!(doc.frames[0][0].x, doc.frames[5][0].x);
    }
}
