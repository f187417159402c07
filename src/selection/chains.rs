use rustc_hash::{FxHashMap, FxHashSet};

use crate::trajectory::Particle;

/// Maximum number of residue names reported per chain.
pub const TOP_RESIDUES: usize = 5;

/// Inclusive range of residue sequence indices within a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResidueRange {
    /// Smallest residue index.
    pub min: i32,
    /// Largest residue index.
    pub max: i32,
}

/// Summary of one chain in the displayed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainInfo {
    /// Chain identifier.
    pub chain_id: String,
    /// Number of particles carrying this chain id.
    pub atom_count: usize,
    /// Number of distinct residue indices (particles without one are not
    /// counted).
    pub unique_residue_count: usize,
    /// Residue index range; `None` if no particle carries an index.
    pub residue_range: Option<ResidueRange>,
    /// Up to five residue names by descending frequency, ties in order of
    /// first appearance.
    pub top_residues: Vec<String>,
}

impl ChainInfo {
    /// Residue range as `(min, max)`, `(0, 0)` when absent.
    #[must_use]
    pub fn range_or_zero(&self) -> (i32, i32) {
        self.residue_range.map_or((0, 0), |r| (r.min, r.max))
    }
}

/// All chains of a frame, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainGroups {
    chains: Vec<ChainInfo>,
    index: FxHashMap<String, usize>,
}

impl ChainGroups {
    /// Info for `chain_id`, if present in the frame.
    #[must_use]
    pub fn get(&self, chain_id: &str) -> Option<&ChainInfo> {
        self.index.get(chain_id).map(|&i| &self.chains[i])
    }

    /// Chains in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = &ChainInfo> {
        self.chains.iter()
    }

    /// Number of chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// `true` for an empty frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[derive(Default)]
struct Accumulator {
    atom_count: usize,
    residue_indices: FxHashSet<i32>,
    range: Option<ResidueRange>,
    // (name, count) in first-appearance order
    residue_counts: Vec<(String, usize)>,
    residue_slots: FxHashMap<String, usize>,
}

impl Accumulator {
    fn add(&mut self, particle: &Particle) {
        self.atom_count += 1;

        if let Some(idx) = particle.residue_index {
            let _ = self.residue_indices.insert(idx);
            self.range = Some(match self.range {
                Some(r) => ResidueRange {
                    min: r.min.min(idx),
                    max: r.max.max(idx),
                },
                None => ResidueRange { min: idx, max: idx },
            });
        }

        if let Some(&slot) = self.residue_slots.get(&particle.residue) {
            self.residue_counts[slot].1 += 1;
        } else {
            let _ = self
                .residue_slots
                .insert(particle.residue.clone(), self.residue_counts.len());
            self.residue_counts.push((particle.residue.clone(), 1));
        }
    }

    fn finish(self, chain_id: String) -> ChainInfo {
        let mut counts = self.residue_counts;
        // Stable sort keeps first-appearance order among equal counts.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        ChainInfo {
            chain_id,
            atom_count: self.atom_count,
            unique_residue_count: self.residue_indices.len(),
            residue_range: self.range,
            top_residues: counts
                .into_iter()
                .take(TOP_RESIDUES)
                .map(|(name, _)| name)
                .collect(),
        }
    }
}

/// Group a frame's particles by chain in a single pass.
#[must_use]
pub fn compute_groups(frame: &[Particle]) -> ChainGroups {
    let mut order: Vec<String> = Vec::new();
    let mut accumulators: FxHashMap<String, Accumulator> = FxHashMap::default();

    for particle in frame {
        if let Some(acc) = accumulators.get_mut(&particle.chain) {
            acc.add(particle);
        } else {
            let mut acc = Accumulator::default();
            acc.add(particle);
            order.push(particle.chain.clone());
            let _ = accumulators.insert(particle.chain.clone(), acc);
        }
    }

    let mut groups = ChainGroups::default();
    for chain_id in order {
        let Some(acc) = accumulators.remove(&chain_id) else {
            continue;
        };
        let _ = groups.index.insert(chain_id.clone(), groups.chains.len());
        groups.chains.push(acc.finish(chain_id));
    }
    groups
}
