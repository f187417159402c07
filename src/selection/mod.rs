//! Chain grouping of the displayed frame and the hover/selection state
//! that refers to it.
//!
//! Groups are recomputed whenever the displayed frame changes; selection
//! state stores chain ids only and resolves them against the latest groups.

mod chains;
mod state;

pub use chains::{compute_groups, ChainGroups, ChainInfo, ResidueRange, TOP_RESIDUES};
pub use state::{SelectionEvent, SelectionState};
