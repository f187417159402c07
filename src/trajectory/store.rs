use std::sync::Arc;

use super::{Trajectory, TrajectoryDocument, TrajectoryError};

/// Holds the currently loaded trajectory.
///
/// Replacement is all-or-nothing: a document is fully validated before the
/// swap, so a rejected load leaves the previous trajectory in place.
#[derive(Debug, Default)]
pub struct TrajectoryStore {
    current: Option<Arc<Trajectory>>,
    generation: u64,
}

impl TrajectoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `doc` and, on success, make it the current trajectory.
    ///
    /// # Errors
    ///
    /// Returns the validation error without touching the current
    /// trajectory.
    pub fn replace(
        &mut self,
        doc: TrajectoryDocument,
    ) -> Result<Arc<Trajectory>, TrajectoryError> {
        let trajectory = Trajectory::from_document(doc)?;
        Ok(self.install(trajectory))
    }

    /// Install an already-validated trajectory.
    pub fn install(&mut self, trajectory: Trajectory) -> Arc<Trajectory> {
        let shared = trajectory.into_shared();
        self.current = Some(Arc::clone(&shared));
        self.generation += 1;
        log::info!(
            "loaded trajectory '{}' ({} frames, {} particles)",
            shared.metadata().title,
            shared.frame_count(),
            shared.particle_count()
        );
        shared
    }

    /// Shared handle to the current trajectory.
    #[must_use]
    pub fn current(&self) -> Option<&Arc<Trajectory>> {
        self.current.as_ref()
    }

    /// Bumped on every successful replacement.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::synth;

    #[test]
    fn failed_replace_keeps_previous_trajectory() {
        let mut store = TrajectoryStore::new();
        let first = store.replace(synth::water_box(8, 3, 1)).unwrap();
        let generation = store.generation();

        let mut bad = synth::water_box(8, 3, 2);
        let _ = bad.frames[1].pop();
        assert!(store.replace(bad).is_err());

        let current = store.current().unwrap();
        assert!(Arc::ptr_eq(current, &first));
        assert_eq!(store.generation(), generation);
    }

    #[test]
    fn successful_replace_bumps_generation() {
        let mut store = TrajectoryStore::new();
        let _ = store.replace(synth::water_box(8, 2, 1)).unwrap();
        let _ = store.replace(synth::helix(4, 2)).unwrap();
        assert_eq!(store.generation(), 2);
        assert_eq!(store.current().unwrap().particle_count(), 16);
    }
}
