use crate::gpu::{GpuError, GpuParticle};

/// Identifies a submitted frame: which trajectory load it belongs to and
/// its index within that trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameId {
    /// Trajectory store generation at submission time.
    pub trajectory: u64,
    /// Frame index within the trajectory.
    pub index: usize,
}

/// Outcome of [`ComputeBackend::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The update was issued; a result will arrive through `poll`.
    Dispatched,
    /// The previous update is still outstanding; this one was dropped.
    Skipped,
}

/// A completed update.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    /// Frame the particles were produced from.
    pub frame: FrameId,
    /// Updated particles in index order.
    pub particles: Vec<GpuParticle>,
}

/// A device that runs the per-frame particle update.
///
/// The engine drives exactly one backend at a time from a single thread.
/// Errors returned by `submit` or `poll` make the engine release the
/// backend and fall back to [`HostBackend`].
pub trait ComputeBackend {
    /// Human-readable backend name for logs and status display.
    fn name(&self) -> &str;

    /// `true` for device-backed implementations.
    fn is_gpu(&self) -> bool {
        false
    }

    /// Issue the update for one frame.
    ///
    /// # Errors
    ///
    /// Any [`GpuError`]; the engine treats it as a fallback trigger.
    fn submit(
        &mut self,
        frame: FrameId,
        particles: &[GpuParticle],
    ) -> Result<Submission, GpuError>;

    /// Collect a completed update without blocking.
    ///
    /// # Errors
    ///
    /// Any [`GpuError`]; the engine treats it as a fallback trigger.
    fn poll(&mut self) -> Result<Option<FrameResult>, GpuError>;

    /// Drop outstanding work and free device resources. Idempotent.
    fn release(&mut self);
}

/// CPU implementation of the identity update. Completes synchronously, so
/// a submitted frame is available on the next `poll`.
#[derive(Debug, Default)]
pub struct HostBackend {
    ready: Option<FrameResult>,
}

impl HostBackend {
    /// Idle host backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ComputeBackend for HostBackend {
    fn name(&self) -> &str {
        "host"
    }

    fn submit(
        &mut self,
        frame: FrameId,
        particles: &[GpuParticle],
    ) -> Result<Submission, GpuError> {
        // A newer frame supersedes an uncollected one.
        self.ready = Some(FrameResult {
            frame,
            particles: particles.to_vec(),
        });
        Ok(Submission::Dispatched)
    }

    fn poll(&mut self) -> Result<Option<FrameResult>, GpuError> {
        Ok(self.ready.take())
    }

    fn release(&mut self) {
        self.ready = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_backend_passes_particles_through() {
        let mut backend = HostBackend::new();
        let frame = FrameId {
            trajectory: 1,
            index: 3,
        };
        let particles = [GpuParticle {
            position: [1.0, 2.0, 3.0],
            radius: 0.4,
        }];
        assert_eq!(backend.submit(frame, &particles).unwrap(), Submission::Dispatched);

        let result = backend.poll().unwrap().unwrap();
        assert_eq!(result.frame, frame);
        assert_eq!(result.particles, particles);
        assert!(backend.poll().unwrap().is_none());
    }

    #[test]
    fn release_drops_uncollected_result() {
        let mut backend = HostBackend::new();
        let frame = FrameId {
            trajectory: 1,
            index: 0,
        };
        let _ = backend.submit(frame, &[]).unwrap();
        backend.release();
        assert!(backend.poll().unwrap().is_none());
        assert!(!backend.is_gpu());
    }
}
