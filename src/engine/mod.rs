//! The particle engine: owns the trajectory, the compute backend, playback,
//! selection and the render representation, and drives the per-frame loop.
//!
//! Device failures stop here. Any [`GpuError`] from the backend releases it,
//! switches to [`HostBackend`], and is recorded in [`ComputeMode`]; nothing
//! propagates to the caller of [`ParticleEngine::update`].

mod accessors;
/// Compute backend trait and the host implementation.
pub mod backend;
/// wgpu-backed compute backend.
pub mod gpu_backend;

use std::path::Path;
use std::sync::Arc;

pub use backend::{ComputeBackend, FrameId, FrameResult, HostBackend, Submission};
pub use gpu_backend::GpuBackend;
use web_time::Instant;

use crate::error::AtomstreamError;
use crate::gpu::buffers::pack_frame_into;
use crate::gpu::{Fallback, GpuError, GpuErrorKind, GpuParticle};
use crate::options::Options;
use crate::playback::PlaybackScheduler;
use crate::render::InstanceSet;
use crate::selection::{compute_groups, ChainGroups, SelectionState};
use crate::trajectory::{Trajectory, TrajectoryDocument, TrajectoryError, TrajectoryStore};

/// Which path runs the per-frame update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputeMode {
    /// A device-backed backend.
    Gpu {
        /// Backend name (adapter and graphics API).
        adapter: String,
    },
    /// The host fallback.
    Host {
        /// Failure that caused the fallback; `None` when the host path was
        /// chosen explicitly.
        cause: Option<GpuErrorKind>,
        /// Whether [`ParticleEngine::recover`] may retry the GPU path.
        recoverable: bool,
    },
}

impl ComputeMode {
    fn after(error: &GpuError) -> Self {
        Self::Host {
            cause: Some(error.kind()),
            recoverable: error.fallback() == Fallback::UntilRecovered,
        }
    }

    fn of(backend: &dyn ComputeBackend) -> Self {
        if backend.is_gpu() {
            Self::Gpu {
                adapter: backend.name().to_owned(),
            }
        } else {
            Self::Host {
                cause: None,
                recoverable: true,
            }
        }
    }
}

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Updates issued to a backend.
    pub submitted: u64,
    /// Updates dropped because one was still outstanding.
    pub skipped: u64,
    /// Updates applied to the instance set.
    pub completed: u64,
    /// Completed updates rejected as stale or inconsistent.
    pub discarded: u64,
    /// Switches to the host fallback.
    pub fallbacks: u64,
}

/// What happened during one [`ParticleEngine::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// New playback position, if playback advanced.
    pub advanced_to: Option<usize>,
    /// Frame whose data was applied to the instance set.
    pub presented: Option<usize>,
    /// Set if the backend failed (during this update or since the last one)
    /// and the engine fell back to the host path.
    pub fallback: Option<GpuErrorKind>,
}

/// Single owner of every per-session component.
pub struct ParticleEngine {
    options: Options,
    store: TrajectoryStore,
    backend: Box<dyn ComputeBackend>,
    mode: ComputeMode,
    playback: PlaybackScheduler,
    selection: SelectionState,
    groups: ChainGroups,
    instances: InstanceSet,
    packed: Vec<GpuParticle>,
    stats: EngineStats,
    /// The current frame's submission was skipped and must be retried.
    behind: bool,
    /// Fallback not yet surfaced through a [`FrameReport`].
    unreported: Option<GpuErrorKind>,
}

impl ParticleEngine {
    /// Engine using the GPU backend when it can be set up, the host backend
    /// otherwise.
    pub async fn new(options: Options) -> Self {
        let backend: Box<dyn ComputeBackend> = match GpuBackend::new(&options.compute).await {
            Ok(gpu) => Box::new(gpu),
            Err(e) => {
                log::warn!("GPU compute unavailable, using host path: {e}");
                let mut engine = Self::with_backend(options, Box::new(HostBackend::new()));
                engine.mode = ComputeMode::after(&e);
                return engine;
            }
        };
        Self::with_backend(options, backend)
    }

    /// Engine driving an explicit backend.
    #[must_use]
    pub fn with_backend(options: Options, backend: Box<dyn ComputeBackend>) -> Self {
        let mode = ComputeMode::of(backend.as_ref());
        log::info!("compute backend: {}", backend.name());
        Self {
            playback: PlaybackScheduler::new(options.playback.fps),
            options,
            store: TrajectoryStore::new(),
            backend,
            mode,
            selection: SelectionState::new(),
            groups: ChainGroups::default(),
            instances: InstanceSet::new(),
            packed: Vec::new(),
            stats: EngineStats::default(),
            behind: false,
            unreported: None,
        }
    }

    /// Validate and display a decoded document.
    ///
    /// # Errors
    ///
    /// Returns the validation error; the previous trajectory stays
    /// displayed.
    pub fn load_document(
        &mut self,
        doc: TrajectoryDocument,
        now: Instant,
    ) -> Result<(), TrajectoryError> {
        let trajectory = self.store.replace(doc)?;
        self.on_loaded(&trajectory, now);
        Ok(())
    }

    /// Decode, validate and display a JSON document.
    ///
    /// # Errors
    ///
    /// As [`Trajectory::from_json`]; the previous trajectory stays
    /// displayed.
    pub fn load_json(&mut self, json: &str, now: Instant) -> Result<(), TrajectoryError> {
        let trajectory = Trajectory::from_json(json)?;
        self.load_trajectory(trajectory, now);
        Ok(())
    }

    /// Read, validate and display a JSON trajectory file.
    ///
    /// # Errors
    ///
    /// As [`Trajectory::load`]; the previous trajectory stays displayed.
    pub fn load_path(&mut self, path: &Path, now: Instant) -> Result<(), TrajectoryError> {
        let trajectory = Trajectory::load(path)?;
        self.load_trajectory(trajectory, now);
        Ok(())
    }

    /// Display an already-validated trajectory.
    pub fn load_trajectory(&mut self, trajectory: Trajectory, now: Instant) {
        let trajectory = self.store.install(trajectory);
        self.on_loaded(&trajectory, now);
    }

    fn on_loaded(&mut self, trajectory: &Arc<Trajectory>, now: Instant) {
        self.selection.reset();
        self.playback.load(trajectory.frame_count(), now);
        if !self.options.playback.autoplay {
            self.playback.pause();
        }
        if let Some(frame) = trajectory.frame(0) {
            self.instances
                .rebuild(frame, 0, self.options.display.radius_scale);
            self.groups = compute_groups(frame);
        }
        self.submit_frame(0);
    }

    /// Run one iteration of the frame loop: collect a finished update,
    /// advance playback if due and submit the new frame (or retry a skipped
    /// one), then apply anything that completed meanwhile.
    ///
    /// A fallback raised outside `update` (during a load, seek or backend
    /// swap) is reported by the next call.
    pub fn update(&mut self, now: Instant) -> FrameReport {
        // Collect first so a finished readback frees the backend for this
        // frame's submission.
        let mut report = FrameReport {
            presented: self.collect(),
            ..FrameReport::default()
        };
        if let Some(index) = self.playback.tick(now) {
            report.advanced_to = Some(index);
            self.show_frame(index);
        } else if self.behind {
            log::debug!("resubmitting skipped frame {}", self.playback.current());
            self.submit_frame(self.playback.current());
        }
        if let Some(index) = self.collect() {
            report.presented = Some(index);
        }
        report.fallback = self.unreported.take();
        report
    }

    /// Recompute groups for `index` and submit it.
    fn show_frame(&mut self, index: usize) {
        let Some(trajectory) = self.store.current().cloned() else {
            return;
        };
        if let Some(frame) = trajectory.frame(index) {
            self.groups = compute_groups(frame);
            self.submit_frame(index);
        }
    }

    /// Pack and submit frame `index`. A skipped submission is retried by
    /// the next [`update`](Self::update) that finds the backend free.
    fn submit_frame(&mut self, index: usize) {
        let Some(trajectory) = self.store.current().cloned() else {
            return;
        };
        let Some(frame) = trajectory.frame(index) else {
            return;
        };
        pack_frame_into(frame, self.options.display.radius_scale, &mut self.packed);
        let id = FrameId {
            trajectory: self.store.generation(),
            index,
        };
        match self.backend.submit(id, &self.packed) {
            Ok(Submission::Dispatched) => {
                self.stats.submitted += 1;
                self.behind = false;
            }
            Ok(Submission::Skipped) => {
                self.stats.skipped += 1;
                self.behind = true;
            }
            Err(e) => self.fall_back(&e),
        }
    }

    /// Poll the backend and apply a completed update. Returns the index of
    /// the frame now presented, if any.
    fn collect(&mut self) -> Option<usize> {
        let result = match self.backend.poll() {
            Ok(result) => result?,
            Err(e) => {
                self.fall_back(&e);
                return None;
            }
        };

        if result.frame.trajectory != self.store.generation() {
            log::debug!("discarding update from a previous trajectory");
            self.stats.discarded += 1;
            return None;
        }
        if self
            .instances
            .apply(result.frame.index, &result.particles)
        {
            self.stats.completed += 1;
            Some(result.frame.index)
        } else {
            self.stats.discarded += 1;
            None
        }
    }

    /// Release the failing backend and continue on the host path. The
    /// failed frame is not re-rendered; the instance set keeps its last
    /// good data until the next frame completes.
    fn fall_back(&mut self, error: &GpuError) {
        log::warn!(
            "{} backend failed ({error}); falling back to host path",
            self.backend.name()
        );
        self.backend.release();
        self.backend = Box::new(HostBackend::new());
        self.mode = ComputeMode::after(error);
        self.stats.fallbacks += 1;
        self.behind = false;
        self.unreported = Some(error.kind());
    }

    /// Retry the GPU path after a recoverable fallback.
    ///
    /// # Errors
    ///
    /// Returns [`AtomstreamError::Gpu`] if the fallback was caused by a
    /// kernel error (GPU disabled for the session) or acquisition fails
    /// again.
    pub async fn recover(&mut self) -> Result<(), AtomstreamError> {
        match &self.mode {
            ComputeMode::Gpu { .. } => return Ok(()),
            ComputeMode::Host {
                recoverable: false, ..
            } => {
                return Err(GpuError::KernelCompile(
                    "update kernel failed; GPU disabled for this session".into(),
                )
                .into());
            }
            ComputeMode::Host { .. } => {}
        }

        match GpuBackend::new(&self.options.compute).await {
            Ok(gpu) => {
                log::info!("GPU compute recovered");
                self.set_backend(Box::new(gpu));
                Ok(())
            }
            Err(e) => {
                log::warn!("GPU recovery failed: {e}");
                self.mode = ComputeMode::after(&e);
                Err(e.into())
            }
        }
    }

    /// Replace the backend, releasing the old one, and resubmit the current
    /// frame.
    pub fn set_backend(&mut self, backend: Box<dyn ComputeBackend>) {
        self.backend.release();
        self.mode = ComputeMode::of(backend.as_ref());
        self.backend = backend;
        self.submit_frame(self.playback.current());
    }

    /// Cancel playback and release backend resources.
    pub fn shutdown(&mut self) {
        self.playback.cancel();
        self.backend.release();
        log::info!("engine shut down");
    }
}
