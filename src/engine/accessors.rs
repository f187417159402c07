use std::sync::Arc;

use web_time::Instant;

use super::{ComputeMode, EngineStats, ParticleEngine};
use crate::options::Options;
use crate::playback::PlaybackScheduler;
use crate::render::InstanceSet;
use crate::selection::{ChainGroups, ChainInfo, SelectionEvent, SelectionState};
use crate::trajectory::Trajectory;

// ── Read-only state ──────────────────────────────────────────────────────

impl ParticleEngine {
    /// Current options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The displayed trajectory.
    #[must_use]
    pub fn trajectory(&self) -> Option<&Arc<Trajectory>> {
        self.store.current()
    }

    /// Chain groups of the displayed frame.
    #[must_use]
    pub fn groups(&self) -> &ChainGroups {
        &self.groups
    }

    /// Instance data for the render layer.
    #[must_use]
    pub fn instances(&self) -> &InstanceSet {
        &self.instances
    }

    /// Which path runs the per-frame update.
    #[must_use]
    pub fn mode(&self) -> &ComputeMode {
        &self.mode
    }

    /// Name of the active backend.
    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Running counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Playback state.
    #[must_use]
    pub fn playback(&self) -> &PlaybackScheduler {
        &self.playback
    }

    /// Index of the displayed frame.
    #[must_use]
    pub fn current_frame(&self) -> usize {
        self.playback.current()
    }
}

// ── Selection ────────────────────────────────────────────────────────────

impl ParticleEngine {
    /// Selection state.
    #[must_use]
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Apply a UI selection event.
    pub fn apply_selection(&mut self, event: SelectionEvent) {
        self.selection.apply(event);
        self.refresh_highlight();
    }

    /// Select a chain.
    pub fn select(&mut self, chain_id: &str) {
        self.apply_selection(SelectionEvent::Select(chain_id.to_owned()));
    }

    /// Clear the selection.
    pub fn deselect(&mut self) {
        self.apply_selection(SelectionEvent::Deselect);
    }

    /// Info for the selected chain in the displayed frame.
    #[must_use]
    pub fn selected_info(&self) -> Option<&ChainInfo> {
        self.selection.selected_info(&self.groups)
    }

    /// Info for the hovered chain in the displayed frame.
    #[must_use]
    pub fn hovered_info(&self) -> Option<&ChainInfo> {
        self.selection.hovered_info(&self.groups)
    }

    fn refresh_highlight(&mut self) {
        let Some(trajectory) = self.store.current() else {
            return;
        };
        if let Some(frame) = trajectory.frame(self.playback.current()) {
            self.instances.highlight(
                frame,
                self.selection.selected(),
                self.options.display.unselected_alpha,
            );
        }
    }
}

// ── Playback ─────────────────────────────────────────────────────────────

impl ParticleEngine {
    /// Resume playback.
    pub fn play(&mut self, now: Instant) {
        self.playback.play(now);
    }

    /// Pause playback.
    pub fn pause(&mut self) {
        self.playback.pause();
    }

    /// Toggle playback.
    pub fn toggle_playback(&mut self, now: Instant) {
        self.playback.toggle(now);
    }

    /// Set the playback rate (clamped to >= 0.1 fps).
    pub fn set_fps(&mut self, fps: f32) {
        self.playback.set_fps(fps);
        self.options.playback.fps = self.playback.fps();
    }

    /// Jump to `index` and submit it. Out-of-range indices are ignored.
    pub fn seek(&mut self, index: usize) -> bool {
        if self.playback.seek(index).is_none() {
            return false;
        }
        self.show_frame(index);
        true
    }

    /// Step one frame forward (wrapping) and submit it.
    pub fn step(&mut self) -> Option<usize> {
        let index = self.playback.advance()?;
        self.show_frame(index);
        Some(index)
    }
}
