use web_time::{Duration, Instant};

const MIN_FPS: f32 = 0.1;

/// Fixed-cadence frame sequencer. Loops at the end of the trajectory.
///
/// Time is passed in by the caller so the scheduler never reads the clock
/// itself. While playing, a deadline is armed; [`tick`](Self::tick) advances
/// at most one frame per call and re-arms relative to the call time, so a
/// stalled caller never triggers a burst of catch-up frames.
#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    frame_count: usize,
    current: usize,
    interval: Duration,
    fps: f32,
    deadline: Option<Instant>,
}

impl PlaybackScheduler {
    /// Stopped scheduler with no frames, advancing at `fps` once loaded.
    #[must_use]
    pub fn new(fps: f32) -> Self {
        let mut scheduler = Self {
            frame_count: 0,
            current: 0,
            interval: Duration::ZERO,
            fps: 0.0,
            deadline: None,
        };
        scheduler.set_fps(fps);
        scheduler
    }

    /// Start a new trajectory: index 0, playing.
    pub fn load(&mut self, frame_count: usize, now: Instant) {
        self.frame_count = frame_count;
        self.current = 0;
        self.deadline = None;
        self.play(now);
    }

    /// Advance if the deadline has passed. Returns the new index on a step.
    pub fn tick(&mut self, now: Instant) -> Option<usize> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = Some(now + self.interval);
        if self.frame_count < 2 {
            return None;
        }
        self.advance()
    }

    /// Step one frame forward, wrapping to 0 after the last frame.
    pub fn advance(&mut self) -> Option<usize> {
        if self.frame_count == 0 {
            return None;
        }
        self.current = (self.current + 1) % self.frame_count;
        Some(self.current)
    }

    /// Jump to `index`. Out-of-range indices are ignored.
    pub fn seek(&mut self, index: usize) -> Option<usize> {
        if index >= self.frame_count {
            return None;
        }
        self.current = index;
        Some(index)
    }

    /// Resume playback; the next step is one interval after `now`.
    pub fn play(&mut self, now: Instant) {
        if self.frame_count > 0 {
            self.deadline = Some(now + self.interval);
        }
    }

    /// Stop advancing.
    pub fn pause(&mut self) {
        self.deadline = None;
    }

    /// Toggle between playing and paused.
    pub fn toggle(&mut self, now: Instant) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play(now);
        }
    }

    /// Set the playback rate (clamped to >= 0.1 fps). Takes effect from the
    /// next re-arm.
    pub fn set_fps(&mut self, fps: f32) {
        self.fps = fps.max(MIN_FPS);
        self.interval = Duration::from_secs_f64(1.0 / f64::from(self.fps));
    }

    /// Clear the pending deadline on teardown. Nothing advances until
    /// [`play`](Self::play) or [`load`](Self::load) re-arms it.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            log::debug!("playback cancelled at frame {}", self.current);
        }
    }

    /// Index of the current frame.
    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    /// Number of frames in the loaded trajectory.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Whether a deadline is armed.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.deadline.is_some()
    }

    /// Effective frames per second.
    #[must_use]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Time between steps.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn load_starts_playing_at_zero() {
        let t0 = Instant::now();
        let mut s = PlaybackScheduler::new(10.0);
        s.load(5, t0);
        assert_eq!(s.current(), 0);
        assert!(s.is_playing());
        assert_eq!(s.tick(t0 + ms(50)), None);
        assert_eq!(s.tick(t0 + ms(100)), Some(1));
    }

    #[test]
    fn wraps_from_last_frame_to_first() {
        let mut s = PlaybackScheduler::new(10.0);
        s.load(5, Instant::now());
        assert_eq!(s.seek(4), Some(4));
        assert_eq!(s.advance(), Some(0));
    }

    #[test]
    fn late_tick_advances_only_once() {
        let t0 = Instant::now();
        let mut s = PlaybackScheduler::new(10.0);
        s.load(10, t0);
        let late = t0 + ms(1_000);
        assert_eq!(s.tick(late), Some(1));
        assert_eq!(s.tick(late), None);
        assert_eq!(s.tick(late + ms(100)), Some(2));
    }

    #[test]
    fn no_advance_after_cancel_until_replayed() {
        let t0 = Instant::now();
        let mut s = PlaybackScheduler::new(10.0);
        s.load(3, t0);
        s.cancel();
        assert!(!s.is_playing());
        assert_eq!(s.tick(t0 + ms(500)), None);
        assert_eq!(s.current(), 0);

        s.play(t0 + ms(500));
        assert_eq!(s.tick(t0 + ms(600)), Some(1));
    }

    #[test]
    fn toggle_pauses_and_resumes() {
        let t0 = Instant::now();
        let mut s = PlaybackScheduler::new(10.0);
        s.load(3, t0);
        s.toggle(t0);
        assert!(!s.is_playing());
        s.toggle(t0);
        assert!(s.is_playing());
    }

    #[test]
    fn fps_is_clamped() {
        let mut s = PlaybackScheduler::new(0.0);
        assert_eq!(s.fps(), 0.1);
        s.set_fps(-3.0);
        assert_eq!(s.fps(), 0.1);
        s.set_fps(4.0);
        assert_eq!(s.interval(), ms(250));
    }

    #[test]
    fn seek_out_of_range_is_ignored() {
        let mut s = PlaybackScheduler::new(10.0);
        s.load(2, Instant::now());
        assert_eq!(s.seek(2), None);
        assert_eq!(s.current(), 0);
    }

    #[test]
    fn empty_trajectory_never_plays() {
        let t0 = Instant::now();
        let mut s = PlaybackScheduler::new(10.0);
        s.load(0, t0);
        assert!(!s.is_playing());
        assert_eq!(s.advance(), None);
        assert_eq!(s.tick(t0 + ms(1_000)), None);
    }
}
