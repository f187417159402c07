//! Fixed-interval trajectory playback.

mod scheduler;

pub use scheduler::PlaybackScheduler;
