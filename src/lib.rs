// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! GPU-streamed playback of 3D particle and atom trajectories.
//!
//! atomstream takes precomputed simulation frames and streams them through
//! a compute-and-render pipeline: each displayed frame is written to a
//! device buffer, run through a pluggable update kernel, and read back into
//! a host-side instance set that a renderer draws as impostor spheres. The
//! current frame is also grouped by chain for interactive selection.
//!
//! # Key entry points
//!
//! - [`engine::ParticleEngine`] - owns every component and drives the frame
//!   loop
//! - [`trajectory::Trajectory`] - validated frames plus metadata, decoded
//!   from a JSON [`trajectory::TrajectoryDocument`]
//! - [`selection`] - chain grouping and hover/selection state
//! - [`options::Options`] - runtime configuration (playback, compute,
//!   display)
//!
//! # Architecture
//!
//! A single thread drives the per-frame task. On frame change the engine
//! packs the frame, uploads it, dispatches the kernel and requests an
//! asynchronous readback; completed readbacks are applied on later updates.
//! At most one readback is outstanding, so a slow device drops frames
//! rather than queueing them. Any device failure (no adapter, device loss,
//! out of memory, kernel error) switches the engine to a host
//! implementation of the same update without interrupting playback.

pub mod engine;
pub mod error;
pub mod gpu;
pub mod options;
pub mod playback;
pub mod render;
pub mod selection;
pub mod trajectory;

pub use engine::ParticleEngine;
pub use error::AtomstreamError;
pub use options::Options;
