//! GPU compute path.
//!
//! Device acquisition and loss tracking, kernel composition and contract
//! checking, particle buffer management, the update pipeline, and the
//! non-blocking readback path.

/// Particle buffer pair with generation-tagged handles.
pub mod buffers;
/// Adapter probing, device acquisition, and the device-loss subscription.
pub mod device;
/// GPU error taxonomy and fallback policy.
pub mod error;
/// WGSL composition with `#import` support and kernel contract checks.
pub mod kernel;
/// Compute pipeline, binding sets, and dispatch.
pub mod pipeline;
/// Staging copies, async mapping, and frame pacing.
pub mod readback;

pub use buffers::{pack_frame, BufferHandle, BufferManager, GpuParticle};
pub use device::{probe, DeviceContext, DeviceStatus};
pub use error::{Fallback, GpuError, GpuErrorKind, Unavailable};
pub use kernel::{Kernel, KernelSource};
pub use pipeline::{workgroup_count, UpdatePipeline};
pub use readback::{FramePacer, Readback, ReadbackSlot};
