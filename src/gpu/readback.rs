//! Non-blocking readback of updated particle positions.
//!
//! Each frame copies the output buffer into a transient staging buffer which
//! is mapped asynchronously. The map callback only flips an atomic flag; the
//! dispatching thread observes completion by polling, so nothing blocks the
//! frame loop. At most one readback is outstanding at a time ([`FramePacer`]).

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::buffers::{BufferPair, GpuParticle};
use super::device::DeviceContext;
use super::error::GpuError;

const MAP_PENDING: u8 = 0;
const MAP_READY: u8 = 1;
const MAP_FAILED: u8 = 2;

/// The single in-flight flag for dispatch + readback.
///
/// A dispatch that arrives while a readback is outstanding is dropped, not
/// queued; the drop is counted.
#[derive(Debug, Default)]
pub struct FramePacer {
    in_flight: bool,
    skipped: u64,
}

impl FramePacer {
    /// Idle pacer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot. Returns `false` (and counts a skip) if a readback is
    /// still outstanding.
    pub fn try_begin(&mut self) -> bool {
        if self.in_flight {
            self.skipped += 1;
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Free the slot after a readback completed or was cancelled.
    pub fn complete(&mut self) {
        self.in_flight = false;
    }

    /// Whether a readback is outstanding.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Dispatches dropped because the slot was busy.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

/// A staging buffer holding a recorded copy of the output buffer.
pub struct Staging {
    buffer: wgpu::Buffer,
    generation: u64,
    count: u32,
}

/// Positions read back from the device for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Readback {
    /// Trajectory frame the data was produced from.
    pub frame_index: usize,
    /// Buffer generation the data was copied out of.
    pub generation: u64,
    /// Updated particles in index order.
    pub particles: Vec<GpuParticle>,
}

struct Pending {
    staging: Staging,
    frame_index: usize,
    status: Arc<AtomicU8>,
}

impl Pending {
    fn discard(self) {
        if self.status.load(Ordering::Acquire) == MAP_READY {
            self.staging.buffer.unmap();
        }
        self.staging.buffer.destroy();
    }
}

/// Holds the one outstanding readback, if any.
#[derive(Default)]
pub struct ReadbackSlot {
    pending: Option<Pending>,
}

impl ReadbackSlot {
    /// Empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a staging buffer and record a copy of `pair`'s output into
    /// it. Call [`begin`](Self::begin) once the encoder has been submitted.
    pub fn encode_copy(
        ctx: &DeviceContext,
        encoder: &mut wgpu::CommandEncoder,
        pair: &BufferPair,
    ) -> Staging {
        let size = pair.byte_size().max(GpuParticle::SIZE);
        let buffer = ctx.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Readback Staging"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        if pair.count() > 0 {
            encoder.copy_buffer_to_buffer(pair.output(), 0, &buffer, 0, pair.byte_size());
        }
        Staging {
            buffer,
            generation: pair.generation(),
            count: pair.count(),
        }
    }

    /// Request mapping of `staging` (after the copy was submitted).
    ///
    /// Any previous readback still held by the slot is discarded first.
    pub fn begin(&mut self, staging: Staging, frame_index: usize) {
        self.cancel();

        let status = Arc::new(AtomicU8::new(MAP_PENDING));
        let flag = Arc::clone(&status);
        staging
            .buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| {
                let value = if result.is_ok() { MAP_READY } else { MAP_FAILED };
                flag.store(value, Ordering::Release);
            });

        self.pending = Some(Pending {
            staging,
            frame_index,
            status,
        });
    }

    /// Whether a readback is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Try to complete the readback without blocking.
    ///
    /// Returns `Ok(None)` when nothing is pending or the mapping has not
    /// finished yet.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::DeviceLost`] if the mapping failed or the device
    /// is gone. The staging buffer is released either way.
    pub fn poll(&mut self, ctx: &DeviceContext) -> Result<Option<Readback>, GpuError> {
        if self.pending.is_none() {
            return Ok(None);
        }
        if let Err(e) = ctx.check() {
            self.cancel();
            return Err(e);
        }

        let _ = ctx.device().poll(wgpu::PollType::Poll);

        let status = self
            .pending
            .as_ref()
            .map_or(MAP_PENDING, |p| p.status.load(Ordering::Acquire));
        match status {
            MAP_PENDING => Ok(None),
            MAP_FAILED => {
                self.cancel();
                ctx.mark_lost("readback mapping failed");
                Err(GpuError::DeviceLost("readback mapping failed".into()))
            }
            _ => Ok(self.pending.take().map(read_mapped)),
        }
    }

    /// Drop the outstanding readback, unmapping and destroying its staging
    /// buffer.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.discard();
        }
    }
}

impl Drop for ReadbackSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn read_mapped(pending: Pending) -> Readback {
    let Pending {
        staging,
        frame_index,
        ..
    } = pending;
    let byte_len = u64::from(staging.count) * GpuParticle::SIZE;
    let particles = {
        let data = staging.buffer.slice(..byte_len.max(GpuParticle::SIZE)).get_mapped_range();
        // Copy out element-wise; the mapped range carries no alignment
        // guarantee for the target type.
        let particles: Vec<GpuParticle> = data[..byte_len as usize]
            .chunks_exact(GpuParticle::SIZE as usize)
            .map(bytemuck::pod_read_unaligned)
            .collect();
        particles
    };
    staging.buffer.unmap();
    staging.buffer.destroy();
    Readback {
        frame_index,
        generation: staging.generation,
        particles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacer_allows_one_outstanding_readback() {
        let mut pacer = FramePacer::new();
        assert!(pacer.try_begin());
        assert!(pacer.is_busy());
        assert!(!pacer.try_begin());
        assert!(!pacer.try_begin());
        assert_eq!(pacer.skipped(), 2);

        pacer.complete();
        assert!(!pacer.is_busy());
        assert!(pacer.try_begin());
        assert_eq!(pacer.skipped(), 2);
    }

    #[test]
    fn empty_slot_is_idle() {
        let mut slot = ReadbackSlot::new();
        assert!(!slot.is_pending());
        slot.cancel();
        assert!(!slot.is_pending());
    }
}
