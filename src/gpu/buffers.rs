//! Device-resident particle storage.
//!
//! The [`BufferManager`] is the sole owner of the input/output buffer pair.
//! Pairs are rebuilt (old buffers destroyed) whenever the particle count
//! changes; same-count frames only rewrite the input buffer. Consumers hold
//! generation-tagged [`BufferHandle`]s which stop resolving after a rebuild.

use super::device::DeviceContext;
use super::error::GpuError;
use super::kernel::WORKGROUP_SIZE;
use crate::trajectory::Particle;

/// One particle as laid out on the device: `[x, y, z, radius]`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuParticle {
    /// Position.
    pub position: [f32; 3],
    /// Display radius.
    pub radius: f32,
}

impl GpuParticle {
    /// Byte size of one element.
    pub const SIZE: u64 = size_of::<Self>() as u64;
}

/// Serialize a frame into the flat device layout.
#[must_use]
pub fn pack_frame(frame: &[Particle], radius_scale: f32) -> Vec<GpuParticle> {
    let mut packed = Vec::with_capacity(frame.len());
    pack_frame_into(frame, radius_scale, &mut packed);
    packed
}

/// As [`pack_frame`], reusing `out`'s allocation.
pub fn pack_frame_into(frame: &[Particle], radius_scale: f32, out: &mut Vec<GpuParticle>) {
    out.clear();
    out.extend(frame.iter().map(|p| GpuParticle {
        position: p.position.to_array(),
        radius: p.radius() * radius_scale,
    }));
}

/// Generation-tagged reference to a [`BufferPair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle {
    generation: u64,
}

impl BufferHandle {
    /// Generation of the pair this handle was issued for.
    #[must_use]
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Input (current positions) and output (updated positions) storage
/// buffers of identical size.
pub struct BufferPair {
    input: wgpu::Buffer,
    output: wgpu::Buffer,
    count: u32,
    generation: u64,
}

impl BufferPair {
    /// Read-only kernel input.
    pub fn input(&self) -> &wgpu::Buffer {
        &self.input
    }

    /// Kernel output; also usable as a vertex/instance source.
    pub fn output(&self) -> &wgpu::Buffer {
        &self.output
    }

    /// Particle count the pair was sized for.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Size of each buffer in bytes.
    pub fn byte_size(&self) -> u64 {
        u64::from(self.count) * GpuParticle::SIZE
    }

    /// Generation stamp.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn destroy(&self) {
        self.input.destroy();
        self.output.destroy();
    }
}

/// Result of [`BufferManager::upload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upload {
    /// Handle to the pair holding the uploaded data.
    pub handle: BufferHandle,
    /// `true` if the pair was (re)created; binding sets must be rebuilt.
    pub rebuilt: bool,
}

/// Owns the particle buffer pair.
#[derive(Default)]
pub struct BufferManager {
    pair: Option<BufferPair>,
    generation: u64,
}

impl BufferManager {
    /// Manager with no buffers allocated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `particles` into the input buffer, rebuilding the pair first
    /// if the particle count changed.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::BufferAllocation`] if the count exceeds what one
    /// dispatch can cover or the device runs out of memory, and
    /// [`GpuError::DeviceLost`] if the device is no longer usable.
    pub fn upload(
        &mut self,
        ctx: &DeviceContext,
        particles: &[GpuParticle],
    ) -> Result<Upload, GpuError> {
        ctx.check()?;
        let count = u32::try_from(particles.len()).map_err(|_| {
            GpuError::BufferAllocation(format!("{} particles exceed u32 range", particles.len()))
        })?;

        let needs_rebuild = self.pair.as_ref().is_none_or(|pair| pair.count != count);
        if needs_rebuild {
            self.rebuild(ctx, count)?;
        }

        let Some(pair) = &self.pair else {
            return Err(GpuError::BufferAllocation("no buffer pair after rebuild".into()));
        };
        if !particles.is_empty() {
            ctx.queue()
                .write_buffer(&pair.input, 0, bytemuck::cast_slice(particles));
        }

        Ok(Upload {
            handle: BufferHandle {
                generation: pair.generation,
            },
            rebuilt: needs_rebuild,
        })
    }

    fn rebuild(&mut self, ctx: &DeviceContext, count: u32) -> Result<(), GpuError> {
        self.release();

        let max_groups = ctx.limits().max_compute_workgroups_per_dimension;
        if count.div_ceil(WORKGROUP_SIZE) > max_groups {
            return Err(GpuError::BufferAllocation(format!(
                "{count} particles exceed the device dispatch limit of {max_groups} workgroups"
            )));
        }

        // Zero-sized storage bindings are invalid; keep at least one element.
        let size = u64::from(count.max(1)) * GpuParticle::SIZE;
        if size > u64::from(ctx.limits().max_storage_buffer_binding_size) {
            return Err(GpuError::BufferAllocation(format!(
                "{size} bytes exceed the storage binding limit"
            )));
        }

        let device = ctx.device();
        // wasm cannot block on the scope; an out-of-memory error there reaches
        // the uncaptured-error handler instead and marks the context lost.
        #[cfg(not(target_arch = "wasm32"))]
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let input = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Input Buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let output = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Output Buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });
        // Error scopes resolve immediately on native backends.
        #[cfg(not(target_arch = "wasm32"))]
        {
            if let Some(error) = pollster::block_on(device.pop_error_scope()) {
                input.destroy();
                output.destroy();
                return Err(GpuError::BufferAllocation(error.to_string()));
            }
        }

        self.generation += 1;
        log::debug!(
            "allocated particle buffers: {count} particles, {size} bytes each (generation {})",
            self.generation
        );
        self.pair = Some(BufferPair {
            input,
            output,
            count,
            generation: self.generation,
        });
        Ok(())
    }

    /// The pair `handle` refers to, or `None` if it has been rebuilt or
    /// released since the handle was issued.
    pub fn resolve(&self, handle: BufferHandle) -> Option<&BufferPair> {
        self.pair
            .as_ref()
            .filter(|pair| pair.generation == handle.generation)
    }

    /// The live pair, if any.
    pub fn current(&self) -> Option<&BufferPair> {
        self.pair.as_ref()
    }

    /// Current generation (0 before the first allocation).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Destroy the buffers. Outstanding handles stop resolving.
    pub fn release(&mut self) {
        if let Some(pair) = self.pair.take() {
            pair.destroy();
            // A released pair never resolves again, even if the next
            // allocation has the same count.
            self.generation += 1;
        }
    }
}

impl Drop for BufferManager {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::options::ComputeOptions;

    fn particle(element: &str, x: f32) -> Particle {
        Particle {
            position: Vec3::new(x, 1.0, 2.0),
            element: element.into(),
            name: element.into(),
            chain: "A".into(),
            residue: "ALA".into(),
            residue_index: Some(1),
            color: [1.0; 3],
        }
    }

    #[test]
    fn particle_layout_is_four_floats() {
        assert_eq!(GpuParticle::SIZE, 16);
    }

    #[test]
    fn pack_writes_position_and_scaled_radius() {
        let frame = vec![particle("C", 3.0), particle("H", -1.0)];
        let packed = pack_frame(&frame, 0.5);
        assert_eq!(packed.len(), 2);
        assert_eq!(packed[0].position, [3.0, 1.0, 2.0]);
        assert_eq!(packed[0].radius, 1.70 * 0.5);
        assert_eq!(packed[1].radius, 1.10 * 0.5);
    }

    #[test]
    fn pack_into_reuses_buffer() {
        let mut out = pack_frame(&vec![particle("C", 0.0); 4], 1.0);
        pack_frame_into(&[particle("O", 5.0)], 1.0, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].position[0], 5.0);
    }

    /// `None` (test skipped) when the machine has no usable adapter.
    #[allow(clippy::print_stderr)]
    fn context() -> Option<DeviceContext> {
        match pollster::block_on(DeviceContext::acquire(&ComputeOptions::default())) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                eprintln!("skipping GPU test: {e}");
                None
            }
        }
    }

    fn particles(count: usize) -> Vec<GpuParticle> {
        (0..count)
            .map(|i| GpuParticle {
                position: [i as f32, 0.0, 0.0],
                radius: 1.0,
            })
            .collect()
    }

    #[test]
    fn same_count_reuses_pair_and_new_count_rebuilds() {
        let Some(ctx) = context() else {
            return;
        };
        let mut manager = BufferManager::new();

        let first = manager.upload(&ctx, &particles(100)).unwrap();
        assert!(first.rebuilt);
        assert_eq!(manager.current().map(BufferPair::count), Some(100));

        let again = manager.upload(&ctx, &particles(100)).unwrap();
        assert!(!again.rebuilt);
        assert_eq!(again.handle, first.handle);
        assert!(manager.resolve(first.handle).is_some());

        let grown = manager.upload(&ctx, &particles(101)).unwrap();
        assert!(grown.rebuilt);
        assert!(grown.handle.generation() > first.handle.generation());
        assert!(manager.resolve(first.handle).is_none());
        assert_eq!(
            manager.resolve(grown.handle).map(BufferPair::byte_size),
            Some(101 * GpuParticle::SIZE)
        );

        manager.release();
        assert!(manager.current().is_none());
        assert!(manager.resolve(grown.handle).is_none());
    }

    #[test]
    fn handles_from_unallocated_manager_never_resolve() {
        let manager = BufferManager::new();
        assert!(manager.resolve(BufferHandle { generation: 0 }).is_none());
        assert!(manager.current().is_none());
    }
}
