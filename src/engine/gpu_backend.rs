use super::backend::{ComputeBackend, FrameId, FrameResult, Submission};
use crate::gpu::pipeline::BindingSet;
use crate::gpu::readback::ReadbackSlot;
use crate::gpu::{
    BufferManager, DeviceContext, FramePacer, GpuError, GpuParticle, Kernel, KernelSource,
    UpdatePipeline,
};
use crate::options::ComputeOptions;

/// Runs the update kernel on a wgpu device.
///
/// Per frame: write input buffer, dispatch, copy output to staging, submit,
/// request mapping. One frame is in flight at a time; submissions made
/// while it is outstanding are skipped.
pub struct GpuBackend {
    ctx: DeviceContext,
    pipeline: UpdatePipeline,
    buffers: BufferManager,
    bindings: Option<BindingSet>,
    readback: ReadbackSlot,
    pacer: FramePacer,
    in_flight: Option<FrameId>,
    name: String,
}

impl GpuBackend {
    /// Compile the configured kernel, acquire a device and build the
    /// pipeline.
    ///
    /// # Errors
    ///
    /// [`GpuError::KernelCompile`] if the kernel is unreadable or invalid,
    /// [`GpuError::DeviceUnavailable`] if no device can be acquired.
    pub async fn new(options: &ComputeOptions) -> Result<Self, GpuError> {
        // Kernel errors do not need a device, so report them first.
        let kernel = Kernel::compile(&KernelSource::from_options(options)?)?;
        let ctx = DeviceContext::acquire(options).await?;
        let pipeline = UpdatePipeline::build(&ctx, &kernel).await?;
        let name = format!("{} ({:?})", ctx.info().name, ctx.info().backend);
        Ok(Self {
            ctx,
            pipeline,
            buffers: BufferManager::new(),
            bindings: None,
            readback: ReadbackSlot::new(),
            pacer: FramePacer::new(),
            in_flight: None,
            name,
        })
    }

    /// The device context (for render layers sharing the device).
    pub fn context(&self) -> &DeviceContext {
        &self.ctx
    }

    /// The output buffer of the current pair, usable as an instance
    /// vertex buffer by a renderer on the same device.
    pub fn output_buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffers.current().map(|pair| pair.output())
    }

    /// Dispatches dropped by the pacer.
    #[must_use]
    pub fn skipped(&self) -> u64 {
        self.pacer.skipped()
    }

    fn encode_and_submit(
        &mut self,
        frame: FrameId,
        particles: &[GpuParticle],
    ) -> Result<(), GpuError> {
        let upload = self.buffers.upload(&self.ctx, particles)?;
        let pair = self
            .buffers
            .resolve(upload.handle)
            .ok_or_else(|| GpuError::BufferAllocation("buffer handle went stale".into()))?;

        let stale = self
            .bindings
            .as_ref()
            .is_none_or(|b| b.generation() != pair.generation());
        if upload.rebuilt || stale {
            self.bindings = Some(self.pipeline.bind(&self.ctx, pair));
        }
        let Some(bindings) = &self.bindings else {
            return Err(GpuError::BufferAllocation("no binding set".into()));
        };

        let mut encoder = self.ctx.create_encoder("Particle Update Encoder");
        self.pipeline.dispatch(&mut encoder, bindings);
        let staging = ReadbackSlot::encode_copy(&self.ctx, &mut encoder, pair);
        self.ctx.submit(encoder);
        self.readback.begin(staging, frame.index);
        self.in_flight = Some(frame);
        Ok(())
    }
}

impl ComputeBackend for GpuBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_gpu(&self) -> bool {
        true
    }

    fn submit(
        &mut self,
        frame: FrameId,
        particles: &[GpuParticle],
    ) -> Result<Submission, GpuError> {
        self.ctx.check()?;
        if !self.pacer.try_begin() {
            log::debug!("readback outstanding, skipping frame {}", frame.index);
            return Ok(Submission::Skipped);
        }
        match self.encode_and_submit(frame, particles) {
            Ok(()) => Ok(Submission::Dispatched),
            Err(e) => {
                self.readback.cancel();
                self.pacer.complete();
                self.in_flight = None;
                Err(e)
            }
        }
    }

    fn poll(&mut self) -> Result<Option<FrameResult>, GpuError> {
        let readback = match self.readback.poll(&self.ctx) {
            Ok(Some(readback)) => readback,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.pacer.complete();
                self.in_flight = None;
                return Err(e);
            }
        };
        self.pacer.complete();
        let frame = self.in_flight.take();

        if readback.generation != self.buffers.generation() {
            log::debug!(
                "discarding readback of frame {} from superseded buffers",
                readback.frame_index
            );
            return Ok(None);
        }
        Ok(frame
            .filter(|f| f.index == readback.frame_index)
            .map(|frame| FrameResult {
                frame,
                particles: readback.particles,
            }))
    }

    fn release(&mut self) {
        self.readback.cancel();
        self.pacer.complete();
        self.in_flight = None;
        self.bindings = None;
        self.buffers.release();
        self.ctx.release();
    }
}

impl Drop for GpuBackend {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuErrorKind;

    /// `None` (test skipped) when the machine has no usable adapter.
    #[allow(clippy::print_stderr)]
    fn backend() -> Option<GpuBackend> {
        match pollster::block_on(GpuBackend::new(&ComputeOptions::default())) {
            Ok(backend) => Some(backend),
            Err(e) => {
                eprintln!("skipping GPU test: {e}");
                None
            }
        }
    }

    fn wait(backend: &mut GpuBackend) -> Option<FrameResult> {
        for _ in 0..500 {
            if let Some(result) = backend.poll().unwrap() {
                return Some(result);
            }
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        None
    }

    #[test]
    fn identity_kernel_round_trips_particles() {
        let Some(mut backend) = backend() else {
            return;
        };
        let particles: Vec<GpuParticle> = (0..130)
            .map(|i| GpuParticle {
                position: [i as f32, -(i as f32), 0.5],
                radius: 0.25,
            })
            .collect();
        let frame = FrameId {
            trajectory: 1,
            index: 4,
        };

        assert_eq!(backend.submit(frame, &particles).unwrap(), Submission::Dispatched);
        // one readback outstanding: the next dispatch is dropped
        assert_eq!(backend.submit(frame, &particles).unwrap(), Submission::Skipped);
        assert_eq!(backend.skipped(), 1);

        let result = wait(&mut backend).expect("readback did not complete");
        assert_eq!(result.frame, frame);
        assert_eq!(result.particles, particles);
        assert!(backend.output_buffer().is_some());
    }

    #[test]
    fn release_invalidates_context() {
        let Some(mut backend) = backend() else {
            return;
        };
        backend.release();
        backend.release();
        let err = backend
            .submit(
                FrameId {
                    trajectory: 1,
                    index: 0,
                },
                &[],
            )
            .unwrap_err();
        assert_eq!(err.kind(), GpuErrorKind::DeviceLost);
    }
}
