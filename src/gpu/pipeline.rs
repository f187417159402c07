//! Compute pipeline for the per-frame particle update.

use super::buffers::BufferPair;
use super::device::DeviceContext;
use super::error::GpuError;
use super::kernel::{Kernel, WORKGROUP_SIZE};

/// Number of workgroups needed to cover `count` particles.
#[must_use]
pub fn workgroup_count(count: u32) -> u32 {
    count.div_ceil(WORKGROUP_SIZE)
}

/// A bind group tied to one generation of the particle buffers.
pub struct BindingSet {
    bind_group: wgpu::BindGroup,
    generation: u64,
    count: u32,
}

impl BindingSet {
    /// Buffer generation this set was created for.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Particle count covered by a dispatch of this set.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }
}

/// The compiled update kernel plus its bind group layout.
pub struct UpdatePipeline {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    entry_point: String,
}

impl UpdatePipeline {
    /// Create the compute pipeline for `kernel`.
    ///
    /// The bind group layout is derived from the kernel, which has already
    /// been checked against the binding contract.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::KernelCompile`] if the backend rejects the
    /// kernel, and [`GpuError::DeviceLost`] if the device is not usable.
    pub async fn build(ctx: &DeviceContext, kernel: &Kernel) -> Result<Self, GpuError> {
        ctx.check()?;
        let device = ctx.device();

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = kernel.create_shader_module(device);
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Particle Update Pipeline"),
            layout: None,
            module: &module,
            entry_point: Some(kernel.entry_point()),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });
        if let Some(error) = device.pop_error_scope().await {
            return Err(GpuError::KernelCompile(format!(
                "'{}' rejected by the backend: {error}",
                kernel.file_path()
            )));
        }

        let layout = pipeline.get_bind_group_layout(0);
        log::debug!(
            "built update pipeline from '{}' on '{}'",
            kernel.file_path(),
            ctx.info().name
        );
        Ok(Self {
            pipeline,
            layout,
            entry_point: kernel.entry_point().to_owned(),
        })
    }

    /// Entry point the pipeline was built from.
    #[must_use]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Bind `pair` as kernel input/output.
    pub fn bind(&self, ctx: &DeviceContext, pair: &BufferPair) -> BindingSet {
        let bind_group = ctx.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Update Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: pair.input().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: pair.output().as_entire_binding(),
                },
            ],
        });
        BindingSet {
            bind_group,
            generation: pair.generation(),
            count: pair.count(),
        }
    }

    /// Record one update pass over every particle in `bindings`. Records
    /// nothing for an empty set.
    pub fn dispatch(&self, encoder: &mut wgpu::CommandEncoder, bindings: &BindingSet) {
        let groups = workgroup_count(bindings.count);
        if groups == 0 {
            return;
        }
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Particle Update Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bindings.bind_group, &[]);
        pass.dispatch_workgroups(groups, 1, 1);
    }
}
