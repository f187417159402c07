use crate::gpu::GpuParticle;
use crate::trajectory::Particle;

/// Per-instance data for an impostor sphere draw.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    /// World-space center.
    pub position: [f32; 3],
    /// Sphere radius.
    pub radius: f32,
    /// RGBA color; alpha carries selection dimming.
    pub color: [f32; 4],
}

/// Host-side instance buffer for the render layer.
///
/// Positions and radii come from the last complete readback (or host
/// update); colors come from the trajectory. A readback whose length does
/// not match is rejected and the previous contents stay presented.
#[derive(Debug, Clone, Default)]
pub struct InstanceSet {
    instances: Vec<ParticleInstance>,
    frame_index: Option<usize>,
}

impl InstanceSet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every instance from a host frame.
    pub fn rebuild(&mut self, frame: &[Particle], frame_index: usize, radius_scale: f32) {
        self.instances.clear();
        self.instances.extend(frame.iter().map(|p| ParticleInstance {
            position: p.position.to_array(),
            radius: p.radius() * radius_scale,
            color: [p.color[0], p.color[1], p.color[2], 1.0],
        }));
        self.frame_index = Some(frame_index);
    }

    /// Take positions and radii from an updated frame. Returns `false` (and
    /// changes nothing) if the particle count does not match.
    pub fn apply(&mut self, frame_index: usize, particles: &[GpuParticle]) -> bool {
        if particles.len() != self.instances.len() {
            log::debug!(
                "discarding update for frame {frame_index}: {} particles, expected {}",
                particles.len(),
                self.instances.len()
            );
            return false;
        }
        for (instance, particle) in self.instances.iter_mut().zip(particles) {
            instance.position = particle.position;
            instance.radius = particle.radius;
        }
        self.frame_index = Some(frame_index);
        true
    }

    /// Dim every particle outside `selected` to `unselected_alpha`. With no
    /// selection (or a selection absent from `frame`) everything is opaque.
    pub fn highlight(&mut self, frame: &[Particle], selected: Option<&str>, unselected_alpha: f32) {
        let selected = selected.filter(|id| frame.iter().any(|p| p.chain == *id));
        for (instance, particle) in self.instances.iter_mut().zip(frame) {
            instance.color[3] = match selected {
                Some(id) if particle.chain != id => unselected_alpha,
                _ => 1.0,
            };
        }
    }

    /// Instances in particle order.
    #[must_use]
    pub fn instances(&self) -> &[ParticleInstance] {
        &self.instances
    }

    /// Raw bytes for upload as a vertex/instance buffer.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Frame the presented data was produced from.
    #[must_use]
    pub fn frame_index(&self) -> Option<usize> {
        self.frame_index
    }

    /// Number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// `true` before the first rebuild.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
