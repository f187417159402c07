use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use super::error::{GpuError, Unavailable};
use crate::options::ComputeOptions;

const VALID: u8 = 0;
const LOST: u8 = 1;
const RELEASED: u8 = 2;

/// Lifecycle state of a [`DeviceContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// Usable.
    Valid,
    /// Invalidated by the driver, an out-of-memory error, or a simulated
    /// loss. Must be re-acquired.
    Lost,
    /// Released by its owner.
    Released,
}

/// Shared slot written by the device-lost callback and the uncaptured
/// error handler, read by the owning context on the render thread.
#[derive(Debug)]
pub(crate) struct LossSignal {
    state: AtomicU8,
    reason: Mutex<Option<String>>,
}

impl LossSignal {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(VALID),
            reason: Mutex::new(None),
        }
    }

    /// Transition `Valid -> Lost`. Returns `false` if the context was
    /// already lost or released (late callbacks after release are ignored).
    pub(crate) fn notify_lost(&self, reason: String) -> bool {
        let transitioned = self
            .state
            .compare_exchange(VALID, LOST, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if transitioned {
            if let Ok(mut slot) = self.reason.lock() {
                *slot = Some(reason);
            }
        }
        transitioned
    }

    /// Disarm: anything reported after this point is ignored.
    fn release(&self) -> bool {
        self.state.swap(RELEASED, Ordering::SeqCst) != RELEASED
    }

    fn status(&self) -> DeviceStatus {
        match self.state.load(Ordering::SeqCst) {
            VALID => DeviceStatus::Valid,
            LOST => DeviceStatus::Lost,
            _ => DeviceStatus::Released,
        }
    }

    fn reason(&self) -> Option<String> {
        self.reason.lock().ok().and_then(|slot| slot.clone())
    }
}

fn adapter_options(options: &ComputeOptions) -> wgpu::RequestAdapterOptions<'static, 'static> {
    wgpu::RequestAdapterOptions {
        power_preference: options.power_preference.into(),
        force_fallback_adapter: options.force_software_adapter,
        compatible_surface: None,
    }
}

fn supports_compute(adapter: &wgpu::Adapter) -> bool {
    adapter
        .get_downlevel_capabilities()
        .flags
        .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
}

/// Report whether a compute-capable adapter is obtainable.
///
/// Requests an adapter only; no device is created, so this has no lasting
/// side effects.
pub async fn probe(options: &ComputeOptions) -> bool {
    let instance = wgpu::Instance::default();
    match instance.request_adapter(&adapter_options(options)).await {
        Ok(adapter) => supports_compute(&adapter),
        Err(e) => {
            log::debug!("compute probe found no adapter: {e}");
            false
        }
    }
}

/// Owns the wgpu device and queue used by the compute path, plus the
/// subscription that reports device loss.
pub struct DeviceContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    info: wgpu::AdapterInfo,
    limits: wgpu::Limits,
    signal: Arc<LossSignal>,
}

impl DeviceContext {
    /// Negotiate an adapter and device for compute work.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::DeviceUnavailable`] if GPU use is disabled, no
    /// adapter is found, the adapter cannot run compute shaders, or the
    /// device request is refused. Callers fall back to the host path.
    pub async fn acquire(options: &ComputeOptions) -> Result<Self, GpuError> {
        if !options.prefer_gpu {
            return Err(GpuError::DeviceUnavailable(Unavailable::Disabled));
        }

        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&adapter_options(options))
            .await
            .map_err(|e| GpuError::DeviceUnavailable(Unavailable::Adapter(e)))?;

        let info = adapter.get_info();
        if !supports_compute(&adapter) {
            return Err(GpuError::DeviceUnavailable(Unavailable::NoComputeSupport(info.name)));
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Particle Compute Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                ..Default::default()
            })
            .await
            .map_err(|e| GpuError::DeviceUnavailable(Unavailable::Device(e)))?;

        let signal = Arc::new(LossSignal::new());
        subscribe(&device, &signal);

        log::info!(
            "acquired compute device '{}' ({:?})",
            info.name,
            info.backend
        );

        let limits = device.limits();
        Ok(Self {
            device,
            queue,
            info,
            limits,
            signal,
        })
    }

    /// The wgpu logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The wgpu command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Adapter description (name, backend, driver).
    pub fn info(&self) -> &wgpu::AdapterInfo {
        &self.info
    }

    /// Limits granted with the device.
    pub fn limits(&self) -> &wgpu::Limits {
        &self.limits
    }

    /// Current lifecycle state.
    pub fn status(&self) -> DeviceStatus {
        self.signal.status()
    }

    /// `Ok` while the device is usable.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::DeviceLost`] once the device has been lost or
    /// released.
    pub fn check(&self) -> Result<(), GpuError> {
        match self.status() {
            DeviceStatus::Valid => Ok(()),
            DeviceStatus::Lost => Err(GpuError::DeviceLost(
                self.signal.reason().unwrap_or_else(|| "unknown reason".into()),
            )),
            DeviceStatus::Released => Err(GpuError::DeviceLost("device released".into())),
        }
    }

    /// Mark the device lost as if the driver had reported it. Used for
    /// failures detected on our side (e.g. a failed buffer mapping).
    pub fn mark_lost(&self, reason: impl Into<String>) {
        let _ = self.signal.notify_lost(reason.into());
    }

    /// Create a new command encoder.
    pub fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Finish the encoder and submit its command buffer.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        let _ = self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Disarm the loss subscription and destroy the device. Idempotent.
    pub fn release(&self) {
        if self.signal.release() {
            log::debug!("releasing compute device '{}'", self.info.name);
            self.device.destroy();
        }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        self.release();
    }
}

/// Route driver-side loss and uncaptured errors into `signal`.
///
/// Out-of-memory is treated as loss. Validation errors are logged; the
/// default wgpu handler would panic the render loop.
fn subscribe(device: &wgpu::Device, signal: &Arc<LossSignal>) {
    let lost = Arc::clone(signal);
    device.set_device_lost_callback(move |reason, message| {
        if lost.notify_lost(format!("{reason:?}: {message}")) {
            log::warn!("compute device lost ({reason:?}): {message}");
        }
    });

    let oom = Arc::clone(signal);
    device.on_uncaptured_error(Box::new(move |error: wgpu::Error| match &error {
        wgpu::Error::OutOfMemory { .. } => {
            if oom.notify_lost(format!("out of memory: {error}")) {
                log::warn!("compute device out of memory: {error}");
            }
        }
        other => log::error!("uncaptured GPU error: {other}"),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_signal_transitions_once() {
        let signal = LossSignal::new();
        assert_eq!(signal.status(), DeviceStatus::Valid);
        assert!(signal.notify_lost("first".into()));
        assert!(!signal.notify_lost("second".into()));
        assert_eq!(signal.status(), DeviceStatus::Lost);
        assert_eq!(signal.reason().as_deref(), Some("first"));
    }

    #[test]
    fn released_signal_ignores_late_loss() {
        let signal = LossSignal::new();
        assert!(signal.release());
        assert!(!signal.release());
        assert!(!signal.notify_lost("destroyed".into()));
        assert_eq!(signal.status(), DeviceStatus::Released);
        assert_eq!(signal.reason(), None);
    }

    #[test]
    fn acquire_respects_disabled_option() {
        let options = ComputeOptions {
            prefer_gpu: false,
            ..ComputeOptions::default()
        };
        let result = pollster::block_on(DeviceContext::acquire(&options));
        assert!(matches!(
            result,
            Err(GpuError::DeviceUnavailable(Unavailable::Disabled))
        ));
    }
}
