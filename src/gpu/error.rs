use std::fmt;

/// Why no compute-capable device could be obtained.
#[derive(Debug)]
pub enum Unavailable {
    /// No adapter matched the request.
    Adapter(wgpu::RequestAdapterError),
    /// The adapter exists but cannot run compute shaders.
    NoComputeSupport(String),
    /// The adapter refused the device request.
    Device(wgpu::RequestDeviceError),
    /// GPU use is switched off in the options.
    Disabled,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Adapter(e) => write!(f, "no compatible GPU adapter found: {e}"),
            Self::NoComputeSupport(name) => {
                write!(f, "adapter '{name}' does not support compute shaders")
            }
            Self::Device(e) => write!(f, "device request failed: {e}"),
            Self::Disabled => write!(f, "GPU compute disabled by options"),
        }
    }
}

/// How the engine should react to a [`GpuError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Use the host path until an explicit recovery attempt succeeds.
    UntilRecovered,
    /// Use the host path for the rest of the session.
    ForSession,
}

/// Errors from the GPU compute path.
#[derive(Debug)]
pub enum GpuError {
    /// No compute-capable adapter or device grant.
    DeviceUnavailable(Unavailable),
    /// The device was invalidated mid-session.
    DeviceLost(String),
    /// The update kernel failed to compose, validate or compile, or does
    /// not match the binding contract.
    KernelCompile(String),
    /// A device allocation failed (out of memory or over a device limit).
    BufferAllocation(String),
}

impl GpuError {
    /// Fallback policy for this failure.
    #[must_use]
    pub fn fallback(&self) -> Fallback {
        match self {
            Self::KernelCompile(_) => Fallback::ForSession,
            Self::DeviceUnavailable(_) | Self::DeviceLost(_) | Self::BufferAllocation(_) => {
                Fallback::UntilRecovered
            }
        }
    }

    /// Short machine-friendly name of the variant.
    #[must_use]
    pub fn kind(&self) -> GpuErrorKind {
        match self {
            Self::DeviceUnavailable(_) => GpuErrorKind::DeviceUnavailable,
            Self::DeviceLost(_) => GpuErrorKind::DeviceLost,
            Self::KernelCompile(_) => GpuErrorKind::KernelCompile,
            Self::BufferAllocation(_) => GpuErrorKind::BufferAllocation,
        }
    }
}

/// Discriminant of [`GpuError`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuErrorKind {
    /// See [`GpuError::DeviceUnavailable`].
    DeviceUnavailable,
    /// See [`GpuError::DeviceLost`].
    DeviceLost,
    /// See [`GpuError::KernelCompile`].
    KernelCompile,
    /// See [`GpuError::BufferAllocation`].
    BufferAllocation,
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnavailable(reason) => write!(f, "GPU unavailable: {reason}"),
            Self::DeviceLost(msg) => write!(f, "GPU device lost: {msg}"),
            Self::KernelCompile(msg) => write!(f, "kernel compile error: {msg}"),
            Self::BufferAllocation(msg) => {
                write!(f, "GPU buffer allocation failed: {msg}")
            }
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DeviceUnavailable(Unavailable::Adapter(e)) => Some(e),
            Self::DeviceUnavailable(Unavailable::Device(e)) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_kernel_errors_disable_gpu_for_session() {
        assert_eq!(
            GpuError::KernelCompile("x".into()).fallback(),
            Fallback::ForSession
        );
        assert_eq!(
            GpuError::DeviceLost("x".into()).fallback(),
            Fallback::UntilRecovered
        );
        assert_eq!(
            GpuError::BufferAllocation("x".into()).fallback(),
            Fallback::UntilRecovered
        );
        assert_eq!(
            GpuError::DeviceUnavailable(Unavailable::Disabled).fallback(),
            Fallback::UntilRecovered
        );
    }
}
