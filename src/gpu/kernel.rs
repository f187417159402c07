use std::borrow::Cow;
use std::path::Path;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage, ShaderType,
};

use super::error::GpuError;
use crate::options::ComputeOptions;

/// Invocations per workgroup required of every update kernel.
pub const WORKGROUP_SIZE: u32 = 64;

/// Byte stride of one particle element (`vec4<f32>`).
pub const PARTICLE_STRIDE: u32 = 16;

const BUILTIN_KERNEL: &str = include_str!("../../assets/shaders/compute/passthrough.wgsl");
const BUILTIN_KERNEL_PATH: &str = "compute/passthrough.wgsl";

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Pre-loads the shared `atomstream::particle` module. Kernels use
/// `#import atomstream::particle::{Particle, in_range}` to pull in the
/// particle layout. The composer produces `naga::Module` IR directly.
pub struct ShaderComposer {
    composer: Composer,
}

impl ShaderComposer {
    /// Composer with all shared modules registered.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::KernelCompile`] if a shared module fails to
    /// register.
    pub fn new() -> Result<Self, GpuError> {
        let mut composer = Composer::default();
        let modules: &[(&str, &str)] = &[(
            include_str!("../../assets/shaders/modules/particle.wgsl"),
            "modules/particle.wgsl",
        )];

        for &(source, file_path) in modules {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source,
                    file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| {
                    GpuError::KernelCompile(format!(
                        "failed to register shader module '{file_path}': {e}"
                    ))
                })?;
        }

        Ok(Self { composer })
    }

    /// Compose a shader source (which may contain `#import` directives) into
    /// naga IR.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::KernelCompile`] on syntax or import errors.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, GpuError> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(|e| GpuError::KernelCompile(format!("failed to compose '{file_path}': {e}")))
    }
}

/// Where the update kernel comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelSource {
    /// The built-in identity pass-through kernel.
    Builtin,
    /// A user-supplied WGSL kernel.
    Wgsl {
        /// Shader text.
        source: String,
        /// Path used in diagnostics.
        file_path: String,
    },
}

impl KernelSource {
    /// Kernel selected by the options: the file at `kernel_path`, or the
    /// built-in kernel.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::KernelCompile`] if the kernel file cannot be
    /// read.
    pub fn from_options(options: &ComputeOptions) -> Result<Self, GpuError> {
        options
            .kernel_path
            .as_deref()
            .map_or(Ok(Self::Builtin), Self::from_file)
    }

    /// Read a WGSL kernel from disk.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::KernelCompile`] if the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self, GpuError> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            GpuError::KernelCompile(format!("cannot read kernel '{}': {e}", path.display()))
        })?;
        Ok(Self::Wgsl {
            source,
            file_path: path.display().to_string(),
        })
    }

    fn text(&self) -> (&str, &str) {
        match self {
            Self::Builtin => (BUILTIN_KERNEL, BUILTIN_KERNEL_PATH),
            Self::Wgsl { source, file_path } => (source, file_path),
        }
    }
}

/// A composed, validated update kernel that satisfies the particle binding
/// contract. Holds naga IR only; no device is involved.
#[derive(Debug, Clone)]
pub struct Kernel {
    module: naga::Module,
    entry_point: String,
    file_path: String,
}

impl Kernel {
    /// Compose, validate and contract-check a kernel.
    ///
    /// The contract: exactly one compute entry point with workgroup size
    /// `(64, 1, 1)`; group 0 binding 0 a read-only storage array and
    /// binding 1 a read-write storage array, both with 16-byte elements;
    /// no other resource bindings.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::KernelCompile`] describing the first violation.
    pub fn compile(source: &KernelSource) -> Result<Self, GpuError> {
        let (text, file_path) = source.text();
        let mut composer = ShaderComposer::new()?;
        let module = composer.compose_naga(text, file_path)?;

        let _info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        )
        .validate(&module)
        .map_err(|e| GpuError::KernelCompile(format!("'{file_path}' failed validation: {e}")))?;

        let entry_point = check_contract(&module)
            .map_err(|msg| GpuError::KernelCompile(format!("'{file_path}': {msg}")))?;

        log::debug!("compiled update kernel '{file_path}' (entry point '{entry_point}')");
        Ok(Self {
            module,
            entry_point,
            file_path: file_path.to_owned(),
        })
    }

    /// Name of the compute entry point.
    #[must_use]
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// Path or label the kernel was compiled from.
    #[must_use]
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Hand the IR to wgpu (requires the `naga-ir` feature).
    pub fn create_shader_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&self.file_path),
            source: wgpu::ShaderSource::Naga(Cow::Owned(self.module.clone())),
        })
    }
}

/// Check the binding/workgroup contract; returns the entry point name.
fn check_contract(module: &naga::Module) -> Result<String, String> {
    let mut compute = module
        .entry_points
        .iter()
        .filter(|ep| ep.stage == naga::ShaderStage::Compute);
    let entry = compute.next().ok_or("no compute entry point")?;
    if compute.next().is_some() {
        return Err("more than one compute entry point".into());
    }
    if entry.workgroup_size != [WORKGROUP_SIZE, 1, 1] {
        return Err(format!(
            "workgroup size must be ({WORKGROUP_SIZE}, 1, 1), found {:?}",
            entry.workgroup_size
        ));
    }

    let mut seen = [false; 2];
    for (_, var) in module.global_variables.iter() {
        let Some(binding) = &var.binding else {
            continue;
        };
        let slot = match (binding.group, binding.binding) {
            (0, 0) => 0,
            (0, 1) => 1,
            (group, index) => {
                return Err(format!("unexpected resource binding @group({group}) @binding({index})"));
            }
        };
        let naga::AddressSpace::Storage { access } = var.space else {
            return Err(format!("binding {slot} must be a storage buffer"));
        };
        let writable = access.contains(naga::StorageAccess::STORE);
        if slot == 0 && writable {
            return Err("binding 0 must be read-only".into());
        }
        if slot == 1 && !writable {
            return Err("binding 1 must be read-write".into());
        }
        match module.types[var.ty].inner {
            naga::TypeInner::Array {
                size: naga::ArraySize::Dynamic,
                stride,
                ..
            } if stride == PARTICLE_STRIDE => {}
            _ => {
                return Err(format!(
                    "binding {slot} must be a runtime-sized array of {PARTICLE_STRIDE}-byte elements"
                ));
            }
        }
        seen[slot] = true;
    }

    if let Some(missing) = seen.iter().position(|present| !present) {
        return Err(format!("missing storage binding {missing}"));
    }
    Ok(entry.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(source: &str) -> KernelSource {
        KernelSource::Wgsl {
            source: source.to_owned(),
            file_path: "test.wgsl".to_owned(),
        }
    }

    const VALID_CUSTOM: &str = r"
@group(0) @binding(0) var<storage, read> src: array<vec4<f32>>;
@group(0) @binding(1) var<storage, read_write> dst: array<vec4<f32>>;

@compute @workgroup_size(64)
fn scale_positions(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= arrayLength(&src)) {
        return;
    }
    dst[id.x] = vec4<f32>(src[id.x].xyz * 2.0, src[id.x].w);
}
";

    #[test]
    fn builtin_kernel_compiles() {
        let kernel = Kernel::compile(&KernelSource::Builtin).unwrap();
        assert_eq!(kernel.entry_point(), "update_particles");
    }

    #[test]
    fn custom_kernel_without_imports_compiles() {
        let kernel = Kernel::compile(&custom(VALID_CUSTOM)).unwrap();
        assert_eq!(kernel.entry_point(), "scale_positions");
    }

    #[test]
    fn syntax_error_is_kernel_compile_error() {
        let err = Kernel::compile(&custom("fn broken( {")).unwrap_err();
        assert!(matches!(err, GpuError::KernelCompile(_)));
    }

    #[test]
    fn wrong_workgroup_size_is_rejected() {
        let source = VALID_CUSTOM.replace("@workgroup_size(64)", "@workgroup_size(32)");
        let err = Kernel::compile(&custom(&source)).unwrap_err();
        assert!(err.to_string().contains("workgroup size"));
    }

    #[test]
    fn writable_input_binding_is_rejected() {
        let source = VALID_CUSTOM.replace(
            "var<storage, read> src",
            "var<storage, read_write> src",
        );
        let err = Kernel::compile(&custom(&source)).unwrap_err();
        assert!(err.to_string().contains("binding 0"));
    }

    #[test]
    fn scalar_element_arrays_are_rejected() {
        let source = r"
@group(0) @binding(0) var<storage, read> src: array<f32>;
@group(0) @binding(1) var<storage, read_write> dst: array<f32>;

@compute @workgroup_size(64)
fn copy_scalars(@builtin(global_invocation_id) id: vec3<u32>) {
    if (id.x >= arrayLength(&src)) {
        return;
    }
    dst[id.x] = src[id.x];
}
";
        assert!(Kernel::compile(&custom(source)).is_err());
    }

    #[test]
    fn missing_kernel_file_is_kernel_compile_error() {
        let err = KernelSource::from_file(Path::new("/nonexistent/kernel.wgsl")).unwrap_err();
        assert!(matches!(err, GpuError::KernelCompile(_)));
    }

    #[test]
    fn options_without_path_select_builtin() {
        let source = KernelSource::from_options(&ComputeOptions::default()).unwrap();
        assert_eq!(source, KernelSource::Builtin);
    }
}
