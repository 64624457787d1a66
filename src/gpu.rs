use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::shader_kind::ShaderKind;

/// Compiles shaders with the GPU driver through a headless wgpu device.
pub struct DriverCompiler {
    device: wgpu::Device,
    adapter: wgpu::AdapterInfo,
}

impl DriverCompiler {
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        // Only shader modules are created, so whatever the adapter offers is enough.
        let (device, _queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("shader2h"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: Default::default(),
            })
            .await?;

        Ok(DriverCompiler {
            device,
            adapter: adapter.get_info(),
        })
    }

    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter
    }

    /// Returns the driver's error messages, empty when the shader compiled.
    pub fn compile(&self, kind: ShaderKind, label: &str, source: &str) -> Vec<Diagnostic> {
        pollster::block_on(self.compile_async(kind, label, source))
    }

    async fn compile_async(&self, kind: ShaderKind, label: &str, source: &str) -> Vec<Diagnostic> {
        // AIDEV-NOTE: Error scope keeps wgpu from panicking on the uncaptured validation error
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: shader_source(kind, source),
            });
        let info = module.get_compilation_info().await;
        let scope_error = self.device.pop_error_scope().await;

        let mut diagnostics: Vec<Diagnostic> = info
            .messages
            .into_iter()
            .filter(|message| matches!(message.message_type, wgpu::CompilationMessageType::Error))
            .map(|message| match message.location {
                Some(loc) => Diagnostic::at(loc.line_number, loc.line_position, message.message),
                None => Diagnostic::new(message.message),
            })
            .collect();

        if diagnostics.is_empty() {
            if let Some(error) = scope_error {
                diagnostics.push(Diagnostic::new(error.to_string()));
            }
        }

        diagnostics
    }
}

fn shader_source(kind: ShaderKind, source: &str) -> wgpu::ShaderSource<'_> {
    let stage = match kind {
        ShaderKind::Vertex => ShaderStage::Vertex,
        ShaderKind::Fragment => ShaderStage::Fragment,
        ShaderKind::Compute => ShaderStage::Compute,
        ShaderKind::Wgsl => return wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    };

    wgpu::ShaderSource::Glsl {
        shader: Cow::Borrowed(source),
        stage,
        defines: Default::default(),
    }
}
