//! Turns composed WGSL into a render pipeline, or a [`ProgramCompileError`]
//! carrying the diagnostic. A failed link never produces a partial
//! pipeline.

use log::{debug, error};
use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::ProgramCompileError;

/// Everything needed to link one full-screen program.
pub struct ProgramDesc<'a> {
    pub name: &'a str,
    pub source: &'a str,
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    pub format: wgpu::TextureFormat,
}

/// CPU-side parse and validation, with diagnostics rendered against the
/// source.
pub fn validate_wgsl(name: &str, source: &str) -> Result<(), ProgramCompileError> {
    let module = wgsl::parse_str(source).map_err(|err| {
        ProgramCompileError::new(name, err.emit_to_string(source))
    })?;

    let mut validator =
        Validator::new(ValidationFlags::all(), Capabilities::all());

    validator
        .validate(&module)
        .map_err(|err| ProgramCompileError::new(name, err.emit_to_string(source)))
        .map(|_| ())
}

pub fn link(
    device: &wgpu::Device,
    desc: &ProgramDesc,
) -> Result<wgpu::RenderPipeline, ProgramCompileError> {
    validate_wgsl(desc.name, desc.source).inspect_err(|err| {
        error!("{}", err);
    })?;

    let pipeline =
        scoped(device, desc.name, || create_render_pipeline(device, desc))?;

    debug!("linked program '{}'", desc.name);
    Ok(pipeline)
}

/// Runs `build` inside a validation error scope. Anything wgpu rejects in
/// there becomes a [`ProgramCompileError`] for `name` instead of reaching
/// the device's uncaptured-error handler.
pub fn scoped<T>(
    device: &wgpu::Device,
    name: &str,
    build: impl FnOnce() -> T,
) -> Result<T, ProgramCompileError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let built = build();
    let scope_error = pollster::block_on(device.pop_error_scope());

    match scope_error {
        Some(err) => {
            let err = ProgramCompileError::new(name, err.to_string());
            error!("{}", err);
            Err(err)
        }
        None => Ok(built),
    }
}

pub(crate) fn create_render_pipeline(
    device: &wgpu::Device,
    desc: &ProgramDesc,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(desc.name),
        source: wgpu::ShaderSource::Wgsl(desc.source.into()),
    });

    let layout =
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(desc.name),
            bind_group_layouts: desc.bind_group_layouts,
            push_constant_ranges: &[],
        });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(desc.name),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: desc.format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_carry_program_name_and_diagnostic() {
        let err = validate_wgsl("broken", "fn main( {").unwrap_err();
        assert_eq!(err.program, "broken");
        assert!(!err.log.is_empty());
    }

    #[test]
    fn type_errors_are_rejected() {
        let source = "fn f() -> f32 { return vec2<f32>(1.0, 2.0); }";
        let err = validate_wgsl("mistyped", source).unwrap_err();
        assert_eq!(err.program, "mistyped");
    }

    #[test]
    fn valid_source_passes() {
        let source = "fn f(x: f32) -> f32 { return x * 2.0; }";
        assert!(validate_wgsl("ok", source).is_ok());
    }
}
