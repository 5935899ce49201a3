//! The main pass: the active pattern program drawn into an offscreen target,
//! clipped by the text mask.

use log::{info, warn};

use crate::error::ProgramCompileError;
use crate::linker;
use crate::mask::{MaskRasterizer, MaskTexture, MaskUpdate};
use crate::patterns::{self, PatternParams, PatternProgram};
use crate::settings::{PatternId, Settings};
use crate::uniforms;

mod material;
mod target;

pub use material::{Material, MaterialSlot};
pub use target::{OFFSCREEN_FORMAT, RenderTarget};

const FULLSCREEN_WGSL: &str = include_str!("../../shaders/fullscreen.wgsl");
const COLOR_WGSL: &str = include_str!("../../shaders/color.wgsl");
const EPILOGUE_WGSL: &str = include_str!("../../shaders/epilogue.wgsl");

const MASK_BINDINGS_WGSL: &str = "\
@group(0) @binding(0)
var<uniform> u: PatternUniforms;

@group(1) @binding(0)
var mask_sampler: sampler;

@group(1) @binding(1)
var mask_texture: texture_2d<f32>;
";

/// Wraps a pattern body in the shared prologue (uniform block, mask
/// bindings, vertex stage, color helpers) and epilogue (mask discard,
/// pattern call, color tail).
pub fn compose_pattern_source(program: &PatternProgram) -> String {
    let mut source = uniforms::wgsl_struct("PatternUniforms", program.schema);
    source.push('\n');
    source.push_str(MASK_BINDINGS_WGSL);
    source.push('\n');
    source.push_str(FULLSCREEN_WGSL);
    source.push('\n');
    source.push_str(COLOR_WGSL);
    source.push('\n');
    source.push_str(program.source);
    source.push('\n');
    source.push_str(EPILOGUE_WGSL);
    source
}

/// Composes `program` and validates it on the CPU. Runs before any GPU
/// object is created for the program.
pub fn check_pattern_program(
    program: &PatternProgram,
) -> Result<String, ProgramCompileError> {
    if program.schema.is_empty() {
        return Err(ProgramCompileError::new(
            program.name(),
            "uniform schema is empty",
        ));
    }

    let source = compose_pattern_source(program);
    linker::validate_wgsl(program.name(), &source)?;
    Ok(source)
}

/// Sampler at binding 0 and one filterable 2D texture at binding 1.
pub fn texture_bind_group_layout(
    device: &wgpu::Device,
    label: &str,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(
                    wgpu::SamplerBindingType::Filtering,
                ),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float {
                        filterable: true,
                    },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
        ],
    })
}

/// Owns the current material, the mask texture and the offscreen target.
pub struct PatternCompositor {
    // Field order is drop order: materials, then mask, then target.
    material: MaterialSlot<Material>,
    mask: MaskTexture,
    target: RenderTarget,
    mask_layout: wgpu::BindGroupLayout,
}

impl PatternCompositor {
    pub fn new(
        device: &wgpu::Device,
        pattern: PatternId,
        size: [u32; 2],
    ) -> Result<Self, ProgramCompileError> {
        let mask_layout =
            texture_bind_group_layout(device, "shadertext-mask-layout");
        let material = Material::build(
            device,
            patterns::lookup(pattern),
            &mask_layout,
            OFFSCREEN_FORMAT,
        )?;
        info!("attached material '{}'", pattern);

        Ok(Self {
            material: MaterialSlot::new(material),
            mask: MaskTexture::new(device, &mask_layout, size),
            target: RenderTarget::new(device, size),
            mask_layout,
        })
    }

    /// The pattern whose material is bound, which lags the settings when a
    /// switch failed to link.
    pub fn active_pattern(&self) -> PatternId {
        self.material.current().id()
    }

    pub fn material(&self) -> &Material {
        self.material.current()
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn mask_size(&self) -> [u32; 2] {
        self.mask.size()
    }

    /// Links `id` and swaps it in if it is not already bound. Returns
    /// whether a swap happened; on error the previous material stays.
    pub fn set_active_pattern(
        &mut self,
        device: &wgpu::Device,
        id: PatternId,
    ) -> Result<bool, ProgramCompileError> {
        self.set_active_program(device, patterns::lookup(id))
    }

    /// [`Self::set_active_pattern`] for an arbitrary program.
    pub fn set_active_program(
        &mut self,
        device: &wgpu::Device,
        program: &PatternProgram,
    ) -> Result<bool, ProgramCompileError> {
        if program.id == self.active_pattern() {
            return Ok(false);
        }

        let mask_layout = &self.mask_layout;
        let previous = self.material.replace_with(|| {
            Material::build(device, program, mask_layout, OFFSCREEN_FORMAT)
        })?;

        info!("attached material '{}'", program.id);
        drop(previous);
        Ok(true)
    }

    /// Resizes the offscreen target. No-op at the current size.
    pub fn resize(&mut self, device: &wgpu::Device, size: [u32; 2]) {
        self.target.ensure_size(device, size);
    }

    /// Mirrors a rasterizer refresh onto the GPU texture.
    pub fn update_mask(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rasterizer: &MaskRasterizer,
        update: MaskUpdate,
    ) {
        if update == MaskUpdate::Unchanged
            && self.mask.size() == rasterizer.size()
        {
            return;
        }

        self.mask
            .ensure_size(device, &self.mask_layout, rasterizer.size());
        self.mask.upload(queue, rasterizer.pixels());
    }

    /// Pushes this frame's uniforms and records the main pass, clearing the
    /// target first.
    pub fn render_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        settings: &Settings,
        elapsed: f32,
        drawable: [u32; 2],
    ) {
        self.target.ensure_size(device, drawable);

        let material = self.material.current_mut();
        let params = PatternParams::from_settings(settings, material.id());
        let resolution = [drawable[0].max(1) as f32, drawable[1].max(1) as f32];

        if let Err(err) = material.sync(queue, &params, elapsed, resolution) {
            warn!("failed to bind uniforms for '{}': {}", material.id(), err);
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("shadertext-pattern-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.target.view(),
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        self.material.current().draw(&mut pass, self.mask.bind_group());
    }

    /// Releases GPU objects in order: material, mask, target.
    pub fn shutdown(self) {
        let Self {
            material,
            mask,
            target,
            mask_layout,
        } = self;

        drop(material);
        drop(mask);
        drop(target);
        drop(mask_layout);
        info!("compositor released");
    }
}
