//! Second pass: reads the offscreen target, applies at most one blur and one
//! noise effect, and writes the output view. With both set to `none` the
//! pass copies texels unchanged.

use bytemuck::{Pod, Zeroable};
use log::debug;

use crate::compositor::{RenderTarget, texture_bind_group_layout};
use crate::error::ProgramCompileError;
use crate::linker::{self, ProgramDesc};
use crate::settings::{BlurKind, BlurSettings, NoiseKind, NoiseSettings};
use crate::uniforms::UniformBuffer;

const FULLSCREEN_WGSL: &str = include_str!("../shaders/fullscreen.wgsl");
const POST_WGSL: &str = include_str!("../shaders/post.wgsl");

pub const POST_PROGRAM_NAME: &str = "post";

/// Mirrors `PostUniforms` in post.wgsl.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PostUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub blur_kind: u32,
    pub blur_strength: f32,
    pub blur_angle: f32,
    pub noise_kind: u32,
    pub noise_strength: f32,
}

impl PostUniforms {
    pub fn new(
        resolution: [f32; 2],
        time: f32,
        blur: BlurSettings,
        noise: NoiseSettings,
    ) -> Self {
        Self {
            resolution,
            time,
            blur_kind: blur_code(blur.kind),
            blur_strength: blur.strength,
            blur_angle: blur.angle,
            noise_kind: noise_code(noise.kind),
            noise_strength: noise.strength,
        }
    }
}

pub fn blur_code(kind: BlurKind) -> u32 {
    match kind {
        BlurKind::None => 0,
        BlurKind::Gaussian => 1,
        BlurKind::Motion => 2,
        BlurKind::Zoom => 3,
    }
}

pub fn noise_code(kind: NoiseKind) -> u32 {
    match kind {
        NoiseKind::None => 0,
        NoiseKind::Grain => 1,
        NoiseKind::Static => 2,
        NoiseKind::Scanline => 3,
    }
}

pub fn post_source() -> String {
    format!("{}\n{}", FULLSCREEN_WGSL, POST_WGSL)
}

struct SourceBinding {
    generation: u64,
    bind_group: wgpu::BindGroup,
}

pub struct PostEffectStage {
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformBuffer,
    source_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    source: Option<SourceBinding>,
    output_format: wgpu::TextureFormat,
}

impl PostEffectStage {
    /// Links the post program for `output_format`, which is the surface
    /// format in the viewer and `Rgba8Unorm` headless.
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
    ) -> Result<Self, ProgramCompileError> {
        let uniforms = UniformBuffer::new(
            device,
            "shadertext-post-uniforms",
            bytemuck::bytes_of(&PostUniforms::default()),
        );
        let source_layout =
            texture_bind_group_layout(device, "shadertext-post-source-layout");

        let source = post_source();
        let pipeline = linker::link(
            device,
            &ProgramDesc {
                name: POST_PROGRAM_NAME,
                source: &source,
                bind_group_layouts: &[uniforms.bind_group_layout(), &source_layout],
                format: output_format,
            },
        )?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadertext-post-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            pipeline,
            uniforms,
            source_layout,
            sampler,
            source: None,
            output_format,
        })
    }

    pub fn output_format(&self) -> wgpu::TextureFormat {
        self.output_format
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: &RenderTarget,
        output_view: &wgpu::TextureView,
        blur: BlurSettings,
        noise: NoiseSettings,
        elapsed: f32,
        drawable: [u32; 2],
    ) {
        let resolution = [drawable[0].max(1) as f32, drawable[1].max(1) as f32];
        let uniforms = PostUniforms::new(resolution, elapsed, blur, noise);
        self.uniforms.upload(queue, bytemuck::bytes_of(&uniforms));

        self.refresh_source(device, target);
        let Some(source) = &self.source else {
            return;
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("shadertext-post-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
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

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.uniforms.bind_group(), &[]);
        pass.set_bind_group(1, &source.bind_group, &[]);
        pass.draw(0..4, 0..1);
    }

    /// Rebuilds the bind group over the target's view only when the target
    /// was reallocated.
    fn refresh_source(&mut self, device: &wgpu::Device, target: &RenderTarget) {
        let stale = self
            .source
            .as_ref()
            .is_none_or(|s| s.generation != target.generation());
        if !stale {
            return;
        }

        debug!("rebinding post source (generation {})", target.generation());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadertext-post-source"),
            layout: &self.source_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(target.view()),
                },
            ],
        });

        self.source = Some(SourceBinding {
            generation: target.generation(),
            bind_group,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::validate_wgsl;

    #[test]
    fn post_program_validates() {
        if let Err(err) = validate_wgsl(POST_PROGRAM_NAME, &post_source()) {
            panic!("{}", err);
        }
    }

    #[test]
    fn uniform_layout_matches_shader_struct() {
        assert_eq!(std::mem::size_of::<PostUniforms>(), 32);
        assert_eq!(std::mem::offset_of!(PostUniforms, blur_kind), 12);
        assert_eq!(std::mem::offset_of!(PostUniforms, noise_kind), 24);
    }

    #[test]
    fn kind_codes_match_shader_constants() {
        assert_eq!(blur_code(BlurKind::None), 0);
        assert_eq!(blur_code(BlurKind::Gaussian), 1);
        assert_eq!(blur_code(BlurKind::Motion), 2);
        assert_eq!(blur_code(BlurKind::Zoom), 3);

        assert_eq!(noise_code(NoiseKind::None), 0);
        assert_eq!(noise_code(NoiseKind::Grain), 1);
        assert_eq!(noise_code(NoiseKind::Static), 2);
        assert_eq!(noise_code(NoiseKind::Scanline), 3);

        let source = POST_WGSL;
        assert!(source.contains("BLUR_ZOOM: u32 = 3u"));
        assert!(source.contains("NOISE_SCANLINE: u32 = 3u"));
    }

    #[test]
    fn uniforms_carry_settings_through() {
        let uniforms = PostUniforms::new(
            [800.0, 600.0],
            1.5,
            BlurSettings {
                kind: BlurKind::Motion,
                strength: 4.0,
                angle: 45.0,
            },
            NoiseSettings {
                kind: NoiseKind::Grain,
                strength: 0.25,
            },
        );
        assert_eq!(uniforms.blur_kind, 2);
        assert_eq!(uniforms.blur_angle, 45.0);
        assert_eq!(uniforms.noise_kind, 1);
        assert_eq!(uniforms.noise_strength, 0.25);
        assert_eq!(uniforms.time, 1.5);
    }
}
