use log::{debug, error};

use crate::error::ProgramCompileError;
use crate::linker::{self, ProgramDesc};
use crate::patterns::{PatternParams, PatternProgram};
use crate::settings::PatternId;
use crate::uniforms::{UniformBlock, UniformBuffer};

use super::check_pattern_program;

/// A linked pattern program with its uniform cache and buffer.
pub struct Material {
    id: PatternId,
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformBlock,
    buffer: UniformBuffer,
}

impl Material {
    /// The program is checked on the CPU before any GPU object exists; the
    /// GPU objects are then created inside one validation error scope.
    pub fn build(
        device: &wgpu::Device,
        program: &PatternProgram,
        mask_layout: &wgpu::BindGroupLayout,
        format: wgpu::TextureFormat,
    ) -> Result<Self, ProgramCompileError> {
        let source = check_pattern_program(program).inspect_err(|err| {
            error!("{}", err);
        })?;

        let uniforms = program.defaults();
        let label = format!("shadertext-{}", program.name());

        let (buffer, pipeline) = linker::scoped(device, program.name(), || {
            let buffer = UniformBuffer::new(device, &label, uniforms.as_bytes());
            let pipeline = linker::create_render_pipeline(
                device,
                &ProgramDesc {
                    name: program.name(),
                    source: &source,
                    bind_group_layouts: &[buffer.bind_group_layout(), mask_layout],
                    format,
                },
            );
            (buffer, pipeline)
        })?;

        debug!("linked program '{}'", program.name());

        Ok(Self {
            id: program.id,
            pipeline,
            uniforms,
            buffer,
        })
    }

    pub fn id(&self) -> PatternId {
        self.id
    }

    pub fn uniforms(&self) -> &UniformBlock {
        &self.uniforms
    }

    /// Writes this frame's values into the cache and uploads them.
    pub fn sync(
        &mut self,
        queue: &wgpu::Queue,
        params: &PatternParams,
        time: f32,
        resolution: [f32; 2],
    ) -> Result<(), String> {
        params.apply(&mut self.uniforms, time, resolution)?;
        self.buffer.upload(queue, self.uniforms.as_bytes());
        Ok(())
    }

    pub fn draw<'pass>(
        &self,
        pass: &mut wgpu::RenderPass<'pass>,
        mask_bind_group: &wgpu::BindGroup,
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.buffer.bind_group(), &[]);
        pass.set_bind_group(1, mask_bind_group, &[]);
        pass.draw(0..4, 0..1);
    }
}

impl Drop for Material {
    fn drop(&mut self) {
        debug!("releasing material '{}'", self.id);
    }
}

/// Holds exactly one current material.
///
/// A replacement is built while the current one stays attached; it is only
/// swapped in once the build succeeded, and the previous material is handed
/// back after the swap so the caller releases it last.
pub struct MaterialSlot<M> {
    current: M,
}

impl<M> MaterialSlot<M> {
    pub fn new(initial: M) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> &M {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut M {
        &mut self.current
    }

    /// On error the current material is untouched.
    pub fn replace_with<E>(
        &mut self,
        build: impl FnOnce() -> Result<M, E>,
    ) -> Result<M, E> {
        let next = build()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    pub fn into_inner(self) -> M {
        self.current
    }
}
