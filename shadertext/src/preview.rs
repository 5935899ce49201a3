//! One live preview: clock, mask, pattern pass and post pass, driven once per
//! frame in data-flow order.

use std::time::Instant;

use log::{error, info};

use crate::clock::{FrameClock, FrameState, Viewport};
use crate::compositor::PatternCompositor;
use crate::error::{ProgramCompileError, RenderError};
use crate::mask::MaskRasterizer;
use crate::patterns::{self, PatternProgram};
use crate::post::PostEffectStage;
use crate::settings::{PatternId, Settings};

pub struct Preview {
    // Field order is drop order.
    compositor: PatternCompositor,
    post: PostEffectStage,
    rasterizer: MaskRasterizer,
    clock: FrameClock,
    failed_switch: Option<FailedSwitch>,
}

struct FailedSwitch {
    pattern: PatternId,
    error: ProgramCompileError,
}

impl Preview {
    pub fn new(
        device: &wgpu::Device,
        viewport: Viewport,
        output_format: wgpu::TextureFormat,
        settings: &Settings,
        rasterizer: MaskRasterizer,
    ) -> Result<Self, RenderError> {
        let compositor =
            PatternCompositor::new(device, settings.active_shader, viewport.size())?;
        let post = PostEffectStage::new(device, output_format)?;

        info!(
            "preview ready at {}x{} (scale {})",
            viewport.width, viewport.height, viewport.scale_factor
        );

        Ok(Self {
            compositor,
            post,
            rasterizer,
            clock: FrameClock::new(viewport),
            failed_switch: None,
        })
    }

    pub fn with_system_fonts(
        device: &wgpu::Device,
        viewport: Viewport,
        output_format: wgpu::TextureFormat,
        settings: &Settings,
    ) -> Result<Self, RenderError> {
        Self::new(
            device,
            viewport,
            output_format,
            settings,
            MaskRasterizer::with_system_fonts(),
        )
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn mask(&self) -> &MaskRasterizer {
        &self.rasterizer
    }

    pub fn compositor(&self) -> &PatternCompositor {
        &self.compositor
    }

    /// The pattern actually drawn, which differs from
    /// `settings.active_shader` while a switch is failing to link.
    pub fn active_pattern(&self) -> PatternId {
        self.compositor.active_pattern()
    }

    /// The error from the last failed pattern switch. Cleared once a switch
    /// succeeds or the selection moves off the failing pattern.
    pub fn last_error(&self) -> Option<&ProgramCompileError> {
        self.failed_switch.as_ref().map(|failed| &failed.error)
    }

    /// Applied at the start of the next frame.
    pub fn queue_resize(&mut self, viewport: Viewport) {
        self.clock.queue_resize(viewport);
    }

    /// Renders one frame into `output_view` and submits it.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        output_view: &wgpu::TextureView,
        settings: &Settings,
        now: Instant,
    ) -> FrameState {
        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("shadertext-frame"),
            });
        let frame = self.encode(device, queue, &mut encoder, output_view, settings, now);
        queue.submit(Some(encoder.finish()));
        frame
    }

    /// Records one frame into `encoder` without submitting, so callers can
    /// append copies after the post pass.
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        output_view: &wgpu::TextureView,
        settings: &Settings,
        now: Instant,
    ) -> FrameState {
        let frame = self.clock.begin_frame(settings.time_control(), now);
        let drawable = frame.viewport.size();

        self.sync_pattern(device, settings.active_shader);

        let update = self.rasterizer.refresh(settings, frame.viewport);
        self.compositor
            .update_mask(device, queue, &self.rasterizer, update);

        self.compositor.render_frame(
            device,
            queue,
            encoder,
            settings,
            frame.elapsed,
            drawable,
        );

        self.post.render(
            device,
            queue,
            encoder,
            self.compositor.target(),
            output_view,
            settings.blur(),
            settings.noise(),
            frame.elapsed,
            drawable,
        );

        frame
    }

    /// Switches to `program`, recording the outcome for [`Self::last_error`].
    /// On error the bound material keeps rendering.
    pub fn set_active_program(
        &mut self,
        device: &wgpu::Device,
        program: &PatternProgram,
    ) -> Result<bool, ProgramCompileError> {
        match self.compositor.set_active_program(device, program) {
            Ok(swapped) => {
                self.failed_switch = None;
                Ok(swapped)
            }
            Err(err) => {
                error!(
                    "keeping '{}' after failed switch: {}",
                    self.compositor.active_pattern(),
                    err
                );
                self.failed_switch = Some(FailedSwitch {
                    pattern: program.id,
                    error: err.clone(),
                });
                Err(err)
            }
        }
    }

    /// A pattern that failed to link is not retried until the selection
    /// moves away from it.
    fn sync_pattern(&mut self, device: &wgpu::Device, wanted: PatternId) {
        if self
            .failed_switch
            .as_ref()
            .is_some_and(|failed| failed.pattern != wanted)
        {
            self.failed_switch = None;
        }
        if self.failed_switch.is_some() {
            return;
        }

        // Recorded for `last_error`.
        let _ = self.set_active_program(device, patterns::lookup(wanted));
    }

    /// Releases materials, then the mask, then the offscreen target.
    pub fn shutdown(self) {
        let Self {
            compositor,
            post,
            rasterizer,
            ..
        } = self;

        compositor.shutdown();
        drop(post);
        drop(rasterizer);
    }
}
