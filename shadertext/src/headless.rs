//! Offscreen rendering with CPU readback, for snapshots and tests.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use std::time::Instant;

use log::{debug, info};

use crate::clock::Viewport;
use crate::compositor::OFFSCREEN_FORMAT;
use crate::error::{ProgramCompileError, RenderError};
use crate::mask::MaskRasterizer;
use crate::patterns::PatternProgram;
use crate::preview::Preview;
use crate::settings::Settings;

/// Tightly packed RGBA8 pixels, row 0 at the top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadlessFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl HeadlessFrame {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub fn save_png(&self, path: &Path) -> Result<(), RenderError> {
        let image_error = |message: String| RenderError::Image {
            path: path.to_path_buf(),
            message,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| image_error(err.to_string()))?;
        }

        let file =
            fs::File::create(path).map_err(|err| image_error(err.to_string()))?;
        let mut writer = std::io::BufWriter::new(file);
        let mut encoder = png::Encoder::new(&mut writer, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Fast);
        let mut png_writer = encoder
            .write_header()
            .map_err(|err| image_error(format!("png header failed: {}", err)))?;
        png_writer
            .write_image_data(&self.pixels)
            .map_err(|err| image_error(format!("png write failed: {}", err)))?;
        drop(png_writer);
        writer
            .flush()
            .map_err(|err| image_error(format!("png flush failed: {}", err)))?;

        info!("saved {}x{} frame to {}", self.width, self.height, path.display());
        Ok(())
    }
}

/// Both passes of one headless frame.
pub struct HeadlessCapture {
    /// The pattern pass before post effects.
    pub offscreen: HeadlessFrame,
    /// The post pass output.
    pub output: HeadlessFrame,
}

pub struct HeadlessRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    preview: Preview,
    output: wgpu::Texture,
    viewport: Viewport,
}

impl HeadlessRenderer {
    pub fn new(
        viewport: Viewport,
        settings: &Settings,
        rasterizer: MaskRasterizer,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            },
        ))
        .map_err(|err| RenderError::Adapter(err.to_string()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("shadertext-headless-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::default(),
            },
        ))
        .map_err(|err| RenderError::Device(err.to_string()))?;

        debug!("headless adapter: {:?}", adapter.get_info());

        let preview =
            Preview::new(&device, viewport, OFFSCREEN_FORMAT, settings, rasterizer)?;
        let output = create_output_texture(&device, viewport.size());

        Ok(Self {
            device,
            queue,
            preview,
            output,
            viewport,
        })
    }

    pub fn with_system_fonts(
        viewport: Viewport,
        settings: &Settings,
    ) -> Result<Self, RenderError> {
        Self::new(viewport, settings, MaskRasterizer::with_system_fonts())
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Resizes the output texture now and queues the preview resize for the
    /// next capture, so readback always matches what was drawn.
    pub fn resize(&mut self, viewport: Viewport) {
        if viewport.size() != self.viewport.size() {
            self.output = create_output_texture(&self.device, viewport.size());
            debug!(
                "headless output resized to {}x{}",
                viewport.width, viewport.height
            );
        }
        self.viewport = viewport;
        self.preview.queue_resize(viewport);
    }

    /// See [`Preview::set_active_program`].
    pub fn set_active_program(
        &mut self,
        program: &PatternProgram,
    ) -> Result<bool, ProgramCompileError> {
        self.preview.set_active_program(&self.device, program)
    }

    /// Renders `settings` with time frozen at `time` seconds.
    pub fn render(
        &mut self,
        settings: &Settings,
        time: f32,
    ) -> Result<HeadlessFrame, RenderError> {
        Ok(self.capture(settings, time)?.output)
    }

    /// Like [`Self::render`], also reading back the offscreen target.
    pub fn capture(
        &mut self,
        settings: &Settings,
        time: f32,
    ) -> Result<HeadlessCapture, RenderError> {
        let mut frozen = settings.clone();
        frozen.is_frozen = true;
        frozen.manual_time = time;

        let size = self.viewport.size();
        let view = self
            .output
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder =
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("shadertext-headless-frame"),
                });

        self.preview.encode(
            &self.device,
            &self.queue,
            &mut encoder,
            &view,
            &frozen,
            Instant::now(),
        );

        let offscreen = Readback::new(&self.device, size);
        offscreen.copy_from(
            &mut encoder,
            self.preview.compositor().target().texture(),
        );
        let output = Readback::new(&self.device, size);
        output.copy_from(&mut encoder, &self.output);

        self.queue.submit(Some(encoder.finish()));

        Ok(HeadlessCapture {
            offscreen: offscreen.read(&self.device)?,
            output: output.read(&self.device)?,
        })
    }

    pub fn shutdown(self) {
        self.preview.shutdown();
    }
}

fn create_output_texture(device: &wgpu::Device, size: [u32; 2]) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("shadertext-headless-output"),
        size: wgpu::Extent3d {
            width: size[0],
            height: size[1],
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

struct Readback {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
}

impl Readback {
    fn new(device: &wgpu::Device, size: [u32; 2]) -> Self {
        let [width, height] = size;
        let unpadded_bytes_per_row = width * 4;
        let padded_bytes_per_row =
            unpadded_bytes_per_row + compute_row_padding(unpadded_bytes_per_row);

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shadertext-readback"),
            size: padded_bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            width,
            height,
            unpadded_bytes_per_row,
            padded_bytes_per_row,
        }
    }

    fn copy_from(&self, encoder: &mut wgpu::CommandEncoder, texture: &wgpu::Texture) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn read(self, device: &wgpu::Device) -> Result<HeadlessFrame, RenderError> {
        let slice = self.buffer.slice(..);
        let (map_tx, map_rx) = mpsc::sync_channel(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = map_tx.send(result);
        });

        device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| readback_error("device poll", err))?;

        match map_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(readback_error("buffer map", err)),
            Err(_) => {
                return Err(RenderError::Readback(
                    "buffer map channel disconnected".to_string(),
                ));
            }
        }

        let data = slice.get_mapped_range();
        let pixels = copy_padded_rows_to_contiguous(
            &data,
            self.height,
            self.unpadded_bytes_per_row,
            self.padded_bytes_per_row,
        );
        drop(data);
        self.buffer.unmap();

        Ok(HeadlessFrame {
            width: self.width,
            height: self.height,
            pixels,
        })
    }
}

// wgpu's poll and map errors only implement `Display` with its `std`
// feature, which this crate leaves off.
fn readback_error(stage: &str, err: impl std::fmt::Debug) -> RenderError {
    RenderError::Readback(format!("{} failed: {:?}", stage, err))
}

fn copy_padded_rows_to_contiguous(
    data: &[u8],
    height: u32,
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
) -> Vec<u8> {
    let unpadded = unpadded_bytes_per_row as usize;
    let padded = padded_bytes_per_row as usize;
    let mut out = Vec::with_capacity(unpadded * height as usize);

    for row in 0..height as usize {
        let start = row * padded;
        out.extend_from_slice(&data[start..start + unpadded]);
    }

    out
}

fn compute_row_padding(unpadded_bytes_per_row: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let rem = unpadded_bytes_per_row % align;
    if rem == 0 { 0 } else { align - rem }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(compute_row_padding(256), 0);
        assert_eq!(compute_row_padding(4), 252);
        assert_eq!(compute_row_padding(300 * 4), 80);
    }

    #[test]
    fn padding_is_stripped_per_row() {
        let data = [1, 2, 0, 0, 3, 4, 0, 0];
        assert_eq!(copy_padded_rows_to_contiguous(&data, 2, 2, 4), vec![1, 2, 3, 4]);
    }

    #[test]
    fn readback_errors_name_their_stage() {
        let err = readback_error("device poll", wgpu::PollError::Timeout);
        let RenderError::Readback(message) = err else {
            panic!("expected a readback error, got {:?}", err);
        };
        assert!(message.starts_with("device poll failed"));
        assert!(message.contains("Timeout"));
    }

    #[test]
    fn frame_pixels_are_row_major() {
        let frame = HeadlessFrame {
            width: 2,
            height: 2,
            pixels: (0..16).collect(),
        };
        assert_eq!(frame.pixel(1, 0), [4, 5, 6, 7]);
        assert_eq!(frame.pixel(0, 1), [8, 9, 10, 11]);
    }

    #[test]
    fn save_png_writes_a_decodable_file() {
        let frame = HeadlessFrame {
            width: 3,
            height: 2,
            pixels: vec![200; 3 * 2 * 4],
        };
        let path = std::env::temp_dir()
            .join(format!("shadertext-{}", std::process::id()))
            .join("frame.png");

        frame.save_png(&path).unwrap();

        let decoder = png::Decoder::new(std::io::BufReader::new(
            fs::File::open(&path).unwrap(),
        ));
        let reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().width, 3);
        assert_eq!(reader.info().height, 2);
        let _ = fs::remove_file(&path);
    }
}
