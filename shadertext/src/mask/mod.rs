//! Text to single-channel mask.
//!
//! The mask is a CPU buffer the size of the drawable, one byte per pixel,
//! row 0 at the top. Glyph pixels are 255 and everything else 0; coverage
//! is thresholded rather than anti-aliased so the pattern edge stays crisp.

use log::debug;

use crate::clock::Viewport;
use crate::settings::Settings;

pub mod fonts;
mod layout;
mod texture;

pub use fonts::FontBook;
pub use layout::{LineLayout, layout_lines, visual_order};
pub use texture::MaskTexture;

/// Coverage at or above this is a glyph pixel.
pub const COVERAGE_THRESHOLD: u8 = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskUpdate {
    /// Nothing mask-relevant changed; the buffer was not touched.
    Unchanged,
    /// Redrawn in place at the same size.
    Regenerated,
    /// The physical size changed; the buffer (and texture) were resized.
    Reallocated,
}

impl MaskUpdate {
    pub fn changed(&self) -> bool {
        !matches!(self, MaskUpdate::Unchanged)
    }
}

/// The inputs that decide what the mask looks like.
#[derive(Clone, Debug, PartialEq)]
struct MaskKey {
    text: String,
    font_family: String,
    font_size: f32,
    font_weight: f32,
    offset: [f32; 2],
    viewport: Viewport,
}

impl MaskKey {
    fn new(settings: &Settings, viewport: Viewport) -> Self {
        Self {
            text: settings.text.clone(),
            font_family: settings.font_family.clone(),
            font_size: settings.font_size,
            font_weight: settings.font_weight,
            offset: [settings.text_translate_x, settings.text_translate_y],
            viewport,
        }
    }
}

pub struct MaskRasterizer {
    fonts: FontBook,
    pixels: Vec<u8>,
    size: [u32; 2],
    key: Option<MaskKey>,
}

impl MaskRasterizer {
    pub fn new(fonts: FontBook) -> Self {
        Self {
            fonts,
            pixels: Vec::new(),
            size: [0, 0],
            key: None,
        }
    }

    pub fn with_system_fonts() -> Self {
        Self::new(FontBook::system())
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn size(&self) -> [u32; 2] {
        self.size
    }

    /// Number of glyph pixels in the current mask.
    pub fn coverage(&self) -> usize {
        self.pixels.iter().filter(|&&p| p != 0).count()
    }

    /// Forces the next [`Self::refresh`] to redraw.
    pub fn force_dirty(&mut self) {
        self.key = None;
    }

    pub fn refresh(&mut self, settings: &Settings, viewport: Viewport) -> MaskUpdate {
        let key = MaskKey::new(settings, viewport);
        if self.key.as_ref() == Some(&key) {
            return MaskUpdate::Unchanged;
        }

        let size = viewport.size();
        let update = if size != self.size {
            self.size = size;
            self.pixels = vec![0; size[0] as usize * size[1] as usize];
            MaskUpdate::Reallocated
        } else {
            self.pixels.fill(0);
            MaskUpdate::Regenerated
        };

        self.draw(settings, viewport);
        self.key = Some(key);

        debug!(
            "mask {:?} at {}x{}: {} glyph pixels",
            update,
            size[0],
            size[1],
            self.coverage()
        );

        update
    }

    fn draw(&mut self, settings: &Settings, viewport: Viewport) {
        let weight = fonts::css_weight(settings.font_weight);
        let Some(font) = self.fonts.resolve(&settings.font_family, weight) else {
            return;
        };

        let [width, height] = self.size;
        let font_px = settings.font_size * viewport.scale_factor;
        let lines = layout_lines(font, settings, viewport);

        for line in lines {
            let mut pen_x = line.left;
            let mut previous = None;

            for c in line.glyphs.chars() {
                if let Some(prev) = previous {
                    pen_x += font.horizontal_kern(prev, c, font_px).unwrap_or(0.0);
                }

                let (metrics, coverage) = font.rasterize(c, font_px);
                let left = (pen_x + metrics.xmin as f32).round() as i64;
                let top = (line.baseline - (metrics.height as i32 + metrics.ymin) as f32)
                    .round() as i64;

                for gy in 0..metrics.height {
                    let y = top + gy as i64;
                    if y < 0 || y >= height as i64 {
                        continue;
                    }
                    for gx in 0..metrics.width {
                        let x = left + gx as i64;
                        if x < 0 || x >= width as i64 {
                            continue;
                        }
                        if coverage[gy * metrics.width + gx] >= COVERAGE_THRESHOLD {
                            self.pixels[y as usize * width as usize + x as usize] = 255;
                        }
                    }
                }

                pen_x += metrics.advance_width;
                previous = Some(c);
            }
        }
    }
}
