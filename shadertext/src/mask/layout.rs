use fontdue::Font;

use crate::clock::Viewport;
use crate::settings::Settings;

pub const LINE_HEIGHT: f32 = 1.2;

/// One line of text positioned in physical pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct LineLayout {
    /// Characters in drawing (left to right) order.
    pub glyphs: String,
    /// Pen x of the first glyph.
    pub left: f32,
    /// Baseline y; row 0 is the top of the mask.
    pub baseline: f32,
}

/// Center y of each line: the block is centered on the canvas, then shifted
/// by `offset_y`. All values are physical pixels.
pub fn line_centers(
    line_count: usize,
    font_px: f32,
    canvas_height: f32,
    offset_y: f32,
) -> Vec<f32> {
    let advance = font_px * LINE_HEIGHT;
    let block = advance * line_count as f32;
    let start = (canvas_height - block) / 2.0 + advance / 2.0;

    (0..line_count)
        .map(|i| start + i as f32 * advance + offset_y)
        .collect()
}

/// Lines made only of right-to-left script are drawn reversed; mixed or
/// left-to-right lines are drawn as typed.
pub fn visual_order(line: &str) -> String {
    let has_rtl = line.chars().any(is_rtl);
    let has_ltr = line.chars().any(|c| c.is_alphabetic() && !is_rtl(c));

    if has_rtl && !has_ltr {
        line.chars().rev().collect()
    } else {
        line.to_string()
    }
}

fn is_rtl(c: char) -> bool {
    matches!(
        c,
        '\u{0590}'..='\u{08FF}' | '\u{FB1D}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFF}'
    )
}

pub fn layout_lines(
    font: &Font,
    settings: &Settings,
    viewport: Viewport,
) -> Vec<LineLayout> {
    let scale = viewport.scale_factor;
    let font_px = settings.font_size * scale;
    let [width, height] = viewport.resolution();
    let center_x = width / 2.0 + settings.text_translate_x * scale;

    // Canvas "middle" baseline: the line's y sits half-way between ascent
    // and descent.
    let middle_offset = font
        .horizontal_line_metrics(font_px)
        .map(|m| (m.ascent + m.descent) / 2.0)
        .unwrap_or(0.0);

    let lines: Vec<&str> = settings.text.split('\n').collect();
    let centers = line_centers(
        lines.len(),
        font_px,
        height,
        settings.text_translate_y * scale,
    );

    lines
        .iter()
        .zip(centers)
        .map(|(line, center_y)| {
            let glyphs = visual_order(line.trim_end_matches('\r'));
            let line_width = advance_width(font, &glyphs, font_px);
            LineLayout {
                left: center_x - line_width / 2.0,
                baseline: center_y + middle_offset,
                glyphs,
            }
        })
        .collect()
}

fn advance_width(font: &Font, text: &str, font_px: f32) -> f32 {
    let mut width = 0.0;
    let mut previous = None;

    for c in text.chars() {
        if let Some(prev) = previous {
            width += font.horizontal_kern(prev, c, font_px).unwrap_or(0.0);
        }
        width += font.metrics(c, font_px).advance_width;
        previous = Some(c);
    }

    width
}
