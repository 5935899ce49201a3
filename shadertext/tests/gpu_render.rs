mod support;

use serial_test::serial;
use shadertext::compositor::PatternCompositor;
use shadertext::{linker, patterns};
use shadertext::prelude::*;

fn renderer(settings: &Settings) -> Option<HeadlessRenderer> {
    if !support::gpu_tests_enabled() {
        eprintln!("Skipping GPU test. Set SHADERTEXT_RUN_GPU_TESTS=1 to run.");
        return None;
    }

    Some(
        HeadlessRenderer::with_system_fonts(Viewport::new(160, 96, 1.0), settings)
            .expect("expected a headless adapter"),
    )
}

fn ab_settings() -> Settings {
    let mut settings = Settings {
        text: "AB".to_string(),
        font_size: 64.0,
        active_shader: PatternId::Melt,
        ..Default::default()
    };
    settings.melt.speed = 0.0;
    settings
}

#[test]
#[serial]
fn frozen_ab_melt_frame_is_deterministic() {
    let settings = ab_settings();
    let Some(mut renderer) = renderer(&settings) else {
        return;
    };

    let first = renderer.render(&settings, 0.0).unwrap();
    let second = renderer.render(&settings, 0.0).unwrap();

    assert_eq!(first.width, 160);
    assert_eq!(first.height, 96);
    assert_eq!(first, second);
}

#[test]
#[serial]
fn frozen_ab_melt_frame_matches_mask_and_pattern() {
    const WHITE: [u8; 4] = [255, 255, 255, 255];

    let settings = ab_settings();
    let Some(mut renderer) = renderer(&settings) else {
        return;
    };

    let frame = renderer.render(&settings, 0.0).unwrap();
    let mask = renderer.preview().mask();
    if mask.coverage() == 0 {
        eprintln!("Skipping: no usable system font.");
        return;
    }
    assert_eq!(mask.size(), [frame.width, frame.height]);

    // "AB" is centered, so the corners are background.
    for (x, y) in [(0, 0), (159, 0), (0, 95), (159, 95)] {
        assert_eq!(frame.pixel(x, y), WHITE, "corner ({}, {})", x, y);
    }

    let mut glyph_colors = std::collections::HashSet::new();
    let mut unsaturated = 0;
    for y in 0..frame.height {
        for x in 0..frame.width {
            let texel = mask.pixels()[(y * frame.width + x) as usize];
            let [r, g, b, a] = frame.pixel(x, y);

            if texel == 0 {
                assert_eq!([r, g, b, a], WHITE, "background at ({}, {})", x, y);
                continue;
            }

            assert_eq!(a, 255, "glyph alpha at ({}, {})", x, y);
            glyph_colors.insert([r, g, b]);

            // Melt emits blue = 1 with red and green from the flow
            // gradient; with neutral color settings an in-range texel
            // keeps that blue.
            if (1..250).contains(&r) && (1..250).contains(&g) {
                assert!(b >= 250, "melt blue at ({}, {}) was {}", x, y, b);
                unsaturated += 1;
            }
        }
    }

    assert!(glyph_colors.len() > 1, "glyphs were filled with one color");
    assert!(unsaturated > 0, "no glyph texel carried the melt gradient");
}

#[test]
#[serial]
fn empty_text_renders_only_background() {
    let settings = Settings {
        text: String::new(),
        ..Default::default()
    };
    let Some(mut renderer) = renderer(&settings) else {
        return;
    };

    let frame = renderer.render(&settings, 1.0).unwrap();

    assert!(
        frame
            .pixels
            .chunks_exact(4)
            .all(|px| px == [255, 255, 255, 255])
    );
}

#[test]
#[serial]
fn hue_zero_and_full_turn_match() {
    let mut settings = ab_settings();
    let Some(mut renderer) = renderer(&settings) else {
        return;
    };

    settings.melt.hue = 0.0;
    let zero = renderer.render(&settings, 0.5).unwrap();
    settings.melt.hue = 360.0;
    let full_turn = renderer.render(&settings, 0.5).unwrap();

    assert_eq!(zero, full_turn);
}

#[test]
#[serial]
fn post_without_effects_is_a_pass_through() {
    let settings = ab_settings();
    let Some(mut renderer) = renderer(&settings) else {
        return;
    };

    let capture = renderer.capture(&settings, 0.25).unwrap();

    assert_eq!(capture.offscreen, capture.output);
}

#[test]
#[serial]
fn every_pattern_links_and_binds() {
    let mut settings = ab_settings();
    let Some(mut renderer) = renderer(&settings) else {
        return;
    };

    for id in PatternId::ALL {
        settings.active_shader = id;
        renderer.render(&settings, 0.0).unwrap();
        assert_eq!(renderer.preview().active_pattern(), id);
    }
}

const UNDEFINED_NAME_BODY: &str = "\
fn pattern(frag_coord: vec2<f32>, uv: vec2<f32>) -> vec4<f32> {
    return nope;
}";

#[test]
#[serial]
fn failed_switch_keeps_bound_material() {
    static EMPTY_SCHEMA: PatternProgram = PatternProgram {
        id: PatternId::Glass,
        source: UNDEFINED_NAME_BODY,
        schema: &[],
    };

    let settings = ab_settings();
    let Some(renderer) = renderer(&settings) else {
        return;
    };

    let mut compositor =
        PatternCompositor::new(renderer.device(), PatternId::Melt, [32, 32])
            .unwrap();

    let err = compositor
        .set_active_program(renderer.device(), &EMPTY_SCHEMA)
        .unwrap_err();

    assert_eq!(err.program, "glass");
    assert_eq!(compositor.active_pattern(), PatternId::Melt);
    assert!(
        compositor
            .set_active_pattern(renderer.device(), PatternId::Flow)
            .unwrap()
    );
    assert_eq!(compositor.active_pattern(), PatternId::Flow);
}

#[test]
#[serial]
fn invalid_body_with_valid_schema_keeps_bound_material() {
    let broken = PatternProgram {
        id: PatternId::Glass,
        source: UNDEFINED_NAME_BODY,
        schema: patterns::lookup(PatternId::Glass).schema,
    };

    let settings = ab_settings();
    let Some(renderer) = renderer(&settings) else {
        return;
    };

    let mut compositor =
        PatternCompositor::new(renderer.device(), PatternId::Melt, [32, 32])
            .unwrap();

    let err = compositor
        .set_active_program(renderer.device(), &broken)
        .unwrap_err();

    assert_eq!(err.program, "glass");
    assert!(err.log.contains("nope"), "{}", err.log);
    assert_eq!(compositor.active_pattern(), PatternId::Melt);
    assert!(
        compositor
            .set_active_pattern(renderer.device(), PatternId::Glass)
            .unwrap()
    );
}

#[test]
#[serial]
fn device_rejections_inside_a_build_scope_become_errors() {
    let settings = ab_settings();
    let Some(renderer) = renderer(&settings) else {
        return;
    };
    let device = renderer.device();

    let err = linker::scoped(device, "bad-buffer", || {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bad-buffer"),
            size: 16,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::MAP_WRITE,
            mapped_at_creation: false,
        })
    })
    .unwrap_err();

    assert_eq!(err.program, "bad-buffer");
    assert!(!err.log.is_empty());
}

#[test]
#[serial]
fn failed_switch_is_reported_until_selection_moves() {
    let broken = PatternProgram {
        id: PatternId::Glass,
        source: UNDEFINED_NAME_BODY,
        schema: patterns::lookup(PatternId::Glass).schema,
    };

    let mut settings = ab_settings();
    let Some(mut renderer) = renderer(&settings) else {
        return;
    };
    assert!(renderer.preview().last_error().is_none());

    let err = renderer.set_active_program(&broken).unwrap_err();
    assert_eq!(renderer.preview().last_error(), Some(&err));

    // Selecting the failed pattern does not retry it; the error stays up
    // and the previous material keeps drawing.
    settings.active_shader = PatternId::Glass;
    renderer.render(&settings, 0.0).unwrap();
    assert_eq!(renderer.preview().active_pattern(), PatternId::Melt);
    assert_eq!(
        renderer.preview().last_error().map(|e| e.program.as_str()),
        Some("glass")
    );

    settings.active_shader = PatternId::Melt;
    renderer.render(&settings, 0.0).unwrap();
    assert!(renderer.preview().last_error().is_none());

    settings.active_shader = PatternId::Glass;
    renderer.render(&settings, 0.0).unwrap();
    assert_eq!(renderer.preview().active_pattern(), PatternId::Glass);
    assert!(renderer.preview().last_error().is_none());
}

#[test]
#[serial]
fn resize_changes_the_captured_frame_size() {
    let settings = ab_settings();
    let Some(mut renderer) = renderer(&settings) else {
        return;
    };

    renderer.resize(Viewport::new(100, 40, 1.0));
    let capture = renderer.capture(&settings, 0.0).unwrap();

    assert_eq!([capture.output.width, capture.output.height], [100, 40]);
    assert_eq!(capture.output.pixels.len(), 100 * 40 * 4);
    assert_eq!([capture.offscreen.width, capture.offscreen.height], [100, 40]);
    assert_eq!(renderer.preview().mask().size(), [100, 40]);

    renderer.resize(Viewport::new(160, 96, 1.0));
    let frame = renderer.render(&settings, 0.0).unwrap();
    assert_eq!([frame.width, frame.height], [160, 96]);
}

#[test]
#[serial]
fn effects_change_the_output() {
    let mut settings = ab_settings();
    let Some(mut renderer) = renderer(&settings) else {
        return;
    };

    let plain = renderer.capture(&settings, 0.0).unwrap();

    settings.noise_type = NoiseKind::Scanline;
    settings.noise_strength = 1.0;
    let noisy = renderer.capture(&settings, 0.0).unwrap();

    assert_eq!(plain.offscreen, noisy.offscreen);
    assert_ne!(plain.output, noisy.output);
}
