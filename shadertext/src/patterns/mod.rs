//! The built-in pattern programs.
//!
//! A pattern is a WGSL body defining
//! `fn pattern(frag_coord: vec2<f32>, uv: vec2<f32>) -> vec4<f32>` plus the
//! schema of the uniforms it reads through `u`. `frag_coord` has a
//! bottom-left origin in physical pixels. The body never declares bindings
//! or entry points; see [`crate::compositor::compose_pattern_source`].

use crate::settings::PatternId;
use crate::uniforms::{UniformBlock, UniformSpec};

mod params;

pub use params::{PatternParams, hue_turns};

#[derive(Debug)]
pub struct PatternProgram {
    pub id: PatternId,
    pub source: &'static str,
    pub schema: &'static [UniformSpec],
}

impl PatternProgram {
    pub fn name(&self) -> &'static str {
        self.id.as_str()
    }

    pub fn defaults(&self) -> UniformBlock {
        UniformBlock::with_defaults(self.schema)
    }
}

static MELT_SCHEMA: [UniformSpec; 8] = [
    UniformSpec::scalar("time", 0.0),
    UniformSpec::vec2("resolution", [1.0, 1.0]),
    UniformSpec::scalar("hue", 0.0),
    UniformSpec::scalar("saturation", 1.0),
    UniformSpec::scalar("contrast", 1.0),
    UniformSpec::scalar("zoom", 7.6),
    UniformSpec::scalar("speed", 0.5),
    UniformSpec::scalar("detail", 0.2),
];

static FLOW_SCHEMA: [UniformSpec; 13] = [
    UniformSpec::scalar("time", 0.0),
    UniformSpec::vec2("resolution", [1.0, 1.0]),
    UniformSpec::scalar("hue", 0.0),
    UniformSpec::scalar("saturation", 1.0),
    UniformSpec::scalar("contrast", 1.0),
    UniformSpec::scalar("velocity", 0.2),
    UniformSpec::scalar("detail", 200.0),
    UniformSpec::scalar("twist", 50.0),
    UniformSpec::scalar("speed", 2.5),
    UniformSpec::scalar("rgb_r", 1.0),
    UniformSpec::scalar("rgb_g", 1.0),
    UniformSpec::scalar("rgb_b", 1.0),
    UniformSpec::scalar("color_offset", 0.0),
];

static BALATRO_SCHEMA: [UniformSpec; 17] = [
    UniformSpec::scalar("time", 0.0),
    UniformSpec::vec2("resolution", [1.0, 1.0]),
    UniformSpec::scalar("hue", 0.0),
    UniformSpec::scalar("saturation", 1.0),
    UniformSpec::scalar("contrast", 1.0),
    UniformSpec::scalar("speed", 1.0),
    UniformSpec::scalar("spin_rotation", -2.0),
    UniformSpec::scalar("spin_speed", 7.0),
    UniformSpec::scalar("paint_contrast", 3.5),
    UniformSpec::scalar("lighting", 0.4),
    UniformSpec::scalar("spin_amount", 0.25),
    UniformSpec::scalar("pixel_filter", 745.0),
    UniformSpec::scalar("spin_ease", 1.0),
    UniformSpec::boolean("is_rotate", false),
    UniformSpec::vec3("color1", [0.871, 0.267, 0.231]),
    UniformSpec::vec3("color2", [0.0, 0.42, 0.706]),
    UniformSpec::vec3("color3", [0.086, 0.137, 0.145]),
];

static GLASS_SCHEMA: [UniformSpec; 9] = [
    UniformSpec::scalar("time", 0.0),
    UniformSpec::vec2("resolution", [1.0, 1.0]),
    UniformSpec::scalar("hue", 0.0),
    UniformSpec::scalar("saturation", 1.0),
    UniformSpec::scalar("contrast", 1.0),
    UniformSpec::scalar("speed", 0.8),
    UniformSpec::scalar("sides", 6.0),
    UniformSpec::scalar("density", 15.0),
    UniformSpec::scalar("glow", 1.2),
];

static CHARGED_CELLS_SCHEMA: [UniformSpec; 10] = [
    UniformSpec::scalar("time", 0.0),
    UniformSpec::vec2("resolution", [1.0, 1.0]),
    UniformSpec::scalar("hue", 0.0),
    UniformSpec::scalar("saturation", 1.0),
    UniformSpec::scalar("contrast", 1.0),
    UniformSpec::scalar("speed", 1.0),
    UniformSpec::scalar("scale", 5.0),
    UniformSpec::vec3("color1", [0.18, 0.7, 0.4]),
    UniformSpec::vec3("color2", [0.58, 1.0, 0.15]),
    UniformSpec::vec3("color3", [0.0, 0.65, 0.31]),
];

static PROGRAMS: [PatternProgram; 5] = [
    PatternProgram {
        id: PatternId::Melt,
        source: include_str!("../../shaders/patterns/melt.wgsl"),
        schema: &MELT_SCHEMA,
    },
    PatternProgram {
        id: PatternId::Flow,
        source: include_str!("../../shaders/patterns/flow.wgsl"),
        schema: &FLOW_SCHEMA,
    },
    PatternProgram {
        id: PatternId::Balatro,
        source: include_str!("../../shaders/patterns/balatro.wgsl"),
        schema: &BALATRO_SCHEMA,
    },
    PatternProgram {
        id: PatternId::Glass,
        source: include_str!("../../shaders/patterns/glass.wgsl"),
        schema: &GLASS_SCHEMA,
    },
    PatternProgram {
        id: PatternId::ChargedCells,
        source: include_str!("../../shaders/patterns/charged_cells.wgsl"),
        schema: &CHARGED_CELLS_SCHEMA,
    },
];

pub fn lookup(id: PatternId) -> &'static PatternProgram {
    match id {
        PatternId::Melt => &PROGRAMS[0],
        PatternId::Flow => &PROGRAMS[1],
        PatternId::Balatro => &PROGRAMS[2],
        PatternId::Glass => &PROGRAMS[3],
        PatternId::ChargedCells => &PROGRAMS[4],
    }
}

pub fn all() -> &'static [PatternProgram] {
    &PROGRAMS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::UniformKind;

    const SHARED: [(&str, UniformKind); 5] = [
        ("time", UniformKind::Scalar),
        ("resolution", UniformKind::Vec2),
        ("hue", UniformKind::Scalar),
        ("saturation", UniformKind::Scalar),
        ("contrast", UniformKind::Scalar),
    ];

    #[test]
    fn lookup_matches_id() {
        for id in PatternId::ALL {
            assert_eq!(lookup(id).id, id);
        }
        assert_eq!(all().len(), PatternId::ALL.len());
    }

    #[test]
    fn every_program_exposes_shared_uniforms() {
        for program in all() {
            for (name, kind) in SHARED {
                let spec = program
                    .schema
                    .iter()
                    .find(|spec| spec.name == name)
                    .unwrap_or_else(|| {
                        panic!("{} is missing '{}'", program.name(), name)
                    });
                assert_eq!(spec.kind, kind, "{}.{}", program.name(), name);
            }
        }
    }

    #[test]
    fn schema_names_are_unique_and_defaults_match_kinds() {
        for program in all() {
            for (index, spec) in program.schema.iter().enumerate() {
                assert_eq!(spec.default.kind(), spec.kind);
                assert!(
                    !program.schema[index + 1..]
                        .iter()
                        .any(|other| other.name == spec.name),
                    "{} declares '{}' twice",
                    program.name(),
                    spec.name
                );
            }
        }
    }

    #[test]
    fn color_patterns_expose_three_colors() {
        for id in [PatternId::Balatro, PatternId::ChargedCells] {
            let defaults = lookup(id).defaults();
            for name in ["color1", "color2", "color3"] {
                assert!(matches!(
                    defaults.get(name),
                    Some(crate::uniforms::UniformValue::Vec3(_))
                ));
            }
        }
    }

    #[test]
    fn every_body_defines_pattern_entry() {
        for program in all() {
            assert!(
                program.source.contains("fn pattern(frag_coord: vec2<f32>"),
                "{}",
                program.name()
            );
            assert!(!program.source.contains("@group"));
            assert!(!program.source.contains("@fragment"));
        }
    }
}
