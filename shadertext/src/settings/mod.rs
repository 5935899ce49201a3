//! The settings value the render core reads every frame.
//!
//! Settings are owned by whatever drives the preview (a settings file in the
//! viewer, a test, a UI) and are only ever read by the core. The document
//! shape is flat with camelCase keys so exported files stay interchangeable
//! with hand-written ones.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

pub mod io;
pub mod watch;

pub use io::{
    SettingsFormat, default_settings_path, export_json, import, import_json,
    import_yaml, load_file, save_file,
};
pub use watch::SettingsWatcher;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum PatternId {
    #[default]
    Melt,
    Flow,
    Balatro,
    Glass,
    ChargedCells,
}

impl PatternId {
    pub const ALL: [PatternId; 5] = [
        PatternId::Melt,
        PatternId::Flow,
        PatternId::Balatro,
        PatternId::Glass,
        PatternId::ChargedCells,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternId::Melt => "melt",
            PatternId::Flow => "flow",
            PatternId::Balatro => "balatro",
            PatternId::Glass => "glass",
            PatternId::ChargedCells => "charged-cells",
        }
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown pattern '{}'", s))
    }
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BlurKind {
    #[default]
    None,
    Gaussian,
    Motion,
    Zoom,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NoiseKind {
    #[default]
    None,
    Grain,
    Static,
    Scanline,
}

pub type Rgb = [f32; 3];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MeltConfig {
    pub hue: f32,
    pub saturation: f32,
    pub zoom: f32,
    pub speed: f32,
    pub detail: f32,
    pub contrast: f32,
}

impl Default for MeltConfig {
    fn default() -> Self {
        Self {
            hue: 0.0,
            saturation: 1.0,
            zoom: 7.6,
            speed: 0.5,
            detail: 0.2,
            contrast: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FlowConfig {
    pub velocity: f32,
    pub detail: f32,
    pub twist: f32,
    pub speed: f32,
    pub contrast: f32,
    pub rgb_r: f32,
    pub rgb_g: f32,
    pub rgb_b: f32,
    pub color_offset: f32,
    pub hue: f32,
    pub saturation: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            velocity: 0.2,
            detail: 200.0,
            twist: 50.0,
            speed: 2.5,
            contrast: 1.0,
            rgb_r: 1.0,
            rgb_g: 1.0,
            rgb_b: 1.0,
            color_offset: 0.0,
            hue: 0.0,
            saturation: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BalatroConfig {
    pub speed: f32,
    pub spin_rotation: f32,
    pub spin_speed: f32,
    pub contrast: f32,
    pub lighting: f32,
    pub spin_amount: f32,
    pub pixel_filter: f32,
    pub spin_ease: f32,
    pub is_rotate: bool,
    pub color1: Rgb,
    pub color2: Rgb,
    pub color3: Rgb,
}

impl Default for BalatroConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            spin_rotation: -2.0,
            spin_speed: 7.0,
            contrast: 3.5,
            lighting: 0.4,
            spin_amount: 0.25,
            pixel_filter: 745.0,
            spin_ease: 1.0,
            is_rotate: false,
            color1: [0.871, 0.267, 0.231],
            color2: [0.0, 0.42, 0.706],
            color3: [0.086, 0.137, 0.145],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GlassConfig {
    pub speed: f32,
    pub sides: f32,
    pub hue: f32,
    pub saturation: f32,
    pub contrast: f32,
    pub density: f32,
    pub glow: f32,
}

impl Default for GlassConfig {
    fn default() -> Self {
        Self {
            speed: 0.8,
            sides: 6.0,
            hue: 0.0,
            saturation: 1.0,
            contrast: 1.0,
            density: 15.0,
            glow: 1.2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChargedCellsConfig {
    pub speed: f32,
    pub scale: f32,
    pub hue: f32,
    pub saturation: f32,
    pub color1: Rgb,
    pub color2: Rgb,
    pub color3: Rgb,
}

impl Default for ChargedCellsConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            scale: 5.0,
            hue: 0.0,
            saturation: 1.0,
            color1: [0.18, 0.7, 0.4],
            color2: [0.58, 1.0, 0.15],
            color3: [0.0, 0.65, 0.31],
        }
    }
}

/// Largest accepted `fontSize`, in CSS pixels. Glyphs are rasterized at
/// this size times the scale factor, so the cap bounds per-glyph bitmaps.
pub const MAX_FONT_SIZE: f32 = 2000.0;

/// The full settings document. Every pattern keeps its own record so that
/// switching `active_shader` back and forth loses nothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Settings {
    pub text: String,
    pub font_size: f32,
    pub font_weight: f32,
    pub font_family: String,
    pub text_translate_x: f32,
    pub text_translate_y: f32,

    pub active_shader: PatternId,

    pub melt: MeltConfig,
    pub flow: FlowConfig,
    pub balatro: BalatroConfig,
    pub glass: GlassConfig,
    pub charged_cells: ChargedCellsConfig,

    pub blur_type: BlurKind,
    pub blur_strength: f32,
    pub blur_angle: f32,
    pub noise_type: NoiseKind,
    pub noise_strength: f32,

    pub is_frozen: bool,
    pub manual_time: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text: "קרח".to_string(),
            font_size: 450.0,
            font_weight: 600.0,
            font_family: "Quicksand".to_string(),
            text_translate_x: 0.0,
            text_translate_y: 0.0,
            active_shader: PatternId::Melt,
            melt: MeltConfig::default(),
            flow: FlowConfig::default(),
            balatro: BalatroConfig::default(),
            glass: GlassConfig::default(),
            charged_cells: ChargedCellsConfig::default(),
            blur_type: BlurKind::None,
            blur_strength: 0.0,
            blur_angle: 0.0,
            noise_type: NoiseKind::None,
            noise_strength: 0.0,
            is_frozen: false,
            manual_time: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BlurSettings {
    pub kind: BlurKind,
    pub strength: f32,
    /// Degrees
    pub angle: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NoiseSettings {
    pub kind: NoiseKind,
    pub strength: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TimeControl {
    pub is_frozen: bool,
    pub manual_time: f32,
}

impl Settings {
    pub fn blur(&self) -> BlurSettings {
        BlurSettings {
            kind: self.blur_type,
            strength: self.blur_strength,
            angle: self.blur_angle,
        }
    }

    pub fn noise(&self) -> NoiseSettings {
        NoiseSettings {
            kind: self.noise_type,
            strength: self.noise_strength,
        }
    }

    pub fn time_control(&self) -> TimeControl {
        TimeControl {
            is_frozen: self.is_frozen,
            manual_time: self.manual_time,
        }
    }

    /// Checks what serde cannot: every number must be finite and the font
    /// size must lie in `(0, MAX_FONT_SIZE]`.
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in self.numeric_fields() {
            if !value.is_finite() {
                return Err(format!("'{}' must be a finite number", name));
            }
        }

        if self.font_size <= 0.0 {
            return Err(format!(
                "'fontSize' must be positive, got {}",
                self.font_size
            ));
        }
        if self.font_size > MAX_FONT_SIZE {
            return Err(format!(
                "'fontSize' must be at most {}, got {}",
                MAX_FONT_SIZE, self.font_size
            ));
        }

        Ok(())
    }

    fn numeric_fields(&self) -> Vec<(String, f32)> {
        let mut fields = vec![
            ("fontSize".to_string(), self.font_size),
            ("fontWeight".to_string(), self.font_weight),
            ("textTranslateX".to_string(), self.text_translate_x),
            ("textTranslateY".to_string(), self.text_translate_y),
            ("blurStrength".to_string(), self.blur_strength),
            ("blurAngle".to_string(), self.blur_angle),
            ("noiseStrength".to_string(), self.noise_strength),
            ("manualTime".to_string(), self.manual_time),
        ];

        let m = &self.melt;
        push_group(
            &mut fields,
            "melt",
            &[
                ("hue", m.hue),
                ("saturation", m.saturation),
                ("zoom", m.zoom),
                ("speed", m.speed),
                ("detail", m.detail),
                ("contrast", m.contrast),
            ],
        );

        let f = &self.flow;
        push_group(
            &mut fields,
            "flow",
            &[
                ("velocity", f.velocity),
                ("detail", f.detail),
                ("twist", f.twist),
                ("speed", f.speed),
                ("contrast", f.contrast),
                ("rgbR", f.rgb_r),
                ("rgbG", f.rgb_g),
                ("rgbB", f.rgb_b),
                ("colorOffset", f.color_offset),
                ("hue", f.hue),
                ("saturation", f.saturation),
            ],
        );

        let b = &self.balatro;
        push_group(
            &mut fields,
            "balatro",
            &[
                ("speed", b.speed),
                ("spinRotation", b.spin_rotation),
                ("spinSpeed", b.spin_speed),
                ("contrast", b.contrast),
                ("lighting", b.lighting),
                ("spinAmount", b.spin_amount),
                ("pixelFilter", b.pixel_filter),
                ("spinEase", b.spin_ease),
            ],
        );
        push_colors(&mut fields, "balatro", [b.color1, b.color2, b.color3]);

        let g = &self.glass;
        push_group(
            &mut fields,
            "glass",
            &[
                ("speed", g.speed),
                ("sides", g.sides),
                ("hue", g.hue),
                ("saturation", g.saturation),
                ("contrast", g.contrast),
                ("density", g.density),
                ("glow", g.glow),
            ],
        );

        let c = &self.charged_cells;
        push_group(
            &mut fields,
            "chargedCells",
            &[
                ("speed", c.speed),
                ("scale", c.scale),
                ("hue", c.hue),
                ("saturation", c.saturation),
            ],
        );
        push_colors(&mut fields, "chargedCells", [c.color1, c.color2, c.color3]);

        fields
    }
}

fn push_group(
    fields: &mut Vec<(String, f32)>,
    group: &str,
    values: &[(&str, f32)],
) {
    for (name, value) in values {
        fields.push((format!("{}.{}", group, name), *value));
    }
}

fn push_colors(fields: &mut Vec<(String, f32)>, group: &str, colors: [Rgb; 3]) {
    for (index, color) in colors.iter().enumerate() {
        for (channel, value) in color.iter().enumerate() {
            fields.push((
                format!("{}.color{}[{}]", group, index + 1, channel),
                *value,
            ));
        }
    }
}

/// Holds the current settings and only ever replaces them wholesale with a
/// fully validated document.
#[derive(Clone, Debug, Default)]
pub struct SettingsStore {
    current: Settings,
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self { current: settings }
    }

    pub fn current(&self) -> &Settings {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Settings {
        &mut self.current
    }

    pub fn replace(&mut self, settings: Settings) -> Settings {
        std::mem::replace(&mut self.current, settings)
    }

    /// Parses and validates `source`; on failure the current value is left
    /// untouched.
    pub fn import(
        &mut self,
        source: &str,
        format: SettingsFormat,
    ) -> Result<(), SettingsError> {
        let settings = io::import(source, format)?;
        self.current = settings;
        Ok(())
    }

    pub fn export(&self) -> Result<String, SettingsError> {
        export_json(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_ids_round_trip_through_strings() {
        for id in PatternId::ALL {
            assert_eq!(id.as_str().parse::<PatternId>(), Ok(id));
        }
        assert!("not-a-real-pattern".parse::<PatternId>().is_err());
    }

    #[test]
    fn charged_cells_serializes_in_kebab_case() {
        let json = serde_json::to_string(&PatternId::ChargedCells).unwrap();
        assert_eq!(json, "\"charged-cells\"");
    }

    #[test]
    fn defaults_validate() {
        assert_eq!(Settings::default().validate(), Ok(()));
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let mut settings = Settings::default();
        settings.glass.density = f32::NAN;
        let err = settings.validate().unwrap_err();
        assert!(err.contains("glass.density"), "{}", err);

        let mut settings = Settings::default();
        settings.balatro.color2[1] = f32::INFINITY;
        let err = settings.validate().unwrap_err();
        assert!(err.contains("balatro.color2[1]"), "{}", err);
    }

    #[test]
    fn font_size_must_be_positive() {
        let settings = Settings {
            font_size: 0.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn font_size_is_capped() {
        let mut settings = Settings {
            font_size: MAX_FONT_SIZE,
            ..Default::default()
        };
        assert!(settings.validate().is_ok());

        settings.font_size = MAX_FONT_SIZE + 1.0;
        let err = settings.validate().unwrap_err();
        assert!(err.contains("at most"), "{}", err);
    }

    #[test]
    fn store_keeps_previous_value_on_failed_import() {
        let mut store = SettingsStore::new(Settings {
            text: "keep me".to_string(),
            ..Default::default()
        });

        let result =
            store.import("{\"activeShader\": \"glass\"}", SettingsFormat::Json);

        assert!(matches!(
            result,
            Err(SettingsError::MalformedSettingsImport(_))
        ));
        assert_eq!(store.current().text, "keep me");
    }

    #[test]
    fn store_replaces_on_successful_import() {
        let mut exported = Settings::default();
        exported.active_shader = PatternId::Glass;
        exported.glass.sides = 9.0;
        let json = export_json(&exported).unwrap();

        let mut store = SettingsStore::default();
        store.import(&json, SettingsFormat::Json).unwrap();

        assert_eq!(store.current(), &exported);
    }
}
