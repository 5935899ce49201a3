use crate::settings::{
    BalatroConfig, ChargedCellsConfig, FlowConfig, GlassConfig, MeltConfig,
    PatternId, Settings,
};
use crate::uniforms::{UniformBlock, UniformValue};

/// The settings record of one pattern, tagged by which pattern it drives.
#[derive(Clone, Debug, PartialEq)]
pub enum PatternParams {
    Melt(MeltConfig),
    Flow(FlowConfig),
    Balatro(BalatroConfig),
    Glass(GlassConfig),
    ChargedCells(ChargedCellsConfig),
}

/// Wraps a hue in degrees into `[0, 1)` turns, so 0° and 360° are the same
/// value.
pub fn hue_turns(degrees: f32) -> f32 {
    let turns = (degrees / 360.0).rem_euclid(1.0);
    if turns >= 1.0 { 0.0 } else { turns }
}

impl PatternParams {
    /// Picks the record for `id` out of `settings`.
    pub fn from_settings(settings: &Settings, id: PatternId) -> Self {
        match id {
            PatternId::Melt => PatternParams::Melt(settings.melt.clone()),
            PatternId::Flow => PatternParams::Flow(settings.flow.clone()),
            PatternId::Balatro => {
                PatternParams::Balatro(settings.balatro.clone())
            }
            PatternId::Glass => PatternParams::Glass(settings.glass.clone()),
            PatternId::ChargedCells => {
                PatternParams::ChargedCells(settings.charged_cells.clone())
            }
        }
    }

    pub fn id(&self) -> PatternId {
        match self {
            PatternParams::Melt(_) => PatternId::Melt,
            PatternParams::Flow(_) => PatternId::Flow,
            PatternParams::Balatro(_) => PatternId::Balatro,
            PatternParams::Glass(_) => PatternId::Glass,
            PatternParams::ChargedCells(_) => PatternId::ChargedCells,
        }
    }

    /// Every uniform value for one frame, in no particular order. `time`
    /// and `resolution` are always included.
    pub fn bindings(
        &self,
        time: f32,
        resolution: [f32; 2],
    ) -> Vec<(&'static str, UniformValue)> {
        use UniformValue::{Bool, Scalar, Vec2, Vec3};

        let mut out = vec![("time", Scalar(time)), ("resolution", Vec2(resolution))];

        match self {
            PatternParams::Melt(c) => out.extend([
                ("hue", Scalar(hue_turns(c.hue))),
                ("saturation", Scalar(c.saturation)),
                ("contrast", Scalar(c.contrast)),
                ("zoom", Scalar(c.zoom)),
                ("speed", Scalar(c.speed)),
                ("detail", Scalar(c.detail)),
            ]),
            PatternParams::Flow(c) => out.extend([
                ("hue", Scalar(hue_turns(c.hue))),
                ("saturation", Scalar(c.saturation)),
                ("contrast", Scalar(c.contrast)),
                ("velocity", Scalar(c.velocity)),
                ("detail", Scalar(c.detail)),
                ("twist", Scalar(c.twist)),
                ("speed", Scalar(c.speed)),
                ("rgb_r", Scalar(c.rgb_r)),
                ("rgb_g", Scalar(c.rgb_g)),
                ("rgb_b", Scalar(c.rgb_b)),
                ("color_offset", Scalar(c.color_offset)),
            ]),
            // The color tail runs as identity here; `contrast` belongs to
            // the paint model.
            PatternParams::Balatro(c) => out.extend([
                ("hue", Scalar(0.0)),
                ("saturation", Scalar(1.0)),
                ("contrast", Scalar(1.0)),
                ("speed", Scalar(c.speed)),
                ("spin_rotation", Scalar(c.spin_rotation)),
                ("spin_speed", Scalar(c.spin_speed)),
                ("paint_contrast", Scalar(c.contrast)),
                ("lighting", Scalar(c.lighting)),
                ("spin_amount", Scalar(c.spin_amount)),
                ("pixel_filter", Scalar(c.pixel_filter)),
                ("spin_ease", Scalar(c.spin_ease)),
                ("is_rotate", Bool(c.is_rotate)),
                ("color1", Vec3(c.color1)),
                ("color2", Vec3(c.color2)),
                ("color3", Vec3(c.color3)),
            ]),
            PatternParams::Glass(c) => out.extend([
                ("hue", Scalar(hue_turns(c.hue))),
                ("saturation", Scalar(c.saturation)),
                ("contrast", Scalar(c.contrast)),
                ("speed", Scalar(c.speed)),
                ("sides", Scalar(c.sides)),
                ("density", Scalar(c.density)),
                ("glow", Scalar(c.glow)),
            ]),
            PatternParams::ChargedCells(c) => out.extend([
                ("hue", Scalar(hue_turns(c.hue))),
                ("saturation", Scalar(c.saturation)),
                ("contrast", Scalar(1.0)),
                ("speed", Scalar(c.speed)),
                ("scale", Scalar(c.scale)),
                ("color1", Vec3(c.color1)),
                ("color2", Vec3(c.color2)),
                ("color3", Vec3(c.color3)),
            ]),
        }

        out
    }

    /// Writes [`Self::bindings`] into `block`. Fails if the block belongs to
    /// a different program.
    pub fn apply(
        &self,
        block: &mut UniformBlock,
        time: f32,
        resolution: [f32; 2],
    ) -> Result<(), String> {
        for (name, value) in self.bindings(time, resolution) {
            block.set(name, value)?;
        }
        Ok(())
    }
}
