pub use crate::clock::{FrameClock, FrameState, Viewport};
pub use crate::compositor::{Material, MaterialSlot, PatternCompositor};
pub use crate::error::{ProgramCompileError, RenderError, SettingsError};
pub use crate::headless::{HeadlessFrame, HeadlessRenderer};
pub use crate::logging::init_logger;
pub use crate::logging::{debug, error, info, trace, warn};
pub use crate::mask::{MaskRasterizer, MaskUpdate};
pub use crate::patterns::{PatternParams, PatternProgram};
pub use crate::post::PostEffectStage;
pub use crate::preview::Preview;
pub use crate::settings::*;
pub use crate::uniforms::{UniformBlock, UniformKind, UniformSpec, UniformValue};
pub use crate::warn_once;
