pub mod clock;
pub mod compositor;
pub mod error;
pub mod headless;
pub mod linker;
pub mod logging;
pub mod mask;
pub mod patterns;
pub mod post;
pub mod prelude;
pub mod preview;
pub mod settings;
pub mod uniforms;

pub use error::{ProgramCompileError, RenderError, SettingsError};
pub use preview::Preview;
pub use settings::Settings;
