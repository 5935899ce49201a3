mod app;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use shadertext::prelude::*;
use shadertext::settings::{self, SettingsStore};

#[derive(Debug, Parser)]
#[command(name = "shadertext")]
#[command(about = "Text masked by animated shader patterns")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Open the live preview window (the default)
    Run {
        /// Settings file (JSON or YAML), reloaded when it changes on disk
        #[arg(short = 's', long = "settings")]
        settings: Option<PathBuf>,
        #[arg(long = "width", default_value_t = 1280.0)]
        width: f64,
        #[arg(long = "height", default_value_t = 720.0)]
        height: f64,
    },
    /// Render one frame offscreen and write it as a PNG
    Snapshot {
        #[arg(short = 's', long = "settings")]
        settings: Option<PathBuf>,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        #[arg(long = "width", default_value_t = 1280)]
        width: u32,
        #[arg(long = "height", default_value_t = 720)]
        height: u32,
        #[arg(long = "scale", default_value_t = 1.0)]
        scale: f32,
        /// Seconds; the frame is rendered with time frozen here
        #[arg(long = "time", default_value_t = 0.0)]
        time: f32,
    },
    /// Write the default settings document as JSON
    ExportDefaults {
        /// Prints to stdout when omitted
        output: Option<PathBuf>,
    },
}

fn main() {
    init_logger();

    let cli = Cli::parse();
    let result = match cli.command.unwrap_or(Commands::Run {
        settings: None,
        width: 1280.0,
        height: 720.0,
    }) {
        Commands::Run {
            settings,
            width,
            height,
        } => run(settings, [width, height]),
        Commands::Snapshot {
            settings,
            output,
            width,
            height,
            scale,
            time,
        } => snapshot(settings.as_deref(), &output, [width, height], scale, time),
        Commands::ExportDefaults { output } => export_defaults(output),
    };

    if let Err(err) = result {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn run(settings_path: Option<PathBuf>, size: [f64; 2]) -> Result<(), String> {
    let path = settings_path.or_else(settings::default_settings_path);
    let store = match path.as_deref() {
        Some(path) if path.exists() => load_store(path)?,
        Some(path) => {
            settings::save_file(path, &Settings::default())
                .map_err(|err| err.to_string())?;
            info!("wrote default settings to {}", path.display());
            SettingsStore::default()
        }
        None => {
            warn!("no config directory; running with default settings");
            SettingsStore::default()
        }
    };

    app::run(store, path, size)
}

fn snapshot(
    settings_path: Option<&Path>,
    output: &Path,
    size: [u32; 2],
    scale: f32,
    time: f32,
) -> Result<(), String> {
    let store = match settings_path {
        Some(path) => load_store(path)?,
        None => SettingsStore::default(),
    };

    let viewport = Viewport::new(size[0], size[1], scale);
    let mut renderer = HeadlessRenderer::with_system_fonts(viewport, store.current())
        .map_err(|err| err.to_string())?;

    let frame = renderer
        .render(store.current(), time)
        .map_err(|err| err.to_string())?;
    frame.save_png(output).map_err(|err| err.to_string())?;

    renderer.shutdown();
    Ok(())
}

fn export_defaults(output: Option<PathBuf>) -> Result<(), String> {
    let Some(path) = output else {
        let json = settings::export_json(&Settings::default())
            .map_err(|err| err.to_string())?;
        println!("{}", json);
        return Ok(());
    };

    settings::save_file(&path, &Settings::default()).map_err(|err| err.to_string())?;
    info!("wrote default settings to {}", path.display());
    Ok(())
}

fn load_store(path: &Path) -> Result<SettingsStore, String> {
    let settings = settings::load_file(path).map_err(|err| err.to_string())?;
    info!("loaded settings from {}", path.display());
    Ok(SettingsStore::new(settings))
}
