use std::fs;
use std::path::{Path, PathBuf};

use directories_next::BaseDirs;
use serde_yml::Value;
use yaml_merge_keys::merge_keys_serde_yml;

use super::Settings;
use crate::error::SettingsError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SettingsFormat {
    #[default]
    Json,
    Yaml,
}

impl SettingsFormat {
    /// `.yml`/`.yaml` are YAML; everything else is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yml") | Some("yaml") => SettingsFormat::Yaml,
            _ => SettingsFormat::Json,
        }
    }
}

pub fn config_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|base| base.config_dir().join("ShaderText"))
}

pub fn default_settings_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("settings.json"))
}

pub fn import(
    source: &str,
    format: SettingsFormat,
) -> Result<Settings, SettingsError> {
    match format {
        SettingsFormat::Json => import_json(source),
        SettingsFormat::Yaml => import_yaml(source),
    }
}

pub fn import_json(source: &str) -> Result<Settings, SettingsError> {
    let settings = serde_json::from_str::<Settings>(source)
        .map_err(|err| malformed(err.to_string()))?;
    settings.validate().map_err(malformed)?;
    Ok(settings)
}

/// YAML documents may use `<<` merge keys, e.g. to share one
/// hue/saturation/contrast mapping between several pattern records.
pub fn import_yaml(source: &str) -> Result<Settings, SettingsError> {
    let raw: Value = serde_yml::from_str(source).map_err(|err| {
        malformed(format!("failed to parse YAML: {}", err))
    })?;

    let merged = merge_keys_serde_yml(raw).map_err(|err| {
        malformed(format!("failed to process YAML merge keys: {}", err))
    })?;

    let settings = serde_yml::from_value::<Settings>(merged)
        .map_err(|err| malformed(err.to_string()))?;
    settings.validate().map_err(malformed)?;
    Ok(settings)
}

pub fn export_json(settings: &Settings) -> Result<String, SettingsError> {
    serde_json::to_string_pretty(settings)
        .map_err(|err| SettingsError::Export(err.to_string()))
}

pub fn load_file(path: &Path) -> Result<Settings, SettingsError> {
    let source = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    import(&source, SettingsFormat::from_path(path))
}

/// Always writes JSON regardless of extension.
pub fn save_file(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let json = export_json(settings)?;
    let io_err = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() {
            fs::create_dir_all(parent_dir).map_err(io_err)?;
        }
    }

    fs::write(path, json).map_err(io_err)
}

fn malformed(message: String) -> SettingsError {
    SettingsError::MalformedSettingsImport(message)
}
