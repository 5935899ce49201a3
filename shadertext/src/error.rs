use std::path::PathBuf;

use thiserror::Error;

/// A pattern or post program that failed to parse, validate or link.
/// Carries the compiler diagnostic verbatim.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("program '{program}' failed to compile:\n{log}")]
pub struct ProgramCompileError {
    pub program: String,
    pub log: String,
}

impl ProgramCompileError {
    pub fn new(program: impl Into<String>, log: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            log: log.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    /// Structural failure while importing a settings document. Nothing from
    /// the document is applied.
    #[error("malformed settings import: {0}")]
    MalformedSettingsImport(String),

    #[error("failed to export settings: {0}")]
    Export(String),

    #[error("settings file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),

    #[error("failed to request GPU device: {0}")]
    Device(String),

    #[error(transparent)]
    Program(#[from] ProgramCompileError),

    #[error("frame readback failed: {0}")]
    Readback(String),

    #[error("failed to write image '{path}': {message}")]
    Image { path: PathBuf, message: String },
}
