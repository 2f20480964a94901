//! Error taxonomy for the context pipeline.
//!
//! Only [`VaultError::Configuration`] and [`VaultError::TemplateLookup`] abort
//! a generation. Everything that can go wrong while walking the vault or
//! reading a single file is reported in-band instead (see
//! [`DiscoveryWarning`](crate::discovery::DiscoveryWarning) and the error
//! block produced by [`format_file`](crate::formatter::format_file)).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The vault root (or another caller-supplied location) is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A template name or path did not resolve to readable text.
    #[error("template not found: {0}")]
    TemplateLookup(String),

    /// The generated prompt could not be written to its output file.
    #[error("failed to write output to {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file could not be read, parsed, or saved.
    #[error("settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;
