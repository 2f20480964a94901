//! TOML settings: saved vaults, the last used vault, and generation defaults.
//!
//! ```toml
//! last_vault = "notes"
//! templates_dir = "./templates"
//!
//! [vaults]
//! notes = "/home/me/notes"
//!
//! [defaults]
//! extensions = [".md"]
//! exclude_extensions = []
//! ignore_globs = [".obsidian/**", ".trash/**"]
//! mode = "both"
//! ```
//!
//! A missing settings file is not an error: [`load_settings`] returns the
//! defaults and the file is created on the first save.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::discovery::PathFilter;
use crate::error::{Result, VaultError};
use crate::models::{ExtensionFilter, OutputMode};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Name of the vault used by the last successful generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_vault: Option<String>,
    /// Directory scanned for `*.txt` templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
    /// Vault name → canonical root path.
    #[serde(default)]
    pub vaults: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub defaults: Defaults,
}

/// Values used when the command line does not say otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude_extensions: Vec<String>,
    #[serde(default = "default_ignore_globs")]
    pub ignore_globs: Vec<String>,
    #[serde(default)]
    pub mode: OutputMode,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            exclude_extensions: Vec::new(),
            ignore_globs: default_ignore_globs(),
            mode: OutputMode::default(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec![".md".to_string()]
}

fn default_ignore_globs() -> Vec<String> {
    vec![".obsidian/**".to_string(), ".trash/**".to_string()]
}

impl Defaults {
    pub fn extension_filter(&self) -> ExtensionFilter {
        ExtensionFilter::new(&self.extensions, &self.exclude_extensions)
    }
}

pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        VaultError::Settings(format!("failed to read {}: {}", path.display(), e))
    })?;

    let settings: Settings = toml::from_str(&content).map_err(|e| {
        VaultError::Settings(format!("failed to parse {}: {}", path.display(), e))
    })?;

    settings.validate()?;
    Ok(settings)
}

/// Write `settings` to `path` as pretty TOML, creating parent directories.
pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(settings)
        .map_err(|e| VaultError::Settings(format!("failed to serialize settings: {}", e)))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                VaultError::Settings(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
    }
    std::fs::write(path, content)
        .map_err(|e| VaultError::Settings(format!("failed to write {}: {}", path.display(), e)))
}

impl Settings {
    fn validate(&self) -> Result<()> {
        if self
            .defaults
            .extensions
            .iter()
            .chain(&self.defaults.exclude_extensions)
            .any(|e| e.trim().trim_start_matches('.').is_empty())
        {
            return Err(VaultError::Settings(
                "defaults.extensions and defaults.exclude_extensions must not contain empty entries"
                    .to_string(),
            ));
        }

        PathFilter::new(ExtensionFilter::any())
            .with_ignore_globs(&self.defaults.ignore_globs)
            .map_err(|e| VaultError::Settings(format!("defaults.ignore_globs: {}", e)))?;

        if self.vaults.keys().any(|name| name.trim().is_empty()) {
            return Err(VaultError::Settings("vault names must not be empty".to_string()));
        }

        Ok(())
    }

    /// Register `name` → `path`, replacing an existing entry of that name.
    pub fn add_vault(&mut self, name: &str, path: &Path) -> Result<PathBuf> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VaultError::Configuration("a vault needs a name".to_string()));
        }
        let canonical = path.canonicalize().map_err(|e| {
            VaultError::Configuration(format!("cannot resolve {}: {}", path.display(), e))
        })?;
        if !canonical.is_dir() {
            return Err(VaultError::Configuration(format!(
                "{} is not a directory",
                canonical.display()
            )));
        }
        if let Some(previous) = self.vaults.insert(name.to_string(), canonical.clone()) {
            warn!(
                "vault '{}' already existed ({}); updated",
                name,
                previous.display()
            );
        } else {
            info!("vault '{}' added: {}", name, canonical.display());
        }
        Ok(canonical)
    }

    /// Forget `name`. Clears the last-used pointer if it named this vault.
    pub fn remove_vault(&mut self, name: &str) -> Result<PathBuf> {
        let removed = self.vaults.remove(name).ok_or_else(|| {
            VaultError::Configuration(format!("no vault named '{}'", name))
        })?;
        if self.last_vault.as_deref() == Some(name) {
            self.last_vault = None;
        }
        Ok(removed)
    }

    /// Saved vaults whose path is still a directory.
    pub fn valid_vaults(&self) -> BTreeMap<String, PathBuf> {
        self.vaults
            .iter()
            .filter(|(name, path)| {
                let ok = path.is_dir();
                if !ok {
                    warn!(
                        "saved path for vault '{}' ({}) is no longer a directory; ignoring it",
                        name,
                        path.display()
                    );
                }
                ok
            })
            .map(|(name, path)| (name.clone(), path.clone()))
            .collect()
    }

    /// Path of the vault called `name`, if it is saved and still valid.
    pub fn resolve_vault(&self, name: &str) -> Result<PathBuf> {
        let path = self.vaults.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.vaults.keys().map(String::as_str).collect();
            VaultError::Configuration(format!(
                "no vault named '{}'. Known vaults: {}",
                name,
                if known.is_empty() {
                    "(none)".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })?;
        if !path.is_dir() {
            return Err(VaultError::Configuration(format!(
                "saved path for vault '{}' is not a directory: {}",
                name,
                path.display()
            )));
        }
        Ok(path.clone())
    }

    /// The last used vault, if it still exists. A stale pointer is cleared.
    pub fn last_vault(&mut self) -> Option<(String, PathBuf)> {
        let name = self.last_vault.clone()?;
        match self.resolve_vault(&name) {
            Ok(path) => Some((name, path)),
            Err(e) => {
                warn!("last used vault is no longer usable ({}); resetting it", e);
                self.last_vault = None;
                None
            }
        }
    }

    /// Remember `name` as the last used vault if it is saved and valid.
    pub fn set_last_vault(&mut self, name: &str) -> bool {
        match self.resolve_vault(name) {
            Ok(_) => {
                self.last_vault = Some(name.to_string());
                true
            }
            Err(e) => {
                warn!("not recording '{}' as last used vault: {}", name, e);
                false
            }
        }
    }
}
