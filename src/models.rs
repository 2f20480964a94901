//! Core value types shared by the discovery, rendering, and templating stages.
//!
//! Every value here is built explicitly per call and owned by that call; no
//! defaults are shared between generations.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the `{contexto_extraido}` block should contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Directory tree of the relevant files only.
    Tree,
    /// Numbered file contents only.
    Content,
    /// Tree followed by the contents.
    #[default]
    Both,
}

impl OutputMode {
    pub fn wants_tree(self) -> bool {
        matches!(self, OutputMode::Tree | OutputMode::Both)
    }

    pub fn wants_content(self) -> bool {
        matches!(self, OutputMode::Content | OutputMode::Both)
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Tree => write!(f, "tree"),
            OutputMode::Content => write!(f, "content"),
            OutputMode::Both => write!(f, "both"),
        }
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tree" => Ok(OutputMode::Tree),
            "content" => Ok(OutputMode::Content),
            "both" => Ok(OutputMode::Both),
            other => Err(format!(
                "unknown output mode '{}'. Must be tree, content, or both.",
                other
            )),
        }
    }
}

/// Normalize a user-supplied extension: lower-cased and dot-prefixed.
///
/// `".MD"`, `"md"` and `".md"` all become `".md"`. Blank input yields an
/// empty string, which matches nothing.
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return String::new();
    }
    format!(".{}", trimmed.to_lowercase())
}

/// The normalized extension of `path`, or `""` when it has none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| normalize_extension(&e.to_string_lossy()))
        .unwrap_or_default()
}

fn normalized_set<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|e| normalize_extension(e.as_ref()))
        .filter(|e| !e.is_empty())
        .collect()
}

/// Include/exclude extension rules.
///
/// A file passes iff `(included is empty OR ext ∈ included) AND ext ∉ excluded`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionFilter {
    included: BTreeSet<String>,
    excluded: BTreeSet<String>,
}

impl ExtensionFilter {
    pub fn new<I, E, S, T>(included: I, excluded: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            included: normalized_set(included),
            excluded: normalized_set(excluded),
        }
    }

    /// Matches every file.
    pub fn any() -> Self {
        Self::default()
    }

    /// Test an already-normalized extension.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        (self.included.is_empty() || self.included.contains(ext)) && !self.excluded.contains(ext)
    }

    pub fn accepts(&self, path: &Path) -> bool {
        self.accepts_extension(&extension_of(path))
    }
}

impl fmt::Display for ExtensionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join(", ");
        let included = if self.included.is_empty() {
            "any".to_string()
        } else {
            join(&self.included)
        };
        write!(f, "include [{}]", included)?;
        if !self.excluded.is_empty() {
            write!(f, " exclude [{}]", join(&self.excluded))?;
        }
        Ok(())
    }
}
