//! Line-numbered rendering of a single file.
//!
//! Each block is self-delimiting so blocks can be concatenated without any
//! extra separators:
//!
//! ```text
//!
//! --------------------------------------------------------------------------------
//! /Projects/plan.md:
//! --------------------------------------------------------------------------------
//!   1 | # Plan
//!   2 |
//!   3 | Ship it.
//! --------------------------------------------------------------------------------
//! ```
//!
//! Reading never fails the caller: undecodable UTF-8 is re-read as Latin-1,
//! and an unreadable file produces a block that says so.

use std::path::Path;

use tracing::{debug, warn};

use crate::discovery::to_posix;

/// Width of the separator lines around each block.
pub const SEPARATOR_WIDTH: usize = 80;

/// Body used when a file has no lines at all.
pub const EMPTY_FILE_MARKER: &str = "(empty file)";

/// Minimum width of the line-number column.
const MIN_NUMBER_WIDTH: usize = 3;

pub fn separator() -> String {
    "-".repeat(SEPARATOR_WIDTH)
}

/// Decoded file text and whether the Latin-1 fallback was needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileText {
    pub text: String,
    pub latin1_fallback: bool,
}

/// Read `path` as UTF-8, falling back to Latin-1 when decoding fails.
pub fn read_text(path: &Path) -> std::io::Result<FileText> {
    let bytes = std::fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(FileText {
            text,
            latin1_fallback: false,
        }),
        Err(err) => {
            warn!("{} is not valid UTF-8; reading as Latin-1", path.display());
            Ok(FileText {
                text: decode_latin1(err.as_bytes()),
                latin1_fallback: true,
            })
        }
    }
}

/// Latin-1 maps every byte to the code point with the same value.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Header path for `file_path`: vault-relative POSIX, or the bare file name.
fn header_path(file_path: &Path, vault_root: &Path) -> String {
    match file_path.strip_prefix(vault_root) {
        Ok(rel) => to_posix(rel),
        Err(_) => {
            warn!(
                "cannot compute a path for {} relative to {}; using the file name",
                file_path.display(),
                vault_root.display()
            );
            file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_path.display().to_string())
        }
    }
}

/// Split on `\n`, `\r\n` and lone `\r`. A trailing terminator does not
/// start an extra line.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(['\n', '\r']) {
            Some(end) => {
                lines.push(&rest[..end]);
                let width = if rest[end..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[end + width..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

/// Number every line of `text`.
///
/// Returns `None` when `text` has no lines.
pub fn number_lines(text: &str) -> Option<String> {
    let lines = split_lines(text);
    if lines.is_empty() {
        return None;
    }
    let width = lines.len().to_string().len().max(MIN_NUMBER_WIDTH);
    let numbered: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if line.trim().is_empty() {
                format!("{:>width$} |", i + 1, width = width)
            } else {
                format!("{:>width$} | {}", i + 1, line, width = width)
            }
        })
        .collect();
    Some(numbered.join("\n"))
}

/// Format one file as a delimited, line-numbered block.
pub fn format_file(file_path: &Path, vault_root: &Path) -> String {
    let rel = header_path(file_path, vault_root);
    let sep = separator();
    let header = format!("\n{sep}\n/{rel}:\n{sep}\n");

    let body = match read_text(file_path) {
        Ok(file) => {
            debug!(
                path = %rel,
                latin1 = file.latin1_fallback,
                "formatting file"
            );
            number_lines(&file.text).unwrap_or_else(|| format!(" {}", EMPTY_FILE_MARKER))
        }
        Err(err) => {
            warn!("cannot read {}: {}", file_path.display(), err);
            format!(" *** Error reading file: {} ***", err)
        }
    };

    format!("{header}{body}\n{sep}\n")
}
