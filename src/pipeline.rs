//! Prompt generation pipeline.
//!
//! Coordinates one generation: discovery → tree and/or content → context
//! block → destination metadata → placeholder injection. Each stage that
//! comes up empty degrades to an explicit marker in the text instead of
//! failing; only an unusable vault root aborts the call.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use crate::discovery::{find_relevant_files, Discovery, PathFilter};
use crate::error::{Result, VaultError};
use crate::formatter::format_file;
use crate::models::OutputMode;
use crate::template::{
    inject, tag_token, tag_tokens, PlaceholderSet, CONTEXT_TOKEN, DESTINATION_TOKEN, TAG_SLOTS,
};
use crate::tree::render_tree;

pub const TREE_UNAVAILABLE: &str = "(tree structure not available)";
pub const CONTENT_UNAVAILABLE: &str = "(content not available)";
pub const NOTHING_GENERATED: &str = "(nothing generated: no tree and no content)";

/// Rule placed between the tree and the contents in `both` mode.
pub fn content_separator() -> String {
    let rule = "-".repeat(40);
    format!("\n{rule} CONTENT {rule}\n\n")
}

/// Inputs of one generation.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub vault_root: PathBuf,
    pub targets: Vec<String>,
    pub filter: PathFilter,
    pub mode: OutputMode,
    /// Vault-relative path of the note the prompt is meant to produce.
    pub destination: Option<PathBuf>,
}

/// Everything one generation produced.
#[derive(Debug, Clone)]
pub struct Generation {
    /// The template with every placeholder substituted.
    pub prompt: String,
    /// The value that replaced `{contexto_extraido}`.
    pub context: String,
    pub discovery: Discovery,
    /// POSIX form of the destination, empty when none was given.
    pub destination: String,
    pub tags: Vec<String>,
    /// Placeholder tokens the template never mentions.
    pub unmatched: Vec<String>,
    /// Non-fatal observations made while generating.
    pub notes: Vec<String>,
}

pub fn generate(request: &GenerateRequest, template: &str) -> Result<Generation> {
    info!(
        mode = %request.mode,
        targets = request.targets.len(),
        "generating prompt from {}",
        request.vault_root.display()
    );

    let discovery = find_relevant_files(&request.vault_root, &request.targets, &request.filter)?;
    let mut notes: Vec<String> = discovery.warnings.iter().map(|w| w.to_string()).collect();

    let (destination, tags) = match request.destination.as_deref() {
        None => (String::new(), Vec::new()),
        Some(dest) => match relative_destination(dest, &request.vault_root, &discovery.root) {
            Some(rel) => (posix_path(&rel), hierarchical_tags(Some(rel.as_path()))),
            None => {
                let note = format!(
                    "destination {} is outside the vault; using it as given without hierarchical tags",
                    dest.display()
                );
                warn!("{}", note);
                notes.push(note);
                (posix_path(dest), Vec::new())
            }
        },
    };

    if discovery.files.is_empty() {
        warn!("no relevant files matched the filters and targets");
        notes.push("no relevant files matched the filters and targets".to_string());
    }

    let tree = if request.mode.wants_tree() {
        render_tree(&discovery.files, &discovery.root)
    } else {
        None
    };

    let content = if request.mode.wants_content() {
        let blocks: String = discovery
            .files
            .iter()
            .map(|file| format_file(file, &discovery.root))
            .collect();
        blocks.trim().to_string()
    } else {
        String::new()
    };

    let context = build_context(request.mode, tree.as_deref(), &content);

    if request.destination.is_none() {
        let mentions_destination = template.contains(DESTINATION_TOKEN);
        let mentions_tags = tag_tokens().iter().any(|t| template.contains(t.as_str()));
        if mentions_destination || mentions_tags {
            let note = "no destination note given; {ruta_destino} and {etiqueta_jerarquica_N} render empty";
            warn!("{}", note);
            notes.push(note.to_string());
        }
    }

    let placeholders = placeholder_set(&context, &destination, &tags);
    let injection = inject(template, &placeholders);
    if injection.unmatched.iter().any(|t| t == CONTEXT_TOKEN) {
        let note = "template has no {contexto_extraido}; the extracted context is not part of the prompt";
        warn!("{}", note);
        notes.push(note.to_string());
    }

    info!(
        files = discovery.files.len(),
        prompt_chars = injection.text.len(),
        "prompt generated"
    );

    Ok(Generation {
        prompt: injection.text,
        context,
        discovery,
        destination,
        tags,
        unmatched: injection.unmatched,
        notes,
    })
}

/// Combine tree and content per `mode`, substituting markers for empty parts.
pub fn build_context(mode: OutputMode, tree: Option<&str>, content: &str) -> String {
    let tree = tree.map(str::trim).unwrap_or("");
    let content = content.trim();
    match mode {
        OutputMode::Tree if tree.is_empty() => TREE_UNAVAILABLE.to_string(),
        OutputMode::Tree => tree.to_string(),
        OutputMode::Content if content.is_empty() => CONTENT_UNAVAILABLE.to_string(),
        OutputMode::Content => content.to_string(),
        OutputMode::Both => match (tree.is_empty(), content.is_empty()) {
            (false, false) => format!("{}{}{}", tree, content_separator(), content),
            (false, true) => tree.to_string(),
            (true, false) => content.to_string(),
            (true, true) => NOTHING_GENERATED.to_string(),
        },
    }
}

/// Full placeholder set: context, destination, and every tag slot.
pub fn placeholder_set(context: &str, destination: &str, tags: &[String]) -> PlaceholderSet {
    let mut set = PlaceholderSet::new()
        .with(CONTEXT_TOKEN, context)
        .with(DESTINATION_TOKEN, destination);
    for level in 1..=TAG_SLOTS {
        set.insert(tag_token(level), tags.get(level - 1).cloned());
    }
    set
}

/// Hierarchical tags for a vault-relative destination, most specific first.
///
/// `A/B/C.md` yields `["A/B", "A"]`; a destination without a parent
/// directory yields nothing. Spaces, hyphens, and dots in each folder name
/// become underscores.
pub fn hierarchical_tags(destination: Option<&Path>) -> Vec<String> {
    let Some(parent) = destination.and_then(Path::parent) else {
        return Vec::new();
    };

    let mut segments: Vec<String> = Vec::new();
    let mut tags = Vec::new();
    for component in parent.components() {
        let Component::Normal(part) = component else {
            continue;
        };
        let cleaned = sanitize_segment(&part.to_string_lossy());
        if cleaned.is_empty() {
            continue;
        }
        segments.push(cleaned);
        tags.push(segments.join("/"));
    }
    tags.reverse();
    tags
}

fn sanitize_segment(segment: &str) -> String {
    segment.replace([' ', '-', '.'], "_")
}

/// `/`-separated form of `path`; `.` segments are dropped.
fn posix_path(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push_str(&prefix.as_os_str().to_string_lossy()),
            Component::RootDir => out.push('/'),
            Component::CurDir => {}
            other => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

/// Express `destination` relative to the vault.
///
/// Relative paths are taken as-is. Absolute ones are stripped of the vault
/// root; `None` when they lie outside it.
fn relative_destination(
    destination: &Path,
    vault_root: &Path,
    canonical_root: &Path,
) -> Option<PathBuf> {
    if !destination.is_absolute() {
        return Some(destination.to_path_buf());
    }
    debug!(
        "destination {} is absolute; making it relative to the vault",
        destination.display()
    );
    destination
        .strip_prefix(vault_root)
        .or_else(|_| destination.strip_prefix(canonical_root))
        .map(Path::to_path_buf)
        .ok()
}

/// Write `prompt` to `path`, creating parent directories.
pub fn write_output(path: &Path, prompt: &str) -> Result<()> {
    let to_error = |source: std::io::Error| VaultError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(to_error)?;
        }
    }
    std::fs::write(path, prompt).map_err(to_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtensionFilter;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn tags(dest: &str) -> Vec<String> {
        hierarchical_tags(Some(Path::new(dest)))
    }

    #[test]
    fn test_tags_most_specific_first() {
        assert_eq!(tags("A/B/C.md"), vec!["A/B", "A"]);
        assert_eq!(tags("ProjectAlpha/Readme.md"), vec!["ProjectAlpha"]);
    }

    #[test]
    fn test_tags_without_parent() {
        assert!(tags("C.md").is_empty());
        assert!(tags("./Note.md").is_empty());
        assert!(tags("").is_empty());
        assert!(hierarchical_tags(None).is_empty());
    }

    #[test]
    fn test_tags_sanitized() {
        assert_eq!(
            tags("My Folder/My-Sub Folder/A Note.md"),
            vec!["My_Folder/My_Sub_Folder", "My_Folder"]
        );
        assert_eq!(
            tags("Folder.v1/Sub.Folder.v2/MyNote.md"),
            vec!["Folder_v1/Sub_Folder_v2", "Folder_v1"]
        );
    }

    #[test]
    fn test_build_context_markers() {
        assert_eq!(build_context(OutputMode::Tree, None, ""), TREE_UNAVAILABLE);
        assert_eq!(build_context(OutputMode::Content, Some("t"), ""), CONTENT_UNAVAILABLE);
        assert_eq!(build_context(OutputMode::Both, None, "  "), NOTHING_GENERATED);
        assert_eq!(build_context(OutputMode::Both, Some("t"), ""), "t");
        assert_eq!(build_context(OutputMode::Both, None, "c"), "c");
        assert_eq!(
            build_context(OutputMode::Both, Some("t\n"), "\nc"),
            format!("t{}c", content_separator())
        );
    }

    #[test]
    fn test_placeholder_set_fills_every_slot() {
        let set = placeholder_set("ctx", "", &["A/B".to_string(), "A".to_string()]);
        assert_eq!(set.len(), 2 + TAG_SLOTS);
        assert_eq!(set.get(&tag_token(1)), Some("A/B"));
        assert_eq!(set.get(&tag_token(2)), Some("A"));
        assert_eq!(set.get(&tag_token(3)), None);
        assert_eq!(set.get(DESTINATION_TOKEN), Some(""));
    }

    fn sample_vault() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("A/B")).unwrap();
        fs::write(root.join("A/x.md"), "hello\n").unwrap();
        fs::write(root.join("A/B/y.md"), "").unwrap();
        (tmp, root)
    }

    fn request(root: &Path, mode: OutputMode, dest: Option<&str>) -> GenerateRequest {
        GenerateRequest {
            vault_root: root.to_path_buf(),
            targets: Vec::new(),
            filter: PathFilter::new(ExtensionFilter::new([".md"], Vec::<String>::new())),
            mode,
            destination: dest.map(PathBuf::from),
        }
    }

    #[test]
    fn test_end_to_end_both() {
        let (_tmp, root) = sample_vault();
        let template = "{etiqueta_jerarquica_1}|{ruta_destino}|{contexto_extraido}";
        let out = generate(&request(&root, OutputMode::Both, Some("A/B/z.md")), template).unwrap();

        let sep = crate::formatter::separator();
        let expected = format!(
            "A/B|A/B/z.md|└── A\n    ├── B\n    │   └── y.md\n    └── x.md{}{sep}\n/A/B/y.md:\n{sep}\n (empty file)\n{sep}\n\n{sep}\n/A/x.md:\n{sep}\n  1 | hello\n{sep}",
            content_separator()
        );
        assert_eq!(out.prompt, expected);
        assert_eq!(out.tags, vec!["A/B", "A"]);
        assert_eq!(out.destination, "A/B/z.md");
        assert!(out.notes.is_empty());
    }

    #[test]
    fn test_tree_mode_without_files() {
        let (_tmp, root) = sample_vault();
        let mut req = request(&root, OutputMode::Tree, None);
        req.filter = PathFilter::new(ExtensionFilter::new([".canvas"], Vec::<String>::new()));
        let out = generate(&req, "[{contexto_extraido}]").unwrap();
        assert_eq!(out.prompt, format!("[{}]", TREE_UNAVAILABLE));
    }

    #[test]
    fn test_missing_destination_noted() {
        let (_tmp, root) = sample_vault();
        let out = generate(
            &request(&root, OutputMode::Tree, None),
            "{ruta_destino}/{etiqueta_jerarquica_2}",
        )
        .unwrap();
        assert_eq!(out.prompt, "/");
        assert!(out.notes.iter().any(|n| n.contains("no destination note given")));
    }

    #[test]
    fn test_absolute_destination() {
        let (_tmp, root) = sample_vault();
        let dest = root.join("A/new.md");
        let out = generate(
            &request(&root, OutputMode::Tree, Some(&dest.to_string_lossy())),
            "{ruta_destino}",
        )
        .unwrap();
        assert_eq!(out.prompt, "A/new.md");
    }

    #[cfg(unix)]
    #[test]
    fn test_destination_outside_vault_degrades() {
        let (_tmp, root) = sample_vault();
        let out = generate(
            &request(&root, OutputMode::Tree, Some("/elsewhere/n.md")),
            "{ruta_destino}|{etiqueta_jerarquica_1}|{contexto_extraido}",
        )
        .unwrap();
        assert!(out.prompt.starts_with("/elsewhere/n.md||└── A"));
        assert!(out.tags.is_empty());
        assert!(out.notes.iter().any(|n| n.contains("outside the vault")));
    }

    #[test]
    fn test_note_quoting_a_token_is_kept_verbatim() {
        let (_tmp, root) = sample_vault();
        fs::write(root.join("A/x.md"), "use {ruta_destino} here\n").unwrap();
        let out = generate(
            &request(&root, OutputMode::Content, Some("X/new.md")),
            "{ruta_destino}\n{contexto_extraido}",
        )
        .unwrap();
        assert!(out.prompt.starts_with("X/new.md\n"));
        assert!(out.prompt.contains("  1 | use {ruta_destino} here"));
        assert!(!out.prompt.contains("use X/new.md here"));
    }

    #[test]
    fn test_template_without_context_token_is_noted() {
        let (_tmp, root) = sample_vault();
        let out = generate(
            &request(&root, OutputMode::Both, Some("A/n.md")),
            "only {ruta_destino}",
        )
        .unwrap();
        assert_eq!(out.prompt, "only A/n.md");
        assert!(out.unmatched.contains(&CONTEXT_TOKEN.to_string()));
        assert!(out.notes.iter().any(|n| n.contains("not part of the prompt")));
    }

    #[test]
    fn test_invalid_vault_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let req = request(&tmp.path().join("missing"), OutputMode::Both, None);
        assert!(matches!(
            generate(&req, "{contexto_extraido}"),
            Err(VaultError::Configuration(_))
        ));
    }

    #[test]
    fn test_write_output_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/nested/prompt.txt");
        write_output(&path, "final").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "final");
    }

    #[test]
    fn test_write_output_failure_is_reported() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let err = write_output(&blocker.join("prompt.txt"), "final").unwrap_err();
        assert!(matches!(err, VaultError::OutputWrite { .. }));
    }
}
