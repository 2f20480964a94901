//! Template store: built-in prompts, a templates directory, and direct paths.
//!
//! Lookup order for [`TemplateStore::load`]:
//!
//! 1. a built-in template name (`simple-note`, `summarize`, ...);
//! 2. `file:<name>` for a `*.txt` file inside the templates directory;
//! 3. a path to any readable file.
//!
//! Anything else is a [`VaultError::TemplateLookup`], raised before any
//! generation work starts.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, VaultError};

/// Prefix naming a template that lives in the templates directory.
pub const FILE_PREFIX: &str = "file:";

const SIMPLE_NOTE: &str = "\
# Role: expert in {etiqueta_jerarquica_1}

## Task
Write the opening content for a new note whose path suggests its subject: `{ruta_destino}`.

## Relevant context
{contexto_extraido}

## Request
Give a clear, concise definition of the main concept named by `{ruta_destino}` and briefly explain why it matters within `{etiqueta_jerarquica_1}`. Link key concepts from the context with `[[...]]` where relevant. Start directly with Markdown content, no YAML.
";

const SUMMARIZE: &str = "\
# Role: synthesis assistant

## Task
Summarize the key points of the following notes.

## Content
{contexto_extraido}

## Request
Produce a short summary (3-5 bullet points) of the main information above and name the central themes.
";

const STUDY_QUESTIONS: &str = "\
# Role: academic tutor

## Task
Write study questions based on the following material.

## Material
{contexto_extraido}

## Request
Write 3-5 meaningful questions that test understanding of the material, encourage critical thinking, and cover its most important concepts.
";

const FULL_NOTE: &str = "\
# Role: academic expert and knowledge-base curator

Generate the complete Markdown content for a *new* note. Its subject follows from the destination path, and it must be rigorous, well structured for learning, and densely linked to the existing notes shown below.

## Destination path
`{ruta_destino}`

## Existing structure and content
```
{contexto_extraido}
```

## Requirements
1. Focus only on the subject implied by the destination path.
2. Organize with Markdown headings: definition, key concepts, examples, implications.
3. Link existing notes by exact name with `[[...]]`, and link important concepts that deserve their own note even if it does not exist yet.
4. Begin with this YAML front matter exactly:

```yaml
---
tags:
  - {etiqueta_jerarquica_1}
  - {etiqueta_jerarquica_2}
  - {etiqueta_jerarquica_3}
---
```

Drop tag lines that render empty and add a few specific conceptual tags.
";

const BUILTINS: &[(&str, &str)] = &[
    ("simple-note", SIMPLE_NOTE),
    ("summarize", SUMMARIZE),
    ("study-questions", STUDY_QUESTIONS),
    ("full-note", FULL_NOTE),
];

/// Where templates come from.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates_dir: Option<PathBuf>,
}

impl TemplateStore {
    pub fn new(templates_dir: Option<PathBuf>) -> Self {
        Self { templates_dir }
    }

    pub fn builtin(name: &str) -> Option<&'static str> {
        BUILTINS
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, text)| *text)
    }

    /// Template names: built-ins in declaration order, then `file:` entries
    /// sorted by name.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTINS.iter().map(|(n, _)| n.to_string()).collect();
        names.extend(self.file_templates());
        names
    }

    fn file_templates(&self) -> Vec<String> {
        let Some(dir) = &self.templates_dir else {
            return Vec::new();
        };
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("templates directory {} not readable: {}", dir.display(), e);
                return Vec::new();
            }
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_txt(path))
            .filter_map(|path| {
                path.file_name()
                    .map(|n| format!("{}{}", FILE_PREFIX, n.to_string_lossy()))
            })
            .collect();
        names.sort();
        names
    }

    /// Resolve `name_or_path` to template text.
    pub fn load(&self, name_or_path: &str) -> Result<String> {
        if let Some(text) = Self::builtin(name_or_path) {
            debug!(template = name_or_path, "using built-in template");
            return Ok(text.to_string());
        }

        if let Some(file_name) = name_or_path.strip_prefix(FILE_PREFIX) {
            let Some(dir) = &self.templates_dir else {
                return Err(VaultError::TemplateLookup(format!(
                    "'{}' refers to the templates directory, but none is configured",
                    name_or_path
                )));
            };
            return read_template(&dir.join(file_name));
        }

        let path = Path::new(name_or_path);
        if path.is_file() {
            return read_template(path);
        }

        Err(VaultError::TemplateLookup(format!(
            "'{}' is neither a built-in template, a templates-directory entry, nor a readable file. Available: {}",
            name_or_path,
            self.available().join(", ")
        )))
    }
}

fn is_txt(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}

fn read_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        warn!("cannot read template {}: {}", path.display(), e);
        VaultError::TemplateLookup(format!("cannot read {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::CONTEXT_TOKEN;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_builtins_carry_context_token() {
        for (name, text) in BUILTINS {
            assert!(text.contains(CONTEXT_TOKEN), "{} lacks the context token", name);
        }
    }

    #[test]
    fn test_load_builtin() {
        let store = TemplateStore::default();
        assert_eq!(store.load("summarize").unwrap(), SUMMARIZE);
    }

    #[test]
    fn test_directory_templates_listed_and_loaded() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.txt"), "B {contexto_extraido}").unwrap();
        fs::write(tmp.path().join("a.TXT"), "A").unwrap();
        fs::write(tmp.path().join("ignored.md"), "nope").unwrap();

        let store = TemplateStore::new(Some(tmp.path().to_path_buf()));
        let names = store.available();
        assert_eq!(&names[..4], &["simple-note", "summarize", "study-questions", "full-note"]);
        assert_eq!(&names[4..], &["file:a.TXT", "file:b.txt"]);
        assert_eq!(store.load("file:b.txt").unwrap(), "B {contexto_extraido}");
    }

    #[test]
    fn test_direct_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("mine.prompt");
        fs::write(&path, "direct").unwrap();
        let store = TemplateStore::default();
        assert_eq!(store.load(&path.to_string_lossy()).unwrap(), "direct");
    }

    #[test]
    fn test_unknown_template_is_lookup_error() {
        let store = TemplateStore::default();
        let err = store.load("does-not-exist").unwrap_err();
        match err {
            VaultError::TemplateLookup(msg) => assert!(msg.contains("simple-note")),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(
            store.load("file:x.txt"),
            Err(VaultError::TemplateLookup(_))
        ));
    }
}
