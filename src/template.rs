//! Placeholder substitution.
//!
//! Templates carry literal tokens that are replaced verbatim. The token
//! spellings are a contract with template authors and never change:
//!
//! | Token | Value |
//! |-------|-------|
//! | `{contexto_extraido}` | the context block (tree and/or contents) |
//! | `{ruta_destino}` | destination note path, POSIX style, or empty |
//! | `{etiqueta_jerarquica_1}` … `{etiqueta_jerarquica_5}` | hierarchical tags, most specific first |

use tracing::{debug, warn};

pub const CONTEXT_TOKEN: &str = "{contexto_extraido}";
pub const DESTINATION_TOKEN: &str = "{ruta_destino}";

/// Number of `{etiqueta_jerarquica_N}` slots filled on every generation.
pub const TAG_SLOTS: usize = 5;

/// The token for hierarchical tag slot `level` (1-based).
pub fn tag_token(level: usize) -> String {
    format!("{{etiqueta_jerarquica_{}}}", level)
}

/// All tag tokens, slot 1 first.
pub fn tag_tokens() -> Vec<String> {
    (1..=TAG_SLOTS).map(tag_token).collect()
}

/// Ordered token → value mapping. `None` renders as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderSet {
    entries: Vec<(String, Option<String>)>,
}

impl PlaceholderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `token` to `value`, replacing any earlier value for it.
    pub fn insert(&mut self, token: impl Into<String>, value: Option<String>) {
        let token = token.into();
        match self.entries.iter_mut().find(|(t, _)| *t == token) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((token, value)),
        }
    }

    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(token, Some(value.into()));
        self
    }

    #[cfg(test)]
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of [`inject`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    pub text: String,
    /// Tokens from the set that never occurred in the template.
    pub unmatched: Vec<String>,
}

/// Replace every token of `placeholders` in `template`.
///
/// The template is scanned once, left to right. Inserted values are never
/// scanned again, so a value that itself contains a token (a note quoting
/// `{ruta_destino}`, say) is copied verbatim and the result does not depend
/// on the order of the set. When two tokens start at the same offset the
/// longer one wins.
///
/// Tokens missing from the template are left alone and reported in
/// [`Injection::unmatched`]; that is never an error.
pub fn inject(template: &str, placeholders: &PlaceholderSet) -> Injection {
    let unmatched: Vec<String> = placeholders
        .iter()
        .filter(|(token, _)| !token.is_empty() && !template.contains(token))
        .map(|(token, _)| {
            debug!(token, "placeholder not present in template");
            token.to_string()
        })
        .collect();

    let mut text = String::with_capacity(template.len());
    let mut rest = template;
    while let Some((start, token, value)) = next_token(rest, placeholders) {
        text.push_str(&rest[..start]);
        text.push_str(value.unwrap_or(""));
        rest = &rest[start + token.len()..];
    }
    text.push_str(rest);

    if !placeholders.is_empty() && unmatched.len() == placeholders.len() {
        warn!("template contains none of the known placeholders");
    }

    Injection { text, unmatched }
}

/// Leftmost token occurrence in `haystack`, longest token on ties.
fn next_token<'a>(
    haystack: &str,
    placeholders: &'a PlaceholderSet,
) -> Option<(usize, &'a str, Option<&'a str>)> {
    placeholders
        .iter()
        .filter(|(token, _)| !token.is_empty())
        .filter_map(|(token, value)| haystack.find(token).map(|start| (start, token, value)))
        .min_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_tokens() {
        assert_eq!(tag_token(1), "{etiqueta_jerarquica_1}");
        assert_eq!(tag_tokens().len(), TAG_SLOTS);
        assert_eq!(tag_tokens()[4], "{etiqueta_jerarquica_5}");
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let set = PlaceholderSet::new()
            .with(CONTEXT_TOKEN, "CTX")
            .with(DESTINATION_TOKEN, "a/b.md");
        let out = inject("{ruta_destino} {contexto_extraido} {ruta_destino}", &set);
        assert_eq!(out.text, "a/b.md CTX a/b.md");
        assert!(out.unmatched.is_empty());
    }

    #[test]
    fn test_absent_placeholder_is_noop() {
        let set = PlaceholderSet::new()
            .with(CONTEXT_TOKEN, "CTX")
            .with(tag_token(3), "deep");
        let out = inject("before {contexto_extraido} after", &set);
        assert_eq!(out.text, "before CTX after");
        assert_eq!(out.unmatched, vec![tag_token(3)]);
    }

    #[test]
    fn test_none_renders_empty() {
        let mut set = PlaceholderSet::new();
        set.insert(DESTINATION_TOKEN, None);
        let out = inject("[{ruta_destino}]", &set);
        assert_eq!(out.text, "[]");
    }

    #[test]
    fn test_no_known_placeholders() {
        let set = PlaceholderSet::new().with(CONTEXT_TOKEN, "CTX");
        let out = inject("plain text", &set);
        assert_eq!(out.text, "plain text");
        assert_eq!(out.unmatched, vec![CONTEXT_TOKEN.to_string()]);
    }

    #[test]
    fn test_order_does_not_matter() {
        let template = "{etiqueta_jerarquica_1}|{ruta_destino}|{contexto_extraido}";
        let forward = PlaceholderSet::new()
            .with(CONTEXT_TOKEN, "C")
            .with(DESTINATION_TOKEN, "D")
            .with(tag_token(1), "T");
        let backward = PlaceholderSet::new()
            .with(tag_token(1), "T")
            .with(DESTINATION_TOKEN, "D")
            .with(CONTEXT_TOKEN, "C");
        assert_eq!(inject(template, &forward).text, "T|D|C");
        assert_eq!(inject(template, &backward).text, "T|D|C");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let template = "{ruta_destino}|{contexto_extraido}";
        let forward = PlaceholderSet::new()
            .with(DESTINATION_TOKEN, "D")
            .with(CONTEXT_TOKEN, "note says {ruta_destino}");
        let backward = PlaceholderSet::new()
            .with(CONTEXT_TOKEN, "note says {ruta_destino}")
            .with(DESTINATION_TOKEN, "D");
        assert_eq!(inject(template, &forward).text, "D|note says {ruta_destino}");
        assert_eq!(inject(template, &backward).text, "D|note says {ruta_destino}");
    }

    #[test]
    fn test_value_containing_own_token() {
        let set = PlaceholderSet::new().with(CONTEXT_TOKEN, "{contexto_extraido}!");
        let out = inject("<{contexto_extraido}>", &set);
        assert_eq!(out.text, "<{contexto_extraido}!>");
    }

    #[test]
    fn test_insert_overwrites() {
        let mut set = PlaceholderSet::new().with(CONTEXT_TOKEN, "old");
        set.insert(CONTEXT_TOKEN, Some("new".to_string()));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(CONTEXT_TOKEN), Some("new"));
    }
}
