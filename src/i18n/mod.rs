//! Interface string catalogs.
//!
//! A catalog is a nested JSON object of string templates per UI language.
//! [`Localizer::resolve`] looks a dotted key up in the active language, then
//! in the default language, then gives up and returns the key itself.
//! `{{name}}` placeholders are filled from the supplied params; a placeholder
//! with no matching param stays in the output as written.
//!
//! ```
//! use voiceflow_client::i18n::Localizer;
//!
//! let i18n = Localizer::builtin();
//! assert_eq!(i18n.resolve("pt", "nav.dashboard", &[]), "Painel");
//! assert_eq!(i18n.resolve("de", "nav.dashboard", &[]), "Dashboard");
//! assert_eq!(i18n.resolve("en", "nav.nowhere", &[]), "nav.nowhere");
//! assert_eq!(
//!     i18n.resolve("en", "notify.complete", &[("ms", "842")]),
//!     "Transcribed in 842ms",
//! );
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde_json::Value;

/// Language used when the configuration does not name one.
pub const DEFAULT_LANGUAGE: &str = "en";

const BUILTIN_CATALOGS: [(&str, &str); 3] = [
    ("en", include_str!("locales/en.json")),
    ("pt", include_str!("locales/pt.json")),
    ("es", include_str!("locales/es.json")),
];

// ---------------------------------------------------------------------------
// Localizer
// ---------------------------------------------------------------------------

/// Per-language catalogs plus a designated fallback language.
#[derive(Debug, Clone)]
pub struct Localizer {
    catalogs: HashMap<String, Value>,
    default_language: String,
}

impl Localizer {
    /// No catalogs at all; every lookup returns its key.
    pub fn empty(default_language: &str) -> Self {
        Self {
            catalogs: HashMap::new(),
            default_language: default_language.to_string(),
        }
    }

    /// The catalogs shipped with the crate, falling back to English.
    pub fn builtin() -> Self {
        Self::builtin_with_default(DEFAULT_LANGUAGE)
    }

    /// The shipped catalogs with a different fallback language.
    pub fn builtin_with_default(default_language: &str) -> Self {
        let mut localizer = Self::empty(default_language);
        for (language, source) in BUILTIN_CATALOGS {
            if let Err(e) = localizer.add_catalog_json(language, source) {
                // Keep going: a broken catalog degrades to key fallback.
                log::error!("i18n: built-in '{language}' catalog is invalid: {e}");
            }
        }
        localizer
    }

    /// Add or replace a language's catalog.
    pub fn with_catalog(mut self, language: &str, catalog: Value) -> Self {
        self.catalogs.insert(language.to_string(), catalog);
        self
    }

    /// Parse and add a catalog; on a parse error the localizer is unchanged.
    pub fn add_catalog_json(&mut self, language: &str, source: &str) -> Result<(), serde_json::Error> {
        let catalog: Value = serde_json::from_str(source)?;
        self.catalogs.insert(language.to_string(), catalog);
        Ok(())
    }

    /// Add every `<language>.json` found in `dir`, replacing built-ins of the
    /// same language.  A missing directory loads nothing; a file that fails to
    /// parse is logged and skipped.  Returns the number of catalogs added.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Ok(0);
        }
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(language) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path)?;
            match self.add_catalog_json(language, &source) {
                Ok(()) => {
                    log::info!("i18n: loaded '{language}' from {}", path.display());
                    loaded += 1;
                }
                Err(e) => log::warn!("i18n: skipping {}: {e}", path.display()),
            }
        }
        Ok(loaded)
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Languages with a catalog, sorted.
    pub fn supported_languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.catalogs.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// Raw template for `key`, with default-language fallback.
    pub fn lookup(&self, language: &str, key: &str) -> Option<&str> {
        self.catalogs
            .get(language)
            .and_then(|c| nested(c, key))
            .or_else(|| {
                self.catalogs
                    .get(&self.default_language)
                    .and_then(|c| nested(c, key))
            })
    }

    /// Resolve `key` for `language` and fill in `params`.  Never fails.
    pub fn resolve(&self, language: &str, key: &str, params: &[(&str, &str)]) -> String {
        match self.lookup(language, key) {
            Some(template) => interpolate(template, params),
            None => {
                log::debug!("i18n: no '{key}' in '{language}' or default catalog");
                interpolate(key, params)
            }
        }
    }
}

impl Default for Localizer {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Walk a dotted path through nested objects; only string leaves count.
fn nested<'a>(catalog: &'a Value, key: &str) -> Option<&'a str> {
    key.split('.')
        .try_fold(catalog, |node, part| node.as_object()?.get(part))?
        .as_str()
}

// ---------------------------------------------------------------------------
// interpolate
// ---------------------------------------------------------------------------

/// Replace each `{{name}}` (`name` = ASCII letters, digits, `_`) with its
/// param.  Unknown names and malformed braces are copied through literally.
///
/// ```
/// use voiceflow_client::i18n::interpolate;
///
/// assert_eq!(interpolate("{{a}} and {{b}}", &[("a", "1")]), "1 and {{b}}");
/// ```
pub fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let replacement = after.find("}}").and_then(|end| {
            let name = &after[..end];
            let is_word = !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !is_word {
                return None;
            }
            params
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v, end + 2))
        });

        match replacement {
            Some((value, consumed)) => {
                out.push_str(value);
                rest = &after[consumed..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn load_dir_adds_json_catalogs_and_skips_broken_ones() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::write(dir.path().join("de.json"), r#"{"nav":{"settings":"Einstellungen"}}"#)
            .expect("write");
        std::fs::write(dir.path().join("fr.json"), "{ not json").expect("write");
        std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

        let mut i18n = Localizer::builtin();
        assert_eq!(i18n.load_dir(dir.path()).expect("load"), 1);
        assert_eq!(i18n.resolve("de", "nav.settings", &[]), "Einstellungen");
        assert_eq!(i18n.resolve("de", "nav.dashboard", &[]), "Dashboard");
        assert!(!i18n.supported_languages().contains(&"fr"));
    }

    #[test]
    fn load_dir_on_missing_directory_is_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut i18n = Localizer::empty("en");
        assert_eq!(i18n.load_dir(&dir.path().join("absent")).expect("load"), 0);
    }

    fn fixture() -> Localizer {
        Localizer::empty("en")
            .with_catalog(
                "en",
                json!({ "nav": { "dashboard": "Dashboard", "settings": "Settings" } }),
            )
            .with_catalog("pt", json!({ "nav": { "dashboard": "Painel" } }))
    }

    #[test]
    fn active_language_wins() {
        assert_eq!(fixture().resolve("pt", "nav.dashboard", &[]), "Painel");
    }

    #[test]
    fn falls_back_to_default_catalog() {
        assert_eq!(fixture().resolve("pt", "nav.settings", &[]), "Settings");
    }

    #[test]
    fn unknown_language_uses_default_catalog() {
        assert_eq!(fixture().resolve("fr", "nav.dashboard", &[]), "Dashboard");
    }

    #[test]
    fn missing_everywhere_returns_key() {
        assert_eq!(fixture().resolve("pt", "nav.history", &[]), "nav.history");
    }

    #[test]
    fn missing_in_both_with_pt_absent_returns_key() {
        let i18n = Localizer::empty("en").with_catalog("en", json!({}));
        assert_eq!(i18n.resolve("pt", "nav.dashboard", &[]), "nav.dashboard");
    }

    #[test]
    fn non_string_leaf_is_a_miss() {
        let i18n = Localizer::empty("en").with_catalog("en", json!({ "nav": { "count": 3 } }));
        assert_eq!(i18n.resolve("en", "nav", &[]), "nav");
        assert_eq!(i18n.resolve("en", "nav.count", &[]), "nav.count");
    }

    #[test]
    fn path_through_a_string_is_a_miss() {
        let i18n = fixture();
        assert_eq!(
            i18n.resolve("en", "nav.dashboard.title", &[]),
            "nav.dashboard.title"
        );
    }

    #[test]
    fn empty_key_returns_empty_string() {
        assert_eq!(fixture().resolve("en", "", &[]), "");
    }

    #[test]
    fn interpolates_every_occurrence() {
        assert_eq!(
            interpolate("{{n}} + {{n}} = {{sum}}", &[("n", "2"), ("sum", "4")]),
            "2 + 2 = 4"
        );
    }

    #[test]
    fn missing_param_is_left_literal() {
        assert_eq!(
            interpolate("Error: {{message}}", &[("other", "x")]),
            "Error: {{message}}"
        );
    }

    #[test]
    fn malformed_placeholders_pass_through() {
        let params = [("a", "1")];
        assert_eq!(interpolate("{{a", &params), "{{a");
        assert_eq!(interpolate("{{ a }}", &params), "{{ a }}");
        assert_eq!(interpolate("{{}}", &params), "{{}}");
        assert_eq!(interpolate("{{{{a}}", &params), "{{1");
    }

    #[test]
    fn values_are_not_reinterpolated() {
        assert_eq!(
            interpolate("{{a}}", &[("a", "{{b}}"), ("b", "x")]),
            "{{b}}"
        );
    }

    #[test]
    fn builtin_catalogs_all_parse() {
        let i18n = Localizer::builtin();
        assert_eq!(i18n.supported_languages(), vec!["en", "es", "pt"]);
    }

    #[test]
    fn builtin_notification_templates() {
        let i18n = Localizer::builtin();
        assert_eq!(
            i18n.resolve("pt", "notify.error", &[("message", "network timeout")]),
            "Erro: network timeout"
        );
        // es has no dashboard.search; falls back to en
        assert_eq!(
            i18n.resolve("es", "dashboard.search", &[]),
            "Search transcriptions..."
        );
    }

    #[test]
    fn invalid_catalog_json_is_rejected_without_side_effects() {
        let mut i18n = fixture();
        assert!(i18n.add_catalog_json("pt", "{ not json").is_err());
        assert_eq!(i18n.resolve("pt", "nav.dashboard", &[]), "Painel");
    }

    #[test]
    fn every_state_label_resolves_in_english() {
        use crate::pipeline::PipelineState;
        let i18n = Localizer::builtin();
        for state in PipelineState::ALL {
            assert!(i18n.lookup("en", state.label_key()).is_some());
        }
    }
}
