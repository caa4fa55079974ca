use crate::core::title::simplify;
use std::collections::HashMap;

/// Maps a language attribute name to an ISO 3166 country code.
pub trait LanguageLookup: Send + Sync {
    fn country_code(&self, language_name: &str) -> Option<String>;
}

const BUILTIN_LANGUAGES: &[(&str, &str)] = &[
    ("english", "US"),
    ("japanese", "JP"),
    ("日本語", "JP"),
    ("chinese", "CN"),
    ("中文", "CN"),
    ("korean", "KR"),
    ("한국어", "KR"),
    ("french", "FR"),
    ("français", "FR"),
    ("german", "DE"),
    ("deutsch", "DE"),
    ("spanish", "ES"),
    ("español", "ES"),
    ("italian", "IT"),
    ("italiano", "IT"),
    ("portuguese", "PT"),
    ("português", "PT"),
    ("russian", "RU"),
    ("русский", "RU"),
    ("polish", "PL"),
    ("dutch", "NL"),
    ("thai", "TH"),
    ("vietnamese", "VN"),
    ("indonesian", "ID"),
    ("arabic", "SA"),
    ("turkish", "TR"),
    ("czech", "CZ"),
    ("hungarian", "HU"),
    ("swedish", "SE"),
    ("finnish", "FI"),
    ("norwegian", "NO"),
    ("danish", "DK"),
    ("greek", "GR"),
    ("hebrew", "IL"),
    ("ukrainian", "UA"),
    ("tagalog", "PH"),
];

/// Static table of the languages commonly found in library metadata.
///
/// Names are matched after [`simplify`], so case and accents don't matter.
#[derive(Debug, Clone)]
pub struct BuiltinLanguages {
    codes: HashMap<String, String>,
}

impl BuiltinLanguages {
    pub fn new() -> Self {
        let codes = BUILTIN_LANGUAGES
            .iter()
            .map(|(name, code)| (simplify(name), code.to_string()))
            .collect();
        Self { codes }
    }

    pub fn with_language(mut self, name: &str, code: &str) -> Self {
        self.codes.insert(simplify(name), code.to_uppercase());
        self
    }
}

impl Default for BuiltinLanguages {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageLookup for BuiltinLanguages {
    fn country_code(&self, language_name: &str) -> Option<String> {
        self.codes.get(&simplify(language_name)).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_languages() {
        let lookup = BuiltinLanguages::new();
        assert_eq!(lookup.country_code("english").as_deref(), Some("US"));
        assert_eq!(lookup.country_code("Japanese").as_deref(), Some("JP"));
        assert_eq!(lookup.country_code("Français").as_deref(), Some("FR"));
        assert_eq!(lookup.country_code(" 日本語 ").as_deref(), Some("JP"));
    }

    #[test]
    fn test_unknown_language() {
        let lookup = BuiltinLanguages::new();
        assert_eq!(lookup.country_code("klingon"), None);
        assert_eq!(lookup.country_code(""), None);
    }

    #[test]
    fn test_extra_language() {
        let lookup = BuiltinLanguages::new().with_language("Esperanto", "eo");
        assert_eq!(lookup.country_code("esperanto").as_deref(), Some("EO"));
    }
}
