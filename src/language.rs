//! Supported display languages and backend language-code mapping.
//!
//! The UI speaks BCP-47 tags (`en-US`, `fr-FR`, ...) while the backend's
//! translation prompts work with short codes (`en`, `fr`, ...). Backend
//! exchange itself always happens in English regardless of display language.

/// A language the chat UI can display and speak in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedLanguage {
    /// BCP-47 tag, e.g. `fr-CA`.
    pub code: &'static str,
    /// Human-readable name, e.g. `Français (Canada)`.
    pub name: &'static str,
    /// Short code used in translation prompts, e.g. `fr`.
    pub backend_code: &'static str,
}

/// Languages selectable in settings. The first entry is the default.
pub const SUPPORTED_LANGUAGES: &[SupportedLanguage] = &[
    SupportedLanguage {
        code: "en-US",
        name: "English (US)",
        backend_code: "en",
    },
    SupportedLanguage {
        code: "fr-FR",
        name: "Français (France)",
        backend_code: "fr",
    },
    // Same backend code as fr-FR; the Canadian-French nuance lives in prompts.
    SupportedLanguage {
        code: "fr-CA",
        name: "Français (Canada)",
        backend_code: "fr",
    },
    SupportedLanguage {
        code: "nl-NL",
        name: "Nederlands (Netherlands)",
        backend_code: "nl",
    },
    SupportedLanguage {
        code: "es-ES",
        name: "Español (España)",
        backend_code: "es",
    },
];

/// Default display language (English).
pub const DEFAULT_LANGUAGE_CODE: &str = "en-US";

/// Whether a BCP-47 code is one of the selectable languages.
#[must_use]
pub fn is_supported(bcp47: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|l| l.code == bcp47)
}

/// Map a BCP-47 code to the backend's short language code.
///
/// Unknown codes fall back to English.
#[must_use]
pub fn backend_lang_code(bcp47: &str) -> &'static str {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|l| l.code == bcp47)
        .map_or("en", |l| l.backend_code)
}

/// Human-readable language name for translation prompts.
///
/// The region qualifier in parentheses is stripped (`Français (France)` →
/// `Français`). Unknown codes fall back to `English`.
#[must_use]
pub fn language_name(bcp47: &str) -> &'static str {
    let Some(lang) = SUPPORTED_LANGUAGES.iter().find(|l| l.code == bcp47) else {
        return "English";
    };
    match lang.name.split_once('(') {
        Some((head, _)) => head.trim_end(),
        None => lang.name,
    }
}

/// Language name for a backend short code, used when the caller only has the
/// short code (translation targets).
#[must_use]
pub fn language_name_for_backend_code(backend_code: &str) -> &'static str {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|l| l.backend_code == backend_code)
        .map_or("English", |l| language_name(l.code))
}
