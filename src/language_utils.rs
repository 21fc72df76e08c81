/*!
 * Language utilities for ISO language code handling.
 *
 * Target languages are addressed by short codes on the command line and in
 * the configuration. This module checks them against ISO 639 and expands
 * the `all` selector.
 */

use anyhow::{Result, anyhow};
use isolang::Language;

use crate::app_config::DEFAULT_TARGET_LANGUAGES;

/// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

fn lookup(code: &str) -> Option<Language> {
    let normalized = code.trim().to_lowercase();
    match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => {
            let terminological = BIBLIOGRAPHIC_CODES
                .iter()
                .find(|(b, _)| *b == normalized)
                .map(|(_, t)| *t)
                .unwrap_or(normalized.as_str());
            Language::from_639_3(terminological)
        }
        _ => None,
    }
}

/// Validate that a code is a known ISO 639-1 or ISO 639-2 language code
pub fn validate_language_code(code: &str) -> Result<()> {
    lookup(code)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    lookup(code)
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", code))
}

/// Check if two language codes represent the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (lookup(code1), lookup(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Expand a `--language` argument into the list of target languages.
///
/// `all` selects the default set; otherwise a comma-separated list of codes
/// is accepted. The source language is never a target.
pub fn resolve_target_languages(selector: &str, source_language: &str) -> Result<Vec<String>> {
    let requested: Vec<String> = if selector.trim().eq_ignore_ascii_case("all") {
        DEFAULT_TARGET_LANGUAGES.iter().map(|s| s.to_string()).collect()
    } else {
        selector
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    };

    if requested.is_empty() {
        return Err(anyhow!("No target language given"));
    }

    let mut languages = Vec::with_capacity(requested.len());
    for code in requested {
        validate_language_code(&code)?;
        if language_codes_match(&code, source_language) {
            return Err(anyhow!(
                "Target language '{}' is the same as the source language",
                code
            ));
        }
        if !languages.contains(&code) {
            languages.push(code);
        }
    }

    Ok(languages)
}
