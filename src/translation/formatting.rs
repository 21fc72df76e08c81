/*!
 * Best-effort cleanup of service responses.
 *
 * Models sometimes wrap a translation in a code fence or echo a
 * "Translation:" label in front of it. These helpers strip the common
 * cases; anything they miss is shipped as returned.
 */

use once_cell::sync::Lazy;
use regex::Regex;

/// Labels a model may echo in front of its answer, compared lowercased
const ECHO_PREFIXES: [&str; 4] = [
    "translation:",
    "перевод:",
    "translated text:",
    "переведенный текст:",
];

/// Opening fence line at the very start of a response
static LEADING_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\A```[^\n]*\n").unwrap());

/// Closing fence line at the very end of a response
static TRAILING_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n```[ \t]*\n?\z").unwrap());

fn fence_lines(text: &str) -> usize {
    text.lines().filter(|line| line.trim_start().starts_with("```")).count()
}

/// True when the service wrapped its whole answer in one extra fence.
///
/// The answer must open and close with a fence line and carry exactly two
/// more fence lines than the text it was asked to translate.
fn is_fence_wrapped(source: &str, text: &str) -> bool {
    LEADING_FENCE_REGEX.is_match(text)
        && TRAILING_FENCE_REGEX.is_match(text)
        && fence_lines(text) == fence_lines(source) + 2
}

/// Clean a translated segment.
///
/// `source` is the text that was sent for translation; fences it already
/// contained are never removed.
pub fn clean_response(source: &str, text: &str) -> String {
    let lowered = text.to_lowercase();
    let unlabeled = if ECHO_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        text.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or(text)
    } else {
        text
    };

    if !is_fence_wrapped(source, unlabeled) {
        return unlabeled.to_string();
    }
    let without_open = LEADING_FENCE_REGEX.replace(unlabeled, "");
    TRAILING_FENCE_REGEX.replace(&without_open, "").into_owned()
}

/// Turn an already cleaned metadata value into a single YAML scalar
pub fn clean_field_value(text: &str) -> String {
    text.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .replace('\n', " ")
        .trim()
        .to_string()
}
