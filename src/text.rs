//! Text clean-up helpers for upstream payloads and URL templates.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static SCRIPT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>")
        .expect("script regex is valid")
});

#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"));

#[allow(clippy::expect_used)]
static CONTROL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\r\n\x0C\x0B]+").expect("control regex is valid"));

#[allow(clippy::expect_used)]
static WHITESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\n\x0C\r ]{2,}").expect("whitespace regex is valid"));

// a space directly before punctuation, e.g. "line , next"
#[allow(clippy::expect_used)]
static LOOSE_SPACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\t\n\x0C\r ]([^0-9A-Za-z_]+)").expect("loose space regex is valid")
});

/// Strips markup and collapses whitespace into single spaces.
///
/// Script and style elements are removed with their content, other tags are
/// dropped and their text kept.
pub fn normalise(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let text = SCRIPT_PATTERN.replace_all(input, "");
    let text = TAG_PATTERN.replace_all(&text, "");
    let text = CONTROL_PATTERN.replace_all(&text, " ");
    let text = WHITESPACE_PATTERN.replace_all(&text, " ");
    let text = LOOSE_SPACE_PATTERN.replace_all(&text, "$1");
    text.trim().to_owned()
}

/// Query-escapes `value` for interpolation into a URL path.
pub fn escape_path_segment(value: &str) -> Cow<'_, str> {
    let escaped: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
    if escaped == value {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(escaped)
    }
}
