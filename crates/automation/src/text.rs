//! Filtering policy for extracted page text.
//!
//! Raw `innerText` from real pages drags inline style sheets along. The
//! filter drops structural noise line by line and decodes escaped Unicode
//! sequences in what survives. Deterministic: the same input always yields
//! the same output.

use {once_cell::sync::Lazy, regex::Regex};

/// Compile a constant pattern; only reachable with a malformed literal.
fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => panic!("invalid filter pattern {pattern:?}: {e}"),
    }
}

static CLASS_RULE: Lazy<Regex> = Lazy::new(|| compile(r"^\.[a-zA-Z0-9_-]+\s*\{"));
static STYLE_RULE: Lazy<Regex> = Lazy::new(|| compile(r"^[a-zA-Z-]+:[a-zA-Z0-9%\s().,-]+;$"));
static UNICODE_ESCAPE: Lazy<Regex> = Lazy::new(|| compile(r"\\u([0-9a-fA-F]{4})"));

/// True when a trimmed line looks like styling noise rather than content.
fn is_structural_noise(line: &str) -> bool {
    (line.contains('{') && line.contains('}'))
        || line.contains("@keyframes")
        || CLASS_RULE.is_match(line)
        || STYLE_RULE.is_match(line)
}

/// Replace `\uXXXX` escape sequences with the characters they name.
/// Sequences outside the BMP or naming invalid code points are left as-is.
fn decode_unicode_escapes(line: &str) -> String {
    UNICODE_ESCAPE
        .replace_all(line, |caps: &regex::Captures<'_>| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Apply the extraction filter: trim lines, drop empty and noise lines,
/// decode Unicode escapes in the survivors.
pub fn filter_extracted_text(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_structural_noise(line))
        .map(decode_unicode_escapes)
        .collect()
}
