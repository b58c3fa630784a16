//! Text normalizer: turns scraped review text into the canonical form the
//! lexicon scorer and the classifier consume.
//!
//! Order:
//! 1) HTML entity decode + tag strip (scraped snippets still carry markup)
//! 2) smart quotes → ASCII
//! 3) case folding
//! 4) whitespace collapse, so multi-word keys match across line breaks
//! 5) slang/emoji substitution table, literal replacement in table order
//! 6) whitespace collapse + trim
//! 7) length cap
//!
//! Only `<` followed by a letter, `/` or `!--` opens a tag; a bare `<` or `>` in
//! prose ("under < 500") is kept.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Upper bound on cleaned text, in chars.
pub const MAX_CLEAN_CHARS: usize = 5_000;

/// Informal/regional tokens and emoji mapped to canonical sentiment words.
/// Replacements that start with a space keep emoji runs apart (`👍👍` → ` good good`).
/// Longer keys come before their prefixes.
pub const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("👍", " good"),
    ("👌", " good"),
    ("❤️", " love"),
    ("❤", " love"),
    ("😍", " love"),
    ("😊", " happy"),
    ("🙂", " happy"),
    ("😀", " happy"),
    ("👎", " bad"),
    ("😡", " angry"),
    ("😠", " angry"),
    ("😞", " sad"),
    ("😢", " sad"),
    ("paisa vasool", "worth"),
    ("bahut", "very"),
    ("bohot", "very"),
    ("ekdum", "very"),
    ("accha", "good"),
    ("achha", "good"),
    ("badhiya", "good"),
    ("zabardast", "excellent"),
    ("bekaar", "bad"),
    ("bekar", "bad"),
    ("bakwas", "bad"),
];

/// Normalize review text. Never fails; empty input gives an empty string.
pub fn normalize(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let mut out = html_escape::decode_html_entities(text).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS
        .get_or_init(|| Regex::new(r"(?s)<!--.*?-->|</?[a-zA-Z][^>]*>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    out = out.to_lowercase();

    // \s also covers NBSP and other Unicode spaces.
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").to_string();

    for (from, to) in SUBSTITUTIONS {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }

    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_CLEAN_CHARS {
        out = out.chars().take(MAX_CLEAN_CHARS).collect();
    }
    out
}

/// Number of non-whitespace chars; the minimum-length filter keys on it.
pub fn meaningful_len(cleaned: &str) -> usize {
    cleaned.chars().filter(|c| !c.is_whitespace()).count()
}
