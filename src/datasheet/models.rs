//! Model-identifier detection in repaired datasheet text.

use regex::Regex;
use std::sync::OnceLock;

fn hyphenated_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Z]{1,3}\d?-\d{3,4}-\d\b").unwrap_or_else(|_| unreachable!("static regex"))
    })
}

fn spaced_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Z]{1,3}\d?) (\d{3,4}) (\d)\b")
            .unwrap_or_else(|_| unreachable!("static regex"))
    })
}

fn header_adjacent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)MODEL NUMBER\s+([A-Z]{1,3}\d?[- ]\d{3,4}[- ]\d)\b")
            .unwrap_or_else(|_| unreachable!("static regex"))
    })
}

/// Detect model identifiers with three patterns (standard hyphenated,
/// space-separated digit groups, table-header-adjacent), canonicalized
/// to hyphenated form and deduplicated in first-seen order.
pub fn detect_models(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    let mut push = |model: String| {
        if !out.contains(&model) {
            out.push(model);
        }
    };

    for m in hyphenated_re().find_iter(text) {
        push(m.as_str().to_string());
    }
    for caps in spaced_re().captures_iter(text) {
        push(format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]));
    }
    for caps in header_adjacent_re().captures_iter(text) {
        push(caps[1].replace(' ', "-"));
    }

    out
}
