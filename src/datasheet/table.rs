//! Row assembly: walk repaired datasheet lines, lift the spec table into raw
//! rows, and capture overview prose, sidebar callouts and key features.

use regex::Regex;
use std::sync::OnceLock;

use crate::core::types::RawSpecRow;

use super::repair;

/// Section headings that close the spec table (or a features block).
const SENTINELS: &[&str] = &[
    "KEY FEATURES",
    "STANDARDS",
    "CERTIFICATIONS",
    "AGENCY APPROVALS",
    "INSTALLATION",
    "WARRANTY INFORMATION",
    "ORDERING INFORMATION",
    "NOTES",
];

const OVERVIEW_TERMS: &[&str] = &[
    "surge", "spd", "isolat", "downline", "equipment", "panel",
];

const CALLOUT_TERMS: &[&str] = &["SPD", "SCCR", "kAIC", "Type 1", "Type 2"];

fn model_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Z]{1,3}\d?-\d{3,4}-\d\b").unwrap_or_else(|_| unreachable!("static regex"))
    })
}

#[derive(Debug, Default)]
pub struct AssembledTable {
    pub raw_rows: Vec<RawSpecRow>,
    pub overview_text: String,
    pub sidebar_bullets: Vec<String>,
    pub features: Vec<String>,
}

#[derive(PartialEq)]
enum Mode {
    Prose,
    Table,
    Features,
}

/// Assemble the table from repaired, normalized text.
pub fn assemble(text: &str) -> AssembledTable {
    let mut out = AssembledTable::default();
    let mut overview_lines: Vec<String> = Vec::new();
    let mut mode = Mode::Prose;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if is_table_header(line) {
            // A repeated header on the next page continues the same table.
            mode = Mode::Table;
            continue;
        }

        if let Some(sentinel) = matching_sentinel(line) {
            mode = if sentinel == "KEY FEATURES" {
                Mode::Features
            } else {
                Mode::Prose
            };
            continue;
        }

        match mode {
            Mode::Table => {
                if let Some(row) = split_row(line) {
                    out.raw_rows.push(row);
                }
            }
            Mode::Features => collect_feature_line(line, &mut out.features),
            Mode::Prose => {
                if is_sidebar_callout(line) {
                    out.sidebar_bullets.push(line.to_string());
                } else if is_overview_line(line) {
                    overview_lines.push(line.to_string());
                }
            }
        }
    }

    out.features = dedup_preserving_order(out.features);
    out.overview_text = overview_lines.join(" ");
    out
}

/// The table opens at a `Model Number` line carrying multiple model tokens.
fn is_table_header(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.starts_with("model number") && model_token_re().find_iter(line).count() >= 2
}

fn matching_sentinel(line: &str) -> Option<&'static str> {
    let upper = line.to_ascii_uppercase();
    SENTINELS.iter().find(|s| upper.starts_with(**s)).copied()
}

/// Split one in-table line into {key, raw}, where raw keeps the full
/// right-hand column string. The label-prefix dictionary handles sheared
/// labels; the generic fallback splits at the first value-shaped token.
pub fn split_row(line: &str) -> Option<RawSpecRow> {
    if let Some((label, rest)) = repair::match_label(line) {
        let raw = repair::strip_label_residue(rest);
        if raw.is_empty() {
            return None;
        }
        return Some(RawSpecRow {
            key: label.to_string(),
            raw: raw.to_string(),
        });
    }

    static GENERIC: OnceLock<Regex> = OnceLock::new();
    let generic = GENERIC.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z ()/%&.,'-]*?)\s+([0-9±+].*|Yes\b.*|No\b.*|N/A.*|Type\b.*|NEMA\b.*)$")
            .unwrap_or_else(|_| unreachable!("static regex"))
    });
    let caps = generic.captures(line)?;
    let key = caps[1].trim().to_string();
    let raw = caps[2].trim().to_string();
    if key.is_empty() || raw.is_empty() {
        return None;
    }
    Some(RawSpecRow { key, raw })
}

/// Long prose lines with domain vocabulary feed the overview.
fn is_overview_line(line: &str) -> bool {
    if line.len() <= 50 {
        return false;
    }
    let lower = line.to_ascii_lowercase();
    OVERVIEW_TERMS.iter().any(|t| lower.contains(t))
}

/// Safety/callout shape: ends with `!` and references an SPD rating term.
fn is_sidebar_callout(line: &str) -> bool {
    line.ends_with('!') && CALLOUT_TERMS.iter().any(|t| line.contains(t))
}

/// Bullet lines start a feature; indented or lowercase-starting lines
/// continue the previous one.
fn collect_feature_line(line: &str, features: &mut Vec<String>) {
    if let Some(body) = line.strip_prefix('•') {
        let body = body.trim();
        if !body.is_empty() {
            features.push(body.to_string());
        }
        return;
    }
    let continues = line
        .chars()
        .next()
        .map(|c| c.is_lowercase())
        .unwrap_or(false);
    if continues {
        if let Some(last) = features.last_mut() {
            last.push(' ');
            last.push_str(line);
        }
    }
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
