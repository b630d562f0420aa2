//! Text normalization and column-fracture repair for datasheet PDFs.
//!
//! PDF-to-text output fuses adjacent table cells into single tokens
//! (`Model NumberM1-1120-3`) and shears label columns mid-word, leaving
//! fragments like `Nomi` or `Encl osure Size` at line starts. The repairs
//! here put spaces back at model-token boundaries and map known label
//! fragments onto their full spec-table labels.

use regex::Regex;
use std::sync::OnceLock;

/// Normalize unicode dashes to ASCII hyphen, non-breaking space to space,
/// collapse runs of whitespace within a line but keep the line structure.
pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            let replaced: String = line
                .chars()
                .map(|c| match c {
                    '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}'
                    | '\u{2212}' => '-',
                    '\u{a0}' => ' ',
                    other => other,
                })
                .collect();
            replaced.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn fused_after_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([a-z)\]])([A-Z]{1,3}\d?-\d{3,4}-\d)")
            .unwrap_or_else(|_| unreachable!("static regex"))
    })
}

fn fused_after_digit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d)([A-Z]{1,3}\d?-\d{3,4}-\d)")
            .unwrap_or_else(|_| unreachable!("static regex"))
    })
}

/// Insert spaces where a model token was fused onto the preceding cell.
/// Two passes: consecutive fused models share boundary characters, so a
/// single non-overlapping sweep can miss every other seam.
pub fn repair_columns(text: &str) -> String {
    let mut out = text.to_string();
    for _ in 0..2 {
        out = fused_after_word_re().replace_all(&out, "$1 $2").to_string();
        out = fused_after_digit_re().replace_all(&out, "$1 $2").to_string();
    }
    out
}

/// Label-fragment repair dictionary: PDF column breaks shear spec labels;
/// these map the surviving fragment back onto the full label. Matched
/// longest-fragment-first, case-insensitive, at line start.
pub const LABEL_REPAIRS: &[(&str, &str)] = &[
    ("Nominal AC Line Voltage", "Nominal AC Line Voltage (VRMS)"),
    ("Nomi", "Nominal AC Line Voltage (VRMS)"),
    ("Max Continuous Operating Voltage", "Maximum Continuous Operating Voltage (MCOV)"),
    ("Maximum Continuous Operating", "Maximum Continuous Operating Voltage (MCOV)"),
    ("MCOV", "Maximum Continuous Operating Voltage (MCOV)"),
    ("Frequency Range", "Frequency Range - USA/Euro Std"),
    ("Freq", "Frequency Range - USA/Euro Std"),
    ("Short Circuit Current Rating", "Short Circuit Current Rating (SCCR)"),
    ("Short Circ", "Short Circuit Current Rating (SCCR)"),
    ("SCCR", "Short Circuit Current Rating (SCCR)"),
    ("Nominal Discharge Current", "Nominal Discharge Current (In)"),
    ("Nominal Disch", "Nominal Discharge Current (In)"),
    ("Voltage Protection Rating", "Voltage Protection Rating (VPR)"),
    ("VPR", "Voltage Protection Rating (VPR)"),
    ("Surge Current Capacity Per Phase", "Surge Current Capacity (Per Phase)"),
    ("Surge Curr", "Surge Current Capacity (Per Phase)"),
    ("Per Mode", "Surge Current Capacity (Per Mode)"),
    ("Protection Mod", "Protection Modes"),
    ("Operating Temp", "Operating Temperature"),
    ("Storage Temp", "Storage Temperature"),
    ("Relative Humid", "Relative Humidity"),
    ("Humid", "Relative Humidity"),
    ("Encl osure Size", "Enclosure Size (HxWxD)"),
    ("Enclosure Size", "Enclosure Size (HxWxD)"),
    ("Encl osure Type", "Enclosure Type (NEMA)"),
    ("Enclosure Type", "Enclosure Type (NEMA)"),
    ("Mounting", "Mounting"),
    ("Connection Typ", "Connection Type"),
    ("Wire Size", "Wire Size (AWG)"),
    ("Response Tim", "Response Time"),
    ("Status Indic", "Status Indication"),
    ("Remote Alarm", "Remote Alarm Contacts"),
    ("Agency Appr", "Agency Approvals"),
    ("UL List", "UL Listing"),
    ("SPD Typ", "SPD Type"),
    ("Dimens", "Dimensions (HxWxD)"),
    ("Weight", "Weight"),
    ("Warr", "Warranty"),
];

/// Find the repaired label for a line, returning `(label, rest)` where
/// `rest` is everything after the matched fragment.
pub fn match_label<'a>(line: &'a str) -> Option<(&'static str, &'a str)> {
    let lower = line.to_ascii_lowercase();
    let mut best: Option<(&'static str, usize)> = None;
    for (fragment, label) in LABEL_REPAIRS {
        let frag_lower = fragment.to_ascii_lowercase();
        if lower.starts_with(&frag_lower) {
            match best {
                Some((_, len)) if len >= fragment.len() => {}
                _ => best = Some((label, fragment.len())),
            }
        }
    }
    best.map(|(label, len)| (label, &line[len..]))
}

fn value_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[±+<>]|-?[0-9]|\bYes\b|\bNo\b|\bN/A\b|\bType\b|\bSingle\b|\bThree\b|\bNEMA\b")
            .unwrap_or_else(|_| unreachable!("static regex"))
    })
}

/// Drop whatever is left of a sheared label between the matched fragment and
/// the first thing that looks like a value column: a parenthesized unit tag,
/// then a leading all-lowercase label tail, then scan for a value token.
pub fn strip_label_residue(rest: &str) -> &str {
    let mut rest = rest.trim_start();

    if rest.starts_with('(') {
        if let Some(close) = rest.find(')') {
            rest = rest[close + 1..].trim_start();
        }
    }

    if let Some(first) = rest.split_whitespace().next() {
        if !first.is_empty() && first.chars().all(|c| c.is_ascii_lowercase()) {
            rest = rest[first.len()..].trim_start();
        }
    }

    match value_start_re().find(rest) {
        Some(found) => rest[found.start()..].trim(),
        None => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dashes_and_nbsp() {
        let raw = "M1\u{2013}1120\u{2212}3\u{a0}\u{a0}120/240";
        assert_eq!(normalize_text(raw), "M1-1120-3 120/240");
    }

    #[test]
    fn repairs_model_fused_onto_header() {
        let repaired = repair_columns("Model NumberM1-1120-3 M1-1240-3");
        assert_eq!(repaired, "Model Number M1-1120-3 M1-1240-3");
    }

    #[test]
    fn repairs_consecutively_fused_models() {
        let repaired = repair_columns("Model Number M1-1120-3M1-1240-3M1-1480-3");
        assert_eq!(repaired, "Model Number M1-1120-3 M1-1240-3 M1-1480-3");
    }

    #[test]
    fn label_match_prefers_longest_fragment() {
        let (label, rest) = match_label("Enclosure Size 10x8x6 in").unwrap();
        assert_eq!(label, "Enclosure Size (HxWxD)");
        assert_eq!(strip_label_residue(rest), "10x8x6 in");
    }

    #[test]
    fn sheared_fragment_maps_to_full_label() {
        let (label, rest) = match_label("Nomi 120/240 208Y/120 480").unwrap();
        assert_eq!(label, "Nominal AC Line Voltage (VRMS)");
        assert_eq!(strip_label_residue(rest), "120/240 208Y/120 480");
    }

    #[test]
    fn residue_stripping_skips_label_tail() {
        // "Warr" matched; "anty" is the sheared tail before the value column.
        let (label, rest) = match_label("Warranty 10 Years 10 Years").unwrap();
        assert_eq!(label, "Warranty");
        assert_eq!(strip_label_residue(rest), "10 Years 10 Years");
    }

    #[test]
    fn split_label_with_internal_break() {
        let (label, rest) = match_label("Encl osure Size (HxWxD) 10x8x6").unwrap();
        assert_eq!(label, "Enclosure Size (HxWxD)");
        assert_eq!(strip_label_residue(rest), "10x8x6");
    }
}
