//! Body-shape heuristics for deciding whether a fetch returned a real
//! product page or something that needs headless escalation.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Minimum body length for a response to count as HTML at all.
pub const MIN_HTML_LEN: usize = 1000;

/// Minimum body length for the usable-signal check.
pub const MIN_USABLE_LEN: usize = 8000;

/// Tokens shaped like manufacturer part numbers, e.g. `M1-1120-3`, `1756-IB16`.
fn mpn_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Z0-9]{1,6}-[A-Z0-9]{2,6}(?:-[A-Z0-9]{1,4})?\b")
            .unwrap_or_else(|_| unreachable!("static regex"))
    })
}

/// Length floor plus blocked-page markers. A challenge interstitial can be
/// long, but the fetch tier only needs to reject the obvious ones; the
/// extractor re-checks with its own guardrails.
pub fn is_valid_html(body: &str) -> bool {
    if body.len() < MIN_HTML_LEN {
        return false;
    }
    let lower = body.to_ascii_lowercase();
    !lower.contains("enable javascript") && !lower.contains("captcha")
}

/// Homepage heuristic: at least two nav elements AND either product-grid
/// marketing phrases or three or more product-card class occurrences.
pub fn looks_like_homepage(body: &str) -> bool {
    let document = Html::parse_document(body);
    let nav_count = Selector::parse("nav")
        .map(|sel| document.select(&sel).count())
        .unwrap_or(0);
    if nav_count < 2 {
        return false;
    }

    let lower = body.to_ascii_lowercase();
    let marketing = lower.contains("featured products")
        || lower.contains("categories")
        || lower.contains("shop by");

    let card_hits = lower.matches("product-card").count()
        + lower.matches("product-item").count()
        + lower.matches("product-tile").count();

    marketing || card_hits >= 3
}

/// Spec markup: a specifications heading, a table, or a definition list.
pub fn has_spec_markup(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    lower.contains("specification")
        || lower.contains("technical data")
        || lower.contains("<table")
        || lower.contains("<dl")
}

/// A `.pdf` href with datasheet/download/manual wording within a small window.
pub fn has_datasheet_link(body: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    let mut from = 0;
    while let Some(rel) = lower[from..].find(".pdf") {
        let idx = from + rel;
        let mut start = idx.saturating_sub(200);
        while start > 0 && !lower.is_char_boundary(start) {
            start -= 1;
        }
        let mut end = (idx + 200).min(lower.len());
        while end < lower.len() && !lower.is_char_boundary(end) {
            end += 1;
        }
        let window = &lower[start..end];
        if window.contains("datasheet")
            || window.contains("data sheet")
            || window.contains("download")
            || window.contains("manual")
        {
            return true;
        }
        from = idx + 4;
    }
    false
}

/// Product-page shape: not homepage-like, has an h1 or title, and carries
/// either spec markup or a datasheet link.
pub fn is_product_page(body: &str) -> bool {
    if looks_like_homepage(body) {
        return false;
    }

    let document = Html::parse_document(body);
    let has_heading = ["h1", "title"].iter().any(|tag| {
        Selector::parse(tag)
            .map(|sel| {
                document
                    .select(&sel)
                    .any(|el| !el.text().collect::<String>().trim().is_empty())
            })
            .unwrap_or(false)
    });
    if !has_heading {
        return false;
    }

    has_spec_markup(body) || has_datasheet_link(body)
}

/// Usable-signal shape: long enough AND at least one strong content signal
/// (spec table, datasheet reference, or a cluster of MPN-like tokens).
pub fn has_usable_signal(body: &str) -> bool {
    if body.len() <= MIN_USABLE_LEN {
        return false;
    }

    let lower = body.to_ascii_lowercase();
    if lower.contains("<table") || lower.contains("<dl") {
        return true;
    }
    if has_datasheet_link(body) {
        return true;
    }
    mpn_token_re().find_iter(body).count() >= 5
}
