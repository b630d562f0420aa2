//! Scored datasheet-link and product-image extraction.

use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

use crate::core::types::DatasheetLink;

const MAX_DATASHEETS: usize = 5;
const MAX_IMAGES: usize = 3;

const IMAGE_REJECT_MARKERS: &[&str] = &["logo", "icon", "sprite", "placeholder", "spinner"];
const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".gif"];

/// Scan every anchor, score it, keep positives, de-duplicate by URL retaining
/// the max score, sort descending, take the top five.
pub(super) fn extract_datasheets(document: &Html, base_url: Option<&Url>) -> Vec<DatasheetLink> {
    let Ok(sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut best: HashMap<String, (i32, String)> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for anchor in document.select(&sel) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let text = anchor.text().collect::<String>().trim().to_string();
        let score = score_datasheet_link(href, &text);
        if score <= 0 {
            continue;
        }

        let absolute = absolutize(href, base_url);
        match best.get_mut(&absolute) {
            Some(entry) => {
                if score > entry.0 {
                    *entry = (score, text);
                }
            }
            None => {
                order.push(absolute.clone());
                best.insert(absolute, (score, text));
            }
        }
    }

    let mut scored: Vec<(String, i32, String)> = order
        .into_iter()
        .filter_map(|url| best.get(&url).map(|(s, t)| (url.clone(), *s, t.clone())))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    scored
        .into_iter()
        .take(MAX_DATASHEETS)
        .map(|(url, _, label)| DatasheetLink {
            label: if label.is_empty() {
                "Datasheet".to_string()
            } else {
                label
            },
            url,
        })
        .collect()
}

pub(super) fn score_datasheet_link(href: &str, text: &str) -> i32 {
    let href_lower = href.to_ascii_lowercase();
    let text_lower = text.to_ascii_lowercase();
    let mut score = 0;

    let href_path = href_lower.split(['?', '#']).next().unwrap_or("");
    if href_path.ends_with(".pdf") {
        score += 3;
    }
    if text_lower.contains("datasheet") || text_lower.contains("data sheet") {
        score += 2;
    }
    if text_lower.contains("spec") {
        score += 2;
    }
    if text_lower.contains("manual") {
        score += 1;
    }
    if text_lower.contains("privacy")
        || text_lower.contains("terms")
        || text_lower.contains("catalog")
    {
        score -= 3;
    }
    score
}

/// OG image seeded at score 5; `<img src>` candidates filtered against
/// chrome/asset markers and scored by URL shape. Top three, absolute URLs.
pub(super) fn extract_images(document: &Html, base_url: Option<&Url>) -> Vec<String> {
    let mut best: HashMap<String, i32> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    if let Ok(og_sel) = Selector::parse("meta[property=\"og:image\"]") {
        if let Some(content) = document
            .select(&og_sel)
            .next()
            .and_then(|el| el.value().attr("content"))
        {
            let absolute = absolutize(content.trim(), base_url);
            if !absolute.is_empty() {
                order.push(absolute.clone());
                best.insert(absolute, 5);
            }
        }
    }

    if let Ok(img_sel) = Selector::parse("img[src]") {
        for element in document.select(&img_sel) {
            let Some(src) = element.value().attr("src") else {
                continue;
            };
            let Some(score) = score_image(src) else {
                continue;
            };
            let absolute = absolutize(src, base_url);
            match best.get_mut(&absolute) {
                Some(existing) => *existing = (*existing).max(score),
                None => {
                    order.push(absolute.clone());
                    best.insert(absolute, score);
                }
            }
        }
    }

    let mut scored: Vec<(String, i32)> = order
        .into_iter()
        .filter_map(|url| best.get(&url).map(|s| (url.clone(), *s)))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    scored
        .into_iter()
        .take(MAX_IMAGES)
        .map(|(url, _)| url)
        .collect()
}

/// `None` means rejected outright.
pub(super) fn score_image(src: &str) -> Option<i32> {
    let lower = src.to_ascii_lowercase();
    if lower.trim().is_empty() {
        return None;
    }
    if IMAGE_REJECT_MARKERS.iter().any(|m| lower.contains(m)) {
        return None;
    }

    let mut score = 1;
    if lower.contains("product") || lower.contains("media") {
        score += 2;
    }
    let path = lower.split(['?', '#']).next().unwrap_or("");
    if IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        score += 1;
    }
    Some(score)
}

fn absolutize(href: &str, base_url: Option<&Url>) -> String {
    match base_url {
        Some(base) => base
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasheet_scoring() {
        assert_eq!(score_datasheet_link("/ds/m1.pdf", "Download Datasheet"), 5);
        assert_eq!(score_datasheet_link("/ds/m1.pdf", ""), 3);
        assert_eq!(score_datasheet_link("/page", "Full Specifications"), 2);
        assert_eq!(score_datasheet_link("/legal.pdf", "Privacy Policy"), 0);
        assert_eq!(score_datasheet_link("/page", "Installation Manual"), 1);
    }

    #[test]
    fn datasheet_dedup_keeps_best_score_and_caps_at_five() {
        let html = r#"<html><body>
            <a href="/m1.pdf">file</a>
            <a href="/m1.pdf">Download Datasheet</a>
            <a href="/a.pdf">a</a><a href="/b.pdf">b</a><a href="/c.pdf">c</a>
            <a href="/d.pdf">d</a><a href="/e.pdf">e</a>
        </body></html>"#;
        let doc = Html::parse_document(html);
        let base = Url::parse("https://surgepure.com/products/m1").unwrap();
        let out = extract_datasheets(&doc, Some(&base));
        assert_eq!(out.len(), 5);
        assert_eq!(out[0].url, "https://surgepure.com/m1.pdf");
        assert_eq!(out[0].label, "Download Datasheet");
    }

    #[test]
    fn image_rejection_and_scoring() {
        assert!(score_image("/assets/logo.png").is_none());
        assert!(score_image("/assets/loading-spinner.gif").is_none());
        assert_eq!(score_image("/media/m1-front.jpg"), Some(4));
        assert_eq!(score_image("/files/m1-front"), Some(1));
    }

    #[test]
    fn og_image_outranks_page_images() {
        let html = r#"<html><head>
            <meta property="og:image" content="/media/hero.png"></head>
            <body><img src="/media/product-side.jpg"><img src="/banner.gif"></body></html>"#;
        let doc = Html::parse_document(html);
        let base = Url::parse("https://surgepure.com/p/m1").unwrap();
        let out = extract_images(&doc, Some(&base));
        assert_eq!(out[0], "https://surgepure.com/media/hero.png");
        assert!(out.len() <= 3);
    }

    #[test]
    fn urls_resolve_absolute() {
        let html = r#"<html><body><a href="docs/m1.pdf">Datasheet</a></body></html>"#;
        let doc = Html::parse_document(html);
        let base = Url::parse("https://surgepure.com/products/").unwrap();
        let out = extract_datasheets(&doc, Some(&base));
        assert_eq!(out[0].url, "https://surgepure.com/products/docs/m1.pdf");
    }
}
