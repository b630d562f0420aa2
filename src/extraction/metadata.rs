//! Title and description resolution from document metadata.

use scraper::{Html, Selector};
use url::Url;

use super::normalize_token;

pub(super) struct ResolvedTitles {
    pub display: Option<String>,
    pub canonical: String,
}

/// Pick the display title from the first non-empty of OpenGraph title,
/// Twitter title, first h1, document title. The canonical title must contain
/// the (normalized) MPN among the h1 / OG-title / document-title candidates;
/// when none qualifies it falls back to `"<manufacturer> <mpn>"`. A canonical
/// title is never a site name or bare domain.
pub(super) fn resolve_titles(
    document: &Html,
    mpn: &str,
    manufacturer: &str,
    base_url: Option<&Url>,
) -> ResolvedTitles {
    let og_title = meta_content(document, "meta[property=\"og:title\"]");
    let twitter_title = meta_content(document, "meta[name=\"twitter:title\"]");
    let h1 = first_text(document, "h1");
    let doc_title = first_text(document, "title");

    let display = [&og_title, &twitter_title, &h1, &doc_title]
        .into_iter()
        .flatten()
        .find(|t| !t.is_empty())
        .cloned();

    let site_name = meta_content(document, "meta[property=\"og:site_name\"]");
    let host = base_url.and_then(|u| u.host_str()).unwrap_or("");
    let mpn_normalized = normalize_token(mpn);

    let canonical = [&h1, &og_title, &doc_title]
        .into_iter()
        .flatten()
        .find(|candidate| {
            normalize_token(candidate).contains(&mpn_normalized)
                && !is_site_name(candidate, site_name.as_deref(), host)
        })
        .cloned()
        .unwrap_or_else(|| fallback_title(manufacturer, mpn));

    ResolvedTitles { display, canonical }
}

pub(super) fn fallback_title(manufacturer: &str, mpn: &str) -> String {
    if manufacturer.is_empty() {
        mpn.to_string()
    } else {
        format!("{manufacturer} {mpn}")
    }
}

/// A candidate that merely names the site (or is a bare domain) is not a
/// product title.
fn is_site_name(candidate: &str, site_name: Option<&str>, host: &str) -> bool {
    let trimmed = candidate.trim();
    if let Some(site) = site_name {
        if trimmed.eq_ignore_ascii_case(site.trim()) {
            return true;
        }
    }
    if !host.is_empty() {
        let bare_host = host.trim_start_matches("www.");
        if trimmed.eq_ignore_ascii_case(host) || trimmed.eq_ignore_ascii_case(bare_host) {
            return true;
        }
    }
    // Bare-domain shape: one whitespace-free token with an internal dot.
    !trimmed.contains(char::is_whitespace) && trimmed.matches('.').count() >= 1 && trimmed.len() > 3
}

pub(super) fn meta_description(document: &Html) -> Option<String> {
    meta_content(document, "meta[name=\"description\"]")
}

pub(super) fn og_description(document: &Html) -> Option<String> {
    meta_content(document, "meta[property=\"og:description\"]")
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn og_title_wins_for_display() {
        let doc = Html::parse_document(
            r#"<html><head>
            <meta property="og:title" content="M1-1120-3 SPD">
            <title>SurgePure Store</title></head>
            <body><h1>M1-1120-3 Surge Protector</h1></body></html>"#,
        );
        let titles = resolve_titles(&doc, "M1-1120-3", "SurgePure", None);
        assert_eq!(titles.display.as_deref(), Some("M1-1120-3 SPD"));
        // h1 is the first canonical candidate containing the MPN.
        assert_eq!(titles.canonical, "M1-1120-3 Surge Protector");
    }

    #[test]
    fn canonical_falls_back_when_no_candidate_has_mpn() {
        let doc = Html::parse_document(
            "<html><head><title>Our Store</title></head><body><h1>Welcome</h1></body></html>",
        );
        let titles = resolve_titles(&doc, "M1-1120-3", "SurgePure", None);
        assert_eq!(titles.canonical, "SurgePure M1-1120-3");
    }

    #[test]
    fn canonical_rejects_bare_domain() {
        let doc = Html::parse_document(
            "<html><head><title>m1-1120-3.surgepure.com</title></head><body></body></html>",
        );
        let titles = resolve_titles(&doc, "M1-1120-3", "SurgePure", None);
        assert_eq!(titles.canonical, "SurgePure M1-1120-3");
    }

    #[test]
    fn canonical_matches_mpn_across_hyphen_loss() {
        let doc = Html::parse_document(
            "<html><body><h1>SurgePure M11120 3 Protector</h1></body></html>",
        );
        let titles = resolve_titles(&doc, "M1-1120-3", "SurgePure", None);
        assert_eq!(titles.canonical, "SurgePure M11120 3 Protector");
    }
}
