//! Interpretable feature model for ranking search results.
//!
//! Six scalars per candidate, mean-centered per query, combined with fixed
//! hand-initialized weights and squashed through the logistic function.
//! No hard whitelists: the domain-trust prior is a pattern function, so an
//! unknown OEM storefront can still win on the other features.

use url::Url;

use crate::core::types::{SearchCandidate, SerpResult};

/// Weights over (mpnInUrl, mpnInTitle, mfgInText, productPath, domainTrust, junkPath).
pub const WEIGHTS: [f64; 6] = [4.2, 3.4, 2.6, 2.0, 1.6, -3.8];

/// Major electronics distributors whose product pages are reliably canonical.
const DISTRIBUTOR_HOSTS: &[&str] = &[
    "digikey",
    "mouser",
    "newark",
    "arrow.com",
    "alliedelec",
    "grainger",
    "galco",
    "automationdirect",
    "rexel",
    "platt",
    "zoro",
];

/// Continuous prior from a pattern-based function of the host.
pub fn domain_trust(host: &str) -> f64 {
    let host = host.to_ascii_lowercase();
    if host.contains("forum") || host.contains("reddit") {
        return -0.7;
    }
    if host.contains("blog") {
        return -0.6;
    }
    if host.contains("viewer") {
        return -0.4;
    }
    if host.contains("datasheet") {
        return -0.3;
    }
    if DISTRIBUTOR_HOSTS.iter().any(|d| host.contains(d)) {
        return 0.9;
    }
    // Manufacturer-shaped: exactly two dot-separated labels (e.g. surgepure.com).
    if host.split('.').filter(|s| !s.is_empty()).count() == 2 {
        return 0.4;
    }
    0.0
}

/// Markers of search pages, community content and other junk destinations.
pub fn is_junk_path(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("/search")
        || lower.contains("?q=")
        || lower.contains("?s=")
        || lower.contains("&q=")
        || lower.contains("/blog")
        || lower.contains("forum")
        || lower.contains("reddit")
        || lower.contains("stackexchange")
}

/// Compute the six-dimensional feature vector for one result.
pub fn feature_vector(result: &SerpResult, mpn: &str, manufacturer: &str) -> [f64; 6] {
    let mpn_lower = mpn.to_ascii_lowercase();
    let mfg_lower = manufacturer.to_ascii_lowercase();
    let title_lower = result.title.to_ascii_lowercase();
    let snippet_lower = result.snippet.to_ascii_lowercase();

    let (path, host) = match Url::parse(&result.link) {
        Ok(u) => (
            u.path().to_ascii_lowercase(),
            u.host_str().unwrap_or("").to_string(),
        ),
        Err(_) => (result.link.to_ascii_lowercase(), String::new()),
    };

    let mpn_in_url = path.contains(&mpn_lower);
    let mpn_in_title = title_lower.contains(&mpn_lower);
    let mfg_in_text = !mfg_lower.is_empty()
        && (title_lower.contains(&mfg_lower) || snippet_lower.contains(&mfg_lower));
    let product_path = path.contains("/product");

    [
        f64::from(mpn_in_url as u8),
        f64::from(mpn_in_title as u8),
        f64::from(mfg_in_text as u8),
        f64::from(product_path as u8),
        domain_trust(&host),
        f64::from(is_junk_path(&result.link) as u8),
    ]
}

fn logistic(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Score a batch of candidates: center each feature by its per-query mean,
/// apply the linear model, squash. Identical feature vectors always score
/// identically; ranking is a stable descending sort (insertion-order
/// tie-break).
pub fn rank(results: &[SerpResult], mpn: &str, manufacturer: &str) -> Vec<SearchCandidate> {
    if results.is_empty() {
        return Vec::new();
    }

    let vectors: Vec<[f64; 6]> = results
        .iter()
        .map(|r| feature_vector(r, mpn, manufacturer))
        .collect();

    let n = vectors.len() as f64;
    let mut means = [0.0f64; 6];
    for v in &vectors {
        for (m, x) in means.iter_mut().zip(v.iter()) {
            *m += x / n;
        }
    }

    let mut candidates: Vec<SearchCandidate> = results
        .iter()
        .zip(vectors.iter())
        .map(|(r, v)| {
            let z: f64 = v
                .iter()
                .zip(means.iter())
                .zip(WEIGHTS.iter())
                .map(|((x, m), w)| (x - m) * w)
                .sum();
            SearchCandidate {
                url: r.link.clone(),
                title: r.title.clone(),
                snippet: r.snippet.clone(),
                features: *v,
                score: logistic(z),
            }
        })
        .collect();

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    candidates
}
