//! Grounded HTML extraction. Parses a crawled page into evidence (title,
//! specs, overview, images, datasheet links), promoting signals from
//! structured metadata where present, and quantifies its own quality.
//! Refuses below a quality floor rather than inventing facts.

mod links;
mod metadata;
mod specs;
mod structured;

use scraper::Html;
use tracing::{debug, info};
use url::Url;

use crate::core::types::{
    ExtractFailure, ExtractResult, ExtractedProduct, SourceType, VerbatimSection,
};

/// Quality-feature weights: title, specs, images, datasheets, overview.
const QUALITY_WEIGHTS: [f64; 5] = [0.15, 0.30, 0.20, 0.25, 0.10];

/// Extractions must score strictly above this floor; exactly 0.30 fails.
pub const QUALITY_FLOOR: f64 = 0.30;

/// Pages shorter than this that carry challenge markers are bot walls.
const CHALLENGE_LEN_CEILING: usize = 12_000;

const CHALLENGE_MARKERS: &[&str] = &[
    "__cf_chl",
    "cf-challenge",
    "attention required",
    "verify you are human",
];

/// Hosts that resell rather than manufacture; used for source typing and the
/// non-product guardrail.
const DISTRIBUTOR_MARKERS: &[&str] = &[
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

pub struct HtmlExtractor {
    pub mpn: String,
    pub manufacturer: Option<String>,
}

impl HtmlExtractor {
    pub fn new(mpn: &str, manufacturer: Option<&str>) -> Self {
        Self {
            mpn: mpn.to_string(),
            manufacturer: manufacturer.map(str::to_string),
        }
    }

    /// Extract evidence from one page. Inputs are never mutated; outputs
    /// carry only values that were actually seen on the page.
    pub fn extract(&self, html: &str, source_url: &str) -> ExtractResult {
        // Guardrail 1: nothing to parse.
        if html.trim().is_empty() {
            return ExtractResult::failed(ExtractFailure::NoHtml);
        }

        // Guardrail 2: short challenge interstitials.
        let lower = html.to_ascii_lowercase();
        if html.len() < CHALLENGE_LEN_CEILING
            && CHALLENGE_MARKERS.iter().any(|m| lower.contains(m))
        {
            return ExtractResult::failed(ExtractFailure::Blocked);
        }

        // Guardrail 3: the part is nowhere on the page and the URL does not
        // look like a product destination.
        let mpn_normalized = normalize_token(&self.mpn);
        let html_normalized = normalize_token(&lower);
        if !html_normalized.contains(&mpn_normalized) && !url_has_product_markers(source_url) {
            return ExtractResult::failed(ExtractFailure::NonProduct);
        }

        let document = Html::parse_document(html);
        let base_url = Url::parse(source_url).ok();

        let mut product = ExtractedProduct::new(
            &self.mpn,
            self.manufacturer.as_deref().unwrap_or(""),
            source_url,
            SourceType::Unknown,
        );

        // Structured metadata first: JSON-LD gives the cleanest brand and
        // description on modern storefronts.
        let json_ld = structured::extract_json_ld_product(&document);
        if product.manufacturer.is_empty() {
            if let Some(brand) = &json_ld.brand {
                product.manufacturer = brand.clone();
            }
        }

        let titles = metadata::resolve_titles(
            &document,
            &self.mpn,
            &product.manufacturer,
            base_url.as_ref(),
        );
        product.display_title = titles.display;
        product.canonical_title = Some(titles.canonical);

        product.specs = specs::extract_specs(&document);
        structured::promote_bcdata(html, &mut product.specs);

        let meta_description = metadata::meta_description(&document);
        let og_description = metadata::og_description(&document);
        structured::promote_description_specs(
            &format!(
                "{} {}",
                meta_description.as_deref().unwrap_or(""),
                og_description.as_deref().unwrap_or("")
            ),
            &mut product.specs,
        );

        let overview = meta_description
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| json_ld.description.clone());
        if let Some(text) = &overview {
            product.verbatim_sections.push(VerbatimSection {
                heading: Some("Overview".to_string()),
                text: text.clone(),
                source: Some(source_url.to_string()),
            });
        }

        product.datasheets = links::extract_datasheets(&document, base_url.as_ref());
        product.images = links::extract_images(&document, base_url.as_ref());

        product.source_type = classify_source(source_url, &product.manufacturer);

        // Quality over five binary features.
        let overview_len = overview.as_deref().map(str::len).unwrap_or(0);
        let title_len = product
            .display_title
            .as_deref()
            .map(str::len)
            .unwrap_or(0);
        let features = [
            title_len > 15,
            !product.specs.is_empty(),
            !product.images.is_empty(),
            !product.datasheets.is_empty(),
            overview_len > 40,
        ];
        let quality = quality_score(&features);
        product.confidence = quality;

        debug!(
            "extracted {}: {} specs, {} images, {} datasheets, quality {:.2}",
            source_url,
            product.specs.len(),
            product.images.len(),
            product.datasheets.len(),
            quality
        );

        if quality <= QUALITY_FLOOR {
            info!(
                "extraction at or below quality floor ({:.2} <= {:.2}) for {}",
                quality, QUALITY_FLOOR, source_url
            );
            // Low quality still emits whatever was found.
            return ExtractResult {
                ok: false,
                reason: Some(ExtractFailure::LowQuality),
                product: Some(product),
                quality,
            };
        }

        ExtractResult {
            ok: true,
            reason: None,
            product: Some(product),
            quality,
        }
    }
}

/// Weighted sum over the five binary quality features.
pub fn quality_score(features: &[bool; 5]) -> f64 {
    features
        .iter()
        .zip(QUALITY_WEIGHTS.iter())
        .map(|(&present, w)| if present { *w } else { 0.0 })
        .sum()
}

/// Strip hyphens and spaces for MPN-substring comparisons.
pub(crate) fn normalize_token(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '-' && *c != ' ')
        .flat_map(char::to_lowercase)
        .collect()
}

fn url_has_product_markers(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.contains("/product") || DISTRIBUTOR_MARKERS.iter().any(|d| lower.contains(d))
}

fn classify_source(url: &str, manufacturer: &str) -> SourceType {
    let lower = url.to_ascii_lowercase();
    if lower.split(['?', '#']).next().unwrap_or("").ends_with(".pdf") {
        return SourceType::Pdf;
    }
    if !manufacturer.is_empty() {
        let mfg = normalize_token(manufacturer);
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                if normalize_token(host).contains(&mfg) {
                    return SourceType::Oem;
                }
            }
        }
    }
    if DISTRIBUTOR_MARKERS.iter().any(|d| lower.contains(d)) {
        return SourceType::Distributor;
    }
    SourceType::Unknown
}
