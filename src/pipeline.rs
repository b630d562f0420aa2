//! Pipeline driver: DISCOVER → CRAWL → EXTRACT → NORMALIZE → SYNTHESIZE for
//! one MPN, with the confidence blend threaded through every stage. Weak
//! stages degrade into a non-usable `FinalResult`; datasheet-parse and LLM
//! failures propagate to the caller.

use std::sync::Arc;
use tracing::{info, warn};

use crate::core::types::{
    ConfidenceBreakdown, CrawlResult, DatasheetExtraction, ExtractFailure, ExtractedProduct,
    FailureReason, FinalResult, SourceType, SpecTableRow, SynthesisOutput, VerbatimSection,
};
use crate::core::{AppState, EnrichError};
use crate::crawling::Crawler;
use crate::datasheet::DatasheetParser;
use crate::discovery::Discovery;
use crate::enrichment::normalize::{base_mpn, is_remote_alarm_variant};
use crate::enrichment::synthesize::{self, Synthesizer};
use crate::enrichment::Normalizer;
use crate::extraction::HtmlExtractor;

/// Blend weights over (discovery, crawl, extraction, synthesis).
const BLEND_WEIGHTS: [f64; 4] = [0.25, 0.20, 0.30, 0.25];

/// Results below this blended confidence are not usable.
pub const USABLE_THRESHOLD: f64 = 0.65;

/// Crawl component of the blend: cheap-fetch success vs anything else.
const CRAWL_TIER1_SCORE: f64 = 0.85;
const CRAWL_FALLBACK_SCORE: f64 = 0.6;

/// Per-source confidence for a parsed datasheet PDF (between HTML quality
/// scores and the cached-datasheet prior).
const PDF_SOURCE_CONFIDENCE: f64 = 0.85;

/// Candidate URLs tried before giving up on HTML.
const MAX_CRAWL_URLS: usize = 3;

const RA_SENTENCE: &str = "This model includes a remote alarm output for system monitoring.";

/// Enrich one part. Never panics; returns `Err` only for failures the spec
/// propagates (search/LLM HTTP, LLM JSON, datasheet parse).
pub async fn enrich_part(
    state: &Arc<AppState>,
    mpn: &str,
    manufacturer: &str,
) -> Result<FinalResult, EnrichError> {
    let requested = mpn.trim().to_string();
    let variant_ra = is_remote_alarm_variant(&requested);
    let base = base_mpn(&requested);

    info!(
        "enriching {} (base {}, manufacturer '{}')",
        requested, base, manufacturer
    );

    // ── DISCOVER ─────────────────────────────────────────────────────────
    let discovery = Discovery::new(&state.serp).discover(&base, manufacturer).await?;
    let dc = discovery.confidence.discovery_score();

    let mut breakdown = ConfidenceBreakdown {
        discovery: dc,
        ..Default::default()
    };

    let candidates: Vec<String> = discovery
        .primary_product_url
        .iter()
        .cloned()
        .chain(discovery.backup_urls.iter().cloned())
        .take(MAX_CRAWL_URLS)
        .collect();

    if candidates.is_empty() && discovery.pdf_urls.is_empty() {
        info!("{}: discovery emitted nothing usable", requested);
        return Ok(FinalResult::failure(
            &requested,
            manufacturer,
            FailureReason::NoProductUrls,
            breakdown,
            0.0,
        ));
    }

    // ── CRAWL ────────────────────────────────────────────────────────────
    let crawler = Crawler::new(state.http_client.clone());
    let mut crawl: Option<CrawlResult> = None;
    for url in &candidates {
        let result = crawler.crawl(url).await;
        if result.html.is_some() {
            crawl = Some(result);
            break;
        }
        // Per-URL failures are swallowed; the next candidate gets its turn.
        warn!(
            "{}: crawl failed for {} ({:?})",
            requested, url, result.fallback_reason
        );
    }

    // ── EXTRACT ──────────────────────────────────────────────────────────
    let (product, ec, cc) = match crawl {
        Some(crawl_result) => {
            let html = crawl_result.html.as_deref().unwrap_or("");
            let cc = if crawl_result.used_headless_browser {
                CRAWL_FALLBACK_SCORE
            } else {
                CRAWL_TIER1_SCORE
            };
            breakdown.crawl = cc;

            let extractor = HtmlExtractor::new(&base, Some(manufacturer));
            let extracted = extractor.extract(html, &crawl_result.final_url);
            breakdown.extraction = extracted.quality;

            if !extracted.ok {
                let confidence = match extracted.reason {
                    Some(ExtractFailure::LowQuality) => extracted.quality,
                    _ => 0.0,
                };
                info!(
                    "{}: extraction rejected ({:?}, quality {:.2})",
                    requested, extracted.reason, extracted.quality
                );
                return Ok(FinalResult::failure(
                    &requested,
                    manufacturer,
                    FailureReason::LowExtractionQuality,
                    breakdown,
                    confidence,
                ));
            }

            let product = extracted
                .product
                .unwrap_or_else(|| ExtractedProduct::new(&base, manufacturer, "", SourceType::Unknown));
            (product, extracted.quality, cc)
        }
        None if !discovery.pdf_urls.is_empty() => {
            // HTML never materialized but discovery found datasheets: parse
            // the first PDF as the evidence source. Parse failures propagate.
            let pdf_url = &discovery.pdf_urls[0];
            let cache = state
                .config
                .resolve_data_dir()
                .join(state.config.resolve_tenant())
                .join("pdfs")
                .join(format!("{base}.pdf"));
            let parser = DatasheetParser::new(&state.http_client, state.llm.as_ref());
            let extraction = parser.extract(pdf_url, Some(&base), Some(&cache)).await?;

            let product = product_from_datasheet(&extraction, &base, manufacturer, pdf_url);
            breakdown.crawl = CRAWL_FALLBACK_SCORE;
            breakdown.extraction = PDF_SOURCE_CONFIDENCE;
            (product, PDF_SOURCE_CONFIDENCE, CRAWL_FALLBACK_SCORE)
        }
        None => {
            info!("{}: every candidate URL failed both tiers", requested);
            return Ok(FinalResult::failure(
                &requested,
                manufacturer,
                FailureReason::CrawlFailed,
                breakdown,
                0.0,
            ));
        }
    };

    // ── NORMALIZE ────────────────────────────────────────────────────────
    let products_dir = state
        .config
        .resolve_data_dir()
        .join(state.config.resolve_tenant())
        .join("products");
    let normalizer = Normalizer::new(products_dir);
    let normalized = normalizer.normalize(vec![product], Some(&requested))?;

    // ── SYNTHESIZE ───────────────────────────────────────────────────────
    let payload = synthesize::fact_payload(&normalized);
    let synthesizer = Synthesizer::new(state.llm.as_ref());
    let content = synthesizer
        .synthesize(&payload, &normalized.mpn, &normalized.manufacturer)
        .await?;
    let sc = content.confidence;
    breakdown.synthesis = sc;

    // ── FINAL BLEND ──────────────────────────────────────────────────────
    let confidence = blend(dc, cc, ec, sc);
    let usable = confidence >= USABLE_THRESHOLD;

    let product_type = derive_product_type(&normalized, &content);
    let spec_table = spec_table_from_features(&content.key_features);

    let mut result = FinalResult {
        mpn: requested.clone(),
        manufacturer: normalized.manufacturer.clone(),
        content,
        confidence_breakdown: breakdown,
        product_type,
        usable,
        confidence,
        images: normalized.images.clone(),
        datasheets: normalized.datasheets.clone(),
        source_url: normalized.source_urls.first().cloned(),
        spec_table,
        failure_reason: None,
        generated_at: chrono::Utc::now().to_rfc3339(),
    };

    if variant_ra && result.usable {
        apply_ra_patch(&mut result, &requested);
    }

    info!(
        "{}: confidence {:.3} (d {:.2} c {:.2} e {:.2} s {:.2}) usable={}",
        requested, result.confidence, dc, cc, ec, sc, result.usable
    );
    Ok(result)
}

/// `0.25·dc + 0.20·cc + 0.30·ec + 0.25·sc`.
pub fn blend(dc: f64, cc: f64, ec: f64, sc: f64) -> f64 {
    let parts = [dc, cc, ec, sc];
    parts
        .iter()
        .zip(BLEND_WEIGHTS.iter())
        .map(|(value, weight)| value * weight)
        .sum()
}

/// Key features split on the first colon.
pub fn spec_table_from_features(key_features: &[String]) -> Vec<SpecTableRow> {
    key_features
        .iter()
        .filter_map(|feature| {
            let (label, value) = feature.split_once(':')?;
            Some(SpecTableRow {
                label: label.trim().to_string(),
                value: value.trim().to_string(),
            })
        })
        .collect()
}

fn derive_product_type(
    normalized: &crate::core::types::NormalizedProduct,
    content: &SynthesisOutput,
) -> Option<String> {
    if let Some(spec) = normalized.specs.get("Product Type") {
        return Some(spec.value.clone());
    }
    let haystack = format!(
        "{} {}",
        normalized.canonical_title.to_ascii_lowercase(),
        content.overview.to_ascii_lowercase()
    );
    if haystack.contains("surge protect") {
        return Some("Surge Protection Device".to_string());
    }
    None
}

/// Wrap a parsed datasheet PDF as an extraction source.
fn product_from_datasheet(
    extraction: &DatasheetExtraction,
    mpn: &str,
    manufacturer: &str,
    pdf_url: &str,
) -> ExtractedProduct {
    let mut product = ExtractedProduct::new(mpn, manufacturer, pdf_url, SourceType::Pdf);
    product.confidence = PDF_SOURCE_CONFIDENCE;

    for spec in &extraction.specs {
        if spec.model == mpn {
            product
                .specs
                .entry(spec.key.clone())
                .or_insert_with(|| spec.value.clone());
        }
    }

    if !extraction.overview_text.is_empty() {
        product.verbatim_sections.push(VerbatimSection {
            heading: Some("Overview".to_string()),
            text: extraction.overview_text.clone(),
            source: Some(pdf_url.to_string()),
        });
    }
    for feature in &extraction.features {
        product.verbatim_sections.push(VerbatimSection {
            heading: Some("Key Feature".to_string()),
            text: feature.clone(),
            source: Some(pdf_url.to_string()),
        });
    }

    product.datasheets.push(crate::core::types::DatasheetLink {
        url: pdf_url.to_string(),
        label: "Datasheet".to_string(),
    });
    product
}

/// Post-synthesis patch for the Remote-Alarm variant.
fn apply_ra_patch(result: &mut FinalResult, requested_mpn: &str) {
    result.content.display_title = requested_mpn.to_string();

    let feature = "Remote Alarm: Yes".to_string();
    if !result.content.key_features.contains(&feature) {
        result.content.key_features.push(feature);
    }
    let row = SpecTableRow {
        label: "Remote Alarm".to_string(),
        value: "Yes".to_string(),
    };
    if !result.spec_table.contains(&row) {
        result.spec_table.push(row);
    }

    for text in [
        &mut result.content.overview,
        &mut result.content.short_description,
        &mut result.content.long_description,
    ] {
        if !text.contains(RA_SENTENCE) {
            if !text.is_empty() && !text.ends_with(' ') {
                text.push(' ');
            }
            text.push_str(RA_SENTENCE);
        }
    }
}
