use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Stage confidence & failure vocabulary
// ---------------------------------------------------------------------------

/// Relative confidence emitted by the discovery and crawl stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Map a discovery confidence onto the final blend scale.
    pub fn discovery_score(self) -> f64 {
        match self {
            Confidence::High => 0.9,
            Confidence::Medium => 0.6,
            Confidence::Low => 0.3,
        }
    }
}

/// Why the crawler fell back (or gave up) on a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    FetchFailed,
    InvalidHtml,
    NonProduct,
    CaptchaOrJs,
}

/// Pipeline-level failure taxonomy surfaced on non-usable results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    #[serde(rename = "NO_PRODUCT_URLS")]
    NoProductUrls,
    #[serde(rename = "CRAWL_FAILED")]
    CrawlFailed,
    #[serde(rename = "LOW_EXTRACTION_QUALITY")]
    LowExtractionQuality,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// One organic result from the search proxy, before ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerpResult {
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

/// A ranked discovery candidate. Transient; only the URL triad survives.
#[derive(Debug, Clone)]
pub struct SearchCandidate {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub features: [f64; 6],
    pub score: f64,
}

/// Output of the discovery stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryOutcome {
    pub primary_product_url: Option<String>,
    pub backup_urls: Vec<String>,
    pub pdf_urls: Vec<String>,
    pub confidence: Confidence,
}

// ---------------------------------------------------------------------------
// Crawl
// ---------------------------------------------------------------------------

/// Output of one fetch attempt. `html == None` implies `confidence == Low`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub final_url: String,
    pub html: Option<String>,
    pub used_headless_browser: bool,
    pub content_type: String,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

impl CrawlResult {
    pub fn failed(url: &str, reason: FallbackReason) -> Self {
        Self {
            final_url: url.to_string(),
            html: None,
            used_headless_browser: false,
            content_type: String::new(),
            confidence: Confidence::Low,
            fallback_reason: Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Where a piece of evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Oem,
    Distributor,
    Pdf,
    Datasheet,
    Unknown,
}

/// A verbatim text block captured from a source, kept for grounded synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerbatimSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Evidence about one product from one source.
///
/// Extractors never write a value they did not see; every non-empty spec
/// value is a non-empty trimmed string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedProduct {
    pub mpn: String,
    pub manufacturer: String,
    pub source_url: String,
    pub source_type: SourceType,
    /// Per-source confidence in [0, 1].
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_title: Option<String>,
    pub specs: BTreeMap<String, String>,
    #[serde(default)]
    pub verbatim_sections: Vec<VerbatimSection>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub datasheets: Vec<DatasheetLink>,
    /// Raw datasheet JSON blob, present only on `datasheet` sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_datasheet: Option<serde_json::Value>,
}

impl ExtractedProduct {
    pub fn new(mpn: &str, manufacturer: &str, source_url: &str, source_type: SourceType) -> Self {
        Self {
            mpn: mpn.to_string(),
            manufacturer: manufacturer.to_string(),
            source_url: source_url.to_string(),
            source_type,
            confidence: 0.0,
            canonical_title: None,
            display_title: None,
            specs: BTreeMap::new(),
            verbatim_sections: Vec::new(),
            images: Vec::new(),
            datasheets: Vec::new(),
            raw_datasheet: None,
        }
    }
}

/// A scored datasheet reference discovered on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasheetLink {
    pub url: String,
    pub label: String,
}

/// Why an extraction was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractFailure {
    NoHtml,
    Blocked,
    NonProduct,
    ParseError,
    LowQuality,
}

/// Discriminated output of the HTML extractor.
///
/// `low_quality` still carries whatever was found; the other failures carry
/// nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ExtractFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ExtractedProduct>,
    pub quality: f64,
}

impl ExtractResult {
    pub fn failed(reason: ExtractFailure) -> Self {
        Self {
            ok: false,
            reason: Some(reason),
            product: None,
            quality: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// One merged spec value with full provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecValue {
    pub value: String,
    pub sources: Vec<String>,
    pub confidence: f64,
}

/// The merged, alias-canonicalized view over all extraction sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedProduct {
    pub mpn: String,
    pub manufacturer: String,
    pub canonical_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_title: Option<String>,
    pub specs: BTreeMap<String, SpecValue>,
    pub verbatim_sections: Vec<VerbatimSection>,
    pub images: Vec<String>,
    pub datasheets: Vec<DatasheetLink>,
    pub source_urls: Vec<String>,
    /// Arithmetic mean of per-source confidences.
    pub overall_confidence: f64,
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// LLM-generated catalog content, post-validated against the input facts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisOutput {
    #[serde(default)]
    pub canonical_title: String,
    #[serde(default)]
    pub display_title: String,
    /// "Label: Value" strings whose labels all exist in the input specs map.
    #[serde(default)]
    pub key_features: Vec<String>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub long_description: String,
    #[serde(default)]
    pub bullet_highlights: Vec<String>,
    /// Hard-truncated to 160 characters.
    #[serde(default)]
    pub seo_description: String,
    #[serde(default)]
    pub disclaimers: Vec<String>,
    /// Content confidence in [0, 1].
    #[serde(rename = "_confidence", default)]
    pub confidence: f64,
}

// ---------------------------------------------------------------------------
// Final result
// ---------------------------------------------------------------------------

/// Per-stage confidence scores surfaced so a UI can explain weak outputs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub discovery: f64,
    pub crawl: f64,
    pub extraction: f64,
    pub synthesis: f64,
}

/// One row of the rendered spec table (key features split on first colon).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecTableRow {
    pub label: String,
    pub value: String,
}

/// The pipeline's return value for one MPN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResult {
    pub mpn: String,
    pub manufacturer: String,
    #[serde(flatten)]
    pub content: SynthesisOutput,
    pub confidence_breakdown: ConfidenceBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    pub usable: bool,
    /// Blended confidence; `usable ⇔ confidence >= 0.65`.
    pub confidence: f64,
    pub images: Vec<String>,
    pub datasheets: Vec<DatasheetLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub spec_table: Vec<SpecTableRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
    /// RFC 3339 timestamp of when the pipeline produced this result.
    pub generated_at: String,
}

impl FinalResult {
    /// A non-usable placeholder for a failed stage.
    pub fn failure(
        mpn: &str,
        manufacturer: &str,
        reason: FailureReason,
        breakdown: ConfidenceBreakdown,
        confidence: f64,
    ) -> Self {
        Self {
            mpn: mpn.to_string(),
            manufacturer: manufacturer.to_string(),
            content: SynthesisOutput::default(),
            confidence_breakdown: breakdown,
            product_type: None,
            usable: false,
            confidence,
            images: Vec::new(),
            datasheets: Vec::new(),
            source_url: None,
            spec_table: Vec::new(),
            failure_reason: Some(reason),
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// ---------------------------------------------------------------------------
// Datasheet (PDF) extraction
// ---------------------------------------------------------------------------

/// One raw row lifted from the PDF spec table before model-column mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSpecRow {
    pub key: String,
    /// Full right-hand-side column string, all models fused.
    pub raw: String,
}

/// One mapped spec for a specific model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model: String,
    pub key: String,
    pub value: String,
    pub source: String,
}

/// Everything parsed out of one datasheet PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasheetExtraction {
    pub detected_models: Vec<String>,
    pub specs: Vec<ModelSpec>,
    pub raw_rows: Vec<RawSpecRow>,
    pub features: Vec<String>,
    pub raw_text: String,
    pub overview_text: String,
    pub sidebar_bullets: Vec<String>,
}

// ---------------------------------------------------------------------------
// HTTP surface
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct EnrichRequest {
    pub mpn: String,
    pub manufacturer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
