//! Synthesizer: hand a fact-only payload to the LLM and post-validate the
//! generated catalog content against those facts. The prompt forbids
//! invention; the validators enforce what the prompt asked for.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::types::{DatasheetLink, NormalizedProduct, SynthesisOutput};
use crate::core::EnrichError;
use crate::llm::StructuredGenerator;

/// Content confidence is capped here no matter how rich the evidence.
const CONFIDENCE_CAP: f64 = 0.85;

const SEO_MAX_LEN: usize = 160;

const MISSING_SPECS_DISCLAIMER: &str =
    "Some specifications were not provided and are listed as Not specified.";
const INSTALLATION_DISCLAIMER: &str =
    "Installation should follow local electrical codes and be performed by qualified personnel.";

/// What the LLM is allowed to see: values, URLs and verbatim descriptor
/// strings only; no confidences, no source attribution.
#[derive(Debug, Clone)]
pub struct FactPayload {
    pub specs: BTreeMap<String, String>,
    pub images: Vec<String>,
    pub datasheets: Vec<DatasheetLink>,
    pub descriptors: Vec<String>,
}

pub fn fact_payload(product: &NormalizedProduct) -> FactPayload {
    FactPayload {
        specs: product
            .specs
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect(),
        images: product.images.clone(),
        datasheets: product.datasheets.clone(),
        descriptors: product
            .verbatim_sections
            .iter()
            .map(|s| s.text.clone())
            .collect(),
    }
}

pub struct Synthesizer<'a> {
    llm: &'a dyn StructuredGenerator,
}

impl<'a> Synthesizer<'a> {
    pub fn new(llm: &'a dyn StructuredGenerator) -> Self {
        Self { llm }
    }

    /// Generate catalog content for one product. Throws only on malformed
    /// LLM JSON (or the HTTP failure underneath it).
    pub async fn synthesize(
        &self,
        payload: &FactPayload,
        mpn: &str,
        manufacturer: &str,
    ) -> Result<SynthesisOutput, EnrichError> {
        let prompt = build_prompt(payload, mpn, manufacturer);
        let value = self.llm.generate_structured(&prompt).await?;
        let mut output = output_from_value(value);
        post_validate(&mut output, payload, mpn, manufacturer);
        Ok(output)
    }
}

fn output_from_value(value: Value) -> SynthesisOutput {
    // Field-tolerant: absent fields default, unknown fields are ignored.
    serde_json::from_value(value).unwrap_or_default()
}

pub fn build_prompt(payload: &FactPayload, mpn: &str, manufacturer: &str) -> String {
    let spec_lines: String = payload
        .specs
        .iter()
        .map(|(k, v)| format!("- {k}: {v}\n"))
        .collect();
    let descriptor_lines: String = payload
        .descriptors
        .iter()
        .map(|d| format!("> {d}\n"))
        .collect();
    let datasheet_lines: String = payload
        .datasheets
        .iter()
        .map(|d| format!("- {} ({})\n", d.label, d.url))
        .collect();

    format!(
        "Write catalog content for the industrial electrical part {manufacturer} {mpn}.\n\n\
         SPECIFICATIONS (the only facts you may use):\n{spec_lines}\n\
         VERBATIM SOURCE DESCRIPTIONS:\n{descriptor_lines}\n\
         DATASHEETS:\n{datasheet_lines}\n\
         IMAGES: {image_count} available\n\n\
         STRICT RULES:\n\
         - Never invent facts, numeric values, certifications, or category terms \
           that are not present above.\n\
         - Every keyFeatures entry must be \"Label: Value\" where Label is exactly \
           one of the specification labels above.\n\
         - Multi-paragraph overview is welcome when the verbatim descriptions are rich; \
           otherwise keep it to one paragraph.\n\
         - seoDescription must be at most 160 characters.\n\n\
         Respond with exactly one JSON object, no prose:\n\
         {{\"canonical_title\": str, \"display_title\": str, \"key_features\": [str], \
         \"overview\": str, \"short_description\": str, \"long_description\": str, \
         \"bullet_highlights\": [str], \"seo_description\": str, \"disclaimers\": [str]}}",
        image_count = payload.images.len()
    )
}

/// Enforce the grounding contract on whatever came back.
pub fn post_validate(
    output: &mut SynthesisOutput,
    payload: &FactPayload,
    mpn: &str,
    manufacturer: &str,
) {
    let fallback = if manufacturer.is_empty() {
        mpn.to_string()
    } else {
        format!("{manufacturer} {mpn}")
    };

    // A canonical title carrying a TLD fragment is a scraped site name.
    let title_lower = output.canonical_title.to_ascii_lowercase();
    if output.canonical_title.trim().is_empty()
        || title_lower.contains(".com")
        || title_lower.contains(".net")
    {
        output.canonical_title = fallback.clone();
    }
    if output.display_title.trim().is_empty() {
        output.display_title = output.canonical_title.clone();
    }

    // Key-feature labels must exist in the input specs map.
    output.key_features.retain(|feature| {
        feature
            .split_once(':')
            .map(|(label, _)| payload.specs.contains_key(label.trim()))
            .unwrap_or(false)
    });

    // Fallback templates when generation came back thin.
    if output.overview.trim().is_empty() && output.key_features.len() >= 4 {
        output.overview = template_overview(&fallback, &output.key_features);
    }
    if output.short_description.trim().is_empty() {
        if let Some(first) = output.key_features.first() {
            output.short_description = format!("The {fallback} features {first}.");
        }
    }

    if output.seo_description.chars().count() > SEO_MAX_LEN {
        output.seo_description = output.seo_description.chars().take(SEO_MAX_LEN).collect();
    }

    let has_gaps = payload
        .specs
        .values()
        .any(|v| v.trim().is_empty() || v.trim().eq_ignore_ascii_case("not specified"));
    if has_gaps && !output.disclaimers.iter().any(|d| d == MISSING_SPECS_DISCLAIMER) {
        output.disclaimers.push(MISSING_SPECS_DISCLAIMER.to_string());
    }
    if !output.disclaimers.iter().any(|d| d == INSTALLATION_DISCLAIMER) {
        output.disclaimers.push(INSTALLATION_DISCLAIMER.to_string());
    }

    output.confidence = content_confidence(output, payload);
}

fn template_overview(title: &str, key_features: &[String]) -> String {
    let highlights = key_features
        .iter()
        .take(4)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "The {title} is an industrial electrical component specified with: {highlights}. \
         Refer to the specification table for the complete rating set."
    )
}

/// `min(0.85, referencedFeatures/totalSpecs + 0.1·hasImages + 0.1·hasDatasheets)`.
pub fn content_confidence(output: &SynthesisOutput, payload: &FactPayload) -> f64 {
    let total_specs = payload.specs.len();
    let referenced = output
        .key_features
        .iter()
        .filter(|feature| {
            feature
                .split_once(':')
                .map(|(label, _)| payload.specs.contains_key(label.trim()))
                .unwrap_or(false)
        })
        .count();

    let ratio = if total_specs == 0 {
        0.0
    } else {
        referenced as f64 / total_specs as f64
    };
    let image_bonus = if payload.images.is_empty() { 0.0 } else { 0.1 };
    let datasheet_bonus = if payload.datasheets.is_empty() { 0.0 } else { 0.1 };

    (ratio + image_bonus + datasheet_bonus).min(CONFIDENCE_CAP)
}
