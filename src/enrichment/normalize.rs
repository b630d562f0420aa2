//! Normalizer: merge evidence from multiple sources under
//! confidence-weighted precedence with alias-based key canonicalization,
//! cached-datasheet injection and the Remote-Alarm variant overlay.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::core::types::{
    DatasheetLink, ExtractedProduct, NormalizedProduct, SourceType, SpecValue, VerbatimSection,
};
use crate::core::EnrichError;

use super::aliases;

/// Confidence assigned to a locally cached datasheet JSON.
const DATASHEET_CONFIDENCE: f64 = 0.95;

/// Confidence and source tag for variant-overlay entries.
const VARIANT_CONFIDENCE: f64 = 0.95;
const VARIANT_SOURCE: &str = "variant:RA";
const VARIANT_SECTION_TEXT: &str = "Includes remote alarm for system monitoring.";

/// The nested spec groups flattened out of a raw datasheet JSON.
const DATASHEET_GROUPS: &[&str] = &["electrical_specs", "mechanical_specs", "safety_and_compliance"];

pub struct Normalizer {
    products_dir: PathBuf,
}

impl Normalizer {
    /// `products_dir` is the per-tenant datasheet-JSON cache,
    /// `data/<tenant>/products`.
    pub fn new(products_dir: PathBuf) -> Self {
        Self { products_dir }
    }

    /// Merge all sources into one `NormalizedProduct`.
    ///
    /// Deterministic and idempotent over its input list: the same sources
    /// always produce the same merged view.
    pub fn normalize(
        &self,
        mut sources: Vec<ExtractedProduct>,
        canonical_mpn: Option<&str>,
    ) -> Result<NormalizedProduct, EnrichError> {
        if sources.is_empty() {
            return Err(EnrichError::EmptyNormalizerInput);
        }

        let requested_mpn = canonical_mpn
            .map(str::to_string)
            .unwrap_or_else(|| sources[0].mpn.clone());
        let base_mpn = base_mpn(&requested_mpn);

        // Datasheet injection: a cached datasheet JSON outranks anything the
        // web said, so it goes first.
        let has_datasheet = sources.iter().any(|s| s.source_type == SourceType::Datasheet);
        if !has_datasheet {
            let manufacturer_hint = sources[0].manufacturer.clone();
            if let Some(injected) = self.load_cached_datasheet(&base_mpn, &manufacturer_hint) {
                sources.insert(0, injected);
            }
        }

        for source in &mut sources {
            if source.source_type == SourceType::Datasheet {
                preprocess_datasheet(source);
            }
        }

        let manufacturer = sources
            .iter()
            .map(|s| s.manufacturer.clone())
            .find(|m| !m.is_empty())
            .unwrap_or_default();

        // Spec merge under confidence precedence.
        let mut specs: BTreeMap<String, SpecValue> = BTreeMap::new();
        for source in &sources {
            for (key, value) in &source.specs {
                merge_spec(&mut specs, key, value, &source.source_url, source.confidence);
            }
        }

        let mut images = Vec::new();
        let mut datasheets: Vec<DatasheetLink> = Vec::new();
        let mut verbatim_sections = Vec::new();
        let mut source_urls = Vec::new();
        for source in &sources {
            if !source_urls.contains(&source.source_url) {
                source_urls.push(source.source_url.clone());
            }
            for image in &source.images {
                if !images.contains(image) {
                    images.push(image.clone());
                }
            }
            for sheet in &source.datasheets {
                if !datasheets.iter().any(|d| d.url == sheet.url) {
                    datasheets.push(sheet.clone());
                }
            }
            for section in &source.verbatim_sections {
                let mut section = section.clone();
                if section.source.is_none() {
                    section.source = Some(source.source_url.clone());
                }
                if !verbatim_sections.contains(&section) {
                    verbatim_sections.push(section);
                }
            }
        }

        let overall_confidence =
            sources.iter().map(|s| s.confidence).sum::<f64>() / sources.len() as f64;

        let canonical_title = resolve_title(&sources, &manufacturer, &requested_mpn);
        let display_title = sources.iter().find_map(|s| s.display_title.clone());

        let mut normalized = NormalizedProduct {
            mpn: requested_mpn.clone(),
            manufacturer,
            canonical_title,
            display_title,
            specs,
            verbatim_sections,
            images,
            datasheets,
            source_urls,
            overall_confidence,
        };

        if is_remote_alarm_variant(&requested_mpn) {
            apply_ra_overlay(&mut normalized);
        }

        Ok(normalized)
    }

    fn load_cached_datasheet(&self, base_mpn: &str, manufacturer: &str) -> Option<ExtractedProduct> {
        let path = self.products_dir.join(format!("{base_mpn}.json"));
        let contents = std::fs::read_to_string(&path).ok()?;
        let raw: Value = match serde_json::from_str(&contents) {
            Ok(v) => v,
            Err(e) => {
                warn!("cached datasheet at {} is not JSON: {}", path.display(), e);
                return None;
            }
        };

        info!("injecting cached datasheet for {} from {}", base_mpn, path.display());
        let mut product = ExtractedProduct::new(
            base_mpn,
            manufacturer,
            &path.display().to_string(),
            SourceType::Datasheet,
        );
        product.confidence = DATASHEET_CONFIDENCE;
        product.raw_datasheet = Some(raw);
        Some(product)
    }
}

/// An MPN ending in the token `RA` denotes the Remote-Alarm variant.
pub fn is_remote_alarm_variant(mpn: &str) -> bool {
    mpn.len() > 2 && mpn.ends_with("RA")
}

/// The base part an RA variant is built from.
pub fn base_mpn(mpn: &str) -> String {
    if is_remote_alarm_variant(mpn) {
        mpn[..mpn.len() - 2].to_string()
    } else {
        mpn.to_string()
    }
}

/// Insert-or-replace under strict confidence precedence; contributing
/// sources always union.
fn merge_spec(
    specs: &mut BTreeMap<String, SpecValue>,
    key: &str,
    value: &str,
    source_url: &str,
    confidence: f64,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    let canonical = aliases::canonicalize(key);

    match specs.get_mut(&canonical) {
        None => {
            specs.insert(
                canonical,
                SpecValue {
                    value: value.to_string(),
                    sources: vec![source_url.to_string()],
                    confidence,
                },
            );
        }
        Some(entry) => {
            if confidence > entry.confidence {
                entry.value = value.to_string();
                entry.confidence = confidence;
            }
            if !entry.sources.iter().any(|s| s == source_url) {
                entry.sources.push(source_url.to_string());
            }
        }
    }
}

/// Prefer an OEM-source canonical title, else the first source that has one,
/// else `"<manufacturer> <mpn>"`.
fn resolve_title(sources: &[ExtractedProduct], manufacturer: &str, mpn: &str) -> String {
    sources
        .iter()
        .filter(|s| s.source_type == SourceType::Oem)
        .find_map(|s| s.canonical_title.clone())
        .or_else(|| sources.iter().find_map(|s| s.canonical_title.clone()))
        .unwrap_or_else(|| {
            if manufacturer.is_empty() {
                mpn.to_string()
            } else {
                format!("{manufacturer} {mpn}")
            }
        })
}

/// Patch the merged view for the RA variant. Idempotent: a second
/// application changes nothing.
fn apply_ra_overlay(normalized: &mut NormalizedProduct) {
    merge_spec(
        &mut normalized.specs,
        "Remote Alarm",
        "Yes",
        VARIANT_SOURCE,
        VARIANT_CONFIDENCE,
    );

    let section = VerbatimSection {
        heading: Some("Variant".to_string()),
        text: VARIANT_SECTION_TEXT.to_string(),
        source: Some(VARIANT_SOURCE.to_string()),
    };
    if !normalized.verbatim_sections.contains(&section) {
        normalized.verbatim_sections.push(section);
    }
}

// ---------------------------------------------------------------------------
// Datasheet JSON preprocessing
// ---------------------------------------------------------------------------

/// Flatten the raw datasheet JSON into the product's specs map and verbatim
/// sections. Keys drop a trailing `_raw`, underscores become spaces, words
/// title-case; the alias map later restores domain spellings.
pub fn preprocess_datasheet(product: &mut ExtractedProduct) {
    let Some(raw) = product.raw_datasheet.clone() else {
        return;
    };

    for group in DATASHEET_GROUPS {
        let Some(entries) = raw.get(group).and_then(Value::as_object) else {
            continue;
        };
        for (key, value) in entries {
            let Some(rendered) = render_spec_value(value) else {
                continue;
            };
            let pretty = prettify_key(key);
            product.specs.entry(pretty).or_insert(rendered);
        }
    }

    push_text_section(product, &raw, "overview", "Overview");
    push_text_section(product, &raw, "system_description", "System Description");
    for bullet in extract_bullets(raw.get("key_features")) {
        let section = VerbatimSection {
            heading: Some("Key Feature".to_string()),
            text: bullet,
            source: Some(product.source_url.clone()),
        };
        if !product.verbatim_sections.contains(&section) {
            product.verbatim_sections.push(section);
        }
    }
}

fn render_spec_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "Yes" } else { "No" }.to_string()),
        _ => None,
    }
}

fn prettify_key(key: &str) -> String {
    let stripped = key.strip_suffix("_raw").unwrap_or(key);
    stripped
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tolerates both the legacy flat shape (`"overview": "text"`) and the
/// nested shape (`"overview": {"text": ...}` / `{"raw": ...}`).
fn push_text_section(product: &mut ExtractedProduct, raw: &Value, field: &str, heading: &str) {
    let text = match raw.get(field) {
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(Value::Object(map)) => map
            .get("text")
            .or_else(|| map.get("raw"))
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string()),
        _ => None,
    };
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return;
    };

    let section = VerbatimSection {
        heading: Some(heading.to_string()),
        text,
        source: Some(product.source_url.clone()),
    };
    if !product.verbatim_sections.contains(&section) {
        product.verbatim_sections.push(section);
    }
}

/// Bullet lists appear as a bare array in the legacy shape, or nested under
/// one of several field names.
fn extract_bullets(value: Option<&Value>) -> Vec<String> {
    let collect = |items: &[Value]| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    };

    match value {
        Some(Value::Array(items)) => collect(items),
        Some(Value::Object(map)) => ["raw_bullets", "bullets", "items", "raw"]
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_array))
            .map(|items| collect(items))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(
        url: &str,
        source_type: SourceType,
        confidence: f64,
        specs: &[(&str, &str)],
    ) -> ExtractedProduct {
        let mut product = ExtractedProduct::new("M1-1120-3", "SurgePure", url, source_type);
        product.confidence = confidence;
        for (k, v) in specs {
            product.specs.insert((*k).to_string(), (*v).to_string());
        }
        product
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(PathBuf::from("/nonexistent/products"))
    }

    #[test]
    fn empty_input_errors() {
        assert!(matches!(
            normalizer().normalize(Vec::new(), None),
            Err(EnrichError::EmptyNormalizerInput)
        ));
    }

    #[test]
    fn higher_confidence_wins_and_sources_union() {
        let a = source(
            "https://oem.example.com/p",
            SourceType::Oem,
            0.9,
            &[("System Voltage", "120/240 V")],
        );
        let b = source(
            "https://dist.example.com/p",
            SourceType::Distributor,
            0.5,
            &[("Voltage", "999 V")],
        );
        let merged = normalizer().normalize(vec![a, b], None).unwrap();
        let spec = &merged.specs["Nominal AC Line Voltage (VRMS)"];
        assert_eq!(spec.value, "120/240 V");
        assert_eq!(spec.confidence, 0.9);
        assert_eq!(spec.sources.len(), 2);
    }

    #[test]
    fn merged_confidence_is_max_of_contributors() {
        let a = source("u1", SourceType::Unknown, 0.4, &[("Warranty", "5 years")]);
        let b = source("u2", SourceType::Unknown, 0.7, &[("Warranty", "10 years")]);
        let c = source("u3", SourceType::Unknown, 0.6, &[("Warranty", "7 years")]);
        let merged = normalizer().normalize(vec![a, b, c], None).unwrap();
        let spec = &merged.specs["Warranty"];
        assert_eq!(spec.value, "10 years");
        assert_eq!(spec.confidence, 0.7);
        assert_eq!(spec.sources.len(), 3);
    }

    #[test]
    fn normalize_is_idempotent_over_same_input() {
        let build = || {
            vec![
                source("u1", SourceType::Oem, 0.8, &[("Voltage", "120/240 V"), ("Phase", "Single Phase")]),
                source("u2", SourceType::Unknown, 0.5, &[("Warranty", "10 years")]),
            ]
        };
        let first = normalizer().normalize(build(), None).unwrap();
        let second = normalizer().normalize(build(), None).unwrap();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn overall_confidence_is_mean() {
        let a = source("u1", SourceType::Oem, 0.8, &[("Voltage", "120 V")]);
        let b = source("u2", SourceType::Unknown, 0.4, &[("Phase", "Single Phase")]);
        let merged = normalizer().normalize(vec![a, b], None).unwrap();
        assert!((merged.overall_confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn ra_overlay_injects_remote_alarm_once() {
        let a = source("u1", SourceType::Oem, 0.8, &[("Voltage", "120 V")]);
        let merged = normalizer()
            .normalize(vec![a.clone()], Some("M1-1120-3RA"))
            .unwrap();
        let alarm = &merged.specs["Remote Alarm"];
        assert_eq!(alarm.value, "Yes");
        assert_eq!(alarm.sources, vec![VARIANT_SOURCE.to_string()]);
        assert!(merged
            .verbatim_sections
            .iter()
            .any(|s| s.heading.as_deref() == Some("Variant")));

        // Applying the overlay again changes nothing.
        let mut twice = merged.clone();
        apply_ra_overlay(&mut twice);
        assert_eq!(
            serde_json::to_value(&merged).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }

    #[test]
    fn datasheet_json_flattens_groups_and_sections() {
        let mut product =
            ExtractedProduct::new("M1-1120-3", "SurgePure", "cache.json", SourceType::Datasheet);
        product.confidence = 0.95;
        product.raw_datasheet = Some(json!({
            "electrical_specs": {
                "nominal_ac_line_voltage_vrms_raw": "120/240",
                "frequency_range": "50/60 Hz"
            },
            "mechanical_specs": {"weight": "12 lb"},
            "safety_and_compliance": {"ul_listed": true},
            "overview": {"text": "Whole-facility SPD for single phase services."},
            "key_features": {"raw_bullets": ["Type 1 SPD", "Thermally protected MOVs"]}
        }));

        preprocess_datasheet(&mut product);
        assert_eq!(
            product.specs.get("Nominal Ac Line Voltage Vrms").map(String::as_str),
            Some("120/240")
        );
        assert_eq!(product.specs.get("Ul Listed").map(String::as_str), Some("Yes"));
        assert_eq!(
            product
                .verbatim_sections
                .iter()
                .filter(|s| s.heading.as_deref() == Some("Key Feature"))
                .count(),
            2
        );

        // The alias map lands the flattened key on its canonical spelling.
        let merged = normalizer().normalize(vec![product], None).unwrap();
        assert!(merged.specs.contains_key("Nominal AC Line Voltage (VRMS)"));
    }

    #[test]
    fn legacy_flat_datasheet_shape_tolerated() {
        let mut product =
            ExtractedProduct::new("M1-1120-3", "SurgePure", "cache.json", SourceType::Datasheet);
        product.raw_datasheet = Some(json!({
            "overview": "Flat-shape overview text.",
            "key_features": ["One", "Two"]
        }));
        preprocess_datasheet(&mut product);
        assert!(product
            .verbatim_sections
            .iter()
            .any(|s| s.text == "Flat-shape overview text."));
        assert_eq!(
            product
                .verbatim_sections
                .iter()
                .filter(|s| s.heading.as_deref() == Some("Key Feature"))
                .count(),
            2
        );
    }

    #[test]
    fn oem_title_preferred() {
        let mut a = source("u1", SourceType::Distributor, 0.9, &[]);
        a.canonical_title = Some("Distributor Title M1-1120-3".to_string());
        let mut b = source("u2", SourceType::Oem, 0.5, &[]);
        b.canonical_title = Some("SurgePure M1-1120-3 SPD".to_string());
        let merged = normalizer().normalize(vec![a, b], None).unwrap();
        assert_eq!(merged.canonical_title, "SurgePure M1-1120-3 SPD");
    }

    #[test]
    fn base_mpn_strips_ra_token() {
        assert_eq!(base_mpn("M1-1120-3RA"), "M1-1120-3");
        assert_eq!(base_mpn("M1-1120-3"), "M1-1120-3");
        assert!(!is_remote_alarm_variant("RA"));
    }
}
