//! Promotion of signals from structured metadata: JSON-LD Product blocks,
//! embedded `BCData` storefront blobs, and a deterministic regex promoter
//! over description metadata. Promoters only ever fill absent keys.

use percent_encoding::percent_decode_str;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::llm::balanced_object;

#[derive(Default)]
pub(super) struct JsonLdProduct {
    pub description: Option<String>,
    pub brand: Option<String>,
}

/// Walk every `application/ld+json` script for a Product node. The brand is
/// surfaced alongside the description; `brand.name` is real evidence, not
/// noise.
pub(super) fn extract_json_ld_product(document: &Html) -> JsonLdProduct {
    let Ok(sel) = Selector::parse("script[type='application/ld+json']") else {
        return JsonLdProduct::default();
    };

    let mut out = JsonLdProduct::default();
    for script in document.select(&sel) {
        let json_text = script.inner_html();
        if json_text.trim().is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(&json_text) else {
            continue;
        };
        collect_product(&value, &mut out);
        if out.description.is_some() && out.brand.is_some() {
            break;
        }
    }
    out
}

fn collect_product(value: &Value, out: &mut JsonLdProduct) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_product(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(graph) = map.get("@graph") {
                collect_product(graph, out);
            }
            let is_product = map
                .get("@type")
                .and_then(Value::as_str)
                .map(|t| t.eq_ignore_ascii_case("product"))
                .unwrap_or(false);
            if !is_product {
                return;
            }
            if out.description.is_none() {
                if let Some(desc) = map.get("description").and_then(Value::as_str) {
                    let decoded = uri_decode(desc.trim());
                    if !decoded.is_empty() {
                        out.description = Some(decoded);
                    }
                }
            }
            if out.brand.is_none() {
                out.brand = brand_name(map.get("brand"));
            }
        }
        _ => {}
    }
}

fn brand_name(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(Value::Object(map)) => map
            .get("name")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

/// Some storefronts double-encode the JSON-LD description.
fn uri_decode(s: &str) -> String {
    if !s.contains('%') {
        return s.to_string();
    }
    percent_decode_str(s)
        .decode_utf8()
        .map(|decoded| decoded.to_string())
        .unwrap_or_else(|_| s.to_string())
}

// ---------------------------------------------------------------------------
// BCData storefront blobs
// ---------------------------------------------------------------------------

/// Promote `product_attributes.weight.formatted` → `Weight` and
/// `product_attributes.sku` → `SKU` from an inline `BCData` object, filling
/// absent keys only.
pub(super) fn promote_bcdata(html: &str, specs: &mut BTreeMap<String, String>) {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"\bBCData\s*=").unwrap_or_else(|_| unreachable!("static regex"))
    });

    let Some(found) = re.find(html) else {
        return;
    };
    let Some(object_text) = balanced_object(&html[found.end()..]) else {
        return;
    };
    let Ok(data) = serde_json::from_str::<Value>(object_text) else {
        return;
    };

    let attrs = &data["product_attributes"];
    if let Some(weight) = attrs["weight"]["formatted"].as_str() {
        let weight = weight.trim();
        if !weight.is_empty() {
            specs
                .entry("Weight".to_string())
                .or_insert_with(|| weight.to_string());
        }
    }
    if let Some(sku) = attrs["sku"].as_str() {
        let sku = sku.trim();
        if !sku.is_empty() {
            specs
                .entry("SKU".to_string())
                .or_insert_with(|| sku.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Description-metadata promoter
// ---------------------------------------------------------------------------

/// Deterministic regex promoter over meta/OG description text. Fills absent
/// keys only. The ampere-rating rule matches any 2–4 digit service size
/// rather than one hard-coded value.
pub(super) fn promote_description_specs(text: &str, specs: &mut BTreeMap<String, String>) {
    if text.trim().is_empty() {
        return;
    }
    let lower = text.to_ascii_lowercase();

    static VOLT_RE: OnceLock<Regex> = OnceLock::new();
    let volt_re = VOLT_RE.get_or_init(|| {
        Regex::new(r"\b120\s*/\s*240\s*V\b").unwrap_or_else(|_| unreachable!("static regex"))
    });
    if volt_re.is_match(text) {
        specs
            .entry("System Voltage".to_string())
            .or_insert_with(|| "120/240 V".to_string());
    }

    if lower.contains("single phase") || lower.contains("single-phase") || lower.contains("1-phase")
    {
        specs
            .entry("Phase".to_string())
            .or_insert_with(|| "Single Phase".to_string());
    }

    static AMP_RE: OnceLock<Regex> = OnceLock::new();
    let amp_re = AMP_RE.get_or_init(|| {
        Regex::new(r"\b(\d{2,4})\s*A\b").unwrap_or_else(|_| unreachable!("static regex"))
    });
    if let Some(caps) = amp_re.captures(text) {
        let amps = &caps[1];
        specs
            .entry("Max Service Size".to_string())
            .or_insert_with(|| format!("{amps} A"));
    }

    if lower.contains("downline") || lower.contains("sub-panel") {
        specs
            .entry("Application".to_string())
            .or_insert_with(|| "Downline / Sub-panel Protection".to_string());
    }

    if lower.contains("surge protection") {
        specs
            .entry("Product Type".to_string())
            .or_insert_with(|| "Surge Protection Device".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_ld_product_description_and_brand() {
        let doc = Html::parse_document(
            r#"<script type="application/ld+json">
            {"@type": "Product", "name": "M1-1120-3",
             "description": "Whole-facility%20surge%20protection",
             "brand": {"@type": "Brand", "name": "SurgePure"}}
            </script>"#,
        );
        let product = extract_json_ld_product(&doc);
        assert_eq!(
            product.description.as_deref(),
            Some("Whole-facility surge protection")
        );
        assert_eq!(product.brand.as_deref(), Some("SurgePure"));
    }

    #[test]
    fn json_ld_graph_wrapping_is_followed() {
        let doc = Html::parse_document(
            r#"<script type="application/ld+json">
            {"@graph": [{"@type": "WebSite"}, {"@type": "Product", "description": "SPD unit", "brand": "SurgePure"}]}
            </script>"#,
        );
        let product = extract_json_ld_product(&doc);
        assert_eq!(product.description.as_deref(), Some("SPD unit"));
    }

    #[test]
    fn bcdata_promotion_fills_absent_keys_only() {
        let html = r#"<script>var BCData = {"product_attributes":
            {"sku": "M1-1120-3", "weight": {"formatted": "12 lb"}}};</script>"#;
        let mut specs = BTreeMap::new();
        specs.insert("SKU".to_string(), "existing".to_string());
        promote_bcdata(html, &mut specs);
        assert_eq!(specs.get("SKU").map(String::as_str), Some("existing"));
        assert_eq!(specs.get("Weight").map(String::as_str), Some("12 lb"));
    }

    #[test]
    fn description_promoter_rules() {
        let mut specs = BTreeMap::new();
        promote_description_specs(
            "Surge protection for 120/240V single phase services up to 200 A, \
             ideal for downline panels.",
            &mut specs,
        );
        assert_eq!(
            specs.get("System Voltage").map(String::as_str),
            Some("120/240 V")
        );
        assert_eq!(specs.get("Phase").map(String::as_str), Some("Single Phase"));
        assert_eq!(
            specs.get("Max Service Size").map(String::as_str),
            Some("200 A")
        );
        assert_eq!(
            specs.get("Application").map(String::as_str),
            Some("Downline / Sub-panel Protection")
        );
        assert_eq!(
            specs.get("Product Type").map(String::as_str),
            Some("Surge Protection Device")
        );
    }

    #[test]
    fn description_promoter_generalizes_service_size() {
        let mut specs = BTreeMap::new();
        promote_description_specs("Protects services rated 400 A.", &mut specs);
        assert_eq!(
            specs.get("Max Service Size").map(String::as_str),
            Some("400 A")
        );
    }

    #[test]
    fn promoter_never_overwrites() {
        let mut specs = BTreeMap::new();
        specs.insert("Phase".to_string(), "Three Phase".to_string());
        promote_description_specs("single phase device", &mut specs);
        assert_eq!(specs.get("Phase").map(String::as_str), Some("Three Phase"));
    }
}
