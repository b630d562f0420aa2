//! Per-model column mapping. The raw spec rows keep every model's column
//! fused in one string; an LLM with a strict JSON contract extracts only the
//! target model's column, normalizes spec names and preserves units.

use serde_json::Value;

use crate::core::types::{ModelSpec, RawSpecRow};
use crate::core::EnrichError;
use crate::llm::StructuredGenerator;

const SOURCE_TAG: &str = "datasheet_pdf";

pub fn build_prompt(target: &str, models: &[String], rows: &[RawSpecRow]) -> String {
    let model_list = models.join(", ");
    let row_lines: String = rows
        .iter()
        .map(|r| format!("{}: {}\n", r.key, r.raw))
        .collect();

    format!(
        "You are mapping a surge-protection datasheet spec table.\n\
         The table covers these models, in column order: {model_list}\n\
         Each row below is `label: <all model columns fused left to right>`.\n\n\
         {row_lines}\n\
         Extract ONLY the column for model {target}.\n\
         Rules:\n\
         - Normalize spec names to clean, human-readable labels.\n\
         - Preserve units exactly as printed (kA, VRMS, Hz, lb, AWG, ...).\n\
         - Use null when the cell is N/A or absent for this model.\n\
         - Never invent a value that is not present in the row text.\n\n\
         Respond with exactly one JSON object, no prose:\n\
         {{\"model\": \"{target}\", \"specs\": {{\"<label>\": \"<value>\"|null, ...}}}}"
    )
}

/// Turn the LLM's `{model, specs}` object into mapped specs, skipping nulls.
pub fn parse_mapping(value: &Value, target: &str) -> Vec<ModelSpec> {
    let Some(specs) = value.get("specs").and_then(Value::as_object) else {
        return Vec::new();
    };

    specs
        .iter()
        .filter_map(|(key, v)| {
            let value = v.as_str()?.trim();
            if value.is_empty() {
                return None;
            }
            Some(ModelSpec {
                model: target.to_string(),
                key: key.trim().to_string(),
                value: value.to_string(),
                source: SOURCE_TAG.to_string(),
            })
        })
        .collect()
}

pub async fn map_model_specs(
    llm: &dyn StructuredGenerator,
    target: &str,
    models: &[String],
    rows: &[RawSpecRow],
) -> Result<Vec<ModelSpec>, EnrichError> {
    let prompt = build_prompt(target, models, rows);
    let value = llm.generate_structured(&prompt).await?;
    Ok(parse_mapping(&value, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prompt_names_target_and_all_models() {
        let rows = vec![RawSpecRow {
            key: "Warranty".into(),
            raw: "10 Years 10 Years".into(),
        }];
        let models = vec!["M1-1120-3".to_string(), "M1-1480-3".to_string()];
        let prompt = build_prompt("M1-1480-3", &models, &rows);
        assert!(prompt.contains("M1-1120-3, M1-1480-3"));
        assert!(prompt.contains("Extract ONLY the column for model M1-1480-3"));
        assert!(prompt.contains("Warranty: 10 Years 10 Years"));
    }

    #[test]
    fn parse_skips_nulls_and_preserves_units() {
        let value = json!({
            "model": "M1-1480-3",
            "specs": {
                "Nominal AC Line Voltage (VRMS)": "480Y/277",
                "Surge Current Capacity (Per Phase)": "160 kA",
                "Remote Alarm Contacts": null
            }
        });
        let specs = parse_mapping(&value, "M1-1480-3");
        assert_eq!(specs.len(), 2);
        assert!(specs.iter().all(|s| s.model == "M1-1480-3"));
        assert!(specs
            .iter()
            .any(|s| s.key == "Surge Current Capacity (Per Phase)" && s.value == "160 kA"));
    }

    #[test]
    fn parse_tolerates_missing_specs_object() {
        assert!(parse_mapping(&json!({"model": "x"}), "x").is_empty());
    }
}
