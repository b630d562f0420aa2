//! Offline coverage of the datasheet parse path against a synthetic
//! multi-model spec table of the kind PDF-to-text conversion produces.

use partscout::datasheet::{self, mapping};
use partscout::types::RawSpecRow;

/// Twenty models in the header, fused tokens, sheared labels.
fn twenty_model_text() -> String {
    let mut text = String::new();
    text.push_str(
        "SurgePure M1 Series surge protection isolates downline equipment and panels \
         from damaging transients across the whole facility.\n",
    );
    text.push_str("Verify SCCR against the panel rating before installing this Type 1 SPD!\n");

    // Header: first model fused onto the label, the rest space-separated.
    text.push_str("Model NumberM1-1000-3");
    for i in 1..20 {
        text.push_str(&format!(" M1-{:04}-3", 1000 + i));
    }
    text.push('\n');

    let wide = |cell: &str| {
        std::iter::repeat(cell)
            .take(20)
            .collect::<Vec<_>>()
            .join(" ")
    };
    text.push_str(&format!("Nomi {}\n", wide("120/240")));
    text.push_str(&format!("MCOV {}\n", wide("150")));
    text.push_str(&format!("Freq {}\n", wide("50/60 Hz")));
    text.push_str(&format!("Protection Modes {}\n", wide("L-N")));
    text.push_str(&format!("Nominal Discharge Current (In) {}\n", wide("20 kA")));
    text.push_str(&format!("Short Circ {}\n", wide("200 kA")));
    text.push_str(&format!("Voltage Protection Rating (VPR) {}\n", wide("700 V")));
    text.push_str(&format!("Surge Curr {}\n", wide("120 kA")));
    text.push_str(&format!("Per Mode {}\n", wide("60 kA")));
    text.push_str(&format!("Response Tim {}\n", wide("<1 ns")));
    text.push_str(&format!("Operating Temp {}\n", wide("-40C")));
    text.push_str(&format!("Storage Temp {}\n", wide("-55C")));
    text.push_str(&format!("Relative Humid {}\n", wide("0-95%")));
    text.push_str(&format!("Encl osure Size {}\n", wide("10x8x6")));
    text.push_str(&format!("Enclosure Type (NEMA) {}\n", wide("Type 4X")));
    text.push_str(&format!("Wire Size {}\n", wide("10 AWG")));
    text.push_str(&format!("Status Indic {}\n", wide("Yes")));
    text.push_str(&format!("Remote Alarm {}\n", wide("Yes")));
    text.push_str(&format!("Weight {}\n", wide("12 lb")));
    text.push_str(&format!("Warr {}\n", wide("10 Years")));

    text.push_str("KEY FEATURES\n");
    text.push_str("• Type 1 SPD suitable for service entrance\n");
    text.push_str("and downline sub-panel locations\n");
    text.push_str("• Thermally protected MOV arrays\n");
    text.push_str("STANDARDS\n");
    text.push_str("UL 1449 5th Edition\n");
    text
}

#[test]
fn twenty_models_detected_and_rows_survive() {
    let parsed = datasheet::parse_text(&twenty_model_text()).unwrap();
    assert_eq!(parsed.detected_models.len(), 20);
    assert!(parsed.detected_models.contains(&"M1-1000-3".to_string()));
    assert!(parsed.detected_models.contains(&"M1-1019-3".to_string()));
    assert!(parsed.raw_rows.len() >= 18, "rows: {}", parsed.raw_rows.len());

    let keys: Vec<&str> = parsed.raw_rows.iter().map(|r| r.key.as_str()).collect();
    assert!(keys.contains(&"Nominal AC Line Voltage (VRMS)"));
    assert!(keys.contains(&"Short Circuit Current Rating (SCCR)"));
    assert!(keys.contains(&"Enclosure Size (HxWxD)"));

    assert!(parsed.overview_text.contains("isolates downline equipment"));
    assert_eq!(parsed.sidebar_bullets.len(), 1);
    assert_eq!(parsed.features.len(), 2);
}

#[test]
fn row_count_gate_is_exact() {
    // Strip rows down to seventeen: the parse must refuse.
    let mut text = String::from("Model Number M1-1120-3 M1-1240-3\n");
    for i in 0..17 {
        text.push_str(&format!("Generic Parameter {i} {i} kA {i} kA\n"));
    }
    assert!(datasheet::parse_text(&text).is_err());

    text.push_str("Generic Parameter 17 17 kA 17 kA\n");
    let parsed = datasheet::parse_text(&text).unwrap();
    assert_eq!(parsed.raw_rows.len(), 18);
}

#[test]
fn mapping_contract_extracts_single_column() {
    let rows = vec![
        RawSpecRow {
            key: "Nominal AC Line Voltage (VRMS)".to_string(),
            raw: "120/240 208Y/120 480Y/277".to_string(),
        },
        RawSpecRow {
            key: "Surge Current Capacity (Per Phase)".to_string(),
            raw: "120 kA 120 kA 160 kA".to_string(),
        },
    ];
    let models = vec![
        "M1-1120-3".to_string(),
        "M1-1240-3".to_string(),
        "M1-1480-3".to_string(),
    ];
    let prompt = mapping::build_prompt("M1-1480-3", &models, &rows);
    assert!(prompt.contains("column for model M1-1480-3"));
    assert!(prompt.contains("Preserve units"));

    // The wire contract the LLM must honor, applied to its response.
    let response = serde_json::json!({
        "model": "M1-1480-3",
        "specs": {
            "Nominal AC Line Voltage (VRMS)": "480Y/277",
            "Surge Current Capacity (Per Phase)": "160 kA"
        }
    });
    let specs = mapping::parse_mapping(&response, "M1-1480-3");
    assert_eq!(specs.len(), 2);
    assert!(specs.iter().all(|s| s.model == "M1-1480-3"));
    assert!(specs.iter().any(|s| s.value == "160 kA"), "units preserved");
}
