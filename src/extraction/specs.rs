//! Spec extraction from tables and definition lists.

use scraper::{Html, Selector};
use std::collections::BTreeMap;

/// Values longer than this are prose, not specs.
const MAX_VALUE_LEN: usize = 180;

/// Tables with at least this many rows count as spec tables.
const MIN_TABLE_ROWS: usize = 3;

/// Two sources: (a) tables with ≥3 rows, first cell → key, second → value;
/// (b) definition lists, dt → key, next dd → value. Keys drop a trailing
/// colon; empty or over-long values are rejected. First-seen wins: the main
/// spec table appears before footer tables.
pub(super) fn extract_specs(document: &Html) -> BTreeMap<String, String> {
    let mut specs = BTreeMap::new();
    extract_table_specs(document, &mut specs);
    extract_definition_list_specs(document, &mut specs);
    specs
}

fn extract_table_specs(document: &Html, specs: &mut BTreeMap<String, String>) {
    let (Ok(table_sel), Ok(row_sel), Ok(cell_sel)) = (
        Selector::parse("table"),
        Selector::parse("tr"),
        Selector::parse("td, th"),
    ) else {
        return;
    };

    for table in document.select(&table_sel) {
        let rows: Vec<_> = table.select(&row_sel).collect();
        if rows.len() < MIN_TABLE_ROWS {
            continue;
        }
        for row in rows {
            let cells: Vec<String> = row
                .select(&cell_sel)
                .map(|c| c.text().collect::<String>())
                .collect();
            if cells.len() < 2 {
                continue;
            }
            insert_spec(specs, &cells[0], &cells[1]);
        }
    }
}

fn extract_definition_list_specs(document: &Html, specs: &mut BTreeMap<String, String>) {
    let (Ok(dl_sel), Ok(item_sel)) = (Selector::parse("dl"), Selector::parse("dt, dd")) else {
        return;
    };

    for dl in document.select(&dl_sel) {
        let mut pending_key: Option<String> = None;
        for item in dl.select(&item_sel) {
            let text = item.text().collect::<String>();
            match item.value().name() {
                "dt" => pending_key = Some(text),
                "dd" => {
                    if let Some(key) = pending_key.take() {
                        insert_spec(specs, &key, &text);
                    }
                }
                _ => {}
            }
        }
    }
}

fn insert_spec(specs: &mut BTreeMap<String, String>, key: &str, value: &str) {
    let key = key.trim().trim_end_matches(':').trim().to_string();
    let value = value.trim().to_string();
    if key.is_empty() || value.is_empty() || value.len() > MAX_VALUE_LEN {
        return;
    }
    specs.entry(key).or_insert(value);
}
