//! Datasheet PDF extraction: download, repair column-fractured text, detect
//! model identifiers, reconstruct the raw spec-row table, then delegate
//! per-target-model mapping to an LLM with a strict JSON contract.

pub mod mapping;
pub mod models;
pub mod repair;
pub mod table;

use std::path::Path;
use tracing::{info, warn};

use crate::core::types::DatasheetExtraction;
use crate::core::EnrichError;
use crate::crawling::antibot;
use crate::llm::StructuredGenerator;

/// A parse that surfaces fewer raw rows than this failed.
pub const MIN_SPEC_ROWS: usize = 18;

pub struct DatasheetParser<'a> {
    client: &'a reqwest::Client,
    llm: &'a dyn StructuredGenerator,
}

impl<'a> DatasheetParser<'a> {
    pub fn new(client: &'a reqwest::Client, llm: &'a dyn StructuredGenerator) -> Self {
        Self { client, llm }
    }

    /// Download and parse one datasheet. `target_model` picks the spec
    /// column; when absent the first detected model is used. `cache_to`
    /// best-effort persists the raw PDF.
    pub async fn extract(
        &self,
        pdf_url: &str,
        target_model: Option<&str>,
        cache_to: Option<&Path>,
    ) -> Result<DatasheetExtraction, EnrichError> {
        let bytes = self.download(pdf_url).await?;

        if let Some(path) = cache_to {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = std::fs::write(path, &bytes) {
                warn!("datasheet cache write failed at {}: {}", path.display(), e);
            }
        }

        let raw_text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|e| EnrichError::PdfText(e.to_string()))?;

        let mut extraction = parse_text(&raw_text)?;

        let target = target_model
            .map(str::to_string)
            .or_else(|| extraction.detected_models.first().cloned());
        if let Some(target) = target {
            extraction.specs = mapping::map_model_specs(
                self.llm,
                &target,
                &extraction.detected_models,
                &extraction.raw_rows,
            )
            .await?;
        }

        info!(
            "datasheet {}: {} models, {} raw rows, {} mapped specs",
            pdf_url,
            extraction.detected_models.len(),
            extraction.raw_rows.len(),
            extraction.specs.len()
        );
        Ok(extraction)
    }

    /// Realistic browser headers; on HTTP 403 retry once with a permissive
    /// `Accept: */*`.
    async fn download(&self, pdf_url: &str) -> Result<Vec<u8>, EnrichError> {
        let first = self.request(pdf_url, false).await;
        match first {
            Ok(bytes) => Ok(bytes),
            Err(EnrichError::PdfDownload { reason, .. }) if reason.contains("403") => {
                info!("datasheet download got 403, retrying with Accept: */*");
                self.request(pdf_url, true).await
            }
            Err(e) => Err(e),
        }
    }

    async fn request(&self, pdf_url: &str, permissive: bool) -> Result<Vec<u8>, EnrichError> {
        let mut request = self
            .client
            .get(pdf_url)
            .header("User-Agent", antibot::random_user_agent());
        if permissive {
            request = request.header("Accept", "*/*");
        } else {
            for (name, value) in antibot::stealth_headers() {
                request = request.header(name, value);
            }
        }

        let response = request.send().await.map_err(|e| EnrichError::PdfDownload {
            url: pdf_url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::PdfDownload {
                url: pdf_url.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        let bytes = response.bytes().await.map_err(|e| EnrichError::PdfDownload {
            url: pdf_url.to_string(),
            reason: format!("body read failed: {e}"),
        })?;
        Ok(bytes.to_vec())
    }
}

/// Pure text-side parse: normalize, repair, detect models, assemble rows,
/// gate on the row count. Mapping is layered on afterwards.
pub fn parse_text(raw_text: &str) -> Result<DatasheetExtraction, EnrichError> {
    let normalized = repair::normalize_text(raw_text);
    let repaired = repair::repair_columns(&normalized);

    let detected_models = models::detect_models(&repaired);
    let assembled = table::assemble(&repaired);

    if assembled.raw_rows.len() < MIN_SPEC_ROWS {
        return Err(EnrichError::PdfRowUnderflow {
            rows: assembled.raw_rows.len(),
            min: MIN_SPEC_ROWS,
        });
    }

    Ok(DatasheetExtraction {
        detected_models,
        specs: Vec::new(),
        raw_rows: assembled.raw_rows,
        features: assembled.features,
        raw_text: repaired,
        overview_text: assembled.overview_text,
        sidebar_bullets: assembled.sidebar_bullets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_text(n: usize) -> String {
        let mut text = String::from("Model Number M1-1120-3 M1-1240-3\n");
        for i in 0..n {
            text.push_str(&format!("Test Parameter {i} {i}0 kA {i}0 kA\n"));
        }
        text
    }

    #[test]
    fn eighteen_rows_succeed() {
        let parsed = parse_text(&rows_text(18)).unwrap();
        assert_eq!(parsed.raw_rows.len(), 18);
        assert_eq!(parsed.detected_models, vec!["M1-1120-3", "M1-1240-3"]);
    }

    #[test]
    fn seventeen_rows_underflow() {
        let err = parse_text(&rows_text(17)).unwrap_err();
        match err {
            EnrichError::PdfRowUnderflow { rows, min } => {
                assert_eq!(rows, 17);
                assert_eq!(min, MIN_SPEC_ROWS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn fused_header_is_repaired_before_detection() {
        let mut text = String::from("Model NumberM1-1120-3 M1-1240-3\n");
        for i in 0..18 {
            text.push_str(&format!("Parameter Row {i} {i} kA {i} kA\n"));
        }
        let parsed = parse_text(&text).unwrap();
        assert!(parsed.detected_models.contains(&"M1-1120-3".to_string()));
        assert_eq!(parsed.raw_rows.len(), 18);
    }
}
