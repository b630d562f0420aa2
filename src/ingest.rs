//! Batch adapters around the pipeline: CSV ingest with tolerant column
//! matching, a serial log-and-continue batch runner, CSV export of enriched
//! rows, and the asset-cache manifest.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::types::FinalResult;
use crate::core::{AppState, EnrichError};
use crate::pipeline;

/// Header names accepted for the MPN column, in priority order.
const MPN_COLUMNS: &[&str] = &["mpn", "part number", "sku", "mfg part number"];

/// Header names accepted for the manufacturer column.
const MANUFACTURER_COLUMNS: &[&str] = &["manufacturer", "mfg", "brand"];

#[derive(Debug, Clone, PartialEq)]
pub struct PartRow {
    pub mpn: String,
    pub manufacturer: String,
}

/// Read a parts spreadsheet (CSV). Column matching is case-insensitive and
/// trimmed; the MPN falls back to the first column and the manufacturer to
/// the second. Rows with an empty MPN are dropped.
pub fn read_parts_csv(path: &Path) -> Result<Vec<PartRow>, EnrichError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| std::io::Error::other(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let mpn_idx = find_column(&headers, MPN_COLUMNS).unwrap_or(0);
    let mfg_idx = find_column(&headers, MANUFACTURER_COLUMNS).unwrap_or(1);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| std::io::Error::other(e.to_string()))?;
        let mpn = record.get(mpn_idx).unwrap_or("").trim().to_string();
        if mpn.is_empty() {
            continue;
        }
        let manufacturer = record.get(mfg_idx).unwrap_or("").trim().to_string();
        rows.push(PartRow { mpn, manufacturer });
    }

    info!("ingested {} part rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    for candidate in candidates {
        if let Some(idx) = headers.iter().position(|h| h == candidate) {
            return Some(idx);
        }
    }
    None
}

/// Run the pipeline serially over a batch. Per-MPN failures are logged and
/// never abort the batch; failed rows carry `None`. The first product image
/// of each usable result is cached alongside the PDFs.
pub async fn run_batch(
    state: &Arc<AppState>,
    rows: &[PartRow],
) -> Vec<(PartRow, Option<FinalResult>)> {
    let paths = AssetPaths::new(
        &state.config.resolve_data_dir(),
        &state.config.resolve_tenant(),
    );

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match pipeline::enrich_part(state, &row.mpn, &row.manufacturer).await {
            Ok(result) => {
                if result.usable {
                    if let Some(image_url) = result.images.first() {
                        let ext = image_ext_from_url(image_url);
                        let path = paths.image_path(&row.mpn, ext);
                        if let Err(e) = cache_image(&state.http_client, image_url, &path).await {
                            warn!("batch: image cache failed for {}: {}", row.mpn, e);
                        }
                    }
                }
                out.push((row.clone(), Some(result)));
            }
            Err(e) => {
                warn!("batch: {} failed: {}", row.mpn, e);
                out.push((row.clone(), None));
            }
        }
    }
    out
}

/// Download and cache a product image.
pub async fn cache_image(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
) -> Result<(), EnrichError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    std::fs::write(path, &bytes)?;
    Ok(())
}

/// File extension for the image cache, from the URL path.
pub fn image_ext_from_url(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or("").to_ascii_lowercase();
    for ext in ["png", "jpg", "jpeg", "webp", "gif"] {
        if path.ends_with(&format!(".{ext}")) {
            return match ext {
                "png" => "png",
                "jpeg" => "jpeg",
                "webp" => "webp",
                "gif" => "gif",
                _ => "jpg",
            };
        }
    }
    "jpg"
}

/// Export enriched rows as CSV with the catalog column set.
pub fn export_results_csv(
    path: &Path,
    results: &[(PartRow, Option<FinalResult>)],
) -> Result<(), EnrichError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| std::io::Error::other(e.to_string()))?;

    writer
        .write_record([
            "MPN",
            "Manufacturer",
            "Features",
            "Overview",
            "Technical Specs",
            "Description",
            "Image Link",
            "Datasheet Link",
        ])
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    for (row, result) in results {
        let Some(result) = result else {
            writer
                .write_record([row.mpn.as_str(), row.manufacturer.as_str(), "", "", "", "", "", ""])
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            continue;
        };

        let features = result.content.key_features.join("\n");
        let specs = result
            .spec_table
            .iter()
            .map(|r| format!("{}: {}", r.label, r.value))
            .collect::<Vec<_>>()
            .join("; ");
        let description = description_html(result);
        let image = result.images.first().map(String::as_str).unwrap_or("");
        let datasheet = result
            .datasheets
            .first()
            .map(|d| d.url.as_str())
            .unwrap_or("");

        writer
            .write_record([
                row.mpn.as_str(),
                row.manufacturer.as_str(),
                features.as_str(),
                result.content.overview.as_str(),
                specs.as_str(),
                description.as_str(),
                image,
                datasheet,
            ])
            .map_err(|e| std::io::Error::other(e.to_string()))?;
    }

    writer
        .flush()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    info!("exported {} rows to {}", results.len(), path.display());
    Ok(())
}

fn description_html(result: &FinalResult) -> String {
    let mut html = String::new();
    if !result.content.long_description.is_empty() {
        html.push_str(&format!("<p>{}</p>", result.content.long_description));
    } else if !result.content.short_description.is_empty() {
        html.push_str(&format!("<p>{}</p>", result.content.short_description));
    }
    if !result.content.bullet_highlights.is_empty() {
        html.push_str("<ul>");
        for bullet in &result.content.bullet_highlights {
            html.push_str(&format!("<li>{bullet}</li>"));
        }
        html.push_str("</ul>");
    }
    html
}

// ---------------------------------------------------------------------------
// Asset cache & manifest
// ---------------------------------------------------------------------------

/// One manifest entry per MPN, pointing at the cached assets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasheet_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// Cache layout under the data dir: `data/<tenant>/{pdfs,images,products}/`.
pub struct AssetPaths {
    tenant_dir: PathBuf,
}

impl AssetPaths {
    pub fn new(data_dir: &Path, tenant: &str) -> Self {
        Self {
            tenant_dir: data_dir.join(tenant),
        }
    }

    pub fn pdf_path(&self, mpn: &str) -> PathBuf {
        self.tenant_dir.join("pdfs").join(format!("{mpn}.pdf"))
    }

    pub fn image_path(&self, mpn: &str, ext: &str) -> PathBuf {
        self.tenant_dir.join("images").join(format!("{mpn}.{ext}"))
    }

    pub fn datasheet_json_path(&self, mpn: &str) -> PathBuf {
        self.tenant_dir.join("products").join(format!("{mpn}.json"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.tenant_dir.join("manifest.json")
    }
}

/// Build manifest entries from batch results.
pub fn build_manifest(
    results: &[(PartRow, Option<FinalResult>)],
    paths: &AssetPaths,
) -> BTreeMap<String, ManifestEntry> {
    let mut manifest = BTreeMap::new();
    for (row, result) in results {
        let Some(result) = result else { continue };
        let entry = ManifestEntry {
            datasheet_url: result.datasheets.first().map(|d| d.url.clone()),
            image_url: result.images.first().cloned(),
            pdf_path: {
                let p = paths.pdf_path(&row.mpn);
                p.exists().then(|| p.display().to_string())
            },
            image_path: result.images.first().and_then(|url| {
                let p = paths.image_path(&row.mpn, image_ext_from_url(url));
                p.exists().then(|| p.display().to_string())
            }),
        };
        manifest.insert(row.mpn.clone(), entry);
    }
    manifest
}

pub fn write_manifest(
    path: &Path,
    manifest: &BTreeMap<String, ManifestEntry>,
) -> Result<(), EnrichError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(manifest)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}
