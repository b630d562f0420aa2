use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// PartscoutConfig — file-based config loader (partscout.json) with env-var
// fallback for every field.
// ---------------------------------------------------------------------------

/// Top-level config loaded from `partscout.json`.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct PartscoutConfig {
    /// Search-proxy endpoint. Never logged with its key.
    pub search_api_url: Option<String>,
    /// Search-proxy API key (`X-API-KEY`).
    pub search_api_key: Option<String>,
    /// LLM API key.
    pub llm_api_key: Option<String>,
    /// Model name override — e.g. `gemini-2.0-flash`.
    pub llm_model: Option<String>,
    /// LLM endpoint base.
    pub llm_base_url: Option<String>,
    /// Root of the on-disk cache (`data` by default).
    pub data_dir: Option<String>,
    /// Tenant segment inside the data dir.
    pub tenant: Option<String>,
}

impl PartscoutConfig {
    /// Search endpoint: JSON field → `SEARCH_API_URL` env var → serper-style default.
    pub fn resolve_search_url(&self) -> String {
        non_empty(self.search_api_url.as_deref())
            .map(str::to_string)
            .or_else(|| env_non_empty("SEARCH_API_URL"))
            .unwrap_or_else(|| "https://google.serper.dev/search".to_string())
    }

    /// Search key: JSON field → `SEARCH_API_KEY` env var → `None`.
    pub fn resolve_search_key(&self) -> Option<String> {
        non_empty(self.search_api_key.as_deref())
            .map(str::to_string)
            .or_else(|| env_non_empty("SEARCH_API_KEY"))
    }

    /// LLM key: JSON field → `LLM_API_KEY` env var → `None`.
    pub fn resolve_llm_key(&self) -> Option<String> {
        non_empty(self.llm_api_key.as_deref())
            .map(str::to_string)
            .or_else(|| env_non_empty("LLM_API_KEY"))
    }

    /// Model name: JSON field → `LLM_MODEL` env var → `gemini-2.0-flash`.
    pub fn resolve_llm_model(&self) -> String {
        non_empty(self.llm_model.as_deref())
            .map(str::to_string)
            .or_else(|| env_non_empty("LLM_MODEL"))
            .unwrap_or_else(|| "gemini-2.0-flash".to_string())
    }

    /// LLM base: JSON field → `LLM_BASE_URL` env var → Google generative-language API.
    pub fn resolve_llm_base(&self) -> String {
        non_empty(self.llm_base_url.as_deref())
            .map(str::to_string)
            .or_else(|| env_non_empty("LLM_BASE_URL"))
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string())
    }

    /// Data dir: JSON field → `DATA_DIR` env var → `data`.
    pub fn resolve_data_dir(&self) -> PathBuf {
        non_empty(self.data_dir.as_deref())
            .map(PathBuf::from)
            .or_else(|| env_non_empty("DATA_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// Tenant: JSON field → `PARTSCOUT_TENANT` env var → `default`.
    pub fn resolve_tenant(&self) -> String {
        non_empty(self.tenant.as_deref())
            .map(str::to_string)
            .or_else(|| env_non_empty("PARTSCOUT_TENANT"))
            .unwrap_or_else(|| "default".to_string())
    }
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Load `partscout.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `PARTSCOUT_CONFIG` env var path
/// 2. `./partscout.json` (process cwd)
/// 3. `../partscout.json` (repo root when running from a subdir)
///
/// Missing file → `PartscoutConfig::default()` (silent, env fallbacks apply).
/// Parse error → log a warning, return defaults.
pub fn load_config() -> PartscoutConfig {
    let mut candidates = vec![
        PathBuf::from("partscout.json"),
        PathBuf::from("../partscout.json"),
    ];
    if let Ok(env_path) = std::env::var("PARTSCOUT_CONFIG") {
        candidates.insert(0, PathBuf::from(env_path));
    }

    for path in &candidates {
        let Ok(contents) = std::fs::read_to_string(path) else {
            continue;
        };
        match serde_json::from_str::<PartscoutConfig>(&contents) {
            Ok(cfg) => {
                tracing::info!("partscout.json loaded from {}", path.display());
                return cfg;
            }
            Err(e) => {
                tracing::warn!(
                    "partscout.json parse error at {}: {} — using defaults",
                    path.display(),
                    e
                );
                return PartscoutConfig::default();
            }
        }
    }

    PartscoutConfig::default()
}

// ---------------------------------------------------------------------------

pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

/// Optional override for the Chromium-family browser executable.
///
/// Default behavior is auto-discovery (see `crawling::browser::find_chrome_executable()`).
/// Only returns a value when `CHROME_EXECUTABLE` points at an existing path.
pub fn chrome_executable_override() -> Option<String> {
    let p = std::env::var(ENV_CHROME_EXECUTABLE).ok()?;
    let p = p.trim();
    if p.is_empty() {
        return None;
    }
    if Path::new(p).exists() {
        Some(p.to_string())
    } else {
        None
    }
}
