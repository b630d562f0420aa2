//! Single structured-generation client shared by the datasheet mapper and the
//! synthesizer. Both callers hand over a prompt with a strict JSON contract;
//! the response text is recovered into a `serde_json::Value` by a tolerant
//! parser (fence stripping, balanced-brace scan, bare-word sanitize retry).

use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::core::EnrichError;

/// The one seam both LLM consumers (datasheet column mapping and catalog
/// synthesis) call through. Lets tests substitute canned responses.
#[async_trait::async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn generate_structured(&self, prompt: &str) -> Result<Value, EnrichError>;
}

pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        model: String,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url,
            model,
            api_key,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` and parse the candidate text as a JSON object.
    ///
    /// Generation runs at temperature 0 so repeated calls over the same facts
    /// are deterministic. HTTP failures and unparseable output both surface
    /// as errors; the caller decides whether to abandon the MPN or retry.
    pub async fn generate_structured(&self, prompt: &str) -> Result<Value, EnrichError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {"temperature": 0}
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EnrichError::LlmHttp(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichError::LlmHttp(format!("HTTP {status}")));
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| EnrichError::LlmHttp(format!("body read failed: {e}")))?;

        let text = envelope["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| EnrichError::LlmJson("response carried no candidate text".into()))?;

        debug!("LLM returned {} chars of candidate text", text.len());
        parse_llm_json(text)
    }
}

#[async_trait::async_trait]
impl StructuredGenerator for LlmClient {
    async fn generate_structured(&self, prompt: &str) -> Result<Value, EnrichError> {
        LlmClient::generate_structured(self, prompt).await
    }
}

// ---------------------------------------------------------------------------
// Tolerant JSON recovery
// ---------------------------------------------------------------------------

/// Recover the first complete JSON object from raw LLM output.
///
/// Strips a BOM and fenced code blocks, locates the object with a
/// balanced-brace scan (string- and escape-aware), and on a parse failure
/// quotes bare-word tokens inside arrays and retries once.
pub fn parse_llm_json(raw: &str) -> Result<Value, EnrichError> {
    let cleaned = strip_fences(raw.trim_start_matches('\u{feff}'));

    let candidate = balanced_object(&cleaned)
        .ok_or_else(|| EnrichError::LlmJson("no JSON object found in output".into()))?;

    match serde_json::from_str::<Value>(candidate) {
        Ok(v) => Ok(v),
        Err(first_err) => {
            warn!("LLM JSON parse failed ({first_err}); retrying after sanitize");
            let sanitized = sanitize_bare_words(candidate);
            serde_json::from_str::<Value>(&sanitized)
                .map_err(|e| EnrichError::LlmJson(e.to_string()))
        }
    }
}

/// Drop ```json ... ``` fencing if present, keeping the inner body.
fn strip_fences(s: &str) -> String {
    let trimmed = s.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let inner = trimmed.trim_start_matches("```");
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_prefix("JSON").unwrap_or(inner);
    inner.trim_end_matches("```").trim().to_string()
}

/// Locate the first complete `{ ... }` object, respecting strings and escapes.
pub(crate) fn balanced_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Quote bare-word tokens that models sometimes emit inside arrays,
/// e.g. `["UL 1449", CSA, "CE"]` → `["UL 1449", "CSA", "CE"]`.
/// JSON literals (`true`, `false`, `null`) and numbers are left alone.
fn sanitize_bare_words(s: &str) -> String {
    let re = Regex::new(r#"([\[,]\s*)([A-Za-z][A-Za-z0-9 _/().+-]*?)(\s*[,\]])"#)
        .unwrap_or_else(|_| unreachable!("static regex"));
    let mut out = s.to_string();
    // Repeated passes: adjacent bare words share delimiters, so one pass can
    // miss every other token.
    for _ in 0..4 {
        let replaced = re
            .replace_all(&out, |caps: &regex::Captures<'_>| {
                let word = caps[2].trim();
                if matches!(word, "true" | "false" | "null") {
                    caps[0].to_string()
                } else {
                    format!("{}\"{}\"{}", &caps[1], word, &caps[3])
                }
            })
            .to_string();
        if replaced == out {
            break;
        }
        out = replaced;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_object() {
        let v = parse_llm_json(r#"{"model": "M1-1120-3", "specs": {"Warranty": "10 years"}}"#)
            .unwrap();
        assert_eq!(v["model"], "M1-1120-3");
    }

    #[test]
    fn strips_code_fences_and_bom() {
        let raw = "\u{feff}```json\n{\"a\": 1}\n```";
        let v = parse_llm_json(raw).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn finds_object_inside_prose() {
        let raw = "Here is the mapping you asked for:\n{\"specs\": {\"k\": \"v\"}}\nDone.";
        let v = parse_llm_json(raw).unwrap();
        assert_eq!(v["specs"]["k"], "v");
    }

    #[test]
    fn balanced_scan_ignores_braces_in_strings() {
        let raw = r#"{"note": "use {curly} braces", "ok": true}"#;
        let v = parse_llm_json(raw).unwrap();
        assert_eq!(v["ok"], true);
    }

    #[test]
    fn sanitizes_bare_words_in_arrays() {
        let raw = r#"{"listings": [UL 1449, "CE", CSA]}"#;
        let v = parse_llm_json(raw).unwrap();
        let arr = v["listings"].as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr[0], "UL 1449");
        assert_eq!(arr[2], "CSA");
    }

    #[test]
    fn sanitize_leaves_json_literals_alone() {
        let raw = r#"{"flags": [true, false, null]}"#;
        let v = parse_llm_json(raw).unwrap();
        assert_eq!(v["flags"][0], true);
        assert_eq!(v["flags"][2], Value::Null);
    }

    #[test]
    fn rejects_non_json_output() {
        assert!(parse_llm_json("I could not produce a mapping.").is_err());
    }
}
