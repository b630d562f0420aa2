use thiserror::Error;

/// Errors that propagate out of the pipeline rather than degrading into a
/// non-usable result. Stage-level weakness (no URLs, failed crawls, low
/// extraction quality) is reported through `FinalResult.failure_reason`
/// instead; see the pipeline driver.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("search backend request failed: {0}")]
    Search(String),

    #[error("LLM request failed: {0}")]
    LlmHttp(String),

    #[error("LLM returned unparseable JSON: {0}")]
    LlmJson(String),

    #[error("datasheet download failed for {url}: {reason}")]
    PdfDownload { url: String, reason: String },

    #[error("datasheet text extraction failed: {0}")]
    PdfText(String),

    #[error("datasheet parse produced only {rows} spec rows (need {min})")]
    PdfRowUnderflow { rows: usize, min: usize },

    #[error("normalizer received no extraction sources")]
    EmptyNormalizerInput,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
