//! Discovery: turn (MPN, manufacturer) into a canonical product URL plus
//! backups and PDF references, with a relative confidence. Best-effort by
//! design: ranking ambiguity never throws, only a search-backend HTTP
//! failure does.

pub mod features;
pub mod serp;

use tracing::{debug, info};

use crate::core::types::{Confidence, DiscoveryOutcome, SearchCandidate};
use crate::core::EnrichError;
use serp::SerpClient;

/// Top score below this is not considered a usable ranking outcome.
/// Under mean-centering the logistic midpoint is the natural floor: a lone
/// candidate centers to exactly 0.5 and stays usable.
const MIN_USABLE_SCORE: f64 = 0.5;

/// Top-two separation thresholds for relative confidence. The idea is
/// separation, never absolute score.
const SEP_HIGH: f64 = 0.15;
const SEP_MEDIUM: f64 = 0.05;

const MAX_BACKUPS: usize = 3;
const MAX_PDFS: usize = 3;

pub struct Discovery<'a> {
    serp: &'a SerpClient,
}

impl<'a> Discovery<'a> {
    pub fn new(serp: &'a SerpClient) -> Self {
        Self { serp }
    }

    /// Primary discovery entry point.
    pub async fn discover(
        &self,
        mpn: &str,
        manufacturer: &str,
    ) -> Result<DiscoveryOutcome, EnrichError> {
        let query = format!("\"{mpn}\" \"{manufacturer}\"");
        let results = self.serp.search(&query).await?;
        let ranked = features::rank(&results, mpn, manufacturer);

        debug!(
            "discovery '{}': {} candidates, top score {:.3}",
            mpn,
            ranked.len(),
            ranked.first().map(|c| c.score).unwrap_or(0.0)
        );

        let usable = ranked
            .first()
            .map(|top| top.score >= MIN_USABLE_SCORE)
            .unwrap_or(false);

        if !usable {
            return self.pdf_fallback(mpn).await;
        }

        let confidence = separation_confidence(&ranked);

        let mut pdf_urls = Vec::new();
        let mut page_urls = Vec::new();
        for c in &ranked {
            if is_pdf_url(&c.url) {
                if pdf_urls.len() < MAX_PDFS {
                    pdf_urls.push(c.url.clone());
                }
            } else if page_urls.len() < 1 + MAX_BACKUPS {
                page_urls.push(c.url.clone());
            }
        }

        let mut iter = page_urls.into_iter();
        let primary = iter.next();
        let backups: Vec<String> = iter.take(MAX_BACKUPS).collect();

        if primary.is_none() && pdf_urls.is_empty() {
            return self.pdf_fallback(mpn).await;
        }

        info!(
            "discovery '{}': primary={:?} ({} backups, {} pdfs, {:?})",
            mpn,
            primary,
            backups.len(),
            pdf_urls.len(),
            confidence
        );

        Ok(DiscoveryOutcome {
            primary_product_url: primary,
            backup_urls: backups,
            pdf_urls,
            confidence,
        })
    }

    /// Second-chance query aimed straight at datasheet PDFs.
    async fn pdf_fallback(&self, mpn: &str) -> Result<DiscoveryOutcome, EnrichError> {
        let query = format!("\"{mpn}\" datasheet pdf");
        let results = self.serp.search(&query).await?;

        let pdf_urls: Vec<String> = results
            .iter()
            .filter(|r| is_pdf_url(&r.link))
            .map(|r| r.link.clone())
            .take(MAX_PDFS)
            .collect();

        let confidence = if pdf_urls.is_empty() {
            Confidence::Low
        } else {
            Confidence::Medium
        };

        info!(
            "discovery '{}' pdf fallback: {} pdfs ({:?})",
            mpn,
            pdf_urls.len(),
            confidence
        );

        Ok(DiscoveryOutcome {
            primary_product_url: None,
            backup_urls: Vec::new(),
            pdf_urls,
            confidence,
        })
    }
}

/// Relative confidence from top-two score separation.
pub fn separation_confidence(ranked: &[SearchCandidate]) -> Confidence {
    match ranked {
        [] => Confidence::Low,
        [_] => Confidence::High,
        [first, second, ..] => {
            let sep = first.score - second.score;
            if sep > SEP_HIGH {
                Confidence::High
            } else if sep > SEP_MEDIUM {
                Confidence::Medium
            } else {
                Confidence::Low
            }
        }
    }
}

pub fn is_pdf_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    let path_end = lower.split(['?', '#']).next().unwrap_or(&lower);
    path_end.ends_with(".pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(score: f64) -> SearchCandidate {
        SearchCandidate {
            url: "https://example.com".into(),
            title: String::new(),
            snippet: String::new(),
            features: [0.0; 6],
            score,
        }
    }

    #[test]
    fn single_candidate_is_high_confidence() {
        assert_eq!(separation_confidence(&[candidate(0.5)]), Confidence::High);
    }

    #[test]
    fn separation_thresholds() {
        assert_eq!(
            separation_confidence(&[candidate(0.8), candidate(0.6)]),
            Confidence::High
        );
        assert_eq!(
            separation_confidence(&[candidate(0.8), candidate(0.7)]),
            Confidence::Medium
        );
        assert_eq!(
            separation_confidence(&[candidate(0.8), candidate(0.78)]),
            Confidence::Low
        );
    }

    #[test]
    fn no_candidates_is_low() {
        assert_eq!(separation_confidence(&[]), Confidence::Low);
    }

    #[test]
    fn pdf_url_detection_ignores_query_strings() {
        assert!(is_pdf_url("https://x.com/ds/M1-1120-3.pdf"));
        assert!(is_pdf_url("https://x.com/ds/M1-1120-3.PDF?download=1"));
        assert!(!is_pdf_url("https://x.com/products/m1-1120-3"));
    }
}
