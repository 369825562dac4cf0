// Reranker module
// Cross-encoder relevance scoring for retrieved candidates, served over `/v1/rerank`

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::RagError;
use crate::config::RerankerConfig;

/// Scores `(query, candidate)` pairs jointly, returning one raw logit per candidate
pub trait CrossEncoder: Send + Sync {
    fn predict(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>>;
}

/// A candidate with its normalized relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// Position in the candidate list passed to [`Reranker::rerank`]
    pub index: usize,
    pub text: String,
    /// Relevance in `[0, 1]`
    pub score: f32,
}

/// Orders candidates by cross-encoder relevance
#[derive(Clone)]
pub struct Reranker {
    model: Arc<dyn CrossEncoder>,
}

impl std::fmt::Debug for Reranker {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reranker").finish_non_exhaustive()
    }
}

impl Reranker {
    #[inline]
    pub fn new(model: Arc<dyn CrossEncoder>) -> Self {
        Self { model }
    }

    /// Score every candidate against `query`, best first. Equal scores keep input order.
    #[inline]
    pub fn rerank(&self, query: &str, candidates: &[String]) -> crate::Result<Vec<ScoredCandidate>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let logits = self
            .model
            .predict(query, candidates)
            .map_err(|e| RagError::Upstream(format!("reranker failed: {:#}", e)))?;

        if logits.len() != candidates.len() {
            return Err(RagError::Upstream(format!(
                "reranker returned {} scores for {} candidates",
                logits.len(),
                candidates.len()
            )));
        }

        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .zip(logits)
            .enumerate()
            .map(|(index, (text, logit))| ScoredCandidate {
                index,
                text: text.clone(),
                score: sigmoid(logit),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(
            "Reranked {} candidates, top score {:.3}",
            scored.len(),
            scored.first().map_or(0.0, |c| c.score)
        );
        Ok(scored)
    }
}

/// Sigmoid normalization: maps raw logits to 0-1 range.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Inverse of [`sigmoid`], clamped so 0 and 1 stay finite
#[inline]
pub fn logit(p: f32) -> f32 {
    let p = p.clamp(1e-6, 1.0 - 1e-6);
    (p / (1.0 - p)).ln()
}

/// Cross-encoder served behind a `/v1/rerank` endpoint.
///
/// By default `relevance_score` is read as a raw logit, as llama.cpp and
/// text-embeddings-inference return it. Servers following the Cohere, Jina or
/// Infinity contract return probabilities instead; with
/// `scores_are_probabilities` set those are mapped back to logits so the
/// reranker's sigmoid restores the original score.
#[derive(Debug, Clone)]
pub struct HttpCrossEncoder {
    endpoint: Url,
    model: String,
    scores_are_probabilities: bool,
    agent: ureq::Agent,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResultRaw>,
}

#[derive(Deserialize)]
struct RerankResultRaw {
    index: usize,
    relevance_score: f32,
}

impl HttpCrossEncoder {
    #[inline]
    pub fn new(config: &RerankerConfig) -> Result<Self> {
        let base = Url::parse(config.base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid reranker URL: {}", config.base_url))?;
        let endpoint = Url::parse(&format!("{}/v1/rerank", base.as_str().trim_end_matches('/')))
            .context("Failed to build rerank URL")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            scores_are_probabilities: config.scores_are_probabilities,
            agent,
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl CrossEncoder for HttpCrossEncoder {
    fn predict(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>> {
        let request = RerankRequest {
            model: &self.model,
            query,
            documents: candidates,
            top_n: candidates.len(),
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize rerank request")?;

        debug!(
            "Scoring {} candidates with {} at {}",
            candidates.len(),
            self.model,
            self.endpoint
        );

        let response_text = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|error| match error {
                ureq::Error::StatusCode(status) => {
                    anyhow::anyhow!("Reranker returned HTTP {}", status)
                }
                other => anyhow::anyhow!("Failed to reach reranker endpoint: {}", other),
            })?;

        let body: RerankResponse =
            serde_json::from_str(&response_text).context("Failed to parse reranker response")?;

        let mut logits: Vec<Option<f32>> = vec![None; candidates.len()];
        for result in body.results {
            let slot = logits.get_mut(result.index).with_context(|| {
                format!(
                    "Reranker returned index {} for {} documents",
                    result.index,
                    candidates.len()
                )
            })?;
            *slot = Some(if self.scores_are_probabilities {
                logit(result.relevance_score)
            } else {
                result.relevance_score
            });
        }

        logits
            .into_iter()
            .enumerate()
            .map(|(index, logit)| {
                logit.with_context(|| format!("Reranker returned no score for document {}", index))
            })
            .collect()
    }
}
