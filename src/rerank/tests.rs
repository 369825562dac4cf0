use super::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Returns canned logits and counts calls
struct FixedLogits {
    logits: Vec<f32>,
    calls: AtomicUsize,
}

impl FixedLogits {
    fn new(logits: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            logits,
            calls: AtomicUsize::new(0),
        })
    }
}

impl CrossEncoder for FixedLogits {
    fn predict(&self, _query: &str, _candidates: &[String]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.logits.clone())
    }
}

fn docs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn reranker_config(server: &MockServer) -> RerankerConfig {
    RerankerConfig {
        base_url: server.uri(),
        model: "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string(),
        timeout_secs: 5,
        scores_are_probabilities: false,
    }
}

#[test]
fn sigmoid_zero() {
    assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
}

#[test]
fn sigmoid_extremes() {
    assert!(sigmoid(10.0) > 0.999);
    assert!(sigmoid(-10.0) < 0.001);
}

#[test]
fn sigmoid_known_value() {
    // sigmoid(1) ≈ 0.7310586
    assert!((sigmoid(1.0) - 0.731_058_6).abs() < 1e-5);
}

#[test]
fn sigmoid_symmetry() {
    let x = 2.5f32;
    assert!((sigmoid(x) + sigmoid(-x) - 1.0).abs() < 1e-6);
}

#[test]
fn rerank_sorts_by_descending_score() {
    let model = FixedLogits::new(vec![-1.0, 3.0, 0.5]);
    let reranker = Reranker::new(model);

    let scored = reranker
        .rerank("query", &docs(&["low", "high", "mid"]))
        .expect("rerank should succeed");

    let order: Vec<usize> = scored.iter().map(|c| c.index).collect();
    assert_eq!(order, vec![1, 2, 0]);
    assert_eq!(scored[0].text, "high");
    assert!(scored.iter().all(|c| (0.0..=1.0).contains(&c.score)));
    assert!((scored[0].score - sigmoid(3.0)).abs() < 1e-6);
}

#[test]
fn equal_scores_keep_input_order() {
    let reranker = Reranker::new(FixedLogits::new(vec![1.0, 2.0, 1.0, 1.0]));
    let scored = reranker
        .rerank("query", &docs(&["a", "b", "c", "d"]))
        .expect("rerank should succeed");

    let order: Vec<usize> = scored.iter().map(|c| c.index).collect();
    assert_eq!(order, vec![1, 0, 2, 3]);
}

#[test]
fn empty_candidates_skip_the_model() {
    let model = FixedLogits::new(vec![1.0]);
    let reranker = Reranker::new(Arc::clone(&model) as Arc<dyn CrossEncoder>);

    assert!(reranker.rerank("query", &[]).expect("rerank").is_empty());
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn score_count_mismatch_is_an_error() {
    let reranker = Reranker::new(FixedLogits::new(vec![1.0]));
    assert!(matches!(
        reranker.rerank("query", &docs(&["a", "b"])),
        Err(RagError::Upstream(_))
    ));
}

#[test]
fn endpoint_is_built_from_base_url() {
    let config = RerankerConfig {
        base_url: "http://localhost:8082/".to_string(),
        ..RerankerConfig::default()
    };
    let encoder = HttpCrossEncoder::new(&config).expect("valid config");
    assert_eq!(encoder.endpoint().as_str(), "http://localhost:8082/v1/rerank");

    let invalid = RerankerConfig {
        base_url: "not a url".to_string(),
        ..RerankerConfig::default()
    };
    assert!(HttpCrossEncoder::new(&invalid).is_err());
}

#[test]
fn logit_inverts_sigmoid() {
    for p in [0.1_f32, 0.5, 0.73, 0.95] {
        assert!((sigmoid(logit(p)) - p).abs() < 1e-5);
    }
    assert!(logit(0.0).is_finite());
    assert!(logit(1.0).is_finite());
}

#[tokio::test(flavor = "multi_thread")]
async fn http_probability_scores_survive_normalization() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/rerank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "index": 0, "relevance_score": 0.92 },
                { "index": 1, "relevance_score": 0.15 }
            ]
        })))
        .mount(&server)
        .await;

    let config = RerankerConfig {
        scores_are_probabilities: true,
        ..reranker_config(&server)
    };
    let reranker = Reranker::new(Arc::new(
        HttpCrossEncoder::new(&config).expect("valid config"),
    ));
    let scored = tokio::task::spawn_blocking(move || {
        reranker.rerank("what is rust", &docs(&["a language", "a fungus"]))
    })
    .await
    .expect("task should not panic")
    .expect("rerank should succeed");

    assert_eq!(scored[0].index, 0);
    assert!((scored[0].score - 0.92).abs() < 1e-4);
    assert!((scored[1].score - 0.15).abs() < 1e-4);
}

#[tokio::test(flavor = "multi_thread")]
async fn http_scores_are_realigned_by_index() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/rerank"))
        .and(body_json(json!({
            "model": "cross-encoder/ms-marco-MiniLM-L-6-v2",
            "query": "what is rust",
            "documents": ["a language", "a fungus"],
            "top_n": 2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "index": 1, "relevance_score": -2.0 },
                { "index": 0, "relevance_score": 4.5 }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let encoder = HttpCrossEncoder::new(&reranker_config(&server)).expect("valid config");
    let logits = tokio::task::spawn_blocking(move || {
        encoder.predict("what is rust", &docs(&["a language", "a fungus"]))
    })
    .await
    .expect("task should not panic")
    .expect("predict should succeed");

    assert_eq!(logits, vec![4.5, -2.0]);
}

#[tokio::test(flavor = "multi_thread")]
async fn http_out_of_range_index_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/rerank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "index": 0, "relevance_score": 1.0 },
                { "index": 5, "relevance_score": 2.0 }
            ]
        })))
        .mount(&server)
        .await;

    let encoder = HttpCrossEncoder::new(&reranker_config(&server)).expect("valid config");
    let result = tokio::task::spawn_blocking(move || encoder.predict("q", &docs(&["a", "b"])))
        .await
        .expect("task should not panic");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn http_missing_score_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/rerank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "index": 0, "relevance_score": 1.0 }]
        })))
        .mount(&server)
        .await;

    let encoder = HttpCrossEncoder::new(&reranker_config(&server)).expect("valid config");
    let result = tokio::task::spawn_blocking(move || encoder.predict("q", &docs(&["a", "b"])))
        .await
        .expect("task should not panic");

    let error = result.expect_err("missing score should fail");
    assert!(error.to_string().contains("no score for document 1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn http_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/rerank"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let encoder = HttpCrossEncoder::new(&reranker_config(&server)).expect("valid config");
    let result = tokio::task::spawn_blocking(move || encoder.predict("q", &docs(&["a"])))
        .await
        .expect("task should not panic");

    let error = result.expect_err("503 should fail");
    assert!(error.to_string().contains("HTTP 503"));
}
