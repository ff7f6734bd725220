use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use ragbook_core::config::{EmbeddingProvider, EmbeddingSettings, TokenizerKind, TokenizerSettings};
use ragbook_core::error::Error;
use ragbook_core::traits::Embedder;
use ragbook_embed::{get_default_embedder, load_tokenizer, FakeEmbedder, OpenAiEmbedder};

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { provider: EmbeddingProvider::Fake, fake_dim: 256, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 256);
    assert_eq!(embedder.dim(), Some(256));
    assert_eq!(embedder.embedder_id(), "fake:xxh64:d256");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_separates_unrelated_text() {
    let e = FakeEmbedder::new(512);
    let a = e.embed("In the beginning was the Word").unwrap();
    let b = e.embed("completely unrelated tokens here").unwrap();
    let same: f32 = a.iter().zip(&a).map(|(x, y)| x * y).sum();
    let cross: f32 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
    assert!(same > cross);
}

#[test]
fn tokenizer_factory_defaults_to_whitespace() {
    let tok = load_tokenizer(&TokenizerSettings::default()).unwrap();
    assert_eq!(tok.count_tokens("one two  three").unwrap(), 3);

    let tmp = tempfile::TempDir::new().unwrap();
    let missing = tmp.path().join("tokenizer.json");
    let settings = TokenizerSettings { kind: TokenizerKind::HuggingFace, path: Some(missing.display().to_string()) };
    assert!(matches!(load_tokenizer(&settings), Err(Error::ResourceNotFound(_))));

    fs::write(&missing, "not json").unwrap();
    assert!(matches!(load_tokenizer(&settings), Err(Error::InvalidConfig(_))));
}

#[derive(Clone, Default)]
struct Mock {
    calls: Arc<AtomicUsize>,
    fail_first: bool,
    always_fail: bool,
    delay: Option<Duration>,
}

async fn embeddings(State(mock): State<Mock>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let call = mock.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(delay) = mock.delay {
        tokio::time::sleep(delay).await;
    }
    if mock.always_fail || (mock.fail_first && call == 0) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "busy"})));
    }
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    // Reverse order to check that the client sorts by index.
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(i, text)| json!({"index": i, "embedding": [text.as_str().unwrap_or("").len() as f32, 1.0]}))
        .collect();
    (StatusCode::OK, Json(json!({"data": data})))
}

async fn spawn_mock(mock: Mock) -> String {
    let app = Router::new().route("/v1/embeddings", post(embeddings)).with_state(mock);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/v1")
}

fn client(base: String, timeout: Duration, retries: usize, batch: usize) -> OpenAiEmbedder {
    OpenAiEmbedder::new("sk-test".into(), base, "text-embedding-3-small".into(), None, timeout, retries, batch)
        .unwrap()
        .with_retry_base(Duration::from_millis(10))
}

#[tokio::test(flavor = "multi_thread")]
async fn openai_embedder_batches_and_orders() {
    let mock = Mock::default();
    let calls = mock.calls.clone();
    let base = spawn_mock(mock).await;

    let vectors = tokio::task::spawn_blocking(move || {
        let embedder = client(base, Duration::from_secs(5), 1, 2);
        assert_eq!(embedder.embedder_id(), "openai:text-embedding-3-small");
        let texts: Vec<String> = ["a", "bb", "ccc"].iter().map(|s| s.to_string()).collect();
        embedder.embed_batch(&texts)
    })
    .await
    .unwrap()
    .expect("embed");

    assert_eq!(vectors, vec![vec![1.0, 1.0], vec![2.0, 1.0], vec![3.0, 1.0]]);
    assert_eq!(calls.load(Ordering::SeqCst), 2, "three inputs at batch size two");
}

#[tokio::test(flavor = "multi_thread")]
async fn openai_embedder_retries_server_errors() {
    let mock = Mock { fail_first: true, ..Mock::default() };
    let calls = mock.calls.clone();
    let base = spawn_mock(mock).await;

    let result = tokio::task::spawn_blocking(move || client(base, Duration::from_secs(5), 3, 8).embed("hello"))
        .await
        .unwrap();

    assert_eq!(result.expect("retried"), vec![5.0, 1.0]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn openai_embedder_reports_errors_without_retry_budget() {
    let mock = Mock { fail_first: true, ..Mock::default() };
    let base = spawn_mock(mock).await;

    let err = tokio::task::spawn_blocking(move || client(base, Duration::from_secs(5), 0, 8).embed("hello"))
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(err.kind(), "UpstreamServiceError");
    assert!(err.to_string().contains("503"), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn openai_embedder_retries_after_the_first_attempt() {
    let mock = Mock { always_fail: true, ..Mock::default() };
    let calls = mock.calls.clone();
    let base = spawn_mock(mock).await;

    let err = tokio::task::spawn_blocking(move || client(base, Duration::from_secs(5), 2, 8).embed("hello"))
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(err.kind(), "UpstreamServiceError");
    assert_eq!(calls.load(Ordering::SeqCst), 3, "one attempt plus two retries");
}

#[tokio::test(flavor = "multi_thread")]
async fn openai_embedder_timeout_is_upstream_timeout() {
    let mock = Mock { delay: Some(Duration::from_millis(800)), ..Mock::default() };
    let base = spawn_mock(mock).await;

    let err = tokio::task::spawn_blocking(move || client(base, Duration::from_millis(100), 0, 8).embed("hello"))
        .await
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, Error::Upstream { timed_out: true, .. }), "got {err:?}");
}

#[test]
fn openai_embedder_requires_api_key() {
    let err = OpenAiEmbedder::new(" ".into(), "http://localhost".into(), "m".into(), None, Duration::from_secs(1), 1, 1)
        .err()
        .expect("must fail");
    assert!(matches!(err, Error::InvalidConfig(_)));
}
