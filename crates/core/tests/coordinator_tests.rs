//! End-to-end coordinator runs over fixture files and a file-backed state store
use async_trait::async_trait;
use pagedoc_core::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

/// Serves a fixture in place of a real browser.
struct FixtureRenderer {
    fixture: &'static str,
    calls: AtomicUsize,
}

impl FixtureRenderer {
    fn new(fixture: &'static str) -> Arc<Self> {
        Arc::new(Self { fixture, calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl BrowserRenderer for FixtureRenderer {
    async fn render(&self, _url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(std::fs::read_to_string(get_fixture_path(self.fixture))?)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

fn registry(state_file: &std::path::Path) -> PackRegistry {
    let mut registry = PackRegistryBuilder::new()
        .standard_dir("../../patterns")
        .state_store(Arc::new(JsonStateStore::open(state_file)))
        .build();
    registry.load_packs().unwrap();
    registry
}

fn coordinator(state_file: &std::path::Path, renderer: Arc<dyn BrowserRenderer>) -> Coordinator {
    Coordinator::new(registry(state_file), renderer, Arc::new(DefaultIngestor::default()))
        .with_pipeline(ExtractionPipeline::with_article_extractor(Arc::new(NullExtractor)))
}

#[tokio::test]
async fn test_file_input_end_to_end() {
    let dir = TempDir::new().unwrap();
    let state_file = dir.path().join("site-state.json");
    let coordinator = coordinator(&state_file, Arc::new(NoopRenderer));

    let result = coordinator.process(&get_fixture_path("jsonld_test.html"), &CoordinatorOptions::default()).await.unwrap();

    assert_eq!(result.doc.title, "Deterministic Extraction in Practice");
    assert_eq!(result.payload.source, SourceKind::File);
    assert_eq!(result.payload.mime_type.as_deref(), Some("text/html"));
    assert!(result.trace.steps_named("Browser Render").next().is_none());
    assert!(!state_file.exists(), "file inputs have no domain state");
}

#[tokio::test]
async fn test_thin_file_escalates_without_browser() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&dir.path().join("state.json"), Arc::new(NoopRenderer));

    let result = coordinator.process(&get_fixture_path("thin.html"), &CoordinatorOptions::default()).await.unwrap();

    let step = result.trace.steps_named("Browser Render").next().unwrap();
    assert_eq!(step.decision, "Failed");
    assert_eq!(result.doc.content.len(), 1);
}

#[tokio::test]
async fn test_thin_file_rerenders() {
    let dir = TempDir::new().unwrap();
    let renderer = FixtureRenderer::new("article.html");
    let coordinator = coordinator(&dir.path().join("state.json"), renderer.clone());

    let result = coordinator.process(&get_fixture_path("thin.html"), &CoordinatorOptions::default()).await.unwrap();

    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.doc.title, "Understanding Rust Ownership");
    assert_eq!(result.payload.mime_type.as_deref(), Some("text/html"));
}

#[tokio::test]
async fn test_learned_rendering_persists_across_runs() {
    let dir = TempDir::new().unwrap();
    let state_file = dir.path().join("nested").join("site-state.json");
    let thin = std::fs::read(get_fixture_path("thin.html")).unwrap();
    let payload = || IngestionPayload::new(SourceKind::Url, "https://www.spa-blog.example/posts/1", thin.clone());

    let renderer = FixtureRenderer::new("article.html");
    let first = coordinator(&state_file, renderer.clone());
    first.process_payload(payload(), &CoordinatorOptions::default()).await.unwrap();
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);

    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&state_file).unwrap()).unwrap();
    assert_eq!(saved["spa-blog.example"]["needsRendering"], true);
    assert_eq!(saved["spa-blog.example"]["provider"], "playwright");
    assert!(saved["spa-blog.example"]["lastSuccess"].is_string());

    let renderer = FixtureRenderer::new("article.html");
    let second = coordinator(&state_file, renderer.clone());
    let result = second.process_payload(payload(), &CoordinatorOptions::default()).await.unwrap();

    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.trace.steps_named("Browser Render").next().unwrap().decision, "Prior Knowledge");
    assert!(result.trace.steps_named("Heuristic Fallback").next().is_none());
}

#[tokio::test]
async fn test_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&dir.path().join("state.json"), Arc::new(NoopRenderer));

    let result = coordinator.process("/nonexistent/page.html", &CoordinatorOptions::default()).await;

    assert!(matches!(result, Err(PageDocError::FileNotFound(_))));
}

#[tokio::test]
async fn test_json_fixture_through_coordinator() {
    let dir = TempDir::new().unwrap();
    let coordinator = coordinator(&dir.path().join("state.json"), Arc::new(NoopRenderer));
    let body = std::fs::read(get_fixture_path("hn_post.json")).unwrap();
    let payload = IngestionPayload::new(SourceKind::Url, "https://hn.algolia.com/api/v1/items/1", body);

    let result = coordinator.process_payload(payload, &CoordinatorOptions::new().max_depth(Some(0))).await.unwrap();

    assert_eq!(result.doc.title, "Welcome to Hacker News");
    assert_eq!(result.doc.metadata["source"], "json-api");
    let items: Vec<&ThreadItem> = result.doc.content.iter().filter_map(ContentBlock::as_thread_item).collect();
    assert!(items.iter().all(|item| item.children.is_empty()));
}
