//! Escalation coordinator: ingestion, optional browser rendering, and at most
//! one retry of the pipeline against rendered markup.
//!
//! Per input the coordinator:
//!
//! 1. rewrites the URL through the matching pack's transform, if any
//! 2. ingests the (possibly rewritten) input
//! 3. renders up front when forced, or when the domain previously needed it
//! 4. runs the pipeline
//! 5. on thin content, renders once and re-runs, remembering success
//! 6. records provider and pack for URL sources
//!
//! Render failures never fail the run; they are logged and traced. The whole
//! run races a timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::browser::{BrowserRenderer, render_target};
use crate::extract::THIN_CONTENT_THRESHOLD;
use crate::ingest::Ingest;
use crate::model::{IngestionPayload, PageDoc, SourceKind};
use crate::packs::{DomainState, PackRegistry, PatternPack, Provider, state_domain};
use crate::pipeline::{ExtractOptions, ExtractionPipeline};
use crate::trace::Trace;
use crate::{PageDocError, Result};

const RENDERED_MIME: &str = "text/html";

/// Extraction mode requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Auto,
    Thread,
    /// Readability only; never escalates to the browser.
    Article,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Thread => "thread",
            Mode::Article => "article",
        }
    }
}

/// Per-run coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Render with the browser before the first pass.
    pub rendered: bool,
    pub mode: Mode,
    /// Machine output was requested; skip pre-rendering learned from state.
    pub json: bool,
    /// Never escalate thin content to the browser.
    pub no_fallback: bool,
    pub max_depth: Option<u32>,
    pub max_length: Option<usize>,
    /// Whole-run deadline in seconds.
    pub timeout: u64,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self { rendered: false, mode: Mode::Auto, json: false, no_fallback: false, max_depth: None, max_length: None, timeout: 30 }
    }
}

impl CoordinatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rendered(mut self, rendered: bool) -> Self {
        self.rendered = rendered;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn no_fallback(mut self, no_fallback: bool) -> Self {
        self.no_fallback = no_fallback;
        self
    }

    pub fn max_depth(mut self, depth: Option<u32>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn max_length(mut self, length: Option<usize>) -> Self {
        self.max_length = length;
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions::new()
            .force_readability(self.mode == Mode::Article)
            .max_depth(self.max_depth)
            .max_length(self.max_length)
    }
}

/// Output of one coordinated run.
#[derive(Debug, Clone)]
pub struct CoordinatorResult {
    pub doc: PageDoc,
    pub trace: Trace,
    /// The payload actually extracted, after any rendering.
    pub payload: IngestionPayload,
}

/// Drives ingestion, rendering and extraction for one input at a time.
pub struct Coordinator {
    registry: PackRegistry,
    renderer: Arc<dyn BrowserRenderer>,
    ingestor: Arc<dyn Ingest>,
    pipeline: ExtractionPipeline,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("registry", &self.registry)
            .field("renderer", &self.renderer.name())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    pub fn new(registry: PackRegistry, renderer: Arc<dyn BrowserRenderer>, ingestor: Arc<dyn Ingest>) -> Self {
        Self { registry, renderer, ingestor, pipeline: ExtractionPipeline::new() }
    }

    /// Replaces the default pipeline, e.g. to swap the readability backend.
    pub fn with_pipeline(mut self, pipeline: ExtractionPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn registry(&self) -> &PackRegistry {
        &self.registry
    }

    /// Ingests and extracts `input` (a URL, a file path, or `-` for stdin).
    ///
    /// # Errors
    ///
    /// [`PageDocError::Timeout`] when the run exceeds `options.timeout`,
    /// ingestion errors, and fatal API shape errors.
    pub async fn process(&self, input: &str, options: &CoordinatorOptions) -> Result<CoordinatorResult> {
        with_deadline(options.timeout, async {
            let started = Instant::now();
            let mut trace = Trace::new();
            let pack = self.registry.get_pack_for_url(input);

            let mut target = input.to_string();
            if input.starts_with("http")
                && let Some(rewritten) = pack.as_deref().and_then(|p| p.transform_url(input))
            {
                tracing::info!("transformed {} -> {}", input, rewritten);
                trace.step("URL Transform", rewritten.clone(), format!("Pack transform rewrote {}", input));
                target = rewritten;
            }

            let payload = self.ingestor.ingest(&target).await?;
            self.run(payload, pack, options, trace, started).await
        })
        .await
    }

    /// Runs the escalation ladder over an already-ingested payload.
    pub async fn process_payload(
        &self,
        payload: IngestionPayload,
        options: &CoordinatorOptions,
    ) -> Result<CoordinatorResult> {
        with_deadline(options.timeout, async {
            let pack = self.registry.get_pack_for_url(&payload.identifier);
            self.run(payload, pack, options, Trace::new(), Instant::now()).await
        })
        .await
    }

    async fn run(
        &self,
        mut payload: IngestionPayload,
        pack: Option<Arc<PatternPack>>,
        options: &CoordinatorOptions,
        mut trace: Trace,
        started: Instant,
    ) -> Result<CoordinatorResult> {
        let extract_options = options.extract_options();
        let mut provider = Provider::Fetch;
        let mut used_browser = false;

        if payload.source == SourceKind::Url {
            let learned = self.registry.get_domain_state(&payload.identifier).is_some_and(|s| s.needs_rendering());

            if options.rendered || (learned && !options.json) {
                let policy = if options.rendered { "Forced" } else { "Prior Knowledge" };
                if self.render_into(&mut payload, policy, &mut trace).await {
                    used_browser = true;
                    provider = Provider::Playwright;
                }
            }
        }

        let mut doc = self.pipeline.process(&payload, pack.as_deref(), &extract_options, &mut trace)?;

        let thin = doc.content.len() < THIN_CONTENT_THRESHOLD;
        let can_retry = matches!(payload.source, SourceKind::Url | SourceKind::File)
            && !used_browser
            && options.mode != Mode::Article
            && !options.no_fallback;

        if thin && can_retry {
            tracing::info!("thin content ({} blocks) for {}, escalating to browser", doc.content.len(), payload.identifier);

            if self.render_into(&mut payload, "Thin Content", &mut trace).await {
                provider = Provider::Playwright;
                doc = self.pipeline.process(&payload, pack.as_deref(), &extract_options, &mut trace)?;

                if doc.content.len() >= THIN_CONTENT_THRESHOLD && payload.source == SourceKind::Url {
                    trace.step("State", "Needs Rendering", format!("Rendered retry produced {} blocks", doc.content.len()));
                    self.remember(
                        &payload.identifier,
                        DomainState {
                            needs_rendering: Some(true),
                            provider: Some(Provider::Playwright),
                            score: Some(doc.content.len()),
                            ..Default::default()
                        },
                    )
                    .await;
                }
            }
        }

        if payload.source == SourceKind::Url {
            self.remember(
                &payload.identifier,
                DomainState {
                    provider: Some(provider),
                    pack_version: pack.as_ref().map(|p| p.domain.clone()),
                    ..Default::default()
                },
            )
            .await;
        }

        trace.duration_ms = started.elapsed().as_millis() as u64;
        doc.metadata.insert("durationMs".to_string(), trace.duration_ms.into());
        Ok(CoordinatorResult { doc, trace, payload })
    }

    /// Renders the payload's source in place. Returns whether markup was replaced.
    async fn render_into(&self, payload: &mut IngestionPayload, policy: &str, trace: &mut Trace) -> bool {
        let target = match payload.source {
            SourceKind::File => render_target(&payload.identifier),
            _ => payload.identifier.clone(),
        };

        match self.renderer.render(&target).await {
            Ok(html) => {
                trace.step(
                    "Browser Render",
                    policy,
                    format!("Rendered {} via {} ({} bytes)", target, self.renderer.name(), html.len()),
                );
                payload.raw_content = html.into_bytes();
                payload.mime_type = Some(RENDERED_MIME.to_string());
                true
            }
            Err(e) => {
                tracing::warn!("browser render failed for {}: {}", target, e);
                trace.step("Browser Render", "Failed", e.to_string());
                false
            }
        }
    }

    /// Best-effort state write; failures are logged only.
    ///
    /// File-backed stores do blocking I/O, so the save runs on the blocking pool.
    async fn remember(&self, identifier: &str, partial: DomainState) {
        let Some(domain) = state_domain(identifier) else {
            return;
        };
        let store = self.registry.state_store();
        let key = domain.clone();

        match tokio::task::spawn_blocking(move || store.save(&key, &partial)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("failed to save domain state for {}: {}", domain, e),
            Err(e) => tracing::warn!("domain state write for {} did not complete: {}", domain, e),
        }
    }

    /// Releases the renderer.
    pub async fn close(&self) -> Result<()> {
        self.renderer.close().await
    }
}

async fn with_deadline<F>(seconds: u64, run: F) -> Result<CoordinatorResult>
where
    F: std::future::Future<Output = Result<CoordinatorResult>>,
{
    tokio::time::timeout(Duration::from_secs(seconds), run)
        .await
        .map_err(|_| PageDocError::Timeout { timeout: seconds })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::NoopRenderer;
    use crate::packs::{MemoryStateStore, PackRegistryBuilder, PatternPack, StateStore};
    use crate::readability::NullExtractor;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const THIN: &str = "<html><body><p>Loading...</p></body></html>";
    const THIN_THREAD: &str = r#"<html><body><div class="c" depth="0">a</div><div class="c" depth="1">b</div><div class="c" depth="2">c</div></body></html>"#;
    const RICH: &str = "<html><body><main><h1>Rendered</h1><p>one</p><p>two</p><p>three</p></main></body></html>";

    struct FixedIngestor {
        body: &'static str,
        seen: Mutex<Vec<String>>,
    }

    impl FixedIngestor {
        fn new(body: &'static str) -> Arc<Self> {
            Arc::new(Self { body, seen: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl Ingest for FixedIngestor {
        async fn ingest(&self, input: &str) -> Result<IngestionPayload> {
            self.seen.lock().unwrap().push(input.to_string());
            let source = crate::ingest::classify_input(input);
            Ok(IngestionPayload::new(source, input, self.body))
        }
    }

    struct SlowIngestor;

    #[async_trait]
    impl Ingest for SlowIngestor {
        async fn ingest(&self, input: &str) -> Result<IngestionPayload> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(IngestionPayload::new(SourceKind::Url, input, RICH))
        }
    }

    #[derive(Default)]
    struct CountingRenderer {
        calls: AtomicUsize,
        targets: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BrowserRenderer for CountingRenderer {
        async fn render(&self, url: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.targets.lock().unwrap().push(url.to_string());
            Ok(RICH.to_string())
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct Fixture {
        coordinator: Coordinator,
        renderer: Arc<CountingRenderer>,
        state: Arc<MemoryStateStore>,
    }

    fn fixture(body: &'static str, packs: Vec<PatternPack>) -> Fixture {
        let state = Arc::new(MemoryStateStore::new());
        let mut registry = PackRegistryBuilder::new().state_store(state.clone()).build();
        for pack in packs {
            registry.add_pack(pack);
        }
        let renderer = Arc::new(CountingRenderer::default());
        let coordinator = Coordinator::new(registry, renderer.clone(), FixedIngestor::new(body))
            .with_pipeline(ExtractionPipeline::with_article_extractor(Arc::new(NullExtractor)));

        Fixture { coordinator, renderer, state }
    }

    #[tokio::test]
    async fn test_thin_url_escalates_and_remembers() {
        let fx = fixture(THIN, vec![]);

        let result = fx.coordinator.process("https://www.spa.example/post", &CoordinatorOptions::default()).await.unwrap();

        assert_eq!(fx.renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.doc.title, "Rendered");
        assert_eq!(result.doc.content.len(), 4);
        assert_eq!(result.payload.mime_type.as_deref(), Some("text/html"));

        let state = fx.state.get("spa.example").unwrap();
        assert!(state.needs_rendering());
        assert_eq!(state.provider, Some(Provider::Playwright));
        assert_eq!(state.score, Some(4));
        assert!(state.last_success.is_some());
    }

    #[tokio::test]
    async fn test_retry_metadata_describes_rendered_pass() {
        let fx = fixture(THIN_THREAD, vec![]);

        let result = fx.coordinator.process("https://spa.example/t", &CoordinatorOptions::default()).await.unwrap();

        assert_eq!(fx.renderer.calls.load(Ordering::SeqCst), 1);
        assert!(result.trace.steps_named("Generic Thread").next().is_some());
        assert_eq!(result.doc.content.len(), 4);
        assert!(result.doc.metadata.get("strategy").is_none());
        assert_eq!(result.doc.metadata["rootSelector"], "main");
        assert_eq!(result.doc.metadata["blockCount"], 4);
        assert_eq!(result.doc.metadata["durationMs"], result.trace.duration_ms);
    }

    #[tokio::test]
    async fn test_learned_state_prerenders_unless_json() {
        let fx = fixture(THIN, vec![]);
        fx.state.save("spa.example", &DomainState { needs_rendering: Some(true), ..Default::default() }).unwrap();

        let result = fx.coordinator.process("https://spa.example/a", &CoordinatorOptions::default()).await.unwrap();
        assert_eq!(fx.renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.trace.steps_named("Browser Render").next().unwrap().decision, "Prior Knowledge");

        let options = CoordinatorOptions::new().json(true).no_fallback(true);
        let result = fx.coordinator.process("https://spa.example/a", &options).await.unwrap();
        assert_eq!(fx.renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.doc.content.len(), 1);
    }

    #[tokio::test]
    async fn test_forced_render() {
        let fx = fixture(THIN, vec![]);

        let result = fx.coordinator.process("https://spa.example/a", &CoordinatorOptions::new().rendered(true)).await.unwrap();

        assert_eq!(fx.renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.trace.steps_named("Browser Render").next().unwrap().decision, "Forced");
        assert_eq!(fx.state.get("spa.example").unwrap().provider, Some(Provider::Playwright));
    }

    #[tokio::test]
    async fn test_no_retry_when_disallowed() {
        for options in [CoordinatorOptions::new().no_fallback(true), CoordinatorOptions::new().mode(Mode::Article)] {
            let fx = fixture(THIN, vec![]);
            fx.coordinator.process("https://spa.example/a", &options).await.unwrap();
            assert_eq!(fx.renderer.calls.load(Ordering::SeqCst), 0);
        }

        let fx = fixture(THIN, vec![]);
        fx.coordinator.process("-", &CoordinatorOptions::default()).await.unwrap();
        assert_eq!(fx.renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_file_retry_renders_file_url() {
        let fx = fixture(THIN, vec![]);

        fx.coordinator.process("/tmp/thin.html", &CoordinatorOptions::default()).await.unwrap();

        assert_eq!(fx.renderer.targets.lock().unwrap().as_slice(), ["file:///tmp/thin.html"]);
    }

    #[tokio::test]
    async fn test_render_failure_is_absorbed() {
        let state = Arc::new(MemoryStateStore::new());
        let registry = PackRegistryBuilder::new().state_store(state.clone()).build();
        let coordinator = Coordinator::new(registry, Arc::new(NoopRenderer), FixedIngestor::new(THIN))
            .with_pipeline(ExtractionPipeline::with_article_extractor(Arc::new(NullExtractor)));

        let result = coordinator.process("https://spa.example/a", &CoordinatorOptions::default()).await.unwrap();

        assert_eq!(result.doc.content.len(), 1);
        assert_eq!(result.trace.steps_named("Browser Render").next().unwrap().decision, "Failed");
        let saved = state.get("spa.example").unwrap();
        assert_eq!(saved.provider, Some(Provider::Fetch));
        assert!(!saved.needs_rendering());
    }

    #[tokio::test]
    async fn test_pack_transform_rewrites_ingested_url() {
        let mut pack = PatternPack::new("example.com").with_item(".c");
        pack.transform = Some(crate::packs::UrlTransform::new(r"^(https://example\.com/t/\d+)$", "${1}.json").unwrap());

        let state = Arc::new(MemoryStateStore::new());
        let mut registry = PackRegistryBuilder::new().state_store(state.clone()).build();
        registry.add_pack(pack);
        let ingestor = FixedIngestor::new(RICH);
        let coordinator = Coordinator::new(registry, Arc::new(NoopRenderer), ingestor.clone());

        let result = coordinator.process("https://example.com/t/9", &CoordinatorOptions::default()).await.unwrap();

        assert_eq!(ingestor.seen.lock().unwrap().as_slice(), ["https://example.com/t/9.json"]);
        assert_eq!(result.payload.identifier, "https://example.com/t/9.json");
        assert_eq!(state.get("example.com").unwrap().pack_version.as_deref(), Some("example.com"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let coordinator = Coordinator::new(PackRegistry::new(), Arc::new(NoopRenderer), Arc::new(SlowIngestor));

        let result = coordinator.process("https://slow.example", &CoordinatorOptions::new().timeout(0)).await;

        assert!(matches!(result, Err(PageDocError::Timeout { timeout: 0 })));
    }
}
