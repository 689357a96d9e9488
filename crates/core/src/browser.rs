//! Browser rendering collaborators.
//!
//! The coordinator only sees [`BrowserRenderer`]. Without the `browser`
//! feature the [`NoopRenderer`] is the only implementation and every render
//! request fails with [`PageDocError::RenderUnavailable`], which the
//! coordinator records and moves past.

use async_trait::async_trait;

use crate::{PageDocError, Result};

/// Renders a URL in a real browser and returns the final markup.
#[async_trait]
pub trait BrowserRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String>;

    /// Releases browser resources. Safe to call more than once.
    async fn close(&self) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Turns a local path into a `file://` URL; anything with a scheme passes through.
pub fn render_target(identifier: &str) -> String {
    if identifier.contains("://") {
        return identifier.to_string();
    }

    let path = std::path::Path::new(identifier);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };

    url::Url::from_file_path(&absolute)
        .map(String::from)
        .unwrap_or_else(|_| format!("file://{}", absolute.display()))
}

/// Renderer for deployments without a browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRenderer;

#[async_trait]
impl BrowserRenderer for NoopRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        Err(PageDocError::RenderUnavailable(format!("no browser configured to render {}", url)))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

#[cfg(feature = "browser")]
pub use chromium::ChromiumRenderer;

#[cfg(feature = "browser")]
mod chromium {
    use async_trait::async_trait;
    use chromiumoxide::{Browser, BrowserConfig};
    use futures_util::StreamExt;
    use tokio::sync::Mutex;
    use tokio::task::JoinHandle;

    use super::BrowserRenderer;
    use crate::{PageDocError, Result};

    struct Running {
        browser: Browser,
        handler: JoinHandle<()>,
    }

    /// Headless Chromium over the DevTools protocol.
    ///
    /// The browser is launched on the first render and reused until [`close`].
    ///
    /// [`close`]: BrowserRenderer::close
    #[derive(Default)]
    pub struct ChromiumRenderer {
        running: Mutex<Option<Running>>,
    }

    impl std::fmt::Debug for ChromiumRenderer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ChromiumRenderer").finish_non_exhaustive()
        }
    }

    impl ChromiumRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        async fn launch() -> Result<Running> {
            let config = BrowserConfig::builder().build().map_err(PageDocError::RenderUnavailable)?;
            let (browser, mut handler) =
                Browser::launch(config).await.map_err(|e| PageDocError::RenderUnavailable(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            tracing::info!("launched headless chromium");
            Ok(Running { browser, handler })
        }
    }

    #[async_trait]
    impl BrowserRenderer for ChromiumRenderer {
        async fn render(&self, url: &str) -> Result<String> {
            let mut guard = self.running.lock().await;
            if guard.is_none() {
                *guard = Some(Self::launch().await?);
            }
            let running = guard.as_ref().ok_or_else(|| PageDocError::RenderUnavailable("browser not running".into()))?;

            let failed = |e: chromiumoxide::error::CdpError| PageDocError::RenderFailed(format!("{}: {}", url, e));
            let page = running.browser.new_page(url).await.map_err(failed)?;
            page.wait_for_navigation().await.map_err(failed)?;
            let html = page.content().await.map_err(failed)?;

            if let Err(e) = page.close().await {
                tracing::debug!("failed to close page for {}: {}", url, e);
            }
            Ok(html)
        }

        async fn close(&self) -> Result<()> {
            if let Some(mut running) = self.running.lock().await.take() {
                running.browser.close().await.map_err(|e| PageDocError::RenderFailed(e.to_string()))?;
                running.handler.abort();
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "chromium"
        }
    }
}
