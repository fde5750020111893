use crate::actions::{PageActions, PageSession, SessionLauncher};
use crate::error::{BrowserError, Result};
use crate::fingerprint::{FingerprintConfig, LAUNCH_ARGS};
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use trawler_core::BrowserConfig;

/// Interval between selector polls while waiting for rendering.
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches hardened headless Chromium sessions.
#[derive(Debug, Clone)]
pub struct BrowserEngine {
    config: BrowserConfig,
}

impl BrowserEngine {
    /// Create a new browser engine with the given settings
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn chromium_config(&self, fingerprint: &FingerprintConfig) -> Result<ChromiumConfig> {
        let mut builder = ChromiumConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .viewport(Viewport {
                width: fingerprint.viewport_width,
                height: fingerprint.viewport_height,
                ..Viewport::default()
            })
            .args(LAUNCH_ARGS.iter().copied());

        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &self.config.executable {
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(BrowserError::ChromiumError)
    }
}

#[async_trait::async_trait]
impl SessionLauncher for BrowserEngine {
    type Session = BrowserSession;

    async fn launch(&self) -> Result<BrowserSession> {
        let fingerprint = FingerprintConfig::from_config(&self.config);
        let config = self.chromium_config(&fingerprint)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Spawn browser handler
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match open_stealth_page(&browser, &fingerprint).await {
            Ok(page) => page,
            Err(e) => {
                let mut browser = browser;
                let _ = browser.close().await;
                handler_task.abort();
                return Err(e);
            }
        };

        tracing::info!(
            user_agent = %fingerprint.user_agent,
            width = fingerprint.viewport_width,
            height = fingerprint.viewport_height,
            "Browser session launched"
        );

        Ok(BrowserSession {
            browser: Some(browser),
            page,
            handler_task: Some(handler_task),
        })
    }
}

async fn open_stealth_page(browser: &Browser, fingerprint: &FingerprintConfig) -> Result<Page> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

    page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(
        fingerprint.stealth_script(),
    ))
    .await
    .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

    page.set_user_agent(SetUserAgentOverrideParams::new(fingerprint.user_agent.clone()))
        .await
        .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

    Ok(page)
}

/// One Chromium process with the single page used for a run.
pub struct BrowserSession {
    browser: Option<Browser>,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
}

impl BrowserSession {
    fn ensure_open(&self) -> Result<()> {
        if self.browser.is_none() {
            return Err(BrowserError::SessionClosed);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PageActions for BrowserSession {
    type Element = Element;

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        self.ensure_open()?;
        tracing::debug!("Navigating to {}", url);

        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::NavigationError(format!("{url}: {e}"))),
            Err(_) => Err(BrowserError::Timeout(format!(
                "navigation to {url} exceeded {timeout:?}"
            ))),
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<Vec<Element>> {
        self.ensure_open()?;
        let deadline = Instant::now() + timeout;

        loop {
            let found = self.query_all(selector).await?;
            if !found.is_empty() {
                return Ok(found);
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "waiting for {selector} exceeded {timeout:?}"
                )));
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Element>> {
        self.ensure_open()?;
        match self.page.find_elements(selector).await {
            Ok(elements) => Ok(elements),
            // CDP reports "no node found" as an error rather than an empty list
            Err(e) if e.to_string().contains("No node") => Ok(Vec::new()),
            Err(e) => Err(BrowserError::SelectorNotFound(format!("{selector}: {e}"))),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.ensure_open()?;
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::EvaluationError(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn click(&self, element: &Element) -> Result<()> {
        self.ensure_open()?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::ElementError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PageSession for BrowserSession {
    async fn close(&mut self) -> Result<()> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };

        let closed = browser
            .close()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()));
        let _ = browser.wait().await;

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }

        tracing::info!("Browser session closed");
        closed.map(|_| ())
    }
}
