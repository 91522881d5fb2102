//! Headless browser sessions scoped to a single probe call
//!
//! Every browser-backed analyzer launches its own isolated Chrome process,
//! navigates once, runs its in-page extraction and closes the process again.
//! [`BrowserProbe`] owns that acquire/use/release sequence so an extractor
//! only ever sees a ready [`BrowserSession`] and can fail freely: the session
//! is closed on every exit path and the error becomes a `ProbeResult::Failure`.

use crate::{
    create_browser_config, utils::target_url, AnalysisConfig, Probe, ProbeError, ProbeResult,
    Target, Viewport,
};
use async_trait::async_trait;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventRequestWillBeSent, EventResponseReceived,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};
use uuid::Uuid;

/// Request/response counters observed while a page loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub requests: usize,
    pub responses: usize,
    pub failed_responses: usize,
}

/// One live browser with a single page.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` and wait for network idle, bounded by the session's navigation ceiling.
    async fn navigate(&mut self, url: &str) -> Result<(), ProbeError>;

    /// Evaluate `script` in the page, awaiting a returned promise.
    async fn evaluate(&mut self, script: &str) -> Result<Value, ProbeError>;

    async fn page_metrics(&mut self) -> Result<BTreeMap<String, f64>, ProbeError>;

    fn network_summary(&self) -> NetworkSummary;

    /// Release the browser process. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<(), ProbeError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub viewport: Viewport,
    pub navigation_timeout: Duration,
    pub network_quiet_window: Duration,
}

impl SessionOptions {
    pub fn from_config(config: &AnalysisConfig, viewport: Viewport) -> Self {
        Self {
            viewport,
            navigation_timeout: config.navigation_timeout,
            network_quiet_window: config.network_quiet_window,
        }
    }
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn BrowserSession>, ProbeError>;
}

/// In-page extraction run by a [`BrowserProbe`] against a ready session.
#[async_trait]
pub trait PageExtractor: Send + Sync {
    type Output: Send + 'static;

    async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<Self::Output, ProbeError>;
}

/// Adapts a [`PageExtractor`] into a [`Probe`] with a session scoped to each call.
pub struct BrowserProbe<E> {
    launcher: Arc<dyn BrowserLauncher>,
    extractor: E,
    options: SessionOptions,
}

impl<E: PageExtractor> BrowserProbe<E> {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, extractor: E, options: SessionOptions) -> Self {
        Self {
            launcher,
            extractor,
            options,
        }
    }

    async fn with_session(&self, url: &str) -> Result<E::Output, ProbeError> {
        let mut session = self.launcher.launch(&self.options).await?;

        let outcome = self.extractor.extract(session.as_mut(), url).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session for {}: {}", url, e);
        }
        outcome
    }
}

#[async_trait]
impl<E: PageExtractor> Probe for BrowserProbe<E> {
    type Output = E::Output;

    async fn analyze(&self, target: &Target) -> ProbeResult<E::Output> {
        let url = target_url(target);
        ProbeResult::from(self.with_session(&url).await)
    }
}

/// Launches a fresh Chromium process per session.
pub struct ChromiumLauncher {
    config: AnalysisConfig,
}

impl ChromiumLauncher {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn BrowserSession>, ProbeError> {
        let session_id = Uuid::new_v4().to_string();
        let browser_config = create_browser_config(&self.config, &options.viewport, &session_id)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ProbeError::BrowserLaunchFailed(e.to_string()))?;

        // The handler implements Stream and must be polled for the CDP connection to make progress
        let handler_task = tokio::spawn(async move {
            loop {
                match handler.next().await {
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        debug!("CDP handler error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        });

        let mut session = ChromiumSession {
            browser,
            page: None,
            handler: handler_task,
            listeners: Vec::new(),
            tracker: Arc::new(NetworkTracker::new()),
            navigation_timeout: options.navigation_timeout,
            quiet_window: options.network_quiet_window,
            user_data_dir: PathBuf::from(format!("/tmp/competitor-intel-{session_id}")),
            closed: false,
        };

        if let Err(e) = session.prepare(&options.viewport).await {
            let _ = session.close().await;
            return Err(e);
        }

        debug!("Browser session {} ready", session_id);
        Ok(Box::new(session))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler: JoinHandle<()>,
    listeners: Vec<JoinHandle<()>>,
    tracker: Arc<NetworkTracker>,
    navigation_timeout: Duration,
    quiet_window: Duration,
    user_data_dir: PathBuf,
    closed: bool,
}

impl ChromiumSession {
    async fn prepare(&mut self, viewport: &Viewport) -> Result<(), ProbeError> {
        let page = self.browser.new_page("about:blank").await?;

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width)
            .height(viewport.height)
            .device_scale_factor(viewport.device_scale_factor)
            .mobile(viewport.mobile)
            .build()
            .map_err(ProbeError::PageError)?;
        page.execute(metrics).await?;

        if viewport.has_touch {
            page.execute(SetTouchEmulationEnabledParams::new(true)).await?;
        }

        page.execute(EnableParams::default()).await?;

        let mut requests = page.event_listener::<EventRequestWillBeSent>().await?;
        let tracker = self.tracker.clone();
        self.listeners.push(tokio::spawn(async move {
            while requests.next().await.is_some() {
                tracker.record_request();
            }
        }));

        let mut responses = page.event_listener::<EventResponseReceived>().await?;
        let tracker = self.tracker.clone();
        self.listeners.push(tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                tracker.record_response(event.response.status);
            }
        }));

        self.page = Some(page);
        Ok(())
    }

    fn page(&self) -> Result<&Page, ProbeError> {
        self.page
            .as_ref()
            .ok_or_else(|| ProbeError::PageError("Session has no open page".to_string()))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), ProbeError> {
        let ceiling = self.navigation_timeout;
        let quiet = self.quiet_window;
        let tracker = self.tracker.clone();
        let page = self.page()?;

        timeout(ceiling, async {
            page.goto(url).await?;
            tracker.wait_for_idle(quiet).await;
            Ok::<(), ProbeError>(())
        })
        .await
        .map_err(|_| ProbeError::NavigationTimeout(ceiling))?
    }

    async fn evaluate(&mut self, script: &str) -> Result<Value, ProbeError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(ProbeError::PageError)?;

        let result = self.page()?.evaluate_expression(params).await?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn page_metrics(&mut self) -> Result<BTreeMap<String, f64>, ProbeError> {
        let metrics = self.page()?.metrics().await?;
        Ok(metrics.into_iter().map(|m| (m.name, m.value)).collect())
    }

    fn network_summary(&self) -> NetworkSummary {
        self.tracker.summary()
    }

    async fn close(&mut self) -> Result<(), ProbeError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        for listener in self.listeners.drain(..) {
            listener.abort();
        }
        self.page = None;

        let result = self.browser.close().await;
        self.handler.abort();

        if let Err(e) = tokio::fs::remove_dir_all(&self.user_data_dir).await {
            debug!("Could not remove {}: {}", self.user_data_dir.display(), e);
        }

        result.map(|_| ()).map_err(ProbeError::from)
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        for listener in &self.listeners {
            listener.abort();
        }
        self.handler.abort();
    }
}

/// Network activity seen by one page, shared with the event listener tasks.
#[derive(Debug)]
pub struct NetworkTracker {
    started: Instant,
    requests: AtomicUsize,
    responses: AtomicUsize,
    failed_responses: AtomicUsize,
    last_request_ms: AtomicU64,
}

impl NetworkTracker {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            requests: AtomicUsize::new(0),
            responses: AtomicUsize::new(0),
            failed_responses: AtomicUsize::new(0),
            last_request_ms: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.last_request_ms
            .store(self.started.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_response(&self, status: i64) {
        self.responses.fetch_add(1, Ordering::Relaxed);
        if status >= 400 {
            self.failed_responses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Time since the most recent request started (or since tracking began).
    pub fn quiet_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_request_ms.load(Ordering::Relaxed));
        self.started.elapsed().saturating_sub(last)
    }

    /// Resolve once no request has started for `quiet`. Callers bound this with a timeout.
    pub async fn wait_for_idle(&self, quiet: Duration) {
        loop {
            let elapsed = self.quiet_for();
            if elapsed >= quiet {
                return;
            }
            sleep(quiet - elapsed).await;
        }
    }

    pub fn summary(&self) -> NetworkSummary {
        NetworkSummary {
            requests: self.requests.load(Ordering::Relaxed),
            responses: self.responses.load(Ordering::Relaxed),
            failed_responses: self.failed_responses.load(Ordering::Relaxed),
        }
    }
}

impl Default for NetworkTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Hands out pre-built sessions in order and counts launches.
    pub struct QueuedLauncher {
        sessions: Mutex<Vec<Box<dyn BrowserSession>>>,
        pub launched: AtomicUsize,
    }

    impl QueuedLauncher {
        pub fn new(sessions: Vec<Box<dyn BrowserSession>>) -> Self {
            Self {
                sessions: Mutex::new(sessions),
                launched: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BrowserLauncher for QueuedLauncher {
        async fn launch(
            &self,
            _options: &SessionOptions,
        ) -> Result<Box<dyn BrowserSession>, ProbeError> {
            self.launched.fetch_add(1, Ordering::SeqCst);
            let mut sessions = self.sessions.lock().unwrap();
            if sessions.is_empty() {
                return Err(ProbeError::BrowserLaunchFailed("no browser available".into()));
            }
            Ok(sessions.remove(0))
        }
    }

    /// Session whose evaluate answers come from a script lookup table.
    pub struct ScriptedSession {
        pub navigation: Result<(), ProbeError>,
        pub answers: Vec<(String, Value)>,
        pub metrics: BTreeMap<String, f64>,
        pub network: NetworkSummary,
        pub closed: Arc<AtomicUsize>,
    }

    impl ScriptedSession {
        pub fn answering(answers: Vec<(&str, Value)>) -> Self {
            Self {
                navigation: Ok(()),
                answers: answers
                    .into_iter()
                    .map(|(marker, value)| (marker.to_string(), value))
                    .collect(),
                metrics: BTreeMap::new(),
                network: NetworkSummary::default(),
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl BrowserSession for ScriptedSession {
        async fn navigate(&mut self, _url: &str) -> Result<(), ProbeError> {
            self.navigation.clone()
        }

        async fn evaluate(&mut self, script: &str) -> Result<Value, ProbeError> {
            self.answers
                .iter()
                .find(|(marker, _)| script.contains(marker.as_str()))
                .map(|(_, value)| value.clone())
                .ok_or_else(|| ProbeError::PageError("unexpected script".into()))
        }

        async fn page_metrics(&mut self) -> Result<BTreeMap<String, f64>, ProbeError> {
            Ok(self.metrics.clone())
        }

        fn network_summary(&self) -> NetworkSummary {
            self.network
        }

        async fn close(&mut self) -> Result<(), ProbeError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
