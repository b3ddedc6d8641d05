//! Chromium-based surface using chromiumoxide.
//!
//! Containers, controls and fields are tagged with `data-bonus-*` attributes
//! while they are enumerated, so later clicks and field writes address the
//! exact node that was scored, not a re-run selector.

use super::{
    AckMatcher, Acknowledgment, Container, Dialog, NavigationResult, RemoteSurface, Renderer,
    SETTLE_FALLBACK_DELAY, SETTLE_IDLE_TIMEOUT,
};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use rand::Rng;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Elements treated as interactive containers.
const CONTAINER_SELECTOR: &str = "form, fieldset, section, [role='region'], [role='group']";

/// Network silence required before the page counts as settled.
const QUIET_WINDOW: Duration = Duration::from_millis(500);

const POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. BONUS_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("BONUS_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.cache/bonus-steward/chromium/
    if let Some(cache) = dirs::cache_dir() {
        let candidate = cache.join("bonus-steward/chromium/chrome-linux64/chrome");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Human-like delay bounds applied before clicks and field writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Pacing {
    fn delay(&self) -> Duration {
        let (lo, hi) = if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        };
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }
}

/// Options for launching Chromium.
#[derive(Debug, Clone, Copy)]
pub struct LaunchOptions {
    pub headless: bool,
    pub pacing: Pacing,
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Browser,
    pacing: Pacing,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance.
    pub async fn launch(options: LaunchOptions) -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found. Install Chrome or set BONUS_CHROMIUM_PATH.")?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(1440, 1000)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");
        if options.headless {
            builder = builder.arg("--headless=new");
        } else {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser,
            pacing: options.pacing,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_surface(&self) -> Result<Box<dyn RemoteSurface>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        let responses = Arc::new(Mutex::new(Vec::new()));
        let last_activity = Arc::new(Mutex::new(Instant::now()));

        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .context("failed to subscribe to network responses")?;
        let sink = Arc::clone(&responses);
        let activity = Arc::clone(&last_activity);
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                *activity.lock().await = Instant::now();
                sink.lock().await.push(SeenResponse {
                    request_id: event.request_id.clone(),
                    url: event.response.url.clone(),
                    status: u16::try_from(event.response.status).unwrap_or(0),
                });
            }
        });

        Ok(Box::new(ChromiumSurface {
            page,
            pacing: self.pacing,
            responses,
            last_activity,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        // Browser is dropped when ChromiumRenderer is dropped
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct SeenResponse {
    request_id: RequestId,
    url: String,
    status: u16,
}

/// A single Chromium page.
pub struct ChromiumSurface {
    page: Page,
    pacing: Pacing,
    responses: Arc<Mutex<Vec<SeenResponse>>>,
    last_activity: Arc<Mutex<Instant>>,
}

impl ChromiumSurface {
    async fn eval<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;
        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn pace(&self) {
        tokio::time::sleep(self.pacing.delay()).await;
    }

    async fn network_quiet(&self) -> bool {
        self.last_activity.lock().await.elapsed() >= QUIET_WINDOW
    }

    async fn response_body(&self, request_id: &RequestId) -> Option<String> {
        match self
            .page
            .execute(GetResponseBodyParams::new(request_id.clone()))
            .await
        {
            Ok(response) => Some(response.result.body.clone()),
            Err(e) => {
                tracing::debug!("response body unavailable: {e}");
                None
            }
        }
    }
}

/// JSON-encode a value for splicing into a script.
fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn enumerate_script() -> String {
    format!(
        r#"(() => {{
  const clean = (v) => String(v || '').replace(/\s+/g, ' ').trim();
  const label = (n) => clean(n.getAttribute('value') || n.getAttribute('aria-label') || n.getAttribute('title') || n.textContent || '');
  const tag = (n, token) => n.setAttribute('data-bonus-ref', ((n.getAttribute('data-bonus-ref') || '') + ' ' + token).trim());
  document.querySelectorAll('[data-bonus-ref]').forEach((n) => n.removeAttribute('data-bonus-ref'));
  return Array.from(document.querySelectorAll({selector})).map((root, i) => {{
    const controls = Array.from(root.querySelectorAll("button, input[type='submit'], input[type='button']"))
      .map((n, j) => {{ tag(n, `c${{i}}-b${{j}}`); return {{ index: j, label: label(n) }}; }})
      .filter((c) => c.label);
    const fields = Array.from(root.querySelectorAll('input, select, textarea')).map((n, k) => {{
      tag(n, `c${{i}}-f${{k}}`);
      const options = n.tagName.toLowerCase() === 'select'
        ? Array.from(n.options).map((o) => ({{ value: o.value, text: clean(o.textContent), disabled: o.disabled }}))
        : [];
      return {{
        index: k,
        tag: n.tagName.toLowerCase(),
        kind: clean(n.getAttribute('type')).toLowerCase(),
        name: clean(n.getAttribute('name')),
        id: clean(n.getAttribute('id')),
        placeholder: clean(n.getAttribute('placeholder')),
        options,
      }};
    }});
    return {{ index: i, text: clean(root.innerText || root.textContent), controls, fields }};
  }});
}})()"#,
        selector = js_literal(CONTAINER_SELECTOR)
    )
}

const DIALOG_FINDER: &str = r#"
  const clean = (v) => String(v || '').replace(/\s+/g, ' ').trim();
  const visible = (n) => !!(n.offsetWidth || n.offsetHeight || n.getClientRects().length);
  const dialogs = Array.from(document.querySelectorAll("[role='dialog'], .ui-dialog, dialog[open]")).filter(visible);
  const dialog = dialogs.length ? dialogs[dialogs.length - 1] : null;
  const buttons = dialog ? Array.from(dialog.querySelectorAll("button, input[type='button'], input[type='submit']")) : [];
  const label = (b) => clean(b.value || b.textContent);
"#;

#[async_trait]
impl RemoteSurface for ChromiumSurface {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result =
            tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url)).await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = self.current_url().await.unwrap_or_else(|_| url.to_string());
                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn current_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn page_text(&self) -> Result<String> {
        self.eval("document.body ? document.body.innerText : ''")
            .await
    }

    async fn page_html(&self) -> Result<String> {
        self.page.content().await.context("failed to get HTML")
    }

    async fn element_text(&self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            "(() => {{ const n = document.querySelector({}); return n ? (n.innerText || n.textContent || '') : null; }})()",
            js_literal(selector)
        );
        self.eval(&script).await
    }

    async fn containers(&self) -> Result<Vec<Container>> {
        self.eval(&enumerate_script()).await
    }

    async fn set_field(&mut self, container: usize, field: usize, value: &str) -> Result<()> {
        self.pace().await;
        let script = format!(
            r#"(() => {{
  const n = document.querySelector('[data-bonus-ref~="c{container}-f{field}"]');
  if (!n) return false;
  n.value = {value};
  n.dispatchEvent(new Event('input', {{ bubbles: true }}));
  n.dispatchEvent(new Event('change', {{ bubbles: true }}));
  return true;
}})()"#,
            value = js_literal(value)
        );
        let found: bool = self.eval(&script).await?;
        if !found {
            bail!("field {field} of container {container} is no longer on the page");
        }
        Ok(())
    }

    async fn click_control(&mut self, container: usize, control: usize) -> Result<()> {
        self.pace().await;
        self.responses.lock().await.clear();
        let script = format!(
            r#"(() => {{
  const n = document.querySelector('[data-bonus-ref~="c{container}-b{control}"]');
  if (!n) return false;
  n.scrollIntoView({{ block: 'center' }});
  n.click();
  return true;
}})()"#
        );
        let found: bool = self.eval(&script).await?;
        if !found {
            bail!("control {control} of container {container} is no longer on the page");
        }
        Ok(())
    }

    async fn wait_for_dialog(&mut self, timeout_ms: u64) -> Result<Option<Dialog>> {
        let script = format!(
            "(() => {{ {DIALOG_FINDER} return dialog ? {{ text: clean(dialog.innerText || dialog.textContent), buttons: buttons.map(label) }} : null; }})()"
        );
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let dialog: Option<Dialog> = self.eval(&script).await?;
            if dialog.is_some() || Instant::now() >= deadline {
                return Ok(dialog);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn click_dialog_button(&mut self, keywords: &[&str]) -> Result<Option<String>> {
        self.pace().await;
        let script = format!(
            r#"(() => {{ {DIALOG_FINDER}
  const keywords = {keywords};
  const button = buttons.find((b) => keywords.some((k) => label(b).toLowerCase().includes(k)));
  if (!button) return null;
  button.click();
  return label(button);
}})()"#,
            keywords = js_literal(keywords)
        );
        self.eval(&script).await
    }

    async fn wait_for_acknowledgment(
        &mut self,
        matcher: &AckMatcher,
        timeout_ms: u64,
    ) -> Result<Option<Acknowledgment>> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let seen = self
                .responses
                .lock()
                .await
                .iter()
                .find(|r| matcher.matches(&r.url))
                .cloned();
            if let Some(seen) = seen {
                let body = self.response_body(&seen.request_id).await;
                return Ok(Some(Acknowledgment {
                    url: seen.url,
                    status: seen.status,
                    body,
                }));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .context("failed to capture screenshot")
    }

    async fn settle(&mut self) {
        let quiet = tokio::time::timeout(SETTLE_IDLE_TIMEOUT, async {
            loop {
                let ready: bool = self
                    .eval("document.readyState === 'complete'")
                    .await
                    .unwrap_or(false);
                if ready && self.network_quiet().await {
                    return;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await;

        if quiet.is_err() {
            tracing::debug!("page never went idle, using fixed settle delay");
            tokio::time::sleep(SETTLE_FALLBACK_DELAY).await;
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let _ = self.page.close().await;
        Ok(())
    }
}
