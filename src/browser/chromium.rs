//! Chromium-based session manager using chromiumoxide.

use super::{Page, Session, SessionManager};
use crate::error::AuditError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long the resource count must hold stable before the page counts as quiescent.
const QUIESCENCE_WINDOW: Duration = Duration::from_millis(500);

/// Polling interval for the quiescence check.
const QUIESCENCE_POLL: Duration = Duration::from_millis(200);

/// Upper bound on the quiescence wait. Pages that never go network-idle
/// (persistent polling, analytics beacons) proceed after this budget.
const QUIESCENCE_BUDGET: Duration = Duration::from_secs(10);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. A11Y_AUDIT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("A11Y_AUDIT_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.a11y-audit/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".a11y-audit/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".a11y-audit/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".a11y-audit/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".a11y-audit/chromium/chrome-linux64/chrome"),
                home.join(".a11y-audit/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    if let Ok(path) = which::which("google-chrome") {
        return Some(path);
    }
    if let Ok(path) = which::which("chromium") {
        return Some(path);
    }
    if let Ok(path) = which::which("chromium-browser") {
        return Some(path);
    }

    // 4. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Session manager launching one headless Chromium process per audit request.
pub struct ChromiumSessionManager {
    chrome_path: PathBuf,
}

impl ChromiumSessionManager {
    /// Locate the Chromium binary; fails if none is installed.
    pub fn discover() -> Result<Self, AuditError> {
        let chrome_path = find_chromium().ok_or_else(|| {
            AuditError::Launch("Chromium not found. Run `a11y-audit doctor`.".into())
        })?;
        Ok(Self { chrome_path })
    }

    /// Path to the Chromium binary this manager launches.
    pub fn chrome_path(&self) -> &PathBuf {
        &self.chrome_path
    }
}

#[async_trait]
impl SessionManager for ChromiumSessionManager {
    async fn acquire(&self) -> Result<Box<dyn Session>, AuditError> {
        let config = BrowserConfig::builder()
            .chrome_executable(self.chrome_path.clone())
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| AuditError::Launch(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AuditError::Launch(format!("failed to launch Chromium: {e}")))?;

        // Drain CDP events until the browser goes away
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
        }))
    }
}

/// A single headless Chromium process.
pub struct ChromiumSession {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl Session for ChromiumSession {
    async fn open_page(&self) -> Result<Box<dyn Page>, AuditError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AuditError::Launch(format!("failed to open page: {e}")))?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(mut self: Box<Self>) {
        if let Err(e) = self.browser.close().await {
            warn!("browser close failed (ignored on cleanup path): {e}");
        }
        if let Err(e) = self.browser.wait().await {
            warn!("browser wait failed (ignored on cleanup path): {e}");
        }
        self.handler_task.abort();
    }
}

/// A single Chromium page.
pub struct ChromiumPage {
    page: chromiumoxide::page::Page,
}

impl ChromiumPage {
    /// Wait until the page's resource count holds stable for [`QUIESCENCE_WINDOW`],
    /// giving up after [`QUIESCENCE_BUDGET`].
    async fn wait_for_network_idle(&self) {
        let start = Instant::now();
        let mut last_count: i64 = -1;
        let mut stable_since = Instant::now();

        while start.elapsed() < QUIESCENCE_BUDGET {
            let count = match self
                .page
                .evaluate("performance.getEntriesByType('resource').length")
                .await
                .ok()
                .and_then(|r| r.into_value::<i64>().ok())
            {
                Some(c) => c,
                None => break, // page context unavailable, nothing to wait for
            };

            if count != last_count {
                last_count = count;
                stable_since = Instant::now();
            } else if stable_since.elapsed() >= QUIESCENCE_WINDOW {
                debug!(
                    resources = count,
                    waited_ms = start.elapsed().as_millis() as u64,
                    "page reached network quiescence"
                );
                return;
            }
            tokio::time::sleep(QUIESCENCE_POLL).await;
        }
        warn!(
            budget_ms = QUIESCENCE_BUDGET.as_millis() as u64,
            "page never reached network quiescence, proceeding anyway"
        );
    }
}

#[async_trait]
impl Page for ChromiumPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AuditError> {
        let result = tokio::time::timeout(timeout, self.page.goto(url)).await;

        match result {
            Ok(Ok(_response)) => {
                let _ = self.page.wait_for_navigation().await;
                self.wait_for_network_idle().await;
                Ok(())
            }
            Ok(Err(e)) => Err(AuditError::Navigation(format!("navigation failed: {e}"))),
            Err(_) => Err(AuditError::Navigation(format!(
                "navigation timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, AuditError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| AuditError::Evaluation(format!("JS execution failed: {e}")))?;

        // A remote object of type `undefined` carries no value. Scripts
        // evaluated for effect (engine injection) complete with `undefined`,
        // so that is a null result here, not a conversion error.
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn url(&self) -> Result<String, AuditError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| AuditError::Navigation(format!("failed to get URL: {e}")))?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{Page as _, Session as _, SessionManager as _};

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_navigate_and_evaluate() {
        let manager = ChromiumSessionManager::discover().expect("chromium not found");
        let session = manager.acquire().await.expect("failed to launch");
        let page = session.open_page().await.expect("failed to open page");

        page.navigate(
            "data:text/html,<h1>Hello</h1><p>World</p>",
            Duration::from_secs(10),
        )
        .await
        .expect("navigation failed");

        let result = page
            .evaluate("document.querySelector('h1').textContent")
            .await
            .expect("JS execution failed");
        assert_eq!(result.as_str().unwrap(), "Hello");

        // Object-valued completion comes back by value
        let result = page
            .evaluate("({ heading: document.querySelector('h1').textContent, count: 2 })")
            .await
            .expect("object evaluation failed");
        assert_eq!(result["heading"], "Hello");
        assert_eq!(result["count"], 2);

        // Effect-only scripts complete with `undefined`, which is null here,
        // not an error — engine injection depends on this
        let result = page
            .evaluate("void (window.__marker = 42)")
            .await
            .expect("undefined-valued evaluation failed");
        assert!(result.is_null());
        let result = page
            .evaluate("window.__marker")
            .await
            .expect("marker read failed");
        assert_eq!(result.as_i64().unwrap(), 42);

        session.close().await;
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_navigation_failure_on_unresolvable_host() {
        let manager = ChromiumSessionManager::discover().expect("chromium not found");
        let session = manager.acquire().await.expect("failed to launch");
        let page = session.open_page().await.expect("failed to open page");

        let err = page
            .navigate(
                "https://definitely-not-a-real-host.invalid/",
                Duration::from_secs(10),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "navigation_failure");

        session.close().await;
    }
}
