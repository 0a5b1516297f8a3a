//! Per-request audit orchestration.
//!
//! Composes the browser session layer, rule engine adapter, normalizer, and
//! report store into the submit-a-url lifecycle. Stages advance strictly in
//! sequence; a failure at any stage skips straight to cleanup. The session
//! acquired for a request is closed exactly once, on success and failure
//! paths alike, before the result is produced, and nothing is stored unless
//! every stage succeeded.

use crate::browser::{Session, SessionManager};
use crate::engine::{RawFindings, RuleEngine};
use crate::error::AuditError;
use crate::report::{self, Report};
use crate::store::ReportStore;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default upper bound on page navigation.
pub const DEFAULT_NAV_TIMEOUT: Duration = Duration::from_secs(30);

/// Stages of a single audit request, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStage {
    Received,
    SessionAcquiring,
    Navigating,
    Injecting,
    Evaluating,
    Normalizing,
    Stored,
}

impl fmt::Display for AuditStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::SessionAcquiring => "session_acquiring",
            Self::Navigating => "navigating",
            Self::Injecting => "injecting",
            Self::Evaluating => "evaluating",
            Self::Normalizing => "normalizing",
            Self::Stored => "stored",
        };
        f.write_str(name)
    }
}

/// Orchestrates audit requests end to end.
pub struct Orchestrator {
    sessions: Arc<dyn SessionManager>,
    engine: Arc<dyn RuleEngine>,
    store: Arc<ReportStore>,
    nav_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        sessions: Arc<dyn SessionManager>,
        engine: Arc<dyn RuleEngine>,
        store: Arc<ReportStore>,
    ) -> Self {
        Self {
            sessions,
            engine,
            store,
            nav_timeout: DEFAULT_NAV_TIMEOUT,
        }
    }

    /// Override the navigation timeout.
    pub fn with_nav_timeout(mut self, timeout: Duration) -> Self {
        self.nav_timeout = timeout;
        self
    }

    /// Run a full audit: validate, acquire a session, navigate, inject,
    /// evaluate, normalize, store. Returns the fresh report id and the
    /// report itself.
    pub async fn run_audit(&self, raw_url: &str) -> Result<(String, Report), AuditError> {
        debug!(stage = %AuditStage::Received, url = %raw_url, "audit request received");
        let url = validate_url(raw_url)?;
        debug!(stage = %AuditStage::SessionAcquiring, url = %url);

        let session = self.sessions.acquire().await?;

        // Drive the pipeline, then close the session before inspecting the
        // outcome so cleanup runs on every exit path.
        let outcome = self.drive(&*session, url.as_str()).await;
        session.close().await;
        let raw = outcome?;

        debug!(stage = %AuditStage::Normalizing, url = %url);
        let report = report::normalize(raw, url.as_str());
        let id = self.store.put(report.clone());
        info!(
            stage = %AuditStage::Stored,
            id = %id,
            url = %url,
            violations = report.violations.len(),
            passes = report.passes.len(),
            "audit complete"
        );
        Ok((id, report))
    }

    /// Look up a previously stored report. Stateless; absence covers both
    /// never-existed and expired.
    pub fn fetch_report(&self, id: &str) -> Option<Report> {
        self.store.get(id)
    }

    async fn drive(&self, session: &dyn Session, url: &str) -> Result<RawFindings, AuditError> {
        let page = session.open_page().await?;

        debug!(stage = %AuditStage::Navigating, url = %url);
        page.navigate(url, self.nav_timeout).await?;
        if let Ok(final_url) = page.url().await {
            if final_url != url {
                debug!(url = %url, final_url = %final_url, "page redirected");
            }
        }

        debug!(stage = %AuditStage::Injecting, url = %url);
        self.engine.inject(&*page).await?;

        debug!(stage = %AuditStage::Evaluating, url = %url);
        self.engine.evaluate(&*page).await
    }
}

/// Validate the submitted target URL: must parse as an absolute http(s) URL.
fn validate_url(raw: &str) -> Result<url::Url, AuditError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| AuditError::InvalidInput(format!("invalid URL {raw:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(AuditError::InvalidInput(format!(
            "unsupported URL scheme {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Page;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// What the stub pipeline should do at each stage.
    #[derive(Clone, Copy)]
    enum StubBehavior {
        Succeed,
        FailNavigation,
        FailEvaluation,
    }

    struct StubManager {
        behavior: StubBehavior,
        acquired: Arc<AtomicUsize>,
        released: Arc<AtomicUsize>,
    }

    impl StubManager {
        fn new(behavior: StubBehavior) -> Self {
            Self {
                behavior,
                acquired: Arc::new(AtomicUsize::new(0)),
                released: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl SessionManager for StubManager {
        async fn acquire(&self) -> Result<Box<dyn Session>, AuditError> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubSession {
                behavior: self.behavior,
                released: Arc::clone(&self.released),
            }))
        }
    }

    struct StubSession {
        behavior: StubBehavior,
        released: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Session for StubSession {
        async fn open_page(&self) -> Result<Box<dyn Page>, AuditError> {
            Ok(Box::new(StubPage {
                behavior: self.behavior,
            }))
        }

        async fn close(self: Box<Self>) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct StubPage {
        behavior: StubBehavior,
    }

    #[async_trait]
    impl Page for StubPage {
        async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<(), AuditError> {
            match self.behavior {
                StubBehavior::FailNavigation => {
                    Err(AuditError::Navigation("connection refused".into()))
                }
                _ => Ok(()),
            }
        }

        async fn evaluate(&self, _script: &str) -> Result<serde_json::Value, AuditError> {
            Ok(serde_json::Value::Null)
        }

        async fn url(&self) -> Result<String, AuditError> {
            Ok("https://example.com".into())
        }
    }

    struct StubEngine {
        behavior: StubBehavior,
    }

    #[async_trait]
    impl RuleEngine for StubEngine {
        async fn inject(&self, _page: &dyn Page) -> Result<(), AuditError> {
            Ok(())
        }

        async fn evaluate(&self, _page: &dyn Page) -> Result<RawFindings, AuditError> {
            match self.behavior {
                StubBehavior::FailEvaluation => {
                    Err(AuditError::Evaluation("script error".into()))
                }
                _ => Ok(RawFindings::default()),
            }
        }
    }

    fn orchestrator(
        behavior: StubBehavior,
    ) -> (Orchestrator, Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<ReportStore>) {
        let manager = StubManager::new(behavior);
        let acquired = Arc::clone(&manager.acquired);
        let released = Arc::clone(&manager.released);
        let store = Arc::new(ReportStore::new(Duration::from_secs(3600)));
        let orch = Orchestrator::new(
            Arc::new(manager),
            Arc::new(StubEngine { behavior }),
            Arc::clone(&store),
        );
        (orch, acquired, released, store)
    }

    #[tokio::test]
    async fn test_successful_audit_stores_one_report() {
        let (orch, acquired, released, store) = orchestrator(StubBehavior::Succeed);
        let (id, report) = orch.run_audit("https://example.com").await.unwrap();
        assert_eq!(report.url, "https://example.com");
        assert_eq!(store.len(), 1);
        assert_eq!(orch.fetch_report(&id), Some(report));
        assert_eq!(acquired.load(Ordering::SeqCst), 1);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_navigation_failure_releases_session_and_stores_nothing() {
        let (orch, _, released, store) = orchestrator(StubBehavior::FailNavigation);
        let err = orch.run_audit("https://example.com").await.unwrap_err();
        assert_eq!(err.kind(), "navigation_failure");
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_evaluation_failure_releases_session_and_stores_nothing() {
        let (orch, _, released, store) = orchestrator(StubBehavior::FailEvaluation);
        let err = orch.run_audit("https://example.com").await.unwrap_err();
        assert_eq!(err.kind(), "evaluation_failure");
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_before_session_launch() {
        let (orch, acquired, released, store) = orchestrator(StubBehavior::Succeed);
        let err = orch.run_audit("not-a-url").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert_eq!(acquired.load(Ordering::SeqCst), 0);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_non_http_scheme_rejected() {
        let (orch, _, _, _) = orchestrator(StubBehavior::Succeed);
        let err = orch.run_audit("ftp://example.com/file").await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn test_stage_names_are_stable() {
        let stages = [
            (AuditStage::Received, "received"),
            (AuditStage::SessionAcquiring, "session_acquiring"),
            (AuditStage::Navigating, "navigating"),
            (AuditStage::Injecting, "injecting"),
            (AuditStage::Evaluating, "evaluating"),
            (AuditStage::Normalizing, "normalizing"),
            (AuditStage::Stored, "stored"),
        ];
        for (stage, name) in stages {
            assert_eq!(stage.to_string(), name);
        }
    }

    #[test]
    fn test_validate_url_accepts_http_and_https() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("https://example.com/path?q=1").is_ok());
        assert!(validate_url("example.com").is_err());
        assert!(validate_url("javascript:alert(1)").is_err());
    }
}
