//! Browser session abstraction for driving audited pages.
//!
//! Defines the `SessionManager`, `Session`, and `Page` traits that abstract
//! over the browser engine (currently Chromium via chromiumoxide). Each audit
//! request gets its own session — no pooling or sharing across requests — so
//! there is no cross-request contention on browser state.

pub mod chromium;

use crate::error::AuditError;
use async_trait::async_trait;
use std::time::Duration;

/// Acquires transient browser sessions, one per audit request.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Launch a fresh headless browser process.
    async fn acquire(&self) -> Result<Box<dyn Session>, AuditError>;
}

/// A live browser process owning zero-or-more pages.
///
/// Pages are valid only while their owning session is open. The orchestrator
/// closes every session it acquires exactly once, on success and failure paths
/// alike.
#[async_trait]
pub trait Session: Send + Sync {
    /// Open a new blank page in this session.
    async fn open_page(&self) -> Result<Box<dyn Page>, AuditError>;

    /// Release the browser process. Idempotent and infallible by contract:
    /// release runs on cleanup paths, so errors are logged and swallowed.
    async fn close(self: Box<Self>);
}

/// A single navigable page within a session.
#[async_trait]
pub trait Page: Send + Sync {
    /// Navigate to a URL and wait until the page is ready to evaluate.
    ///
    /// Readiness is a network-quiescence heuristic: the page's resource count
    /// must hold stable for a short idle window. Pages with persistent
    /// background traffic (polling, analytics) over-wait up to a fixed settle
    /// budget, after which navigation proceeds anyway — a documented
    /// limitation of the heuristic, not a failure.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AuditError>;

    /// Execute JavaScript in the page context and return its JSON value.
    ///
    /// Promises are awaited: a script that returns a promise resolves exactly
    /// one outcome per invocation, value or error, never zero, never more.
    /// A script whose completion value is `undefined` yields JSON null.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, AuditError>;

    /// Current page URL, as the browser reports it.
    async fn url(&self) -> Result<String, AuditError>;
}
