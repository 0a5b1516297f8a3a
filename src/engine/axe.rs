//! axe-core adapter: fetches the engine script from a trusted versioned
//! source, injects it into the page, and runs it against the document.

use super::{RawFindings, RuleEngine};
use crate::browser::Page;
use crate::error::AuditError;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Pinned axe-core release served by cdnjs.
pub const DEFAULT_AXE_SOURCE_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/axe-core/4.7.0/axe.min.js";

/// Rule-tag baseline: WCAG 2.0 A + AA plus best-practice rules.
const RULE_TAGS: &[&str] = &["wcag2a", "wcag2aa", "best-practice"];

/// In-page runner. axe.run signals completion exactly once through its
/// callback; the promise resolves with either `{results}` or `{error}`, so
/// the host always sees one outcome per invocation. The payload crosses the
/// context boundary as a JSON string and is parsed host-side, so the bridge
/// never depends on return-by-value conversion of a large result object.
const RUN_SCRIPT: &str = r#"
(async () => {
    const config = {
        runOnly: { type: 'tag', values: ['wcag2a', 'wcag2aa', 'best-practice'] },
        reporter: 'v2'
    };
    return await new Promise((resolve) => {
        window.axe.run(document, config, (err, results) => {
            if (err) {
                resolve(JSON.stringify({ error: String((err && err.message) || err) }));
                return;
            }
            resolve(JSON.stringify({ results }));
        });
    });
})()
"#;

/// The in-page promise resolution: exactly one of `results` or `error`.
#[derive(Debug, Deserialize)]
struct RunOutcome {
    #[serde(default)]
    results: Option<RawFindings>,
    #[serde(default)]
    error: Option<String>,
}

/// Rule engine adapter for axe-core.
///
/// The script source is fetched once per process and cached in memory;
/// every injection reuses the cached source.
pub struct AxeRunner {
    source_url: String,
    client: reqwest::Client,
    source: OnceCell<String>,
}

impl AxeRunner {
    /// Create a runner fetching axe-core from the default pinned CDN release.
    pub fn new() -> Self {
        Self::with_source_url(DEFAULT_AXE_SOURCE_URL)
    }

    /// Create a runner fetching axe-core from a custom URL (offline mirrors,
    /// test stubs).
    pub fn with_source_url(source_url: &str) -> Self {
        Self {
            source_url: source_url.to_string(),
            client: reqwest::Client::new(),
            source: OnceCell::new(),
        }
    }

    /// Rule tags this runner selects.
    pub fn rule_tags() -> &'static [&'static str] {
        RULE_TAGS
    }

    async fn fetch_source(&self) -> Result<&str, AuditError> {
        self.source
            .get_or_try_init(|| async {
                debug!("fetching axe-core from {}", self.source_url);
                let resp = self
                    .client
                    .get(&self.source_url)
                    .send()
                    .await
                    .map_err(|e| {
                        AuditError::Injection(format!("failed to fetch axe-core: {e}"))
                    })?;
                if !resp.status().is_success() {
                    return Err(AuditError::Injection(format!(
                        "axe-core source returned HTTP {}",
                        resp.status()
                    )));
                }
                let body = resp.text().await.map_err(|e| {
                    AuditError::Injection(format!("failed to read axe-core body: {e}"))
                })?;
                info!("axe-core fetched ({} bytes)", body.len());
                Ok(body)
            })
            .await
            .map(String::as_str)
    }
}

impl Default for AxeRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleEngine for AxeRunner {
    async fn inject(&self, page: &dyn Page) -> Result<(), AuditError> {
        let source = self.fetch_source().await?;

        page.evaluate(source)
            .await
            .map_err(|e| AuditError::Injection(format!("page rejected engine script: {e}")))?;

        // The script may load without defining the global if the page
        // navigated away mid-injection.
        let present = page
            .evaluate("typeof window.axe !== 'undefined'")
            .await
            .map_err(|e| AuditError::Injection(format!("injection check failed: {e}")))?;
        if present.as_bool() != Some(true) {
            return Err(AuditError::Injection(
                "axe global missing after injection".into(),
            ));
        }
        Ok(())
    }

    async fn evaluate(&self, page: &dyn Page) -> Result<RawFindings, AuditError> {
        let value = page.evaluate(RUN_SCRIPT).await?;

        let payload = value.as_str().ok_or_else(|| {
            AuditError::Evaluation("engine resolved a non-string payload".into())
        })?;
        let outcome: RunOutcome = serde_json::from_str(payload)
            .map_err(|e| AuditError::Evaluation(format!("unparseable engine output: {e}")))?;

        if let Some(message) = outcome.error {
            return Err(AuditError::Evaluation(format!(
                "engine errored in page context: {message}"
            )));
        }
        outcome
            .results
            .ok_or_else(|| AuditError::Evaluation("engine resolved without results".into()))
    }
}
