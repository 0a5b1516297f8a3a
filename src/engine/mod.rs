//! Rule-evaluation engine adapter.
//!
//! The engine itself is a black box loaded into the remote page context:
//! given the document and a rule-tag selection it classifies results as
//! violations, passes, incomplete, and inapplicable. This module pins down
//! the raw output schema at the adapter boundary — malformed engine output
//! is rejected here rather than propagated uninspected.

pub mod axe;

use crate::browser::Page;
use crate::error::AuditError;
use async_trait::async_trait;
use serde::Deserialize;

/// A rule engine that can be loaded into a page and invoked there.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// Load the engine script into the page's execution context.
    async fn inject(&self, page: &dyn Page) -> Result<(), AuditError>;

    /// Run the engine against the page's document and bring the raw results
    /// back across the context boundary. Exactly one outcome per invocation.
    async fn evaluate(&self, page: &dyn Page) -> Result<RawFindings, AuditError>;
}

/// Raw engine output, validated by serde at the adapter boundary.
///
/// Unknown extra fields are ignored; missing collections default to empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFindings {
    #[serde(default)]
    pub violations: Vec<RawViolation>,
    #[serde(default)]
    pub passes: Vec<RawOutcome>,
    #[serde(default)]
    pub incomplete: Vec<RawOutcome>,
    #[serde(default)]
    pub inapplicable: Vec<RawOutcome>,
}

/// A raw violation record as the engine reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawViolation {
    pub help: String,
    #[serde(default)]
    pub description: String,
    /// Engine severity string; absent for a handful of experimental rules.
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(rename = "helpUrl", default)]
    pub help_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<RawNode>,
}

/// A raw affected-element record within a violation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub target: Vec<String>,
    #[serde(rename = "failureSummary", default)]
    pub failure_summary: Option<String>,
}

/// A raw pass/incomplete/inapplicable record.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOutcome {
    pub help: String,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_findings_tolerates_extra_fields() {
        let raw: RawFindings = serde_json::from_value(serde_json::json!({
            "violations": [{
                "help": "h", "description": "d", "impact": "serious",
                "helpUrl": "u", "tags": ["wcag2a"],
                "nodes": [{"html": "<a>", "target": ["a"], "failureSummary": "fix", "any": [], "all": []}],
                "id": "link-name"
            }],
            "passes": [{"help": "p", "description": "d", "id": "lang"}],
            "incomplete": [],
            "inapplicable": [],
            "testEngine": {"name": "axe-core", "version": "4.7.0"},
            "timestamp": "2024-01-01T00:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(raw.violations.len(), 1);
        assert_eq!(raw.violations[0].nodes[0].target, vec!["a"]);
        assert_eq!(raw.passes.len(), 1);
    }

    #[test]
    fn test_raw_findings_missing_collections_default_empty() {
        let raw: RawFindings = serde_json::from_value(serde_json::json!({
            "violations": []
        }))
        .unwrap();
        assert!(raw.violations.is_empty());
        assert!(raw.passes.is_empty());
        assert!(raw.inapplicable.is_empty());
    }

    #[test]
    fn test_raw_findings_rejects_wrong_shape() {
        let result: Result<RawFindings, _> = serde_json::from_value(serde_json::json!({
            "violations": [{"description": 42}]
        }));
        assert!(result.is_err());
    }
}
