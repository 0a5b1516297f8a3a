//! Stable report schema and the raw-output normalizer.
//!
//! The [`Report`] shape is the contract with the presentation layer: it never
//! changes when axe-core adds fields. [`normalize`] copies the raw engine
//! output into it, preserving element order within each collection exactly as
//! the engine produced it (engine order, stable — this system does not sort).

use crate::engine::{RawFindings, RawNode, RawOutcome, RawViolation};
use serde::{Deserialize, Serialize};

/// Severity assigned by the rule engine to a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Minor,
    Moderate,
    Serious,
    Critical,
}

impl ImpactLevel {
    /// Parse the engine's impact string. Unknown or missing values degrade to
    /// `Minor` with a warning rather than failing the whole report.
    fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some("minor") => Self::Minor,
            Some("moderate") => Self::Moderate,
            Some("serious") => Self::Serious,
            Some("critical") => Self::Critical,
            other => {
                tracing::warn!("unrecognized impact level {other:?}, treating as minor");
                Self::Minor
            }
        }
    }
}

/// A single element matched by a violated rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementMatch {
    /// HTML snippet of the offending element.
    pub html: String,
    /// Selector path identifying the element, outermost frame first.
    pub target: Vec<String>,
    /// Remediation summary produced by the engine, when available.
    #[serde(rename = "failureSummary", skip_serializing_if = "Option::is_none")]
    pub failure_summary: Option<String>,
}

/// A single rule violation with severity, affected elements, and docs link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Short human-readable rule label.
    pub help: String,
    pub description: String,
    pub impact: ImpactLevel,
    /// Reference documentation for the rule.
    #[serde(rename = "helpUrl")]
    pub help_url: String,
    /// Standard identifiers the rule belongs to (e.g. "wcag2aa", "best-practice").
    pub tags: Vec<String>,
    pub nodes: Vec<ElementMatch>,
}

/// A pass/incomplete/inapplicable rule record — label and description only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub help: String,
    pub description: String,
}

/// An immutable audit report. Created once by [`normalize`], destroyed only by
/// store eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// The audited target URL.
    pub url: String,
    /// Creation instant, RFC 3339 UTC.
    pub timestamp: String,
    pub violations: Vec<Finding>,
    pub passes: Vec<RuleOutcome>,
    pub incomplete: Vec<RuleOutcome>,
    pub inapplicable: Vec<RuleOutcome>,
}

/// Shape raw engine output into a [`Report`] for the given URL.
///
/// Pure and total: any `RawFindings` that passed the adapter's deserialization
/// normalizes without error.
pub fn normalize(raw: RawFindings, url: &str) -> Report {
    Report {
        url: url.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        violations: raw.violations.into_iter().map(finding_from_raw).collect(),
        passes: raw.passes.into_iter().map(outcome_from_raw).collect(),
        incomplete: raw.incomplete.into_iter().map(outcome_from_raw).collect(),
        inapplicable: raw.inapplicable.into_iter().map(outcome_from_raw).collect(),
    }
}

fn finding_from_raw(v: RawViolation) -> Finding {
    Finding {
        help: v.help,
        description: v.description,
        impact: ImpactLevel::from_raw(v.impact.as_deref()),
        help_url: v.help_url,
        tags: v.tags,
        nodes: v.nodes.into_iter().map(node_from_raw).collect(),
    }
}

fn node_from_raw(n: RawNode) -> ElementMatch {
    ElementMatch {
        html: n.html,
        target: n.target,
        failure_summary: n.failure_summary,
    }
}

fn outcome_from_raw(o: RawOutcome) -> RuleOutcome {
    RuleOutcome {
        help: o.help,
        description: o.description,
    }
}
