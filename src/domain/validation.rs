//! Validator output types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Quality-score penalty applied for an issue of this severity.
    pub fn penalty(self) -> f64 {
        match self {
            Severity::Info => 0.05,
            Severity::Warning => 0.15,
            Severity::Error => 0.30,
            Severity::Critical => 0.50,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub rule: &'static str,
    pub severity: Severity,
    pub field: &'static str,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
    pub quality_score: f64,
    pub is_valid: bool,
}

impl ValidationResult {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let penalty: f64 = issues.iter().map(|i| i.severity.penalty()).sum();
        let quality_score = (1.0 - penalty).max(0.0);
        let quality_score = (quality_score * 1000.0).round() / 1000.0;
        let is_valid = !issues.iter().any(|i| i.severity == Severity::Critical);
        Self {
            issues,
            quality_score,
            is_valid,
        }
    }
}
