//! Rule-based content validation and quality scoring.

use crate::domain::{RawJob, Severity, ValidationIssue, ValidationResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").unwrap());
static SALARY_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d,]+(?:\.\d+)?").unwrap());
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)lorem ipsum|\[[a-z_ ]+\]|x{3,}").unwrap());

/// Three-tier spam keyword table, carried over from the original
/// implementation's concrete risk levels (high=3, medium=2, low=1).
const HIGH_RISK_KEYWORDS: &[&str] = &["wire transfer", "processing fee", "guaranteed income", "pay upfront"];
const MEDIUM_RISK_KEYWORDS: &[&str] = &["work from home", "no experience needed", "easy money", "be your own boss"];
const LOW_RISK_KEYWORDS: &[&str] = &["urgent", "act now", "limited spots"];

fn required_field_issues(job: &RawJob) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if job.title.trim().is_empty() {
        issues.push(issue("required_field", Severity::Critical, "title", "title is empty", None));
    }
    if job.company.trim().is_empty() {
        issues.push(issue("required_field", Severity::Error, "company", "company is empty", None));
    }
    if job.description.trim().is_empty() {
        issues.push(issue("required_field", Severity::Error, "description", "description is empty", None));
    }
    if job.url.trim().is_empty() {
        issues.push(issue("required_field", Severity::Critical, "url", "url is empty", None));
    }
    if job.location.trim().is_empty() {
        issues.push(issue("required_field", Severity::Warning, "location", "location is empty", None));
    }
    issues
}

fn format_issues(job: &RawJob) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if !job.url.trim().is_empty() && !URL_RE.is_match(&job.url) {
        issues.push(issue(
            "url_format",
            Severity::Critical,
            "url",
            "url does not start with http(s)://",
            None,
        ));
    }
    if let Ok(parsed) = url::Url::parse(&job.url) {
        if parsed.host_str().is_none() {
            issues.push(issue("url_structure", Severity::Error, "url", "url has no authority", None));
        }
    } else if !job.url.trim().is_empty() {
        issues.push(issue("url_structure", Severity::Error, "url", "url is not parseable", None));
    }
    for m in EMAIL_RE.find_iter(&job.description) {
        if !m.as_str().contains('@') {
            issues.push(issue("email_format", Severity::Warning, "description", "malformed email-like token", None));
        }
    }
    issues
}

fn length_issues(job: &RawJob) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let title_len = job.title.chars().count();
    if title_len < 10 || title_len > 200 {
        issues.push(issue(
            "length_bounds",
            Severity::Warning,
            "title",
            format!("title length {title_len} outside [10, 200]"),
            None,
        ));
    }
    let desc_len = job.description.chars().count();
    if desc_len < 50 || desc_len > 10000 {
        issues.push(issue(
            "length_bounds",
            Severity::Warning,
            "description",
            format!("description length {desc_len} outside [50, 10000]"),
            None,
        ));
    }
    let company_len = job.company.chars().count();
    if company_len < 2 || company_len > 100 {
        issues.push(issue(
            "length_bounds",
            Severity::Info,
            "company",
            format!("company length {company_len} outside [2, 100]"),
            None,
        ));
    }
    issues
}

fn date_issues(job: &RawJob, now: DateTime<Utc>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if job.fetched_at > now + ChronoDuration::hours(1) {
        issues.push(issue("date_sanity", Severity::Warning, "fetched_at", "scrape time more than 1h in the future", None));
    }
    if job.fetched_at < now - ChronoDuration::days(365) {
        issues.push(issue("date_sanity", Severity::Info, "fetched_at", "scrape time more than 1y old", None));
    }
    if let Some(posted) = job.posted_date {
        if posted > now + ChronoDuration::days(1) {
            issues.push(issue("date_sanity", Severity::Warning, "posted_date", "posted date more than 1d in the future", None));
        }
    }
    issues
}

fn salary_issues(job: &RawJob) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let Some(salary) = &job.salary else {
        return issues;
    };
    let amounts: Vec<f64> = SALARY_NUMBER_RE
        .find_iter(salary)
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .collect();
    if amounts.is_empty() {
        return issues;
    }
    let is_hourly = salary.to_lowercase().contains("hour") || salary.to_lowercase().contains("/hr");
    if !is_hourly {
        for &amount in &amounts {
            if amount > 1_000_000.0 {
                issues.push(issue("salary_sanity", Severity::Warning, "salary", "annual salary exceeds 1,000,000", None));
            }
            if amount < 1_000.0 {
                issues.push(issue("salary_sanity", Severity::Warning, "salary", "annual salary below 1,000", None));
            }
        }
    }
    if amounts.len() >= 2 && amounts[0] > amounts[1] {
        issues.push(issue("salary_sanity", Severity::Error, "salary", "salary range is inverted (min > max)", None));
    }
    issues
}

fn content_quality_issues(job: &RawJob) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if PLACEHOLDER_RE.is_match(&job.description) || PLACEHOLDER_RE.is_match(&job.title) {
        issues.push(issue("content_quality", Severity::Error, "description", "contains placeholder text", None));
    }

    let words: Vec<String> = job
        .description
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.len() > 3)
        .collect();
    if !words.is_empty() {
        let mut counts = std::collections::HashMap::new();
        for w in &words {
            *counts.entry(w.clone()).or_insert(0usize) += 1;
        }
        if let Some((_, &max_count)) = counts.iter().max_by_key(|&(_, &c)| c) {
            if max_count as f64 / words.len() as f64 > 0.10 {
                issues.push(issue("content_quality", Severity::Warning, "description", "a word repeats more than 10% of the time", None));
            }
        }
    }
    if words.len() < 10 {
        issues.push(issue("content_quality", Severity::Warning, "description", "fewer than 10 meaningful words", None));
    }
    issues
}

fn language_issues(job: &RawJob) -> Vec<ValidationIssue> {
    let text = &job.description;
    let english_markers = ["the", "and", "for", "with", "you", "our", "team", "work"];
    let lower = text.to_lowercase();
    let english_count = english_markers.iter().filter(|m| lower.contains(*m)).count();
    let non_english = text.chars().any(|c| {
        let code = c as u32;
        (0x4E00..=0x9FFF).contains(&code) || (0x0600..=0x06FF).contains(&code) || (0x0400..=0x04FF).contains(&code)
    });
    if english_count < 3 && non_english {
        vec![issue("language_detection", Severity::Info, "description", "likely non-English content", None)]
    } else {
        Vec::new()
    }
}

fn spam_score_issue(job: &RawJob) -> Option<ValidationIssue> {
    let text = format!("{} {}", job.title, job.description).to_lowercase();
    let mut score = 0i32;

    for kw in HIGH_RISK_KEYWORDS {
        if text.contains(kw) {
            score += 3;
        }
    }
    for kw in MEDIUM_RISK_KEYWORDS {
        if text.contains(kw) {
            score += 2;
        }
    }
    for kw in LOW_RISK_KEYWORDS {
        if text.contains(kw) {
            score += 1;
        }
    }

    let title = &job.title;
    if !title.is_empty() {
        let caps = title.chars().filter(|c| c.is_uppercase()).count();
        let letters = title.chars().filter(|c| c.is_alphabetic()).count();
        if letters > 0 && caps as f64 / letters as f64 > 0.7 {
            score += 2;
        }
    }

    let punct_count = job.description.chars().filter(|c| *c == '!' || *c == '?').count();
    if punct_count > 10 {
        score += 1;
    }

    let severity = match score {
        s if s >= 5 => Some(Severity::Error),
        s if s >= 3 => Some(Severity::Warning),
        s if s >= 1 => Some(Severity::Info),
        _ => None,
    };

    severity.map(|sev| issue("spam_score", sev, "description", format!("spam score {score}"), None))
}

fn issue(
    rule: &'static str,
    severity: Severity,
    field: &'static str,
    message: impl Into<String>,
    suggestion: Option<String>,
) -> ValidationIssue {
    ValidationIssue {
        rule,
        severity,
        field,
        message: message.into(),
        suggestion,
    }
}

/// Runs the full rule catalog against `job`. `is_duplicate` comes from the
/// deduplicator and is folded in as a dedicated issue when true.
pub fn validate(job: &RawJob, is_duplicate: bool, now: DateTime<Utc>) -> ValidationResult {
    let mut issues = Vec::new();
    issues.extend(required_field_issues(job));
    issues.extend(format_issues(job));
    issues.extend(length_issues(job));
    issues.extend(date_issues(job, now));
    issues.extend(salary_issues(job));
    issues.extend(content_quality_issues(job));
    issues.extend(language_issues(job));
    if let Some(spam) = spam_score_issue(job) {
        issues.push(spam);
    }
    if is_duplicate {
        issues.push(issue("duplicate_detection", Severity::Info, "url", "duplicate of an existing job", None));
    }
    ValidationResult::from_issues(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn good_job() -> RawJob {
        RawJob {
            title: "Senior Backend Engineer".to_string(),
            company: "Acme Corp".to_string(),
            location: "Remote".to_string(),
            description: "We are looking for an experienced backend engineer to join our growing platform team and help build reliable distributed systems.".to_string(),
            salary: Some("$120,000 - $150,000".to_string()),
            posted_date: None,
            url: "https://acme.example/jobs/1".to_string(),
            board_id: "b1".to_string(),
            board_name: "Board".to_string(),
            fetched_at: Utc::now(),
            engine: crate::domain::EngineKind::Static,
        }
    }

    #[test]
    fn well_formed_job_is_valid() {
        let result = validate(&good_job(), false, Utc::now());
        assert!(result.is_valid);
        assert!(result.quality_score > 0.8);
    }

    #[test]
    fn missing_title_is_critical_and_invalid() {
        let mut job = good_job();
        job.title = String::new();
        let result = validate(&job, false, Utc::now());
        assert!(!result.is_valid);
        assert!(result.issues.iter().any(|i| i.severity == Severity::Critical));
    }

    #[test]
    fn inverted_salary_range_is_error() {
        let mut job = good_job();
        job.salary = Some("$150,000 - $90,000".to_string());
        let result = validate(&job, false, Utc::now());
        assert!(result.issues.iter().any(|i| i.rule == "salary_sanity" && i.severity == Severity::Error));
    }

    #[test]
    fn excessive_caps_contributes_to_spam_score() {
        let mut job = good_job();
        job.title = "URGENT HIRING NOW APPLY TODAY".to_string();
        let result = validate(&job, false, Utc::now());
        assert!(result.issues.iter().any(|i| i.rule == "spam_score"));
    }

    #[test]
    fn quality_score_is_rounded_to_three_decimals() {
        let result = validate(&good_job(), false, Utc::now());
        let scaled = result.quality_score * 1000.0;
        assert!((scaled - scaled.round()).abs() < 1e-9);
    }

    #[test]
    fn future_posted_date_is_warning() {
        let mut job = good_job();
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        job.posted_date = Some(now + ChronoDuration::days(5));
        let result = validate(&job, false, now);
        assert!(result.issues.iter().any(|i| i.rule == "date_sanity" && i.field == "posted_date"));
    }
}
