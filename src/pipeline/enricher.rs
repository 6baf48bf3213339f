//! Heuristic, keyword-driven attribute extraction.

use crate::domain::{EnrichmentResult, RawJob};
use regex::Regex;
use std::sync::LazyLock;

const SKILL_TAXONOMY: &[(&str, &[&str])] = &[
    ("languages", &["rust", "python", "java", "typescript", "go", "c++", "kotlin"]),
    ("data", &["sql", "postgres", "mongodb", "redis", "kafka", "spark"]),
    ("infra", &["kubernetes", "docker", "aws", "gcp", "azure", "terraform"]),
    ("web", &["react", "vue", "graphql", "rest", "grpc"]),
];

static SALARY_AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d,]+(?:\.\d+)?").unwrap());

const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("engineering", &["engineer", "developer", "software", "backend", "frontend"]),
    ("data", &["data scientist", "data analyst", "machine learning", "ml engineer"]),
    ("design", &["designer", "ux", "ui"]),
    ("sales", &["sales", "account executive", "business development"]),
    ("marketing", &["marketing", "growth", "seo"]),
];

const SENIORITY_KEYWORDS: &[(&str, &[&str])] = &[
    ("intern", &["intern", "internship"]),
    ("junior", &["junior", "entry level", "associate"]),
    ("senior", &["senior", "staff", "principal", "lead"]),
    ("mid", &["mid level", "intermediate"]),
];

const REMOTE_KEYWORDS: &[(&str, &[&str])] = &[
    ("remote", &["remote", "work from home", "wfh", "distributed"]),
    ("hybrid", &["hybrid"]),
    ("on_site", &["on-site", "onsite", "in office", "in-office"]),
];

const BENEFIT_KEYWORDS: &[&str] = &[
    "health insurance", "401k", "dental", "vision", "pto", "unlimited vacation", "equity", "stock options",
];

fn enrich_skills(text: &str) -> (Vec<String>, f64) {
    let mut found = Vec::new();
    for (_, skills) in SKILL_TAXONOMY {
        for skill in *skills {
            if text.contains(skill) {
                found.push(skill.to_string());
            }
        }
    }
    let confidence = (found.len() as f64 / 10.0).min(1.0);
    (found, confidence)
}

struct SalaryNorm {
    min: Option<f64>,
    max: Option<f64>,
    currency: &'static str,
    period: &'static str,
    original_text: String,
}

fn enrich_salary(text: &str, original: &str) -> (SalaryNorm, f64) {
    let amounts: Vec<f64> = SALARY_AMOUNT_RE
        .find_iter(original)
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .collect();

    let currency = if original.contains('$') {
        "USD"
    } else if original.contains('€') {
        "EUR"
    } else if original.contains('£') {
        "GBP"
    } else {
        "unknown"
    };

    let period = if text.contains("hour") || text.contains("/hr") {
        "hour"
    } else if text.contains("week") {
        "week"
    } else if text.contains("month") {
        "month"
    } else {
        "year"
    };

    let confidence = if amounts.len() >= 2 { 0.8 } else if amounts.len() == 1 { 0.6 } else { 0.0 };

    (
        SalaryNorm {
            min: amounts.first().copied(),
            max: amounts.get(1).copied(),
            currency,
            period,
            original_text: original.to_string(),
        },
        confidence,
    )
}

struct LocationNorm {
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    remote: bool,
}

fn enrich_location(location: &str) -> (LocationNorm, f64) {
    let lower = location.to_lowercase();
    let remote = lower.contains("remote") || lower.contains("wfh");
    let parts: Vec<&str> = location.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();

    let (city, state, country) = match parts.len() {
        0 => (None, None, None),
        1 => (Some(parts[0].to_string()), None, None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string()), None),
        _ => (
            Some(parts[0].to_string()),
            Some(parts[1].to_string()),
            Some(parts[parts.len() - 1].to_string()),
        ),
    };

    let confidence = if parts.len() >= 2 { 0.7 } else { 0.4 };
    (LocationNorm { city, state, country, remote }, confidence)
}

fn best_label(text: &str, table: &[(&'static str, &[&'static str])], default: &'static str, threshold: f64) -> (String, f64) {
    let mut best: Option<(&str, f64)> = None;
    for (label, keywords) in table {
        let score: f64 = keywords.iter().filter(|kw| text.contains(**kw)).count() as f64;
        if score > 0.0 {
            let better = match best {
                Some((_, best_score)) => score > best_score,
                None => true,
            };
            if better {
                best = Some((label, score));
            }
        }
    }
    match best {
        Some((label, score)) => (label.to_string(), (score / threshold).min(1.0)),
        None => (default.to_string(), 0.0),
    }
}

pub fn enrich(job: &RawJob) -> EnrichmentResult {
    let mut result = EnrichmentResult::default();
    let text = format!("{} {}", job.title, job.description).to_lowercase();

    let (skills, skills_conf) = enrich_skills(&text);
    result.insert("skills", serde_json::json!(skills), skills_conf);

    if let Some(salary_text) = &job.salary {
        let (norm, conf) = enrich_salary(&text, salary_text);
        result.insert(
            "salary_norm",
            serde_json::json!({
                "min": norm.min,
                "max": norm.max,
                "currency": norm.currency,
                "period": norm.period,
                "original_text": norm.original_text,
            }),
            conf,
        );
    }

    let (loc, loc_conf) = enrich_location(&job.location);
    result.insert(
        "location_norm",
        serde_json::json!({
            "city": loc.city,
            "state": loc.state,
            "country": loc.country,
            "remote": loc.remote,
        }),
        loc_conf,
    );

    let (category, cat_conf) = best_label(&text, CATEGORY_KEYWORDS, "other", 3.0);
    result.insert("category", category, cat_conf);

    let (seniority, sen_conf) = best_label(&text, SENIORITY_KEYWORDS, "mid", 2.0);
    result.insert("seniority", seniority, sen_conf);

    let (remote_type, remote_conf) = best_label(&text, REMOTE_KEYWORDS, "on_site", 2.0);
    result.insert("remote_type", remote_type, remote_conf);

    let benefits: Vec<&str> = BENEFIT_KEYWORDS.iter().filter(|kw| text.contains(*kw)).copied().collect();
    let benefits_conf = (benefits.len() as f64 / 5.0).min(1.0);
    result.insert("benefits", serde_json::json!(benefits), benefits_conf);

    result
}
