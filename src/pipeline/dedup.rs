//! Content fingerprinting and fuzzy-duplicate detection.

use crate::domain::{Fingerprint, RawJob};
use indexmap::IndexMap;
use md5::{Digest, Md5};
use std::collections::HashSet;
use std::sync::Mutex;
use unicode_normalization::UnicodeNormalization;

const STOP_PREFIXES_SUFFIXES: &[&str] = &["senior", "remote", "full time", "junior", "lead"];
const LOCATION_ALIASES: &[(&str, &str)] = &[("wfh", "remote"), ("nyc", "new york"), ("sf", "san francisco")];
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "are", "you", "your", "our", "will", "have",
];

/// NFKC folds visually-equivalent forms (e.g. composed vs. decomposed
/// accents, full-width punctuation) to the same codepoints before
/// case-folding, so the same listing scraped from two boards with slightly
/// different encodings still fingerprints identically.
fn normalize_text(input: &str) -> String {
    let folded: String = input.nfkc().collect();
    let lower = folded.to_lowercase();
    let stripped: String = lower
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    let mut words: Vec<&str> = stripped.split_whitespace().collect();

    while let Some(first) = words.first() {
        if STOP_PREFIXES_SUFFIXES.contains(first) {
            words.remove(0);
        } else {
            break;
        }
    }
    while let Some(last) = words.last() {
        if STOP_PREFIXES_SUFFIXES.contains(last) {
            words.pop();
        } else {
            break;
        }
    }

    words.join(" ")
}

fn normalize_location(input: &str) -> String {
    let normalized = normalize_text(input);
    for (alias, canonical) in LOCATION_ALIASES {
        if normalized == *alias {
            return canonical.to_string();
        }
    }
    normalized
}

fn normalize_url(input: &str) -> String {
    match url::Url::parse(input) {
        Ok(u) => {
            let scheme = u.scheme();
            let host = u.host_str().unwrap_or_default();
            let path = u.path().trim_end_matches('/');
            format!("{scheme}://{host}{path}").to_lowercase()
        }
        Err(_) => input.to_lowercase(),
    }
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn tokenize(title: &str, company: &str, location: &str, description: &str) -> HashSet<String> {
    let desc_prefix: String = description.split_whitespace().take(100).collect::<Vec<_>>().join(" ");
    let combined = format!("{title} {company} {location} {desc_prefix}");
    combined
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2 && !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

pub fn compute_fingerprint(job: &RawJob) -> Fingerprint {
    let title = normalize_text(&job.title);
    let company = normalize_text(&job.company);
    let location = normalize_location(&job.location);

    Fingerprint {
        content_hash: md5_hex(&format!("{title}|{company}|{location}")),
        description_hash: md5_hex(&normalize_text(&job.description)),
        normalized_url: normalize_url(&job.url),
        tokens: tokenize(&title, &company, &location, &job.description),
        title,
        company,
        location,
    }
}

fn char_ratio(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dist = levenshtein(a, b);
    let max_len = a.chars().count().max(b.chars().count());
    1.0 - (dist as f64 / max_len as f64)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut cur = vec![i + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            cur.push((prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost));
        }
        prev = cur;
    }
    prev[b.len()]
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn weighted_similarity(a: &Fingerprint, b: &Fingerprint) -> f64 {
    0.3 * char_ratio(&a.title, &b.title)
        + 0.2 * char_ratio(&a.company, &b.company)
        + 0.1 * char_ratio(&a.location, &b.location)
        + 0.4 * jaccard(&a.tokens, &b.tokens)
}

#[derive(Debug, Clone, Default)]
pub struct DedupStats {
    pub total_processed: u64,
    pub duplicates_found: u64,
    pub unique_kept: u64,
}

impl DedupStats {
    pub fn dedup_rate(&self) -> f64 {
        if self.total_processed == 0 {
            0.0
        } else {
            self.duplicates_found as f64 / self.total_processed as f64
        }
    }
}

/// Concurrent-safe fingerprint store with insertion-ordered LRU trimming.
/// Eviction (drop the oldest `trim_batch` entries once over `capacity`) runs
/// under a single lock, so concurrent inserts see a consistent trim.
pub struct Deduplicator {
    store: Mutex<IndexMap<String, Fingerprint>>,
    capacity: usize,
    trim_batch: usize,
    similarity_threshold: f64,
    stats: Mutex<DedupStats>,
}

impl Deduplicator {
    pub fn new(capacity: usize) -> Self {
        Self {
            store: Mutex::new(IndexMap::new()),
            capacity,
            trim_batch: 1000,
            similarity_threshold: 0.85,
            stats: Mutex::new(DedupStats::default()),
        }
    }

    /// Returns `true` and keeps the new fingerprint when `job` is unique;
    /// `false` when it is a duplicate of a previously stored job.
    pub fn check_and_insert(&self, job: &RawJob) -> bool {
        let fp = compute_fingerprint(job);
        let mut store = self.store.lock().expect("lock poisoned");
        let mut stats = self.stats.lock().expect("lock poisoned");
        stats.total_processed += 1;

        let is_duplicate = store.values().any(|existing| {
            existing.content_hash == fp.content_hash
                || existing.normalized_url == fp.normalized_url
                || weighted_similarity(existing, &fp) >= self.similarity_threshold
        });

        if is_duplicate {
            stats.duplicates_found += 1;
            return false;
        }

        stats.unique_kept += 1;
        store.insert(fp.content_hash.clone(), fp);

        let mut removed = 0;
        while store.len() > self.capacity && removed < self.trim_batch {
            store.shift_remove_index(0);
            removed += 1;
        }
        true
    }

    pub fn stats(&self) -> DedupStats {
        self.stats.lock().expect("lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.store.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job(title: &str, company: &str, url: &str) -> RawJob {
        RawJob {
            title: title.to_string(),
            company: company.to_string(),
            location: "Remote".to_string(),
            description: "A sufficiently long description of the role and its responsibilities.".to_string(),
            salary: None,
            posted_date: None,
            url: url.to_string(),
            board_id: "b1".to_string(),
            board_name: "Board".to_string(),
            fetched_at: Utc::now(),
            engine: crate::domain::EngineKind::Static,
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let j = job("Senior Rust Engineer", "Acme", "https://acme.example/jobs/1");
        assert_eq!(compute_fingerprint(&j).content_hash, compute_fingerprint(&j).content_hash);
    }

    #[test]
    fn exact_content_hash_is_duplicate() {
        let dedup = Deduplicator::new(100);
        let j1 = job("Rust Engineer", "Acme", "https://acme.example/jobs/1");
        let j2 = job("Rust Engineer", "Acme", "https://acme.example/jobs/2");
        assert!(dedup.check_and_insert(&j1));
        assert!(!dedup.check_and_insert(&j2));
        assert_eq!(dedup.stats().duplicates_found, 1);
    }

    #[test]
    fn exact_normalized_url_is_duplicate() {
        let dedup = Deduplicator::new(100);
        let j1 = job("Rust Engineer", "Acme", "https://acme.example/jobs/1/");
        let j2 = job("Senior Rust Engineer II", "Acme Inc", "https://acme.example/jobs/1");
        assert!(dedup.check_and_insert(&j1));
        assert!(!dedup.check_and_insert(&j2));
    }

    #[test]
    fn distinct_jobs_are_unique() {
        let dedup = Deduplicator::new(100);
        let j1 = job("Rust Engineer", "Acme", "https://acme.example/jobs/1");
        let j2 = job("Product Manager", "Globex", "https://globex.example/jobs/9");
        assert!(dedup.check_and_insert(&j1));
        assert!(dedup.check_and_insert(&j2));
        let stats = dedup.stats();
        assert_eq!(stats.unique_kept, 2);
        assert_eq!(stats.duplicates_found, 0);
    }

    #[test]
    fn composed_and_decomposed_accents_normalize_identically() {
        let composed = "Caf\u{e9} Engineer"; // 'é' as a single codepoint
        let decomposed = "Cafe\u{301} Engineer"; // 'e' + combining acute accent
        assert_eq!(normalize_text(composed), normalize_text(decomposed));
    }

    #[test]
    fn eviction_trims_oldest_over_capacity() {
        let dedup = Deduplicator::new(5);
        for i in 0..10 {
            let j = job(&format!("Job {i}"), &format!("Company {i}"), &format!("https://x.example/{i}"));
            dedup.check_and_insert(&j);
        }
        assert!(dedup.len() <= 5);
    }
}
