//! Built-in generic selector fallbacks, tried after a board's own configured
//! selectors (and their fallback list) come up empty for a field.

pub fn built_in_selectors(field: &str) -> &'static [&'static str] {
    match field {
        "job_title" => &["h1", "[class*=\"job-title\"]", "[class*=\"title\"]"],
        "company" => &["[class*=\"company\"]", "[itemprop=\"hiringOrganization\"]"],
        "location" => &["[class*=\"location\"]", "[itemprop=\"jobLocation\"]"],
        "description" => &["[class*=\"description\"]", "article", "main"],
        "salary" => &["[class*=\"salary\"]", "[class*=\"compensation\"]"],
        "date_posted" => &["time", "[class*=\"date\"]", "[itemprop=\"datePosted\"]"],
        "job_links" => &["a[href*=\"/job\"]", "a[href*=\"/jobs/\"]"],
        "next_page" => &["a[rel=\"next\"]", "[class*=\"next\"]"],
        _ => &[],
    }
}

/// Resolve a field to an ordered candidate list: the board's configured
/// selector(s) first, then the built-in fallbacks.
pub fn candidates_for<'a>(board_selectors: Option<&'a [String]>, field: &str) -> Vec<&'a str> {
    let mut out: Vec<&str> = board_selectors
        .map(|v| v.iter().map(String::as_str).collect())
        .unwrap_or_default();
    out.extend(built_in_selectors(field));
    out
}
