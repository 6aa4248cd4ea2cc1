//! Field extraction from career-page HTML.
//!
//! Career pages share loose conventions rather than a schema; every function
//! tries a cascade of common patterns and gives up quietly.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static TITLE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)job.?title|title.?job|position.?title").unwrap());
static LOCATION_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)location").unwrap());
static DESCRIPTION_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)description|job.?desc|about.?role|overview").unwrap());
static REQUIREMENTS_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)requirements|qualifications|skills").unwrap());
static APPLY_CLASS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)apply").unwrap());
static JOB_LINK_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)job.?link|position.?link|posting").unwrap());
static JOB_LINK_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/job/|/jobs/|/position/|/careers/|/posting/").unwrap());

static LOCATION_TEXT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)Location:\s*([^\n]+)").unwrap(),
        Regex::new(r"(?i)Office Location:\s*([^\n]+)").unwrap(),
        Regex::new(r"(?i)Work Location:\s*([^\n]+)").unwrap(),
    ]
});

static POSTED_TEXT: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"Posted:\s*(\d{4}-\d{2}-\d{2})").unwrap(),
        Regex::new(r"Posted on:\s*(\d{4}-\d{2}-\d{2})").unwrap(),
        Regex::new(r"Date Posted:\s*(\d{4}-\d{2}-\d{2})").unwrap(),
    ]
});

/// Navigation link text that is never a job posting.
const NAV_WORDS: &[&str] = &["home", "about", "contact", "login", "sign in"];

/// Link text hints used by the broad job-link search.
const JOB_WORDS: &[&str] = &[
    "engineer",
    "developer",
    "designer",
    "manager",
    "analyst",
    "director",
    "lead",
    "senior",
    "junior",
    "intern",
    "specialist",
    "coordinator",
    "associate",
    "consultant",
];

/// Collapse runs of whitespace and trim.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

fn element_text(element: ElementRef) -> String {
    clean_text(&element.text().collect::<String>())
}

fn class_of(element: ElementRef) -> &str {
    element.value().attr("class").unwrap_or("")
}

fn first_with_class(document: &Html, selector: &str, pattern: &Regex) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .find(|el| pattern.is_match(class_of(*el)))
        .map(element_text)
}

/// Resolve a possibly-relative link against the page URL.
fn resolve_url(base_url: &str, href: &str) -> Option<String> {
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    Url::parse(base_url)
        .ok()?
        .join(href)
        .ok()
        .map(|u| u.to_string())
}

pub fn extract_title(document: &Html) -> Option<String> {
    if let Some(title) = first_with_class(document, "h1, h2, div, span", &TITLE_CLASS) {
        if title.len() > 5 {
            return Some(title);
        }
    }

    // Fallback to the first h1
    let h1 = Selector::parse("h1").unwrap();
    if let Some(element) = document.select(&h1).next() {
        let title = element_text(element);
        if title.len() > 5 {
            return Some(title);
        }
    }

    let og_title = Selector::parse(r#"meta[property="og:title"]"#).unwrap();
    document
        .select(&og_title)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(clean_text)
        .filter(|t| !t.is_empty())
}

pub fn extract_location(document: &Html, text_content: &str) -> Option<String> {
    if let Some(location) = first_with_class(document, "div, span, p, li", &LOCATION_CLASS) {
        if location.len() > 2 {
            return Some(location);
        }
    }

    LOCATION_TEXT
        .iter()
        .find_map(|pattern| pattern.captures(text_content))
        .map(|captures| clean_text(&captures[1]))
}

pub fn extract_description(document: &Html) -> Option<String> {
    first_with_class(document, "div, section", &DESCRIPTION_CLASS).filter(|d| d.len() > 50)
}

pub fn extract_requirements(document: &Html) -> Option<String> {
    first_with_class(document, "div, section, ul", &REQUIREMENTS_CLASS).filter(|r| r.len() > 20)
}

pub fn extract_application_url(document: &Html, base_url: &str) -> Option<String> {
    let anchors = Selector::parse("a[href]").unwrap();
    for element in document.select(&anchors) {
        let is_apply = APPLY_CLASS.is_match(class_of(element))
            || APPLY_CLASS.is_match(&element_text(element));
        if is_apply {
            if let Some(href) = element.value().attr("href") {
                return resolve_url(base_url, href);
            }
        }
    }
    None
}

pub fn extract_posted_date(document: &Html, text_content: &str) -> Option<DateTime<Utc>> {
    let time = Selector::parse("time[datetime]").unwrap();
    if let Some(element) = document.select(&time).next() {
        if let Some(value) = element.value().attr("datetime") {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
                return Some(parsed.with_timezone(&Utc));
            }
        }
    }

    POSTED_TEXT
        .iter()
        .find_map(|pattern| pattern.captures(text_content))
        .and_then(|captures| NaiveDate::parse_from_str(&captures[1], "%Y-%m-%d").ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Job posting links found with the standard class/href patterns, in document
/// order with duplicates removed.
pub fn extract_job_links(document: &Html, base_url: &str) -> Vec<String> {
    let anchors = Selector::parse("a[href]").unwrap();
    let mut links = Vec::new();

    for element in document.select(&anchors) {
        let href = element.value().attr("href").unwrap_or("");
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let matches = JOB_LINK_CLASS.is_match(class_of(element)) || JOB_LINK_HREF.is_match(href);
        if !matches {
            continue;
        }

        if let Some(resolved) = resolve_url(base_url, href) {
            if !links.contains(&resolved) {
                links.push(resolved);
            }
        }
    }

    links
}

/// Broader link search for pages where the standard patterns find nothing:
/// any anchor whose text mentions a job-ish word, skipping navigation.
pub fn broad_job_links(document: &Html, base_url: &str) -> Vec<String> {
    let anchors = Selector::parse("a[href]").unwrap();
    let mut links = Vec::new();

    for element in document.select(&anchors) {
        let href = element.value().attr("href").unwrap_or("");
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        let text = element_text(element).to_lowercase();
        if NAV_WORDS.iter().any(|w| text.contains(w)) {
            continue;
        }
        if !JOB_WORDS.iter().any(|w| text.contains(w)) {
            continue;
        }

        if let Some(resolved) = resolve_url(base_url, href) {
            if resolved != base_url && !links.contains(&resolved) {
                links.push(resolved);
            }
        }
    }

    links
}
