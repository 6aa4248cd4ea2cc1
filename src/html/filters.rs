//! Keyword filtering for scraped job records.

use crate::data::models::JobPosting;
use regex::Regex;
use tracing::debug;

/// Caller-supplied predicate over scraped jobs.
///
/// Matching is word-boundary and case-insensitive across title, description,
/// requirements, and location. Excluded keywords reject first; required
/// keywords must all appear; title keywords must match the title itself; and
/// general keywords need at least `min_keyword_matches` hits.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    keyword_patterns: Vec<Regex>,
    required_patterns: Vec<Regex>,
    excluded_patterns: Vec<Regex>,
    title_patterns: Vec<Regex>,
    min_keyword_matches: usize,
}

fn word_patterns(keywords: &[String]) -> Vec<Regex> {
    keywords
        .iter()
        .map(|k| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(k))).unwrap())
        .collect()
}

impl JobFilter {
    pub fn new(
        keywords: Vec<String>,
        required_keywords: Vec<String>,
        excluded_keywords: Vec<String>,
        title_keywords: Vec<String>,
        min_keyword_matches: usize,
    ) -> Self {
        Self {
            keyword_patterns: word_patterns(&keywords),
            required_patterns: word_patterns(&required_keywords),
            excluded_patterns: word_patterns(&excluded_keywords),
            title_patterns: word_patterns(&title_keywords),
            min_keyword_matches: min_keyword_matches.max(1),
        }
    }

    pub fn matches(&self, job: &JobPosting) -> bool {
        let haystack = [
            job.title.as_str(),
            job.description.as_deref().unwrap_or(""),
            job.requirements.as_deref().unwrap_or(""),
            job.location.as_deref().unwrap_or(""),
        ]
        .join(" ");

        // Excluded keywords reject first
        for pattern in &self.excluded_patterns {
            if pattern.is_match(&haystack) {
                debug!(title = %job.title, pattern = %pattern, "job excluded by keyword");
                return false;
            }
        }

        for pattern in &self.required_patterns {
            if !pattern.is_match(&haystack) {
                debug!(title = %job.title, pattern = %pattern, "job missing required keyword");
                return false;
            }
        }

        if !self.title_patterns.is_empty()
            && !self.title_patterns.iter().any(|p| p.is_match(&job.title))
        {
            debug!(title = %job.title, "job title does not match title keywords");
            return false;
        }

        if !self.keyword_patterns.is_empty() {
            let hits = self
                .keyword_patterns
                .iter()
                .filter(|p| p.is_match(&haystack))
                .count();
            if hits < self.min_keyword_matches {
                debug!(
                    title = %job.title,
                    hits,
                    needed = self.min_keyword_matches,
                    "job below keyword threshold"
                );
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    fn job(title: &str, description: &str) -> JobPosting {
        let mut job = JobPosting::new(title);
        job.description = Some(description.to_string());
        job
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let filter = JobFilter::default();
        assert!(filter.matches(&job("Anything", "at all")));
    }

    #[test]
    fn excluded_keywords_reject() {
        let filter = JobFilter::new(vec![], vec![], strings(&["contractor"]), vec![], 1);
        assert!(!filter.matches(&job("Engineer", "6-month contractor role")));
        assert!(filter.matches(&job("Engineer", "permanent role")));
    }

    #[test]
    fn required_keywords_must_all_appear() {
        let filter = JobFilter::new(vec![], strings(&["rust", "distributed"]), vec![], vec![], 1);
        assert!(filter.matches(&job("Engineer", "Rust and distributed systems")));
        assert!(!filter.matches(&job("Engineer", "Rust only")));
    }

    #[test]
    fn title_keywords_check_title_only() {
        let filter = JobFilter::new(vec![], vec![], vec![], strings(&["engineer"]), 1);
        assert!(filter.matches(&job("Software Engineer", "")));
        assert!(!filter.matches(&job("Product Manager", "works with engineers")));
    }

    #[test]
    fn keyword_threshold_counts_distinct_patterns() {
        let filter = JobFilter::new(strings(&["rust", "python", "go"]), vec![], vec![], vec![], 2);
        assert!(filter.matches(&job("Engineer", "rust and python shop")));
        assert!(!filter.matches(&job("Engineer", "rust shop")));
    }

    #[test]
    fn matching_is_word_bounded() {
        let filter = JobFilter::new(vec![], vec![], strings(&["intern"]), vec![], 1);
        // "internal" must not trip the "intern" exclusion
        assert!(filter.matches(&job("Engineer", "works on internal tools")));
        assert!(!filter.matches(&job("Engineering Intern", "")));
    }
}
