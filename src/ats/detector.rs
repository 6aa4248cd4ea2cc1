//! ATS platform detection from career URLs and page content.
//!
//! The worker uses this on the HTML path: the URL is the strongest signal,
//! then the page's generator meta tag, script sources/content, and known CSS
//! class patterns. Anything unrecognized falls back to the generic parser.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

pub const GENERIC: &str = "generic";

struct Signature {
    name: &'static str,
    url_pattern: Regex,
    script_pattern: Regex,
    /// Whether a matching `meta[name=generator]` content identifies this ATS.
    generator_match: bool,
    /// Whether a CSS class containing the platform name identifies it.
    class_match: bool,
}

static SIGNATURES: LazyLock<Vec<Signature>> = LazyLock::new(|| {
    vec![
        Signature {
            name: "greenhouse",
            url_pattern: Regex::new(r"(?i)greenhouse\.io").unwrap(),
            script_pattern: Regex::new(r"(?i)greenhouse").unwrap(),
            generator_match: true,
            class_match: true,
        },
        Signature {
            name: "lever",
            url_pattern: Regex::new(r"(?i)lever\.co").unwrap(),
            script_pattern: Regex::new(r"(?i)lever").unwrap(),
            generator_match: true,
            class_match: true,
        },
        Signature {
            name: "workday",
            url_pattern: Regex::new(r"(?i)myworkdayjobs\.com|workday\.com").unwrap(),
            script_pattern: Regex::new(r"(?i)workday").unwrap(),
            generator_match: false,
            class_match: false,
        },
        Signature {
            name: "jobvite",
            url_pattern: Regex::new(r"(?i)jobvite\.com").unwrap(),
            script_pattern: Regex::new(r"(?i)jobvite").unwrap(),
            generator_match: false,
            class_match: false,
        },
        Signature {
            name: "ashby",
            url_pattern: Regex::new(r"(?i)ashbyhq\.com").unwrap(),
            script_pattern: Regex::new(r"(?i)ashby").unwrap(),
            generator_match: false,
            class_match: false,
        },
        Signature {
            name: "bamboohr",
            url_pattern: Regex::new(r"(?i)bamboohr\.com").unwrap(),
            script_pattern: Regex::new(r"(?i)bamboohr").unwrap(),
            generator_match: false,
            class_match: false,
        },
    ]
});

/// Detect the ATS platform from the URL alone.
pub fn detect_from_url(url: &str) -> Option<&'static str> {
    SIGNATURES
        .iter()
        .find(|sig| sig.url_pattern.is_match(url))
        .map(|sig| sig.name)
}

/// Detect the ATS platform from page content.
pub fn detect_from_html(html: &str) -> Option<&'static str> {
    let document = Html::parse_document(html);

    // Generator meta tag
    let generator_selector = Selector::parse(r#"meta[name="generator"]"#).unwrap();
    for element in document.select(&generator_selector) {
        if let Some(content) = element.value().attr("content") {
            for sig in SIGNATURES.iter().filter(|s| s.generator_match) {
                if sig.script_pattern.is_match(content) {
                    debug!(ats = sig.name, "detected from generator meta");
                    return Some(sig.name);
                }
            }
        }
    }

    // Script sources and inline content
    let script_selector = Selector::parse("script").unwrap();
    for element in document.select(&script_selector) {
        let src = element.value().attr("src").unwrap_or("");
        let inline: String = element.text().collect();
        for sig in SIGNATURES.iter() {
            if sig.script_pattern.is_match(src) || sig.script_pattern.is_match(&inline) {
                debug!(ats = sig.name, "detected from script");
                return Some(sig.name);
            }
        }
    }

    // Platform-branded CSS classes
    let class_selector = Selector::parse("[class]").unwrap();
    for element in document.select(&class_selector) {
        let classes = element.value().attr("class").unwrap_or("");
        for sig in SIGNATURES.iter().filter(|s| s.class_match) {
            if sig.script_pattern.is_match(classes) {
                debug!(ats = sig.name, "detected from CSS class");
                return Some(sig.name);
            }
        }
    }

    None
}

/// Detect the ATS platform with a confidence score.
///
/// URL detection wins at 1.0, HTML detection at 0.8; otherwise the page is
/// handed to the generic parser at 0.5.
pub fn detect(url: &str, html: Option<&str>) -> (&'static str, f32) {
    if let Some(name) = detect_from_url(url) {
        return (name, 1.0);
    }

    if let Some(html) = html {
        if let Some(name) = detect_from_html(html) {
            return (name, 0.8);
        }
    }

    (GENERIC, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_from_url() {
        assert_eq!(
            detect("https://boards.greenhouse.io/acme", None),
            ("greenhouse", 1.0)
        );
        assert_eq!(
            detect("https://acme.wd1.myworkdayjobs.com/External", None),
            ("workday", 1.0)
        );
    }

    #[test]
    fn detects_from_generator_meta() {
        let html = r#"<html><head><meta name="generator" content="Greenhouse Job Board"></head><body></body></html>"#;
        assert_eq!(
            detect("https://careers.acme.example", Some(html)),
            ("greenhouse", 0.8)
        );
    }

    #[test]
    fn detects_from_script_src() {
        let html = r#"<html><body><script src="https://cdn.jobvite.com/widget.js"></script></body></html>"#;
        assert_eq!(
            detect("https://careers.acme.example", Some(html)),
            ("jobvite", 0.8)
        );
    }

    #[test]
    fn detects_from_inline_script() {
        let html = r#"<html><body><script>window.__ashby = {boardId: 1};</script></body></html>"#;
        assert_eq!(detect_from_html(html), Some("ashby"));
    }

    #[test]
    fn detects_from_css_class() {
        let html = r#"<html><body><div class="lever-postings-wrapper"></div></body></html>"#;
        assert_eq!(detect_from_html(html), Some("lever"));
    }

    #[test]
    fn falls_back_to_generic() {
        let html = "<html><body><h1>Join us</h1></body></html>";
        assert_eq!(
            detect("https://careers.acme.example", Some(html)),
            (GENERIC, 0.5)
        );
    }
}
