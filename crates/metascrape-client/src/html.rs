use std::collections::BTreeMap;
use std::sync::LazyLock;

use metascrape_core::models::{Favicon, HtmlMetadata, ScrapedElement, Summary, parse_json_opt};
use metascrape_core::traits::HtmlExtractor;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static META: LazyLock<Selector> = LazyLock::new(|| parse_static("meta"));
static ICON_LINK: LazyLock<Selector> = LazyLock::new(|| parse_static(r#"link[rel*="icon"]"#));
static JSON_LD: LazyLock<Selector> =
    LazyLock::new(|| parse_static(r#"script[type="application/ld+json"]"#));
static TITLE: LazyLock<Selector> = LazyLock::new(|| parse_static("title"));
static H1: LazyLock<Selector> = LazyLock::new(|| parse_static("h1"));

const TITLE_KEYS: &[&str] = &["og:title", "twitter:title"];
const DESCRIPTION_KEYS: &[&str] = &["og:description", "twitter:description", "description"];
const IMAGE_KEYS: &[&str] = &[
    "og:image",
    "og:image:url",
    "twitter:image",
    "twitter:image:src",
];

fn parse_static(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("built-in selector {css:?} is invalid: {e:?}"))
}

/// HTML metadata extractor backed by the `scraper` crate.
///
/// Collects meta tags, favicon links, the first JSON-LD block, a
/// title/description/image summary, and the results of caller-supplied
/// CSS selector queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperExtractor;

impl ScraperExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl HtmlExtractor for ScraperExtractor {
    fn extract(&self, html: &str, url: &str, queries: &BTreeMap<String, String>) -> HtmlMetadata {
        let document = Html::parse_document(html);

        let meta = extract_meta(&document);
        let summary = summarize(&document, &meta, url);

        HtmlMetadata {
            favicons: extract_favicons(&document, url),
            json_ld: extract_json_ld(&document),
            scrape: run_queries(&document, queries),
            summary: (!summary.is_empty()).then_some(summary),
            meta,
        }
    }
}

/// `name` and `property` each map to `content`; later tags win.
fn extract_meta(document: &Html) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();
    for element in document.select(&META) {
        let attrs = element.value();
        let Some(content) = attrs.attr("content") else {
            continue;
        };
        for key in [attrs.attr("name"), attrs.attr("property")]
            .into_iter()
            .flatten()
        {
            if !key.is_empty() {
                meta.insert(key.to_string(), content.to_string());
            }
        }
    }
    meta
}

fn extract_favicons(document: &Html, url: &str) -> Vec<Favicon> {
    document
        .select(&ICON_LINK)
        .filter_map(|element| {
            let attrs = element.value();
            let rel = attrs.attr("rel")?;
            let href = attrs.attr("href")?;
            Some(Favicon {
                rel: rel.to_string(),
                href: absolutize(href, url),
            })
        })
        .collect()
}

fn extract_json_ld(document: &Html) -> Option<serde_json::Value> {
    let script = document.select(&JSON_LD).next()?;
    let text: String = script.text().collect();
    parse_json_opt(&text)
}

/// Invalid and blank selectors are skipped. A valid selector with no
/// matches still yields its key with an empty list.
fn run_queries(
    document: &Html,
    queries: &BTreeMap<String, String>,
) -> BTreeMap<String, Vec<ScrapedElement>> {
    queries
        .iter()
        .filter(|(_, css)| !css.trim().is_empty())
        .filter_map(|(name, css)| match Selector::parse(css) {
            Ok(selector) => {
                let matches = document.select(&selector).map(describe).collect();
                Some((name.clone(), matches))
            }
            Err(e) => {
                tracing::debug!(%name, selector = %css, error = ?e, "Skipping invalid selector");
                None
            }
        })
        .collect()
}

fn describe(element: ElementRef<'_>) -> ScrapedElement {
    let inner = element.inner_html();
    ScrapedElement {
        text: element.text().collect(),
        html: (!inner.is_empty()).then_some(inner),
        attributes: element
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
    }
}

fn summarize(document: &Html, meta: &BTreeMap<String, String>, url: &str) -> Summary {
    let from_meta = |keys: &[&str]| {
        keys.iter()
            .filter_map(|key| meta.get(*key))
            .map(|value| value.trim())
            .find(|value| !value.is_empty())
            .map(str::to_string)
    };

    Summary {
        title: from_meta(TITLE_KEYS)
            .or_else(|| first_text(document, &TITLE))
            .or_else(|| first_text(document, &H1)),
        description: from_meta(DESCRIPTION_KEYS),
        image: from_meta(IMAGE_KEYS).map(|image| absolutize(&image, url)),
    }
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Rewrite a relative `href` onto the origin of `page_url`.
///
/// Scheme-relative (`//host/...`) and absolute (`scheme:...`) values pass
/// through. Relative values are joined onto the origin regardless of the page
/// path: `icon.png` on `https://a.example/blog/post` becomes
/// `https://a.example/icon.png`.
pub fn absolutize(href: &str, page_url: &str) -> String {
    if href.starts_with("//") || has_scheme(href) {
        return href.to_string();
    }
    let Ok(parsed) = Url::parse(page_url) else {
        return href.to_string();
    };

    let origin = parsed.origin().ascii_serialization();
    let origin = origin.strip_suffix('/').unwrap_or(&origin);
    let path = href.strip_prefix('/').unwrap_or(href);
    format!("{origin}/{path}")
}

fn has_scheme(href: &str) -> bool {
    let Some((scheme, _)) = href.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
