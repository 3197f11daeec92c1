use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::AppError;

/// Response headers of the fetched document: name → values in arrival order.
pub type HeaderValues = BTreeMap<String, Vec<String>>;

/// Query parameter carrying the target URL. Every other parameter is a scrape query.
pub const URL_PARAM: &str = "url";

/// A validated extraction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractRequest {
    /// Target URL to fetch.
    pub url: String,
    /// Named CSS selector queries (name → selector).
    pub queries: BTreeMap<String, String>,
}

impl ExtractRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            queries: BTreeMap::new(),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, selector: impl Into<String>) -> Self {
        self.queries.insert(name.into(), selector.into());
        self
    }

    /// Build a request from raw query-string pairs.
    ///
    /// `url` must appear exactly once with a non-blank value. Any other name
    /// that appears exactly once becomes a scrape query; repeated names carry
    /// a list rather than a selector string and are skipped.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in pairs {
            grouped.entry(name.into()).or_default().push(value.into());
        }

        let url = match grouped.remove(URL_PARAM).as_deref() {
            Some([url]) if !url.trim().is_empty() => url.trim().to_string(),
            _ => return Err(AppError::InvalidInput),
        };

        let queries = grouped
            .into_iter()
            .filter_map(|(name, mut values)| match values.len() {
                1 => values.pop().map(|selector| (name, selector)),
                _ => {
                    tracing::debug!(%name, "Skipping repeated scrape query");
                    None
                }
            })
            .collect();

        Ok(Self { url, queries })
    }
}

/// Outcome of the availability probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub status: u16,
    #[serde(rename = "statusText")]
    pub status_text: String,
}

/// Raw result of the full GET. Empty when retrieval failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedDocument {
    pub headers: HeaderValues,
    pub body: String,
}

/// A `<link rel="...icon...">` entry with its `href` made absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Favicon {
    pub rel: String,
    pub href: String,
}

/// One element matched by a scrape query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapedElement {
    pub text: String,
    /// Inner markup; `None` when the element has no children.
    pub html: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

/// Best-effort title, description, and preview image of a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image.is_none()
    }
}

/// Everything extracted from an HTML document. Empty fields are not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HtmlMetadata {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub favicons: Vec<Favicon>,
    #[serde(rename = "jsonLD", skip_serializing_if = "Option::is_none")]
    pub json_ld: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub scrape: BTreeMap<String, Vec<ScrapedElement>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

/// The body was valid JSON and is returned verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonPayload {
    pub json: serde_json::Value,
    #[serde(flatten)]
    pub probe: ProbeResult,
    pub headers: HeaderValues,
}

/// The body was treated as HTML.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HtmlPayload {
    #[serde(flatten)]
    pub metadata: HtmlMetadata,
    #[serde(flatten)]
    pub probe: ProbeResult,
    pub headers: HeaderValues,
}

/// Successful extraction, shaped by what the remote body turned out to be.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractionResult {
    Json(JsonPayload),
    Html(HtmlPayload),
}

impl ExtractionResult {
    pub fn probe(&self) -> &ProbeResult {
        match self {
            ExtractionResult::Json(payload) => &payload.probe,
            ExtractionResult::Html(payload) => &payload.probe,
        }
    }
}

/// Parse JSON text, treating any failure as absence.
pub fn parse_json_opt(text: &str) -> Option<serde_json::Value> {
    serde_json::from_str(text).ok()
}
