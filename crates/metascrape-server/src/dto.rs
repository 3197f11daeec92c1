use std::collections::BTreeMap;

use serde::Serialize;

use metascrape_core::models::{
    ExtractionResult, Favicon, HtmlPayload, JsonPayload, ScrapedElement, Summary,
};

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Body of a successful `/api` response. The shape depends on what the target served.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum ExtractResponse {
    Json(JsonExtractionResponse),
    Html(HtmlExtractionResponse),
}

impl From<ExtractionResult> for ExtractResponse {
    fn from(result: ExtractionResult) -> Self {
        match result {
            ExtractionResult::Json(payload) => Self::Json(payload.into()),
            ExtractionResult::Html(payload) => Self::Html(payload.into()),
        }
    }
}

/// The target served valid JSON, returned verbatim.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JsonExtractionResponse {
    /// Parsed response body
    pub json: serde_json::Value,
    /// Status code of the availability probe
    pub status: u16,
    /// Reason phrase of the availability probe
    #[serde(rename = "statusText")]
    pub status_text: String,
    /// Headers of the full fetch, values in arrival order
    pub headers: BTreeMap<String, Vec<String>>,
}

impl From<JsonPayload> for JsonExtractionResponse {
    fn from(payload: JsonPayload) -> Self {
        Self {
            json: payload.json,
            status: payload.probe.status,
            status_text: payload.probe.status_text,
            headers: payload.headers,
        }
    }
}

/// The target served HTML. Fields with nothing to report are omitted.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HtmlExtractionResponse {
    /// `name`/`property` → `content` of every `<meta>` tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<BTreeMap<String, String>>,
    /// Icon links with absolute `href`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicons: Option<Vec<FaviconResponse>>,
    /// First JSON-LD block, when it parses
    #[serde(rename = "jsonLD", skip_serializing_if = "Option::is_none")]
    pub json_ld: Option<serde_json::Value>,
    /// Matches per caller-supplied selector query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape: Option<BTreeMap<String, Vec<ScrapedElementResponse>>>,
    /// Title, description, and preview image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryResponse>,
    pub status: u16,
    #[serde(rename = "statusText")]
    pub status_text: String,
    pub headers: BTreeMap<String, Vec<String>>,
}

impl From<HtmlPayload> for HtmlExtractionResponse {
    fn from(payload: HtmlPayload) -> Self {
        let metadata = payload.metadata;
        Self {
            meta: non_empty_map(metadata.meta),
            favicons: Some(metadata.favicons)
                .filter(|favicons| !favicons.is_empty())
                .map(|favicons| favicons.into_iter().map(Into::into).collect()),
            json_ld: metadata.json_ld,
            scrape: non_empty_map(metadata.scrape).map(|scrape| {
                scrape
                    .into_iter()
                    .map(|(name, matches)| (name, matches.into_iter().map(Into::into).collect()))
                    .collect()
            }),
            summary: metadata.summary.map(Into::into),
            status: payload.probe.status,
            status_text: payload.probe.status_text,
            headers: payload.headers,
        }
    }
}

fn non_empty_map<K, V>(map: BTreeMap<K, V>) -> Option<BTreeMap<K, V>> {
    (!map.is_empty()).then_some(map)
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FaviconResponse {
    pub rel: String,
    pub href: String,
}

impl From<Favicon> for FaviconResponse {
    fn from(favicon: Favicon) -> Self {
        Self {
            rel: favicon.rel,
            href: favicon.href,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ScrapedElementResponse {
    /// Text content of the element and its descendants
    pub text: String,
    /// Inner markup, null for elements without children
    pub html: Option<String>,
    pub attributes: BTreeMap<String, String>,
}

impl From<ScrapedElement> for ScrapedElementResponse {
    fn from(element: ScrapedElement) -> Self {
        Self {
            text: element.text,
            html: element.html,
            attributes: element.attributes,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SummaryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<Summary> for SummaryResponse {
    fn from(summary: Summary) -> Self {
        Self {
            title: summary.title,
            description: summary.description,
            image: summary.image,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
