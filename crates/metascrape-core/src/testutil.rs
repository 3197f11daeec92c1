//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::{FetchedDocument, HeaderValues, HtmlMetadata, ProbeResult};
use crate::traits::{Fetcher, HtmlExtractor};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that serves one fixed body.
///
/// The probe answers `200 OK` unless an error is configured. A configured
/// error is consumed by the first call; later calls succeed.
#[derive(Clone)]
pub struct MockFetcher {
    body: String,
    headers: HeaderValues,
    probe_error: Arc<Mutex<Option<AppError>>>,
    fetch_error: Arc<Mutex<Option<AppError>>>,
    pub fetch_calls: Arc<Mutex<usize>>,
}

impl MockFetcher {
    pub fn new(body: &str) -> Self {
        let content_type = if body.trim_start().starts_with('{') {
            "application/json"
        } else {
            "text/html"
        };

        Self {
            body: body.to_string(),
            headers: BTreeMap::from([(
                "content-type".to_string(),
                vec![content_type.to_string()],
            )]),
            probe_error: Arc::new(Mutex::new(None)),
            fetch_error: Arc::new(Mutex::new(None)),
            fetch_calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_probe_error(self, error: AppError) -> Self {
        *self.probe_error.lock().unwrap() = Some(error);
        self
    }

    pub fn with_fetch_error(self, error: AppError) -> Self {
        *self.fetch_error.lock().unwrap() = Some(error);
        self
    }
}

impl Fetcher for MockFetcher {
    async fn probe(&self, _url: &str) -> Result<ProbeResult, AppError> {
        if let Some(e) = self.probe_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(ProbeResult {
            status: 200,
            status_text: "OK".to_string(),
        })
    }

    async fn fetch(&self, _url: &str) -> Result<FetchedDocument, AppError> {
        *self.fetch_calls.lock().unwrap() += 1;
        if let Some(e) = self.fetch_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(FetchedDocument {
            headers: self.headers.clone(),
            body: self.body.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// MockHtmlExtractor
// ---------------------------------------------------------------------------

/// Mock extractor that returns fixed metadata and records `(url, queries)` per call.
#[derive(Clone)]
pub struct MockHtmlExtractor {
    metadata: HtmlMetadata,
    pub calls: Arc<Mutex<Vec<(String, BTreeMap<String, String>)>>>,
}

impl MockHtmlExtractor {
    pub fn new(metadata: HtmlMetadata) -> Self {
        Self {
            metadata,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl HtmlExtractor for MockHtmlExtractor {
    fn extract(&self, _html: &str, url: &str, queries: &BTreeMap<String, String>) -> HtmlMetadata {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), queries.clone()));
        self.metadata.clone()
    }
}

/// Extractor that panics, standing in for a parser blowing up on a page.
#[derive(Clone)]
pub struct PanickingExtractor;

impl HtmlExtractor for PanickingExtractor {
    fn extract(&self, _html: &str, _url: &str, _queries: &BTreeMap<String, String>) -> HtmlMetadata {
        panic!("extractor failure");
    }
}
