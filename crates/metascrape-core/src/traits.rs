use std::collections::BTreeMap;
use std::future::Future;

use crate::error::AppError;
use crate::models::{FetchedDocument, HtmlMetadata, ProbeResult};

/// Talks to the remote target.
pub trait Fetcher: Send + Sync + Clone {
    /// Lightweight reachability check. Any error means the target is unreachable.
    fn probe(&self, url: &str) -> impl Future<Output = Result<ProbeResult, AppError>> + Send;

    /// Full GET returning headers and body text.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedDocument, AppError>> + Send;
}

/// Pulls metadata out of an HTML document.
///
/// Runs on the blocking pool, hence `'static`.
pub trait HtmlExtractor: Send + Sync + Clone + 'static {
    /// `url` is the target the document was fetched from, used to absolutize links.
    fn extract(&self, html: &str, url: &str, queries: &BTreeMap<String, String>) -> HtmlMetadata;
}
