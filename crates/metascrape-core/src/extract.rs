use crate::error::AppError;
use crate::models::{
    ExtractRequest, ExtractionResult, FetchedDocument, HtmlPayload, JsonPayload, parse_json_opt,
};
use crate::traits::{Fetcher, HtmlExtractor};

/// Runs one extraction: probe → fetch → branch on body shape → extract.
///
/// Generic over the network and HTML layers via traits, so the pipeline can be
/// tested without real HTTP. Holds no per-request state; one instance serves
/// every request.
#[derive(Clone)]
pub struct ExtractService<F, X>
where
    F: Fetcher,
    X: HtmlExtractor,
{
    fetcher: F,
    extractor: X,
}

impl<F, X> ExtractService<F, X>
where
    F: Fetcher,
    X: HtmlExtractor,
{
    pub fn new(fetcher: F, extractor: X) -> Self {
        Self { fetcher, extractor }
    }

    /// Run the pipeline for a validated request.
    ///
    /// 1. Probe the target; failure is `UnreachableTarget`
    /// 2. Fetch headers and body; failure degrades to an empty document
    /// 3. Empty body is `EmptyBody`
    /// 4. JSON body is returned verbatim
    /// 5. Anything else is parsed as HTML
    pub async fn extract(&self, request: &ExtractRequest) -> Result<ExtractionResult, AppError> {
        let url = request.url.as_str();

        // 1. Probe
        let probe = self.fetcher.probe(url).await.map_err(|e| {
            tracing::warn!(%url, error = %e, "Probe failed");
            match e {
                AppError::UnreachableTarget(_) => e,
                other => AppError::UnreachableTarget(other.to_string()),
            }
        })?;
        tracing::debug!(%url, status = probe.status, "Probe succeeded");

        // 2. Fetch
        let document = match self.fetcher.fetch(url).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(%url, error = %e, "Fetch failed, treating body as empty");
                FetchedDocument::default()
            }
        };

        // 3. Empty-body guard
        if document.body.is_empty() {
            return Err(AppError::EmptyBody);
        }
        tracing::info!(%url, bytes = document.body.len(), "Fetched document");

        // 4. JSON branch
        if let Some(json) = parse_json_opt(&document.body) {
            tracing::info!(%url, "Body is JSON, skipping HTML extraction");
            return Ok(ExtractionResult::Json(JsonPayload {
                json,
                probe,
                headers: document.headers,
            }));
        }

        // 5. HTML branch, parsed on the blocking pool
        let extractor = self.extractor.clone();
        let body = document.body;
        let page_url = url.to_string();
        let queries = request.queries.clone();
        let metadata =
            tokio::task::spawn_blocking(move || extractor.extract(&body, &page_url, &queries))
                .await
                .map_err(|e| {
                    tracing::error!(%url, error = %e, "HTML extraction task failed");
                    AppError::ExtractionFailed(e.to_string())
                })?;
        tracing::info!(
            %url,
            meta = metadata.meta.len(),
            favicons = metadata.favicons.len(),
            json_ld = metadata.json_ld.is_some(),
            queries = metadata.scrape.len(),
            "Extraction complete"
        );

        Ok(ExtractionResult::Html(HtmlPayload {
            metadata,
            probe,
            headers: document.headers,
        }))
    }
}
