use axum::http::HeaderValue;
use metascrape_client::{ReqwestFetcher, ScraperExtractor};
use metascrape_core::{AppError, ExtractService};

use crate::config::ServerConfig;

/// The extraction pipeline as wired for the server.
pub type Service = ExtractService<ReqwestFetcher, ScraperExtractor>;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub service: Service,
    /// Precomputed `Cache-Control` value for `/api` responses.
    pub cache_control: HeaderValue,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Result<Self, AppError> {
        let fetcher = ReqwestFetcher::with_timeout(config.timeout)?
            .with_probe_method(config.probe_method);
        let fetcher = if config.allow_private_urls {
            fetcher.allow_private_urls()?
        } else {
            fetcher
        };

        let cache_control = HeaderValue::from_str(&format!(
            "s-maxage={}, stale-while-revalidate",
            config.cache_max_age
        ))
        .map_err(|e| AppError::ConfigError(format!("Invalid Cache-Control value: {e}")))?;

        Ok(Self {
            service: ExtractService::new(fetcher, ScraperExtractor::new()),
            cache_control,
        })
    }
}
