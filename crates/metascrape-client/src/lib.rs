pub mod fetcher;
pub mod html;

pub use fetcher::{ProbeMethod, ReqwestFetcher};
pub use html::ScraperExtractor;
