pub mod error;
pub mod extract;
pub mod models;
#[cfg(test)]
pub(crate) mod testutil;
pub mod traits;

pub use error::AppError;
pub use extract::ExtractService;
pub use models::{
    ExtractRequest, ExtractionResult, FetchedDocument, HtmlMetadata, ProbeResult, parse_json_opt,
};
pub use traits::{Fetcher, HtmlExtractor};
