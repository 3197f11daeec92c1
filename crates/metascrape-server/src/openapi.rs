use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "metascrape API",
        version = "0.1.0",
        description = "Fetches a page and extracts meta tags, favicons, JSON-LD, and CSS selector matches. \
            Every query parameter besides `url` is a named CSS selector."
    ),
    paths(crate::routes::extract, crate::routes::health),
    components(schemas(
        crate::dto::ExtractResponse,
        crate::dto::JsonExtractionResponse,
        crate::dto::HtmlExtractionResponse,
        crate::dto::FaviconResponse,
        crate::dto::ScrapedElementResponse,
        crate::dto::SummaryResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "extract", description = "Metadata extraction"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
