use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use metascrape_server::config::ServerConfig;
use metascrape_server::routes;
use metascrape_server::state::AppState;

pub const PAGE_PATH: &str = "/page";

/// Mock remote site plus a router allowed to reach it.
pub struct TestApp {
    pub router: Router,
    pub remote: MockServer,
}

impl TestApp {
    pub fn page_url(&self) -> String {
        format!("{}{PAGE_PATH}", self.remote.uri())
    }

    /// Serve `body` for GET on the page path and answer the probe with 200.
    pub async fn serve(&self, content_type: &str, body: &str) {
        self.answer_probe().await;
        Mock::given(method("GET"))
            .and(path(PAGE_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(body.to_string(), content_type),
            )
            .mount(&self.remote)
            .await;
    }

    pub async fn answer_probe(&self) {
        Mock::given(method("OPTIONS"))
            .and(path(PAGE_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.remote)
            .await;
    }

    /// GET `/api` with the given raw query string.
    pub async fn get(&self, query: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(
                Request::get(format!("/api?{query}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(ServerConfig {
        timeout: Duration::from_secs(5),
        allow_private_urls: true,
        ..ServerConfig::default()
    })
    .await
}

pub async fn setup_test_app_with(config: ServerConfig) -> TestApp {
    let remote = MockServer::start().await;
    let state = Arc::new(AppState::from_config(&config).expect("Failed to build app state"));

    TestApp {
        router: routes::router(state),
        remote,
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Percent-encode a value for use in a query string.
pub fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
