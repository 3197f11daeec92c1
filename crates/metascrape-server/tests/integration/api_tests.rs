use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use metascrape_server::config::ServerConfig;

use crate::integration::common::{
    PAGE_PATH, body_json, encode, setup_test_app, setup_test_app_with,
};

const ARTICLE: &str = r#"<!doctype html>
<html>
<head>
    <title>Example Article</title>
    <meta name="description" content="hi">
    <meta property="og:title" content="T">
    <meta property="og:image" content="/cover.png">
    <link rel="icon" href="/favicon.ico">
    <link rel="stylesheet" href="/style.css">
    <script type="application/ld+json">{"x":1}</script>
</head>
<body>
    <h1 class="lead">First <em>heading</em></h1>
    <h1>Second heading</h1>
</body>
</html>"#;

fn assert_common_headers(response: &axum::http::Response<Body>) {
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(
        headers["access-control-allow-methods"],
        "GET, POST, PUT, DELETE, OPTIONS, PATCH"
    );
    assert_eq!(headers["access-control-allow-headers"], "*");
    assert_eq!(
        headers["cache-control"],
        "s-maxage=604800, stale-while-revalidate"
    );
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_url_returns_400() {
    let app = setup_test_app().await;

    let response = app.get("title=h1").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_common_headers(&response);
    let json = body_json(response).await;
    assert_eq!(json, serde_json::json!({"error": "url is required"}));
}

#[tokio::test]
async fn repeated_url_returns_400() {
    let app = setup_test_app().await;

    let response = app
        .get(&format!(
            "url={}&url={}",
            encode(&app.page_url()),
            encode("https://example.com")
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "url is required");
}

#[tokio::test]
async fn unreachable_target_returns_400() {
    let app = setup_test_app().await;
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let response = app
        .get(&format!("url={}", encode(&format!("http://127.0.0.1:{port}/"))))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_common_headers(&response);
    let json = body_json(response).await;
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .starts_with("url is unreachable")
    );
}

#[tokio::test]
async fn slow_target_times_out_as_unreachable() {
    let app = setup_test_app_with(ServerConfig {
        timeout: Duration::from_secs(1),
        allow_private_urls: true,
        ..ServerConfig::default()
    })
    .await;
    Mock::given(method("OPTIONS"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&app.remote)
        .await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&app.remote)
        .await;

    let response = app.get(&format!("url={}", encode(&app.page_url()))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_common_headers(&response);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "url is unreachable: Request timed out after 1 seconds"
    );
}

#[tokio::test]
async fn private_target_is_unreachable_by_default() {
    let app = setup_test_app_with(ServerConfig {
        timeout: Duration::from_secs(5),
        ..ServerConfig::default()
    })
    .await;
    app.serve("text/html", ARTICLE).await;

    let response = app.get(&format!("url={}", encode(&app.page_url()))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("SSRF blocked"));
    assert!(app.remote.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_body_returns_400() {
    let app = setup_test_app().await;
    app.serve("text/html", "").await;

    let response = app.get(&format!("url={}", encode(&app.page_url()))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "empty body");
}

// ---------------------------------------------------------------------------
// JSON targets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn json_body_is_returned_verbatim() {
    let app = setup_test_app().await;
    app.serve("application/json", r#"{"a":1}"#).await;

    let response = app
        .get(&format!("url={}&title=h1", encode(&app.page_url())))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_common_headers(&response);
    let json = body_json(response).await;
    assert_eq!(json["json"], serde_json::json!({"a": 1}));
    assert_eq!(json["status"], 200);
    assert_eq!(json["statusText"], "OK");
    assert_eq!(
        json["headers"]["content-type"],
        serde_json::json!(["application/json"])
    );
    for absent in ["meta", "favicons", "jsonLD", "scrape", "summary"] {
        assert!(json.get(absent).is_none(), "{absent} should be absent");
    }
}

// ---------------------------------------------------------------------------
// HTML targets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn html_metadata_is_extracted() {
    let app = setup_test_app().await;
    app.serve("text/html; charset=utf-8", ARTICLE).await;

    let response = app
        .get(&format!("url={}&title=h1", encode(&app.page_url())))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_common_headers(&response);
    let json = body_json(response).await;

    assert_eq!(json["meta"]["description"], "hi");
    assert_eq!(json["meta"]["og:title"], "T");
    assert_eq!(
        json["favicons"],
        serde_json::json!([{
            "rel": "icon",
            "href": format!("{}/favicon.ico", app.remote.uri()),
        }])
    );
    assert_eq!(json["jsonLD"], serde_json::json!({"x": 1}));
    assert_eq!(json["summary"]["title"], "T");
    assert_eq!(json["summary"]["description"], "hi");
    assert_eq!(
        json["summary"]["image"],
        format!("{}/cover.png", app.remote.uri())
    );
    assert!(json.get("json").is_none());

    let titles = json["scrape"]["title"].as_array().unwrap();
    assert_eq!(titles.len(), 2);
    assert_eq!(titles[0]["text"], "First heading");
    assert_eq!(titles[0]["html"], "First <em>heading</em>");
    assert_eq!(titles[0]["attributes"], serde_json::json!({"class": "lead"}));
    assert_eq!(titles[1]["text"], "Second heading");
    assert_eq!(titles[1]["attributes"], serde_json::json!({}));
}

#[tokio::test]
async fn malformed_json_ld_is_omitted() {
    let app = setup_test_app().await;
    app.serve(
        "text/html",
        r#"<html><head><script type="application/ld+json">{"x": </script></head></html>"#,
    )
    .await;

    let response = app.get(&format!("url={}", encode(&app.page_url()))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json.get("jsonLD").is_none());
    assert!(json.get("scrape").is_none());
}

#[tokio::test]
async fn unmatched_query_yields_empty_list() {
    let app = setup_test_app().await;
    app.serve("text/html", "<html><body><p>text</p></body></html>")
        .await;

    let response = app
        .get(&format!(
            "url={}&images={}",
            encode(&app.page_url()),
            encode(r#"img[src*="imgur.com"]"#)
        ))
        .await;

    let json = body_json(response).await;
    assert_eq!(json["scrape"], serde_json::json!({"images": []}));
}

#[tokio::test]
async fn repeated_headers_are_preserved() {
    let app = setup_test_app().await;
    app.answer_probe().await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "a=1")
                .append_header("set-cookie", "b=2")
                .set_body_string("<p>cookies</p>"),
        )
        .mount(&app.remote)
        .await;

    let response = app.get(&format!("url={}", encode(&app.page_url()))).await;

    let json = body_json(response).await;
    assert_eq!(json["headers"]["set-cookie"], serde_json::json!(["a=1", "b=2"]));
}

#[tokio::test]
async fn probe_status_is_reported() {
    let app = setup_test_app().await;
    Mock::given(method("OPTIONS"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(405))
        .mount(&app.remote)
        .await;
    Mock::given(method("GET"))
        .and(path(PAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>hello</p>"))
        .mount(&app.remote)
        .await;

    let response = app.get(&format!("url={}", encode(&app.page_url()))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], 405);
    assert_eq!(json["statusText"], "Method Not Allowed");
}

#[tokio::test]
async fn repeated_requests_are_identical() {
    let app = setup_test_app().await;
    app.serve("text/html", ARTICLE).await;
    let query = format!("url={}&title=h1", encode(&app.page_url()));

    let mut first = body_json(app.get(&query).await).await;
    let mut second = body_json(app.get(&query).await).await;
    for json in [&mut first, &mut second] {
        json["headers"].as_object_mut().unwrap().remove("date");
    }

    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// Preflight, usage, health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preflight_returns_cors_headers() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api")
                .header("origin", "https://client.example")
                .header("access-control-request-method", "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_common_headers(&response);
}

#[tokio::test]
async fn usage_page_describes_endpoint() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("/api?url=<targetUrl>"));
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
}
