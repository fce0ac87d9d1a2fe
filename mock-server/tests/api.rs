use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_method_query_and_headers() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/echo?a=1&b=2")
                .header("accept", "application/json")
                .header("x-custom", "1")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.path, "/echo");
    assert_eq!(echo.query.as_deref(), Some("a=1&b=2"));
    assert_eq!(echo.headers["x-custom"], "1");
    assert!(echo.body.is_empty());
}

#[tokio::test]
async fn echo_returns_body_verbatim() {
    let resp = app()
        .oneshot(json_request("POST", "/echo", r#"{"title":"x"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.headers["content-type"], "application/json");
    assert_eq!(echo.body, r#"{"title":"x"}"#);
}

#[tokio::test]
async fn echo_accepts_every_verb() {
    for method in ["DELETE", "OPTIONS", "PUT", "PATCH"] {
        let resp = app()
            .oneshot(json_request(method, "/echo", ""))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{method}");
        let echo: Echo = body_json(resp).await;
        assert_eq!(echo.method, method);
    }
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let resp = app()
        .oneshot(Request::builder().uri("/echo").body(String::new()).unwrap())
        .await
        .unwrap();

    let id = resp.headers().get("x-request-id").unwrap().to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

// --- status ---

#[tokio::test]
async fn status_route_responds_with_requested_code() {
    for code in [200u16, 204, 299, 300, 404, 500] {
        let resp = app()
            .oneshot(
                Request::builder()
                    .uri(format!("/status/{code}"))
                    .body(String::new())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), code);
    }
}

#[tokio::test]
async fn status_route_rejects_non_numeric_code() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/status/teapot")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(!body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn status_route_maps_invalid_code_to_400() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/status/42")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- delay ---

#[tokio::test]
async fn delay_route_waits_then_succeeds() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/delay/5")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = body_json(resp).await;
    assert_eq!(json["delayed_ms"], 5);
}
