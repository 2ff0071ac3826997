//! HTTP Server & Routing Integration Tests
//!
//! Drive the router in-process with `tower::ServiceExt::oneshot`.

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use helpers::{segment_payload, test_state, word_list_reply, ScriptedInferenceClient, ADMIN_TOKEN};
use http_body_util::BodyExt;
use rhyme_analyzer::build_router;
use rhyme_analyzer::services::InferenceError;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app(client: std::sync::Arc<ScriptedInferenceClient>) -> Router {
    build_router(test_state(client))
}

fn analyze_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

fn header_str<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {}", name))
        .to_str()
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_module_and_cache() {
    let app = test_app(ScriptedInferenceClient::new(vec![]));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "rhyme-analyzer");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["cache_entries"], 0);
    assert!(json["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_analyze_word_list_then_cache_hit() {
    let client = ScriptedInferenceClient::new(vec![Ok(word_list_reply(vec![(
        vec!["night", "light"],
        "-ight",
    )]))]);
    let app = test_app(client.clone());
    let body = json!({"text": "Into the night, toward the light", "rhyme_scheme": "perfect"});

    let response = app.clone().oneshot(analyze_request(body.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-cache"), "miss");
    assert_eq!(header_str(&response, "x-analysis-warnings"), "0");
    let first = body_json(response).await;
    assert_eq!(first["type"], "perfect");
    assert_eq!(first["data"][0]["words"], json!(["night", "light"]));
    assert_eq!(first["data"][0]["description"], "-ight");

    let response = app.oneshot(analyze_request(body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-cache"), "hit");
    assert_eq!(body_json(response).await, first);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn test_analyze_default_scheme_returns_group_array() {
    let client = ScriptedInferenceClient::new(vec![Ok(segment_payload(vec![(
        "ay",
        "long a",
        vec![("ay", "day", 1, 3), ("ay", "way", 5, 7)],
    )]))]);
    let app = test_app(client);

    let response = app
        .oneshot(analyze_request(json!({"text": "day way"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let groups = json.as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["id"], "ay");
    assert_eq!(groups[0]["segments"][1]["global_start"], 5);
    assert_eq!(groups[0]["segments"][1]["parent_word"], "way");
}

#[tokio::test]
async fn test_analyze_reports_warning_count() {
    let client = ScriptedInferenceClient::new(vec![Ok("Sorry, no patterns.".to_string())]);
    let app = test_app(client);

    let response = app
        .oneshot(analyze_request(json!({"text": "nothing rhymes here"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-analysis-warnings"), "1");
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_analyze_malformed_input_envelopes() {
    let cases = vec![
        json!({"text": ""}),
        json!({"text": "   "}),
        json!({"text": "a".repeat(10_001)}),
        json!({"scheme": "perfect"}),
        json!({"text": 42}),
        json!({"text": "roses", "scheme": "limerick"}),
    ];

    for body in cases {
        let client = ScriptedInferenceClient::new(vec![]);
        let app = test_app(client.clone());

        let response = app.oneshot(analyze_request(body.clone())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        let json = body_json(response).await;
        assert_eq!(json["error"], "malformed_input", "body: {}", body);
        assert!(json["message"].is_string());
        assert_eq!(client.calls(), 0);
    }
}

#[tokio::test]
async fn test_analyze_unparsable_body() {
    let app = test_app(ScriptedInferenceClient::new(vec![]));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analyze")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "malformed_input");
}

#[tokio::test]
async fn test_upstream_failure_is_service_unavailable() {
    let client = ScriptedInferenceClient::new(vec![Err(InferenceError::ServiceUnavailable(
        "HTTP 503: backend pool exhausted at 10.1.2.3".to_string(),
    ))]);
    let app = test_app(client);

    let response = app
        .clone()
        .oneshot(analyze_request(json!({"text": "moon june"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["error"], "upstream_unavailable");
    assert!(!json["message"].as_str().unwrap().contains("10.1.2.3"));

    // Failure kind is visible on the health endpoint and nothing was cached
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let health = body_json(response).await;
    assert_eq!(health["cache_entries"], 0);
    assert_eq!(health["last_error"], "upstream_unavailable");
}

#[tokio::test]
async fn test_health_last_error_omits_upstream_body() {
    let client = ScriptedInferenceClient::new(vec![Err(InferenceError::RateLimited(
        "{\"error\":{\"message\":\"org quota for acct-7731 exceeded\"}}".to_string(),
    ))]);
    let app = test_app(client);

    let response = app
        .clone()
        .oneshot(analyze_request(json!({"text": "moon june"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let text = body_text(response).await;
    assert!(!text.contains("acct-7731"), "health: {}", text);
    let health: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(health["last_error"], "upstream_unavailable");
}

#[tokio::test]
async fn test_upstream_auth_failure_is_generic_internal() {
    let client = ScriptedInferenceClient::new(vec![Err(InferenceError::AuthFailure(
        "HTTP 401".to_string(),
    ))]);
    let app = test_app(client);

    let response = app
        .oneshot(analyze_request(json!({"text": "moon june"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "internal");
    assert!(!json["message"].as_str().unwrap().contains("401"));
}

#[tokio::test]
async fn test_metrics_requires_admin_token() {
    let app = test_app(ScriptedInferenceClient::new(vec![]));

    for auth in [None, Some("Bearer wrong-token"), Some("Basic abc")] {
        let mut request = Request::builder().uri("/metrics");
        if let Some(auth) = auth {
            request = request.header(header::AUTHORIZATION, auth);
        }
        let response = app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "forbidden");
    }
}

#[tokio::test]
async fn test_metrics_with_admin_token() {
    let client = ScriptedInferenceClient::new(vec![Ok(word_list_reply(vec![(
        vec!["cat", "hat"],
        "-at",
    )]))]);
    let app = test_app(client);

    let response = app
        .clone()
        .oneshot(analyze_request(json!({"text": "cat hat", "scheme": "perfect"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_str(&response, "content-type").starts_with("text/plain"));
    let text = body_text(response).await;
    assert!(text.contains("rhyme_analysis_requests_total{endpoint=\"/api/analyze\",status=\"200\"} 1"));
    assert!(text.contains("rhyme_analysis_patterns_total{pattern_type=\"perfect\"} 1"));
    assert!(text.contains("rhyme_analysis_cache_misses_total 1"));
}

#[tokio::test]
async fn test_analyze_rate_limited_per_client() {
    let client = ScriptedInferenceClient::new(vec![]);
    let app = build_router(test_state(client).with_analyze_quota(2));

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(analyze_request(json!({"text": ""})))
            .await
            .unwrap();
        statuses.push(response.status());
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            assert_eq!(body_json(response).await["error"], "rate_limited");
        }
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::BAD_REQUEST,
            StatusCode::BAD_REQUEST,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );

    // Other routes are not limited
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_not_found() {
    let app = test_app(ScriptedInferenceClient::new(vec![]));

    let response = app
        .oneshot(Request::builder().uri("/api/unknown").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_cors_is_permissive() {
    let app = test_app(ScriptedInferenceClient::new(vec![]));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(header_str(&response, "access-control-allow-origin"), "*");
}
