mod common;

use common::{test_config, test_pipeline};
use courier_bridge::{Outcome, Pipeline, RequestDescriptor};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn direct_success_needs_no_proxy() {
    let api = MockServer::start().await;
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shipments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [1, 2]})))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&proxy)
        .await;

    let pipeline = test_pipeline(Some(proxy.uri()), None);
    let outcome = pipeline
        .run_request(RequestDescriptor::new(format!("{}/shipments", api.uri())))
        .await
        .unwrap();
    match outcome {
        Outcome::Success { data } => assert_eq!(data, json!({"data": [1, 2]})),
        other => panic!("unexpected outcome: {}", other.variant()),
    }
}

#[tokio::test]
async fn client_errors_do_not_trigger_fallback() {
    let api = MockServer::start().await;
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "no such courier"})))
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&proxy)
        .await;

    let pipeline = test_pipeline(Some(proxy.uri()), None);
    let outcome = pipeline
        .run_request(RequestDescriptor::new(format!("{}/missing", api.uri())))
        .await
        .unwrap();
    match outcome {
        Outcome::ClientError { status, message, .. } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no such courier");
        }
        other => panic!("unexpected outcome: {}", other.variant()),
    }
}

#[tokio::test]
async fn server_error_falls_back_to_proxy() {
    let api = MockServer::start().await;
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&api)
        .await;
    // The proxy receives the descriptor as its POST body and answers
    // with the upstream payload.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"apiIntent": "generic_request", "method": "GET"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": ["recovered"]})))
        .expect(1)
        .mount(&proxy)
        .await;

    let pipeline = test_pipeline(Some(proxy.uri()), None);
    let outcome = pipeline
        .run_request(RequestDescriptor::new(format!("{}/flaky", api.uri())))
        .await
        .unwrap();
    match outcome {
        Outcome::Success { data } => assert_eq!(data, json!({"data": ["recovered"]})),
        other => panic!("unexpected outcome: {}", other.variant()),
    }
}

#[tokio::test]
async fn proxy_error_envelope_is_classified_by_upstream_status() {
    let api = MockServer::start().await;
    let proxy = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": true,
            "status": 503,
            "statusText": "Service Unavailable",
            "message": "courier API unavailable",
        })))
        .mount(&proxy)
        .await;

    let pipeline = test_pipeline(Some(proxy.uri()), None);
    let outcome = pipeline
        .run_request(RequestDescriptor::new(format!("{}/x", api.uri())))
        .await
        .unwrap();
    match outcome {
        Outcome::ServerError { status, .. } => assert_eq!(status, 503),
        other => panic!("unexpected outcome: {}", other.variant()),
    }
}

#[tokio::test]
async fn exhausted_transports_classify_as_network_error() {
    // Nothing listens on port 9: direct and both proxies all fail.
    let pipeline = test_pipeline(
        Some("http://127.0.0.1:9/proxy".to_string()),
        Some("http://127.0.0.1:9/proxy-b".to_string()),
    );
    let outcome = pipeline
        .run_request(RequestDescriptor::new("http://127.0.0.1:9/api"))
        .await
        .unwrap();
    match outcome {
        Outcome::NetworkError { .. } => {}
        other => panic!("unexpected outcome: {}", other.variant()),
    }
}

#[tokio::test]
async fn private_hosts_short_circuit_without_a_transport_attempt() {
    // Default config keeps the private-network guard on.
    let pipeline = Pipeline::with_defaults().unwrap();
    for url in ["http://127.0.0.1/api", "http://192.168.1.5/x"] {
        let outcome = pipeline
            .run_request(RequestDescriptor::new(url))
            .await
            .unwrap();
        match outcome {
            Outcome::NetworkError {
                code, suggestion, ..
            } => {
                assert_eq!(code, "PRIVATE_NETWORK");
                assert!(suggestion.unwrap().contains("public endpoint"));
            }
            other => panic!("unexpected outcome for {}: {}", url, other.variant()),
        }
    }
}

#[tokio::test]
async fn oversized_body_returns_truncated_sample() {
    let api = MockServer::start().await;
    let items: Vec<serde_json::Value> = (0..1_500)
        .map(|i| json!({"id": i, "tracking": format!("TRK-{:06}", i)}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/bulk"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": items})))
        .mount(&api)
        .await;

    let mut config = test_config(None, None);
    config.executor.response_ceiling_bytes = 10_000;
    let pipeline = Pipeline::new(config, None).unwrap();
    let outcome = pipeline
        .run_request(RequestDescriptor::new(format!("{}/bulk", api.uri())))
        .await
        .unwrap();
    match outcome {
        Outcome::TooLarge {
            approx_size_bytes,
            truncated_data,
            ..
        } => {
            assert!(approx_size_bytes > 10_000);
            assert_eq!(truncated_data["field"], "data");
            assert_eq!(truncated_data["items"].as_array().unwrap().len(), 100);
        }
        other => panic!("unexpected outcome: {}", other.variant()),
    }
}

#[tokio::test]
async fn detected_pagination_surfaces_without_following() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [1],
            "next_page_url": format!("{}/page2", api.uri()),
        })))
        .mount(&api)
        .await;

    let pipeline = test_pipeline(None, None);
    let outcome = pipeline
        .run_request(RequestDescriptor::new(format!("{}/page1", api.uri())))
        .await
        .unwrap();
    match outcome {
        Outcome::Paginated {
            next_page_token, ..
        } => assert!(next_page_token.unwrap().ends_with("/page2")),
        other => panic!("unexpected outcome: {}", other.variant()),
    }
}

#[tokio::test]
async fn followed_pagination_merges_array_fields() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [3],
            "has_more": false,
        })))
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [1, 2],
            "has_more": true,
        })))
        .mount(&api)
        .await;

    let pipeline = test_pipeline(None, None);
    let mut descriptor = RequestDescriptor::new(format!("{}/orders", api.uri()));
    descriptor.follow_pagination = true;
    let outcome = pipeline.run_request(descriptor).await.unwrap();
    match outcome {
        Outcome::Success { data } => assert_eq!(data["data"], json!([1, 2, 3])),
        other => panic!("unexpected outcome: {}", other.variant()),
    }
}

#[tokio::test]
async fn resolved_auth_travels_on_the_direct_call() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/secure"))
        .and(header("Authorization", "Basic YWxpY2U6c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&api)
        .await;

    let pipeline = test_pipeline(None, None);
    let descriptor = courier_bridge::parse(&format!(
        "curl -u 'alice:secret' {}/secure",
        api.uri()
    ))
    .unwrap();
    let outcome = pipeline.run_request(descriptor).await.unwrap();
    assert!(outcome.is_success());
}
