use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_core::{MockConfig, MockServer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceExt;

fn test_router() -> Router {
    let config = MockConfig {
        outbound_timeout_secs: 2,
        ..Default::default()
    };
    MockServer::new(config).unwrap().router()
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

fn post_rules(content_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/rules")
        .header("content-type", content_type)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_root_works() {
    let router = test_router();
    let (status, body) = call(&router, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "It works !");
}

#[tokio::test]
async fn test_json_rules_match_and_fall_back() {
    let router = test_router();
    let rules = r#"[
        {"type": "inout",
         "request": {"method": "GET", "path": "/search?q=rust", "headers": {"X-Token": "abc"}},
         "response": {"status": 200, "headers": {"X-Mock": "1"}, "body": "found"}}
    ]"#;
    let (status, _) = call(&router, post_rules("application/json", rules)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let matching = Request::builder()
        .uri("/search?q=rust")
        .header("x-token", "abc")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(matching).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-mock").unwrap(), "1");

    let (status, body) = call(&router, get("/search?q=go")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "Request not matching expectations.");
}

#[tokio::test]
async fn test_yaml_rules() {
    let router = test_router();
    let rules = "
- type: inout
  request: { method: PUT, path: /items, body: '{\"id\":1}' }
  response: { status: 201, body: created }
";
    let (status, _) = call(&router, post_rules("text/yaml", rules)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let request = Request::builder()
        .method("PUT")
        .uri("/items")
        .body(Body::from("{\"id\":1}"))
        .unwrap();
    let (status, body) = call(&router, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, "created");
}

#[tokio::test]
async fn test_route_conflict_is_reported() {
    let router = test_router();
    let rules = r#"[
        {"type": "inout", "request": {"method": "GET", "path": "/a"}, "response": {"status": 200, "body": "a"}},
        {"type": "inout", "request": {"method": "GET", "path": "/a/"}, "response": {"status": 200}}
    ]"#;
    let (status, body) = call(&router, post_rules("application/json", rules)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["message"], "The route 'GET -> /a/' cannot be created.");

    // the rule before the conflict stays live
    let (status, body) = call(&router, get("/a")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "a");
}

#[tokio::test]
async fn test_control_route_cannot_be_mocked() {
    let router = test_router();
    let rules = r#"[{"type": "inout", "request": {"method": "POST", "path": "/attack"}, "response": {"status": 200}}]"#;
    let (status, body) = call(&router, post_rules("application/json", rules)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("cannot be created"));
}

#[tokio::test]
async fn test_head_root_cannot_be_mocked() {
    let router = test_router();
    let rules = r#"[{"type": "inout", "request": {"method": "HEAD", "path": "/"}, "response": {"status": 200, "headers": {"X-Mock": "1"}}}]"#;
    let (status, body) = call(&router, post_rules("application/json", rules)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["message"], "The route 'HEAD -> /' cannot be created.");

    let request = Request::builder()
        .method("HEAD")
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-mock").is_none());
}

#[tokio::test]
async fn test_other_methods_on_control_paths_reach_rules() {
    let router = test_router();
    let rules = r#"[{"type": "inout", "request": {"method": "DELETE", "path": "/rules"}, "response": {"status": 202}}]"#;
    let (status, _) = call(&router, post_rules("application/json", rules)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let request = Request::builder()
        .method("DELETE")
        .uri("/rules")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(&router, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_bad_rule_documents() {
    let router = test_router();

    let (status, body) = call(&router, post_rules("text/plain", "[]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["message"], "Wrong content type");

    let (status, _) = call(&router, post_rules("application/json", "[{\"type\": 1}]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unbound_route_is_not_found() {
    let router = test_router();
    let (status, _) = call(&router, get("/nothing/here")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attack_errors() {
    let router = test_router();
    let attack = |uri: &str| {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    };

    // an empty corpus is reported whatever the type
    for uri in ["/attack?type=xss", "/attack?type=nuke", "/attack"] {
        let (status, body) = call(&router, attack(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error: no rules found.");
    }

    let rules = r#"[{"type": "inout", "request": {"method": "GET", "path": "/x"}, "response": {"status": 200}}]"#;
    call(&router, post_rules("application/json", rules)).await;

    for uri in ["/attack", "/attack?type=nuke", "/attack?type=XSS"] {
        let (status, body) = call(&router, attack(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Error: wrong/no attack type given.");
    }

    // no query, header or body to inject into: nothing produced, still accepted
    let (status, _) = call(&router, attack("/attack?type=xss")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

/// Minimal target that counts the requests it receives
async fn spawn_target() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().fallback(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            "hit"
        }
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), hits)
}

#[tokio::test]
async fn test_outbound_rules_fire_over_a_real_listener() {
    let (target, hits) = spawn_target().await;

    let server = MockServer::new(MockConfig::default()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(listener, async move {
        let _ = stop_rx.await;
    }));

    let rules = format!(
        r#"[{{"type": "outin", "request": {{"method": "GET", "path": "{}/ping"}}, "repeat": 3, "interval": 10}}]"#,
        target
    );
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/rules", base))
        .header("content-type", "application/json")
        .body(rules)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    for _ in 0..100 {
        if hits.load(Ordering::SeqCst) >= 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);

    let root = reqwest::get(&base).await.unwrap().text().await.unwrap();
    assert_eq!(root, "It works !");

    stop_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_admin_api() {
    // high ports to avoid conflicts
    let config = MockConfig {
        listen_address: "127.0.0.1".to_string(),
        listen_port: 19190,
        admin_port: 19191,
        ..Default::default()
    };
    let server = MockServer::new(config).unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(server.run_until(async move {
        let _ = stop_rx.await;
    }));
    tokio::time::sleep(Duration::from_millis(300)).await;

    let resp = reqwest::get("http://127.0.0.1:19191/health").await.unwrap();
    assert!(resp.status().is_success());
    assert!(resp.text().await.unwrap().contains("ok"));

    reqwest::get("http://127.0.0.1:19190/unbound").await.unwrap();

    let metrics: serde_json::Value = reqwest::get("http://127.0.0.1:19191/metrics")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(metrics["inbound"]["requests"], 1);
    assert_eq!(metrics["inbound"]["unrouted"], 1);
    assert_eq!(metrics["routes"], 0);

    stop_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
