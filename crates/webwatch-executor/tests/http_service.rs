// Exercises the HTTP execution client against a mock execution service.

use serde_json::json;
use webwatch_core::config::ExecutorConfig;
use webwatch_executor::{ExecError, ExecutionService, HttpExecutionService, JobRequest};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ExecutorConfig {
    ExecutorConfig {
        endpoint: format!("{}/", server.uri()),
        api_token: Some("t0ken".to_string()),
        timeout_secs: 5,
        poll_interval_ms: 10,
    }
}

fn request() -> JobRequest {
    let mut req = JobRequest {
        code: "export default async () => ({ price: 10 })".to_string(),
        ..Default::default()
    };
    req.vars.insert("url".to_string(), "https://example.com".to_string());
    req
}

#[tokio::test]
async fn creates_polls_and_deletes() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .and(header("authorization", "Bearer t0ken"))
        .and(body_partial_json(json!({"vars": {"url": "https://example.com"}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"uuid": "u1", "status": "queued"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uuid": "u1",
            "status": "done",
            "results": {"price": 10, "title": "Widget"},
            "error": ""
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/jobs/u1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = HttpExecutionService::new(&config(&server));
    let job = service.execute_sync(&request()).await.unwrap();

    assert_eq!(job.failure(), None);
    let snap = job.snapshot();
    assert_eq!(snap.get("price").map(String::as_str), Some("10"));
    assert_eq!(snap.get("title").map(String::as_str), Some("Widget"));
}

#[tokio::test]
async fn job_level_error_is_returned_not_raised() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uuid": "u2",
            "status": "done",
            "error": "navigation timeout"
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/jobs/u2"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let service = HttpExecutionService::new(&config(&server));
    let job = service.execute_sync(&request()).await.unwrap();
    assert_eq!(job.failure(), Some("navigation timeout"));
}

#[tokio::test]
async fn api_errors_carry_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let service = HttpExecutionService::new(&config(&server));
    let err = service.execute_sync(&request()).await.unwrap_err();
    assert!(matches!(err, ExecError::Api { status: 401, ref message } if message == "bad token"));
}

#[tokio::test]
async fn never_finishing_job_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"uuid": "u3", "status": "queued"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs/u3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"uuid": "u3", "status": "running"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/jobs/u3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut cfg = config(&server);
    cfg.timeout_secs = 1;
    let service = HttpExecutionService::new(&cfg);
    let err = service.execute_sync(&request()).await.unwrap_err();
    assert!(matches!(err, ExecError::Timeout { secs: 1 }));
}

#[tokio::test]
async fn failed_poll_still_deletes_the_job() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"uuid": "u4", "status": "queued"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs/u4"))
        .respond_with(ResponseTemplate::new(500).set_body_string("worker crashed"))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/jobs/u4"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = HttpExecutionService::new(&config(&server));
    let err = service.execute_sync(&request()).await.unwrap_err();
    assert!(matches!(err, ExecError::Api { status: 500, .. }));
}

#[tokio::test]
async fn unreachable_service_is_unavailable() {
    let cfg = ExecutorConfig {
        endpoint: "http://127.0.0.1:1".to_string(),
        api_token: None,
        timeout_secs: 5,
        poll_interval_ms: 10,
    };
    let service = HttpExecutionService::new(&cfg);
    let err = service.execute_sync(&request()).await.unwrap_err();
    assert!(matches!(err, ExecError::Unavailable(_)));
}
