//! Integration tests for the remote job client using wiremock
//!
//! The mock server plays the provider: runs are submitted, polled until
//! terminal, and their dataset fetched once.

mod common;

use std::time::Duration;

use poidata::apify::{JobError, RunStatus};
use poidata::models::{InputPayloadMaps, ScraperInputPayloadMaps};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{client_for, dataset, extractor_place, run_body};

fn coffee() -> InputPayloadMaps {
    InputPayloadMaps {
        search_strings_array: vec!["coffee".to_string()],
        location_query: "Gothenburg".to_string(),
        ..Default::default()
    }
}

async fn mount_submit(server: &MockServer, task: &str, run_id: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/actor-tasks/{task}/runs")))
        .respond_with(ResponseTemplate::new(201).set_body_json(run_body(run_id, "READY")))
        .mount(server)
        .await;
}

/// Run goes through RUNNING twice before succeeding; dataset is fetched once
#[tokio::test]
async fn test_run_succeeds_after_polling() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/actor-tasks/extractor-task/runs"))
        .and(query_param("maxItems", "25"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({"searchStringsArray": ["coffee"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(run_body("run-1", "READY")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("run-1", "RUNNING")))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("run-1", "SUCCEEDED")))
        .expect(1)
        .mount(&server)
        .await;

    let items = dataset(&[extractor_place("p1", 57.70, 11.97, "Cafe")]);
    Mock::given(method("GET"))
        .and(path("/actor-runs/run-1/dataset/items"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(items.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let handle = client.extract_pois(&coffee(), 25, true).await.unwrap();
    assert_eq!(handle.run_id(), "run-1");

    let data = handle.wait().await.unwrap();
    assert_eq!(data.as_ref(), items.as_slice());
}

#[tokio::test]
async fn test_failed_run_is_terminal() {
    let server = MockServer::start().await;
    mount_submit(&server, "extractor-task", "run-2").await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("run-2", "FAILED")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-2/dataset/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let result = client
        .extract_pois(&coffee(), 10, true)
        .await
        .unwrap()
        .wait()
        .await;

    match result {
        Err(JobError::RunFailed { run_id }) => assert_eq!(run_id, "run-2"),
        other => panic!("expected RunFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_aborted_and_timed_out_runs() {
    for (status, run_id) in [("ABORTED", "run-a"), ("TIMED-OUT", "run-t")] {
        let server = MockServer::start().await;
        mount_submit(&server, "extractor-task", run_id).await;

        Mock::given(method("GET"))
            .and(path(format!("/actor-runs/{run_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(run_body(run_id, status)))
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let err = client
            .extract_pois(&coffee(), 10, false)
            .await
            .unwrap()
            .wait()
            .await
            .unwrap_err();

        match (status, &err) {
            ("ABORTED", JobError::RunAborted { .. }) | ("TIMED-OUT", JobError::RunTimedOut { .. }) => {}
            _ => panic!("{status}: unexpected error {err:?}"),
        }
        assert!(err.is_terminal_run_failure());
    }
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let server = MockServer::start().await;

    let body = json!({"error": {"type": "token-not-valid", "message": "Authentication token is not valid"}});
    Mock::given(method("POST"))
        .and(path("/actor-tasks/extractor-task/runs"))
        .respond_with(ResponseTemplate::new(401).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let err = client.extract_pois(&coffee(), 10, true).await.unwrap_err();

    match &err {
        JobError::Status { status, body: Some(parsed) } => {
            assert_eq!(*status, 401);
            assert_eq!(parsed, &body);
        }
        other => panic!("expected Status error, got {other:?}"),
    }
    assert!(err.to_string().contains("401"));
    assert!(!err.is_recoverable());
}

#[tokio::test]
async fn test_poll_error_is_delivered_through_handle() {
    let server = MockServer::start().await;
    mount_submit(&server, "extractor-task", "run-5").await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-5"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let err = client
        .extract_pois(&coffee(), 10, true)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::Status { status: 503, body: None }));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_scraper_submits_without_item_cap() {
    let server = MockServer::start().await;
    mount_submit(&server, "scraper-task", "run-s").await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-s"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("run-s", "SUCCEEDED")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-s/dataset/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let payload = ScraperInputPayloadMaps {
        location_query: "Malmö".to_string(),
        all_places_no_search_action: "all_places_no_search_ocr".to_string(),
        ..Default::default()
    };
    let client = client_for(&server.uri());
    let data = client
        .scrape_pois(&payload, true)
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(data.as_ref(), b"[]");

    let requests = server.received_requests().await.unwrap();
    let submit = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    assert!(submit.url.query_pairs().all(|(k, _)| k != "maxItems"));
}

#[tokio::test]
async fn test_wait_until_cancels_locally() {
    let server = MockServer::start().await;
    mount_submit(&server, "extractor-task", "run-c").await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("run-c", "RUNNING")))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let handle = client.extract_pois(&coffee(), 10, false).await.unwrap();
    let err = handle
        .wait_until(tokio::time::sleep(Duration::from_millis(50)))
        .await
        .unwrap_err();

    match err {
        JobError::Cancelled { run_id } => assert_eq!(run_id, "run-c"),
        other => panic!("expected Cancelled, got {other:?}"),
    }

    // No abort request reaches the provider
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| !r.url.path().contains("abort")));
}

#[tokio::test]
async fn test_run_status_maps_remote_states() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/actor-runs/run-q"))
        .respond_with(ResponseTemplate::new(200).set_body_json(run_body("run-q", "READY")))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let info = client.run_status("run-q").await.unwrap();
    assert_eq!(info.id, "run-q");
    assert_eq!(info.run_status(), RunStatus::Queued);
    assert_eq!(info.default_dataset_id.as_deref(), Some("ds-run-q"));
}
