//! `HttpComputeClient` against a mock Computation Service.

use parkconf::BaselineConfig;
use parkshift::{
    ComputeService, HttpComputeClient, ModeChange, ParameterSet, ServiceError, ValidatedPayload,
    Validator, GENERIC_TRANSPORT_ERROR,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/api/calculate";

fn payload(change: Option<ModeChange>) -> ValidatedPayload {
    let baseline = BaselineConfig::default();
    Validator::new(baseline.modes())
        .validate(&ParameterSet::from_baseline(&baseline), change.as_ref())
        .unwrap()
}

fn client(server: &MockServer) -> HttpComputeClient {
    HttpComputeClient::new(&format!("{}{}", server.uri(), ENDPOINT), Duration::from_secs(5))
        .unwrap()
}

#[tokio::test]
async fn posts_payload_and_keeps_presentation_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "mode_shares_input": {"Drive": 71.0, "Transit": 12.0},
            "population_per_year": [10000.0, 10200.0, 10400.0, 10600.0, 10800.0],
            "parking_cost_per_space": 5000.0,
            "changed_mode_key": "Drive",
            "new_value_percent": 75.0,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "processed_mode_shares": {
                "Bike": 4.0, "Carpool": 2.0, "Drive": 75.0, "Transit": 11.0, "Walk": 8.0
            },
            "years": [2025, 2026, 2027, 2028, 2029],
            "parking": {"demand": [3550, 3620, 3690, 3760, 3830]},
            "summary_table": [{"year": 2025, "shortfall": 0}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .compute(payload(Some(ModeChange {
            mode: "Drive".to_string(),
            percent: 75.0,
        })))
        .await
        .unwrap();

    assert_eq!(result.processed_mode_shares.get("Drive"), Some(&75.0));
    assert_eq!(result.processed_mode_shares.len(), 5);
    assert_eq!(result.years(), Some(&json!([2025, 2026, 2027, 2028, 2029])));
    assert_eq!(
        result.summary_table(),
        Some(&json!([{"year": 2025, "shortfall": 0}]))
    );
    assert!(result.presentation.contains_key("parking"));
}

#[tokio::test]
async fn unchanged_key_is_sent_as_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_partial_json(json!({
            "changed_mode_key": null,
            "new_value_percent": null,
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"processed_mode_shares": {"Drive": 71.0}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    client(&server).compute(payload(None)).await.unwrap();
}

#[tokio::test]
async fn service_error_text_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "Mode shares must sum to 100"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).compute(payload(None)).await.unwrap_err();
    assert_eq!(
        err,
        ServiceError::Status {
            status: 400,
            message: "Mode shares must sum to 100".to_string(),
        }
    );
}

#[tokio::test]
async fn failure_without_body_uses_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server).compute(payload(None)).await.unwrap_err();
    assert_eq!(
        err,
        ServiceError::Status {
            status: 502,
            message: GENERIC_TRANSPORT_ERROR.to_string(),
        }
    );
}

#[tokio::test]
async fn success_without_shares_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"years": [2025]})))
        .mount(&server)
        .await;

    let err = client(&server).compute(payload(None)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Malformed(_)), "got {:?}", err);
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"processed_mode_shares": {}}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = HttpComputeClient::new(
        &format!("{}{}", server.uri(), ENDPOINT),
        Duration::from_millis(100),
    )
    .unwrap();
    let err = client.compute(payload(None)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    // Nothing listens on a port freed right after binding it.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let url = format!("http://127.0.0.1:{}{}", port, ENDPOINT);

    let client = HttpComputeClient::new(&url, Duration::from_secs(1)).unwrap();
    let err = client.compute(payload(None)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn session_applies_answer_from_http_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_partial_json(json!({"changed_mode_key": "Walk"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "processed_mode_shares": {
                "Bike": 5.0, "Carpool": 3.0, "Drive": 67.0, "Transit": 12.0, "Walk": 13.0
            },
            "years": [2025, 2026, 2027, 2028, 2029],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = parkconf::ParkConfig::default();
    config.infra.service.url = format!("{}{}", server.uri(), ENDPOINT);
    let service = HttpComputeClient::new(&config.infra.service.url, config.service_timeout())
        .unwrap();
    let session = parkshift::SessionHandle::spawn(
        parkshift::CoordinatorOptions::from_config(&config),
        std::sync::Arc::new(service),
    );
    let mut view = session.view();

    session
        .send(parkshift::Intent::Commit {
            field: parkshift::Field::Share("Walk".to_string()),
            value: Some(parkshift::CommitValue::Scalar(13.0)),
        })
        .unwrap();

    let settled = tokio::time::timeout(
        Duration::from_secs(5),
        view.wait_for(|v| v.applied_token.is_some()),
    )
    .await
    .expect("no answer applied")
    .unwrap()
    .clone();

    assert_eq!(
        settled.params.mode_shares.get("Drive"),
        Some(&parkshift::InputValue::Number(67.0))
    );
    assert!(!settled.loading);

    session.shutdown().await;
}
