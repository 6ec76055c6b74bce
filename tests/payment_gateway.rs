//! Gateway client tests against a mocked payment API.

use homelink_server::error::PaymentError;
use homelink_server::payments::{CaptureRequest, PaymentClient};
use rust_decimal_macros::dec;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn capture_request() -> CaptureRequest {
    CaptureRequest {
        amount: dec!(120.00),
        currency: "EUR".to_string(),
        reference: Uuid::new_v4(),
        description: "HomeLink booking".to_string(),
    }
}

#[test_log::test(tokio::test)]
async fn test_capture_sends_expected_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/charges"))
        .and(header("X-Api-Key", "secret_key"))
        .and(body_partial_json(serde_json::json!({
            "amount": "120.00",
            "currency": "EUR"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "ch_42",
            "status": "captured"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PaymentClient::new(&server.uri(), "secret_key".to_string()).unwrap();
    let charge = client.capture(&capture_request()).await.unwrap();

    assert_eq!(charge.id, "ch_42");
    assert_eq!(charge.status, "captured");
}

#[test_log::test(tokio::test)]
async fn test_capture_surfaces_gateway_decline() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/charges"))
        .respond_with(ResponseTemplate::new(402).set_body_string("card declined"))
        .mount(&server)
        .await;

    let client = PaymentClient::new(&server.uri(), "secret_key".to_string()).unwrap();
    let err = client.capture(&capture_request()).await.unwrap_err();

    match err {
        PaymentError::Gateway { status, body } => {
            assert_eq!(status, 402);
            assert_eq!(body, "card declined");
        }
        other => panic!("expected gateway error, got {:?}", other),
    }
}

#[test_log::test(tokio::test)]
async fn test_capture_rejects_malformed_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/charges"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = PaymentClient::new(&server.uri(), "secret_key".to_string()).unwrap();
    let err = client.capture(&capture_request()).await.unwrap_err();

    assert!(matches!(err, PaymentError::InvalidResponse(_)));
}

#[test_log::test(tokio::test)]
async fn test_refund_hits_charge_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/charges/ch_42/refund"))
        .and(header("X-Api-Key", "secret_key"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = PaymentClient::new(&server.uri(), "secret_key".to_string()).unwrap();
    assert!(client.refund("ch_42").await.is_ok());
}

#[test_log::test(tokio::test)]
async fn test_refund_surfaces_unknown_charge() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/charges/ch_missing/refund"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such charge"))
        .mount(&server)
        .await;

    let client = PaymentClient::new(&server.uri(), "secret_key".to_string()).unwrap();
    let err = client.refund("ch_missing").await.unwrap_err();

    assert!(matches!(err, PaymentError::Gateway { status: 404, .. }));
}
