//! Signed calls, callbacks and client construction against a mock gateway.

use std::sync::Arc;

use paygate_client::{endpoints, ClientFactory, GatewayClient, ProtocolError};
use paygate_crypto::{CertificateResolver, IdentityRegistry, SignatureEngine, SigningIdentity};
use paygate_test_utils::{
    client_key_pair, gateway_key_pair, generate_key_pair, intruder_key_pair, test_client,
    test_settings, MockGateway, CLIENT_NAME,
};
use paygate_wire::{
    ClientRequest, ClientResponse, Localized, ResultCode, ServerResponse, LANG_EN, LANG_ES,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::TempDir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct PurchaseReceipt {
    #[serde(rename = "TransactionId")]
    transaction_id: String,
    #[serde(rename = "Amount")]
    amount: i64,
}

#[tokio::test]
async fn test_call_round_trip() {
    let receipt = PurchaseReceipt {
        transaction_id: "T-1".into(),
        amount: 100,
    };
    let gateway = MockGateway::default().with_ok(endpoints::PURCHASE, &receipt);
    let client = test_client(&gateway);

    let response: ServerResponse<PurchaseReceipt> = client
        .call(endpoints::PURCHASE, json!({"amount": 100, "currency": "UYU"}))
        .await;

    assert!(response.is_ok(), "{:?}", response.message(LANG_EN));
    assert_eq!(response.response, Some(receipt));
    assert_eq!(gateway.post_count(), 1);
    assert_eq!(gateway.key_fetch_count(), 1);
}

#[tokio::test]
async fn test_request_is_signed_by_client() {
    let gateway = MockGateway::default().with_ok(endpoints::PURCHASE, json!({}));
    let client = test_client(&gateway);

    let _: ServerResponse<Value> = client
        .call(endpoints::PURCHASE, json!({"amount": 100, "currency": "UYU"}))
        .await;

    let request = gateway.last_post().unwrap();
    assert_eq!(request.path, endpoints::PURCHASE);

    let envelope = request.envelope();
    assert_eq!(envelope.fingerprint(), client_key_pair().fingerprint());

    let key = client_key_pair().verification_key().unwrap();
    let body: ClientRequest<Value> = SignatureEngine::default()
        .verify_raw(&key, &envelope)
        .unwrap();
    assert_eq!(body.client, CLIENT_NAME);
    assert_eq!(body.request, Some(json!({"amount": 100, "currency": "UYU"})));
}

#[tokio::test]
async fn test_call_without_request_sends_client_only() {
    let gateway = MockGateway::default().with_ok(endpoints::ISSUERS, json!([{"Id": 1}]));
    let client = test_client(&gateway);

    let response: ServerResponse<Vec<Value>> = client.call_without_request(endpoints::ISSUERS).await;
    assert!(response.is_ok());
    assert_eq!(response.response.unwrap().len(), 1);

    let request = gateway.last_post().unwrap();
    assert_eq!(request.path, endpoints::ISSUERS);
    assert_eq!(request.envelope().payload(), &json!({"Client": CLIENT_NAME}));
    assert_eq!(gateway.post_count(), 1);
    assert_eq!(gateway.key_fetch_count(), 1);
}

#[tokio::test]
async fn test_server_failure_is_passed_through() {
    let failure = ServerResponse::<Value>::failure(
        ResultCode::Other(12),
        paygate_wire::LocalizedMessages::bilingual("Card declined", "Tarjeta rechazada"),
    );
    let gateway = MockGateway::default().with_response(endpoints::PURCHASE, failure);
    let client = test_client(&gateway);

    let response: ServerResponse<Value> = client.call(endpoints::PURCHASE, json!({})).await;
    assert_eq!(response.result_code, ResultCode::Other(12));
    assert_eq!(response.message(LANG_ES), Some("Tarjeta rechazada"));
    assert_eq!(response.error_message.as_deref(), Some("Card declined"));
}

#[tokio::test]
async fn test_expired_response_reports_expired() {
    let gateway = MockGateway::default()
        .with_ok(endpoints::PURCHASE, json!({}))
        .with_clock_offset(-601);
    let client = test_client(&gateway);
    // Trust the gateway key up front: the key lookup would be expired too.
    client
        .key_cache()
        .insert(gateway_key_pair().verification_key().unwrap())
        .await;

    let response: ServerResponse<Value> = client.call(endpoints::PURCHASE, json!({})).await;
    assert_eq!(response.result_code, ResultCode::Expired);
    assert_eq!(response.message(LANG_EN), Some("Object has expired"));
    assert!(response.response.is_none());
}

#[tokio::test]
async fn test_tampered_response_reports_invalid_signature() {
    let gateway = MockGateway::default()
        .with_ok(endpoints::PURCHASE, json!({}))
        .with_tampered_signatures();
    let client = test_client(&gateway);
    client
        .key_cache()
        .insert(gateway_key_pair().verification_key().unwrap())
        .await;

    let response: ServerResponse<Value> = client.call(endpoints::PURCHASE, json!({})).await;
    assert_eq!(response.result_code, ResultCode::InvalidSignature);
    assert!(response.message(LANG_ES).is_some());
}

#[tokio::test]
async fn test_unknown_signer_reports_invalid_fingerprint() {
    // Responses signed by a key whose lookup is vouched for by nobody trusted.
    let gateway = MockGateway::default()
        .serve_key(gateway_key_pair(), intruder_key_pair())
        .with_ok(endpoints::PURCHASE, json!({}));
    gateway.set_server_key(intruder_key_pair().clone());
    let client = test_client(&gateway);

    let response: ServerResponse<Value> = client.call(endpoints::PURCHASE, json!({})).await;
    assert_eq!(response.result_code, ResultCode::InvalidFingerprint);
    let expected = format!("Huella no encontrada: {}", intruder_key_pair().fingerprint());
    assert_eq!(response.message(LANG_ES), Some(expected.as_str()));
}

#[tokio::test]
async fn test_transport_failure_reports_system_error() {
    let gateway = MockGateway::default().with_transport_failure();
    let client = test_client(&gateway);

    let response: ServerResponse<Value> = client.call(endpoints::AUTHORIZE, json!({})).await;
    assert_eq!(response.result_code, ResultCode::SystemError);
    assert!(response.error_message.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_undecodable_response_reports_system_error() {
    // The route answers with a list, the caller expects an object.
    let gateway = MockGateway::default().with_ok(endpoints::COMMERCES, json!([1, 2, 3]));
    let client = test_client(&gateway);

    let response: ServerResponse<PurchaseReceipt> =
        client.call_without_request(endpoints::COMMERCES).await;
    assert_eq!(response.result_code, ResultCode::SystemError);
}

#[tokio::test]
async fn test_clients_share_gateway_keys() {
    let gateway = MockGateway::default()
        .with_ok(endpoints::AUTHORIZE, json!({}))
        .with_ok(endpoints::ISSUERS, json!([]));
    let client = test_client(&gateway);
    let other = client.clone();

    let _: ServerResponse<Value> = client.call(endpoints::AUTHORIZE, json!({})).await;
    let _: ServerResponse<Value> = other.call_without_request(endpoints::ISSUERS).await;
    assert_eq!(gateway.key_fetch_count(), 1);
}

// =========================================================================
// Callbacks
// =========================================================================

#[tokio::test]
async fn test_unwrap_callback() {
    let gateway = MockGateway::default();
    let client = test_client(&gateway);
    let body = gateway.sign_callback(json!({"TransactionId": "T-9", "Amount": 250}));

    let response: ServerResponse<PurchaseReceipt> = client.unwrap_callback(&body).await;
    assert!(response.is_ok());
    assert_eq!(response.response.unwrap().transaction_id, "T-9");
}

#[tokio::test]
async fn test_unwrap_tampered_callback_fails() {
    let gateway = MockGateway::default();
    let client = test_client(&gateway);
    client
        .key_cache()
        .insert(gateway_key_pair().verification_key().unwrap())
        .await;
    let body = gateway
        .clone()
        .with_tampered_signatures()
        .sign_callback(json!({"TransactionId": "T-9", "Amount": 250}));

    let response: ServerResponse<PurchaseReceipt> = client.unwrap_callback(&body).await;
    assert_eq!(response.result_code, ResultCode::InvalidSignature);
}

#[tokio::test]
async fn test_unwrap_garbage_callback_fails() {
    let client = test_client(&MockGateway::default());
    let response: ServerResponse<Value> = client.unwrap_callback(b"not json").await;
    assert_eq!(response.result_code, ResultCode::SystemError);
}

#[tokio::test]
async fn test_sign_callback_response() {
    let client = test_client(&MockGateway::default());
    let outcome = ServerResponse::<Value>::failure(
        ResultCode::Expired,
        ProtocolError::UnknownClient("x".into()).localized(),
    );

    let envelope = client.sign_callback_response(&outcome).unwrap();
    let key = client_key_pair().verification_key().unwrap();
    let ack: &ClientResponse = SignatureEngine::default().verify(&key, &envelope).unwrap();
    assert_eq!(ack.client, CLIENT_NAME);
    assert_eq!(ack.result_code, ResultCode::Expired);
    assert_eq!(ack.error_message, outcome.error_message);
}

// =========================================================================
// Construction
// =========================================================================

#[tokio::test]
async fn test_factory_routes_by_client_name() {
    let mut registry = IdentityRegistry::new();
    registry.insert(SigningIdentity::new(CLIENT_NAME, client_key_pair().clone()));
    registry.insert(SigningIdentity::new("Globex", generate_key_pair("Globex")));
    let gateway = MockGateway::default().with_ok(endpoints::AUTHORIZE, json!({}));
    let factory =
        ClientFactory::with_transport(&registry, Arc::new(gateway.clone()), SignatureEngine::default());

    assert_eq!(factory.client_names(), vec!["Acme", "Globex"]);

    let acme = factory.get("Acme").unwrap();
    let globex = factory.get(" Globex ").unwrap();
    let _: ServerResponse<Value> = acme.call(endpoints::AUTHORIZE, json!({})).await;
    let _: ServerResponse<Value> = globex.call(endpoints::AUTHORIZE, json!({})).await;

    let clients: Vec<String> = gateway
        .requests()
        .iter()
        .filter(|r| r.method == "POST")
        .map(|r| r.envelope().payload()["Client"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(clients, vec!["Acme", "Globex"]);
    // One key cache for the whole factory.
    assert_eq!(gateway.key_fetch_count(), 1);
}

#[test]
fn test_factory_unknown_client() {
    let factory = ClientFactory::with_transport(
        &IdentityRegistry::new(),
        Arc::new(MockGateway::default()),
        SignatureEngine::default(),
    );
    let err = factory.get("Nobody").unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownClient(ref name) if name == "Nobody"));
    assert_eq!(err.result_code(), ResultCode::InvalidConfiguration);
    assert_eq!(
        err.localized().get(LANG_ES),
        Some("El cliente 'Nobody' solicitado no existe")
    );
}

#[test]
fn test_factory_insert_replaces() {
    let mut factory = ClientFactory::with_transport(
        &IdentityRegistry::new(),
        Arc::new(MockGateway::default()),
        SignatureEngine::default(),
    );
    assert!(factory
        .insert(SigningIdentity::new("Acme", intruder_key_pair().clone()))
        .is_none());
    let replaced = factory.insert(SigningIdentity::new("Acme", client_key_pair().clone()));
    assert!(replaced.is_some());
    assert_eq!(factory.len(), 1);
    assert_eq!(
        factory.get("Acme").unwrap().identity().fingerprint(),
        client_key_pair().fingerprint()
    );
}

#[test]
fn test_client_from_settings_with_pfx_fallback() {
    let dir = TempDir::new().unwrap();
    let settings = test_settings(dir.path());

    let client =
        GatewayClient::from_settings_with_resolver(&settings, &CertificateResolver::without_stores())
            .unwrap();
    assert_eq!(client.client_name(), CLIENT_NAME);
    assert_eq!(client.identity().fingerprint(), client_key_pair().fingerprint());
    assert_eq!(
        client.public_key_info().unwrap().fingerprint,
        *client_key_pair().fingerprint()
    );
}

#[test]
fn test_factory_from_settings_with_pfx_fallback() {
    let dir = TempDir::new().unwrap();
    let settings = test_settings(dir.path());

    let factory =
        ClientFactory::from_settings_with_resolver(&settings, &CertificateResolver::without_stores())
            .unwrap();
    assert!(factory.contains(CLIENT_NAME));
}

#[test]
fn test_missing_certificate_fails_construction() {
    let dir = TempDir::new().unwrap();
    let mut settings = test_settings(dir.path());
    settings.certificate_name = "missing".into();

    let err =
        GatewayClient::from_settings_with_resolver(&settings, &CertificateResolver::without_stores())
            .unwrap_err();
    assert!(matches!(err, ProtocolError::Crypto(_)));
}

#[test]
fn test_wrong_password_fails_construction() {
    let dir = TempDir::new().unwrap();
    let mut settings = test_settings(dir.path());
    settings.certificate_password = String::from("wrong").into();

    assert!(
        GatewayClient::from_settings_with_resolver(&settings, &CertificateResolver::without_stores())
            .is_err()
    );
}

#[test]
fn test_invalid_settings_fail_construction() {
    let dir = TempDir::new().unwrap();
    let mut settings = test_settings(dir.path());
    settings.gateway_url.clear();

    let err =
        ClientFactory::from_settings_with_resolver(&settings, &CertificateResolver::without_stores())
            .unwrap_err();
    assert!(matches!(err, ProtocolError::Config(_)));
}
