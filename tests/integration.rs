//! End-to-end coverage of the HTTP surface, driven through the `axum`
//! router with `tower::ServiceExt::oneshot` rather than a bound socket.

use asns_server::coordinator::Coordinator;
use asns_server::hashing::{decode_token, sha256d};
use asns_server::http::router;
use asns_server::kv::Stores;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

struct TestServer {
    app: axum::Router,
}

impl TestServer {
    fn new() -> (Self, tempfile::TempDir) {
        let (stores, dir) = Stores::open_temp();
        let coordinator = Arc::new(Coordinator::new(stores));
        (Self { app: router(coordinator) }, dir)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder().method("GET").uri(path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// `GET` with a JSON body, for the two read endpoints that (like
    /// the original server) take parameters this way.
    async fn get_with_body(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

fn register_body(token: &str) -> Value {
    json!({
        "token": token,
        "wantCurrency": "BTC",
        "wantAmount": 10000,
        "sendCurrency": "LTC",
        "sendAmount": 100_000_000,
        "receiveAddress": "12dRugNcdxK39288NjcDV4GX7rMsKCGn6B",
    })
}

#[tokio::test]
async fn token_round_trip() {
    let (server, _dir) = TestServer::new();

    let (status, body) = server.get("/get_token/").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    let raw = decode_token(&token).unwrap();
    assert_eq!(raw.len(), 64);

    let (_, verified) = server.post("/verify_token/", json!({ "token": token })).await;
    assert_eq!(verified["exist"], true);

    let fresh_raw = asns_server::hashing::generate_raw_token();
    let fresh = asns_server::hashing::encode_token(&fresh_raw);
    let (_, not_issued) = server.post("/verify_token/", json!({ "token": fresh })).await;
    assert_eq!(not_issued["exist"], false);
}

#[tokio::test]
async fn register_duplicate_is_rejected() {
    let (server, _dir) = TestServer::new();
    let (_, token_body) = server.get("/get_token/").await;
    let token = token_body["token"].as_str().unwrap().to_string();

    let (status, first) = server.post("/register_swap/", register_body(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "Success");

    let (status, second) = server.post("/register_swap/", register_body(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(second["error"].as_str().unwrap().contains("Inappropriate token status"));
}

#[tokio::test]
async fn register_then_list_shows_inverted_fields() {
    let (server, _dir) = TestServer::new();
    let (_, token_body) = server.get("/get_token/").await;
    let token = token_body["token"].as_str().unwrap().to_string();
    server.post("/register_swap/", register_body(&token)).await;

    let (status, list) = server.get("/get_swap_list/").await;
    assert_eq!(status, StatusCode::OK);

    let expected_key = hex::encode(sha256d(&decode_token(&token).unwrap()));
    let entry = &list["data"][&expected_key];
    assert_eq!(entry["initiatorCurrency"], "BTC");
    assert_eq!(entry["initiatorReceiveAmount"], 100_000_000);
    assert_eq!(entry["participatorCurrency"], "LTC");
    assert_eq!(entry["participatorReceiveAmount"], 10000);
    assert_eq!(entry["participatorAddress"], "12dRugNcdxK39288NjcDV4GX7rMsKCGn6B");
}

#[tokio::test]
async fn register_with_never_issued_token_is_invalid() {
    let (server, _dir) = TestServer::new();
    let raw = asns_server::hashing::generate_raw_token();
    let token = asns_server::hashing::encode_token(&raw);

    let (status, body) = server.post("/register_swap/", register_body(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not registered or is invalid"));
}

#[tokio::test]
async fn full_initiate_exposes_initiator_info_to_participator() {
    let (server, _dir) = TestServer::new();

    let (_, p_body) = server.get("/get_token/").await;
    let participator_token = p_body["token"].as_str().unwrap().to_string();
    server.post("/register_swap/", register_body(&participator_token)).await;

    let (_, i_body) = server.get("/get_token/").await;
    let initiator_token = i_body["token"].as_str().unwrap().to_string();

    let selected_swap = hex::encode(sha256d(&decode_token(&participator_token).unwrap()));
    let (status, initiate_result) = server
        .post(
            "/initiate_swap/",
            json!({
                "token": initiator_token,
                "selectedSwap": selected_swap,
                "contract": "deadbeef",
                "rawTransaction": "cafebabe",
                "receiveAddress": "initiator-address",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(initiate_result["status"], "Success");

    let (status, info) = server
        .post("/get_initiator_info/", json!({ "token": participator_token }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["initiatorAddress"], "initiator-address");
    assert_eq!(info["initiateContract"], "deadbeef");
    assert_eq!(info["initiateRawTransaction"], "cafebabe");
    let expected_hash = hex::encode(sha256d(&decode_token(&initiator_token).unwrap()));
    assert_eq!(info["tokenHash"], expected_hash);
}

#[tokio::test]
async fn preimage_extraction_round_trips_and_rejects_mismatch() {
    use bitcoin::absolute::LockTime;
    use bitcoin::script::{Builder, PushBytesBuf};
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};

    let (server, _dir) = TestServer::new();

    let (_, p_body) = server.get("/get_token/").await;
    let participator_token = p_body["token"].as_str().unwrap().to_string();
    server.post("/register_swap/", register_body(&participator_token)).await;

    let (_, i_body) = server.get("/get_token/").await;
    let initiator_token = i_body["token"].as_str().unwrap().to_string();
    let initiator_raw = decode_token(&initiator_token).unwrap();

    let selected_swap = hex::encode(sha256d(&decode_token(&participator_token).unwrap()));
    server
        .post(
            "/initiate_swap/",
            json!({
                "token": initiator_token,
                "selectedSwap": selected_swap,
                "contract": "c",
                "rawTransaction": "t",
                "receiveAddress": "a",
            }),
        )
        .await;
    server
        .post("/participate_swap/", json!({ "token": participator_token, "rawTransaction": "t", "contract": "c" }))
        .await;

    let push = PushBytesBuf::try_from(initiator_raw.clone()).unwrap();
    let script_sig = Builder::new().push_slice(push).into_script();
    let redeem_tx = Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig,
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut { value: Amount::ZERO, script_pubkey: ScriptBuf::new() }],
    };
    let redeem_tx_hex = hex::encode(bitcoin::consensus::serialize(&redeem_tx));

    let (status, _) = server
        .post("/redeem_swap/", json!({ "token": initiator_token, "selectedSwap": selected_swap, "rawTransaction": redeem_tx_hex }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, redeemed) = server
        .post("/get_redeem_token/", json!({ "token": participator_token }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(redeemed["token"], hex::encode(&initiator_raw));
}

#[tokio::test]
async fn no_matching_preimage_is_fatal_error() {
    let (server, _dir) = TestServer::new();

    let (_, p_body) = server.get("/get_token/").await;
    let participator_token = p_body["token"].as_str().unwrap().to_string();
    server.post("/register_swap/", register_body(&participator_token)).await;

    let (_, i_body) = server.get("/get_token/").await;
    let initiator_token = i_body["token"].as_str().unwrap().to_string();

    let selected_swap = hex::encode(sha256d(&decode_token(&participator_token).unwrap()));
    server
        .post(
            "/initiate_swap/",
            json!({ "token": initiator_token, "selectedSwap": selected_swap, "contract": "c", "rawTransaction": "t", "receiveAddress": "a" }),
        )
        .await;
    server
        .post("/participate_swap/", json!({ "token": participator_token, "rawTransaction": "t", "contract": "c" }))
        .await;

    // One input with an empty scriptSig and no witness: nothing a
    // pre-image could hide in.
    use bitcoin::absolute::LockTime;
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};
    let no_preimage_tx = Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::null(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut { value: Amount::ZERO, script_pubkey: ScriptBuf::new() }],
    };
    let empty_tx_hex = hex::encode(bitcoin::consensus::serialize(&no_preimage_tx));
    let (status, _) = server
        .post("/redeem_swap/", json!({ "token": initiator_token, "selectedSwap": selected_swap, "rawTransaction": empty_tx_hex }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .post("/get_redeem_token/", json!({ "token": participator_token }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Pre-image not found"));
}

#[tokio::test]
async fn missing_swap_is_swap_invalid_not_progress() {
    let (server, _dir) = TestServer::new();

    let (_, p_body) = server.get("/get_token/").await;
    let participator_token = p_body["token"].as_str().unwrap().to_string();
    server.post("/register_swap/", register_body(&participator_token)).await;

    let (_, i_body) = server.get("/get_token/").await;
    let initiator_token = i_body["token"].as_str().unwrap().to_string();
    let selected_swap = hex::encode(sha256d(&decode_token(&participator_token).unwrap()));
    server
        .post(
            "/initiate_swap/",
            json!({ "token": initiator_token, "selectedSwap": selected_swap, "contract": "c", "rawTransaction": "t", "receiveAddress": "a" }),
        )
        .await;

    // `initiator_token` now holds the INITIATOR role, but this swap
    // key was never registered by anyone.
    let never_registered = hex::encode([7u8; 32]);
    let (status, body) = server
        .get_with_body("/get_participator_info/", json!({ "token": initiator_token, "selectedSwap": never_registered }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("not registered or is invalid"));
}

#[tokio::test]
async fn malformed_body_renders_validation_error_shape() {
    let (server, _dir) = TestServer::new();
    let request = Request::builder()
        .method("POST")
        .uri("/register_swap/")
        .header("content-type", "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let (status, body) = server.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "Failed");
    assert!(body["error"].is_array());
    assert_eq!(body["error"][0]["target"][0], "body");
}
