//! RPC client and funding synchronizer, exercised against a mock node.
//!
//! wiremock stands in for bitcoind's JSON-RPC endpoint so the protocol
//! plumbing and the balance-polling loop can be tested without real
//! binaries.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use stockade_harness::bitcoind::{fund_wallet, wait_for_balance};
use stockade_harness::{HarnessError, RpcClient, RpcError};

fn write_cookie(dir: &TempDir, contents: &str) -> PathBuf {
    let cookie = dir.path().join(".cookie");
    fs::write(&cookie, contents).expect("write cookie");
    cookie
}

fn rpc_result(value: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "result": value,
        "error": null,
        "id": 0,
    }))
}

fn client_for(server: &MockServer, dir: &TempDir) -> RpcClient {
    let cookie = write_cookie(dir, "__cookie__:sesame\n");
    RpcClient::new(server.address().port(), cookie)
}

#[tokio::test]
async fn call_unwraps_the_result_field() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(rpc_result(json!({"blocks": 101})))
        .mount(&server)
        .await;

    let client = client_for(&server, &dir);
    let result = client
        .call("getblockchaininfo", json!([]))
        .await
        .expect("call");
    assert_eq!(result["blocks"], 101);
}

#[tokio::test]
async fn call_sends_cookie_credentials_as_basic_auth() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let cookie = write_cookie(&dir, "user:pass");
    // base64("user:pass")
    Mock::given(method("POST"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(rpc_result(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let client = RpcClient::new(server.address().port(), cookie);
    client.call("getnetworkinfo", json!([])).await.expect("call");
}

#[tokio::test]
async fn server_errors_carry_code_and_message() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": null,
            "error": {"code": -32601, "message": "Method not found"},
            "id": 0,
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, &dir);
    let err = client.call("bogus", json!([])).await.unwrap_err();
    match err {
        RpcError::Server { code, message } => {
            assert_eq!(code, -32601);
            assert_eq!(message, "Method not found");
        }
        other => panic!("expected Server error, got {other:?}"),
    }
}

#[tokio::test]
async fn balance_wait_polls_until_the_threshold_clears() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    // First two polls see an unsynced wallet, then the balance appears.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "getbalance"})))
        .respond_with(rpc_result(json!(0.0)))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "getbalance"})))
        .respond_with(rpc_result(json!(50.0)))
        .expect(1..)
        .mount(&server)
        .await;

    let client = client_for(&server, &dir);
    wait_for_balance(&client, 50.0, Duration::from_secs(5))
        .await
        .expect("balance should clear");
}

#[tokio::test]
async fn balance_wait_gives_up_after_the_timeout() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "getbalance"})))
        .respond_with(rpc_result(json!(0.0)))
        .mount(&server)
        .await;

    let client = client_for(&server, &dir);
    let err = wait_for_balance(&client, 50.0, Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::SyncTimeout { .. }));
}

#[tokio::test]
async fn fund_wallet_creates_wallet_mines_and_waits() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "createwallet"})))
        .respond_with(rpc_result(json!({"name": "stockade"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "getnewaddress"})))
        .respond_with(rpc_result(json!("bcrt1qtestaddress")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "generatetoaddress",
            "params": [101, "bcrt1qtestaddress"],
        })))
        .respond_with(rpc_result(json!(["blockhash"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "getbalance"})))
        .respond_with(rpc_result(json!(50.0)))
        .expect(1..)
        .mount(&server)
        .await;

    let client = client_for(&server, &dir);
    fund_wallet(&client, 50.0).await.expect("funding");
}

#[tokio::test]
async fn non_numeric_balance_is_a_malformed_response() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");
    Mock::given(method("POST"))
        .respond_with(rpc_result(json!("fifty")))
        .mount(&server)
        .await;

    let client = client_for(&server, &dir);
    let err = wait_for_balance(&client, 50.0, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Rpc(RpcError::MalformedResponse(_))
    ));
}
