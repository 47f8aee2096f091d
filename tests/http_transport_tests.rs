//! HttpTransport against a local mock JSON-RPC server

use std::time::Duration;

use mockito::{mock, server_url, Matcher};
use serde_json::json;

use evm_tx_builder::{
    ChainClient, ChainConfig, ConfigError, Error, HttpTransport, Transport, TransportError,
};

fn rpc_mock(method: &str, body: serde_json::Value) -> mockito::Mock {
    mock("POST", "/")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "jsonrpc": "2.0",
            "method": method,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create()
}

#[tokio::test]
async fn test_result_is_returned() {
    let _m = rpc_mock(
        "web3_clientVersion",
        json!({ "jsonrpc": "2.0", "id": 1, "result": "Hardhat/2.22.0" }),
    );
    let transport = HttpTransport::new(&server_url(), Duration::from_secs(5)).unwrap();

    let result = transport
        .request("web3_clientVersion", json!([]))
        .await
        .unwrap();
    assert_eq!(result, Some(json!("Hardhat/2.22.0")));
    assert_eq!(transport.url(), server_url());
}

#[tokio::test]
async fn test_params_are_sent() {
    let _m = mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "eth_getCode",
            "params": ["0xa0ee7a142d267c1f36714e4a8f75612f20a79720", "latest"],
        })))
        .with_status(200)
        .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x"}"#)
        .create();
    let client = ChainClient::connect(&server_url(), ChainConfig::default()).unwrap();

    let recipient = "0xa0Ee7A142d267C1f36714E4a8F75612F20a79720".parse().unwrap();
    assert!(!client.is_contract(&recipient).await.unwrap());
}

#[tokio::test]
async fn test_rpc_error_member() {
    let _m = rpc_mock(
        "eth_estimateGas",
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "execution reverted" }
        }),
    );
    let transport = HttpTransport::new(&server_url(), Duration::from_secs(5)).unwrap();

    match transport.request("eth_estimateGas", json!([{}])).await {
        Err(TransportError::Rpc(message)) => assert!(message.contains("execution reverted")),
        other => panic!("expected an RPC error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_null_result_through_client() {
    let _m = rpc_mock(
        "eth_getTransactionCount",
        json!({ "jsonrpc": "2.0", "id": 1, "result": null }),
    );
    let client = ChainClient::connect(&server_url(), ChainConfig::default()).unwrap();

    let sender = "0x8626f6940E2eb28930eFb4CeF49B2d1F2C9C1199".parse().unwrap();
    let err = client.get_account_nonce(&sender).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to get account nonce");
}

#[tokio::test]
async fn test_non_object_response() {
    let _m = rpc_mock("eth_chainId", json!(["not", "an", "object"]));
    let transport = HttpTransport::new(&server_url(), Duration::from_secs(5)).unwrap();

    assert!(matches!(
        transport.request("eth_chainId", json!([])).await,
        Err(TransportError::InvalidResponse(_))
    ));
}

#[test]
fn test_provider_url_validation() {
    assert!(matches!(
        HttpTransport::new("", Duration::from_secs(1)),
        Err(ConfigError::EmptyProviderUrl)
    ));
    assert!(matches!(
        HttpTransport::new("not a url", Duration::from_secs(1)),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        ChainClient::connect("  ", ChainConfig::default()),
        Err(Error::Config(ConfigError::EmptyProviderUrl))
    ));
}
