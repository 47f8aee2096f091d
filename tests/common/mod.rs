//! Scripted in-memory JSON-RPC node shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ethers_core::abi::{encode, Token};
use ethers_core::types::U256;
use serde_json::{json, Value};

use evm_tx_builder::{Address, ChainClient, ChainConfig, Transport, TransportError};

pub const RECIPIENT: &str = "0xa0Ee7A142d267C1f36714E4a8F75612F20a79720";
pub const SENDER_KEY: &str = "df57089febbacf7ba0bc227dafbffa9fc08a93fdc68e1e42411a14efcf23656e";
pub const SENDER: &str = "0x8626f6940E2eb28930eFb4CeF49B2d1F2C9C1199";
pub const TOKEN: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

type Scripted = Result<Option<Value>, String>;

/// Answers each method from its own queue. The last queued answer of a method
/// keeps being returned once the queue runs down to it.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, method: &str, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn respond(&self, method: &str, result: Value) -> &Self {
        let result = if result.is_null() { None } else { Some(result) };
        self.push(method, Ok(result));
        self
    }

    pub fn fail(&self, method: &str, message: &str) -> &Self {
        self.push(method, Err(message.to_string()));
        self
    }

    /// Params of every call made to `method`, in order.
    pub fn calls(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls(method).len()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn url(&self) -> &str {
        "mock://node"
    }

    async fn request(&self, method: &str, params: Value) -> Result<Option<Value>, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));

        let mut responses = self.responses.lock().unwrap();
        let queue = responses
            .get_mut(method)
            .ok_or_else(|| TransportError::Rpc(format!("unscripted method {}", method)))?;
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };

        match response {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(TransportError::Rpc(message)),
            None => Err(TransportError::Rpc(format!("unscripted method {}", method))),
        }
    }
}

pub fn client_with(mock: &Arc<MockTransport>, config: ChainConfig) -> Arc<ChainClient> {
    Arc::new(ChainClient::with_transport(mock.clone(), config))
}

pub fn client(mock: &Arc<MockTransport>) -> Arc<ChainClient> {
    client_with(mock, ChainConfig::default())
}

pub fn address(s: &str) -> Address {
    Address::parse(s).unwrap()
}

pub fn legacy_block() -> Value {
    json!({ "number": "0x10", "gasLimit": "0x1c9c380" })
}

pub fn london_block(base_fee: &str) -> Value {
    json!({ "number": "0x10", "gasLimit": "0x1c9c380", "baseFeePerGas": base_fee })
}

/// A single ABI-encoded uint256 return value.
pub fn abi_uint(value: u128) -> Value {
    json!(format!("0x{:064x}", value))
}

pub fn abi_u256(value: U256) -> Value {
    json!(format!("0x{}", hex::encode(encode(&[Token::Uint(value)]))))
}

/// Scripts a local dev node without EIP-1559: chain 31337, gas price 20 Gwei.
pub fn script_legacy_node(mock: &MockTransport) {
    mock.respond("net_version", json!("31337"))
        .respond("eth_getBlockByNumber", legacy_block())
        .respond("eth_gasPrice", json!("0x4a817c800"));
}
