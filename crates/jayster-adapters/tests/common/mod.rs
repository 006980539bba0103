#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::thread;

use alloy::primitives::{hex, Address, U256};
use serde_json::{json, Value};
use tiny_http::{Method, Response, Server, StatusCode};

use jayster_adapters::AdapterConfig;

const GET_BALANCE: [u8; 4] = [0x12, 0x06, 0x5f, 0xe0];
const DEPOSIT: [u8; 4] = [0xb6, 0xb5, 0x5f, 0x25];
const WITHDRAW: [u8; 4] = [0x2e, 0x1a, 0x7d, 0x4d];

/// State behind the mock wallet bridge, shaped like a local Hardhat node
/// running the Assessment contract.
#[derive(Debug, Default)]
pub struct NodeState {
    pub balance: U256,
    pub authorized: Vec<Address>,
    pub reject_prompt: bool,
    pub reject_signature: bool,
    pub revert_in_receipt: bool,
    pub methods: Vec<String>,
    pub paths: Vec<String>,
    txs: u64,
    pending_receipts: Vec<(String, bool)>,
}

#[derive(Debug, Clone, Default)]
pub struct MockNode {
    pub state: Arc<Mutex<NodeState>>,
}

impl MockNode {
    pub fn with(f: impl FnOnce(&mut NodeState)) -> Self {
        let node = Self::default();
        f(&mut node.state.lock().expect("node lock"));
        node
    }

    pub fn methods(&self) -> Vec<String> {
        self.state.lock().expect("node lock").methods.clone()
    }

    pub fn balance(&self) -> U256 {
        self.state.lock().expect("node lock").balance
    }
}

pub fn account() -> Address {
    "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        .parse()
        .expect("hardhat account")
}

/// Serves JSON-RPC on `/` plus the rate and news endpoints, returning the
/// base URL.
pub fn spawn_mock_server(node: MockNode) -> String {
    let server = Server::http("127.0.0.1:0").expect("start server");
    let addr = format!("http://{}", server.server_addr());

    thread::spawn(move || {
        while let Ok(mut req) = server.recv() {
            let method = req.method().clone();
            let path = req.url().to_owned();
            let mut body = String::new();
            let _ = req.as_reader().read_to_string(&mut body);

            let (code, payload) = match (method, path.as_str()) {
                (Method::Post, "/") => (200, json_rpc(&node, &body)),
                (Method::Get, p) if p.starts_with("/simple/price") => {
                    node.state.lock().expect("node lock").paths.push(path.clone());
                    (
                        200,
                        json!({"ethereum": {"usd": 2000.5, "php": 112000.0}}),
                    )
                }
                (Method::Get, p) if p.starts_with("/v2/everything") => {
                    node.state.lock().expect("node lock").paths.push(path.clone());
                    if p.contains("apiKey=bad") {
                        (
                            401,
                            json!({"status": "error", "code": "apiKeyInvalid", "message": "Your API key is invalid."}),
                        )
                    } else {
                        (
                            200,
                            json!({"status": "ok", "totalResults": 3, "articles": [
                                {"title": "Ether climbs", "url": "https://news.example/1"},
                                {"title": null, "url": "https://news.example/2"},
                                {"title": "Merge anniversary", "url": "https://news.example/3"}
                            ]}),
                        )
                    }
                }
                _ => (404, json!({"error": "not found"})),
            };

            let response =
                Response::from_string(payload.to_string()).with_status_code(StatusCode(code));
            let _ = req.respond(response);
        }
    });

    addr
}

fn json_rpc(node: &MockNode, body: &str) -> Value {
    let request: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let params = request.get("params").cloned().unwrap_or(json!([]));

    let mut g = node.state.lock().expect("node lock");
    g.methods.push(method.clone());

    let outcome: Result<Value, Value> = match method.as_str() {
        "eth_accounts" => Ok(json!(g.authorized)),
        "eth_requestAccounts" => {
            if g.reject_prompt {
                Err(json!({"code": 4001, "message": "User rejected the request."}))
            } else {
                g.authorized = vec![account()];
                Ok(json!(g.authorized))
            }
        }
        "eth_call" => match calldata(&params) {
            Some(data) if data.starts_with(&GET_BALANCE) => Ok(json!(hex::encode_prefixed(
                g.balance.to_be_bytes::<32>()
            ))),
            _ => Err(json!({"code": -32000, "message": "unknown call"})),
        },
        "eth_sendTransaction" => send_transaction(&mut g, &params),
        "eth_getTransactionReceipt" => {
            let hash = params[0].as_str().unwrap_or_default().to_owned();
            let block = g.txs + 1;
            let status = if g.revert_in_receipt { "0x0" } else { "0x1" };
            match g.pending_receipts.iter_mut().find(|(h, _)| *h == hash) {
                // first poll: not mined yet
                Some((_, polled @ false)) => {
                    *polled = true;
                    Ok(Value::Null)
                }
                Some(_) => Ok(json!({
                    "transactionHash": hash,
                    "blockNumber": format!("0x{block:x}"),
                    "status": status,
                })),
                None => Ok(Value::Null),
            }
        }
        _ => Err(json!({"code": -32601, "message": "method not found"})),
    };

    match outcome {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err(error) => json!({"jsonrpc": "2.0", "id": id, "error": error}),
    }
}

fn calldata(params: &Value) -> Option<Vec<u8>> {
    params[0]
        .get("data")
        .and_then(Value::as_str)
        .and_then(|raw| hex::decode(raw).ok())
}

fn send_transaction(g: &mut NodeState, params: &Value) -> Result<Value, Value> {
    if g.reject_signature {
        return Err(json!({
            "code": 4001,
            "message": "MetaMask Tx Signature: User denied transaction signature."
        }));
    }
    let data = calldata(params)
        .filter(|d| d.len() == 36)
        .ok_or_else(|| json!({"code": -32602, "message": "bad calldata"}))?;
    let amount = U256::from_be_slice(&data[4..]);
    if data.starts_with(&DEPOSIT) {
        g.balance += amount;
    } else if data.starts_with(&WITHDRAW) {
        if amount > g.balance {
            return Err(json!({
                "code": -32603,
                "message": "Error: VM Exception while processing transaction: reverted with reason string 'Insufficient balance'"
            }));
        }
        g.balance -= amount;
    } else {
        return Err(json!({"code": -32602, "message": "unknown selector"}));
    }
    g.txs += 1;
    let hash = format!("0x{:064x}", g.txs);
    g.pending_receipts.push((hash.clone(), false));
    Ok(json!(hash))
}

pub fn config_for(base_url: &str) -> AdapterConfig {
    AdapterConfig {
        eip1193_proxy_url: Some(base_url.to_owned()),
        request_timeout_ms: 5_000,
        receipt_poll_interval_ms: 10,
        confirmation_timeout_ms: 5_000,
        rate_api_base_url: base_url.to_owned(),
        news_api_base_url: base_url.to_owned(),
        news_api_key: Some("test-key".to_owned()),
        ..AdapterConfig::default()
    }
}
