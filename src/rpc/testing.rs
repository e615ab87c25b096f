//! Scripted transport and transaction fixtures for tests
//!
//! `MockTransport` replays canned JSON-RPC results or errors per method, and
//! optionally per first parameter (address or signature). `TxFixture` builds
//! getTransaction bodies in the provider's `json` encoding.

use super::transport::RpcTransport;
use crate::errors::RpcError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub enum MockReply {
    Result(Value),
    Error(RpcError),
    /// Reply after a pause; lets tests observe in-flight work
    Delayed(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn rate_limited() -> Self {
        MockReply::Error(RpcError::RateLimited {
            endpoint: "mock".to_string(),
            message: "HTTP 429: Too Many Requests".to_string(),
        })
    }

    pub fn transient() -> Self {
        MockReply::Error(RpcError::Transient {
            endpoint: "mock".to_string(),
            message: "connection reset by peer".to_string(),
        })
    }

    pub fn non_retryable() -> Self {
        MockReply::Error(RpcError::NonRetryable {
            endpoint: "mock".to_string(),
            code: Some(-32601),
            message: "Method not found".to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub params: Value,
    pub at: Instant,
}

#[derive(Default)]
struct Script {
    by_method: HashMap<String, VecDeque<MockReply>>,
    by_key: HashMap<(String, String), VecDeque<MockReply>>,
    default_by_method: HashMap<String, MockReply>,
    default_by_key: HashMap<(String, String), MockReply>,
}

pub struct MockTransport {
    endpoint: String,
    script: Mutex<Script>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// One-shot reply for the next `method` call
    pub fn enqueue(&self, method: &str, reply: MockReply) {
        self.script
            .lock()
            .by_method
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    /// One-shot reply for the next `method` call whose first param is `key`
    pub fn enqueue_for(&self, method: &str, key: &str, reply: MockReply) {
        self.script
            .lock()
            .by_key
            .entry((method.to_string(), key.to_string()))
            .or_default()
            .push_back(reply);
    }

    /// Reply used whenever the queues for `method` are empty
    pub fn set_default(&self, method: &str, reply: MockReply) {
        self.script
            .lock()
            .default_by_method
            .insert(method.to_string(), reply);
    }

    pub fn set_default_for(&self, method: &str, key: &str, reply: MockReply) {
        self.script
            .lock()
            .default_by_key
            .insert((method.to_string(), key.to_string()), reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.method == method).count()
    }

    fn next_reply(&self, method: &str, key: Option<&str>) -> Option<MockReply> {
        let mut script = self.script.lock();
        if let Some(key) = key {
            let id = (method.to_string(), key.to_string());
            if let Some(reply) = script.by_key.get_mut(&id).and_then(VecDeque::pop_front) {
                return Some(reply);
            }
            if let Some(reply) = script.by_method.get_mut(method).and_then(VecDeque::pop_front) {
                return Some(reply);
            }
            if let Some(reply) = script.default_by_key.get(&id) {
                return Some(reply.clone());
            }
        } else if let Some(reply) = script.by_method.get_mut(method).and_then(VecDeque::pop_front) {
            return Some(reply);
        }
        script.default_by_method.get(method).cloned()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let key = params.get(0).and_then(Value::as_str).map(String::from);
        self.calls.lock().push(RecordedCall {
            method: method.to_string(),
            params,
            at: Instant::now(),
        });

        let mut reply = self.next_reply(method, key.as_deref()).ok_or_else(|| {
            RpcError::NonRetryable {
                endpoint: self.endpoint.clone(),
                code: None,
                message: format!("no scripted reply for {}", method),
            }
        })?;

        loop {
            match reply {
                MockReply::Result(value) => return Ok(value),
                MockReply::Error(error) => return Err(error),
                MockReply::Delayed(pause, inner) => {
                    tokio::time::sleep(pause).await;
                    reply = *inner;
                }
            }
        }
    }
}

/// getSignaturesForAddress result for `signatures`, newest first as given
pub fn signature_page(signatures: &[(&str, i64)]) -> Value {
    Value::Array(
        signatures
            .iter()
            .enumerate()
            .map(|(i, (signature, block_time))| {
                json!({
                    "signature": signature,
                    "slot": 1_000_000u64.saturating_sub(i as u64),
                    "err": null,
                    "memo": null,
                    "blockTime": block_time,
                    "confirmationStatus": "finalized",
                })
            })
            .collect(),
    )
}

#[derive(Debug, Clone)]
struct FixtureTokenBalance {
    account_index: usize,
    mint: String,
    owner: String,
    pre: u64,
    post: u64,
    decimals: u8,
}

/// Builder for a getTransaction body
#[derive(Debug, Clone)]
pub struct TxFixture {
    signature: String,
    slot: u64,
    block_time: Option<i64>,
    fee: u64,
    err: Option<Value>,
    accounts: Vec<(String, u64, u64)>,
    loaded_writable: Vec<(String, u64, u64)>,
    programs: Vec<String>,
    token_balances: Vec<FixtureTokenBalance>,
    logs: Vec<String>,
}

impl TxFixture {
    pub fn new(signature: &str, block_time: i64) -> Self {
        Self {
            signature: signature.to_string(),
            slot: 250_000_000,
            block_time: Some(block_time),
            fee: 5_000,
            err: None,
            accounts: Vec::new(),
            loaded_writable: Vec::new(),
            programs: Vec::new(),
            token_balances: Vec::new(),
            logs: Vec::new(),
        }
    }

    pub fn without_block_time(mut self) -> Self {
        self.block_time = None;
        self
    }

    pub fn fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    /// Static account key with its pre/post lamports
    pub fn account(mut self, key: &str, pre: u64, post: u64) -> Self {
        self.accounts.push((key.to_string(), pre, post));
        self
    }

    /// Address-lookup-table account (v0 message)
    pub fn loaded_account(mut self, key: &str, pre: u64, post: u64) -> Self {
        self.loaded_writable.push((key.to_string(), pre, post));
        self
    }

    /// Top-level instruction for `program_id`
    pub fn invoke(mut self, program_id: &str) -> Self {
        self.programs.push(program_id.to_string());
        self
    }

    /// Token balance on the account at `account_index`, raw amounts
    pub fn token_balance(
        mut self,
        account_index: usize,
        mint: &str,
        owner: &str,
        pre: u64,
        post: u64,
        decimals: u8,
    ) -> Self {
        self.token_balances.push(FixtureTokenBalance {
            account_index,
            mint: mint.to_string(),
            owner: owner.to_string(),
            pre,
            post,
            decimals,
        });
        self
    }

    pub fn log(mut self, line: &str) -> Self {
        self.logs.push(line.to_string());
        self
    }

    pub fn failed(mut self) -> Self {
        self.err = Some(json!({"InstructionError": [0, {"Custom": 1}]}));
        self
    }

    pub fn to_value(&self) -> Value {
        let mut keys: Vec<String> = self.accounts.iter().map(|(k, _, _)| k.clone()).collect();
        let mut pre: Vec<u64> = self.accounts.iter().map(|(_, p, _)| *p).collect();
        let mut post: Vec<u64> = self.accounts.iter().map(|(_, _, p)| *p).collect();

        let mut instructions = Vec::new();
        for program in &self.programs {
            let index = match keys.iter().position(|k| k == program) {
                Some(index) => index,
                None => {
                    keys.push(program.clone());
                    pre.push(1);
                    post.push(1);
                    keys.len() - 1
                }
            };
            instructions.push(json!({"programIdIndex": index, "accounts": [0], "data": ""}));
        }

        for (_, p, q) in &self.loaded_writable {
            pre.push(*p);
            post.push(*q);
        }

        let token_entry = |b: &FixtureTokenBalance, amount: u64| {
            let ui = amount as f64 / 10f64.powi(b.decimals as i32);
            json!({
                "accountIndex": b.account_index,
                "mint": b.mint,
                "owner": b.owner,
                "uiTokenAmount": {
                    "amount": amount.to_string(),
                    "decimals": b.decimals,
                    "uiAmount": ui,
                    "uiAmountString": ui.to_string(),
                }
            })
        };

        json!({
            "slot": self.slot,
            "blockTime": self.block_time,
            "version": 0,
            "meta": {
                "err": self.err,
                "fee": self.fee,
                "preBalances": pre,
                "postBalances": post,
                "preTokenBalances": self.token_balances.iter().map(|b| token_entry(b, b.pre)).collect::<Vec<_>>(),
                "postTokenBalances": self.token_balances.iter().map(|b| token_entry(b, b.post)).collect::<Vec<_>>(),
                "logMessages": self.logs,
                "innerInstructions": [],
                "loadedAddresses": {
                    "writable": self.loaded_writable.iter().map(|(k, _, _)| k.clone()).collect::<Vec<_>>(),
                    "readonly": [],
                },
            },
            "transaction": {
                "signatures": [self.signature],
                "message": {
                    "accountKeys": keys,
                    "instructions": instructions,
                    "recentBlockhash": "11111111111111111111111111111111",
                },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_keyed_replies_take_precedence() {
        let mock = MockTransport::new("mock");
        mock.set_default("getTransaction", MockReply::Result(json!("default")));
        mock.enqueue_for("getTransaction", "sig2", MockReply::non_retryable());

        let first = mock.call("getTransaction", json!(["sig1"])).await.unwrap();
        assert_eq!(first, json!("default"));
        assert!(mock.call("getTransaction", json!(["sig2"])).await.is_err());
        assert_eq!(mock.call("getTransaction", json!(["sig2"])).await.unwrap(), json!("default"));
        assert_eq!(mock.call_count("getTransaction"), 3);
        assert!(mock.call("getBalance", json!(["w"])).await.is_err());
    }

    #[test]
    fn test_fixture_appends_programs_and_loaded_accounts() {
        let value = TxFixture::new("sig", 100)
            .account("W", 10, 5)
            .invoke("Prog")
            .loaded_account("L", 0, 5)
            .to_value();
        assert_eq!(value["transaction"]["message"]["accountKeys"], json!(["W", "Prog"]));
        assert_eq!(value["meta"]["preBalances"], json!([10, 1, 0]));
        assert_eq!(value["meta"]["loadedAddresses"]["writable"], json!(["L"]));
        assert_eq!(value["transaction"]["message"]["instructions"][0]["programIdIndex"], 1);
    }
}
