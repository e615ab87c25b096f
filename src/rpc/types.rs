/// Request parameter builders and response types for the calls walletledger makes
use crate::errors::RpcError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const METHOD_GET_SIGNATURES: &str = "getSignaturesForAddress";
pub const METHOD_GET_TRANSACTION: &str = "getTransaction";
pub const METHOD_GET_BALANCE: &str = "getBalance";

/// Entry returned by getSignaturesForAddress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    /// Serialized on-chain error; None for successful transactions
    pub err: Option<String>,
    pub memo: Option<String>,
    pub block_time: Option<i64>,
    pub confirmation_status: Option<String>,
}

/// Parse a getSignaturesForAddress result. Entries without a signature are skipped.
pub fn parse_signature_list(result: &Value) -> Result<Vec<SignatureInfo>, RpcError> {
    let items = match result {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(RpcError::Unexpected {
                endpoint: String::new(),
                message: format!("expected signature array, got {}", type_name(other)),
            })
        }
    };

    Ok(items
        .iter()
        .filter_map(|item| {
            let signature = item.get("signature")?.as_str()?.to_string();
            Some(SignatureInfo {
                signature,
                slot: item.get("slot").and_then(Value::as_u64).unwrap_or(0),
                err: item
                    .get("err")
                    .filter(|v| !v.is_null())
                    .map(|v| v.to_string()),
                memo: item.get("memo").and_then(Value::as_str).map(String::from),
                block_time: item.get("blockTime").and_then(Value::as_i64),
                confirmation_status: item
                    .get("confirmationStatus")
                    .and_then(Value::as_str)
                    .map(String::from),
            })
        })
        .collect())
}

/// getBalance returns `{context, value}`; some providers return the bare number
pub fn parse_balance(result: &Value) -> Result<u64, RpcError> {
    result
        .get("value")
        .and_then(Value::as_u64)
        .or_else(|| result.as_u64())
        .ok_or_else(|| RpcError::Unexpected {
            endpoint: String::new(),
            message: format!("expected balance, got {}", type_name(result)),
        })
}

pub fn signatures_params(
    address: &str,
    limit: usize,
    before: Option<&str>,
    commitment: &str,
) -> Value {
    let mut config = json!({
        "limit": limit,
        "commitment": commitment,
    });
    if let Some(before) = before {
        config["before"] = json!(before);
    }
    json!([address, config])
}

pub fn transaction_params(signature: &str, commitment: &str) -> Value {
    json!([
        signature,
        {
            "encoding": "json",
            "maxSupportedTransactionVersion": 0,
            "commitment": commitment,
        }
    ])
}

pub fn balance_params(address: &str, commitment: &str) -> Value {
    json!([address, { "commitment": commitment }])
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signature_list() {
        let result = json!([
            {"signature": "sig1", "slot": 10, "err": null, "blockTime": 1700000000, "confirmationStatus": "finalized"},
            {"signature": "sig2", "slot": 9, "err": {"InstructionError": [0, "Custom"]}, "blockTime": null},
            {"slot": 8}
        ]);
        let parsed = parse_signature_list(&result).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].block_time, Some(1_700_000_000));
        assert!(parsed[0].err.is_none());
        assert!(parsed[1].err.as_deref().unwrap().contains("InstructionError"));
        assert_eq!(parsed[1].block_time, None);

        assert!(parse_signature_list(&Value::Null).unwrap().is_empty());
        assert!(parse_signature_list(&json!({"oops": 1})).is_err());
    }

    #[test]
    fn test_params_shape() {
        let params = signatures_params("addr", 50, Some("sig9"), "confirmed");
        assert_eq!(params[0], "addr");
        assert_eq!(params[1]["limit"], 50);
        assert_eq!(params[1]["before"], "sig9");

        let params = signatures_params("addr", 50, None, "confirmed");
        assert!(params[1].get("before").is_none());

        let params = transaction_params("sig", "confirmed");
        assert_eq!(params[1]["maxSupportedTransactionVersion"], 0);
    }

    #[test]
    fn test_parse_balance() {
        assert_eq!(parse_balance(&json!({"context": {"slot": 1}, "value": 42})).unwrap(), 42);
        assert_eq!(parse_balance(&json!(7)).unwrap(), 7);
        assert!(parse_balance(&json!("x")).is_err());
    }
}
