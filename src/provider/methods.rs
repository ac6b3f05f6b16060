use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    jsonrpc::{parse_hex_u128, parse_hex_u64},
    provider::FailoverProvider,
    Result, RpcHandlerError,
};

/// The remote calls a bound provider exposes. Every method goes through
/// [`FailoverProvider::invoke`] and so inherits its failover.
#[async_trait]
pub trait EthRpc {
    async fn block_number(&self) -> Result<u64>;

    async fn chain_id(&self) -> Result<u64>;

    async fn gas_price(&self) -> Result<u128>;

    async fn get_block_by_number(&self, block: &str, full_transactions: bool) -> Result<Value>;

    async fn get_balance(&self, address: &str, block: &str) -> Result<u128>;

    async fn get_code(&self, address: &str, block: &str) -> Result<String>;

    async fn call(&self, transaction: Value, block: &str) -> Result<String>;

    async fn send_raw_transaction(&self, raw: &str) -> Result<String>;
}

fn quantity_u64(method: &str, value: Value) -> Result<u64> {
    value
        .as_str()
        .and_then(parse_hex_u64)
        .ok_or_else(|| unexpected(method, &value))
}

fn quantity_u128(method: &str, value: Value) -> Result<u128> {
    value
        .as_str()
        .and_then(parse_hex_u128)
        .ok_or_else(|| unexpected(method, &value))
}

fn data(method: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(unexpected(method, &other)),
    }
}

fn unexpected(method: &str, value: &Value) -> RpcHandlerError {
    RpcHandlerError::UnexpectedResponse {
        method: method.to_string(),
        value: value.to_string(),
    }
}

#[async_trait]
impl EthRpc for FailoverProvider {
    async fn block_number(&self) -> Result<u64> {
        let value = self.invoke("eth_blockNumber", json!([])).await?;
        quantity_u64("eth_blockNumber", value)
    }

    async fn chain_id(&self) -> Result<u64> {
        let value = self.invoke("eth_chainId", json!([])).await?;
        quantity_u64("eth_chainId", value)
    }

    async fn gas_price(&self) -> Result<u128> {
        let value = self.invoke("eth_gasPrice", json!([])).await?;
        quantity_u128("eth_gasPrice", value)
    }

    async fn get_block_by_number(&self, block: &str, full_transactions: bool) -> Result<Value> {
        self.invoke("eth_getBlockByNumber", json!([block, full_transactions]))
            .await
    }

    async fn get_balance(&self, address: &str, block: &str) -> Result<u128> {
        let value = self.invoke("eth_getBalance", json!([address, block])).await?;
        quantity_u128("eth_getBalance", value)
    }

    async fn get_code(&self, address: &str, block: &str) -> Result<String> {
        let value = self.invoke("eth_getCode", json!([address, block])).await?;
        data("eth_getCode", value)
    }

    async fn call(&self, transaction: Value, block: &str) -> Result<String> {
        let value = self.invoke("eth_call", json!([transaction, block])).await?;
        data("eth_call", value)
    }

    async fn send_raw_transaction(&self, raw: &str) -> Result<String> {
        let value = self.invoke("eth_sendRawTransaction", json!([raw])).await?;
        data("eth_sendRawTransaction", value)
    }
}
