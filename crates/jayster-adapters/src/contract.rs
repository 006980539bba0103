use std::sync::Arc;
use std::time::Duration;

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{hex, Address, B256, U256};
use async_trait::async_trait;
use serde_json::{json, Value};

use jayster_core::{
    Amount, ContractBinder, ContractPort, OperationKind, PortError, SignerHandle, TxReceipt,
};

use crate::{AdapterConfig, Eip1193Adapter};

/// The three functions the ATM contract must expose.
#[derive(Debug, Clone)]
pub struct AtmAbi {
    get_balance: Function,
    deposit: Function,
    withdraw: Function,
}

impl AtmAbi {
    /// Accepts a bare ABI array or a compiler artifact carrying an `abi` field.
    pub fn parse(abi_json: &str) -> Result<Self, PortError> {
        let raw: Value = serde_json::from_str(abi_json)
            .map_err(|e| PortError::Validation(format!("invalid abi json: {e}")))?;
        let entries = match raw {
            Value::Object(mut artifact) => artifact
                .remove("abi")
                .ok_or_else(|| PortError::Validation("artifact has no abi field".to_owned()))?,
            other => other,
        };
        let abi: JsonAbi = serde_json::from_value(entries)
            .map_err(|e| PortError::Validation(format!("invalid abi json: {e}")))?;

        let get_balance = select(&abi, "getBalance", &[])?;
        if get_balance.outputs.first().map(|p| p.ty.as_str()) != Some("uint256") {
            return Err(PortError::Validation(
                "getBalance must return uint256".to_owned(),
            ));
        }
        Ok(Self {
            get_balance,
            deposit: select(&abi, "deposit", &["uint256"])?,
            withdraw: select(&abi, "withdraw", &["uint256"])?,
        })
    }

    fn operation(&self, kind: OperationKind) -> &Function {
        match kind {
            OperationKind::Deposit => &self.deposit,
            OperationKind::Withdraw => &self.withdraw,
        }
    }

    pub fn encode_get_balance(&self) -> Result<Vec<u8>, PortError> {
        self.get_balance
            .abi_encode_input(&[])
            .map_err(|e| PortError::Validation(format!("abi encoding failed: {e}")))
    }

    pub fn encode_operation(&self, kind: OperationKind, amount: Amount) -> Result<Vec<u8>, PortError> {
        self.operation(kind)
            .abi_encode_input(&[DynSolValue::Uint(amount.value(), 256)])
            .map_err(|e| PortError::Validation(format!("abi encoding failed: {e}")))
    }

    pub fn decode_balance(&self, data: &[u8]) -> Result<U256, PortError> {
        let values = self
            .get_balance
            .abi_decode_output(data, true)
            .map_err(|e| PortError::Transport(format!("getBalance decode failed: {e}")))?;
        values
            .first()
            .and_then(DynSolValue::as_uint)
            .map(|(value, _)| value)
            .ok_or_else(|| PortError::Transport("getBalance returned no uint256".to_owned()))
    }
}

fn select(abi: &JsonAbi, name: &str, inputs: &[&str]) -> Result<Function, PortError> {
    abi.function(name)
        .and_then(|overloads| {
            overloads.iter().find(|f| {
                f.inputs.len() == inputs.len()
                    && f.inputs.iter().zip(inputs).all(|(p, ty)| p.ty == *ty)
            })
        })
        .cloned()
        .ok_or_else(|| {
            PortError::Validation(format!(
                "abi is missing {name}({})",
                inputs.join(",")
            ))
        })
}

/// The ATM contract at one address, acting for one signer.
#[derive(Debug, Clone)]
pub struct ContractBinding {
    provider: Eip1193Adapter,
    address: Address,
    abi: Arc<AtmAbi>,
    signer: SignerHandle,
    poll_interval: Duration,
}

impl ContractBinding {
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt, PortError> {
        loop {
            match self
                .provider
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await
            {
                Ok(Value::Null) => {}
                Ok(receipt) => return receipt_outcome(tx_hash, &receipt),
                Err(e) => tracing::warn!(%tx_hash, error = %e, "receipt poll failed, retrying"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl ContractPort for ContractBinding {
    async fn read_balance(&self) -> Result<U256, PortError> {
        let data = self.abi.encode_get_balance()?;
        let call = json!({
            "from": self.signer.account,
            "to": self.address,
            "data": hex::encode_prefixed(data),
        });
        let result = self.provider.request("eth_call", json!([call, "latest"])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| PortError::Transport("eth_call: hex string expected".to_owned()))?;
        let bytes = hex::decode(raw)
            .map_err(|e| PortError::Transport(format!("eth_call: invalid hex: {e}")))?;
        self.abi.decode_balance(&bytes)
    }

    async fn submit(&self, kind: OperationKind, amount: Amount) -> Result<TxReceipt, PortError> {
        let data = self.abi.encode_operation(kind, amount)?;
        let tx = json!({
            "from": self.signer.account,
            "to": self.address,
            "data": hex::encode_prefixed(data),
        });
        let result = self
            .provider
            .request("eth_sendTransaction", json!([tx]))
            .await?;
        let tx_hash: B256 = result
            .as_str()
            .ok_or_else(|| PortError::Transport("eth_sendTransaction: hash expected".to_owned()))?
            .parse()
            .map_err(|e| PortError::Transport(format!("eth_sendTransaction: bad hash: {e}")))?;
        tracing::info!(%tx_hash, %kind, %amount, "transaction submitted");

        self.wait_for_receipt(tx_hash).await
    }
}

fn receipt_outcome(tx_hash: B256, receipt: &Value) -> Result<TxReceipt, PortError> {
    let block_number = receipt
        .get("blockNumber")
        .and_then(Value::as_str)
        .and_then(|raw| raw.strip_prefix("0x"))
        .and_then(|digits| u64::from_str_radix(digits, 16).ok());
    match receipt.get("status").and_then(Value::as_str) {
        Some("0x1") => Ok(TxReceipt {
            tx_hash,
            block_number,
        }),
        Some("0x0") => Err(PortError::Reverted(format!(
            "transaction {tx_hash} reverted"
        ))),
        other => Err(PortError::Transport(format!(
            "receipt for {tx_hash} has unexpected status {other:?}"
        ))),
    }
}

/// Binds the configured contract address and ABI to a signer.
#[derive(Debug, Clone)]
pub struct ContractBinderAdapter {
    provider: Eip1193Adapter,
    contract_address: String,
    abi_json: String,
    poll_interval: Duration,
}

impl ContractBinderAdapter {
    pub fn with_config(provider: Eip1193Adapter, config: &AdapterConfig) -> Self {
        Self {
            provider,
            contract_address: config.contract_address.clone(),
            abi_json: config.contract_abi_json.clone(),
            poll_interval: config.receipt_poll_interval(),
        }
    }
}

impl ContractBinder for ContractBinderAdapter {
    type Contract = ContractBinding;

    fn bind(&self, signer: SignerHandle) -> Result<Self::Contract, PortError> {
        let address: Address = self.contract_address.trim().parse().map_err(|e| {
            PortError::Validation(format!(
                "invalid contract address {}: {e}",
                self.contract_address
            ))
        })?;
        if address == Address::ZERO {
            return Err(PortError::Validation(
                "contract address must not be zero".to_owned(),
            ));
        }
        let abi = AtmAbi::parse(&self.abi_json)?;
        tracing::debug!(%address, account = %signer.account, "contract bound");
        Ok(ContractBinding {
            provider: self.provider.clone(),
            address,
            abi: Arc::new(abi),
            signer,
            poll_interval: self.poll_interval,
        })
    }
}
