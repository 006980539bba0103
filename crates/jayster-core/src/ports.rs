use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Amount, Article, OperationKind, SignerHandle, TxReceipt};

#[derive(Debug, Error)]
pub enum PortError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("rejected by user: {0}")]
    Rejected(String),
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Injected wallet provider (the `window.ethereum` role).
#[async_trait]
pub trait WalletPort: Send + Sync {
    /// Whether a provider is present. Never fails.
    fn detect(&self) -> bool;
    /// `eth_accounts`: already-authorized accounts, without prompting.
    async fn list_authorized_accounts(&self) -> Result<Vec<Address>, PortError>;
    /// `eth_requestAccounts`: prompts the user.
    async fn request_authorization(&self) -> Result<Vec<Address>, PortError>;
    fn signer(&self, account: Address) -> Result<SignerHandle, PortError>;
}

/// One deployed ATM contract bound to a signer.
#[async_trait]
pub trait ContractPort: Send + Sync {
    async fn read_balance(&self) -> Result<U256, PortError>;
    /// Sends the transaction and resolves only once it is confirmed on-chain.
    async fn submit(&self, kind: OperationKind, amount: Amount) -> Result<TxReceipt, PortError>;
}

pub trait ContractBinder: Send + Sync {
    type Contract: ContractPort + 'static;

    fn bind(&self, signer: SignerHandle) -> Result<Self::Contract, PortError>;
}

pub trait ClockPort: Send + Sync {
    fn now_ms(&self) -> Result<u64, PortError>;
}

#[async_trait]
pub trait RatePort: Send + Sync {
    /// Price of one whole balance unit in each requested (lower-case) currency.
    async fn rates(&self, currencies: &[String]) -> Result<BTreeMap<String, f64>, PortError>;
}

#[async_trait]
pub trait NewsPort: Send + Sync {
    async fn articles(&self, term: &str) -> Result<Vec<Article>, PortError>;
}
