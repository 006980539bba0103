use std::fmt;

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::state_machine::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimestampMs(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Deposit,
    Withdraw,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Deposit => f.write_str("Deposit"),
            OperationKind::Withdraw => f.write_str("Withdraw"),
        }
    }
}

/// Strictly positive amount in the contract's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(U256);

impl Amount {
    pub fn new(value: U256) -> Result<Self, SessionError> {
        if value.is_zero() {
            return Err(SessionError::InvalidAmount(
                "amount must be greater than zero".to_owned(),
            ));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> U256 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

macro_rules! amount_from_unsigned {
    ($($ty:ty),*) => {$(
        impl TryFrom<$ty> for Amount {
            type Error = SessionError;

            fn try_from(value: $ty) -> Result<Self, Self::Error> {
                Amount::new(U256::from(value as u128))
            }
        }
    )*};
}

macro_rules! amount_from_signed {
    ($($ty:ty),*) => {$(
        impl TryFrom<$ty> for Amount {
            type Error = SessionError;

            fn try_from(value: $ty) -> Result<Self, Self::Error> {
                if value <= 0 {
                    return Err(SessionError::InvalidAmount(format!(
                        "amount must be greater than zero, got {value}"
                    )));
                }
                Amount::new(U256::from(value as u128))
            }
        }
    )*};
}

amount_from_unsigned!(u8, u16, u32, u64, u128, usize);
amount_from_signed!(i8, i16, i32, i64, i128, isize);

impl TryFrom<U256> for Amount {
    type Error = SessionError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl TryFrom<&str> for Amount {
    type Error = SessionError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SessionError::InvalidAmount(format!(
                "expected a positive integer, got {raw:?}"
            )));
        }
        let value = U256::from_str_radix(trimmed, 10)
            .map_err(|e| SessionError::InvalidAmount(format!("{raw:?}: {e}")))?;
        Amount::new(value)
    }
}

impl TryFrom<String> for Amount {
    type Error = SessionError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Amount::try_from(raw.as_str())
    }
}

impl TryFrom<f64> for Amount {
    type Error = SessionError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        // Integers above 2^53 are not exactly representable.
        if !value.is_finite()
            || value.fract() != 0.0
            || value <= 0.0
            || value > 9_007_199_254_740_992.0
        {
            return Err(SessionError::InvalidAmount(format!(
                "expected a positive integer, got {value}"
            )));
        }
        Amount::new(U256::from(value as u128))
    }
}

/// Last-known on-chain balance and how far it can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceState {
    Unknown,
    Fresh(U256),
    Stale(U256),
}

impl BalanceState {
    pub fn value(self) -> Option<U256> {
        match self {
            BalanceState::Unknown => None,
            BalanceState::Fresh(v) | BalanceState::Stale(v) => Some(v),
        }
    }

    pub fn is_fresh(self) -> bool {
        matches!(self, BalanceState::Fresh(_))
    }

    pub fn stale(self) -> Self {
        match self {
            BalanceState::Unknown => BalanceState::Unknown,
            BalanceState::Fresh(v) | BalanceState::Stale(v) => BalanceState::Stale(v),
        }
    }
}

impl fmt::Display for BalanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceState::Unknown => f.write_str("unknown"),
            BalanceState::Fresh(v) => write!(f, "{v}"),
            BalanceState::Stale(v) => write!(f, "{v} (stale)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub kind: OperationKind,
    pub amount: Amount,
    pub recorded_at: TimestampMs,
    pub tx_hash: B256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub kind: OperationKind,
    pub amount: Amount,
    pub submitted_at: TimestampMs,
}

/// Signing identity handed to a contract binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerHandle {
    pub account: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
}

/// Read-only view of the session for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub wallet_detected: bool,
    pub account: Option<Address>,
    pub balance: BalanceState,
    /// Set after a confirmation timeout until the next successful balance read.
    pub needs_reconcile: bool,
    pub history: Vec<TransactionRecord>,
    pub pending: Option<PendingOperation>,
    pub last_error: Option<SessionError>,
}

impl SessionSnapshot {
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
