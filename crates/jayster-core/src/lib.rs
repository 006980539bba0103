pub mod controller;
pub mod conversion;
pub mod domain;
pub mod error;
pub mod news;
pub mod ports;
pub mod state_machine;

pub use controller::{SessionConfig, SessionController};
pub use conversion::{format_fiat, ConversionError, ConversionService};
pub use domain::{
    Amount, Article, BalanceState, OperationKind, PendingOperation, SessionSnapshot,
    SignerHandle, TimestampMs, TransactionRecord, TxReceipt,
};
pub use error::SessionError;
pub use news::{NewsError, NewsFeed};
pub use ports::{
    ClockPort, ContractBinder, ContractPort, NewsPort, PortError, RatePort, WalletPort,
};
pub use state_machine::{
    session_transition, IllegalTransition, SessionAction, SessionState, StateTransition,
};
