use thiserror::Error;

use crate::state_machine::SessionState;

/// Failures exposed at the controller boundary.
///
/// Every command stores the error it returns as the session's last error, so
/// presentation code can render it from a snapshot instead of handling it
/// inline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no wallet provider detected; install a wallet to use this ATM")]
    WalletUnavailable,
    #[error("request rejected by user: {0}")]
    UserRejected(String),
    #[error("contract binding failed: {0}")]
    BindingError(String),
    #[error("balance read failed: {0}")]
    ReadError(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("another operation is already in progress")]
    OperationInProgress,
    #[error("transaction rejected: {0}")]
    TransactionRejected(String),
    #[error("transaction reverted: {0}")]
    TransactionReverted(String),
    #[error("transaction not confirmed within {0} ms; outcome unknown until the next balance read")]
    TransactionTimeout(u64),
    #[error("session is not ready (state {0:?})")]
    NotReady(SessionState),
    #[error("wallet provider error: {0}")]
    Provider(String),
    #[error("session state unavailable: {0}")]
    State(String),
}

impl SessionError {
    /// Errors the user can clear by issuing the same command again. A timed
    /// out operation is excluded: repeating it may apply it twice.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SessionError::WalletUnavailable
                | SessionError::BindingError(_)
                | SessionError::State(_)
                | SessionError::TransactionTimeout(_)
        )
    }
}
