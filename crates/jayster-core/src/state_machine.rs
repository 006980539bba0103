use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    NoWallet,
    WalletDetected,
    AccountAuthorized,
    ContractBound,
    Ready,
    OperationPending,
}

impl SessionState {
    /// True once a contract binding exists for the session.
    pub fn is_bound(self) -> bool {
        matches!(
            self,
            SessionState::ContractBound | SessionState::Ready | SessionState::OperationPending
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionAction {
    DetectWallet,
    Authorize,
    Bind,
    BindFailed,
    BalanceLoaded,
    Submit,
    Confirm,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: SessionState,
    pub to: SessionState,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal session transition: {from:?} on {action:?}")]
pub struct IllegalTransition {
    pub from: SessionState,
    pub action: SessionAction,
}

pub fn session_transition(
    state: SessionState,
    action: SessionAction,
) -> Result<(SessionState, StateTransition), IllegalTransition> {
    use SessionAction as A;
    use SessionState as S;

    let (to, reason) = match (state, action) {
        (S::NoWallet, A::DetectWallet) => (S::WalletDetected, "wallet_detected"),
        (S::WalletDetected | S::ContractBound | S::Ready, A::Authorize) => {
            (S::AccountAuthorized, "account_authorized")
        }
        (S::AccountAuthorized, A::Bind) => (S::ContractBound, "contract_bound"),
        // A failed binding drops the account; the user has to authorize again.
        (S::AccountAuthorized, A::BindFailed) => (S::WalletDetected, "binding_failed"),
        (S::ContractBound | S::Ready, A::BalanceLoaded) => (S::Ready, "balance_loaded"),
        (S::Ready, A::Submit) => (S::OperationPending, "operation_submitted"),
        (S::OperationPending, A::Confirm) => (S::Ready, "operation_confirmed"),
        (S::OperationPending, A::Fail) => (S::Ready, "operation_failed"),
        (from, action) => return Err(IllegalTransition { from, action }),
    };

    Ok((
        to,
        StateTransition {
            from: state,
            to,
            reason,
        },
    ))
}
