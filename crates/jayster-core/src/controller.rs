use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use alloy::primitives::{Address, U256};

use crate::domain::{
    Amount, BalanceState, OperationKind, PendingOperation, SessionSnapshot, TimestampMs,
    TransactionRecord, TxReceipt,
};
use crate::error::SessionError;
use crate::ports::{ClockPort, ContractBinder, ContractPort, PortError, WalletPort};
use crate::state_machine::{session_transition, SessionAction, SessionState, StateTransition};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on signing plus confirmation of one deposit or withdraw.
    pub confirmation_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(120),
        }
    }
}

struct SessionInner<K> {
    state: SessionState,
    wallet_detected: bool,
    account: Option<Address>,
    contract: Option<Arc<K>>,
    balance: BalanceState,
    needs_reconcile: bool,
    history: Vec<TransactionRecord>,
    pending: Option<PendingOperation>,
    last_error: Option<SessionError>,
}

impl<K> Default for SessionInner<K> {
    fn default() -> Self {
        Self {
            state: SessionState::NoWallet,
            wallet_detected: false,
            account: None,
            contract: None,
            balance: BalanceState::Unknown,
            needs_reconcile: false,
            history: Vec::new(),
            pending: None,
            last_error: None,
        }
    }
}

/// Owns every field of one wallet/contract session.
///
/// Commands take `&self` so a snapshot can be read while a transaction is
/// suspended. The state lock is never held across an `.await`; the
/// `OperationPending` state is what keeps a second operation from reaching
/// the signer.
pub struct SessionController<W, B, C>
where
    W: WalletPort,
    B: ContractBinder,
    C: ClockPort,
{
    pub wallet: W,
    pub binder: B,
    pub clock: C,
    config: SessionConfig,
    inner: Mutex<SessionInner<B::Contract>>,
}

impl<W, B, C> SessionController<W, B, C>
where
    W: WalletPort,
    B: ContractBinder,
    C: ClockPort,
{
    pub fn new(wallet: W, binder: B, clock: C) -> Self {
        Self::with_config(wallet, binder, clock, SessionConfig::default())
    }

    pub fn with_config(wallet: W, binder: B, clock: C, config: SessionConfig) -> Self {
        Self {
            wallet,
            binder,
            clock,
            config,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    /// Startup check: detect the wallet and pick up an account the user has
    /// already authorized, without prompting.
    pub async fn initialize(&self) -> Result<SessionState, SessionError> {
        let result = self.initialize_inner().await;
        self.finish(result)
    }

    /// Prompts the user for account access, binds the contract and loads the
    /// balance.
    pub async fn connect(&self) -> Result<SessionState, SessionError> {
        let result = self.connect_inner().await;
        self.finish(result)
    }

    pub async fn deposit<A>(&self, amount: A) -> Result<TransactionRecord, SessionError>
    where
        A: TryInto<Amount, Error = SessionError>,
    {
        self.run_operation(OperationKind::Deposit, amount.try_into())
            .await
    }

    pub async fn withdraw<A>(&self, amount: A) -> Result<TransactionRecord, SessionError>
    where
        A: TryInto<Amount, Error = SessionError>,
    {
        self.run_operation(OperationKind::Withdraw, amount.try_into())
            .await
    }

    /// Re-reads the on-chain balance. Also reconciles after a timeout.
    pub async fn refresh_balance(&self) -> Result<U256, SessionError> {
        let result: Result<U256, SessionError> = async {
            let contract = {
                let inner = self.lock()?;
                if inner.pending.is_some() {
                    return Err(SessionError::OperationInProgress);
                }
                inner
                    .contract
                    .clone()
                    .ok_or(SessionError::NotReady(inner.state))?
            };
            self.load_balance(contract).await
        }
        .await;
        self.finish(result)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.read();
        SessionSnapshot {
            state: inner.state,
            wallet_detected: inner.wallet_detected,
            account: inner.account,
            balance: inner.balance,
            needs_reconcile: inner.needs_reconcile,
            history: inner.history.clone(),
            pending: inner.pending,
            last_error: inner.last_error.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.read().state
    }

    pub fn balance(&self) -> BalanceState {
        self.read().balance
    }

    pub fn history(&self) -> Vec<TransactionRecord> {
        self.read().history.clone()
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.read().last_error.clone()
    }

    async fn initialize_inner(&self) -> Result<SessionState, SessionError> {
        if !self.detect_wallet()? {
            tracing::info!("no wallet provider detected");
            return Ok(SessionState::NoWallet);
        }
        if self.state() != SessionState::WalletDetected {
            return Ok(self.state());
        }
        let accounts = self
            .wallet
            .list_authorized_accounts()
            .await
            .map_err(authorization_error)?;
        match accounts.first().copied() {
            Some(account) => {
                tracing::info!(%account, "account already authorized");
                self.establish(account).await
            }
            None => {
                tracing::info!("no authorized account found");
                Ok(self.state())
            }
        }
    }

    async fn connect_inner(&self) -> Result<SessionState, SessionError> {
        if self.lock()?.pending.is_some() {
            return Err(SessionError::OperationInProgress);
        }
        if !self.detect_wallet()? {
            return Err(SessionError::WalletUnavailable);
        }
        let accounts = self
            .wallet
            .request_authorization()
            .await
            .map_err(authorization_error)?;
        let account = accounts.first().copied().ok_or_else(|| {
            SessionError::UserRejected("wallet returned no authorized account".to_owned())
        })?;
        tracing::info!(%account, "account connected");
        self.establish(account).await
    }

    fn detect_wallet(&self) -> Result<bool, SessionError> {
        let mut inner = self.lock()?;
        if inner.wallet_detected {
            return Ok(true);
        }
        if !self.wallet.detect() {
            return Ok(false);
        }
        Self::apply(&mut inner, SessionAction::DetectWallet)?;
        inner.wallet_detected = true;
        Ok(true)
    }

    /// Authorize `account`, replace the binding, then gate `Ready` on a read.
    async fn establish(&self, account: Address) -> Result<SessionState, SessionError> {
        let contract = {
            let mut inner = self.lock()?;
            if inner.pending.is_some() {
                return Err(SessionError::OperationInProgress);
            }
            Self::apply(&mut inner, SessionAction::Authorize)?;
            inner.account = Some(account);
            inner.contract = None;
            inner.balance = BalanceState::Unknown;
            inner.needs_reconcile = false;

            let bound = self
                .wallet
                .signer(account)
                .and_then(|signer| self.binder.bind(signer));
            match bound {
                Ok(contract) => {
                    let contract = Arc::new(contract);
                    inner.contract = Some(Arc::clone(&contract));
                    Self::apply(&mut inner, SessionAction::Bind)?;
                    contract
                }
                Err(e) => {
                    Self::apply(&mut inner, SessionAction::BindFailed)?;
                    inner.account = None;
                    return Err(SessionError::BindingError(e.to_string()));
                }
            }
        };
        self.load_balance(contract).await?;
        Ok(self.state())
    }

    async fn load_balance(&self, contract: Arc<B::Contract>) -> Result<U256, SessionError> {
        let value = contract
            .read_balance()
            .await
            .map_err(|e| SessionError::ReadError(e.to_string()))?;

        let mut inner = self.lock()?;
        let current = inner
            .contract
            .as_ref()
            .is_some_and(|c| Arc::ptr_eq(c, &contract));
        if !current {
            return Err(SessionError::ReadError(
                "contract binding replaced during balance read".to_owned(),
            ));
        }
        Self::apply(&mut inner, SessionAction::BalanceLoaded)?;
        inner.balance = BalanceState::Fresh(value);
        inner.needs_reconcile = false;
        tracing::info!(balance = %value, "balance loaded");
        Ok(value)
    }

    async fn run_operation(
        &self,
        kind: OperationKind,
        amount: Result<Amount, SessionError>,
    ) -> Result<TransactionRecord, SessionError> {
        match self.operate(kind, amount).await {
            Ok((record, follow_up)) => {
                if let Some(err) = &follow_up {
                    tracing::warn!(error = %err, "balance refresh after confirmation failed");
                }
                self.read().last_error = follow_up;
                Ok(record)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Returns the appended record and, if the post-confirmation read failed,
    /// the error to keep as the last error.
    async fn operate(
        &self,
        kind: OperationKind,
        amount: Result<Amount, SessionError>,
    ) -> Result<(TransactionRecord, Option<SessionError>), SessionError> {
        let amount = amount?;
        let (contract, pending, prior) = {
            let mut inner = self.lock()?;
            if inner.pending.is_some() {
                return Err(SessionError::OperationInProgress);
            }
            if inner.state != SessionState::Ready {
                return Err(SessionError::NotReady(inner.state));
            }
            let contract = inner
                .contract
                .clone()
                .ok_or(SessionError::NotReady(inner.state))?;
            let submitted_at = TimestampMs(self.clock.now_ms().map_err(clock_error)?);
            Self::apply(&mut inner, SessionAction::Submit)?;
            let pending = PendingOperation {
                kind,
                amount,
                submitted_at,
            };
            inner.pending = Some(pending);
            let prior = inner.balance;
            inner.balance = prior.stale();
            (contract, pending, prior)
        };
        tracing::info!(%kind, %amount, "operation submitted");

        let timeout = self.config.confirmation_timeout;
        let outcome = tokio::time::timeout(timeout, contract.submit(kind, amount)).await;
        match outcome {
            Ok(Ok(receipt)) => self.confirm(contract, pending, receipt).await,
            Ok(Err(e)) => {
                let err = submission_error(e);
                // Only a rejection or a revert proves the balance did not move.
                let unknown = matches!(err, SessionError::Provider(_));
                self.abandon(prior, unknown)?;
                Err(err)
            }
            Err(_) => {
                self.abandon(prior, true)?;
                Err(SessionError::TransactionTimeout(
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ))
            }
        }
    }

    async fn confirm(
        &self,
        contract: Arc<B::Contract>,
        pending: PendingOperation,
        receipt: TxReceipt,
    ) -> Result<(TransactionRecord, Option<SessionError>), SessionError> {
        tracing::info!(kind = %pending.kind, tx_hash = %receipt.tx_hash, "operation confirmed");
        let timeout = self.config.confirmation_timeout;
        let read = match tokio::time::timeout(timeout, contract.read_balance()).await {
            Ok(read) => read.map_err(|e| e.to_string()),
            Err(_) => Err(format!(
                "no balance returned within {} ms",
                timeout.as_millis()
            )),
        };

        let mut inner = self.lock()?;
        let recorded_at = match self.clock.now_ms() {
            Ok(now) => TimestampMs(now),
            Err(e) => {
                tracing::warn!(error = %e, "clock unavailable, using submission time");
                pending.submitted_at
            }
        };
        let record = TransactionRecord {
            kind: pending.kind,
            amount: pending.amount,
            recorded_at,
            tx_hash: receipt.tx_hash,
        };
        inner.history.push(record.clone());
        inner.pending = None;
        Self::apply(&mut inner, SessionAction::Confirm)?;

        let follow_up = match read {
            Ok(value) => {
                inner.balance = BalanceState::Fresh(value);
                inner.needs_reconcile = false;
                None
            }
            Err(reason) => {
                inner.needs_reconcile = true;
                Some(SessionError::ReadError(reason))
            }
        };
        Ok((record, follow_up))
    }

    /// Clears the pending operation after a failed submission. A timeout
    /// leaves the balance stale because the transaction may still land.
    fn abandon(&self, prior: BalanceState, timed_out: bool) -> Result<(), SessionError> {
        let mut inner = self.lock()?;
        inner.pending = None;
        Self::apply(&mut inner, SessionAction::Fail)?;
        if timed_out {
            inner.needs_reconcile = true;
        } else {
            inner.balance = prior;
        }
        Ok(())
    }

    fn apply(
        inner: &mut SessionInner<B::Contract>,
        action: SessionAction,
    ) -> Result<StateTransition, SessionError> {
        let (to, transition) = session_transition(inner.state, action)
            .map_err(|e| SessionError::State(e.to_string()))?;
        inner.state = to;
        tracing::debug!(
            from = ?transition.from,
            to = ?transition.to,
            reason = transition.reason,
            "session transition"
        );
        Ok(transition)
    }

    fn finish<T>(&self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        match result {
            Ok(value) => {
                self.read().last_error = None;
                Ok(value)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn fail(&self, err: SessionError) -> SessionError {
        tracing::warn!(error = %err, "session command failed");
        self.read().last_error = Some(err.clone());
        err
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionInner<B::Contract>>, SessionError> {
        self.inner
            .lock()
            .map_err(|e| SessionError::State(format!("session lock poisoned: {e}")))
    }

    /// Lock for observers and error bookkeeping; recovers a poisoned lock.
    fn read(&self) -> MutexGuard<'_, SessionInner<B::Contract>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn authorization_error(err: PortError) -> SessionError {
    match err {
        PortError::Rejected(reason) => SessionError::UserRejected(reason),
        PortError::Unavailable(_) => SessionError::WalletUnavailable,
        other => SessionError::Provider(other.to_string()),
    }
}

fn submission_error(err: PortError) -> SessionError {
    match err {
        PortError::Rejected(reason) => SessionError::TransactionRejected(reason),
        PortError::Reverted(reason) => SessionError::TransactionReverted(reason),
        other => SessionError::Provider(other.to_string()),
    }
}

fn clock_error(err: PortError) -> SessionError {
    SessionError::State(format!("clock unavailable: {err}"))
}
