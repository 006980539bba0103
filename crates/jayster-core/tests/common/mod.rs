#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use tokio::sync::Notify;

use jayster_core::{
    Amount, ClockPort, ContractBinder, ContractPort, OperationKind, PortError, SessionConfig,
    SessionController, SignerHandle, TxReceipt, WalletPort,
};

#[derive(Debug, Default)]
pub struct TestClock {
    now: AtomicU64,
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.now.fetch_add(1, Ordering::SeqCst) + 1_739_750_400_000)
    }
}

#[derive(Debug, Default)]
pub struct MockWallet {
    pub present: bool,
    pub preauthorized: Vec<Address>,
    pub reject_prompt: AtomicBool,
    /// Holds `request_authorization` until `prompt_gate` is notified.
    pub gate_prompt: AtomicBool,
    pub prompt_gate: Notify,
    pub list_calls: AtomicUsize,
    pub prompt_calls: AtomicUsize,
}

impl MockWallet {
    pub fn present() -> Self {
        Self {
            present: true,
            ..Self::default()
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletPort for MockWallet {
    fn detect(&self) -> bool {
        self.present
    }

    async fn list_authorized_accounts(&self) -> Result<Vec<Address>, PortError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.preauthorized.clone())
    }

    async fn request_authorization(&self) -> Result<Vec<Address>, PortError> {
        self.prompt_calls.fetch_add(1, Ordering::SeqCst);
        if self.gate_prompt.load(Ordering::SeqCst) {
            self.prompt_gate.notified().await;
        }
        if self.reject_prompt.load(Ordering::SeqCst) {
            return Err(PortError::Rejected("User rejected the request.".to_owned()));
        }
        Ok(vec![account()])
    }

    fn signer(&self, account: Address) -> Result<SignerHandle, PortError> {
        Ok(SignerHandle { account })
    }
}

#[derive(Debug, Default)]
pub struct ChainState {
    pub balance: U256,
    pub reads: usize,
    pub submits: usize,
    pub confirmed: u64,
    pub reject_next: bool,
    pub fail_reads: bool,
    pub hang_reads: bool,
    pub fail_submit: bool,
    pub hang: bool,
    pub gated: bool,
}

/// Shared in-memory stand-in for the deployed contract.
#[derive(Debug, Clone, Default)]
pub struct MockChain {
    pub state: Arc<Mutex<ChainState>>,
    pub gate: Arc<Notify>,
}

impl MockChain {
    pub fn with(f: impl FnOnce(&mut ChainState)) -> Self {
        let chain = Self::default();
        chain.update(f);
        chain
    }

    pub fn update(&self, f: impl FnOnce(&mut ChainState)) {
        f(&mut self.state.lock().expect("chain lock"));
    }

    pub fn reads(&self) -> usize {
        self.state.lock().expect("chain lock").reads
    }

    pub fn submits(&self) -> usize {
        self.state.lock().expect("chain lock").submits
    }
}

#[derive(Debug)]
pub struct MockContract {
    chain: MockChain,
}

#[async_trait]
impl ContractPort for MockContract {
    async fn read_balance(&self) -> Result<U256, PortError> {
        let hang = {
            let mut g = self.chain.state.lock().expect("chain lock");
            g.reads += 1;
            if g.fail_reads {
                return Err(PortError::Transport("rpc unreachable".to_owned()));
            }
            g.hang_reads
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(self.chain.state.lock().expect("chain lock").balance)
    }

    async fn submit(&self, kind: OperationKind, amount: Amount) -> Result<TxReceipt, PortError> {
        let (gated, hang) = {
            let mut g = self.chain.state.lock().expect("chain lock");
            g.submits += 1;
            if g.reject_next {
                g.reject_next = false;
                return Err(PortError::Rejected(
                    "MetaMask Tx Signature: User denied transaction signature.".to_owned(),
                ));
            }
            (g.gated, g.hang)
        };
        if self.chain.state.lock().expect("chain lock").fail_submit {
            return Err(PortError::Transport("connection reset".to_owned()));
        }
        if gated {
            self.chain.gate.notified().await;
        }
        if hang {
            std::future::pending::<()>().await;
        }

        let mut g = self.chain.state.lock().expect("chain lock");
        match kind {
            OperationKind::Deposit => g.balance += amount.value(),
            OperationKind::Withdraw => {
                if amount.value() > g.balance {
                    return Err(PortError::Reverted("Insufficient balance".to_owned()));
                }
                g.balance -= amount.value();
            }
        }
        g.confirmed += 1;
        Ok(TxReceipt {
            tx_hash: B256::with_last_byte(g.confirmed as u8),
            block_number: Some(g.confirmed),
        })
    }
}

#[derive(Debug, Default)]
pub struct MockBinder {
    pub chain: MockChain,
    pub fail: bool,
    pub binds: AtomicUsize,
}

impl ContractBinder for MockBinder {
    type Contract = MockContract;

    fn bind(&self, _signer: SignerHandle) -> Result<Self::Contract, PortError> {
        self.binds.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PortError::Validation("invalid contract address".to_owned()));
        }
        Ok(MockContract {
            chain: self.chain.clone(),
        })
    }
}

pub type TestController = SessionController<MockWallet, MockBinder, TestClock>;

pub fn controller(wallet: MockWallet, chain: MockChain) -> TestController {
    SessionController::new(
        wallet,
        MockBinder {
            chain,
            ..MockBinder::default()
        },
        TestClock::default(),
    )
}

pub fn controller_with_timeout(
    wallet: MockWallet,
    chain: MockChain,
    timeout: Duration,
) -> TestController {
    SessionController::with_config(
        wallet,
        MockBinder {
            chain,
            ..MockBinder::default()
        },
        TestClock::default(),
        SessionConfig {
            confirmation_timeout: timeout,
        },
    )
}

pub async fn ready_controller(chain: MockChain) -> TestController {
    let ctl = controller(MockWallet::present(), chain);
    ctl.connect().await.expect("connect");
    ctl
}

pub fn account() -> Address {
    "0x0000000000000000000000000000000000000ABC"
        .parse()
        .expect("valid account address")
}
