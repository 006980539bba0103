use jayster_adapters::{
    AdapterConfig, CoinGeckoRateAdapter, ContractBinderAdapter, Eip1193Adapter, NewsApiAdapter,
    SystemClockAdapter,
};
use jayster_core::{
    format_fiat, ConversionService, NewsFeed, SessionController, SessionSnapshot, SessionState,
};

use crate::command::{Command, HELP, LEARN_ETH};

type Session = SessionController<Eip1193Adapter, ContractBinderAdapter, SystemClockAdapter>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    session: Session,
    conversion: ConversionService<CoinGeckoRateAdapter>,
    news: NewsFeed<NewsApiAdapter>,
    currencies: Vec<String>,
    news_query: String,
}

impl App {
    pub fn new(config: &AdapterConfig) -> Self {
        let wallet = Eip1193Adapter::with_config(config);
        let binder = ContractBinderAdapter::with_config(wallet.clone(), config);
        Self {
            session: SessionController::with_config(
                wallet,
                binder,
                SystemClockAdapter,
                config.session_config(),
            ),
            conversion: ConversionService::new(
                CoinGeckoRateAdapter::with_config(config),
                config.balance_decimals,
            ),
            news: NewsFeed::new(NewsApiAdapter::with_config(config), config.news_limit),
            currencies: config.display_currencies.clone(),
            news_query: config.news_query.clone(),
        }
    }

    /// Page-load step: picks up an existing authorization without prompting.
    pub async fn start(&self) {
        match self.session.initialize().await {
            Ok(SessionState::NoWallet) => {
                println!("Please install a wallet provider in order to use this ATM.")
            }
            Ok(_) => {}
            Err(e) => println!("error: {e}"),
        }
        self.print_status();
    }

    pub async fn handle(&self, command: Command) -> Flow {
        match command {
            Command::Connect => match self.session.connect().await {
                Ok(_) => self.print_status(),
                Err(e) => println!("connect failed: {e}"),
            },
            Command::Deposit(raw) => match self.session.deposit(raw.as_str()).await {
                Ok(record) => println!("deposited {} (tx {})", record.amount, record.tx_hash),
                Err(e) => println!("deposit failed: {e}"),
            },
            Command::Withdraw(raw) => match self.session.withdraw(raw.as_str()).await {
                Ok(record) => println!("withdrew {} (tx {})", record.amount, record.tx_hash),
                Err(e) => println!("withdraw failed: {e}"),
            },
            Command::Balance => match self.session.refresh_balance().await {
                Ok(balance) => println!("Your Balance: {balance} ETH"),
                Err(e) => println!("balance read failed: {e}"),
            },
            Command::Convert => self.convert().await,
            Command::News(term) => {
                let term = term.unwrap_or_else(|| self.news_query.clone());
                match self.news.headlines(&term).await {
                    Ok(articles) if articles.is_empty() => println!("no headlines for '{term}'"),
                    Ok(articles) => {
                        for article in articles {
                            println!("- {}\n  {}", article.title, article.url);
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
            Command::History => {
                let history = self.session.history();
                if history.is_empty() {
                    println!("no transactions this session");
                }
                for (i, record) in history.iter().enumerate() {
                    println!(
                        "{:>3}. {:<8} {:>10}  at {}ms  tx {}",
                        i + 1,
                        record.kind,
                        record.amount,
                        record.recorded_at.0,
                        record.tx_hash
                    );
                }
            }
            Command::Status => self.print_status(),
            Command::Learn => println!("{LEARN_ETH}"),
            Command::Help => println!("{HELP}"),
            Command::Quit => {
                if self.session.snapshot().is_pending() {
                    println!("a transaction is still pending; check the balance next session");
                }
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    async fn convert(&self) {
        let Some(balance) = self.session.balance().value() else {
            println!("balance unknown, connect first");
            return;
        };
        let targets: Vec<&str> = self.currencies.iter().map(String::as_str).collect();
        match self.conversion.convert(balance, &targets).await {
            Ok(values) => {
                for (currency, value) in values {
                    println!(
                        "Equivalent in {}: {}",
                        currency.to_ascii_uppercase(),
                        format_fiat(&currency, value)
                    );
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    fn print_status(&self) {
        println!("{}", render(&self.session.snapshot()));
    }
}

pub fn render(snap: &SessionSnapshot) -> String {
    let mut out = format!("state: {:?}", snap.state);
    match snap.account {
        Some(account) => out.push_str(&format!("\nYour Account: {account}")),
        None if snap.wallet_detected => {
            out.push_str("\nno account authorized, run 'connect'")
        }
        None => {}
    }
    if snap.state.is_bound() {
        out.push_str(&format!("\nYour Balance: {} ETH", snap.balance));
    }
    if let Some(pending) = snap.pending {
        out.push_str(&format!(
            "\npending: {} {}",
            pending.kind, pending.amount
        ));
    }
    if snap.needs_reconcile {
        out.push_str("\nlast transaction outcome unconfirmed, run 'balance' to reconcile");
    }
    if let Some(ref err) = snap.last_error {
        out.push_str(&format!("\nlast error: {err}"));
        if err.is_recoverable() {
            out.push_str(" (you can try again)");
        }
    }
    out
}
