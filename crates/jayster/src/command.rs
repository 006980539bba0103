//! Text commands accepted at the prompt.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    /// Amount stays raw text; the controller validates it.
    Deposit(String),
    Withdraw(String),
    Balance,
    Convert,
    News(Option<String>),
    History,
    Status,
    Learn,
    Help,
    Quit,
}

impl Command {
    /// Commands that wait on the wallet or the network. They run as local
    /// tasks so the prompt keeps answering while one is in flight.
    pub fn suspends(&self) -> bool {
        matches!(
            self,
            Command::Connect
                | Command::Deposit(_)
                | Command::Withdraw(_)
                | Command::Balance
                | Command::Convert
                | Command::News(_)
        )
    }

    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err("empty command".to_owned());
        };
        let rest: Vec<&str> = words.collect();

        let cmd = match head.to_ascii_lowercase().as_str() {
            "connect" => Command::Connect,
            "deposit" => Command::Deposit(single_arg("deposit", &rest)?),
            "withdraw" => Command::Withdraw(single_arg("withdraw", &rest)?),
            "balance" | "refresh" => Command::Balance,
            "convert" => Command::Convert,
            "news" => Command::News((!rest.is_empty()).then(|| rest.join(" "))),
            "history" => Command::History,
            "status" => Command::Status,
            "learn" => Command::Learn,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("unknown command '{other}', try 'help'")),
        };
        Ok(cmd)
    }
}

fn single_arg(name: &str, rest: &[&str]) -> Result<String, String> {
    match rest {
        [amount] => Ok((*amount).to_owned()),
        _ => Err(format!("usage: {name} <amount>")),
    }
}

pub const HELP: &str = "\
commands:
  connect            authorize the wallet and bind the ATM contract
  deposit <n>        deposit n units
  withdraw <n>       withdraw n units
  balance            re-read the on-chain balance
  convert            show the balance in the display currencies
  news [term]        latest headlines
  history            transactions confirmed this session
  status             session state
  learn              what is Ethereum?
  quit";

pub const LEARN_ETH: &str = "\
What is Ethereum (ETH)?

Ethereum is a decentralized, open-source blockchain system that features smart
contract functionality. It is the second-largest cryptocurrency platform by
market capitalization, after Bitcoin.

Developed by Vitalik Buterin in 2013 and later implemented in 2015, Ethereum
allows developers to build decentralized applications (DApps) on its
blockchain. These applications can be used for a variety of purposes,
including financial transactions, gaming and voting.

Ethereum's native cryptocurrency, Ether (ETH), is used to pay for transactions
and computational services on the network. It is also traded on various
cryptocurrency exchanges.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_operations_with_raw_amounts() {
        assert_eq!(
            Command::parse("deposit 5").expect("deposit"),
            Command::Deposit("5".to_owned())
        );
        assert_eq!(
            Command::parse("  WITHDRAW -1 ").expect("withdraw"),
            Command::Withdraw("-1".to_owned())
        );
        assert!(Command::parse("deposit").is_err());
        assert!(Command::parse("deposit 1 2").is_err());
    }

    #[test]
    fn only_network_commands_run_in_the_background() {
        assert!(Command::Deposit("1".to_owned()).suspends());
        assert!(Command::Connect.suspends());
        assert!(!Command::Status.suspends());
        assert!(!Command::History.suspends());
        assert!(!Command::Quit.suspends());
    }

    #[test]
    fn news_term_is_optional() {
        assert_eq!(Command::parse("news").expect("news"), Command::News(None));
        assert_eq!(
            Command::parse("news layer two").expect("news"),
            Command::News(Some("layer two".to_owned()))
        );
    }

    #[test]
    fn unknown_and_empty_input_is_rejected() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("transfer 3").is_err());
        assert_eq!(Command::parse("exit").expect("quit"), Command::Quit);
    }
}
