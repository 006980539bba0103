pub mod clock;
pub mod config;
pub mod contract;
pub mod eip1193;
pub mod news;
pub mod rates;

pub use clock::SystemClockAdapter;
pub use config::{AdapterConfig, ASSESSMENT_ABI, DEFAULT_CONTRACT_ADDRESS};
pub use contract::{AtmAbi, ContractBinderAdapter, ContractBinding};
pub use eip1193::Eip1193Adapter;
pub use news::NewsApiAdapter;
pub use rates::CoinGeckoRateAdapter;
