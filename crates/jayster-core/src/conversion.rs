use std::collections::BTreeMap;

use alloy::primitives::U256;
use thiserror::Error;

use crate::ports::RatePort;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("exchange rate unavailable: {0}")]
    RateUnavailable(String),
}

/// Converts a balance into display currencies. Purely derived; it never
/// touches session state.
#[derive(Debug, Clone)]
pub struct ConversionService<R: RatePort> {
    rates: R,
    decimals: u8,
}

impl<R: RatePort> ConversionService<R> {
    /// `decimals` is how many smallest units make one priced unit, as a power
    /// of ten.
    pub fn new(rates: R, decimals: u8) -> Self {
        Self { rates, decimals }
    }

    pub async fn convert(
        &self,
        balance: U256,
        targets: &[&str],
    ) -> Result<BTreeMap<String, f64>, ConversionError> {
        let currencies: Vec<String> = targets
            .iter()
            .map(|code| code.trim().to_ascii_lowercase())
            .filter(|code| !code.is_empty())
            .collect();
        if currencies.is_empty() {
            return Ok(BTreeMap::new());
        }

        let rates = self
            .rates
            .rates(&currencies)
            .await
            .map_err(|e| ConversionError::RateUnavailable(e.to_string()))?;

        let units = self.whole_units(balance);
        let mut out = BTreeMap::new();
        for code in currencies {
            let rate = rates.get(&code).copied().ok_or_else(|| {
                ConversionError::RateUnavailable(format!("no rate returned for {code}"))
            })?;
            if !rate.is_finite() || rate < 0.0 {
                return Err(ConversionError::RateUnavailable(format!(
                    "malformed rate for {code}: {rate}"
                )));
            }
            out.insert(code, units * rate);
        }
        Ok(out)
    }

    fn whole_units(&self, balance: U256) -> f64 {
        // Digits only, so the parse cannot fail.
        let raw: f64 = balance.to_string().parse().unwrap_or(0.0);
        raw / 10f64.powi(i32::from(self.decimals))
    }
}

/// Two-decimal display of a converted amount, e.g. `$12.50` or `₱700.00`.
pub fn format_fiat(currency: &str, amount: f64) -> String {
    match currency.to_ascii_lowercase().as_str() {
        "usd" => format!("${amount:.2}"),
        "php" => format!("₱{amount:.2}"),
        "eur" => format!("€{amount:.2}"),
        "gbp" => format!("£{amount:.2}"),
        other => format!("{amount:.2} {}", other.to_ascii_uppercase()),
    }
}
