use crate::model::settings::DEFAULT_CURRENCY;
use crate::model::{Collection, Singleton};
use crate::Result;
use anyhow::ensure;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rates bundled with the app as (code, value, scale), relative to USD.
const BUNDLED: &[(&str, i64, u32)] = &[
    ("AUD", 152, 2),
    ("BRL", 497, 2),
    ("CAD", 136, 2),
    ("CHF", 88, 2),
    ("CNY", 719, 2),
    ("EUR", 92, 2),
    ("GBP", 79, 2),
    ("INR", 8330, 2),
    ("JPY", 14950, 2),
    ("MXN", 1710, 2),
    ("PLN", 398, 2),
    ("SEK", 1045, 2),
    ("USD", 1, 0),
];

/// Trims and uppercases a currency code, which must be three letters.
pub fn currency_code(code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    ensure!(
        code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()),
        "'{code}' is not a three-letter currency code"
    );
    Ok(code)
}

/// Exchange rates: one unit of `base` is worth `rates[code]` units of `code`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyRates {
    pub base: String,
    pub updated_at: NaiveDate,
    pub rates: BTreeMap<String, Decimal>,
}

impl Default for CurrencyRates {
    /// The bundled rates, used until a refresh succeeds.
    fn default() -> Self {
        Self {
            base: DEFAULT_CURRENCY.to_string(),
            updated_at: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            rates: BUNDLED
                .iter()
                .map(|(code, num, scale)| (code.to_string(), Decimal::new(*num, *scale)))
                .collect(),
        }
    }
}

impl Singleton for CurrencyRates {
    const COLLECTION: Collection = Collection::CurrencyRates;
}

impl CurrencyRates {
    /// The value of one unit of `base` in `code`.
    pub fn rate(&self, code: &str) -> Option<Decimal> {
        if code.eq_ignore_ascii_case(&self.base) {
            return Some(Decimal::ONE);
        }
        self.rates.get(&code.to_ascii_uppercase()).copied()
    }

    /// Converts `amount` from currency `from` to currency `to`. Returns `None` if either code is
    /// unknown or has a zero rate, or if the result is too large to represent.
    pub fn convert(&self, amount: Decimal, from: &str, to: &str) -> Option<Decimal> {
        let from_rate = self.rate(from)?;
        let to_rate = self.rate(to)?;
        amount.checked_div(from_rate)?.checked_mul(to_rate)
    }

    /// Applies a fetched response. Codes present in the response replace existing values; codes
    /// absent from it keep their last known value. If the response uses a different base, the
    /// retained values are rebased so the whole table stays consistent.
    pub fn merge(&mut self, response: RateResponse) {
        let new_base = response.base.to_ascii_uppercase();
        if new_base != self.base {
            if let Some(factor) = self.rate(&new_base).filter(|r| !r.is_zero()) {
                let old_base = std::mem::replace(&mut self.base, new_base.clone());
                // Values that cannot be rebased are dropped rather than kept against the old base.
                self.rates.retain(|_, value| match value.checked_div(factor) {
                    Some(rebased) => {
                        *value = rebased;
                        true
                    }
                    None => false,
                });
                if let Some(old_rate) = Decimal::ONE.checked_div(factor) {
                    self.rates.insert(old_base, old_rate);
                }
            } else {
                self.base = new_base.clone();
            }
        }
        for (code, value) in response.rates {
            self.rates.insert(code.to_ascii_uppercase(), value);
        }
        self.rates.insert(new_base, Decimal::ONE);
        self.updated_at = response.date;
    }
}

/// The response body of the rate service: `{base, date, rates: {code: number}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateResponse {
    pub base: String,
    pub date: NaiveDate,
    pub rates: BTreeMap<String, Decimal>,
}
