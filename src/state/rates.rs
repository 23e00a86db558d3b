use crate::api::RateSource;
use crate::model::CurrencyRates;
use crate::repo::Repository;
use crate::utils::CancelFlag;
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info, warn};

/// What a rate refresh did.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// Fetched rates were merged and saved.
    Refreshed,
    /// The fetch failed. The rates held before are still in use.
    Fallback,
    /// The refresh was cancelled while fetching. The result was discarded.
    Cancelled,
}

serde_plain::derive_display_from_serialize!(RefreshOutcome);

/// Holds the exchange rates. Starts from the stored rates, or the bundled ones if none were ever
/// saved. Rates are reference data, so changes here never trigger a backup.
#[derive(Debug)]
pub struct RatesStore {
    repo: Repository,
    rates: CurrencyRates,
    loaded: bool,
}

impl RatesStore {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            rates: CurrencyRates::default(),
            loaded: false,
        }
    }

    pub fn load(&mut self) {
        if !self.loaded {
            self.rates = self.repo.currency_rates();
            self.loaded = true;
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self) -> &CurrencyRates {
        &self.rates
    }

    /// Fetches fresh rates for the current base currency from `source`.
    ///
    /// A failed fetch is logged and leaves the current rates in place. If `cancel` is raised
    /// before the fetch returns, the response is dropped.
    ///
    /// # Errors
    /// - Saving the merged rates failed. The rates in memory are unchanged.
    pub async fn refresh(
        &mut self,
        source: &dyn RateSource,
        cancel: &CancelFlag,
    ) -> Result<RefreshOutcome> {
        self.load();
        let base = self.rates.base.clone();
        debug!("Fetching rates for {base}");
        let fetched = source.fetch(&base).await;

        if cancel.is_cancelled() {
            debug!("Rate refresh was cancelled, discarding the result");
            return Ok(RefreshOutcome::Cancelled);
        }
        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                warn!("Unable to fetch currency rates, keeping the current ones: {e:#}");
                return Ok(RefreshOutcome::Fallback);
            }
        };

        let mut next = self.rates.clone();
        next.merge(response);
        self.repo
            .save_currency_rates(&next)
            .context("Unable to save the refreshed currency rates")?;
        info!("Refreshed {} currency rates", next.rates.len());
        self.rates = next;
        Ok(RefreshOutcome::Refreshed)
    }
}
