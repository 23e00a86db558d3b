use crate::api::{self, Mode};
use crate::commands::{read_state, Out};
use crate::model::CurrencyRates;
use crate::state::RefreshOutcome;
use crate::{CancelFlag, Config, Result};

/// Fetches the latest exchange rates. If the rate service cannot be reached the current rates
/// stay in use and the command still succeeds.
pub async fn rates_refresh(config: Config, mode: Mode) -> Result<Out<CurrencyRates>> {
    let source = api::rate_source(&config, mode)?;
    let mut state = read_state(&config)?;
    let outcome = state
        .rates_mut()
        .refresh(source.as_ref(), &CancelFlag::new())
        .await?;
    let rates = state.rates().get().clone();
    let message = match outcome {
        RefreshOutcome::Refreshed => format!(
            "Refreshed {} currency rates as of {}",
            rates.rates.len(),
            rates.updated_at
        ),
        RefreshOutcome::Fallback => format!(
            "Unable to refresh currency rates, still using the rates as of {}",
            rates.updated_at
        ),
        RefreshOutcome::Cancelled => "The refresh was cancelled".to_string(),
    };
    Ok(Out::new(message, rates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_rates_refresh_in_test_mode() {
        let env = TestEnv::new().await;
        let out = rates_refresh(env.config(), Mode::Test).await.unwrap();
        assert!(out.message().starts_with("Refreshed"));
        assert_eq!(
            env.repository().stored_currency_rates().as_ref(),
            out.structure()
        );
    }
}
