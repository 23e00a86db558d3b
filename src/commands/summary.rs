use crate::commands::{read_state, Out};
use crate::{Config, Result};
use chrono::{Local, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::warn;

/// What one subscription costs, converted to the main currency.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct SummaryLine {
    pub id: String,
    pub name: String,
    pub monthly: Decimal,
    pub yearly: Decimal,
    pub next_payment: Option<NaiveDate>,
}

/// Spending totals in `currency`. Subscriptions whose currency has no known rate, or whose cost is
/// too large to compute, are listed in `unconverted` and left out of the totals.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct Summary {
    pub currency: String,
    pub monthly: Decimal,
    pub yearly: Decimal,
    pub lines: Vec<SummaryLine>,
    pub unconverted: Vec<String>,
}

pub async fn summary(config: Config) -> Result<Out<Summary>> {
    let state = read_state(&config)?;
    let settings = state.settings().get();
    let rates = state.rates().get();
    let currency = settings.main_currency.clone();
    let places = if settings.round_whole_numbers { 0 } else { 2 };
    let round = |value: Decimal| {
        value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
    };
    let today = Local::now().date_naive();

    let mut lines = Vec::new();
    let mut unconverted = Vec::new();
    let (mut monthly, mut yearly) = (Decimal::ZERO, Decimal::ZERO);
    for s in state.subscriptions().all() {
        let Some(yearly_cost) = s.yearly_cost() else {
            warn!("The cost of '{}' is too large, it is left out of the totals", s.name);
            unconverted.push(s.id.clone());
            continue;
        };
        let Some(converted) = rates.convert(yearly_cost, &s.currency, &currency) else {
            warn!(
                "There is no exchange rate for {}, '{}' is left out of the totals",
                s.currency, s.name
            );
            unconverted.push(s.id.clone());
            continue;
        };
        let per_month = converted / Decimal::from(12);
        let totals = yearly
            .checked_add(converted)
            .zip(monthly.checked_add(per_month));
        let Some((new_yearly, new_monthly)) = totals else {
            warn!("The totals are too large to include '{}'", s.name);
            unconverted.push(s.id.clone());
            continue;
        };
        yearly = new_yearly;
        monthly = new_monthly;
        lines.push(SummaryLine {
            id: s.id.clone(),
            name: s.name.clone(),
            monthly: round(per_month),
            yearly: round(converted),
            next_payment: s.next_payment(today),
        });
    }

    let summary = Summary {
        currency,
        monthly: round(monthly),
        yearly: round(yearly),
        lines,
        unconverted,
    };
    let message = format!(
        "{} subscription(s) cost {} {} per month and {} {} per year",
        summary.lines.len(),
        summary.monthly,
        summary.currency,
        summary.yearly,
        summary.currency
    );
    Ok(Out::new(message, summary))
}
