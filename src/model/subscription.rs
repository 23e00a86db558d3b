use crate::model::entity;
use crate::Result;
use anyhow::ensure;
use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Upper bound on the number of billing periods walked when looking for the next payment.
const MAX_PERIODS: u32 = 100_000;

/// The largest amount a single billing cycle may charge.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Checks that `amount` is a chargeable amount: not negative and at most `MAX_AMOUNT`.
pub fn checked_amount(amount: Decimal) -> Result<Decimal> {
    ensure!(!amount.is_sign_negative(), "The amount must not be negative");
    ensure!(
        amount <= MAX_AMOUNT,
        "The amount must not be greater than {MAX_AMOUNT}"
    );
    Ok(amount)
}

/// A recurring payment the user tracks. References to categories, lists, payment methods and
/// templates are plain ids; nothing enforces that the referenced record exists.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub name: String,
    /// The amount charged each billing cycle, in `currency`.
    pub amount: Decimal,
    /// An ISO 4217 code such as `EUR`.
    pub currency: String,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// The date of the first payment.
    pub start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

entity!(Subscription, Subscriptions, "subscription");

impl Subscription {
    /// Creates a monthly subscription without an id or any references.
    pub fn new(
        name: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            amount,
            currency: currency.into(),
            billing_cycle: BillingCycle::default(),
            category_id: None,
            list_id: None,
            payment_method_id: None,
            template_id: None,
            start_date,
            notes: None,
        }
    }

    /// The amount spent per year, in the subscription's own currency. Returns `None` if the
    /// amount is too large to compute with.
    pub fn yearly_cost(&self) -> Option<Decimal> {
        self.amount.checked_mul(self.billing_cycle.per_year()?)
    }

    /// The average amount spent per month, in the subscription's own currency.
    pub fn monthly_cost(&self) -> Option<Decimal> {
        self.yearly_cost()?.checked_div(Decimal::from(12))
    }

    /// The first payment date strictly after `after`. Returns `None` if the date cannot be
    /// represented.
    pub fn next_payment(&self, after: NaiveDate) -> Option<NaiveDate> {
        if self.start_date > after {
            return Some(self.start_date);
        }
        (1..MAX_PERIODS)
            .map_while(|n| self.billing_cycle.nth(self.start_date, n))
            .find(|date| *date > after)
    }
}

/// The unit of a billing cycle.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

serde_plain::derive_display_from_serialize!(Period);
serde_plain::derive_fromstr_from_deserialize!(Period);

/// Billed once every `every` `period`s, e.g. every 3 months.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingCycle {
    pub every: u32,
    pub period: Period,
}

impl Default for BillingCycle {
    fn default() -> Self {
        Self {
            every: 1,
            period: Period::Month,
        }
    }
}

impl BillingCycle {
    pub fn new(every: u32, period: Period) -> Self {
        Self {
            every: every.max(1),
            period,
        }
    }

    /// A zero interval in stored data is treated as one.
    fn every(&self) -> u32 {
        self.every.max(1)
    }

    /// How many payments happen in a year.
    pub fn per_year(&self) -> Option<Decimal> {
        let per_year = match self.period {
            Period::Day => 365,
            Period::Week => 52,
            Period::Month => 12,
            Period::Year => 1,
        };
        Decimal::from(per_year).checked_div(Decimal::from(self.every()))
    }

    /// The date of payment number `n` (zero-based) for a subscription starting on `start`.
    /// Months are counted from the start date so that a payment on the 31st returns to the 31st
    /// after a short month.
    fn nth(&self, start: NaiveDate, n: u32) -> Option<NaiveDate> {
        let steps = n.checked_mul(self.every())?;
        match self.period {
            Period::Day => start.checked_add_days(Days::new(u64::from(steps))),
            Period::Week => start.checked_add_days(Days::new(u64::from(steps) * 7)),
            Period::Month => start.checked_add_months(Months::new(steps)),
            Period::Year => start.checked_add_months(Months::new(steps.checked_mul(12)?)),
        }
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.every() == 1 {
            write!(f, "every {}", self.period)
        } else {
            write!(f, "every {} {}s", self.every(), self.period)
        }
    }
}
