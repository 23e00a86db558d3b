use crate::args::{ShowArgs, ShowTarget};
use crate::commands::{read_state, Out};
use crate::model::{
    Category, CurrencyRates, List, PaymentMethod, ServiceTemplate, Settings, Subscription,
};
use crate::{Config, Result};
use chrono::Local;
use serde::Serialize;
use std::fmt::Write;

/// The records printed by `show`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Shown {
    Subscriptions(Vec<Subscription>),
    Categories(Vec<Category>),
    Lists(Vec<List>),
    PaymentMethods(Vec<PaymentMethod>),
    Templates(Vec<ServiceTemplate>),
    Settings(Settings),
    Rates(CurrencyRates),
}

pub async fn show(config: Config, args: &ShowArgs) -> Result<Out<Shown>> {
    let state = read_state(&config)?;
    let target = args.target();
    let mut message = String::new();
    let shown = match target {
        ShowTarget::Subscriptions => {
            let today = Local::now().date_naive();
            for s in state.subscriptions().all() {
                let next = s
                    .next_payment(today)
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let _ = writeln!(
                    message,
                    "{} ({}): {} {} {}, next payment {next}",
                    s.name, s.id, s.amount, s.currency, s.billing_cycle
                );
            }
            Shown::Subscriptions(state.subscriptions().all().to_vec())
        }
        ShowTarget::Categories => {
            for c in state.categories().all() {
                let _ = writeln!(message, "{} ({}): {}", c.name, c.id, c.color);
            }
            Shown::Categories(state.categories().all().to_vec())
        }
        ShowTarget::Lists => {
            for l in state.lists().all() {
                let _ = writeln!(message, "{} ({})", l.name, l.id);
            }
            Shown::Lists(state.lists().all().to_vec())
        }
        ShowTarget::PaymentMethods => {
            for p in state.payment_methods().all() {
                let _ = writeln!(message, "{} ({})", p.name, p.id);
            }
            Shown::PaymentMethods(state.payment_methods().all().to_vec())
        }
        ShowTarget::Templates => {
            let catalog = state.template_catalog();
            for t in &catalog {
                let _ = writeln!(message, "{} ({}): icon {}", t.name, t.id, t.icon_key);
            }
            Shown::Templates(catalog)
        }
        ShowTarget::Settings => {
            let settings = state.settings().get().clone();
            let _ = writeln!(message, "main currency: {}", settings.main_currency);
            let _ = writeln!(message, "round whole numbers: {}", settings.round_whole_numbers);
            let _ = writeln!(message, "true dark colors: {}", settings.true_dark_colors);
            let _ = writeln!(message, "haptics enabled: {}", settings.haptics_enabled);
            let _ = writeln!(message, "premium: {}", settings.premium);
            Shown::Settings(settings)
        }
        ShowTarget::Rates => {
            let rates = state.rates().get().clone();
            let _ = writeln!(message, "1 {} as of {}:", rates.base, rates.updated_at);
            for (code, rate) in &rates.rates {
                let _ = writeln!(message, "  {code} {rate}");
            }
            Shown::Rates(rates)
        }
    };
    if message.is_empty() {
        message = format!("There are no {target}");
    }
    Ok(Out::new(message.trim_end(), shown))
}
