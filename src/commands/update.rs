use crate::api::Mode;
use crate::args::{RenameArgs, UpdateCategoryArgs, UpdateSubscriptionArgs};
use crate::commands::add::{existing, is_hex_color, required_name};
use crate::commands::{Out, Session};
use crate::model::{
    checked_amount, currency_code, BillingCycle, Category, Entity, List, PaymentMethod,
    Subscription,
};
use crate::state::{AppState, CollectionStore};
use crate::{Config, Result};
use anyhow::{ensure, Context};

/// Changes the given fields of a subscription and saves the whole record.
pub async fn update_subscription(
    config: Config,
    mode: Mode,
    args: &UpdateSubscriptionArgs,
) -> Result<Out<Subscription>> {
    let mut session = Session::open(&config, mode).await?;
    let state = &session.state;
    let mut subscription = found(state.subscriptions(), args.id())?;

    if let Some(name) = args.name() {
        subscription.name = required_name(name)?;
    }
    if let Some(amount) = args.amount() {
        subscription.amount = checked_amount(amount)?;
    }
    if let Some(currency) = args.currency() {
        subscription.currency = currency_code(currency)?;
    }
    if args.every().is_some() || args.period().is_some() {
        let current = subscription.billing_cycle;
        subscription.billing_cycle = BillingCycle::new(
            args.every().unwrap_or(current.every),
            args.period().unwrap_or(current.period),
        );
    }
    if let Some(start_date) = args.start_date() {
        subscription.start_date = start_date;
    }
    if args.category().is_some() {
        subscription.category_id = existing(state.categories(), args.category())?;
    }
    if args.list().is_some() {
        subscription.list_id = existing(state.lists(), args.list())?;
    }
    if args.payment_method().is_some() {
        subscription.payment_method_id =
            existing(state.payment_methods(), args.payment_method())?;
    }
    if let Some(notes) = args.notes() {
        subscription.notes = Some(notes.trim().to_string()).filter(|n| !n.is_empty());
    }

    session
        .state
        .subscriptions_mut()
        .update(subscription.clone())?;
    session.close().await;
    Ok(Out::new(
        format!("Updated subscription '{}'", subscription.name),
        subscription,
    ))
}

pub async fn update_category(
    config: Config,
    mode: Mode,
    args: &UpdateCategoryArgs,
) -> Result<Out<Category>> {
    let color = match args.color().map(str::trim) {
        Some(color) => {
            ensure!(is_hex_color(color), "'{color}' is not a color like #E50914");
            Some(color.to_string())
        }
        None => None,
    };
    let name = args.name().map(required_name).transpose()?;
    update(config, mode, args.id(), AppState::categories_mut, |category| {
        if let Some(name) = name {
            category.name = name;
        }
        if let Some(color) = color {
            category.color = color;
        }
    })
    .await
}

pub async fn update_list(config: Config, mode: Mode, args: &RenameArgs) -> Result<Out<List>> {
    let name = required_name(args.name())?;
    update(config, mode, args.id(), AppState::lists_mut, |list| {
        list.name = name
    })
    .await
}

pub async fn update_payment_method(
    config: Config,
    mode: Mode,
    args: &RenameArgs,
) -> Result<Out<PaymentMethod>> {
    let name = required_name(args.name())?;
    update(config, mode, args.id(), AppState::payment_methods_mut, |method| {
        method.name = name
    })
    .await
}

async fn update<T: Entity>(
    config: Config,
    mode: Mode,
    id: &str,
    store: fn(&mut AppState) -> &mut CollectionStore<T>,
    change: impl FnOnce(&mut T),
) -> Result<Out<T>> {
    let mut session = Session::open(&config, mode).await?;
    let store = store(&mut session.state);
    let mut item = found(store, id)?;
    change(&mut item);
    store.update(item.clone())?;
    session.close().await;
    Ok(Out::new(format!("Updated {} {id}", T::NAME), item))
}

fn found<T: Entity>(store: &CollectionStore<T>, id: &str) -> Result<T> {
    store
        .get(id)
        .cloned()
        .with_context(|| format!("There is no {} with id '{id}'", T::NAME))
}
