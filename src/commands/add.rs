use crate::api::Mode;
use crate::args::{AddCategoryArgs, AddSubscriptionArgs, AddTemplateArgs, NameArgs};
use crate::commands::{Out, Session};
use crate::model::{
    checked_amount, currency_code, BillingCycle, Category, Entity, List, PaymentMethod, ServiceTemplate,
    Subscription,
};
use crate::state::{AppState, CollectionStore};
use crate::{Config, Result};
use anyhow::{bail, ensure, Context};
use chrono::Local;

pub async fn add_subscription(
    config: Config,
    mode: Mode,
    args: &AddSubscriptionArgs,
) -> Result<Out<Subscription>> {
    let mut session = Session::open(&config, mode).await?;
    let subscription = new_subscription(&session.state, args)?;
    let added = session
        .state
        .subscriptions_mut()
        .add(subscription)?
        .clone();
    session.close().await;
    Ok(Out::new(
        format!("Added subscription '{}' with id {}", added.name, added.id),
        added,
    ))
}

pub async fn add_category(
    config: Config,
    mode: Mode,
    args: &AddCategoryArgs,
) -> Result<Out<Category>> {
    let color = args.color().trim();
    ensure!(is_hex_color(color), "'{color}' is not a color like #E50914");
    let category = Category::new(required_name(args.name())?, color);
    add(config, mode, category, AppState::categories_mut).await
}

pub async fn add_list(config: Config, mode: Mode, args: &NameArgs) -> Result<Out<List>> {
    let list = List::new(required_name(args.name())?);
    add(config, mode, list, AppState::lists_mut).await
}

pub async fn add_payment_method(
    config: Config,
    mode: Mode,
    args: &NameArgs,
) -> Result<Out<PaymentMethod>> {
    let method = PaymentMethod::new(required_name(args.name())?);
    add(config, mode, method, AppState::payment_methods_mut).await
}

pub async fn add_template(
    config: Config,
    mode: Mode,
    args: &AddTemplateArgs,
) -> Result<Out<ServiceTemplate>> {
    let template = ServiceTemplate::new(required_name(args.name())?, args.icon_key().trim());
    add(config, mode, template, AppState::templates_mut).await
}

async fn add<T: Entity>(
    config: Config,
    mode: Mode,
    item: T,
    store: fn(&mut AppState) -> &mut CollectionStore<T>,
) -> Result<Out<T>> {
    let mut session = Session::open(&config, mode).await?;
    let added = store(&mut session.state).add(item)?.clone();
    session.close().await;
    Ok(Out::new(
        format!("Added {} with id {}", T::NAME, added.id()),
        added,
    ))
}

fn new_subscription(state: &AppState, args: &AddSubscriptionArgs) -> Result<Subscription> {
    let template = match args.template() {
        Some(id) => Some(
            state
                .template(id)
                .with_context(|| format!("There is no template with id '{id}'"))?,
        ),
        None => None,
    };
    let name = match (args.name(), &template) {
        (Some(name), _) => required_name(name)?,
        (None, Some(template)) => template.name.clone(),
        (None, None) => bail!("A subscription needs a name or a --template"),
    };
    let amount = checked_amount(args.amount())?;
    let currency = currency_code(
        args.currency()
            .unwrap_or(&state.settings().get().main_currency),
    )?;
    let start_date = args
        .start_date()
        .unwrap_or_else(|| Local::now().date_naive());

    let mut subscription = Subscription::new(name, amount, currency, start_date);
    subscription.billing_cycle = BillingCycle::new(args.every(), args.period());
    subscription.template_id = template.map(|t| t.id);
    subscription.category_id = existing(state.categories(), args.category())?;
    subscription.list_id = existing(state.lists(), args.list())?;
    subscription.payment_method_id = existing(state.payment_methods(), args.payment_method())?;
    subscription.notes = args.notes().map(str::to_string);
    Ok(subscription)
}

/// Trims `name` and rejects it if nothing is left.
pub(super) fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    ensure!(!name.is_empty(), "The name must not be empty");
    Ok(name.to_string())
}

/// Checks that `id`, if given, names a record in `store`. An empty id means no reference.
pub(super) fn existing<T: Entity>(
    store: &CollectionStore<T>,
    id: Option<&str>,
) -> Result<Option<String>> {
    match id.map(str::trim) {
        None | Some("") => Ok(None),
        Some(id) => {
            ensure!(
                store.get(id).is_some(),
                "There is no {} with id '{id}'",
                T::NAME
            );
            Ok(Some(id.to_string()))
        }
    }
}

pub(super) fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Period;
    use crate::test::TestEnv;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::path::Path;

    #[tokio::test]
    async fn test_add_subscription_uploads_backup() {
        let env = TestEnv::new().await;
        let config = env.config();
        let category = add_category(
            config.clone(),
            Mode::Test,
            &AddCategoryArgs::new("Video", "#E50914"),
        )
        .await
        .unwrap();
        let category_id = category.structure().unwrap().id.clone();

        let args = AddSubscriptionArgs::new(None, Decimal::new(1549, 2))
            .with_template("builtin-netflix")
            .with_category(&category_id)
            .with_cycle(1, Period::Month)
            .with_start_date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        let out = add_subscription(config.clone(), Mode::Test, &args)
            .await
            .unwrap();
        let added = out.structure().unwrap();
        assert_eq!(added.name, "Netflix");
        assert_eq!(added.currency, "USD");
        assert_eq!(added.category_id.as_deref(), Some(category_id.as_str()));
        assert_eq!(env.repository().subscriptions(), vec![added.clone()]);

        let backup = env
            .home()
            .join(".test-remote")
            .join(Path::new("Backups/subtrack-backup.json"));
        let json = std::fs::read_to_string(backup).unwrap();
        assert!(json.contains("Netflix"));
    }

    #[tokio::test]
    async fn test_add_subscription_validates() {
        let env = TestEnv::new().await;
        let config = env.config();
        let bad = [
            AddSubscriptionArgs::new(None, Decimal::ONE),
            AddSubscriptionArgs::new(Some("  ".to_string()), Decimal::ONE),
            AddSubscriptionArgs::new(Some("Gym".to_string()), Decimal::NEGATIVE_ONE),
            AddSubscriptionArgs::new(Some("Gym".to_string()), Decimal::MAX),
            AddSubscriptionArgs::new(Some("Gym".to_string()), Decimal::ONE).with_currency("EURO"),
            AddSubscriptionArgs::new(Some("Gym".to_string()), Decimal::ONE).with_category("nope"),
            AddSubscriptionArgs::new(None, Decimal::ONE).with_template("nope"),
        ];
        for args in &bad {
            assert!(
                add_subscription(config.clone(), Mode::Test, args)
                    .await
                    .is_err(),
                "{args:?}"
            );
        }
        assert!(env.repository().subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_add_named_records() {
        let env = TestEnv::new().await;
        let config = env.config();
        add_list(config.clone(), Mode::Test, &NameArgs::new("Family"))
            .await
            .unwrap();
        add_payment_method(config.clone(), Mode::Test, &NameArgs::new(" Visa "))
            .await
            .unwrap();
        add_template(
            config.clone(),
            Mode::Test,
            &AddTemplateArgs::new("Local Gym", "gym"),
        )
        .await
        .unwrap();
        assert!(add_category(config, Mode::Test, &AddCategoryArgs::new("Bad", "red"))
            .await
            .is_err());

        let repo = env.repository();
        assert_eq!(repo.lists()[0].name, "Family");
        assert_eq!(repo.payment_methods()[0].name, "Visa");
        assert_eq!(repo.templates()[0].icon_key, "gym");
        assert!(repo.categories().is_empty());
    }

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#E50914"));
        assert!(is_hex_color("#fff"));
        assert!(!is_hex_color("E50914"));
        assert!(!is_hex_color("#E5091"));
        assert!(!is_hex_color("#GGGGGG"));
    }
}
