//! Types that represent the core data model, such as `Subscription` and `Settings`.

/// Implements `Entity` for a struct with a `pub id: String` field.
macro_rules! entity {
    ($t:ty, $collection:ident, $name:expr) => {
        impl $crate::model::Entity for $t {
            const COLLECTION: $crate::model::Collection = $crate::model::Collection::$collection;
            const NAME: &'static str = $name;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }
        }
    };
}

pub(crate) use entity;

mod category;
mod list;
mod payment_method;
mod rates;
mod settings;
mod subscription;
mod template;

pub use category::Category;
pub use list::List;
pub use payment_method::PaymentMethod;
pub use rates::{currency_code, CurrencyRates, RateResponse};
pub use settings::Settings;
pub use subscription::{checked_amount, BillingCycle, Period, Subscription, MAX_AMOUNT};
pub use template::{builtin_templates, ServiceTemplate};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A record that lives in a collection persisted as one JSON array under `KEY`.
pub trait Entity: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    const COLLECTION: Collection;

    /// The storage key of the collection.
    const KEY: &'static str = Self::COLLECTION.key();

    /// A human-readable name for messages, e.g. "payment method".
    const NAME: &'static str;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);
}

/// A collection with exactly one logical record per installation. Absence at read time means the
/// `Default` value.
pub trait Singleton: Serialize + DeserializeOwned + Clone + Debug + Default + Send + Sync {
    const COLLECTION: Collection;

    const KEY: &'static str = Self::COLLECTION.key();
}

/// Names every persisted collection.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Subscriptions,
    Categories,
    Lists,
    PaymentMethods,
    Templates,
    Settings,
    CurrencyRates,
}

serde_plain::derive_display_from_serialize!(Collection);

impl Collection {
    /// The fixed storage key of the collection.
    pub const fn key(self) -> &'static str {
        match self {
            Collection::Subscriptions => "subscriptions",
            Collection::Categories => "categories",
            Collection::Lists => "lists",
            Collection::PaymentMethods => "paymentMethods",
            Collection::Templates => "templates",
            Collection::Settings => "settings",
            Collection::CurrencyRates => "currencyRates",
        }
    }

    /// Whether the collection is user data carried in a cloud backup. Templates and currency
    /// rates are reference data and are left out.
    pub fn is_backed_up(self) -> bool {
        !matches!(self, Collection::Templates | Collection::CurrencyRates)
    }
}
