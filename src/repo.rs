//! Typed access to the persisted collections. Each collection is one JSON document under one fixed
//! key and is always read and written whole.
//!
//! Reads never fail: a document that is missing, unreadable or malformed is logged and treated as
//! an empty collection (or the default singleton). Writes return an error so that callers never
//! report a save that did not happen.

use crate::kv::KvStore;
use crate::model::{
    Category, CurrencyRates, Entity, List, PaymentMethod, ServiceTemplate, Settings, Singleton,
    Subscription,
};
use crate::Result;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{trace, warn};

/// Holds the record of the last successful backup transfer. Not part of any backup.
pub(crate) const SYNC_STATE: &str = "syncState";

#[derive(Debug, Clone)]
pub struct Repository {
    kv: Arc<dyn KvStore>,
}

impl Repository {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Reads the collection stored under `T::KEY`.
    pub fn collection<T: Entity>(&self) -> Vec<T> {
        self.read(T::KEY).unwrap_or_default()
    }

    /// Replaces the collection stored under `T::KEY` with `items`.
    pub fn save_collection<T: Entity>(&self, items: &[T]) -> Result<()> {
        self.write(T::KEY, items)
    }

    /// Reads a singleton, returning `None` if it was never written or cannot be parsed.
    pub fn stored<T: Singleton>(&self) -> Option<T> {
        self.read(T::KEY)
    }

    /// Reads a singleton, falling back to its default.
    pub fn singleton<T: Singleton>(&self) -> T {
        self.stored().unwrap_or_default()
    }

    pub fn save_singleton<T: Singleton>(&self, value: &T) -> Result<()> {
        self.write(T::KEY, value)
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.collection()
    }

    pub fn save_subscriptions(&self, value: &[Subscription]) -> Result<()> {
        self.save_collection(value)
    }

    pub fn categories(&self) -> Vec<Category> {
        self.collection()
    }

    pub fn save_categories(&self, value: &[Category]) -> Result<()> {
        self.save_collection(value)
    }

    pub fn lists(&self) -> Vec<List> {
        self.collection()
    }

    pub fn save_lists(&self, value: &[List]) -> Result<()> {
        self.save_collection(value)
    }

    pub fn payment_methods(&self) -> Vec<PaymentMethod> {
        self.collection()
    }

    pub fn save_payment_methods(&self, value: &[PaymentMethod]) -> Result<()> {
        self.save_collection(value)
    }

    /// User-created templates only; see `builtin_templates` for the bundled catalog.
    pub fn templates(&self) -> Vec<ServiceTemplate> {
        self.collection()
    }

    pub fn save_templates(&self, value: &[ServiceTemplate]) -> Result<()> {
        self.save_collection(value)
    }

    pub fn settings(&self) -> Settings {
        self.singleton()
    }

    pub fn stored_settings(&self) -> Option<Settings> {
        self.stored()
    }

    pub fn save_settings(&self, value: &Settings) -> Result<()> {
        self.save_singleton(value)
    }

    pub fn currency_rates(&self) -> CurrencyRates {
        self.singleton()
    }

    pub fn stored_currency_rates(&self) -> Option<CurrencyRates> {
        self.stored()
    }

    pub fn save_currency_rates(&self, value: &CurrencyRates) -> Result<()> {
        self.save_singleton(value)
    }

    pub(crate) fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.kv.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                trace!("Nothing stored under '{key}'");
                return None;
            }
            Err(e) => {
                warn!("Unable to read '{key}', treating it as empty: {e:#}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("The document stored under '{key}' is malformed, treating it as empty: {e}");
                None
            }
        }
    }

    pub(crate) fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .with_context(|| format!("Unable to serialize '{key}'"))?;
        self.kv
            .set(key, &json)
            .with_context(|| format!("Unable to save '{key}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn repo() -> (Arc<MemoryKv>, Repository) {
        let kv = Arc::new(MemoryKv::new());
        (kv.clone(), Repository::new(kv))
    }

    #[test]
    fn test_round_trip() {
        let (_, repo) = repo();
        let mut sub = Subscription::new(
            "Spotify",
            Decimal::new(1199, 2),
            "EUR",
            NaiveDate::from_ymd_opt(2023, 5, 4).unwrap(),
        );
        sub.id = "s1".to_string();
        sub.notes = Some("family plan".to_string());
        repo.save_subscriptions(&[sub.clone()]).unwrap();
        assert_eq!(repo.subscriptions(), vec![sub]);

        let mut category = Category::new("Music", "#1DB954");
        category.id = "c1".to_string();
        repo.save_categories(&[category.clone()]).unwrap();
        assert_eq!(repo.categories(), vec![category]);

        let settings = Settings {
            main_currency: "EUR".to_string(),
            premium: true,
            ..Settings::default()
        };
        repo.save_settings(&settings).unwrap();
        assert_eq!(repo.settings(), settings);
    }

    #[test]
    fn test_never_written_gives_defaults() {
        let (_, repo) = repo();
        assert!(repo.subscriptions().is_empty());
        assert!(repo.lists().is_empty());
        assert!(repo.payment_methods().is_empty());
        assert!(repo.templates().is_empty());
        assert_eq!(repo.settings(), Settings::default());
        assert!(repo.stored_settings().is_none());
        assert_eq!(repo.currency_rates(), CurrencyRates::default());
    }

    #[test]
    fn test_corrupted_gives_defaults() {
        let (kv, repo) = repo();
        kv.set("lists", "[{\"id\": ").unwrap();
        kv.set("settings", "not json").unwrap();
        kv.set("categories", r#"{"id": "wrong shape"}"#).unwrap();
        assert!(repo.lists().is_empty());
        assert!(repo.categories().is_empty());
        assert_eq!(repo.settings(), Settings::default());
    }

    #[test]
    fn test_write_failure_is_returned() {
        let (kv, repo) = repo();
        kv.fail_writes(true);
        let err = repo.save_lists(&[List::new("Work")]).unwrap_err();
        assert!(format!("{err:#}").contains("Unable to save 'lists'"));
    }
}
