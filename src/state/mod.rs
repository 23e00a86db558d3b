//! In-memory state of the app, loaded from the repository and written back through it.
//!
//! `AppState` is created once with a `Repository` and a `ChangeNotifier`, loaded, and then handed
//! to whatever needs the data. Changes to backed-up collections are reported to the notifier so
//! that auto-sync can pick them up.

mod collection;
mod rates;
mod settings;

pub use collection::CollectionStore;
pub use rates::{RatesStore, RefreshOutcome};
pub use settings::SettingsStore;

use crate::model::{
    builtin_templates, Category, List, PaymentMethod, ServiceTemplate, Subscription,
};
use crate::repo::Repository;
use crate::sync::ChangeNotifier;
use tracing::debug;

#[derive(Debug)]
pub struct AppState {
    subscriptions: CollectionStore<Subscription>,
    categories: CollectionStore<Category>,
    lists: CollectionStore<List>,
    payment_methods: CollectionStore<PaymentMethod>,
    templates: CollectionStore<ServiceTemplate>,
    settings: SettingsStore,
    rates: RatesStore,
}

impl AppState {
    /// Creates the stores. Nothing is read until `load`.
    pub fn create(repo: Repository, notifier: ChangeNotifier) -> Self {
        Self {
            subscriptions: CollectionStore::new(repo.clone(), notifier.clone()),
            categories: CollectionStore::new(repo.clone(), notifier.clone()),
            lists: CollectionStore::new(repo.clone(), notifier.clone()),
            payment_methods: CollectionStore::new(repo.clone(), notifier.clone()),
            templates: CollectionStore::new(repo.clone(), notifier.clone()),
            settings: SettingsStore::new(repo.clone(), notifier),
            rates: RatesStore::new(repo),
        }
    }

    /// Loads every store that is not loaded yet.
    pub fn load(&mut self) {
        self.subscriptions.load();
        self.categories.load();
        self.lists.load();
        self.payment_methods.load();
        self.templates.load();
        self.settings.load();
        self.rates.load();
        debug!("App state loaded");
    }

    /// Re-reads every store, e.g. after a restore replaced the stored data.
    pub fn reload(&mut self) {
        self.subscriptions.reload();
        self.categories.reload();
        self.lists.reload();
        self.payment_methods.reload();
        self.templates.reload();
        self.settings.reload();
        // Rates are reference data and a restore never touches them.
        self.rates.load();
    }

    pub fn is_ready(&self) -> bool {
        self.subscriptions.is_loaded()
            && self.categories.is_loaded()
            && self.lists.is_loaded()
            && self.payment_methods.is_loaded()
            && self.templates.is_loaded()
            && self.settings.is_loaded()
            && self.rates.is_loaded()
    }

    pub fn subscriptions(&self) -> &CollectionStore<Subscription> {
        &self.subscriptions
    }

    pub fn subscriptions_mut(&mut self) -> &mut CollectionStore<Subscription> {
        &mut self.subscriptions
    }

    pub fn categories(&self) -> &CollectionStore<Category> {
        &self.categories
    }

    pub fn categories_mut(&mut self) -> &mut CollectionStore<Category> {
        &mut self.categories
    }

    pub fn lists(&self) -> &CollectionStore<List> {
        &self.lists
    }

    pub fn lists_mut(&mut self) -> &mut CollectionStore<List> {
        &mut self.lists
    }

    pub fn payment_methods(&self) -> &CollectionStore<PaymentMethod> {
        &self.payment_methods
    }

    pub fn payment_methods_mut(&mut self) -> &mut CollectionStore<PaymentMethod> {
        &mut self.payment_methods
    }

    /// User-created templates. See `template_catalog` for these together with the bundled ones.
    pub fn templates(&self) -> &CollectionStore<ServiceTemplate> {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut CollectionStore<ServiceTemplate> {
        &mut self.templates
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsStore {
        &mut self.settings
    }

    pub fn rates(&self) -> &RatesStore {
        &self.rates
    }

    pub fn rates_mut(&mut self) -> &mut RatesStore {
        &mut self.rates
    }

    /// The bundled templates followed by the user's own.
    pub fn template_catalog(&self) -> Vec<ServiceTemplate> {
        let mut catalog = builtin_templates();
        catalog.extend(self.templates.all().iter().cloned());
        catalog
    }

    /// Finds a template by id in the bundled and user-created templates.
    pub fn template(&self, id: &str) -> Option<ServiceTemplate> {
        builtin_templates()
            .into_iter()
            .find(|t| t.id == id)
            .or_else(|| self.templates.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;
    use crate::sync::{AutoSync, UploadOutcome, Uploader};
    use crate::Result;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingUploader(AtomicUsize);

    #[async_trait::async_trait]
    impl Uploader for CountingUploader {
        async fn is_available(&self) -> bool {
            true
        }

        async fn upload(&self) -> Result<UploadOutcome> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(UploadOutcome {
                path: String::new(),
                digest: String::new(),
                created_at: Utc::now(),
            })
        }
    }

    fn state() -> (Repository, AppState) {
        let repo = Repository::new(Arc::new(MemoryKv::new()));
        let state = AppState::create(repo.clone(), ChangeNotifier::disconnected());
        (repo, state)
    }

    #[test]
    fn test_create_load_ready() {
        let (_, mut state) = state();
        assert!(!state.is_ready());
        state.load();
        assert!(state.is_ready());
        assert_eq!(state.settings().get().main_currency, "USD");
        assert!(state.rates().get().rate("EUR").is_some());
    }

    #[test]
    fn test_reload_sees_restored_data() {
        let (repo, mut state) = state();
        state.load();
        let mut list = List::new("Family");
        list.id = "l1".to_string();
        repo.save_lists(&[list]).unwrap();
        assert!(state.lists().is_empty());
        state.reload();
        assert_eq!(state.lists().len(), 1);
    }

    #[test]
    fn test_template_catalog() {
        let (_, mut state) = state();
        state.load();
        let builtin = builtin_templates().len();
        let id = state
            .templates_mut()
            .add(ServiceTemplate::new("Local Gym", "gym"))
            .unwrap()
            .id
            .clone();
        let catalog = state.template_catalog();
        assert_eq!(catalog.len(), builtin + 1);
        assert_eq!(state.template(&id).unwrap().name, "Local Gym");
        assert_eq!(state.template("builtin-netflix").unwrap().name, "Netflix");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutations_notify_auto_sync() {
        let uploader = Arc::new(CountingUploader::default());
        let (auto, notifier) = AutoSync::spawn(
            uploader.clone(),
            Arc::new(crate::sync::LogHooks),
            Duration::from_millis(100),
            true,
        );
        let repo = Repository::new(Arc::new(MemoryKv::new()));
        let mut state = AppState::create(repo, notifier);
        state.load();

        // Templates are reference data.
        state
            .templates_mut()
            .add(ServiceTemplate::new("Local Gym", "gym"))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(uploader.0.load(Ordering::SeqCst), 0);

        state
            .subscriptions_mut()
            .add(Subscription::new(
                "Netflix",
                Decimal::new(1549, 2),
                "USD",
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            ))
            .unwrap();
        state.settings_mut().set_premium(true).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(uploader.0.load(Ordering::SeqCst), 1);
        auto.shutdown().await;
    }
}
