use crate::model::{currency_code, Collection, Settings};
use crate::repo::Repository;
use crate::sync::ChangeNotifier;
use crate::Result;

/// Holds the user's `Settings`.
#[derive(Debug)]
pub struct SettingsStore {
    repo: Repository,
    notifier: ChangeNotifier,
    settings: Settings,
    loaded: bool,
}

impl SettingsStore {
    pub fn new(repo: Repository, notifier: ChangeNotifier) -> Self {
        Self {
            repo,
            notifier,
            settings: Settings::default(),
            loaded: false,
        }
    }

    pub fn load(&mut self) {
        if !self.loaded {
            self.reload();
        }
    }

    pub fn reload(&mut self) {
        self.settings = self.repo.settings();
        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Applies `f` to a copy of the settings and persists the result. Nothing is written when `f`
    /// leaves the settings as they were.
    pub fn update(&mut self, f: impl FnOnce(&mut Settings)) -> Result<()> {
        self.load();
        let mut next = self.settings.clone();
        f(&mut next);
        if next == self.settings {
            return Ok(());
        }
        self.repo.save_settings(&next)?;
        self.settings = next;
        self.notifier.notify(Collection::Settings);
        Ok(())
    }

    /// Sets the currency totals are shown in. `code` must be a three-letter currency code.
    pub fn set_main_currency(&mut self, code: &str) -> Result<()> {
        let code = currency_code(code)?;
        self.update(|s| s.main_currency = code)
    }

    pub fn set_round_whole_numbers(&mut self, value: bool) -> Result<()> {
        self.update(|s| s.round_whole_numbers = value)
    }

    pub fn set_true_dark_colors(&mut self, value: bool) -> Result<()> {
        self.update(|s| s.true_dark_colors = value)
    }

    pub fn set_haptics_enabled(&mut self, value: bool) -> Result<()> {
        self.update(|s| s.haptics_enabled = value)
    }

    pub fn set_premium(&mut self, value: bool) -> Result<()> {
        self.update(|s| s.premium = value)
    }
}
