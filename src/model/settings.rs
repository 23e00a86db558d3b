use crate::model::{Collection, Singleton};
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_CURRENCY: &str = "USD";

/// Per-installation user preferences. Missing fields take their default when parsed so that a
/// document written by an older version still loads.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// The currency totals are converted into, e.g. `USD`.
    pub main_currency: String,
    pub round_whole_numbers: bool,
    pub true_dark_colors: bool,
    pub haptics_enabled: bool,
    pub premium: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            main_currency: DEFAULT_CURRENCY.to_string(),
            round_whole_numbers: false,
            true_dark_colors: false,
            haptics_enabled: true,
            premium: false,
        }
    }
}

impl Singleton for Settings {
    const COLLECTION: Collection = Collection::Settings;
}
