//! Command handlers for the subtrack CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod add;
mod init;
mod rates;
mod remove;
mod settings;
mod show;
mod summary;
mod sync;
mod update;

use crate::api::{self, Mode};
use crate::state::AppState;
use crate::sync::{AutoSync, BackupSync, ChangeNotifier, LogHooks};
use crate::{Config, Result};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

pub use add::{add_category, add_list, add_payment_method, add_subscription, add_template};
pub use init::init;
pub use rates::rates_refresh;
pub use remove::remove;
pub use settings::settings;
pub use show::{show, Shown};
pub use summary::{summary, Summary, SummaryLine};
pub use sync::{sync_down, sync_status, sync_up};
pub use update::{update_category, update_list, update_payment_method, update_subscription};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Loaded app state for a command that modifies data, with auto-sync attached when the config
/// enables it. Call `close` when done so that a pending upload is flushed.
struct Session {
    state: AppState,
    auto: Option<AutoSync>,
}

impl Session {
    async fn open(config: &Config, mode: Mode) -> Result<Self> {
        let repo = config.repository()?;
        let (auto, notifier) = if config.auto_sync() {
            let drive = api::drive(config, mode).await?;
            let sync = BackupSync::from_config(config, repo.clone(), drive);
            let (auto, notifier) =
                AutoSync::spawn(Arc::new(sync), Arc::new(LogHooks), config.sync_delay(), true);
            (Some(auto), notifier)
        } else {
            (None, ChangeNotifier::disconnected())
        };
        let mut state = AppState::create(repo, notifier);
        state.load();
        Ok(Self { state, auto })
    }

    async fn close(self) {
        if let Some(auto) = self.auto {
            auto.flush().await;
        }
    }

    /// Closes the session, then returns `result`. Changes persisted before a failure are still
    /// uploaded.
    async fn finish<T>(self, result: Result<T>) -> Result<T> {
        self.close().await;
        result
    }
}

/// Loaded app state for a command that only reads.
fn read_state(config: &Config) -> Result<AppState> {
    let mut state = AppState::create(config.repository()?, ChangeNotifier::disconnected());
    state.load();
    Ok(state)
}
