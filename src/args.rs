//! These structs provide the CLI interface for the subtrack CLI.

use crate::model::Period;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// subtrack: Keep track of what your subscriptions cost.
///
/// Subscriptions, categories, lists, payment methods and settings are kept in a local store
/// under the subtrack home directory. They are backed up as one document to a directory that
/// your operating system mirrors to the cloud, such as an iCloud Drive folder, and can be
/// restored from there on another device.
///
/// Changes are uploaded automatically after every command that modifies data unless auto_sync is
/// turned off in config.json.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration file.
    ///
    /// This is the first command you should run. Pass --remote-dir with the cloud-mirrored
    /// directory that backups should go to, e.g. a folder in iCloud Drive. Without it,
    /// $SUBTRACK_HOME/remote is used, which is only useful if you mirror that directory yourself.
    Init(InitArgs),
    /// Upload local data to the backup, restore local data from it, or compare the two.
    Sync(SyncArgs),
    /// Add a subscription, category, list, payment method or service template.
    Add(AddArgs),
    /// Change fields of an existing subscription, category, list or payment method.
    Update(UpdateArgs),
    /// Remove a record by id.
    Remove(RemoveArgs),
    /// Print the stored records of one kind.
    Show(ShowArgs),
    /// Change settings. Without flags the current settings are printed.
    Settings(SettingsArgs),
    /// Work with currency exchange rates.
    Rates(RatesArgs),
    /// Show what all subscriptions cost per month and per year in the main currency.
    Summary,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber EnvFilter documentation.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where subtrack data and configuration is held. Defaults to ~/subtrack
    #[arg(long, env = "SUBTRACK_HOME", default_value_t = default_subtrack_home())]
    subtrack_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, subtrack_home: PathBuf) -> Self {
        Self {
            log_level,
            subtrack_home: subtrack_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn subtrack_home(&self) -> &DisplayPath {
        &self.subtrack_home
    }
}

/// Args for the `subtrack init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The cloud-mirrored directory to keep the backup in. A relative path is taken relative to
    /// the subtrack home directory.
    #[arg(long)]
    remote_dir: Option<PathBuf>,
}

impl InitArgs {
    pub fn new(remote_dir: Option<PathBuf>) -> Self {
        Self { remote_dir }
    }

    pub fn remote_dir(&self) -> Option<&Path> {
        self.remote_dir.as_deref()
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// Replace the backup with local data.
    Up,
    /// Replace local data with the backup.
    Down,
    /// Compare local data with the backup.
    #[default]
    Status,
}

serde_plain::derive_display_from_serialize!(SyncAction);
serde_plain::derive_fromstr_from_deserialize!(SyncAction);

/// Args for the `subtrack sync` command.
#[derive(Debug, Parser, Clone)]
pub struct SyncArgs {
    /// What to do: "up", "down" or "status"
    action: SyncAction,
}

impl SyncArgs {
    pub fn new(action: SyncAction) -> Self {
        Self { action }
    }

    pub fn action(&self) -> SyncAction {
        self.action
    }
}

/// Args for the `subtrack add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    #[command(subcommand)]
    entity: AddSubcommand,
}

impl AddArgs {
    pub fn new(entity: AddSubcommand) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> &AddSubcommand {
        &self.entity
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum AddSubcommand {
    /// Add a subscription.
    Subscription(AddSubscriptionArgs),
    /// Add a category.
    Category(AddCategoryArgs),
    /// Add a list.
    List(NameArgs),
    /// Add a payment method.
    PaymentMethod(NameArgs),
    /// Add a service template of your own next to the bundled ones.
    Template(AddTemplateArgs),
}

/// Args for `subtrack add subscription`.
#[derive(Debug, Parser, Clone)]
pub struct AddSubscriptionArgs {
    /// The name of the service, e.g. "Netflix". When --template is given this may be omitted
    /// and the template's name is used.
    name: Option<String>,

    /// The amount of each payment, e.g. 15.49
    #[arg(long)]
    amount: Decimal,

    /// The currency of the amount. Defaults to the main currency from settings.
    #[arg(long)]
    currency: Option<String>,

    /// Billed once every this many periods.
    #[arg(long, default_value_t = 1)]
    every: u32,

    /// The billing period.
    #[arg(long, value_enum, default_value_t = Period::Month)]
    period: Period,

    /// The date of the first payment, YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// The id of the subscription's category.
    #[arg(long)]
    category: Option<String>,

    /// The id of the list the subscription belongs to.
    #[arg(long)]
    list: Option<String>,

    /// The id of the payment method.
    #[arg(long)]
    payment_method: Option<String>,

    /// The id of the service template, bundled or your own.
    #[arg(long)]
    template: Option<String>,

    #[arg(long)]
    notes: Option<String>,
}

impl AddSubscriptionArgs {
    pub fn new(name: Option<String>, amount: Decimal) -> Self {
        Self {
            name,
            amount,
            currency: None,
            every: 1,
            period: Period::Month,
            start_date: None,
            category: None,
            list: None,
            payment_method: None,
            template: None,
            notes: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_cycle(mut self, every: u32, period: Period) -> Self {
        self.every = every;
        self.period = period;
        self
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn with_category(mut self, id: impl Into<String>) -> Self {
        self.category = Some(id.into());
        self
    }

    pub fn with_template(mut self, id: impl Into<String>) -> Self {
        self.template = Some(id.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn every(&self) -> u32 {
        self.every
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn list(&self) -> Option<&str> {
        self.list.as_deref()
    }

    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method.as_deref()
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

/// Args for `subtrack add category`.
#[derive(Debug, Parser, Clone)]
pub struct AddCategoryArgs {
    name: String,

    /// A hex color such as #E50914
    #[arg(long, default_value = "#8E8E93")]
    color: String,
}

impl AddCategoryArgs {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}

/// Args for records that only have a name.
#[derive(Debug, Parser, Clone)]
pub struct NameArgs {
    name: String,
}

impl NameArgs {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Args for `subtrack add template`.
#[derive(Debug, Parser, Clone)]
pub struct AddTemplateArgs {
    name: String,

    /// The key of the icon to show for the service.
    #[arg(long, default_value = "generic")]
    icon_key: String,
}

impl AddTemplateArgs {
    pub fn new(name: impl Into<String>, icon_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon_key: icon_key.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn icon_key(&self) -> &str {
        &self.icon_key
    }
}

/// Args for the `subtrack update` command.
#[derive(Debug, Parser, Clone)]
pub struct UpdateArgs {
    #[command(subcommand)]
    entity: UpdateSubcommand,
}

impl UpdateArgs {
    pub fn new(entity: UpdateSubcommand) -> Self {
        Self { entity }
    }

    pub fn entity(&self) -> &UpdateSubcommand {
        &self.entity
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum UpdateSubcommand {
    /// Change fields of a subscription. Fields that are not given keep their value.
    Subscription(UpdateSubscriptionArgs),
    /// Change the name or color of a category.
    Category(UpdateCategoryArgs),
    /// Rename a list.
    List(RenameArgs),
    /// Rename a payment method.
    PaymentMethod(RenameArgs),
}

/// Args for `subtrack update subscription`.
#[derive(Debug, Parser, Clone, Default)]
pub struct UpdateSubscriptionArgs {
    id: String,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    amount: Option<Decimal>,

    #[arg(long)]
    currency: Option<String>,

    #[arg(long)]
    every: Option<u32>,

    #[arg(long, value_enum)]
    period: Option<Period>,

    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// The id of the category, or "" to clear it.
    #[arg(long)]
    category: Option<String>,

    /// The id of the list, or "" to clear it.
    #[arg(long)]
    list: Option<String>,

    /// The id of the payment method, or "" to clear it.
    #[arg(long)]
    payment_method: Option<String>,

    /// Notes, or "" to clear them.
    #[arg(long)]
    notes: Option<String>,
}

impl UpdateSubscriptionArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_cycle(mut self, every: u32, period: Period) -> Self {
        self.every = Some(every);
        self.period = Some(period);
        self
    }

    pub fn with_category(mut self, id: impl Into<String>) -> Self {
        self.category = Some(id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.amount
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn every(&self) -> Option<u32> {
        self.every
    }

    pub fn period(&self) -> Option<Period> {
        self.period
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn list(&self) -> Option<&str> {
        self.list.as_deref()
    }

    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

/// Args for `subtrack update category`.
#[derive(Debug, Parser, Clone)]
pub struct UpdateCategoryArgs {
    id: String,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    color: Option<String>,
}

impl UpdateCategoryArgs {
    pub fn new(id: impl Into<String>, name: Option<String>, color: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
            color,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }
}

/// Args for renaming a record.
#[derive(Debug, Parser, Clone)]
pub struct RenameArgs {
    id: String,

    #[arg(long)]
    name: String,
}

impl RenameArgs {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The kinds of record that can be removed.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Subscription,
    Category,
    List,
    PaymentMethod,
    Template,
}

serde_plain::derive_display_from_serialize!(EntityKind);

/// Args for the `subtrack remove` command.
#[derive(Debug, Parser, Clone)]
pub struct RemoveArgs {
    #[arg(value_enum)]
    entity: EntityKind,

    id: String,
}

impl RemoveArgs {
    pub fn new(entity: EntityKind, id: impl Into<String>) -> Self {
        Self {
            entity,
            id: id.into(),
        }
    }

    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// What `subtrack show` prints.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ShowTarget {
    Subscriptions,
    Categories,
    Lists,
    PaymentMethods,
    /// The bundled templates and your own.
    Templates,
    Settings,
    Rates,
}

serde_plain::derive_display_from_serialize!(ShowTarget);

/// Args for the `subtrack show` command.
#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    #[arg(value_enum)]
    target: ShowTarget,
}

impl ShowArgs {
    pub fn new(target: ShowTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> ShowTarget {
        self.target
    }
}

/// Args for the `subtrack settings` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct SettingsArgs {
    /// The currency totals are shown in, e.g. EUR
    #[arg(long)]
    main_currency: Option<String>,

    #[arg(long)]
    round_whole_numbers: Option<bool>,

    #[arg(long)]
    true_dark_colors: Option<bool>,

    #[arg(long)]
    haptics_enabled: Option<bool>,

    #[arg(long)]
    premium: Option<bool>,
}

impl SettingsArgs {
    pub fn with_main_currency(mut self, code: impl Into<String>) -> Self {
        self.main_currency = Some(code.into());
        self
    }

    pub fn with_round_whole_numbers(mut self, value: bool) -> Self {
        self.round_whole_numbers = Some(value);
        self
    }

    pub fn with_premium(mut self, value: bool) -> Self {
        self.premium = Some(value);
        self
    }

    pub fn main_currency(&self) -> Option<&str> {
        self.main_currency.as_deref()
    }

    pub fn round_whole_numbers(&self) -> Option<bool> {
        self.round_whole_numbers
    }

    pub fn true_dark_colors(&self) -> Option<bool> {
        self.true_dark_colors
    }

    pub fn haptics_enabled(&self) -> Option<bool> {
        self.haptics_enabled
    }

    pub fn premium(&self) -> Option<bool> {
        self.premium
    }

    /// Whether any setting is to be changed.
    pub fn is_empty(&self) -> bool {
        self.main_currency.is_none()
            && self.round_whole_numbers.is_none()
            && self.true_dark_colors.is_none()
            && self.haptics_enabled.is_none()
            && self.premium.is_none()
    }
}

/// Args for the `subtrack rates` command.
#[derive(Debug, Parser, Clone)]
pub struct RatesArgs {
    #[command(subcommand)]
    command: RatesCommand,
}

impl RatesArgs {
    pub fn new(command: RatesCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &RatesCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum RatesCommand {
    /// Fetch the latest rates. On failure the current rates are kept.
    Refresh,
}

fn default_subtrack_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("subtrack"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --subtrack-home or SUBTRACK_HOME instead of relying on the \
                default subtrack home directory. If you continue using the program right now, \
                you may have problems!",
            );
            PathBuf::from("subtrack")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
