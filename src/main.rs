use clap::Parser;
use std::process::ExitCode;
use subtrack::args::{
    AddSubcommand, Args, Command, RatesCommand, SyncAction, UpdateSubcommand,
};
use subtrack::{commands, is_unavailable, Config, Mode, Result};
use tracing::{debug, error, trace, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) if is_unavailable(&e) => {
            warn!("{e:#}. Check that the remote directory exists and is synced.");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().subtrack_home().path();

    // This allows for running the program without touching the real remote directory or the
    // network. When SUBTRACK_IN_TEST_MODE is set and non-empty the mode is Mode::Test, otherwise
    // it is Mode::Live.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.remote_dir()).await?.print(),

        Command::Sync(sync_args) => {
            let config = Config::load(home).await?;
            match sync_args.action() {
                SyncAction::Up => commands::sync_up(config, mode).await?.print(),
                SyncAction::Down => commands::sync_down(config, mode).await?.print(),
                SyncAction::Status => commands::sync_status(config, mode).await?.print(),
            }
        }

        Command::Add(add_args) => {
            let config = Config::load(home).await?;
            match add_args.entity() {
                AddSubcommand::Subscription(args) => {
                    commands::add_subscription(config, mode, args).await?.print()
                }
                AddSubcommand::Category(args) => {
                    commands::add_category(config, mode, args).await?.print()
                }
                AddSubcommand::List(args) => commands::add_list(config, mode, args).await?.print(),
                AddSubcommand::PaymentMethod(args) => {
                    commands::add_payment_method(config, mode, args)
                        .await?
                        .print()
                }
                AddSubcommand::Template(args) => {
                    commands::add_template(config, mode, args).await?.print()
                }
            }
        }

        Command::Update(update_args) => {
            let config = Config::load(home).await?;
            match update_args.entity() {
                UpdateSubcommand::Subscription(args) => {
                    commands::update_subscription(config, mode, args)
                        .await?
                        .print()
                }
                UpdateSubcommand::Category(args) => {
                    commands::update_category(config, mode, args).await?.print()
                }
                UpdateSubcommand::List(args) => {
                    commands::update_list(config, mode, args).await?.print()
                }
                UpdateSubcommand::PaymentMethod(args) => {
                    commands::update_payment_method(config, mode, args)
                        .await?
                        .print()
                }
            }
        }

        Command::Remove(remove_args) => {
            let config = Config::load(home).await?;
            commands::remove(config, mode, remove_args).await?.print()
        }

        Command::Show(show_args) => {
            let config = Config::load(home).await?;
            commands::show(config, show_args).await?.print()
        }

        Command::Settings(settings_args) => {
            let config = Config::load(home).await?;
            commands::settings(config, mode, settings_args)
                .await?
                .print()
        }

        Command::Rates(rates_args) => {
            let config = Config::load(home).await?;
            match rates_args.command() {
                RatesCommand::Refresh => commands::rates_refresh(config, mode).await?.print(),
            }
        }

        Command::Summary => commands::summary(Config::load(home).await?).await?.print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
