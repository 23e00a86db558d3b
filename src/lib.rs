pub mod api;
pub mod args;
mod backup;
pub mod commands;
mod config;
mod error;
mod fs;
pub mod kv;
pub mod model;
pub mod repo;
pub mod state;
pub mod sync;
mod utils;


pub use api::Mode;
pub use backup::Backup;
pub use config::Config;
pub use error::{is_unavailable, Error, RemoteUnavailable, Result};
pub use utils::CancelFlag;
