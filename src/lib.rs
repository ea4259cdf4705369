pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{cli::LocalStorage, env_file::EnvFile, toml_config::Endpoints};
pub use crate::core::{
    engine::DownloadEngine, fetcher::ScratchClient, session::SessionRecorder,
};
pub use utils::error::{HarvestError, Result};
