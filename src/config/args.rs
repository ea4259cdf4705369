use crate::config::toml_config::{HarvestToml, DEFAULT_PROXY};
use crate::core::id_source::{ExploreQuery, SourceSpec, StartId};
use crate::core::ConfigProvider;
use crate::domain::model::ExploreMode;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const MAX_WORKERS: usize = 256;

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().min(MAX_WORKERS))
        .unwrap_or(4)
}

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "scratch-harvest")]
#[command(about = "Concurrent downloader for Scratch projects, saved as .sb3 archives")]
pub struct CliConfig {
    /// First project id of a sequential run, or `random`
    #[arg(long, visible_alias = "start-id", env = "IDENTIFIER")]
    pub identifier: Option<String>,

    /// Successful downloads to reach before stopping (0 = no limit)
    #[arg(long, env = "AMOUNT", default_value_t = 0)]
    pub amount: u64,

    /// File with one project id per line; takes precedence over --identifier
    #[arg(long)]
    pub ids_file: Option<PathBuf>,

    /// Explore search query, used when no id file or identifier is given
    #[arg(long, default_value = "*")]
    pub query: String,

    #[arg(long, value_enum, default_value_t = ExploreMode::Popular)]
    pub mode: ExploreMode,

    #[arg(long, default_value = "en")]
    pub language: String,

    #[arg(long, default_value_t = default_workers())]
    pub workers: usize,

    /// Attempts per project
    #[arg(long, default_value_t = 1)]
    pub retry: u32,

    /// Network timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Query explore directly instead of through the proxy
    #[arg(long)]
    pub no_tor: bool,

    #[arg(long)]
    pub proxy: Option<String>,

    #[arg(long, default_value = "./downloads")]
    pub output_dir: String,

    /// TOML file with endpoint and network overrides
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit console logs as JSON")]
    pub json_logs: bool,
}

impl CliConfig {
    pub fn load_toml(&self) -> Result<HarvestToml> {
        let toml = match &self.config {
            Some(path) => HarvestToml::from_file(path)?,
            None => HarvestToml::default(),
        };
        toml.validate()?;
        Ok(toml)
    }

    /// Proxy for explore traffic: `--proxy`, then the config file, then the compose default.
    pub fn explore_proxy(&self, toml: &HarvestToml) -> Option<String> {
        if self.no_tor {
            return None;
        }
        Some(
            self.proxy
                .clone()
                .or_else(|| toml.network.proxy.clone())
                .unwrap_or_else(|| DEFAULT_PROXY.to_string()),
        )
    }

    /// Id file first, then a start id, then explore.
    pub fn source_spec(&self) -> Result<SourceSpec> {
        if let Some(path) = &self.ids_file {
            return Ok(SourceSpec::File(path.clone()));
        }
        if let Some(raw) = self.identifier.as_deref().filter(|s| !s.trim().is_empty()) {
            return Ok(SourceSpec::Sequential(raw.parse::<StartId>()?));
        }
        Ok(SourceSpec::Explore(ExploreQuery {
            query: self.query.clone(),
            mode: self.mode,
            language: self.language.clone(),
        }))
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_range("workers", self.workers, 1, MAX_WORKERS)?;
        validation::validate_positive_number("retry", self.retry as usize, 1)?;
        validation::validate_positive_number("timeout", self.timeout as usize, 1)?;
        validation::validate_path("output_dir", &self.output_dir)?;
        validation::validate_non_empty_string("query", &self.query)?;
        validation::validate_non_empty_string("language", &self.language)?;
        if let Some(path) = &self.ids_file {
            validation::validate_path("ids_file", &path.to_string_lossy())?;
        }
        if let Some(proxy) = &self.proxy {
            validation::validate_proxy_url("proxy", proxy)?;
        }
        self.source_spec()?;
        Ok(())
    }
}

impl ConfigProvider for CliConfig {
    fn output_dir(&self) -> &str {
        &self.output_dir
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn retry_attempts(&self) -> u32 {
        self.retry.max(1)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    fn target_successes(&self) -> Option<u64> {
        (self.amount > 0).then_some(self.amount)
    }
}
