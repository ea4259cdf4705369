use crate::core::IdSource;
use crate::domain::model::{ExploreMode, ProjectId};
use crate::utils::backoff::Backoff;
use crate::utils::error::{HarvestError, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const RANDOM_START_MIN: ProjectId = 500_000_000;
pub const RANDOM_START_MAX: ProjectId = 1_500_000_000;

pub const EXPLORE_PAGE_LIMIT: usize = 40;
pub const EXPLORE_OFFSET_STEP: usize = 30;
pub const EXPLORE_MAX_OFFSET: usize = 9900;
pub const EXPLORE_IDLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartId {
    Fixed(ProjectId),
    Random,
}

impl StartId {
    pub fn resolve(self) -> ProjectId {
        match self {
            StartId::Fixed(id) => id,
            StartId::Random => rand::rng().random_range(RANDOM_START_MIN..=RANDOM_START_MAX),
        }
    }
}

impl FromStr for StartId {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "random" | "rand" | "aleatorio" => Ok(StartId::Random),
            other => match other.parse::<ProjectId>() {
                Ok(id) if id > 0 => Ok(StartId::Fixed(id)),
                _ => Err(HarvestError::InvalidConfigValueError {
                    field: "identifier".to_string(),
                    value: s.to_string(),
                    reason: "Expected a positive integer or 'random'".to_string(),
                }),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExploreQuery {
    pub query: String,
    pub mode: ExploreMode,
    pub language: String,
}

/// Where the ids of a run come from.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    File(PathBuf),
    Sequential(StartId),
    Explore(ExploreQuery),
}

impl SourceSpec {
    pub fn build(self, explore_client: Client, explore_url: &str) -> Result<Box<dyn IdSource>> {
        let source: Box<dyn IdSource> = match self {
            SourceSpec::File(path) => Box::new(FileIds::from_path(&path)?),
            SourceSpec::Sequential(start) => Box::new(SequentialIds::new(start.resolve())),
            SourceSpec::Explore(query) => {
                Box::new(ExploreIds::new(explore_client, explore_url, query))
            }
        };
        Ok(source)
    }
}

#[derive(Debug)]
pub struct FileIds {
    origin: String,
    ids: VecDeque<ProjectId>,
}

impl FileIds {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(&content, &path.display().to_string()))
    }

    /// One id per line; blank lines and `#` comments are skipped, bad lines logged.
    pub fn parse(content: &str, origin: &str) -> Self {
        let ids = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| match line.parse::<ProjectId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!("Invalid project id in {}: {}", origin, line);
                    None
                }
            })
            .collect();

        Self {
            origin: origin.to_string(),
            ids,
        }
    }

    pub fn remaining(&self) -> usize {
        self.ids.len()
    }
}

#[async_trait]
impl IdSource for FileIds {
    async fn next_id(&mut self) -> Option<ProjectId> {
        self.ids.pop_front()
    }

    fn describe(&self) -> String {
        format!("{} ids from {}", self.ids.len(), self.origin)
    }
}

#[derive(Debug)]
pub struct SequentialIds {
    start: ProjectId,
    next: Option<ProjectId>,
}

impl SequentialIds {
    pub fn new(start: ProjectId) -> Self {
        Self {
            start,
            next: Some(start),
        }
    }
}

#[async_trait]
impl IdSource for SequentialIds {
    async fn next_id(&mut self) -> Option<ProjectId> {
        let current = self.next?;
        self.next = current.checked_add(1);
        Some(current)
    }

    fn describe(&self) -> String {
        format!("sequential ids from {}", self.start)
    }
}

/// Pages through the explore listing forever; the engine decides when to stop.
pub struct ExploreIds {
    client: Client,
    url: String,
    query: ExploreQuery,
    offset: usize,
    pending: VecDeque<ProjectId>,
    backoff: Backoff,
    idle_delay: Duration,
}

impl ExploreIds {
    pub fn new(client: Client, url: &str, query: ExploreQuery) -> Self {
        Self {
            client,
            url: url.to_string(),
            query,
            offset: 0,
            pending: VecDeque::new(),
            backoff: Backoff::default(),
            idle_delay: EXPLORE_IDLE_DELAY,
        }
    }

    pub fn with_delays(mut self, backoff: Backoff, idle_delay: Duration) -> Self {
        self.backoff = backoff;
        self.idle_delay = idle_delay;
        self
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Ids on the current page, and whether the page had any entries at all.
    async fn fetch_page(&self) -> Result<(Vec<ProjectId>, bool)> {
        let limit = EXPLORE_PAGE_LIMIT.to_string();
        let offset = self.offset.to_string();
        let mode = self.query.mode.to_string();

        tracing::debug!("Explore page at offset {}: {}", self.offset, self.url);
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("q", self.query.query.as_str()),
                ("mode", mode.as_str()),
                ("language", self.query.language.as_str()),
                ("limit", limit.as_str()),
                ("offset", offset.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let entries = body.as_array().ok_or_else(|| HarvestError::ValidationError {
            message: "explore response is not a JSON array".to_string(),
        })?;

        let ids = entries.iter().filter_map(entry_id).collect();
        Ok((ids, !entries.is_empty()))
    }

    fn advance(&mut self) {
        self.offset += EXPLORE_OFFSET_STEP;
        if self.offset > EXPLORE_MAX_OFFSET {
            self.offset = 0;
        }
    }
}

fn entry_id(entry: &serde_json::Value) -> Option<ProjectId> {
    match entry.get("id")? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl IdSource for ExploreIds {
    async fn next_id(&mut self) -> Option<ProjectId> {
        loop {
            if let Some(id) = self.pending.pop_front() {
                return Some(id);
            }

            match self.fetch_page().await {
                Ok((_, false)) => {
                    tracing::debug!("Explore returned an empty page, starting over");
                    self.offset = 0;
                    tokio::time::sleep(self.idle_delay).await;
                }
                Ok((ids, true)) => {
                    if ids.is_empty() {
                        tracing::debug!("No usable ids at offset {}", self.offset);
                    }
                    self.backoff.reset();
                    self.pending.extend(ids);
                    self.advance();
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    tracing::warn!("Explore error: {} (retrying in {:?})", e, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn describe(&self) -> String {
        format!(
            "explore '{}' ({}, {})",
            self.query.query, self.query.mode, self.query.language
        )
    }
}
