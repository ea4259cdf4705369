use crate::domain::model::{FetchedProject, ProjectId};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    /// Replaces `path` in one step; readers never see a partial file.
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn output_dir(&self) -> &str;
    fn workers(&self) -> usize;
    fn retry_attempts(&self) -> u32;
    fn request_timeout(&self) -> Duration;
    /// `None` keeps going until the id source runs dry or the run is stopped.
    fn target_successes(&self) -> Option<u64>;
}

#[async_trait]
pub trait ProjectFetcher: Send + Sync {
    async fn fetch(&self, id: ProjectId) -> Result<FetchedProject>;
}

#[async_trait]
pub trait IdSource: Send {
    /// Next project id to try, or `None` once the source is exhausted.
    async fn next_id(&mut self) -> Option<ProjectId>;
    fn describe(&self) -> String;
}
