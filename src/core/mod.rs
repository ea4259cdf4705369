pub mod engine;
pub mod fetcher;
pub mod id_source;
pub mod packager;
pub mod session;

pub use crate::domain::model::{DownloadedProject, FetchedProject, ProjectId, SessionSummary};
pub use crate::domain::ports::{ConfigProvider, IdSource, ProjectFetcher, Storage};
pub use crate::utils::error::Result;
