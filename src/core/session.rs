use crate::core::packager::sb3_file_name;
use crate::core::Storage;
use crate::domain::model::{DatasetRow, DownloadedProject, ProjectId, SessionSummary, DATASET_HEADER};
use crate::utils::error::{HarvestError, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SESSION_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
pub const SUMMARY_DIR: &str = "summaries";
pub const SUCCESS_LIST: &str = "summaries/projects_downloaded";
pub const FAILED_LIST: &str = "summaries/projects_failed";
pub const SESSION_LOG: &str = "summaries/session.log";
pub const DATASET_CSV: &str = "dataset.csv";

/// Directory layout of one run: `{output}/{session}/` and its `summaries/`.
#[derive(Debug, Clone)]
pub struct SessionLayout {
    pub session: String,
    pub session_dir: PathBuf,
}

impl SessionLayout {
    pub fn new(output_dir: &Path, started: DateTime<Local>) -> Self {
        let session = started.format(SESSION_FORMAT).to_string();
        let session_dir = output_dir.join(&session);
        Self {
            session,
            session_dir,
        }
    }

    pub fn create(&self) -> Result<()> {
        std::fs::create_dir_all(self.summary_dir())?;
        Ok(())
    }

    pub fn summary_dir(&self) -> PathBuf {
        self.session_dir.join(SUMMARY_DIR)
    }

    pub fn log_path(&self) -> PathBuf {
        self.session_dir.join(SESSION_LOG)
    }
}

fn csv_bytes<F>(write: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut csv::Writer<Vec<u8>>) -> csv::Result<()>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    write(&mut writer)?;
    writer
        .into_inner()
        .map_err(|e| HarvestError::IoError(e.into_error()))
}

/// Single writer for everything a run leaves on disk.
pub struct SessionRecorder<S: Storage> {
    storage: S,
    layout: SessionLayout,
    downloaded: u64,
    failed: u64,
}

impl<S: Storage> SessionRecorder<S> {
    /// `storage` must be rooted at the session directory.
    pub fn new(storage: S, layout: SessionLayout) -> Self {
        Self {
            storage,
            layout,
            downloaded: 0,
            failed: 0,
        }
    }

    /// Writes the dataset header and empty summary lists.
    pub async fn init(&self) -> Result<()> {
        let header = csv_bytes(|w| w.write_record(DATASET_HEADER))?;
        self.storage.write_file(DATASET_CSV, &header).await?;
        self.storage.write_file(SUCCESS_LIST, b"").await?;
        self.storage.write_file(FAILED_LIST, b"").await?;
        Ok(())
    }

    pub async fn record_success(&mut self, project: &DownloadedProject) -> Result<()> {
        self.storage
            .write_file(&sb3_file_name(project.id), &project.archive)
            .await?;
        self.append_id(SUCCESS_LIST, project.id).await?;

        if let Some(meta) = &project.metadata {
            let row = DatasetRow::new(project.id, meta);
            let line = csv_bytes(|w| w.serialize(&row))?;
            self.storage.append_file(DATASET_CSV, &line).await?;
        }

        self.downloaded += 1;
        Ok(())
    }

    pub async fn record_failure(&mut self, id: ProjectId) -> Result<()> {
        self.append_id(FAILED_LIST, id).await?;
        self.failed += 1;
        Ok(())
    }

    async fn append_id(&self, list: &str, id: ProjectId) -> Result<()> {
        self.storage
            .append_file(list, format!("{}\n", id).as_bytes())
            .await
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn summary(&self, elapsed: Duration) -> SessionSummary {
        SessionSummary {
            session: self.layout.session.clone(),
            downloaded: self.downloaded,
            failed: self.failed,
            elapsed,
            session_dir: self.layout.session_dir.clone(),
            summary_dir: self.layout.summary_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::cli::LocalStorage;
    use crate::core::packager::package_sb3;
    use crate::domain::model::{ProjectAuthor, ProjectMetadata};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn layout_in(dir: &Path) -> SessionLayout {
        let started = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        SessionLayout::new(dir, started)
    }

    #[test]
    fn test_layout_paths() {
        let layout = layout_in(Path::new("downloads"));
        assert_eq!(layout.session, "2024-03-09_14-05-07");
        assert_eq!(
            layout.summary_dir(),
            PathBuf::from("downloads/2024-03-09_14-05-07/summaries")
        );
        assert_eq!(
            layout.log_path(),
            PathBuf::from("downloads/2024-03-09_14-05-07/summaries/session.log")
        );
    }

    #[tokio::test]
    async fn test_recorder_writes_archive_lists_and_dataset() {
        let temp_dir = TempDir::new().unwrap();
        let layout = layout_in(temp_dir.path());
        layout.create().unwrap();
        let storage = LocalStorage::new(&layout.session_dir);
        let mut recorder = SessionRecorder::new(storage, layout.clone());
        recorder.init().await.unwrap();

        let meta = ProjectMetadata {
            title: "Tag, you're it".to_string(),
            author: ProjectAuthor {
                username: "griffpatch".to_string(),
            },
            ..Default::default()
        };
        let project = DownloadedProject {
            id: 21,
            archive: package_sb3("{}").unwrap(),
            metadata: Some(meta),
        };
        recorder.record_success(&project).await.unwrap();
        recorder.record_failure(22).await.unwrap();

        let dir = &layout.session_dir;
        assert!(dir.join("21.sb3").exists());
        assert_eq!(
            std::fs::read_to_string(dir.join(SUCCESS_LIST)).unwrap(),
            "21\n"
        );
        assert_eq!(std::fs::read_to_string(dir.join(FAILED_LIST)).unwrap(), "22\n");

        let dataset = std::fs::read_to_string(dir.join(DATASET_CSV)).unwrap();
        let lines: Vec<&str> = dataset.lines().collect();
        assert_eq!(
            lines[0],
            "Title,Project ID,Author,Creation date,Modified date,Remix parent id,Remix root id"
        );
        assert_eq!(lines[1], "\"Tag, you're it\",21,griffpatch,,,,");

        let summary = recorder.summary(Duration::from_secs(1));
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_success_without_metadata_adds_no_row() {
        let temp_dir = TempDir::new().unwrap();
        let layout = layout_in(temp_dir.path());
        let storage = LocalStorage::new(&layout.session_dir);
        let mut recorder = SessionRecorder::new(storage, layout.clone());
        recorder.init().await.unwrap();

        let project = DownloadedProject {
            id: 30,
            archive: package_sb3("{}").unwrap(),
            metadata: None,
        };
        recorder.record_success(&project).await.unwrap();

        let dataset = std::fs::read_to_string(layout.session_dir.join(DATASET_CSV)).unwrap();
        assert_eq!(dataset.lines().count(), 1);
        assert_eq!(recorder.downloaded(), 1);
    }
}
