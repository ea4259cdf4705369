use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub type ProjectId = u64;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectAuthor {
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectHistory {
    pub created: String,
    pub modified: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectRemix {
    pub parent: Option<ProjectId>,
    pub root: Option<ProjectId>,
}

/// Project record as served by `GET {api_base}/projects/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMetadata {
    pub title: String,
    pub author: ProjectAuthor,
    pub history: ProjectHistory,
    pub remix: ProjectRemix,
    pub project_token: Option<String>,
}

/// Validated project JSON plus whatever metadata the API returned.
#[derive(Debug, Clone)]
pub struct FetchedProject {
    pub id: ProjectId,
    pub json: String,
    pub metadata: Option<ProjectMetadata>,
}

/// A project packaged as an `.sb3` archive, ready to be stored.
#[derive(Debug, Clone)]
pub struct DownloadedProject {
    pub id: ProjectId,
    pub archive: Vec<u8>,
    pub metadata: Option<ProjectMetadata>,
}

pub const DATASET_HEADER: [&str; 7] = [
    "Title",
    "Project ID",
    "Author",
    "Creation date",
    "Modified date",
    "Remix parent id",
    "Remix root id",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRow {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Project ID")]
    pub project_id: ProjectId,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Creation date")]
    pub created: String,
    #[serde(rename = "Modified date")]
    pub modified: String,
    #[serde(rename = "Remix parent id")]
    pub remix_parent: Option<ProjectId>,
    #[serde(rename = "Remix root id")]
    pub remix_root: Option<ProjectId>,
}

impl DatasetRow {
    pub fn new(id: ProjectId, meta: &ProjectMetadata) -> Self {
        Self {
            title: meta.title.clone(),
            project_id: id,
            author: meta.author.username.clone(),
            created: meta.history.created.clone(),
            modified: meta.history.modified.clone(),
            remix_parent: meta.remix.parent,
            remix_root: meta.remix.root,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ExploreMode {
    Popular,
    Trending,
    Recent,
}

impl fmt::Display for ExploreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExploreMode::Popular => "popular",
            ExploreMode::Trending => "trending",
            ExploreMode::Recent => "recent",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session: String,
    pub downloaded: u64,
    pub failed: u64,
    pub elapsed: Duration,
    pub session_dir: PathBuf,
    pub summary_dir: PathBuf,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "#".repeat(63);
        writeln!(f, "{}", rule)?;
        writeln!(f, "##")?;
        writeln!(f, "##   SESSION {} SUMMARY", self.session)?;
        writeln!(f, "##   - {} projects downloaded.", self.downloaded)?;
        writeln!(f, "##   - {} projects failed.", self.failed)?;
        writeln!(f, "##   - Took {:.2} seconds.", self.elapsed.as_secs_f64())?;
        writeln!(f, "##")?;
        writeln!(f, "##   Downloads: {}", self.session_dir.display())?;
        writeln!(f, "##   Summaries: {}", self.summary_dir.display())?;
        writeln!(f, "##")?;
        write!(f, "{}", rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_parses_api_payload() {
        let payload = serde_json::json!({
            "id": 104,
            "title": "Pong, but faster",
            "author": {"id": 1, "username": "scratchcat"},
            "history": {"created": "2020-01-01T00:00:00.000Z", "modified": "2020-02-01T00:00:00.000Z"},
            "remix": {"parent": 100, "root": 90},
            "project_token": "abc123"
        });

        let meta: ProjectMetadata = serde_json::from_value(payload).unwrap();
        assert_eq!(meta.author.username, "scratchcat");
        assert_eq!(meta.remix.parent, Some(100));
        assert_eq!(meta.project_token.as_deref(), Some("abc123"));

        let row = DatasetRow::new(104, &meta);
        assert_eq!(row.title, "Pong, but faster");
        assert_eq!(row.remix_root, Some(90));
    }

    #[test]
    fn test_metadata_tolerates_missing_fields() {
        let meta: ProjectMetadata =
            serde_json::from_value(serde_json::json!({"remix": {"parent": null}})).unwrap();
        assert_eq!(meta.title, "");
        assert_eq!(meta.remix.parent, None);
        assert!(meta.project_token.is_none());
    }

    #[test]
    fn test_summary_banner() {
        let summary = SessionSummary {
            session: "2024-05-01_10-00-00".to_string(),
            downloaded: 3,
            failed: 1,
            elapsed: Duration::from_millis(2500),
            session_dir: PathBuf::from("downloads/2024-05-01_10-00-00"),
            summary_dir: PathBuf::from("downloads/2024-05-01_10-00-00/summaries"),
        };

        let banner = summary.to_string();
        assert!(banner.contains("SESSION 2024-05-01_10-00-00 SUMMARY"));
        assert!(banner.contains("- 3 projects downloaded."));
        assert!(banner.contains("- 1 projects failed."));
        assert!(banner.contains("Took 2.50 seconds."));
    }
}
