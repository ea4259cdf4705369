use crate::domain::model::ProjectId;
use crate::utils::error::{HarvestError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const PROJECT_ENTRY: &str = "project.json";

/// Decodes a project body (UTF-8, falling back to Latin-1) and checks that it is JSON.
pub fn decode_project_json(id: ProjectId, body: &[u8]) -> Result<String> {
    let text = match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => body.iter().map(|&b| char::from(b)).collect(),
    };

    let leading = text.trim_start();
    if leading.is_empty() {
        return Err(HarvestError::InvalidProjectJson {
            id,
            reason: "empty response".to_string(),
        });
    }
    if !leading.starts_with('{') && !leading.starts_with('[') {
        return Err(HarvestError::InvalidProjectJson {
            id,
            reason: "response is not JSON".to_string(),
        });
    }

    serde_json::from_str::<serde_json::Value>(&text).map_err(|e| {
        HarvestError::InvalidProjectJson {
            id,
            reason: e.to_string(),
        }
    })?;

    Ok(text)
}

/// Builds an `.sb3` archive holding the project JSON as its only entry.
pub fn package_sb3(project_json: &str) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    zip.start_file::<_, ()>(PROJECT_ENTRY, FileOptions::default())?;
    zip.write_all(project_json.as_bytes())?;
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

pub fn sb3_file_name(id: ProjectId) -> String {
    format!("{}.sb3", id)
}
