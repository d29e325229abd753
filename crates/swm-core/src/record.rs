//! Persisted story records: one JSON file per story under the data directory.

use crate::error::{Result, SwmError};
use crate::{io, paths};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const RECORD_EXT: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "BranchName")]
    pub branch_name: String,
    #[serde(rename = "CreatedAt", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl StoryRecord {
    /// A new record; the branch defaults to the story name.
    pub fn new(name: &str, branch_name: Option<&str>) -> Result<Self> {
        paths::validate_story_name(name)?;
        let branch_name = match branch_name {
            Some(b) if !b.trim().is_empty() => b.to_string(),
            _ => name.to_string(),
        };
        Ok(Self {
            name: name.to_string(),
            branch_name,
            created_at: Utc::now(),
        })
    }

    pub fn path(data_dir: &Path, name: &str) -> PathBuf {
        records_dir(data_dir).join(format!("{name}.{RECORD_EXT}"))
    }

    pub fn load(data_dir: &Path, name: &str) -> Result<Self> {
        paths::validate_story_name(name)?;
        let path = Self::path(data_dir, name);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SwmError::StoryRecordNotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        paths::validate_story_name(&self.name)?;
        let data = serde_json::to_string_pretty(self)?;
        io::atomic_write(&Self::path(data_dir, &self.name), data.as_bytes())?;
        tracing::debug!(story = %self.name, "saved story record");
        Ok(())
    }

    pub fn remove(data_dir: &Path, name: &str) -> Result<()> {
        paths::validate_story_name(name)?;
        match std::fs::remove_file(Self::path(data_dir, name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SwmError::StoryRecordNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every readable record, sorted by name. Malformed files are skipped.
    pub fn list(data_dir: &Path) -> Result<Vec<Self>> {
        let entries = match std::fs::read_dir(records_dir(data_dir)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match Self::load(data_dir, name) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping story record"),
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }
}

fn records_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(paths::STORIES_DIR)
}
