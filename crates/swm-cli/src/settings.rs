use anyhow::Context;
use std::path::{Path, PathBuf};
use swm_core::config::Config;
use swm_core::record::StoryRecord;
use swm_core::{paths, SwmError};

/// Values given on the command line or through the environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub code_path: Option<PathBuf>,
    pub ignore_pattern: Option<String>,
    pub profile: Option<String>,
    pub story: Option<String>,
    pub config: Option<PathBuf>,
}

/// Effective settings for one invocation.
///
/// Priority for each value:
/// 1. flag / environment variable (clap resolves these together)
/// 2. config file
/// 3. built-in default
#[derive(Debug)]
pub struct Settings {
    code_path: Option<PathBuf>,
    pub ignore_pattern: Option<String>,
    pub profile: Option<String>,
    pub story: Option<String>,
    pub config: Config,
}

impl Settings {
    pub fn resolve(overrides: Overrides) -> anyhow::Result<Self> {
        let config = match non_empty_path(overrides.config).or_else(Config::default_path) {
            Some(path) => Config::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => Config::default(),
        };
        Ok(Self::merge(
            overrides.code_path,
            overrides.ignore_pattern,
            overrides.profile,
            overrides.story,
            config,
        ))
    }

    fn merge(
        code_path: Option<PathBuf>,
        ignore_pattern: Option<String>,
        profile: Option<String>,
        story: Option<String>,
        config: Config,
    ) -> Self {
        Self {
            code_path: non_empty_path(code_path).or_else(|| non_empty_path(config.code_path.clone())),
            ignore_pattern: non_empty(ignore_pattern).or_else(|| non_empty(config.ignore_pattern.clone())),
            profile: non_empty(profile).or_else(|| non_empty(config.profile.clone())),
            story: non_empty(story),
            config,
        }
    }

    pub fn code_path(&self) -> anyhow::Result<&Path> {
        self.code_path.as_deref().ok_or_else(|| SwmError::EmptyRoot.into())
    }

    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        self.config
            .data_dir()
            .context("cannot locate a data directory: set data_dir in the config")
    }

    /// The selected story, `base` when none is given.
    pub fn story_name(&self) -> &str {
        self.story.as_deref().unwrap_or(paths::BASE_STORY)
    }

    /// Branch recorded for `story`, falling back to the story name.
    pub fn branch_for(&self, story: &str) -> anyhow::Result<String> {
        let data_dir = self.data_dir()?;
        match StoryRecord::load(&data_dir, story) {
            Ok(record) => Ok(record.branch_name),
            Err(SwmError::StoryRecordNotFound(_)) => Ok(story.to_string()),
            Err(e) => Err(e).with_context(|| format!("failed to read story record '{story}'")),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn non_empty_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|v| !v.as_os_str().is_empty())
}
