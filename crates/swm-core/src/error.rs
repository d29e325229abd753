use std::path::PathBuf;
use thiserror::Error;

use crate::hooks::HookStage;

#[derive(Debug, Error)]
pub enum SwmError {
    #[error("code path is empty: set --code-path, SWM_CODE_PATH or code_path in the config")]
    EmptyRoot,

    #[error("code path does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("code path has not been scanned yet")]
    NotScanned,

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("project '{import_path}' not found in story '{story}' or its base story")]
    ProjectNotFound { story: String, import_path: String },

    #[error("no project for session name: {0}")]
    SessionNotFound(String),

    #[error("invalid remote URL: {0}")]
    InvalidRemoteUrl(String),

    #[error("remote URL '{0}' yields an empty import path")]
    EmptyImportPath(String),

    #[error("invalid story name '{0}': must be non-empty and contain no path separators, '@' or '='")]
    InvalidStoryName(String),

    #[error("story record not found: {0}")]
    StoryRecordNotFound(String),

    #[error("{0} is not installed or not on PATH")]
    ToolNotInstalled(String),

    #[error("`{command}` failed: {output}")]
    CommandFailed { command: String, output: String },

    #[error("{stage} hook {} failed: {output}", .hook.display())]
    HookFailed {
        stage: HookStage,
        hook: PathBuf,
        output: String,
    },

    #[error("failed to start scan workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, SwmError>;
