//! Pre/post provisioning hooks.
//!
//! A hook directory holds executables that run in name order with three
//! arguments: story name, target path, source repository path. Entries that
//! are not executable files are ignored.

use crate::error::{Result, SwmError};
use crate::process;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookStage {
    Pre,
    Post,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookStage::Pre => f.write_str("pre"),
            HookStage::Post => f.write_str("post"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<PathBuf>,
}

impl Hooks {
    pub fn dir(&self, stage: HookStage) -> Option<&Path> {
        match stage {
            HookStage::Pre => self.pre.as_deref(),
            HookStage::Post => self.post.as_deref(),
        }
    }

    /// Run every hook of `stage`, stopping at the first failure.
    pub fn run(&self, stage: HookStage, story: &str, target: &Path, source: &Path) -> Result<()> {
        let Some(dir) = self.dir(stage) else {
            return Ok(());
        };
        let args = [
            story.to_string(),
            target.display().to_string(),
            source.display().to_string(),
        ];
        for hook in executables(dir)? {
            tracing::info!(%stage, hook = %hook.display(), story, "running hook");
            let output = process::run_capture(&hook, &args, None)?;
            if !output.success() {
                return Err(SwmError::HookFailed {
                    stage,
                    hook,
                    output: output.combined(),
                });
            }
        }
        Ok(())
    }
}

/// Executable files in `dir`, sorted by name. A missing directory has none.
pub fn executables(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut hooks = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(hook = %path.display(), error = %e, "cannot read hook, skipping");
                continue;
            }
        };
        if metadata.is_file() && is_executable(&metadata) {
            hooks.push(path);
        }
    }
    hooks.sort();
    Ok(hooks)
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    true
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    pub(crate) fn write_hook(dir: &Path, name: &str, body: &str) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn only_executables_in_name_order() {
        let dir = TempDir::new().unwrap();
        write_hook(dir.path(), "20-second", "true");
        write_hook(dir.path(), "10-first", "true");
        std::fs::write(dir.path().join("README"), b"not a hook").unwrap();
        std::fs::create_dir(dir.path().join("sub.d")).unwrap();

        let found = executables(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["10-first", "20-second"]);
    }

    #[test]
    fn dangling_symlink_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_hook(dir.path(), "10-real", "true");
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("05-broken")).unwrap();

        let found = executables(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("10-real")]);
    }

    #[test]
    fn missing_dir_has_no_hooks() {
        let dir = TempDir::new().unwrap();
        assert!(executables(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn hooks_receive_story_target_source() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("log");
        write_hook(
            &dir.path().join("pre"),
            "record",
            &format!("echo \"$1|$2|$3\" >> {}", log.display()),
        );
        let hooks = Hooks {
            pre: Some(dir.path().join("pre")),
            post: None,
        };
        hooks
            .run(HookStage::Pre, "T1", Path::new("/t"), Path::new("/s"))
            .unwrap();
        hooks
            .run(HookStage::Post, "T1", Path::new("/t"), Path::new("/s"))
            .unwrap();
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "T1|/t|/s\n");
    }

    #[test]
    fn failing_hook_stops_the_chain() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("ran");
        write_hook(dir.path(), "10-fail", "echo nope; exit 1");
        write_hook(dir.path(), "20-after", &format!("touch {}", marker.display()));
        let hooks = Hooks {
            pre: Some(dir.path().to_path_buf()),
            post: None,
        };

        let err = hooks
            .run(HookStage::Pre, "T1", Path::new("/t"), Path::new("/s"))
            .unwrap_err();
        match err {
            SwmError::HookFailed { stage, hook, output } => {
                assert_eq!(stage, HookStage::Pre);
                assert!(hook.ends_with("10-fail"));
                assert_eq!(output, "nope");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!marker.exists());
    }
}
