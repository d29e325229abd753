use crate::error::Result;
use crate::process;
use std::path::{Path, PathBuf};

/// Version-control operations the provisioner needs.
pub trait Vcs: Send + Sync {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Check `branch` out into a new worktree at `dest`, sharing the object
    /// store of the repository at `source`. The branch is created or reset.
    fn worktree_add(&self, source: &Path, branch: &str, dest: &Path) -> Result<()>;
}

/// The `git` command-line tool.
#[derive(Debug, Clone)]
pub struct GitCli {
    bin: PathBuf,
}

impl GitCli {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    /// Locate `name` on PATH.
    pub fn locate(name: &str) -> Result<Self> {
        Ok(Self::new(process::resolve_tool(name)?))
    }
}

impl Vcs for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let dest = dest.display().to_string();
        tracing::info!(url, dest = %dest, "cloning");
        process::run_checked(&self.bin, &["clone", url, dest.as_str()], None)?;
        Ok(())
    }

    fn worktree_add(&self, source: &Path, branch: &str, dest: &Path) -> Result<()> {
        let dest = dest.display().to_string();
        tracing::info!(source = %source.display(), branch, dest = %dest, "adding worktree");
        process::run_checked(
            &self.bin,
            &["worktree", "add", "-B", branch, dest.as_str()],
            Some(source),
        )?;
        Ok(())
    }
}
