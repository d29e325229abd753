//! Materialising virtual projects on disk.
//!
//! A story's copy of a project is a `git worktree` of the base story's
//! checkout. Creation is serialised per (profile, story, import path) so two
//! callers never race on the same target; hooks run outside that lock.

use crate::error::{Result, SwmError};
use crate::fs::Fs;
use crate::hooks::{HookStage, Hooks};
use crate::index::{Profile, Project, Story};
use crate::paths;
use crate::remote::RemoteUrl;
use crate::vcs::Vcs;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provisioned {
    /// The checkout was already on disk; nothing ran.
    AlreadyPresent,
    Created,
}

type LockKey = (String, String, String);

pub struct Provisioner {
    fs: Arc<dyn Fs>,
    vcs: Arc<dyn Vcs>,
    hooks: Hooks,
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl Provisioner {
    pub fn new(fs: Arc<dyn Fs>, vcs: Arc<dyn Vcs>, hooks: Hooks) -> Self {
        Self {
            fs,
            vcs,
            hooks,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, story: &Story, import_path: &str) -> Arc<Mutex<()>> {
        let key = (
            story.profile_name().to_string(),
            story.name().to_string(),
            import_path.to_string(),
        );
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key).or_default())
    }

    /// Make sure `project` exists on disk under `story`, creating a worktree
    /// on `branch` from the base story's checkout when it does not.
    ///
    /// Pre-hooks run before anything touches the disk and abort on failure.
    /// A post-hook failure is returned as an error but the new worktree stays.
    pub fn ensure(&self, story: &Story, project: &Project, branch: &str) -> Result<Provisioned> {
        let import_path = project.import_path();
        let target = paths::project_path(story.root(), import_path);

        let Some(base) = story.base() else {
            if self.fs.exists(&target) {
                story.insert(project.clone());
                return Ok(Provisioned::AlreadyPresent);
            }
            return Err(SwmError::ProjectNotFound {
                story: story.name().to_string(),
                import_path: import_path.to_string(),
            });
        };
        let source = paths::project_path(base.root(), import_path);

        let lock = self.lock_for(story, import_path);
        let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.fs.exists(&target) {
            story.insert(project.clone());
            return Ok(Provisioned::AlreadyPresent);
        }
        if !self.fs.exists(&source) {
            return Err(SwmError::ProjectNotFound {
                story: base.name().to_string(),
                import_path: import_path.to_string(),
            });
        }

        self.hooks.run(HookStage::Pre, story.name(), &target, &source)?;
        self.vcs.worktree_add(&source, branch, &target)?;
        story.insert(project.clone());
        drop(guard);

        self.hooks.run(HookStage::Post, story.name(), &target, &source)?;
        Ok(Provisioned::Created)
    }

    /// Clone `url` into the profile's base story unless it is already there.
    pub fn clone_into_base(&self, profile: &Profile, url: &str) -> Result<(Project, Provisioned)> {
        let remote = RemoteUrl::parse(url)?;
        let import_path = remote.import_path()?;
        let base = profile.base();
        let target = paths::project_path(base.root(), &import_path);

        let lock = self.lock_for(&base, &import_path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.fs.exists(&target) {
            return Ok((base.add_project(&import_path), Provisioned::AlreadyPresent));
        }
        self.vcs.clone_repo(url, &target)?;
        Ok((base.add_project(&import_path), Provisioned::Created))
    }
}
