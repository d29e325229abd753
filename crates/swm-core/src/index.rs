//! In-memory Profile → Story → Project graph.
//!
//! Every collection sits behind its own `RwLock` and no function holds one
//! collection's lock while acquiring another's. A story that is not the base
//! story resolves unknown projects against its profile's base story and
//! hands back a copy rebound to itself (a *virtual* project) without storing
//! it.

use crate::error::{Result, SwmError};
use crate::fs::Fs;
use crate::paths;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    import_path: String,
    profile: String,
    story: String,
    story_root: PathBuf,
}

impl Project {
    pub fn import_path(&self) -> &str {
        &self.import_path
    }

    pub fn profile_name(&self) -> &str {
        &self.profile
    }

    pub fn story_name(&self) -> &str {
        &self.story
    }

    pub fn story_root(&self) -> &Path {
        &self.story_root
    }

    pub fn path(&self) -> PathBuf {
        paths::project_path(&self.story_root, &self.import_path)
    }

    pub fn session_name(&self) -> String {
        paths::session_name(&self.profile, &self.story, &self.import_path)
    }

    /// Whether the checkout exists on disk. Virtual projects report false
    /// until they are provisioned.
    pub fn is_materialized(&self, fs: &dyn Fs) -> bool {
        fs.exists(&self.path())
    }

    fn rebind(&self, story: &Story) -> Self {
        Self {
            import_path: self.import_path.clone(),
            profile: story.profile.clone(),
            story: story.name.clone(),
            story_root: story.root.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Story
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Story {
    name: String,
    profile: String,
    root: PathBuf,
    base: Option<Arc<Story>>,
    projects: RwLock<BTreeMap<String, Project>>,
}

impl Story {
    fn new_base(profile: &str, root: PathBuf) -> Self {
        Self {
            name: paths::BASE_STORY.to_string(),
            profile: profile.to_string(),
            root,
            base: None,
            projects: RwLock::new(BTreeMap::new()),
        }
    }

    fn new(name: &str, root: PathBuf, base: Arc<Story>) -> Self {
        Self {
            name: name.to_string(),
            profile: base.profile.clone(),
            root,
            base: Some(base),
            projects: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn profile_name(&self) -> &str {
        &self.profile
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_base(&self) -> bool {
        self.base.is_none()
    }

    pub fn base(&self) -> Option<&Arc<Story>> {
        self.base.as_ref()
    }

    /// Look up a project, falling back to the base story.
    ///
    /// The fallback result is bound to `self` but is not inserted; call
    /// [`Story::insert`] (the provisioner does) once it exists on disk.
    pub fn project(&self, import_path: &str) -> Result<Project> {
        if let Some(project) = read(&self.projects).get(import_path) {
            return Ok(project.clone());
        }
        let not_found = || SwmError::ProjectNotFound {
            story: self.name.clone(),
            import_path: import_path.to_string(),
        };
        let base = self.base.as_ref().ok_or_else(not_found)?;
        let project = base.project(import_path).map_err(|_| not_found())?;
        Ok(project.rebind(self))
    }

    /// Projects stored in this story, ordered by import path.
    pub fn projects(&self) -> Vec<Project> {
        read(&self.projects).values().cloned().collect()
    }

    pub fn import_paths(&self) -> Vec<String> {
        read(&self.projects).keys().cloned().collect()
    }

    pub fn contains(&self, import_path: &str) -> bool {
        read(&self.projects).contains_key(import_path)
    }

    /// Record a project under this story and return it.
    pub fn add_project(&self, import_path: &str) -> Project {
        let project = Project {
            import_path: import_path.to_string(),
            profile: self.profile.clone(),
            story: self.name.clone(),
            story_root: self.root.clone(),
        };
        self.insert(project.clone());
        project
    }

    /// Store a project binding. A project bound to another story is rebound
    /// to this one first.
    pub fn insert(&self, project: Project) {
        let project = if project.story == self.name && project.profile == self.profile {
            project
        } else {
            project.rebind(self)
        };
        write(&self.projects).insert(project.import_path.clone(), project);
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Profile {
    name: String,
    code_path: PathBuf,
    base: Arc<Story>,
    stories: RwLock<BTreeMap<String, Arc<Story>>>,
}

impl Profile {
    pub fn new(code_path: &Path, name: &str) -> Self {
        let base = Arc::new(Story::new_base(
            name,
            paths::base_story_root(code_path, name),
        ));
        let mut stories = BTreeMap::new();
        stories.insert(base.name.clone(), Arc::clone(&base));
        Self {
            name: name.to_string(),
            code_path: code_path.to_path_buf(),
            base,
            stories: RwLock::new(stories),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> PathBuf {
        paths::profile_path(&self.code_path, &self.name)
    }

    pub fn base(&self) -> Arc<Story> {
        Arc::clone(&self.base)
    }

    /// Existing story, or a fresh empty placeholder registered on first use.
    pub fn story(&self, name: &str) -> Arc<Story> {
        if let Some(story) = read(&self.stories).get(name) {
            return Arc::clone(story);
        }
        let mut stories = write(&self.stories);
        let story = stories.entry(name.to_string()).or_insert_with(|| {
            Arc::new(Story::new(
                name,
                paths::story_root(&self.code_path, &self.name, name),
                Arc::clone(&self.base),
            ))
        });
        Arc::clone(story)
    }

    /// All stories, base first, then by name.
    pub fn stories(&self) -> Vec<Arc<Story>> {
        let stories = read(&self.stories);
        let mut out = vec![Arc::clone(&self.base)];
        out.extend(
            stories
                .values()
                .filter(|s| !s.is_base())
                .cloned(),
        );
        out
    }
}

// ---------------------------------------------------------------------------
// Root
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Root {
    path: PathBuf,
    exclude: Option<Regex>,
    /// `None` until the first scan completes.
    profiles: RwLock<Option<BTreeMap<String, Arc<Profile>>>>,
}

impl Root {
    pub fn new(path: impl Into<PathBuf>, exclude: Option<&str>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(SwmError::EmptyRoot);
        }
        let exclude = match exclude.map(str::trim).filter(|p| !p.is_empty()) {
            Some(pattern) => Some(Regex::new(pattern)?),
            None => None,
        };
        Ok(Self {
            path,
            exclude,
            profiles: RwLock::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when a top-level directory name matches the exclusion pattern.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.as_ref().is_some_and(|re| re.is_match(name))
    }

    pub fn is_scanned(&self) -> bool {
        read(&self.profiles).is_some()
    }

    pub fn profile(&self, name: &str) -> Result<Arc<Profile>> {
        let profiles = read(&self.profiles);
        let profiles = profiles.as_ref().ok_or(SwmError::NotScanned)?;
        profiles
            .get(name)
            .cloned()
            .ok_or_else(|| SwmError::ProfileNotFound(name.to_string()))
    }

    pub fn profiles(&self) -> Result<Vec<Arc<Profile>>> {
        let profiles = read(&self.profiles);
        let profiles = profiles.as_ref().ok_or(SwmError::NotScanned)?;
        Ok(profiles.values().cloned().collect())
    }

    /// Registered profile to merge into, for additive rescans.
    pub(crate) fn existing_profile(&self, name: &str) -> Option<Arc<Profile>> {
        read(&self.profiles).as_ref()?.get(name).cloned()
    }

    pub(crate) fn register(&self, profile: Arc<Profile>) {
        write(&self.profiles)
            .get_or_insert_with(BTreeMap::new)
            .insert(profile.name.clone(), profile);
    }

    pub(crate) fn replace_all(&self, profiles: BTreeMap<String, Arc<Profile>>) {
        *write(&self.profiles) = Some(profiles);
    }

    /// Mark the index as scanned even when no profile was found.
    pub(crate) fn mark_scanned(&self) {
        write(&self.profiles).get_or_insert_with(BTreeMap::new);
    }
}
