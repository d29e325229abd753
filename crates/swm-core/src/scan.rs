//! Concurrent discovery of profiles, stories and projects.
//!
//! Fan-out runs on a bounded `rayon` pool: one task per profile, one per
//! story and one per directory under a story's `src`. A directory holding
//! the VCS marker is a project and is never descended into.
//!
//! Each story funnels discovered import paths through a bounded channel to a
//! drain thread that records them. A story's scan finishes only after every
//! walk task has returned, the channel has been closed and the drain thread
//! has acknowledged the last record.

use crate::error::{Result, SwmError};
use crate::fs::Fs;
use crate::index::{Profile, Root, Story};
use crate::paths;
use crossbeam_channel::Sender;
use rayon::{Scope, ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

const PROJECT_CHANNEL_CAP: usize = 64;

/// What a rescan does with entries that vanished from disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescanMode {
    /// Merge into the existing index; nothing is ever removed.
    #[default]
    Additive,
    /// Swap in a freshly built index once the scan completes.
    Replace,
}

/// A subtree that could not be read and was left out of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub profiles: usize,
    pub stories: usize,
    pub projects: usize,
    pub issues: Vec<ScanIssue>,
}

#[derive(Debug, Default)]
struct Tally {
    stories: usize,
    projects: usize,
}

pub struct Scanner {
    fs: Arc<dyn Fs>,
    pool: ThreadPool,
    mode: RescanMode,
}

impl Scanner {
    /// `concurrency` caps the worker threads; `0` lets rayon pick one per core.
    pub fn new(fs: Arc<dyn Fs>, concurrency: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|i| format!("swm-scan-{i}"))
            .build()?;
        Ok(Self {
            fs,
            pool,
            mode: RescanMode::default(),
        })
    }

    pub fn with_mode(mut self, mode: RescanMode) -> Self {
        self.mode = mode;
        self
    }

    /// Populate `root` from disk.
    ///
    /// Only an unreadable root is an error. Unreadable subtrees are logged,
    /// skipped and listed in the report; their siblings are still indexed.
    pub fn scan(&self, root: &Root) -> Result<ScanReport> {
        let entries = match self.fs.read_dir(root.path()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SwmError::RootNotFound(root.path().to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };

        let candidates: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.is_dir)
            .map(|entry| entry.name)
            .filter(|name| {
                let excluded = root.is_excluded(name);
                if excluded {
                    tracing::debug!(profile = %name, "excluded by pattern");
                }
                !excluded
            })
            .filter(|name| {
                let valid = paths::is_valid_profile_name(name);
                if !valid {
                    tracing::warn!(profile = %name, "profile name contains '@', skipping");
                }
                valid
            })
            .collect();

        let issues = Mutex::new(Vec::new());
        let found = Mutex::new(Vec::new());
        self.pool.scope(|s| {
            for name in &candidates {
                let (issues, found) = (&issues, &found);
                s.spawn(move |_| {
                    if let Some(scanned) = self.scan_profile(root, name, issues) {
                        lock(found).push(scanned);
                    }
                });
            }
        });

        let found = found.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut report = ScanReport {
            profiles: found.len(),
            issues: issues.into_inner().unwrap_or_else(PoisonError::into_inner),
            ..ScanReport::default()
        };
        let mut replacement = BTreeMap::new();
        for (profile, tally) in found {
            report.stories += tally.stories;
            report.projects += tally.projects;
            replacement.insert(profile.name().to_string(), profile);
        }
        match self.mode {
            RescanMode::Additive => root.mark_scanned(),
            RescanMode::Replace => root.replace_all(replacement),
        }

        tracing::debug!(
            root = %root.path().display(),
            profiles = report.profiles,
            stories = report.stories,
            projects = report.projects,
            issues = report.issues.len(),
            "scan complete"
        );
        Ok(report)
    }

    fn scan_profile(
        &self,
        root: &Root,
        name: &str,
        issues: &Mutex<Vec<ScanIssue>>,
    ) -> Option<(Arc<Profile>, Tally)> {
        let base_root = paths::base_story_root(root.path(), name);
        if !self.fs.is_dir(&base_root) {
            tracing::debug!(profile = %name, path = %base_root.display(), "no base story, skipping");
            return None;
        }

        let profile = match self.mode {
            RescanMode::Additive => root
                .existing_profile(name)
                .unwrap_or_else(|| Arc::new(Profile::new(root.path(), name))),
            RescanMode::Replace => Arc::new(Profile::new(root.path(), name)),
        };

        let mut stories = vec![profile.base()];
        let stories_dir = paths::stories_dir(root.path(), name);
        match self.fs.read_dir(&stories_dir) {
            Ok(entries) => stories.extend(
                entries
                    .into_iter()
                    .filter(|entry| entry.is_dir)
                    .filter(|entry| match paths::validate_story_name(&entry.name) {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!(profile = %name, error = %e, "skipping story directory");
                            false
                        }
                    })
                    .map(|entry| profile.story(&entry.name)),
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => record(issues, stories_dir, &e),
        }

        let counts = Mutex::new(Vec::with_capacity(stories.len()));
        self.pool.scope(|s| {
            for story in &stories {
                let (counts, issues) = (&counts, issues);
                s.spawn(move |_| {
                    let applied = self.scan_story(story, issues);
                    lock(counts).push(applied);
                });
            }
        });

        let counts = counts.into_inner().unwrap_or_else(PoisonError::into_inner);
        let tally = Tally {
            stories: counts.len(),
            projects: counts.iter().sum(),
        };
        if self.mode == RescanMode::Additive {
            root.register(Arc::clone(&profile));
        }
        Some((profile, tally))
    }

    /// Walk `story/src` and record every project found. Returns the number
    /// of import paths the drain thread applied.
    fn scan_story(&self, story: &Story, issues: &Mutex<Vec<ScanIssue>>) -> usize {
        let src = paths::src_dir(story.root());
        let (tx, rx) = crossbeam_channel::bounded::<String>(PROJECT_CHANNEL_CAP);

        std::thread::scope(|ts| {
            let drain = ts.spawn(move || {
                let mut applied = 0usize;
                for import_path in rx {
                    story.add_project(&import_path);
                    applied += 1;
                }
                applied
            });

            let producer = tx.clone();
            self.pool
                .scope(|s| self.walk(s, src, String::new(), producer, issues));
            // Every producer has returned; closing the last sender ends the drain loop.
            drop(tx);

            let applied = drain
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
            tracing::debug!(
                profile = %story.profile_name(),
                story = %story.name(),
                projects = applied,
                "story scanned"
            );
            applied
        })
    }

    fn walk<'s>(
        &'s self,
        scope: &Scope<'s>,
        dir: PathBuf,
        rel: String,
        tx: Sender<String>,
        issues: &'s Mutex<Vec<ScanIssue>>,
    ) {
        if !rel.is_empty() && self.fs.exists(&dir.join(paths::VCS_MARKER)) {
            if tx.send(rel).is_err() {
                tracing::debug!(path = %dir.display(), "drain closed before project was recorded");
            }
            return;
        }

        let entries = match self.fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return,
            Err(e) => {
                record(issues, dir, &e);
                return;
            }
        };

        for entry in entries.into_iter().filter(|entry| entry.is_dir) {
            let child = dir.join(&entry.name);
            let rel = if rel.is_empty() {
                entry.name
            } else {
                format!("{rel}/{}", entry.name)
            };
            let tx = tx.clone();
            scope.spawn(move |s| self.walk(s, child, rel, tx, issues));
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record(issues: &Mutex<Vec<ScanIssue>>, path: PathBuf, err: &std::io::Error) {
    tracing::warn!(path = %path.display(), error = %err, "cannot read directory, skipping subtree");
    lock(issues).push(ScanIssue {
        path,
        message: err.to_string(),
    });
}
