//! Flat session names for every project a story can open.

use crate::error::{Result, SwmError};
use crate::index::{Project, Root, Story};
use crate::paths;
use std::collections::BTreeMap;

/// Session name → project for the story's own projects plus every base
/// project it does not override, rebound to the story.
pub fn session_map(story: &Story) -> BTreeMap<String, Project> {
    let mut map: BTreeMap<String, Project> = story
        .projects()
        .into_iter()
        .map(|p| (p.session_name(), p))
        .collect();
    if let Some(base) = story.base() {
        for import_path in base.import_paths() {
            if story.contains(&import_path) {
                continue;
            }
            if let Ok(project) = story.project(&import_path) {
                map.insert(project.session_name(), project);
            }
        }
    }
    map
}

pub fn project_for_session(story: &Story, session: &str) -> Result<Project> {
    session_map(story)
        .remove(session)
        .ok_or_else(|| SwmError::SessionNotFound(session.to_string()))
}

/// Resolve a session name against the whole index, using the profile and
/// story encoded in the name. A story with no checkout yet still resolves
/// through its base projects.
pub fn resolve(root: &Root, session: &str) -> Result<Project> {
    let (profile, story, _) = paths::parse_session_name(session)
        .ok_or_else(|| SwmError::SessionNotFound(session.to_string()))?;
    let story = root.profile(&profile)?.story(&story);
    project_for_session(&story, session)
}
