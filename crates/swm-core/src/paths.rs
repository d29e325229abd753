use crate::error::{Result, SwmError};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

pub const BASE_STORY: &str = "base";
pub const STORIES_DIR: &str = "stories";
pub const SRC_DIR: &str = "src";

/// Entry whose presence marks a directory as a project.
pub const VCS_MARKER: &str = ".git";

/// Separates the profile from the rest of a session name.
pub const PROFILE_SEPARATOR: char = '@';
/// Separates the story from the import path in a session name.
pub const STORY_SEPARATOR: char = '=';

/// Replacement for `.` inside session names.
pub const DOT_REPLACEMENT: char = '\u{2022}';
/// Replacement for `:` inside session names.
pub const COLON_REPLACEMENT: char = '\u{FF1A}';

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn profile_path(root: &Path, profile: &str) -> PathBuf {
    root.join(profile)
}

pub fn base_story_root(root: &Path, profile: &str) -> PathBuf {
    profile_path(root, profile).join(BASE_STORY)
}

pub fn stories_dir(root: &Path, profile: &str) -> PathBuf {
    profile_path(root, profile).join(STORIES_DIR)
}

pub fn story_root(root: &Path, profile: &str, story: &str) -> PathBuf {
    if story == BASE_STORY {
        return base_story_root(root, profile);
    }
    stories_dir(root, profile).join(story)
}

pub fn src_dir(story_root: &Path) -> PathBuf {
    story_root.join(SRC_DIR)
}

pub fn project_path(story_root: &Path, import_path: &str) -> PathBuf {
    src_dir(story_root).join(import_path)
}

// ---------------------------------------------------------------------------
// Session names
// ---------------------------------------------------------------------------

/// `profile@story=import-path`, with `.` and `:` swapped for look-alikes so
/// tmux does not read them as target separators.
pub fn session_name(profile: &str, story: &str, import_path: &str) -> String {
    format!(
        "{profile}{PROFILE_SEPARATOR}{story}{STORY_SEPARATOR}{}",
        sanitize(import_path)
    )
}

pub fn sanitize(import_path: &str) -> String {
    import_path
        .chars()
        .map(|c| match c {
            '.' => DOT_REPLACEMENT,
            ':' => COLON_REPLACEMENT,
            other => other,
        })
        .collect()
}

pub fn desanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            DOT_REPLACEMENT => '.',
            COLON_REPLACEMENT => ':',
            other => other,
        })
        .collect()
}

/// Split a session name back into `(profile, story, import_path)`.
pub fn parse_session_name(name: &str) -> Option<(String, String, String)> {
    let (profile, rest) = name.split_once(PROFILE_SEPARATOR)?;
    let (story, import_path) = rest.split_once(STORY_SEPARATOR)?;
    if profile.is_empty() || story.is_empty() || import_path.is_empty() {
        return None;
    }
    Some((
        profile.to_string(),
        story.to_string(),
        desanitize(import_path),
    ))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate_story_name(name: &str) -> Result<()> {
    if name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name.contains(PROFILE_SEPARATOR)
        || name.contains(STORY_SEPARATOR)
    {
        return Err(SwmError::InvalidStoryName(name.to_string()));
    }
    Ok(())
}

/// A profile directory whose name holds the profile separator would yield
/// session names that split in the wrong place.
pub fn is_valid_profile_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(PROFILE_SEPARATOR)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
