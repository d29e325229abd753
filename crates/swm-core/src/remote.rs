//! Remote repository URLs.
//!
//! Accepts the SCP-like shorthand (`git@host:owner/repo.git`) and the
//! `ssh://`, `http://` and `https://` forms, each with or without a username
//! and a `.git` suffix. A parsed [`RemoteUrl`] displays back to the exact
//! input string.

use crate::error::{Result, SwmError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static REMOTE_RE: OnceLock<Regex> = OnceLock::new();

fn remote_re() -> &'static Regex {
    REMOTE_RE.get_or_init(|| {
        Regex::new(
            r"^(?:(?P<scheme>ssh|https?)://)?(?:(?P<username>[^@/:]+)@)?(?P<hostname>[^@/:]+)(?P<separator>[:/])(?P<path>.+?)(?P<extension>\.git)?$",
        )
        .unwrap()
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUrl {
    pub scheme: Option<String>,
    pub username: Option<String>,
    pub hostname: String,
    /// `:` for the SCP-like form, `/` otherwise.
    pub separator: char,
    pub path: String,
    pub extension: Option<String>,
}

impl RemoteUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let caps = remote_re()
            .captures(raw)
            .ok_or_else(|| SwmError::InvalidRemoteUrl(raw.to_string()))?;
        let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

        let separator = match caps.name("separator").map(|m| m.as_str()) {
            Some(":") => ':',
            Some("/") => '/',
            _ => return Err(SwmError::InvalidRemoteUrl(raw.to_string())),
        };

        Ok(Self {
            scheme: group("scheme"),
            username: group("username"),
            hostname: group("hostname").unwrap_or_default(),
            separator,
            path: group("path").unwrap_or_default(),
            extension: group("extension"),
        })
    }

    /// `hostname/path`, the location of the project below a story's `src`.
    pub fn import_path(&self) -> Result<String> {
        let path = self.path.trim_matches('/');
        if self.hostname.is_empty() || path.is_empty() {
            return Err(SwmError::EmptyImportPath(self.to_string()));
        }
        Ok(format!("{}/{}", self.hostname, path))
    }
}

impl FromStr for RemoteUrl {
    type Err = SwmError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}://")?;
        }
        if let Some(username) = &self.username {
            write!(f, "{username}@")?;
        }
        write!(f, "{}{}{}", self.hostname, self.separator, self.path)?;
        if let Some(extension) = &self.extension {
            f.write_str(extension)?;
        }
        Ok(())
    }
}
