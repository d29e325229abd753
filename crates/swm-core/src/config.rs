use crate::error::Result;
use crate::hooks::Hooks;
use crate::scan::RescanMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "SWM_CONFIG";

// ---------------------------------------------------------------------------
// ScanConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Worker pool size; 0 picks the available parallelism.
    #[serde(default)]
    pub concurrency: usize,
    #[serde(default)]
    pub rescan: RescanMode,
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tools {
    #[serde(default = "default_git")]
    pub git: String,
    #[serde(default = "default_tmux")]
    pub tmux: String,
    #[serde(default = "default_fzf")]
    pub fzf: String,
    #[serde(default = "default_ps")]
    pub ps: String,
}

fn default_git() -> String {
    "git".to_string()
}

fn default_tmux() -> String {
    "tmux".to_string()
}

fn default_fzf() -> String {
    "fzf".to_string()
}

fn default_ps() -> String {
    "ps".to_string()
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            git: default_git(),
            tmux: default_tmux(),
            fzf: default_fzf(),
            ps: default_ps(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub hooks: Hooks,
    #[serde(default)]
    pub tools: Tools,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    /// Read the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// `$SWM_CONFIG`, else `~/.config/swm/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(path));
        }
        home::home_dir().map(|h| h.join(".config").join("swm").join("config.yaml"))
    }

    /// Where story records live: the configured directory, else
    /// `~/.local/share/swm`.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| home::home_dir().map(|h| h.join(".local").join("share").join("swm")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_or_empty_file_is_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        assert_eq!(Config::load(&path).unwrap(), Config::default());
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "code_path: /home/me/code\nscan:\n  rescan: replace\ntools:\n  tmux: /opt/bin/tmux\nhooks:\n  post: /etc/swm/post.d\n",
        )
        .unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.code_path.as_deref(), Some(Path::new("/home/me/code")));
        assert_eq!(cfg.scan.rescan, RescanMode::Replace);
        assert_eq!(cfg.scan.concurrency, 0);
        assert_eq!(cfg.tools.tmux, "/opt/bin/tmux");
        assert_eq!(cfg.tools.git, "git");
        assert_eq!(cfg.hooks.post.as_deref(), Some(Path::new("/etc/swm/post.d")));
        assert!(cfg.hooks.pre.is_none());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "scan: [not, a, map]\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn explicit_data_dir_wins() {
        let cfg = Config {
            data_dir: Some(PathBuf::from("/var/swm")),
            ..Config::default()
        };
        assert_eq!(cfg.data_dir(), Some(PathBuf::from("/var/swm")));
    }
}
