//! tmux plumbing: argument lists, output parsing and the attach handoff.

use crate::error::{Result, SwmError};
use crate::process::{self, CmdOutput};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// What the caller must do after asking to bring a session to the front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    /// Replace the current process with `program args…`; a successful
    /// replacement never returns.
    Replace { program: PathBuf, args: Vec<String> },
    /// The work is done and control returns normally.
    Returned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pane {
    pub id: String,
    pub tty: String,
}

pub struct Tmux {
    bin: PathBuf,
}

impl Tmux {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn locate(name: &str) -> Result<Self> {
        Ok(Self::new(process::resolve_tool(name)?))
    }

    fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<CmdOutput> {
        process::run_checked(&self.bin, args, None)
    }

    /// Names of running sessions. No server means no sessions.
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        let output = process::run_capture(&self.bin, &["list-sessions", "-F", "#{session_name}"], None)?;
        if !output.success() {
            if is_no_server(&output.stderr) {
                return Ok(Vec::new());
            }
            return Err(SwmError::CommandFailed {
                command: "tmux list-sessions".to_string(),
                output: output.combined(),
            });
        }
        Ok(non_empty_lines(&output.stdout))
    }

    pub fn has_session(&self, name: &str) -> Result<bool> {
        Ok(self.list_sessions()?.iter().any(|s| s == name))
    }

    pub fn new_session(&self, name: &str, dir: &Path, env: &[(String, String)]) -> Result<()> {
        tracing::info!(session = name, dir = %dir.display(), "creating tmux session");
        self.run(&new_session_args(name, dir, env))?;
        Ok(())
    }

    /// Bring `name` to the front: switch the current client when running
    /// inside tmux, otherwise hand off to `tmux attach-session`.
    pub fn focus(&self, name: &str, inside_tmux: bool) -> Result<Handoff> {
        let target = exact_target(name);
        if inside_tmux {
            self.run(&["switch-client", "-t", target.as_str()])?;
            return Ok(Handoff::Returned);
        }
        Ok(Handoff::Replace {
            program: self.bin.clone(),
            args: vec!["attach-session".to_string(), "-t".to_string(), target],
        })
    }

    pub fn kill_server(&self) -> Result<()> {
        let output = process::run_capture(&self.bin, &["kill-server"], None)?;
        if !output.success() && !is_no_server(&output.stderr) {
            return Err(SwmError::CommandFailed {
                command: "tmux kill-server".to_string(),
                output: output.combined(),
            });
        }
        Ok(())
    }

    pub fn list_panes(&self) -> Result<Vec<Pane>> {
        let output = process::run_capture(
            &self.bin,
            &["list-panes", "-a", "-F", "#{pane_id} #{pane_tty}"],
            None,
        )?;
        if !output.success() {
            if is_no_server(&output.stderr) {
                return Ok(Vec::new());
            }
            return Err(SwmError::CommandFailed {
                command: "tmux list-panes".to_string(),
                output: output.combined(),
            });
        }
        Ok(parse_panes(&output.stdout))
    }

    pub fn send_keys(&self, target: &str, keys: &[&str]) -> Result<()> {
        let mut args = vec!["send-keys", "-t", target];
        args.extend_from_slice(keys);
        self.run(&args)?;
        Ok(())
    }

    /// Panes whose foreground process is a vim-family editor, judged by
    /// `ps` output for the pane's terminal.
    pub fn editor_panes(&self, ps: &Path) -> Result<Vec<Pane>> {
        let mut found = Vec::new();
        for pane in self.list_panes()? {
            let output = process::run_capture(
                ps,
                &["-o", "state=", "-o", "comm=", "-t", pane.tty.as_str()],
                None,
            )?;
            if output.stdout.lines().any(is_editor_process) {
                found.push(pane);
            }
        }
        Ok(found)
    }

    /// Ask every editor pane to write and quit.
    pub fn exit_editors(&self, ps: &Path) -> Result<usize> {
        let panes = self.editor_panes(ps)?;
        for pane in &panes {
            tracing::info!(pane = %pane.id, tty = %pane.tty, "closing editor");
            self.send_keys(&pane.id, &["Escape", ":wqa", "Enter"])?;
        }
        Ok(panes.len())
    }
}

pub fn new_session_args(name: &str, dir: &Path, env: &[(String, String)]) -> Vec<String> {
    let mut args = vec![
        "new-session".to_string(),
        "-d".to_string(),
        "-s".to_string(),
        name.to_string(),
        "-c".to_string(),
        dir.display().to_string(),
    ];
    for (key, value) in env {
        args.push("-e".to_string());
        args.push(format!("{key}={value}"));
    }
    args
}

/// `=name` makes tmux match the session name exactly instead of by prefix.
pub fn exact_target(name: &str) -> String {
    format!("={name}")
}

pub fn parse_panes(raw: &str) -> Vec<Pane> {
    raw.lines()
        .filter_map(|line| {
            let (id, tty) = line.trim().split_once(' ')?;
            Some(Pane {
                id: id.to_string(),
                tty: tty.trim().to_string(),
            })
        })
        .collect()
}

static EDITOR_RE: OnceLock<Regex> = OnceLock::new();

/// Matches a `ps -o state= -o comm=` line for a running vim, nvim, view or
/// vimdiff process.
pub fn is_editor_process(line: &str) -> bool {
    EDITOR_RE
        .get_or_init(|| Regex::new(r"^\s*[^TXZ ]+ +(\S+/)?g?(view|n?vim?x?)(diff)?$").unwrap())
        .is_match(line.trim_end())
}

fn is_no_server(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no server running") || stderr.contains("error connecting to")
}

fn non_empty_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_injects_environment() {
        let args = new_session_args(
            "acme@T1=github\u{2022}com/x/y",
            Path::new("/code/acme/stories/T1/src/github.com/x/y"),
            &[
                ("SWM_PROFILE".to_string(), "acme".to_string()),
                ("SWM_STORY_NAME".to_string(), "T1".to_string()),
            ],
        );
        assert_eq!(
            args,
            vec![
                "new-session",
                "-d",
                "-s",
                "acme@T1=github\u{2022}com/x/y",
                "-c",
                "/code/acme/stories/T1/src/github.com/x/y",
                "-e",
                "SWM_PROFILE=acme",
                "-e",
                "SWM_STORY_NAME=T1",
            ]
        );
    }

    #[test]
    fn focus_outside_tmux_hands_off_to_attach() {
        let tmux = Tmux::new("/usr/bin/tmux");
        let handoff = tmux.focus("acme@base=x", false).unwrap();
        assert_eq!(
            handoff,
            Handoff::Replace {
                program: PathBuf::from("/usr/bin/tmux"),
                args: vec!["attach-session".into(), "-t".into(), "=acme@base=x".into()],
            }
        );
    }

    #[test]
    fn panes_parse() {
        let panes = parse_panes("%1 /dev/pts/3\n%12 /dev/pts/10\n\ngarbage\n");
        assert_eq!(
            panes,
            vec![
                Pane { id: "%1".into(), tty: "/dev/pts/3".into() },
                Pane { id: "%12".into(), tty: "/dev/pts/10".into() },
            ]
        );
    }

    #[test]
    fn editor_detection() {
        for line in ["S+   vim", "S+   nvim", "R+ /usr/bin/vim", "S+   view", "S+   vimdiff", "Ss+  gvim"] {
            assert!(is_editor_process(line), "expected editor: {line:?}");
        }
        for line in ["Ss   zsh", "T+   vim", "Z    nvim", "S+   vimtutor-ish", "S+   less"] {
            assert!(!is_editor_process(line), "expected non-editor: {line:?}");
        }
    }

    #[test]
    fn no_server_messages() {
        assert!(is_no_server("no server running on /tmp/tmux-1000/default\n"));
        assert!(is_no_server("error connecting to /tmp/tmux-1000/default (No such file or directory)"));
        assert!(!is_no_server("can't find session: foo"));
    }
}
