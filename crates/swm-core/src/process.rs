//! Subprocess helpers shared by git, hooks, tmux and the selector.

use crate::error::{Result, SwmError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

#[derive(Debug)]
pub struct CmdOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Trimmed stdout and stderr joined, for error messages.
    pub fn combined(&self) -> String {
        let out = self.stdout.trim();
        let err = self.stderr.trim();
        match (out.is_empty(), err.is_empty()) {
            (true, true) => format!("exited with {}", self.status),
            (false, true) => out.to_string(),
            (true, false) => err.to_string(),
            (false, false) => format!("{out}\n{err}"),
        }
    }
}

/// Resolve a binary on PATH.
pub fn resolve_tool(bin: &str) -> Result<PathBuf> {
    which::which(bin).map_err(|_| SwmError::ToolNotInstalled(bin.to_string()))
}

pub fn run_capture<S: AsRef<str>>(
    program: &Path,
    args: &[S],
    cwd: Option<&Path>,
) -> Result<CmdOutput> {
    let mut command = Command::new(program);
    command.args(args.iter().map(AsRef::as_ref));
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    let output = command.output()?;
    Ok(CmdOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Like [`run_capture`] but feeds `input` on stdin and leaves stderr on the
/// terminal, which interactive tools draw on.
pub fn run_with_input<S: AsRef<str>>(program: &Path, args: &[S], input: &[u8]) -> Result<CmdOutput> {
    let mut command = Command::new(program);
    command.args(args.iter().map(AsRef::as_ref));
    command.stdin(Stdio::piped());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::inherit());

    let mut child = command.spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input)?;
    }
    let output = child.wait_with_output()?;
    Ok(CmdOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::new(),
    })
}

/// Run and fail with the captured output on a non-zero exit.
pub fn run_checked<S: AsRef<str>>(program: &Path, args: &[S], cwd: Option<&Path>) -> Result<CmdOutput> {
    let output = run_capture(program, args, cwd)?;
    if !output.success() {
        return Err(SwmError::CommandFailed {
            command: display_command(program, args),
            output: output.combined(),
        });
    }
    Ok(output)
}

pub fn display_command<S: AsRef<str>>(program: &Path, args: &[S]) -> String {
    let name = program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string());
    std::iter::once(name)
        .chain(args.iter().map(|a| a.as_ref().to_string()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn run_checked_reports_output() {
        let sh = resolve_tool("sh").unwrap();
        let err = run_checked(&sh, &["-c", "echo boom >&2; exit 3"], None).unwrap_err();
        match err {
            SwmError::CommandFailed { command, output } => {
                assert_eq!(command, "sh -c echo boom >&2; exit 3");
                assert_eq!(output, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn run_capture_uses_cwd() {
        let dir = tempfile::TempDir::new().unwrap();
        let sh = resolve_tool("sh").unwrap();
        let out = run_capture(&sh, &["-c", "pwd"], Some(dir.path())).unwrap();
        assert!(out.success());
        let printed = std::fs::canonicalize(out.stdout.trim()).unwrap();
        assert_eq!(printed, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn run_with_input_pipes_stdin() {
        let cat = resolve_tool("cat").unwrap();
        let out = run_with_input(&cat, &[] as &[&str], b"a\nb\n").unwrap();
        assert_eq!(out.stdout, "a\nb\n");
    }

    #[test]
    fn missing_tool_is_reported() {
        assert!(matches!(
            resolve_tool("swm-definitely-not-a-binary"),
            Err(SwmError::ToolNotInstalled(_))
        ));
    }
}
