use crate::output::print_json;
use crate::settings::Settings;
use crate::workspace::Workspace;
use anyhow::{bail, Context};
use clap::Subcommand;
use std::process::Command;
use swm_core::index::{Project, Story};
use swm_core::mux::{Handoff, Tmux};
use swm_core::{process, session};

#[derive(Subcommand)]
pub enum TmuxSubcommand {
    /// Open the session of a project, creating it and the story's worktree as needed
    SwitchClient {
        /// Import path of the project in the selected story
        #[arg(long, conflicts_with = "session")]
        project: Option<String>,
        /// Session name to switch to
        #[arg(long)]
        session: Option<String>,
    },
    /// Kill the tmux server and every session in it
    KillServer,
    /// Save and quit every vim running inside tmux
    VimExit,
}

pub fn run(settings: &Settings, subcmd: TmuxSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TmuxSubcommand::SwitchClient { project, session } => {
            switch_client(settings, project.as_deref(), session.as_deref())
        }
        TmuxSubcommand::KillServer => kill_server(settings, json),
        TmuxSubcommand::VimExit => vim_exit(settings, json),
    }
}

fn switch_client(
    settings: &Settings,
    import_path: Option<&str>,
    session_name: Option<&str>,
) -> anyhow::Result<()> {
    let ws = Workspace::open(settings)?;
    let (story, project) = match (import_path, session_name) {
        (Some(_), Some(_)) => bail!("--project and --session cannot be used together"),
        (Some(import_path), None) => {
            let story = ws.story()?;
            let project = story.project(import_path)?;
            (story, project)
        }
        (None, Some(name)) => {
            let project = session::resolve(ws.root(), name)?;
            let story = ws
                .root()
                .profile(project.profile_name())?
                .story(project.story_name());
            (story, project)
        }
        (None, None) => {
            let story = ws.story()?;
            let name = select_session(settings, &story)?;
            let project = session::project_for_session(&story, &name)?;
            (story, project)
        }
    };

    let branch = settings.branch_for(story.name())?;
    if !project.is_materialized(ws.fs()) {
        ws.provisioner()?
            .ensure(&story, &project, &branch)
            .with_context(|| format!("error preparing {} for story '{}'", project.import_path(), story.name()))?;
    }

    let tmux = Tmux::locate(&settings.config.tools.tmux)?;
    let name = project.session_name();
    if !tmux.has_session(&name)? {
        let env = session_env(settings, &story, &project, &branch)?;
        tmux.new_session(&name, &project.path(), &env)
            .with_context(|| format!("error creating session {name}"))?;
    }
    let inside = std::env::var_os("TMUX").is_some_and(|v| !v.is_empty());
    hand_off(tmux.focus(&name, inside)?)
}

/// Environment for a new session so tools inside it know where they are.
fn session_env(
    settings: &Settings,
    story: &Story,
    project: &Project,
    branch: &str,
) -> anyhow::Result<Vec<(String, String)>> {
    Ok(vec![
        ("SWM_CODE_PATH".to_string(), settings.code_path()?.display().to_string()),
        ("SWM_PROFILE".to_string(), project.profile_name().to_string()),
        ("SWM_STORY_NAME".to_string(), story.name().to_string()),
        ("SWM_STORY_BRANCH_NAME".to_string(), branch.to_string()),
    ])
}

/// Let the user pick one of the story's sessions with the fuzzy selector.
fn select_session(settings: &Settings, story: &Story) -> anyhow::Result<String> {
    let names: Vec<String> = session::session_map(story).into_keys().collect();
    if names.is_empty() {
        bail!("story '{}' has no projects", story.name());
    }
    let fzf = process::resolve_tool(&settings.config.tools.fzf)?;
    let input = names.join("\n");
    let output = process::run_with_input(&fzf, &["--no-multi"], input.as_bytes())
        .context("fuzzy selector failed")?;
    let choice = output.stdout.trim();
    if !output.success() || choice.is_empty() {
        bail!("no project selected");
    }
    Ok(choice.to_string())
}

/// Returns only when there is nothing to hand off or the exec failed.
fn hand_off(handoff: Handoff) -> anyhow::Result<()> {
    let (program, args) = match handoff {
        Handoff::Returned => return Ok(()),
        Handoff::Replace { program, args } => (program, args),
    };
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let err = Command::new(&program).args(&args).exec();
        Err(err).with_context(|| format!("failed to exec {}", program.display()))
    }
    #[cfg(not(unix))]
    {
        let status = Command::new(&program)
            .args(&args)
            .status()
            .with_context(|| format!("failed to run {}", program.display()))?;
        if !status.success() {
            bail!("{} exited with {status}", program.display());
        }
        Ok(())
    }
}

fn kill_server(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let tmux = Tmux::locate(&settings.config.tools.tmux)?;
    tmux.kill_server().context("error killing the tmux server")?;
    if json {
        print_json(&serde_json::json!({ "killed": true }))?;
    }
    Ok(())
}

fn vim_exit(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let tmux = Tmux::locate(&settings.config.tools.tmux)?;
    let ps = process::resolve_tool(&settings.config.tools.ps)?;
    let closed = tmux
        .exit_editors(&ps)
        .context("error closing vim sessions")?;
    if json {
        print_json(&serde_json::json!({ "closed": closed }))?;
    } else {
        println!("Closed {closed} vim session(s)");
    }
    Ok(())
}
