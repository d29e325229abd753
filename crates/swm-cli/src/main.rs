mod cmd;
mod output;
mod settings;
mod workspace;

use clap::{Parser, Subcommand};
use cmd::{code::CodeSubcommand, story::StorySubcommand, tmux::TmuxSubcommand};
use settings::{Overrides, Settings};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "swm",
    about = "Story workflow manager: one git worktree per story, one tmux session per project",
    version,
    propagate_version = true
)]
struct Cli {
    /// Root of the code tree (<code>/<profile>/base, <code>/<profile>/stories/<story>)
    #[arg(long, global = true, env = "SWM_CODE_PATH")]
    code_path: Option<OsString>,

    /// Regex of top-level directories to skip while scanning
    #[arg(long, global = true, env = "SWM_IGNORE_PATTERN")]
    ignore_pattern: Option<String>,

    /// Profile to work in (default: the only profile, if there is one)
    #[arg(long, global = true, env = "SWM_PROFILE")]
    profile: Option<String>,

    /// Story to work in (default: base)
    #[arg(long, global = true, env = "SWM_STORY_NAME")]
    story: Option<String>,

    /// Config file (default: ~/.config/swm/config.yaml)
    #[arg(long, global = true, env = "SWM_CONFIG")]
    config: Option<OsString>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log debug output to stderr
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan, list and clone projects
    Code {
        #[command(subcommand)]
        subcommand: CodeSubcommand,
    },

    /// Manage story records
    Story {
        #[command(subcommand)]
        subcommand: StorySubcommand,
    },

    /// Drive tmux sessions for projects
    Tmux {
        #[command(subcommand)]
        subcommand: TmuxSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Paths arrive as OsString so an empty value reaches the fallback
    // chain instead of being rejected by clap's PathBuf parser.
    let overrides = Overrides {
        code_path: cli.code_path.map(PathBuf::from),
        ignore_pattern: cli.ignore_pattern,
        profile: cli.profile,
        story: cli.story,
        config: cli.config.map(PathBuf::from),
    };

    let result = Settings::resolve(overrides).and_then(|settings| match cli.command {
        Commands::Code { subcommand } => cmd::code::run(&settings, subcommand, cli.json),
        Commands::Story { subcommand } => cmd::story::run(&settings, subcommand, cli.json),
        Commands::Tmux { subcommand } => cmd::tmux::run(&settings, subcommand, cli.json),
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
