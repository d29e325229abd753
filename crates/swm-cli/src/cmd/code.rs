use crate::output::{print_json, print_table};
use crate::settings::Settings;
use crate::workspace::Workspace;
use anyhow::Context;
use clap::Subcommand;
use serde::Serialize;
use swm_core::fs::Fs;
use swm_core::index::Project;
use swm_core::provision::Provisioned;
use swm_core::remote::RemoteUrl;
use swm_core::session;

#[derive(Subcommand)]
pub enum CodeSubcommand {
    /// Scan the code path and report what was found
    Scan,
    /// List projects of the selected story, including those it inherits from base
    List {
        /// List the projects of every story in every profile
        #[arg(long)]
        all: bool,
    },
    /// Clone a repository into the base story of the profile
    Clone {
        url: String,
    },
    /// Print the path of a project in the selected story
    Path {
        import_path: String,
        /// Create the story's worktree when it is missing
        #[arg(long)]
        ensure: bool,
    },
}

#[derive(Serialize)]
struct ProjectRow {
    profile: String,
    story: String,
    import_path: String,
    path: String,
    session: String,
    materialized: bool,
}

impl ProjectRow {
    fn new(project: &Project, fs: &dyn Fs) -> Self {
        Self {
            profile: project.profile_name().to_string(),
            story: project.story_name().to_string(),
            import_path: project.import_path().to_string(),
            path: project.path().display().to_string(),
            session: project.session_name(),
            materialized: project.is_materialized(fs),
        }
    }
}

pub fn run(settings: &Settings, subcmd: CodeSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CodeSubcommand::Scan => scan(settings, json),
        CodeSubcommand::List { all } => list(settings, all, json),
        CodeSubcommand::Clone { url } => clone(settings, &url, json),
        CodeSubcommand::Path {
            import_path,
            ensure,
        } => path(settings, &import_path, ensure, json),
    }
}

fn scan(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(settings)?;
    let report = ws.report();
    if json {
        return print_json(report);
    }
    println!(
        "{} profiles, {} stories, {} projects",
        report.profiles, report.stories, report.projects
    );
    for issue in &report.issues {
        println!("skipped {}: {}", issue.path.display(), issue.message);
    }
    Ok(())
}

fn list(settings: &Settings, all: bool, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(settings)?;
    let mut rows = Vec::new();
    if all {
        for profile in ws.root().profiles()? {
            for story in profile.stories() {
                rows.extend(story.projects().iter().map(|p| ProjectRow::new(p, ws.fs())));
            }
        }
    } else {
        let story = ws.story()?;
        rows.extend(
            session::session_map(&story)
                .values()
                .map(|p| ProjectRow::new(p, ws.fs())),
        );
    }

    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("No projects.");
        return Ok(());
    }
    let table: Vec<Vec<String>> = rows
        .into_iter()
        .map(|r| {
            let state = if r.materialized { "materialized" } else { "virtual" };
            vec![
                format!("{}/{}", r.profile, r.story),
                r.import_path,
                state.to_string(),
                r.path,
            ]
        })
        .collect();
    print_table(&["STORY", "PROJECT", "STATE", "PATH"], &table);
    Ok(())
}

fn clone(settings: &Settings, url: &str, json: bool) -> anyhow::Result<()> {
    RemoteUrl::parse(url).with_context(|| format!("cannot clone {url}"))?;

    let ws = Workspace::open(settings)?;
    let profile = ws.profile()?;
    let provisioner = ws.provisioner()?;
    let (mut project, mut outcome) = provisioner
        .clone_into_base(&profile, url)
        .with_context(|| format!("error cloning {url}"))?;

    let story = profile.story(settings.story_name());
    if !story.is_base() {
        let branch = settings.branch_for(story.name())?;
        project = story.project(project.import_path())?;
        outcome = provisioner
            .ensure(&story, &project, &branch)
            .with_context(|| format!("error adding {} to story '{}'", project.import_path(), story.name()))?;
    }

    let created = outcome == Provisioned::Created;
    if json {
        print_json(&serde_json::json!({
            "import_path": project.import_path(),
            "path": project.path(),
            "created": created,
        }))?;
    } else if created {
        println!("Cloned {} into {}", url, project.path().display());
    } else {
        println!("Already present: {}", project.path().display());
    }
    Ok(())
}

fn path(settings: &Settings, import_path: &str, ensure: bool, json: bool) -> anyhow::Result<()> {
    let ws = Workspace::open(settings)?;
    let story = ws.story()?;
    let project = story.project(import_path)?;
    if ensure && !project.is_materialized(ws.fs()) {
        let branch = settings.branch_for(story.name())?;
        ws.provisioner()?
            .ensure(&story, &project, &branch)
            .with_context(|| format!("error provisioning {import_path} for story '{}'", story.name()))?;
    }

    if json {
        print_json(&ProjectRow::new(&project, ws.fs()))?;
    } else {
        println!("{}", project.path().display());
    }
    Ok(())
}
