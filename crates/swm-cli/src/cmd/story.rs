use crate::output::{print_json, print_table};
use crate::settings::Settings;
use crate::workspace::Workspace;
use anyhow::{bail, Context};
use clap::Subcommand;
use swm_core::paths;
use swm_core::record::StoryRecord;

#[derive(Subcommand)]
pub enum StorySubcommand {
    /// Record a new story and optionally check out projects for it
    Create {
        name: String,
        /// Branch for the story's worktrees (default: the story name)
        #[arg(long)]
        branch: Option<String>,
        /// Import path to check out into the story (repeatable)
        #[arg(long = "project")]
        projects: Vec<String>,
    },
    /// List recorded stories
    List,
    /// Remove a story record (worktrees stay on disk)
    Remove { name: String },
    /// Show a story record (default: the selected story)
    Show { name: Option<String> },
}

pub fn run(settings: &Settings, subcmd: StorySubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        StorySubcommand::Create {
            name,
            branch,
            projects,
        } => create(settings, &name, branch.as_deref(), &projects, json),
        StorySubcommand::List => list(settings, json),
        StorySubcommand::Remove { name } => remove(settings, &name, json),
        StorySubcommand::Show { name } => show(settings, name.as_deref(), json),
    }
}

fn create(
    settings: &Settings,
    name: &str,
    branch: Option<&str>,
    projects: &[String],
    json: bool,
) -> anyhow::Result<()> {
    if name == paths::BASE_STORY {
        bail!("error creating a new story: '{name}' is reserved");
    }
    let record = StoryRecord::new(name, branch).context("error creating a new story")?;
    let data_dir = settings.data_dir()?;
    record
        .save(&data_dir)
        .context("error creating a new story")?;

    let mut checked_out = Vec::new();
    if !projects.is_empty() {
        let ws = Workspace::open(settings)?;
        let story = ws.profile()?.story(name);
        let provisioner = ws.provisioner()?;
        for import_path in projects {
            let project = story
                .project(import_path)
                .context("error creating a new story")?;
            provisioner
                .ensure(&story, &project, &record.branch_name)
                .context("error creating a new story")?;
            checked_out.push(project.path().display().to_string());
        }
    }

    if json {
        print_json(&serde_json::json!({
            "story": record,
            "projects": checked_out,
        }))?;
    } else {
        println!("Created story '{}' on branch '{}'", record.name, record.branch_name);
        for path in &checked_out {
            println!("  {path}");
        }
    }
    Ok(())
}

fn list(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let records = StoryRecord::list(&settings.data_dir()?).context("failed to list stories")?;
    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No stories.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = records
        .into_iter()
        .map(|r| {
            vec![
                r.name,
                r.branch_name,
                r.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "BRANCH", "CREATED"], &rows);
    Ok(())
}

fn remove(settings: &Settings, name: &str, json: bool) -> anyhow::Result<()> {
    StoryRecord::remove(&settings.data_dir()?, name)
        .with_context(|| format!("error removing story '{name}'"))?;
    if json {
        print_json(&serde_json::json!({ "story": name, "removed": true }))?;
    } else {
        println!("Removed story '{name}'");
    }
    Ok(())
}

fn show(settings: &Settings, name: Option<&str>, json: bool) -> anyhow::Result<()> {
    let Some(name) = name.or(settings.story.as_deref()) else {
        bail!("no story selected: pass a name, --story or SWM_STORY_NAME");
    };
    let record = StoryRecord::load(&settings.data_dir()?, name)
        .with_context(|| format!("error loading story '{name}'"))?;
    if json {
        return print_json(&record);
    }
    println!("Name:    {}", record.name);
    println!("Branch:  {}", record.branch_name);
    println!("Created: {}", record.created_at.to_rfc3339());
    Ok(())
}
