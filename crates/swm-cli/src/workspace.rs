use anyhow::{bail, Context};
use std::sync::Arc;
use swm_core::fs::{Fs, OsFs};
use swm_core::index::{Profile, Root, Story};
use swm_core::provision::Provisioner;
use swm_core::scan::{ScanReport, Scanner};
use swm_core::vcs::GitCli;

use crate::settings::Settings;

/// A scanned code tree plus the settings it was opened with.
pub struct Workspace<'a> {
    settings: &'a Settings,
    fs: Arc<dyn Fs>,
    root: Root,
    report: ScanReport,
}

impl<'a> Workspace<'a> {
    pub fn open(settings: &'a Settings) -> anyhow::Result<Self> {
        let code_path = settings.code_path()?;
        let root = Root::new(code_path, settings.ignore_pattern.as_deref())
            .context("invalid code path settings")?;
        let fs: Arc<dyn Fs> = Arc::new(OsFs);
        let scanner = Scanner::new(fs.clone(), settings.config.scan.concurrency)?
            .with_mode(settings.config.scan.rescan);
        let report = scanner
            .scan(&root)
            .with_context(|| format!("failed to scan {}", code_path.display()))?;
        tracing::debug!(
            profiles = report.profiles,
            stories = report.stories,
            projects = report.projects,
            issues = report.issues.len(),
            "scan complete"
        );
        Ok(Self {
            settings,
            fs,
            root,
            report,
        })
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn fs(&self) -> &dyn Fs {
        self.fs.as_ref()
    }

    pub fn report(&self) -> &ScanReport {
        &self.report
    }

    /// The selected profile, or the only one when none is selected.
    pub fn profile(&self) -> anyhow::Result<Arc<Profile>> {
        if let Some(name) = &self.settings.profile {
            return Ok(self.root.profile(name)?);
        }
        let profiles = self.root.profiles()?;
        match profiles.as_slice() {
            [only] => Ok(only.clone()),
            [] => bail!("no profiles found under {}", self.root.path().display()),
            many => {
                let names: Vec<&str> = many.iter().map(|p| p.name()).collect();
                bail!(
                    "several profiles found ({}); pick one with --profile or SWM_PROFILE",
                    names.join(", ")
                )
            }
        }
    }

    pub fn story(&self) -> anyhow::Result<Arc<Story>> {
        Ok(self.profile()?.story(self.settings.story_name()))
    }

    pub fn provisioner(&self) -> anyhow::Result<Provisioner> {
        let git = GitCli::locate(&self.settings.config.tools.git)?;
        Ok(Provisioner::new(
            self.fs.clone(),
            Arc::new(git),
            self.settings.config.hooks.clone(),
        ))
    }
}
