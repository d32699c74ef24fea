//! Mount-options reconciler.
//!
//! Reads live mounts and the persisted table, plans the hardened table, and
//! when anything changes: backs up the old table, stages and validates the
//! candidate, installs it, then remounts changed targets.
//!
//! Only discovery, backup, staging and install problems abort the run.
//! Validation and remount failures are recorded in the report as warnings.

use chrono::Local;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use strum::Display;
use tracing::{debug, info, warn};

use crate::config::HardeningPolicy;
use crate::engine::{OptionChange, OptionMerger, TablePlan, eligible_mounts, plan_table};
use crate::error::{HardenError, Result};
use crate::fstab::PersistedTable;
use crate::options::OptionSet;
use crate::system::MountSystem;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Outcome {
    /// No live mount passed the eligibility filter
    #[strum(serialize = "nothing to do")]
    NothingToDo,
    /// Every eligible mount already carries the hardened options
    #[strum(serialize = "already hardened")]
    AlreadyHardened,
    /// Dry run: changes were computed but not written
    #[strum(serialize = "planned")]
    Planned,
    /// The new table was installed
    #[strum(serialize = "applied")]
    Applied,
}

/// Result of one live remount attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemountResult {
    pub target: PathBuf,
    pub options: String,
    /// Failure message; `None` means the remount succeeded
    pub error: Option<String>,
}

impl RemountResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// What a run did
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub outcome: Outcome,
    pub eligible: usize,
    pub updated: usize,
    pub added: usize,
    pub symlink_restriction: bool,
    pub changes: Vec<OptionChange>,
    pub backup: Option<PathBuf>,
    /// Message from the table syntax checker when it rejected the candidate
    pub validation_warning: Option<String>,
    pub remounts: Vec<RemountResult>,
}

impl ReconcileReport {
    fn new(outcome: Outcome, eligible: usize) -> Self {
        Self {
            outcome,
            eligible,
            updated: 0,
            added: 0,
            symlink_restriction: false,
            changes: Vec::new(),
            backup: None,
            validation_warning: None,
            remounts: Vec::new(),
        }
    }

    pub fn remount_failures(&self) -> impl Iterator<Item = &RemountResult> {
        self.remounts.iter().filter(|r| !r.succeeded())
    }

    /// Lines printed to the operator, warnings included
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self.outcome {
            Outcome::NothingToDo => {
                lines.push("Nothing to do: no eligible mounts found".to_string());
                return lines;
            }
            Outcome::AlreadyHardened => {
                lines.push(format!(
                    "All {} eligible mounts already hardened (updated=0 added=0)",
                    self.eligible
                ));
                return lines;
            }
            Outcome::Planned => lines.push("Dry run: no files changed".to_string()),
            Outcome::Applied => {}
        }

        for change in &self.changes {
            lines.push(format!("  {change}"));
        }
        lines.push(format!("updated={} added={}", self.updated, self.added));

        if let Some(backup) = &self.backup {
            lines.push(format!("Backup: {}", backup.display()));
        }
        if let Some(message) = &self.validation_warning {
            lines.push(format!("WARNING: table validation failed: {message}"));
            if let Some(backup) = &self.backup {
                lines.push(format!(
                    "WARNING: new table installed anyway; inspect it against {}",
                    backup.display()
                ));
            }
        }
        for remount in &self.remounts {
            match &remount.error {
                None => lines.push(format!("Remounted {}", remount.target.display())),
                Some(e) => lines.push(format!(
                    "WARNING: remount of {} failed ({}); options apply on next boot",
                    remount.target.display(),
                    e
                )),
            }
        }
        lines
    }
}

/// Drives a [`MountSystem`] toward a [`HardeningPolicy`]
pub struct Reconciler<'a, S: MountSystem> {
    system: &'a S,
    policy: &'a HardeningPolicy,
    dry_run: bool,
}

impl<'a, S: MountSystem> Reconciler<'a, S> {
    pub fn new(system: &'a S, policy: &'a HardeningPolicy) -> Self {
        Self {
            system,
            policy,
            dry_run: false,
        }
    }

    /// Compute and report changes without writing or remounting
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Run one reconciliation pass
    pub fn run(&self) -> Result<ReconcileReport> {
        let fstab_path = &self.policy.fstab_path;
        let content = fs::read_to_string(fstab_path).map_err(|e| {
            HardenError::discovery(format!("cannot read {}: {}", fstab_path.display(), e))
        })?;
        let table = PersistedTable::parse(&content);

        let live = self.system.live_mounts()?;
        let eligible = eligible_mounts(&live, self.policy);
        info!("{} of {} live mounts eligible", eligible.len(), live.len());
        if eligible.is_empty() {
            return Ok(ReconcileReport::new(Outcome::NothingToDo, 0));
        }

        let supported =
            self.policy.restrict_symlinks && self.system.supports_symlink_restriction();
        let merger = OptionMerger::new(self.policy, supported);
        let plan = plan_table(&table, &eligible, &merger, |source| {
            self.system.device_uuid(source)
        });

        let mut report = ReconcileReport::new(Outcome::AlreadyHardened, eligible.len());
        report.symlink_restriction = merger.restricts_symlinks();
        if !plan.has_changes() {
            info!("Persisted table already hardened");
            return Ok(report);
        }

        report.updated = plan.updated;
        report.added = plan.added;
        report.changes = plan.changes.clone();

        if self.dry_run {
            report.outcome = Outcome::Planned;
            return Ok(report);
        }

        let backup = create_backup(fstab_path, &self.policy.backup_dir())?;
        info!("Backed up {} to {}", fstab_path.display(), backup.display());
        report.backup = Some(backup);

        self.install(&plan, &mut report)?;
        report.outcome = Outcome::Applied;

        if self.policy.remount_live {
            report.remounts = self.remount_changed(&plan);
        } else {
            debug!("Live remount disabled by policy");
        }

        Ok(report)
    }

    /// Stage, validate and install the candidate table
    fn install(&self, plan: &TablePlan, report: &mut ReconcileReport) -> Result<()> {
        let fstab_path = &self.policy.fstab_path;
        let dir = fstab_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("/"));

        let mut staged = tempfile::Builder::new()
            .prefix(".fstab-hardener.")
            .tempfile_in(dir)
            .map_err(|e| {
                HardenError::candidate(format!("temp file in {}: {}", dir.display(), e))
            })?;
        let written = staged
            .write_all(plan.candidate.render().as_bytes())
            .and_then(|()| staged.as_file().sync_all());
        if let Err(e) = written {
            return Err(HardenError::candidate(format!(
                "write {}: {}",
                staged.path().display(),
                e
            )));
        }
        let staged = staged.into_temp_path();

        if let Err(e) = self.system.validate_table(&staged) {
            warn!("Candidate table failed validation: {}", e);
            report.validation_warning = Some(e.to_string());
        }

        self.system.install_table(&staged, fstab_path)?;
        info!(
            "Installed new {} (updated={} added={})",
            fstab_path.display(),
            plan.updated,
            plan.added
        );
        Ok(())
    }

    fn remount_changed(&self, plan: &TablePlan) -> Vec<RemountResult> {
        plan.remount_targets()
            .into_iter()
            .map(|(target, options)| {
                let options = OptionSet::parse(options).remount_options();
                let error = match self.system.remount(target, &options) {
                    Ok(()) => {
                        info!("Remounted {} with {}", target.display(), options);
                        None
                    }
                    Err(e) => {
                        warn!("Remount of {} failed: {}", target.display(), e);
                        Some(e.to_string())
                    }
                };
                RemountResult {
                    target: target.to_path_buf(),
                    options,
                    error,
                }
            })
            .collect()
    }
}

/// Copy `fstab` into `dir` as `<name>.bak.<timestamp>`, never reusing a name
pub fn create_backup(fstab: &Path, dir: &Path) -> Result<PathBuf> {
    let name = fstab
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "fstab".to_string());
    let stamp = Local::now().format("%Y%m%d-%H%M%S");

    let base = dir.join(format!("{name}.bak.{stamp}"));
    let mut path = base.clone();
    let mut n = 1;
    while path.exists() {
        path = PathBuf::from(format!("{}.{}", base.display(), n));
        n += 1;
    }

    fs::copy(fstab, &path).map_err(|source| HardenError::Backup {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_names_are_unique() {
        let dir = TempDir::new().expect("tempdir");
        let fstab = dir.path().join("fstab");
        fs::write(&fstab, "# table\n").expect("write");

        let first = create_backup(&fstab, dir.path()).expect("first backup");
        let second = create_backup(&fstab, dir.path()).expect("second backup");
        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(&first).expect("read"), "# table\n");
        assert!(
            first
                .file_name()
                .expect("name")
                .to_string_lossy()
                .starts_with("fstab.bak.")
        );
    }

    #[test]
    fn test_backup_into_missing_dir_fails() {
        let dir = TempDir::new().expect("tempdir");
        let fstab = dir.path().join("fstab");
        fs::write(&fstab, "").expect("write");

        let err = create_backup(&fstab, &dir.path().join("missing")).expect_err("should fail");
        assert!(matches!(err, HardenError::Backup { .. }));
    }

    #[test]
    fn test_summary_for_nothing_to_do() {
        let report = ReconcileReport::new(Outcome::NothingToDo, 0);
        assert_eq!(
            report.summary_lines(),
            vec!["Nothing to do: no eligible mounts found".to_string()]
        );
        assert_eq!(Outcome::NothingToDo.to_string(), "nothing to do");
    }
}
