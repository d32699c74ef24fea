//! Fake [`MountSystem`] for tests.
//!
//! Serves canned mounts and UUIDs, records every mutating call, and can be
//! told to fail validation or individual remounts. Installing a table really
//! renames the candidate so tests can inspect the result on disk.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::MountSystem;
use crate::error::{HardenError, Result};
use crate::mountinfo::LiveMount;

/// Operation records for verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Probe,
    Validate { path: PathBuf },
    Install { candidate: PathBuf, dest: PathBuf },
    Remount { target: PathBuf, options: String },
}

#[derive(Debug, Default)]
struct FakeState {
    mounts: Vec<LiveMount>,
    operations: Vec<Operation>,
}

/// Scriptable stand-in for the host
#[derive(Debug, Default)]
pub struct FakeSystem {
    state: RefCell<FakeState>,
    uuids: HashMap<String, String>,
    symlink_restriction: bool,
    discovery_error: Option<String>,
    validation_error: Option<String>,
    failing_remounts: HashSet<PathBuf>,
}

impl FakeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mount(
        self,
        source: &str,
        target: &str,
        fs_type: &str,
        options: &str,
    ) -> Self {
        self.state
            .borrow_mut()
            .mounts
            .push(LiveMount::new(source, target, fs_type, options));
        self
    }

    /// Mount `root` of the filesystem on `source` at `target`
    pub fn with_bind_mount(
        self,
        source: &str,
        root: &str,
        target: &str,
        fs_type: &str,
        options: &str,
    ) -> Self {
        self.state
            .borrow_mut()
            .mounts
            .push(LiveMount::new(source, target, fs_type, options).with_root(root));
        self
    }

    pub fn with_uuid(mut self, source: &str, uuid: &str) -> Self {
        self.uuids.insert(source.to_string(), uuid.to_string());
        self
    }

    pub fn with_symlink_restriction(mut self, supported: bool) -> Self {
        self.symlink_restriction = supported;
        self
    }

    pub fn failing_discovery(mut self, message: &str) -> Self {
        self.discovery_error = Some(message.to_string());
        self
    }

    pub fn failing_validation(mut self, message: &str) -> Self {
        self.validation_error = Some(message.to_string());
        self
    }

    pub fn failing_remount(mut self, target: &str) -> Self {
        self.failing_remounts.insert(PathBuf::from(target));
        self
    }

    /// All recorded operations, oldest first
    pub fn operations(&self) -> Vec<Operation> {
        self.state.borrow().operations.clone()
    }

    /// Live mounts as they stand now (remounts update them)
    pub fn mounts(&self) -> Vec<LiveMount> {
        self.state.borrow().mounts.clone()
    }

    /// Number of recorded operations matching `pred`
    pub fn count<F>(&self, pred: F) -> usize
    where
        F: Fn(&Operation) -> bool,
    {
        self.state.borrow().operations.iter().filter(|op| pred(op)).count()
    }

    fn record(&self, op: Operation) {
        self.state.borrow_mut().operations.push(op);
    }
}

impl MountSystem for FakeSystem {
    fn live_mounts(&self) -> Result<Vec<LiveMount>> {
        if let Some(message) = &self.discovery_error {
            return Err(HardenError::discovery(message.clone()));
        }
        Ok(self.mounts())
    }

    fn device_uuid(&self, source: &str) -> Option<String> {
        self.uuids.get(source).cloned()
    }

    fn supports_symlink_restriction(&self) -> bool {
        self.record(Operation::Probe);
        self.symlink_restriction
    }

    fn validate_table(&self, path: &Path) -> Result<()> {
        self.record(Operation::Validate {
            path: path.to_path_buf(),
        });
        match &self.validation_error {
            Some(message) => Err(HardenError::command("findmnt", message.clone())),
            None => Ok(()),
        }
    }

    fn install_table(&self, candidate: &Path, dest: &Path) -> Result<()> {
        self.record(Operation::Install {
            candidate: candidate.to_path_buf(),
            dest: dest.to_path_buf(),
        });
        fs::rename(candidate, dest).map_err(|e| HardenError::install(e.to_string()))
    }

    fn remount(&self, target: &Path, options: &str) -> Result<()> {
        self.record(Operation::Remount {
            target: target.to_path_buf(),
            options: options.to_string(),
        });
        if self.failing_remounts.contains(target) {
            return Err(HardenError::command(
                "mount",
                format!("{}: option not supported", target.display()),
            ));
        }

        let mut state = self.state.borrow_mut();
        if let Some(mount) = state.mounts.iter_mut().rev().find(|m| m.target == target) {
            mount.options = options.to_string();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_records_operations() {
        let fake = FakeSystem::new()
            .with_mount("/dev/sda2", "/", "ext4", "rw,relatime")
            .with_symlink_restriction(true);

        assert!(fake.supports_symlink_restriction());
        fake.remount(Path::new("/"), "rw,noatime").expect("remount");

        assert_eq!(
            fake.operations(),
            vec![
                Operation::Probe,
                Operation::Remount {
                    target: PathBuf::from("/"),
                    options: "rw,noatime".to_string(),
                },
            ]
        );
        assert_eq!(fake.mounts()[0].options, "rw,noatime");
    }

    #[test]
    fn test_fake_failures() {
        let fake = FakeSystem::new()
            .failing_discovery("no procfs")
            .failing_validation("parse error")
            .failing_remount("/data");

        assert!(fake.live_mounts().is_err());
        assert!(fake.validate_table(Path::new("/tmp/x")).is_err());
        assert!(fake.remount(Path::new("/data"), "noatime").is_err());
        assert_eq!(fake.device_uuid("/dev/sda1"), None);
    }
}
