//! Configuration management module
//!
//! `HardeningPolicy` holds every knob the reconciler consults: where the
//! persisted table lives, which filesystems and targets are never touched,
//! which targets count as data mounts, and the root-mount tuning. It is
//! passed into the reconciler explicitly so tests never depend on the host.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::HardenError;

/// Default location of the persisted mount table
pub const DEFAULT_FSTAB: &str = "/etc/fstab";

/// Pseudo, virtual, ephemeral, network and swap filesystem types.
///
/// Any `fuse.*` subtype is excluded in addition to the names listed here.
const EXCLUDED_FS_TYPES: &[&str] = &[
    "proc",
    "sysfs",
    "devtmpfs",
    "devpts",
    "tmpfs",
    "ramfs",
    "securityfs",
    "selinuxfs",
    "cgroup",
    "cgroup2",
    "pstore",
    "bpf",
    "debugfs",
    "tracefs",
    "configfs",
    "fusectl",
    "fuse",
    "mqueue",
    "hugetlbfs",
    "autofs",
    "binfmt_misc",
    "efivarfs",
    "nsfs",
    "rpc_pipefs",
    "overlay",
    "squashfs",
    "iso9660",
    "nfs",
    "nfs4",
    "cifs",
    "smb3",
    "9p",
    "swap",
    "zfs",
];

/// Mount points that are never rewritten, nor anything below them
const EXCLUDED_TARGETS: &[&str] = &[
    "/boot/efi",
    "/snap",
    "/var/lib/snapd/snap",
    "/run",
    "/proc",
    "/sys",
    "/dev",
];

/// Mount points holding user or application data
const DATA_TARGETS: &[&str] = &["/home", "/rw", "/srv", "/data", "/var/lib", "/var/www"];

/// Policy applied by the reconciler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardeningPolicy {
    /// Persisted mount table to rewrite
    pub fstab_path: PathBuf,
    /// Directory receiving timestamped backups (defaults to the table's directory)
    pub backup_dir: Option<PathBuf>,
    /// Filesystem types never touched
    pub excluded_fs_types: Vec<String>,
    /// Target prefixes never touched
    pub excluded_targets: Vec<PathBuf>,
    /// Target prefixes classified as data mounts
    pub data_targets: Vec<PathBuf>,
    /// Filesystem type that receives the root-mount tuning
    pub root_fs_type: String,
    /// Value written as `errors=` on the root mount
    pub root_errors_mode: String,
    /// Minimum `commit=` interval in seconds on the root mount
    pub root_commit_interval: u32,
    /// Add `nosymfollow` when the kernel supports it
    pub restrict_symlinks: bool,
    /// Remount changed targets after installing the new table
    pub remount_live: bool,
}

impl Default for HardeningPolicy {
    fn default() -> Self {
        Self {
            fstab_path: PathBuf::from(DEFAULT_FSTAB),
            backup_dir: None,
            excluded_fs_types: EXCLUDED_FS_TYPES.iter().map(|s| (*s).to_string()).collect(),
            excluded_targets: EXCLUDED_TARGETS.iter().map(PathBuf::from).collect(),
            data_targets: DATA_TARGETS.iter().map(PathBuf::from).collect(),
            root_fs_type: "ext4".to_string(),
            root_errors_mode: "remount-ro".to_string(),
            root_commit_interval: 60,
            restrict_symlinks: true,
            remount_live: true,
        }
    }
}

impl HardeningPolicy {
    /// Load a policy from a JSON file; missing fields keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read policy from {:?}", path.as_ref()))?;

        let policy: Self =
            serde_json::from_str(&content).context("Failed to parse policy JSON")?;

        Ok(policy)
    }

    /// Render the policy as pretty JSON
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the policy
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.fstab_path.is_absolute() {
            return Err(HardenError::config(format!(
                "fstab path must be absolute: {}",
                self.fstab_path.display()
            )));
        }
        if let Some(dir) = &self.backup_dir {
            if !dir.is_absolute() {
                return Err(HardenError::config(format!(
                    "backup directory must be absolute: {}",
                    dir.display()
                )));
            }
        }
        for target in self.excluded_targets.iter().chain(&self.data_targets) {
            if !target.is_absolute() {
                return Err(HardenError::config(format!(
                    "target prefixes must be absolute: {}",
                    target.display()
                )));
            }
        }
        if self.root_fs_type.trim().is_empty() {
            return Err(HardenError::config("root filesystem type must not be empty"));
        }
        if self.root_errors_mode.trim().is_empty() || self.root_errors_mode.contains(',') {
            return Err(HardenError::config(format!(
                "invalid root errors mode: {:?}",
                self.root_errors_mode
            )));
        }
        if self.root_commit_interval == 0 {
            return Err(HardenError::config("root commit interval must be positive"));
        }
        Ok(())
    }

    /// Directory that receives backups of the persisted table
    pub fn backup_dir(&self) -> PathBuf {
        match &self.backup_dir {
            Some(dir) => dir.clone(),
            None => self
                .fstab_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("/")),
        }
    }

    /// Whether a filesystem type is on the denylist
    pub fn is_excluded_fs_type(&self, fs_type: &str) -> bool {
        fs_type.starts_with("fuse.") || self.excluded_fs_types.iter().any(|t| t == fs_type)
    }

    /// Whether a target equals or lies under a denylisted prefix
    pub fn is_excluded_target(&self, target: &Path) -> bool {
        self.excluded_targets.iter().any(|p| target.starts_with(p))
    }

    /// Whether a target equals or lies under a data prefix
    pub fn is_data_target(&self, target: &Path) -> bool {
        self.data_targets.iter().any(|p| target.starts_with(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_policy_is_valid() {
        let policy = HardeningPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.fstab_path, PathBuf::from("/etc/fstab"));
        assert_eq!(policy.backup_dir(), PathBuf::from("/etc"));
    }

    #[test]
    fn test_fs_type_denylist() {
        let policy = HardeningPolicy::default();
        assert!(policy.is_excluded_fs_type("proc"));
        assert!(policy.is_excluded_fs_type("swap"));
        assert!(policy.is_excluded_fs_type("zfs"));
        assert!(policy.is_excluded_fs_type("fuse.sshfs"));
        assert!(!policy.is_excluded_fs_type("ext4"));
        assert!(!policy.is_excluded_fs_type("btrfs"));
    }

    #[test]
    fn test_target_prefixes_match_whole_components() {
        let policy = HardeningPolicy::default();
        assert!(policy.is_excluded_target(Path::new("/boot/efi")));
        assert!(policy.is_excluded_target(Path::new("/run/user/1000")));
        assert!(!policy.is_excluded_target(Path::new("/boot")));
        assert!(!policy.is_excluded_target(Path::new("/running")));

        assert!(policy.is_data_target(Path::new("/home")));
        assert!(policy.is_data_target(Path::new("/home/user")));
        assert!(!policy.is_data_target(Path::new("/homework")));
        assert!(!policy.is_data_target(Path::new("/")));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let policy = HardeningPolicy {
            fstab_path: PathBuf::from("fstab"),
            ..Default::default()
        };
        assert!(policy.validate().is_err());

        let policy = HardeningPolicy {
            root_commit_interval: 0,
            ..Default::default()
        };
        assert!(policy.validate().is_err());

        let policy = HardeningPolicy {
            root_errors_mode: "remount-ro,panic".to_string(),
            ..Default::default()
        };
        assert!(policy.validate().is_err());

        let policy = HardeningPolicy {
            data_targets: vec![PathBuf::from("home")],
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_load_partial_policy_keeps_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("policy.json");
        fs::write(&path, r#"{ "root_commit_interval": 120, "restrict_symlinks": false }"#)
            .expect("write policy");

        let policy = HardeningPolicy::load_from_file(&path).expect("load");
        assert_eq!(policy.root_commit_interval, 120);
        assert!(!policy.restrict_symlinks);
        assert_eq!(policy.root_fs_type, "ext4");
        assert_eq!(policy.fstab_path, PathBuf::from(DEFAULT_FSTAB));
    }

    #[test]
    fn test_policy_json_round_trip() {
        let policy = HardeningPolicy::default();
        let json = policy.to_json().expect("serialize");
        let parsed: HardeningPolicy = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed, policy);
    }
}
