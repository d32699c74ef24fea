//! Real host implementation of [`MountSystem`].
//!
//! Mount enumeration and the kernel probe read procfs directly; UUID lookup,
//! table validation and remounting shell out to util-linux.

use nix::unistd::{Gid, Uid, chown, geteuid};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use super::MountSystem;
use crate::error::{HardenError, Result};
use crate::mountinfo::{LiveMount, parse_mountinfo};

/// First kernel release that understands `nosymfollow`
const SYMLINK_RESTRICTION_SINCE: (u32, u32) = (5, 10);

/// Mode of the installed persisted table
const TABLE_MODE: u32 = 0o644;

/// Host-backed mount system
#[derive(Debug, Clone)]
pub struct LinuxSystem {
    mountinfo_path: PathBuf,
    osrelease_path: PathBuf,
}

impl Default for LinuxSystem {
    fn default() -> Self {
        Self {
            mountinfo_path: PathBuf::from("/proc/self/mountinfo"),
            osrelease_path: PathBuf::from("/proc/sys/kernel/osrelease"),
        }
    }
}

impl LinuxSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MountSystem for LinuxSystem {
    fn live_mounts(&self) -> Result<Vec<LiveMount>> {
        let content = fs::read_to_string(&self.mountinfo_path).map_err(|e| {
            HardenError::discovery(format!(
                "cannot read {}: {}",
                self.mountinfo_path.display(),
                e
            ))
        })?;
        let mounts = parse_mountinfo(&content);
        if mounts.is_empty() {
            return Err(HardenError::discovery(format!(
                "no mounts listed in {}",
                self.mountinfo_path.display()
            )));
        }
        debug!("Found {} live mounts", mounts.len());
        Ok(mounts)
    }

    fn device_uuid(&self, source: &str) -> Option<String> {
        if !source.starts_with('/') {
            return None;
        }
        match run("blkid", &["-s", "UUID", "-o", "value", source]) {
            Ok(stdout) => {
                let uuid = stdout.trim();
                (!uuid.is_empty()).then(|| uuid.to_string())
            }
            Err(e) => {
                debug!("No UUID for {}: {}", source, e);
                None
            }
        }
    }

    fn supports_symlink_restriction(&self) -> bool {
        let release = match fs::read_to_string(&self.osrelease_path) {
            Ok(release) => release,
            Err(e) => {
                debug!("Kernel release probe failed: {}", e);
                return false;
            }
        };
        let supported = parse_kernel_version(&release)
            .is_some_and(|version| version >= SYMLINK_RESTRICTION_SINCE);
        info!(
            "Kernel {} {} nosymfollow",
            release.trim(),
            if supported { "supports" } else { "does not support" }
        );
        supported
    }

    fn validate_table(&self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy();
        run("findmnt", &["--verify", "--tab-file", path.as_ref()]).map(|_| ())
    }

    fn install_table(&self, candidate: &Path, dest: &Path) -> Result<()> {
        fs::set_permissions(candidate, fs::Permissions::from_mode(TABLE_MODE)).map_err(|e| {
            HardenError::install(format!("chmod {}: {}", candidate.display(), e))
        })?;

        if geteuid().is_root() {
            chown(candidate, Some(Uid::from_raw(0)), Some(Gid::from_raw(0))).map_err(|e| {
                HardenError::install(format!("chown {}: {}", candidate.display(), e))
            })?;
        } else {
            debug!("Not root; leaving ownership of {} unchanged", candidate.display());
        }

        fs::rename(candidate, dest).map_err(|e| {
            HardenError::install(format!(
                "rename {} -> {}: {}",
                candidate.display(),
                dest.display(),
                e
            ))
        })
    }

    fn remount(&self, target: &Path, options: &str) -> Result<()> {
        let spec = if options.is_empty() {
            "remount".to_string()
        } else {
            format!("remount,{options}")
        };
        let target = target.to_string_lossy();
        run("mount", &["-o", &spec, target.as_ref()]).map(|_| ())
    }
}

/// Run a command to completion and return its stdout
fn run(program: &str, args: &[&str]) -> Result<String> {
    debug!("Running {} {:?}", program, args);
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| HardenError::command(program, e.to_string()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let detail = [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    Err(HardenError::command(
        program,
        format!("exit code {}: {}", output.status.code().unwrap_or(-1), detail),
    ))
}

/// `(major, minor)` from a release string such as `6.6.48-1.qubes.fc37.x86_64`
pub fn parse_kernel_version(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.trim().split(['.', '-']);
    let major = parts.next()?.parse().ok()?;
    let minor_digits: String = parts
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let minor = minor_digits.parse().ok()?;
    Some((major, minor))
}
