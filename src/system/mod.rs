//! Operating-system access behind one trait.
//!
//! The reconciler only talks to the host through [`MountSystem`], so the
//! whole algorithm runs unchanged against [`FakeSystem`] in tests.

use std::path::Path;

use crate::error::Result;
use crate::mountinfo::LiveMount;

pub mod fake;
pub mod linux;

pub use fake::{FakeSystem, Operation};
pub use linux::LinuxSystem;

/// Mount-table queries and mutations the reconciler needs
pub trait MountSystem {
    /// Enumerate currently active mounts
    fn live_mounts(&self) -> Result<Vec<LiveMount>>;

    /// Filesystem UUID of a mount source, if it has one
    fn device_uuid(&self, source: &str) -> Option<String>;

    /// Whether mounts accept the symlink-following restriction.
    ///
    /// Probe failures report `false`.
    fn supports_symlink_restriction(&self) -> bool;

    /// Check a candidate table with the system's table syntax checker
    fn validate_table(&self, path: &Path) -> Result<()>;

    /// Install `candidate` over `dest` as a root-owned 0644 file
    fn install_table(&self, candidate: &Path, dest: &Path) -> Result<()>;

    /// Apply `options` to a live mount without unmounting it
    fn remount(&self, target: &Path, options: &str) -> Result<()>;
}
