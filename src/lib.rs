//! fstab-hardener Library
//!
//! Reconciles the persisted mount table (`/etc/fstab`) and the live mounts
//! with a hardened mount-option policy: `noatime`/`lazytime` everywhere,
//! `nodev`/`nosuid` on data mounts, `errors=remount-ro` and a longer commit
//! interval on an ext4 root, and `nosymfollow` where the kernel allows it.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod fstab;
pub mod mountinfo;
pub mod options;
pub mod reconciler;
pub mod sanity;
pub mod system;
pub mod types;

// Re-export main types for convenience
pub use config::HardeningPolicy;
pub use engine::{ChangeKind, OptionChange, OptionMerger, TablePlan, plan_table};
pub use error::{HardenError, Result};
pub use fstab::{LineEnding, MountRecord, PersistedTable, TableLine};
pub use mountinfo::LiveMount;
pub use options::OptionSet;
pub use reconciler::{Outcome, ReconcileReport, Reconciler, RemountResult, create_backup};
pub use system::{FakeSystem, LinuxSystem, MountSystem, Operation};
pub use types::{Exclusion, MountClass};
