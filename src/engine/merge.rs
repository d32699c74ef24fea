//! Option merge: existing options plus a mount classification in, hardened
//! options out.
//!
//! Every step either edits a token in place or appends it, so running the
//! merge over its own output changes nothing.

use std::path::Path;

use crate::config::HardeningPolicy;
use crate::options::{DEFAULTS, OptionSet};
use crate::types::MountClass;

/// Access-time tokens collapsed into a single `noatime`
const ACCESS_TIME_TOKENS: &[&str] = &[
    "atime",
    "noatime",
    "relatime",
    "norelatime",
    "strictatime",
    "nostrictatime",
];

/// Symlink-following restriction option (Linux 5.10+)
pub const SYMLINK_RESTRICTION: &str = "nosymfollow";

/// Applies a [`HardeningPolicy`] to option strings.
///
/// `restrict_symlinks` is resolved once per run (policy switch AND kernel
/// probe) and shared by every mount.
#[derive(Debug, Clone, Copy)]
pub struct OptionMerger<'a> {
    policy: &'a HardeningPolicy,
    restrict_symlinks: bool,
}

impl<'a> OptionMerger<'a> {
    pub fn new(policy: &'a HardeningPolicy, symlink_restriction_supported: bool) -> Self {
        Self {
            policy,
            restrict_symlinks: policy.restrict_symlinks && symlink_restriction_supported,
        }
    }

    pub fn restricts_symlinks(&self) -> bool {
        self.restrict_symlinks
    }

    /// Classify a mount point by target and live filesystem type
    pub fn classify(&self, target: &Path, fs_type: &str) -> MountClass {
        if target == Path::new("/") && fs_type == self.policy.root_fs_type {
            MountClass::Root
        } else if self.policy.is_data_target(target) {
            MountClass::Data
        } else {
            MountClass::General
        }
    }

    /// Hardened option set for `existing`
    pub fn merge(&self, existing: &str, class: MountClass) -> OptionSet {
        let mut set = OptionSet::parse(existing);

        set.replace_or_push(|t| ACCESS_TIME_TOKENS.contains(&t), "noatime");
        set.remove_matching(|t| t == "nolazytime");
        set.insert("lazytime");

        if self.restrict_symlinks {
            set.insert(SYMLINK_RESTRICTION);
        }

        match class {
            MountClass::Data => {
                // Data directories may hold legitimate executables: no noexec.
                set.remove_matching(|t| t == "dev" || t == "suid" || t == "noexec");
                set.insert("nodev");
                set.insert("nosuid");
            }
            MountClass::Root => {
                set.set_keyed("errors", &self.policy.root_errors_mode);
                let floor = self.policy.root_commit_interval;
                let current = set.value_of("commit").and_then(|v| v.parse::<u32>().ok());
                let commit = current.map_or(floor, |secs| secs.max(floor));
                set.set_keyed("commit", &commit.to_string());
            }
            MountClass::General => {}
        }

        set.remove_matching(|t| t == DEFAULTS);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merge(existing: &str, class: MountClass) -> String {
        let policy = HardeningPolicy::default();
        OptionMerger::new(&policy, false).merge(existing, class).render()
    }

    #[test]
    fn test_root_scenario() {
        assert_eq!(
            merge("relatime", MountClass::Root),
            "noatime,lazytime,errors=remount-ro,commit=60"
        );
    }

    #[test]
    fn test_home_scenario() {
        assert_eq!(merge("relatime", MountClass::Data), "noatime,lazytime,nodev,nosuid");
    }

    #[test]
    fn test_defaults_placeholder_is_replaced() {
        assert_eq!(merge("defaults", MountClass::General), "noatime,lazytime");
        assert_eq!(merge("defaults,discard", MountClass::General), "discard,noatime,lazytime");
    }

    #[test]
    fn test_access_time_variants_collapse_in_place() {
        assert_eq!(
            merge("rw,strictatime,discard,atime,relatime", MountClass::General),
            "rw,noatime,discard,lazytime"
        );
        assert_eq!(merge("nolazytime,noatime", MountClass::General), "noatime,lazytime");
    }

    #[test]
    fn test_data_mount_drops_noexec() {
        assert_eq!(
            merge("noexec,suid,dev,relatime", MountClass::Data),
            "noatime,lazytime,nodev,nosuid"
        );
    }

    #[test]
    fn test_root_errors_and_commit() {
        assert_eq!(
            merge("errors=continue,commit=5,errors=panic", MountClass::Root),
            "errors=remount-ro,commit=60,noatime,lazytime"
        );
        assert_eq!(
            merge("commit=300", MountClass::Root),
            "commit=300,noatime,lazytime,errors=remount-ro"
        );
        assert_eq!(
            merge("commit=bogus", MountClass::Root),
            "commit=60,noatime,lazytime,errors=remount-ro"
        );
    }

    #[test]
    fn test_symlink_restriction_follows_probe_and_policy() {
        let policy = HardeningPolicy::default();
        let merger = OptionMerger::new(&policy, true);
        assert!(merger.restricts_symlinks());
        assert_eq!(
            merger.merge("noatime,nosymfollow", MountClass::General).render(),
            "noatime,nosymfollow,lazytime"
        );

        let disabled = HardeningPolicy {
            restrict_symlinks: false,
            ..Default::default()
        };
        assert!(!OptionMerger::new(&disabled, true).restricts_symlinks());
    }

    #[test]
    fn test_classify() {
        let policy = HardeningPolicy::default();
        let merger = OptionMerger::new(&policy, false);
        assert_eq!(merger.classify(Path::new("/"), "ext4"), MountClass::Root);
        assert_eq!(merger.classify(Path::new("/"), "btrfs"), MountClass::General);
        assert_eq!(merger.classify(Path::new("/home"), "ext4"), MountClass::Data);
        assert_eq!(merger.classify(Path::new("/var/lib/docker"), "xfs"), MountClass::Data);
        assert_eq!(merger.classify(Path::new("/boot"), "ext4"), MountClass::General);
    }

    #[test]
    fn test_merge_is_idempotent_on_examples() {
        let policy = HardeningPolicy::default();
        let merger = OptionMerger::new(&policy, true);
        for (input, class) in [
            ("relatime", MountClass::Root),
            ("errors=continue,commit=5", MountClass::Root),
            ("noexec,relatime", MountClass::Data),
            ("defaults", MountClass::General),
        ] {
            let once = merger.merge(input, class).render();
            let twice = merger.merge(&once, class).render();
            assert_eq!(once, twice, "merge not idempotent for {input:?}");
        }
    }
}
