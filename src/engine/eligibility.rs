//! Which live mounts the reconciler is allowed to touch.

use crate::config::HardeningPolicy;
use crate::mountinfo::LiveMount;
use crate::types::Exclusion;

/// First exclusion that applies to `mount`, or `None` when it is eligible.
///
/// Checks run in a fixed order: filesystem type, target path, read-only flag.
pub fn exclusion_reason(mount: &LiveMount, policy: &HardeningPolicy) -> Option<Exclusion> {
    if policy.is_excluded_fs_type(&mount.fs_type) {
        return Some(Exclusion::PseudoFilesystem);
    }
    if policy.is_excluded_target(&mount.target) {
        return Some(Exclusion::DeniedTarget);
    }
    if mount.is_read_only() {
        return Some(Exclusion::ReadOnly);
    }
    None
}

/// Eligible mounts, one per target.
///
/// When several mounts share a target the last one listed (the one on top)
/// is the active one. Order follows the first appearance of each target.
pub fn eligible_mounts(mounts: &[LiveMount], policy: &HardeningPolicy) -> Vec<LiveMount> {
    let mut active: Vec<LiveMount> = Vec::new();
    for mount in mounts {
        match active.iter_mut().find(|m| m.target == mount.target) {
            Some(slot) => *slot = mount.clone(),
            None => active.push(mount.clone()),
        }
    }

    active
        .into_iter()
        .filter(|mount| match exclusion_reason(mount, policy) {
            Some(reason) => {
                tracing::debug!(
                    "Skipping {} ({}): {}",
                    mount.target.display(),
                    mount.fs_type,
                    reason
                );
                false
            }
            None => true,
        })
        .collect()
}
