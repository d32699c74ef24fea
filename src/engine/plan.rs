//! Candidate table generation.
//!
//! Walks the persisted table once, rewriting records of eligible mounts whose
//! options change, then appends records for eligible mounts the table does
//! not mention. Pure: device UUIDs come from the caller-supplied lookup.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::engine::merge::OptionMerger;
use crate::fstab::{MountRecord, PersistedTable, TableLine, unescape};
use crate::mountinfo::LiveMount;
use crate::types::MountClass;

/// Whether a change rewrote an existing line or appended a new one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Updated,
    Added,
}

/// One mount whose option string changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionChange {
    pub kind: ChangeKind,
    pub target: PathBuf,
    pub class: MountClass,
    /// Options before the run: the table's for updates, the live ones for additions
    pub before: String,
    pub after: String,
}

impl OptionChange {
    /// Whether the option string differs, which is what triggers a remount
    pub fn options_changed(&self) -> bool {
        self.before != self.after
    }
}

impl fmt::Display for OptionChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            ChangeKind::Updated => "update",
            ChangeKind::Added => "add",
        };
        write!(
            f,
            "{} {} [{}]: {} -> {}",
            verb,
            self.target.display(),
            self.class,
            self.before,
            self.after
        )
    }
}

/// Result of planning a rewrite
#[derive(Debug, Clone)]
pub struct TablePlan {
    pub candidate: PersistedTable,
    pub changes: Vec<OptionChange>,
    pub updated: usize,
    pub added: usize,
}

impl TablePlan {
    /// Whether the candidate differs from the persisted table
    pub fn has_changes(&self) -> bool {
        self.updated > 0 || self.added > 0
    }

    /// Distinct targets whose options changed, in table order
    pub fn remount_targets(&self) -> Vec<(&Path, &str)> {
        let mut seen = HashSet::new();
        self.changes
            .iter()
            .filter(|c| c.options_changed())
            .filter(|c| seen.insert(c.target.clone()))
            .map(|c| (c.target.as_path(), c.after.as_str()))
            .collect()
    }
}

/// Build the candidate table.
///
/// `uuid_of` maps a live mount source to its filesystem UUID and is only
/// consulted for mounts that need a new record.
pub fn plan_table<F>(
    table: &PersistedTable,
    eligible: &[LiveMount],
    merger: &OptionMerger<'_>,
    mut uuid_of: F,
) -> TablePlan
where
    F: FnMut(&str) -> Option<String>,
{
    let mut candidate = table.clone();
    let mut changes = Vec::new();
    let mut touched: HashSet<PathBuf> = HashSet::new();
    let mut updated = 0;

    for index in 0..candidate.lines.len() {
        let record = match &candidate.lines[index] {
            TableLine::Record { record, .. } => record,
            TableLine::Unparsed(raw) => {
                // An unreadable line still claims its mount point.
                if let Some(target) = unparsed_target(raw) {
                    if eligible.iter().any(|m| m.target == target) {
                        warn!(
                            "Leaving unparsable entry for {} untouched: {}",
                            target.display(),
                            raw.trim()
                        );
                        touched.insert(target);
                    }
                }
                continue;
            }
            _ => continue,
        };
        let Some(live) = eligible.iter().find(|m| m.target == record.target) else {
            continue;
        };

        touched.insert(live.target.clone());
        let class = merger.classify(&live.target, &live.fs_type);
        let after = merger.merge(&record.options, class).render();
        if after == record.options {
            continue;
        }

        let before = record.options.clone();
        let mut rewritten = record.clone();
        rewritten.options = after.clone();
        candidate.replace_record(index, rewritten);
        updated += 1;

        changes.push(OptionChange {
            kind: ChangeKind::Updated,
            target: live.target.clone(),
            class,
            before,
            after,
        });
    }

    let mut added = 0;
    for live in eligible {
        if touched.contains(&live.target) {
            continue;
        }
        if live.is_partial() {
            warn!(
                "Not adding {}: it mounts {} of {}, add a bind entry by hand",
                live.target.display(),
                live.root,
                live.source
            );
            continue;
        }

        let class = merger.classify(&live.target, &live.fs_type);
        let after = merger.merge(&live.options, class).render();
        let device_spec = if live.source.starts_with("UUID=") {
            live.source.clone()
        } else {
            match uuid_of(&live.source) {
                Some(uuid) => format!("UUID={uuid}"),
                None => live.source.clone(),
            }
        };
        let pass_number = if live.target == Path::new("/") { 1 } else { 2 };

        candidate.push_record(MountRecord {
            device_spec,
            target: live.target.clone(),
            fs_type: live.fs_type.clone(),
            options: after.clone(),
            dump: 0,
            pass_number,
        });
        touched.insert(live.target.clone());
        added += 1;

        changes.push(OptionChange {
            kind: ChangeKind::Added,
            target: live.target.clone(),
            class,
            before: live.options.clone(),
            after,
        });
    }

    TablePlan {
        candidate,
        changes,
        updated,
        added,
    }
}

/// Mount point named by the second field of a line that is not a valid record
fn unparsed_target(raw: &str) -> Option<PathBuf> {
    let mut fields = raw.split_whitespace();
    fields.next()?;
    fields.next().map(|target| PathBuf::from(unescape(target)))
}
