//! Engine modules: pure logic that turns live mounts plus the persisted
//! table into a hardened candidate table.
//!
//! Nothing in here performs I/O. The reconciler feeds it data gathered
//! through [`crate::system::MountSystem`] and acts on the resulting plan.

pub mod eligibility;
pub mod merge;
pub mod plan;

pub use eligibility::{eligible_mounts, exclusion_reason};
pub use merge::OptionMerger;
pub use plan::{ChangeKind, OptionChange, TablePlan, plan_table};
