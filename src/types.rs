//! Small enums shared by the engine, the reconciler and the CLI output.

use strum::{Display, EnumIter, EnumString};

/// How a mount point is treated by the option merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum MountClass {
    /// The root mount carrying the policy's root filesystem type
    Root,
    /// User or application data; gets nodev/nosuid but never noexec
    Data,
    /// Everything else that is eligible
    General,
}

/// Reason a live mount is left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Display, EnumString, EnumIter)]
pub enum Exclusion {
    #[strum(serialize = "pseudo-filesystem")]
    PseudoFilesystem,
    #[strum(serialize = "denied-target")]
    DeniedTarget,
    #[strum(serialize = "read-only")]
    ReadOnly,
}
