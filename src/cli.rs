use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fstab-hardener - bring mount options in line with a hardening policy
///
/// With no arguments, rewrites /etc/fstab so every eligible mount carries
/// the hardened options, then remounts changed mounts live.
#[derive(Parser)]
#[command(name = "fstab-hardener")]
#[command(version)]
pub struct Cli {
    /// Show the planned changes without touching any file or mount
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// JSON policy file (fields not given keep their defaults)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Persisted mount table to operate on instead of the policy's
    #[arg(long, global = true)]
    pub fstab: Option<PathBuf>,

    /// Only rewrite the table; leave live mounts alone
    #[arg(long, global = true)]
    pub no_remount: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the effective policy as JSON
    Policy,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
