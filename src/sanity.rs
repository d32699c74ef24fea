//! Pre-flight sanity checks for runtime environment
//!
//! This module verifies the system environment before a writing run:
//! - Required runtime binaries are present
//! - Running with root privileges (EUID 0)
//!
//! If any check fails, the program exits with a clear error message
//! before the persisted table is touched.

use std::env;

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_binaries: Vec<String>,
    pub is_root: bool,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty() && self.is_root
    }
}

/// Required runtime binaries for reconciliation
const REQUIRED_BINARIES: &[&str] = &[
    "findmnt", // Table validation (util-linux)
    "blkid",   // UUID lookup (util-linux)
    "mount",   // Live remount (util-linux)
];

/// Check if a binary is available in PATH
fn binary_exists(name: &str) -> bool {
    which::which(name).is_ok()
}

/// Check if running as root (EUID 0)
fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Perform all sanity checks and return the result
pub fn verify_environment() -> SanityCheckResult {
    let missing = REQUIRED_BINARIES
        .iter()
        .filter(|binary| !binary_exists(binary))
        .map(|binary| (*binary).to_string())
        .collect();

    SanityCheckResult {
        missing_binaries: missing,
        is_root: is_running_as_root(),
    }
}

/// Print the failed checks to stderr and exit with status 1
pub fn print_error_and_exit(result: &SanityCheckResult) -> ! {
    eprintln!("fstab-hardener: pre-flight check failed");

    if !result.is_root {
        eprintln!("  ERROR: root privileges required to rewrite the mount table and remount");
        eprintln!("  Run with sudo, or use --dry-run to preview changes");
    }

    if !result.missing_binaries.is_empty() {
        eprintln!(
            "  ERROR: missing required binaries: {}",
            result.missing_binaries.join(", ")
        );
        eprintln!("  Install util-linux to provide them");
    }

    std::process::exit(1);
}

/// Skip root check (for development/testing)
/// Set FSTAB_HARDENER_SKIP_ROOT_CHECK=1 to skip
pub fn should_skip_root_check() -> bool {
    env::var("FSTAB_HARDENER_SKIP_ROOT_CHECK")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Run pre-flight checks, exiting the process if they fail
pub fn run_preflight_checks() {
    tracing::debug!("Running pre-flight sanity checks...");

    let mut result = verify_environment();

    if should_skip_root_check() {
        tracing::warn!("Root check skipped (FSTAB_HARDENER_SKIP_ROOT_CHECK=1)");
        result.is_root = true;
    }

    if !result.is_ok() {
        print_error_and_exit(&result);
    }

    tracing::info!("Pre-flight checks passed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_exists_nonexistent() {
        assert!(!binary_exists("this_binary_definitely_does_not_exist_12345"));
    }

    #[test]
    fn test_binary_exists_sh() {
        assert!(binary_exists("sh"), "sh should be available");
    }

    #[test]
    fn test_missing_binaries_come_from_required_list() {
        let result = verify_environment();
        for missing in &result.missing_binaries {
            assert!(REQUIRED_BINARIES.contains(&missing.as_str()));
            assert!(which::which(missing).is_err());
        }
    }

    #[test]
    fn test_sanity_result_is_ok() {
        let ok_result = SanityCheckResult {
            missing_binaries: vec![],
            is_root: true,
        };
        assert!(ok_result.is_ok());

        let missing_binary = SanityCheckResult {
            missing_binaries: vec!["findmnt".to_string()],
            is_root: true,
        };
        assert!(!missing_binary.is_ok());

        let not_root = SanityCheckResult {
            missing_binaries: vec![],
            is_root: false,
        };
        assert!(!not_root.is_ok());
    }
}
