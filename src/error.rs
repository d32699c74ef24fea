//! Error handling module for fstab-hardener
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Only fatal conditions travel through these types; validation and remount
//! problems are collected as warnings in the reconcile report instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for fstab-hardener
#[derive(Error, Debug)]
pub enum HardenError {
    /// Live mounts or the persisted table could not be read
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// The backup copy of the persisted table could not be written
    #[error("Backup of {} failed: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The candidate table could not be staged
    #[error("Could not stage candidate table: {0}")]
    Candidate(String),

    /// The candidate table could not be installed over the persisted table
    #[error("Install failed: {0}")]
    Install(String),

    /// An external command could not be run or exited non-zero
    #[error("Command `{program}` failed: {message}")]
    Command { program: String, message: String },

    /// Policy loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for fstab-hardener operations
pub type Result<T> = std::result::Result<T, HardenError>;

// Convenient error constructors
impl HardenError {
    /// Create a discovery error
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Create a candidate staging error
    pub fn candidate(msg: impl Into<String>) -> Self {
        Self::Candidate(msg.into())
    }

    /// Create an install error
    pub fn install(msg: impl Into<String>) -> Self {
        Self::Install(msg.into())
    }

    /// Create a command error
    pub fn command(program: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Command {
            program: program.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
