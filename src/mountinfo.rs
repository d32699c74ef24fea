//! Parsing helpers for `/proc/self/mountinfo`.

use std::path::PathBuf;

use crate::fstab::unescape;

/// A currently active mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveMount {
    /// Mount source as reported by the kernel (device path, `none`, ...)
    pub source: String,
    pub target: PathBuf,
    pub fs_type: String,
    /// Per-mount options, e.g. `rw,nosuid,relatime`
    pub options: String,
    /// Directory of the source filesystem mounted at `target`; `/` unless
    /// this is a bind or subvolume mount
    pub root: String,
}

impl LiveMount {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<PathBuf>,
        fs_type: impl Into<String>,
        options: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            fs_type: fs_type.into(),
            options: options.into(),
            root: "/".to_string(),
        }
    }

    /// Same mount, exposing `root` of the source filesystem instead of its top
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Whether only a subdirectory of the source filesystem is mounted
    pub fn is_partial(&self) -> bool {
        self.root != "/"
    }

    /// Whether the mount is currently flagged read-only
    pub fn is_read_only(&self) -> bool {
        self.options.split(',').any(|o| o.trim() == "ro")
    }
}

/// Parse mountinfo content.
///
/// Line format:
/// `<id> <parent> <maj:min> <root> <mount point> <options> [optional...] - <fstype> <source> <superopts>`
///
/// Malformed lines are skipped.
pub fn parse_mountinfo(content: &str) -> Vec<LiveMount> {
    content
        .lines()
        .filter_map(|line| {
            let (pre, post) = line.split_once(" - ")?;
            let pre_fields: Vec<&str> = pre.split_whitespace().collect();
            if pre_fields.len() < 6 {
                tracing::debug!("Skipping malformed mountinfo line: {}", line);
                return None;
            }
            let mut post_fields = post.split_whitespace();
            let fs_type = post_fields.next()?;
            let source = post_fields.next().unwrap_or("none");

            Some(LiveMount {
                source: unescape(source),
                target: PathBuf::from(unescape(pre_fields[4])),
                fs_type: fs_type.to_string(),
                options: pre_fields[5].to_string(),
                root: unescape(pre_fields[3]),
            })
        })
        .collect()
}
