//! Ordered set of mount option tokens.
//!
//! Mount options behave as a set, but the persisted table must render them
//! deterministically, so insertion order is kept and every mutation either
//! edits a token in place or appends at the end.

use std::fmt;

/// Placeholder token that carries no option of its own
pub const DEFAULTS: &str = "defaults";

/// Ordered, duplicate-free list of option tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet {
    tokens: Vec<String>,
}

impl OptionSet {
    /// Parse a comma-separated option string.
    ///
    /// Whitespace around tokens, empty tokens and repeated tokens are dropped.
    /// Commas inside double quotes (SELinux `context="..."`) do not split.
    pub fn parse(raw: &str) -> Self {
        let mut set = Self::default();
        for token in split_unquoted(raw).map(str::trim).filter(|t| !t.is_empty()) {
            set.insert(token);
        }
        set
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// Value of the first `key=value` token
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.tokens.iter().find_map(|t| keyed_value(t, key))
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Append `token` unless it is already present. Returns true if added.
    pub fn insert(&mut self, token: &str) -> bool {
        if self.contains(token) {
            return false;
        }
        self.tokens.push(token.to_string());
        true
    }

    /// Drop every token matching `pred`. Returns how many were removed.
    pub fn remove_matching<F>(&mut self, mut pred: F) -> usize
    where
        F: FnMut(&str) -> bool,
    {
        let before = self.tokens.len();
        self.tokens.retain(|t| !pred(t));
        before - self.tokens.len()
    }

    /// Put `replacement` where the first token matching `pred` sits and drop
    /// the other matches; append it when nothing matches.
    pub fn replace_or_push<F>(&mut self, mut pred: F, replacement: &str)
    where
        F: FnMut(&str) -> bool,
    {
        let mut placed = false;
        let mut out = Vec::with_capacity(self.tokens.len() + 1);
        for token in self.tokens.drain(..) {
            if pred(&token) || token == replacement {
                if !placed {
                    out.push(replacement.to_string());
                    placed = true;
                }
            } else {
                out.push(token);
            }
        }
        if !placed {
            out.push(replacement.to_string());
        }
        self.tokens = out;
    }

    /// Set `key=value`, keeping the position of the first existing `key=` token
    pub fn set_keyed(&mut self, key: &str, value: &str) {
        let replacement = format!("{key}={value}");
        self.replace_or_push(|t| keyed_value(t, key).is_some(), &replacement);
    }

    /// Comma-joined tokens; `defaults` is dropped once a real option exists
    /// and an empty set renders as `defaults`.
    pub fn render(&self) -> String {
        let real: Vec<&str> = self.iter().filter(|t| *t != DEFAULTS).collect();
        if real.is_empty() {
            DEFAULTS.to_string()
        } else {
            real.join(",")
        }
    }

    /// Option string handed to `mount -o remount,...`, without the placeholder
    pub fn remount_options(&self) -> String {
        self.iter()
            .filter(|t| *t != DEFAULTS)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for OptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Split on commas that are not inside a double-quoted value
fn split_unquoted(raw: &str) -> impl Iterator<Item = &str> {
    let mut quoted = false;
    raw.split(move |c| {
        if c == '"' {
            quoted = !quoted;
        }
        c == ',' && !quoted
    })
}

fn keyed_value<'a>(token: &'a str, key: &str) -> Option<&'a str> {
    token.strip_prefix(key)?.strip_prefix('=')
}
