// src/events/trigger.rs

//! File metadata snapshots and trigger matching.
//!
//! Matching is pure: a trigger is evaluated against a [`FileSnapshot`]
//! captured at event time, so deleted files (where only the path survives)
//! and tests both go through the same code path.

use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use globset::Glob;
use nix::unistd::{Gid, Group, Uid, User};
use regex::Regex;
use tracing::debug;

use crate::workflow::model::EventTrigger;

/// Point-in-time metadata of one file, captured when an event fires.
#[derive(Debug, Clone, Default)]
pub struct FileSnapshot {
    pub path: PathBuf,
    pub size: Option<u64>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mode: Option<u32>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl FileSnapshot {
    /// Capture metadata for an existing file. Owner and group resolve to
    /// names through the system user database, falling back to numeric ids.
    pub fn capture(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;

        let owner = match User::from_uid(Uid::from_raw(meta.uid())) {
            Ok(Some(user)) => Some(user.name),
            _ => Some(meta.uid().to_string()),
        };
        let group = match Group::from_gid(Gid::from_raw(meta.gid())) {
            Ok(Some(group)) => Some(group.name),
            _ => Some(meta.gid().to_string()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            size: Some(meta.len()),
            owner,
            group,
            mode: Some(meta.mode()),
            created: meta.created().ok().map(DateTime::<Utc>::from),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    /// Snapshot with only the path known, for deleted files.
    pub fn path_only(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Self::default()
        }
    }

    fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

impl EventTrigger {
    /// Whether `snapshot` satisfies every constraint of this trigger.
    ///
    /// Checks run cheapest first: filename patterns, include/exclude globs,
    /// owner and group, then size bounds. A missing size (deleted file)
    /// counts as zero bytes.
    pub fn matches(&self, snapshot: &FileSnapshot) -> bool {
        let file_name = snapshot.file_name();
        let full_path = snapshot.path.to_string_lossy();

        if !self.patterns.is_empty() {
            let hit = self.patterns.iter().any(|pattern| {
                compile_pattern(pattern)
                    .map(|re| re.is_match(file_name))
                    .unwrap_or(false)
            });
            if !hit {
                return false;
            }
        }

        if !self.include_patterns.is_empty() {
            let hit = self
                .include_patterns
                .iter()
                .any(|g| glob_matches(g, file_name, &full_path));
            if !hit {
                debug!(path = %full_path, "no include pattern matched");
                return false;
            }
        }

        if self
            .exclude_patterns
            .iter()
            .any(|g| glob_matches(g, file_name, &full_path))
        {
            return false;
        }

        if let Some(owner) = &self.owner {
            if snapshot.owner.as_deref() != Some(owner.as_str()) {
                return false;
            }
        }

        if let Some(group) = &self.group {
            if snapshot.group.as_deref() != Some(group.as_str()) {
                return false;
            }
        }

        let size = snapshot.size.unwrap_or(0);
        if let Some(min) = self.min_size {
            if size < min {
                return false;
            }
        }
        if let Some(max) = self.max_size {
            if size > max {
                return false;
            }
        }

        true
    }
}

/// Compile a filename pattern, treating it as a regex first and falling
/// back to a glob-to-regex translation when it is not valid regex.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    if let Ok(re) = Regex::new(&format!("^{pattern}$")) {
        return Some(re);
    }

    let mut translated = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            _ => translated.push_str(&regex::escape(&c.to_string())),
        }
    }
    translated.push('$');
    Regex::new(&translated).ok()
}

/// Match a glob against the bare filename when the glob has no path
/// separator, otherwise against the full path.
fn glob_matches(glob: &str, file_name: &str, full_path: &str) -> bool {
    let Ok(matcher) = Glob::new(glob) else {
        return false;
    };
    let matcher = matcher.compile_matcher();
    if glob.contains('/') {
        matcher.is_match(full_path)
    } else {
        matcher.is_match(file_name)
    }
}
