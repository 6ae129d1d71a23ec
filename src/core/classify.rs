//! Extension buckets and capability classes.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::metadata::FileRecord;
use crate::infra::config::Config;

/// What the materializer may do with files of an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// May merge into multi-file clips (stills, raw frames)
    Sequence,
    /// Always one file per clip (video containers)
    Single,
}

/// Records bucketed by lowercase extension, in first-seen order.
pub type ExtensionGroups = IndexMap<String, Vec<FileRecord>>;

/// Lowercase extension without the leading dot; `None` if the path has none.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
}

fn normalize(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Active allow-set with the capability of each allowed extension.
/// Built once per run and shared by reference.
#[derive(Debug, Clone)]
pub struct Classifier {
    allowed: HashMap<String, Capability>,
}

impl Classifier {
    /// `allow` narrows the union of both sets; empty means everything.
    /// An extension listed in both sets counts as sequence-capable.
    pub fn new(sequence: &[String], single: &[String], allow: &[String]) -> Self {
        let mut known = HashMap::new();
        for ext in single {
            known.insert(normalize(ext), Capability::Single);
        }
        for ext in sequence {
            known.insert(normalize(ext), Capability::Sequence);
        }

        let allowed = if allow.is_empty() {
            known
        } else {
            let mut narrowed = HashMap::new();
            for ext in allow.iter().map(|e| normalize(e)) {
                match known.get(&ext) {
                    Some(cap) => {
                        narrowed.insert(ext, *cap);
                    }
                    None => warn!(extension = %ext, "ignoring unknown extension in allow-list"),
                }
            }
            narrowed
        };

        Self { allowed }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.sequence_extensions,
            &config.single_extensions,
            &config.extensions,
        )
    }

    /// `None` when the extension is outside the allow-set.
    pub fn capability(&self, ext: &str) -> Option<Capability> {
        self.allowed.get(ext).copied()
    }

    pub fn is_sequence(&self, ext: &str) -> bool {
        self.capability(ext) == Some(Capability::Sequence)
    }

    /// Bucket records by extension, dropping anything not allowed.
    pub fn group(&self, records: Vec<FileRecord>) -> ExtensionGroups {
        let mut groups = ExtensionGroups::new();
        let mut dropped = 0usize;

        for record in records {
            match extension_of(&record.path).filter(|ext| self.allowed.contains_key(ext)) {
                Some(ext) => groups.entry(ext).or_default().push(record),
                None => dropped += 1,
            }
        }

        debug!(extensions = groups.len(), dropped, "grouped records by extension");
        groups
    }
}
