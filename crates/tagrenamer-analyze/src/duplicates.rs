//! Duplicate detection by content hash.
//!
//! The hash is computed from sanitized metadata when a music file is
//! sanitized, so grouping is a single pass over the tree: no file content
//! is read here.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tagrenamer_core::{ContentHash, NodeId, NodeTree};

/// Configuration for duplicate detection.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct DuplicateConfig {
    /// Substrings of relative paths to exclude from detection.
    #[builder(default)]
    pub exclude_patterns: Vec<String>,

    /// Maximum number of groups to return (0 = unlimited).
    #[builder(default = "0")]
    pub max_groups: usize,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: Vec::new(),
            max_groups: 0,
        }
    }
}

impl DuplicateConfig {
    /// Create a new config builder.
    pub fn builder() -> DuplicateConfigBuilder {
        DuplicateConfigBuilder::default()
    }
}

/// Music files sharing one content hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content hash shared by all files in this group.
    pub hash: ContentHash,

    /// The hash as lowercase hex.
    pub hash_hex: String,

    /// Sanitized `artist/album/track - title` the group would be renamed to.
    pub label: String,

    /// Handles of the files, in path order.
    pub nodes: Vec<NodeId>,

    /// Paths of the files, in the same order as `nodes`.
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Get the number of files in the group.
    pub fn count(&self) -> usize {
        self.paths.len()
    }

    /// Number of files left over when one is kept.
    pub fn deletable_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }

    /// The file that is kept: the first in path order.
    pub fn keeper(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// Every file except the keeper.
    pub fn redundant(&self) -> &[NodeId] {
        self.nodes.get(1..).unwrap_or_default()
    }
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Groups of duplicate files, sorted by hash.
    pub groups: Vec<DuplicateGroup>,

    /// Number of sanitized music files analyzed.
    pub files_analyzed: u64,

    /// Number of music files skipped because they were never sanitized.
    pub files_unsanitized: u64,

    /// Number of files that have duplicates.
    pub files_with_duplicates: u64,

    /// Number of duplicate groups.
    pub group_count: usize,
}

impl DuplicateReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Get total number of files that could be dropped, one kept per group.
    pub fn total_redundant_files(&self) -> usize {
        self.groups.iter().map(DuplicateGroup::deletable_count).sum()
    }

    /// Handles of all files that are not the keeper of their group.
    pub fn redundant_nodes(&self) -> HashSet<NodeId> {
        self.groups
            .iter()
            .flat_map(|group| group.redundant().iter().copied())
            .collect()
    }
}

/// Groups sanitized music files by content hash.
#[derive(Debug, Default)]
pub struct DuplicateFinder {
    config: DuplicateConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new duplicate finder with custom config.
    pub fn with_config(config: DuplicateConfig) -> Self {
        Self { config }
    }

    /// Find duplicates among the sanitized music files of `tree`.
    pub fn find_duplicates(&self, tree: &NodeTree) -> DuplicateReport {
        let mut by_hash: BTreeMap<ContentHash, Vec<(PathBuf, NodeId, String)>> = BTreeMap::new();
        let mut files_analyzed = 0;
        let mut files_unsanitized = 0;

        for node in tree.music_files() {
            let relpath = node.relpath().to_string_lossy();
            if self.config.exclude_patterns.iter().any(|p| relpath.contains(p.as_str())) {
                continue;
            }
            let Some(sanitized) = node.music().and_then(|music| music.sanitized()) else {
                files_unsanitized += 1;
                continue;
            };

            files_analyzed += 1;
            let label = format!(
                "{}/{}/{} - {}",
                sanitized.artist, sanitized.album, sanitized.track, sanitized.title
            );
            by_hash
                .entry(sanitized.hash)
                .or_default()
                .push((node.path().to_path_buf(), node.id(), label));
        }

        let mut groups: Vec<DuplicateGroup> = by_hash
            .into_iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|(hash, mut files)| {
                files.sort();
                let label = files.first().map(|(_, _, label)| label.clone()).unwrap_or_default();
                let (paths, nodes) = files.into_iter().map(|(path, id, _)| (path, id)).unzip();
                DuplicateGroup {
                    hash,
                    hash_hex: hash.to_hex(),
                    label,
                    nodes,
                    paths,
                }
            })
            .collect();

        // Apply max_groups limit if set
        if self.config.max_groups > 0 && groups.len() > self.config.max_groups {
            groups.truncate(self.config.max_groups);
        }

        let files_with_duplicates: u64 = groups.iter().map(|g| g.paths.len() as u64).sum();
        let group_count = groups.len();
        debug!(files_analyzed, files_unsanitized, group_count, "duplicate detection finished");

        DuplicateReport {
            groups,
            files_analyzed,
            files_unsanitized,
            files_with_duplicates,
            group_count,
        }
    }
}
