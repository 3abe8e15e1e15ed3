//! JWalk-based directory scanner.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use jwalk::WalkDir;
use tracing::{debug, info};

use tagrenamer_core::{
    Callbacks, NodeId, NodeTree, ScanConfig, ScanError, ScanWarning, Settings, TagReader, TreeError,
    TreeStats, WarningKind,
};

/// Result of a scan: the populated tree and what happened while building it.
#[derive(Debug)]
pub struct ScanOutcome {
    /// The node tree mirroring the scanned directory.
    pub tree: NodeTree,
    /// Handle of the scanned root directory.
    pub root: NodeId,
    /// Canonical path of the root directory.
    pub root_path: PathBuf,
    /// Node counts per kind after the scan.
    pub stats: TreeStats,
    /// Non-fatal problems, in walk order.
    pub warnings: Vec<ScanWarning>,
    /// Wall time spent scanning.
    pub duration: Duration,
}

/// Walks a directory with jwalk and builds a [`NodeTree`] from it.
///
/// Directories become generic nodes, files with a music extension become
/// music files (extracting their tags on the way) and everything else a
/// plain file. Every node shares the scanner's callback table.
pub struct TreeScanner<'r> {
    reader: &'r dyn TagReader,
    callbacks: Arc<Callbacks>,
}

impl<'r> TreeScanner<'r> {
    /// Create a scanner reading tags through `reader`.
    pub fn new(reader: &'r dyn TagReader) -> Self {
        Self {
            reader,
            callbacks: Arc::default(),
        }
    }

    /// Use `callbacks` for every node the scan creates.
    pub fn with_callbacks(mut self, callbacks: Arc<Callbacks>) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Scan `config.root` into a new tree operating under `settings`.
    ///
    /// Unreadable entries and files whose tags cannot be read are reported
    /// as warnings; the latter still join the tree as plain files. Errors
    /// from the tree itself, such as an album artist tag outside album
    /// artist mode, abort the scan.
    pub fn scan(&self, config: &ScanConfig, settings: Settings) -> Result<ScanOutcome, ScanError> {
        let start = Instant::now();
        if config.music_extensions.is_empty() {
            return Err(ScanError::InvalidConfig {
                message: "no music extensions configured".to_string(),
            });
        }
        let root_path = config
            .root
            .canonicalize()
            .map_err(|e| ScanError::io(&config.root, e))?;

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory { path: root_path });
        }

        let mut tree = NodeTree::new(settings);
        let root = tree.add_node(&root_path, None, Arc::clone(&self.callbacks))?;
        debug!(root = %root_path.display(), "scanning");

        let mut warnings = Vec::new();
        self.walk(config, &root_path, root, &mut tree, &mut warnings)?;

        let stats = tree.stats();
        let duration = start.elapsed();
        info!(
            directories = stats.total_entries,
            files = stats.total_files,
            music_files = stats.total_music_files,
            warnings = warnings.len(),
            elapsed_ms = duration.as_millis() as u64,
            "scan complete"
        );

        Ok(ScanOutcome {
            tree,
            root,
            root_path,
            stats,
            warnings,
            duration,
        })
    }

    fn walk(
        &self,
        config: &ScanConfig,
        root_path: &Path,
        root: NodeId,
        tree: &mut NodeTree,
        warnings: &mut Vec<ScanWarning>,
    ) -> Result<(), ScanError> {
        let walker = WalkDir::new(root_path)
            .sort(true)
            .skip_hidden(!config.include_hidden)
            .follow_links(config.follow_symlinks)
            .min_depth(1)
            .max_depth(config.max_depth.map(|d| d as usize).unwrap_or(usize::MAX));

        // Directories registered so far, by path
        let mut directories: HashMap<PathBuf, NodeId> = HashMap::new();
        directories.insert(root_path.to_path_buf(), root);
        let mut ignored: Vec<PathBuf> = Vec::new();

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    warnings.push(ScanWarning::read_error(path, &err));
                    continue;
                }
            };

            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().to_string();

            if config.should_ignore(&file_name) || config.should_skip_hidden(&file_name) {
                ignored.push(path);
                continue;
            }

            let Some(parent) = path.parent().and_then(|p| directories.get(p)).copied() else {
                if !ignored.iter().any(|dir| path.starts_with(dir)) {
                    warnings.push(ScanWarning::new(
                        &path,
                        "Parent directory was not scanned",
                        WarningKind::Orphaned,
                    ));
                }
                continue;
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                let id = tree.add_node(&path, Some(parent), Arc::clone(&self.callbacks))?;
                directories.insert(path, id);
                continue;
            }

            let extension = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_string())
                .unwrap_or_default();

            if file_type.is_file() && config.is_music_extension(&extension) {
                match tree.add_music_file(&path, Some(parent), &extension, Arc::clone(&self.callbacks), self.reader) {
                    Ok(_) => continue,
                    Err(TreeError::Tags(err)) => {
                        warnings.push(ScanWarning::new(&path, err.to_string(), WarningKind::MetadataError));
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            tree.add_file(&path, Some(parent), &extension, Arc::clone(&self.callbacks))?;
        }

        Ok(())
    }
}
