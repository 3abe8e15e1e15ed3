//! Relocation of a scanned collection into the artist/album layout.
//!
//! Every sanitized music file ends up at
//! `<root>/<artist>/<album>/<track> - <title>.<ext>`. Files sharing a
//! content hash would land on the same path, so only one of each group
//! moves; the others stay put or are removed. A file already sitting at
//! its target is the one kept. Directories emptied by the run are removed
//! afterwards.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};

use tagrenamer_analyze::{DuplicateConfig, DuplicateFinder, DuplicateReport};
use tagrenamer_core::{
    Callbacks, MoveOptions, NodeId, NodeKind, NodeTree, SanitizedTags, Sanitizer, TreeError,
};

/// Options for [`rename_collection`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RenameOptions {
    /// Remove every duplicate but the first instead of leaving it in place.
    pub remove_duplicates: bool,
}

/// What a rename run did, or planned to do in dry-run mode.
#[derive(Debug, Default)]
pub struct RenameSummary {
    pub moved: u64,
    pub unchanged: u64,
    pub duplicates_skipped: u64,
    pub duplicates_removed: u64,
    pub directories_removed: u64,
    /// Files left in place because a field sanitized to nothing.
    pub unsanitizable: Vec<(PathBuf, String)>,
    /// Files left in place because another entry already holds their target name.
    pub collisions: Vec<PathBuf>,
}

/// File name of a sanitized music file: `<track> - <title>.<ext>`.
pub fn target_name(sanitized: &SanitizedTags, extension: &str) -> String {
    if extension.is_empty() {
        format!("{} - {}", sanitized.track, sanitized.title)
    } else {
        format!("{} - {}.{extension}", sanitized.track, sanitized.title)
    }
}

/// Sanitize every music file of `tree` and give it a name in the collection layout.
pub fn rename_collection(
    tree: &mut NodeTree,
    root: NodeId,
    sanitizer: &dyn Sanitizer,
    callbacks: Arc<Callbacks>,
    options: RenameOptions,
) -> Result<RenameSummary> {
    let mut summary = RenameSummary::default();
    let music = sanitize_all(tree, sanitizer, &mut summary)?;

    let report = DuplicateFinder::new().find_duplicates(tree);
    let redundant = redundant_files(tree, root, &report)?;

    // Directories a file left during this run
    let mut vacated = HashSet::new();
    for id in music {
        if redundant.contains(&id) {
            if options.remove_duplicates {
                let removed = tree.remove(id).wrap_err("Failed to remove duplicate")?;
                vacated.extend(removed.parent());
                summary.duplicates_removed += 1;
            } else {
                summary.duplicates_skipped += 1;
            }
            continue;
        }
        let parent = tree.node(id)?.parent();
        if relocate(tree, root, id, &callbacks, &mut summary)? {
            vacated.extend(parent);
        }
    }

    summary.directories_removed = remove_empty_directories(tree, root, vacated)?;
    Ok(summary)
}

/// Every duplicate except the one kept per group.
///
/// The kept file is the first group member already at its target path, or
/// the first in path order when none is.
fn redundant_files(tree: &NodeTree, root: NodeId, report: &DuplicateReport) -> Result<HashSet<NodeId>> {
    let mut redundant = HashSet::new();
    for group in &report.groups {
        let mut placed = None;
        for &id in &group.nodes {
            let node = tree.node(id)?;
            if target_path(tree, root, id)?.is_some_and(|target| target == node.path()) {
                placed = Some(id);
                break;
            }
        }
        let Some(keeper) = placed.or_else(|| group.keeper()) else {
            continue;
        };
        redundant.extend(group.nodes.iter().copied().filter(|id| *id != keeper));
    }
    Ok(redundant)
}

/// Path a sanitized music file is renamed to, if it has one.
fn target_path(tree: &NodeTree, root: NodeId, id: NodeId) -> Result<Option<PathBuf>> {
    let node = tree.node(id)?;
    let Some(music) = node.music() else {
        return Ok(None);
    };
    let Some(sanitized) = music.sanitized() else {
        return Ok(None);
    };
    let name = target_name(sanitized, music.extension());
    let path = tree
        .node(root)?
        .path()
        .join(sanitized.artist.as_str())
        .join(sanitized.album.as_str())
        .join(name);
    Ok(Some(path))
}

/// Sanitize all music files, in path order. Returns the ones that succeeded.
pub fn sanitize_all(
    tree: &mut NodeTree,
    sanitizer: &dyn Sanitizer,
    summary: &mut RenameSummary,
) -> Result<Vec<NodeId>> {
    let mut music: Vec<(PathBuf, NodeId)> = tree
        .music_files()
        .map(|node| (node.path().to_path_buf(), node.id()))
        .collect();
    music.sort();

    let mut sanitized = Vec::with_capacity(music.len());
    for (path, id) in music {
        match tree.sanitize(id, sanitizer) {
            Ok(_) => sanitized.push(id),
            Err(err @ TreeError::EmptyField { .. }) => {
                warn!(path = %path.display(), "{err}");
                summary.unsanitizable.push((path, err.to_string()));
            }
            Err(TreeError::AlreadySanitized { .. }) => sanitized.push(id),
            Err(err) => return Err(err).wrap_err_with(|| format!("Failed to sanitize {}", path.display())),
        }
    }
    Ok(sanitized)
}

/// Duplicate report over a tree that was already sanitized.
pub fn duplicate_report(tree: &NodeTree, config: DuplicateConfig) -> DuplicateReport {
    DuplicateFinder::with_config(config).find_duplicates(tree)
}

/// Move one music file to its target. Returns whether it moved.
fn relocate(
    tree: &mut NodeTree,
    root: NodeId,
    id: NodeId,
    callbacks: &Arc<Callbacks>,
    summary: &mut RenameSummary,
) -> Result<bool> {
    let node = tree.node(id)?;
    let Some(music) = node.music() else {
        return Ok(false);
    };
    let Some(sanitized) = music.sanitized() else {
        return Ok(false);
    };
    let name = target_name(sanitized, music.extension());
    let (artist, album) = (sanitized.artist.clone(), sanitized.album.clone());
    let path = node.path().to_path_buf();

    let artist_dir = tree.create_directory(root, &artist, Arc::clone(callbacks))?;
    let album_dir = tree.create_directory(artist_dir, &album, Arc::clone(callbacks))?;

    if tree.child_named(album_dir, &name) == Some(id) {
        summary.unchanged += 1;
        return Ok(false);
    }
    match tree.move_node(id, album_dir, MoveOptions::renamed(name.as_str())) {
        Ok(()) => {
            summary.moved += 1;
            Ok(true)
        }
        Err(TreeError::TargetExists { .. }) => {
            warn!(path = %path.display(), target = %name, "target name already taken");
            summary.collisions.push(path);
            Ok(false)
        }
        Err(err) => Err(err).wrap_err_with(|| format!("Failed to move {}", path.display())),
    }
}

/// Remove the `vacated` directories that hold nothing anymore, deepest
/// first. A parent emptied by such a removal goes as well.
fn remove_empty_directories(tree: &mut NodeTree, root: NodeId, mut vacated: HashSet<NodeId>) -> Result<u64> {
    let mut removed = 0;
    for id in tree.descendants(root).into_iter().rev() {
        if !vacated.contains(&id) {
            continue;
        }
        let Some(node) = tree.get(id) else { continue };
        if !matches!(node.kind(), NodeKind::Entry) || !node.children().is_empty() {
            continue;
        }
        info!(path = %node.path().display(), "removing empty directory");
        let node = tree.remove(id).wrap_err("Failed to remove empty directory")?;
        vacated.extend(node.parent());
        removed += 1;
    }
    Ok(removed)
}
