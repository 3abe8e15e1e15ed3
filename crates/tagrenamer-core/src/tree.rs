//! The node tree and the operations that mutate it.
//!
//! Nodes live in an arena indexed by [`NodeId`]. Every mutation keeps
//! parent/child links, roots and relative paths consistent, in dry-run mode
//! too: dry-run only skips the physical filesystem call.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::Settings;
use crate::error::TreeError;
use crate::event::{Callbacks, Event};
use crate::music::{MetadataField, MusicFile, SanitizedTags, Sanitizer, TagReader, TrackTags};
use crate::node::{Node, NodeId, NodeKind, absolutize, base_name, file_extension, relative_path};
use crate::shell::{self, MKDIR_COMMAND, MOVE_COMMAND, REMOVE_COMMAND};

/// Nodes up to this level log at debug, deeper ones at trace.
const DEBUG_LEVEL_LIMIT: u32 = 2;

fn log(level: u32, category: &str, message: impl fmt::Display) {
    if level <= DEBUG_LEVEL_LIMIT {
        debug!(category, depth = level, "{message}");
    } else {
        trace!(category, depth = level, "{message}");
    }
}

/// Options for [`NodeTree::move_node`].
#[derive(Debug, Clone, Default)]
pub struct MoveOptions {
    /// New base name; the current one is kept when unset.
    pub new_name: Option<String>,
    /// Update the in-memory tree only, without touching the filesystem.
    pub references_only: bool,
}

impl MoveOptions {
    /// Move and rename in one step.
    pub fn renamed(name: impl Into<String>) -> Self {
        Self {
            new_name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Re-anchor a node whose path already changed on disk.
    pub fn references_only() -> Self {
        Self {
            references_only: true,
            ..Self::default()
        }
    }
}

/// Summary statistics for a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    /// Number of generic entries (directories and others).
    pub total_entries: u64,
    /// Number of plain files.
    pub total_files: u64,
    /// Number of music files.
    pub total_music_files: u64,
    /// Number of sanitized music files.
    pub sanitized_music_files: u64,
    /// Deepest node level.
    pub max_level: u32,
}

/// Arena of filesystem nodes forming one or more trees.
#[derive(Debug, Default)]
pub struct NodeTree {
    nodes: Vec<Option<Node>>,
    settings: Settings,
}

impl NodeTree {
    /// Create an empty tree operating under `settings`.
    pub fn new(settings: Settings) -> Self {
        Self {
            nodes: Vec::new(),
            settings,
        }
    }

    /// Settings the tree was created with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Check whether physical filesystem calls are skipped.
    pub fn is_dry_run(&self) -> bool {
        self.settings.dry_run
    }

    /// Look up a live node.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Look up a live node, failing for inert handles.
    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.get(id).ok_or(TreeError::NodeNotFound { id })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(TreeError::NodeNotFound { id })
    }

    /// Check whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Check whether the tree holds no live node.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over live nodes in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter_map(Option::as_ref)
    }

    /// Live nodes without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.iter().filter(|node| node.parent.is_none())
    }

    /// Live music file nodes.
    pub fn music_files(&self) -> impl Iterator<Item = &Node> {
        self.iter().filter(|node| node.kind.is_music())
    }

    /// Handles of the children of `id`.
    pub fn children(&self, id: NodeId) -> Result<&[NodeId], TreeError> {
        Ok(self.node(id)?.children())
    }

    /// Child of `parent` with the given base name.
    pub fn child_named(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.get(parent)?
            .children
            .iter()
            .copied()
            .find(|child| self.get(*child).is_some_and(|node| node.base == name))
    }

    /// All descendants of `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = match self.get(id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return found,
        };
        while let Some(current) = stack.pop() {
            if let Some(node) = self.get(current) {
                found.push(current);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        found
    }

    /// Check whether `ancestor` lies on the parent chain of `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.get(id).and_then(|node| node.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.get(parent).and_then(|node| node.parent);
        }
        false
    }

    /// Collect summary statistics over live nodes.
    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        for node in self.iter() {
            match &node.kind {
                NodeKind::Entry => stats.total_entries += 1,
                NodeKind::File { .. } => stats.total_files += 1,
                NodeKind::Music(music) => {
                    stats.total_music_files += 1;
                    if music.is_sanitized() {
                        stats.sanitized_music_files += 1;
                    }
                }
            }
            stats.max_level = stats.max_level.max(node.level);
        }
        stats
    }

    /// Check whether the path of `id` currently exists on disk.
    pub fn exists(&self, id: NodeId) -> Result<bool, TreeError> {
        let node = self.node(id)?;
        log(node.level, &node.category("exists"), node);
        Ok(node.exists())
    }

    /// Add a generic node for `path`.
    pub fn add_node(
        &mut self,
        path: impl AsRef<Path>,
        parent: Option<NodeId>,
        callbacks: Arc<Callbacks>,
    ) -> Result<NodeId, TreeError> {
        let node = self.build(path.as_ref(), parent, callbacks)?;
        self.attach(node)
    }

    /// Add a plain file node. `extension` is applied when the base name has a dot.
    pub fn add_file(
        &mut self,
        path: impl AsRef<Path>,
        parent: Option<NodeId>,
        extension: &str,
        callbacks: Arc<Callbacks>,
    ) -> Result<NodeId, TreeError> {
        let mut node = self.build(path.as_ref(), parent, callbacks)?;
        node.kind = NodeKind::File {
            extension: file_extension(&node.base, extension),
        };
        self.attach(node)
    }

    /// Add a music file node, extracting its tags through `reader`.
    ///
    /// A file that fails extraction never joins the tree.
    pub fn add_music_file(
        &mut self,
        path: impl AsRef<Path>,
        parent: Option<NodeId>,
        extension: &str,
        callbacks: Arc<Callbacks>,
        reader: &dyn TagReader,
    ) -> Result<NodeId, TreeError> {
        let mut node = self.build(path.as_ref(), parent, callbacks)?;
        let extension = file_extension(&node.base, extension);

        let category = "MusicFile.extract";
        log(node.level, category, &node);
        let raw = reader.read_tags(&node.path)?;
        let tags = TrackTags::extract(&raw, self.settings.album_artist, &node.relpath)?;

        let detail = node.level + 1;
        if tags.from_album_artist {
            log(detail, category, format_args!("Artst: '{}' (via albumartist)", tags.artist));
        } else {
            log(detail, category, format_args!("Artst: '{}'", tags.artist));
        }
        log(detail, category, format_args!("Album: '{}'", tags.album));
        log(detail, category, format_args!("Title: '{}'", tags.title));
        log(detail, category, format_args!("Track: '{}'", tags.track));

        node.kind = NodeKind::Music(Box::new(MusicFile::new(extension, tags)));
        self.attach(node)
    }

    /// Sanitize the metadata of a music file and compute its content hash.
    ///
    /// Fires `sanitize` once the sanitized fields and hash are stored. A
    /// field that sanitizes to nothing fails before any of that happens.
    pub fn sanitize(&mut self, id: NodeId, sanitizer: &dyn Sanitizer) -> Result<&SanitizedTags, TreeError> {
        let node = self.node(id)?;
        let music = node
            .music()
            .ok_or_else(|| TreeError::NotAMusicFile { path: node.path.clone() })?;
        if music.is_sanitized() {
            return Err(TreeError::AlreadySanitized { path: node.path.clone() });
        }

        let category = node.category("sanitize");
        log(node.level, &category, node);
        let sanitized = SanitizedTags::compute(music.tags(), music.extension(), sanitizer, &node.path)?;

        let detail = node.level + 1;
        for field in MetadataField::ALL {
            log(detail, &category, format_args!("{{{field}}}: '{}'", sanitized.get(field)));
        }
        log(detail, &category, format_args!("{{hash}}: '{}'", sanitized.hash_hex));
        log(detail, &category, format_args!("{{ext}}: '{}'", music.extension()));

        if let NodeKind::Music(music) = &mut self.node_mut(id)?.kind {
            music.set_sanitized(sanitized);
        }

        let node = self.node(id)?;
        node.invoke(&Event::Sanitize(node))?;
        node.music()
            .and_then(MusicFile::sanitized)
            .ok_or(TreeError::NodeNotFound { id })
    }

    /// Delete the node from disk and detach it from the tree.
    ///
    /// Descendants leave the tree with it. The detached node is returned;
    /// its handle is inert from now on.
    pub fn remove(&mut self, id: NodeId) -> Result<Node, TreeError> {
        let node = self.node(id)?;
        log(node.level, &node.category("remove"), node);

        let path = node.path.clone();
        let path_arg = path.to_string_lossy();
        node.record_shell_equivalent(REMOVE_COMMAND, &[path_arg.as_ref()])?;
        if !self.settings.dry_run {
            remove_path(&path).map_err(|e| TreeError::io(&path, e))?;
        }

        if let Some(parent) = node.parent {
            self.node_mut(parent)?.children.retain(|child| *child != id);
        }
        for descendant in self.descendants(id) {
            self.nodes[descendant.index()] = None;
        }
        let removed = self.nodes[id.index()]
            .take()
            .ok_or(TreeError::NodeNotFound { id })?;

        removed.invoke(&Event::Remove(&removed))?;
        Ok(removed)
    }

    /// Move a node below `destination`.
    ///
    /// The physical rename is skipped for references-only moves and in
    /// dry-run mode. Descendants are re-anchored afterwards so their paths
    /// follow the new location.
    pub fn move_node(&mut self, id: NodeId, destination: NodeId, options: MoveOptions) -> Result<(), TreeError> {
        let node = self.node(id)?;
        if id == destination {
            return Err(TreeError::SelfMove { path: node.path.clone() });
        }
        let dest = self.node(destination)?;
        if self.is_ancestor(id, destination) {
            return Err(TreeError::MoveIntoDescendant {
                from: node.path.clone(),
                to: dest.path.clone(),
            });
        }

        let category = node.category("move");
        log(node.level, &category, node);

        let base = match options.new_name.as_deref() {
            Some(name) => {
                validate_name(name)?;
                CompactString::from(name)
            }
            None => node.base.clone(),
        };
        let old_path = node.path.clone();
        let new_path = dest.path.join(base.as_str());

        let taken = self.child_named(destination, &base).is_some_and(|other| other != id)
            || (!options.references_only
                && !self.settings.dry_run
                && new_path != old_path
                && fs::symlink_metadata(&new_path).is_ok());
        if taken {
            return Err(TreeError::TargetExists {
                from: old_path,
                path: new_path,
            });
        }

        if !options.references_only {
            let (old_arg, new_arg) = (old_path.to_string_lossy(), new_path.to_string_lossy());
            node.record_shell_equivalent(MOVE_COMMAND, &[old_arg.as_ref(), new_arg.as_ref()])?;
            if !self.settings.dry_run {
                fs::rename(&old_path, &new_path).map_err(|e| TreeError::io(&old_path, e))?;
            }
        }

        log(node.level + 1, &category, format_args!("src: '{}'", node.display_relative(&old_path)));
        log(node.level + 1, &category, format_args!("dst: '{}'", node.display_relative(&new_path)));

        let old_parent = node.parent;
        let dest_root = dest.root.clone();
        let dest_level = dest.level;

        if let Some(parent) = old_parent {
            self.node_mut(parent)?.children.retain(|child| *child != id);
        }
        let dest = self.node_mut(destination)?;
        if !dest.children.contains(&id) {
            dest.children.push(id);
        }

        let node = self.node_mut(id)?;
        node.parent = Some(destination);
        node.base = base_name(&new_path);
        node.relpath = relative_path(&new_path, &dest_root);
        node.path = new_path;
        node.root = dest_root;
        node.level = dest_level + 1;

        let node = self.node(id)?;
        let dest = self.node(destination)?;
        node.invoke(&Event::Move { node, destination: dest })?;

        let children = node.children.clone();
        for child in children {
            self.move_node(child, id, MoveOptions::references_only())?;
        }
        Ok(())
    }

    /// Return the child directory `name` of `parent`, creating it if needed.
    ///
    /// Creation is recorded as shell equivalent and skipped on disk in
    /// dry-run mode or when the directory already exists.
    pub fn create_directory(
        &mut self,
        parent: NodeId,
        name: &str,
        callbacks: Arc<Callbacks>,
    ) -> Result<NodeId, TreeError> {
        validate_name(name)?;
        if let Some(existing) = self.child_named(parent, name) {
            return Ok(existing);
        }

        let path = self.node(parent)?.path.join(name);
        let path_arg = path.to_string_lossy();
        shell::record_shell_equivalent(&callbacks, MKDIR_COMMAND, &[path_arg.as_ref()])?;
        if !self.settings.dry_run && !path.is_dir() {
            fs::create_dir(&path).map_err(|e| TreeError::io(&path, e))?;
        }
        self.add_node(path, Some(parent), callbacks)
    }

    fn build(&self, path: &Path, parent: Option<NodeId>, callbacks: Arc<Callbacks>) -> Result<Node, TreeError> {
        let parent = parent.map(|id| self.node(id)).transpose()?;
        let id = NodeId::new(self.nodes.len() as u64);
        Node::new(id, path, parent, callbacks)
    }

    fn attach(&mut self, node: Node) -> Result<NodeId, TreeError> {
        let id = node.id;
        if let Some(parent) = node.parent {
            self.node_mut(parent)?.children.push(id);
        }
        self.nodes.push(Some(node));

        let node = self.node(id)?;
        node.invoke(&Event::Init(node))?;
        Ok(id)
    }
}

/// Delete a file, symlink or empty directory.
fn remove_path(path: &Path) -> std::io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

/// Check that `name` is exactly one normal path component.
fn validate_name(name: &str) -> Result<(), TreeError> {
    let invalid = |reason: &str| TreeError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if name.contains('\0') {
        return Err(invalid("name cannot contain NUL"));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(std::path::MAIN_SEPARATOR) && !name.contains('/') => Ok(()),
        _ => Err(invalid("name must be a single path component")),
    }
}

/// Resolve `path` the same way node construction does.
pub fn resolve_path(path: impl AsRef<Path>) -> Result<PathBuf, TreeError> {
    let path = path.as_ref();
    absolutize(path).map_err(|e| TreeError::io(path, e))
}
