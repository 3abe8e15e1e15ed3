//! Node types: generic entries, plain files and music files.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::event::{Callbacks, Event};
use crate::music::MusicFile;
use crate::shell;

/// Handle of a node within a [`NodeTree`](crate::NodeTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    /// Create a new NodeId from a u64.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// BLAKE3 digest identifying a music file by its sanitized metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Variant-specific data of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Any filesystem entry without further specialization, directories included.
    Entry,
    /// An ordinary file.
    File {
        /// Extension supplied at construction, empty when the name has no dot.
        extension: CompactString,
    },
    /// A file of a recognized music format.
    Music(Box<MusicFile>),
}

impl NodeKind {
    /// Type name used as log category prefix.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Entry => "Node",
            NodeKind::File { .. } => "File",
            NodeKind::Music(_) => "MusicFile",
        }
    }

    /// Check if this is a plain or music file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File { .. } | NodeKind::Music(_))
    }

    /// Check if this is a music file.
    pub fn is_music(&self) -> bool {
        matches!(self, NodeKind::Music(_))
    }
}

/// One filesystem path in the tree.
///
/// A node exclusively owns the handles in `children`; `parent` is a
/// back-reference only. All mutation goes through [`NodeTree`](crate::NodeTree).
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) path: PathBuf,
    pub(crate) base: CompactString,
    pub(crate) root: PathBuf,
    pub(crate) relpath: PathBuf,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) level: u32,
    pub(crate) callbacks: Arc<Callbacks>,
    pub(crate) kind: NodeKind,
}

impl Node {
    /// Resolve `path` and derive base name, root and relative path.
    ///
    /// The root is inherited from `parent`; a parentless directory is its own
    /// root and a parentless file is anchored at its containing directory.
    pub(crate) fn new(
        id: NodeId,
        path: &Path,
        parent: Option<&Node>,
        callbacks: Arc<Callbacks>,
    ) -> Result<Self, TreeError> {
        let path = absolutize(path).map_err(|e| TreeError::io(path, e))?;
        let base = base_name(&path);

        let (root, level) = match parent {
            Some(parent) => (parent.root.clone(), parent.level + 1),
            None if path.is_dir() => (path.clone(), 1),
            None => (
                path.parent().map(Path::to_path_buf).unwrap_or_else(|| path.clone()),
                1,
            ),
        };
        let relpath = relative_path(&path, &root);

        Ok(Self {
            id,
            path,
            base,
            root,
            relpath,
            parent: parent.map(|p| p.id),
            children: Vec::new(),
            level,
            callbacks,
            kind: NodeKind::Entry,
        })
    }

    /// Handle of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Absolute path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Directory the tree of this node is anchored to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path relative to the root, for display.
    pub fn relpath(&self) -> &Path {
        &self.relpath
    }

    /// Handle of the containing node.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Handles of the owned child nodes.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Depth level, used to scale log verbosity.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Variant-specific data.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Callback table fixed at construction.
    pub fn callbacks(&self) -> &Arc<Callbacks> {
        &self.callbacks
    }

    /// Extension of a file node, `None` for generic entries.
    pub fn extension(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Entry => None,
            NodeKind::File { extension } => Some(extension.as_str()),
            NodeKind::Music(music) => Some(music.extension()),
        }
    }

    /// Music data, if this is a music file.
    pub fn music(&self) -> Option<&MusicFile> {
        match &self.kind {
            NodeKind::Music(music) => Some(music.as_ref()),
            _ => None,
        }
    }

    /// Check whether the path currently exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Fire `event` through this node's callback table.
    pub fn invoke(&self, event: &Event<'_>) -> Result<bool, TreeError> {
        self.callbacks.invoke(event)
    }

    /// Hand the shell equivalent of an action to the `shell_collect` handler.
    pub fn record_shell_equivalent(&self, template: &str, args: &[&str]) -> Result<(), TreeError> {
        shell::record_shell_equivalent(&self.callbacks, template, args)
    }

    pub(crate) fn category(&self, operation: &str) -> String {
        format!("{}.{operation}", self.kind.type_name())
    }

    pub(crate) fn display_relative(&self, path: &Path) -> String {
        relative_path(path, &self.root).display().to_string()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.base.chars().any(char::is_whitespace) {
            write!(f, "'{}'", self.base)
        } else {
            f.write_str(&self.base)
        }
    }
}

/// Make `path` absolute and lexically normalize `.` and `..` components.
pub(crate) fn absolutize(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// `path` with `root` and one separator stripped; `path` itself when it is
/// the root or lies outside of it.
pub(crate) fn relative_path(path: &Path, root: &Path) -> PathBuf {
    match path.strip_prefix(root) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => path.to_path_buf(),
    }
}

pub(crate) fn base_name(path: &Path) -> CompactString {
    path.file_name()
        .map(|name| CompactString::from(name.to_string_lossy()))
        .unwrap_or_default()
}

/// The caller-supplied extension, applied only when `base` contains a dot.
pub(crate) fn file_extension(base: &str, extension: &str) -> CompactString {
    if base.contains('.') {
        CompactString::from(extension)
    } else {
        CompactString::default()
    }
}
