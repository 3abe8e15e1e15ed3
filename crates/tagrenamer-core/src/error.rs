//! Error types for tree, tag and scanning operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{EventKind, HandlerError};
use crate::music::MetadataField;
use crate::node::NodeId;

/// Errors raised by node tree operations.
#[derive(Debug, Error)]
pub enum TreeError {
    /// Filesystem failure while resolving, moving, removing or creating a path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A node was asked to move onto itself.
    #[error("Can't move '{path}' to itself")]
    SelfMove { path: PathBuf },

    /// A node was asked to move below one of its own descendants.
    #[error("Can't move '{from}' into its own descendant '{to}'")]
    MoveIntoDescendant { from: PathBuf, to: PathBuf },

    /// Another entry already holds the destination name.
    #[error("Can't move '{from}': '{path}' already exists")]
    TargetExists { from: PathBuf, path: PathBuf },

    /// The handle does not refer to a live node (never created, or removed).
    #[error("Node {id} is not part of the tree")]
    NodeNotFound { id: NodeId },

    /// A music-only operation was invoked on a plain node.
    #[error("Not a music file: {path}")]
    NotAMusicFile { path: PathBuf },

    /// A base name that is not a single path component.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// The file carries an album artist tag while album artist mode is off.
    #[error(
        "The following file has an albumartist tag set:\n\n\
         File:        '{relpath}'\n\
         Artist:      '{artist}'\n\
         Albumartist: '{album_artist}'\n\n\
         Please remove 'albumartist' tags from your files.\n\n\
         Run with --albumartist if you are renaming VA albums!"
    )]
    AlbumArtistTag {
        relpath: PathBuf,
        artist: String,
        album_artist: String,
    },

    /// A metadata field became empty after sanitizing.
    #[error("Empty {field} after sanitizing '{raw}' in {path}")]
    EmptyField {
        path: PathBuf,
        field: MetadataField,
        raw: String,
    },

    /// Sanitizing happens once per music file.
    #[error("Already sanitized: {path}")]
    AlreadySanitized { path: PathBuf },

    /// Tag extraction failed.
    #[error(transparent)]
    Tags(#[from] TagError),

    /// A registered callback reported a failure.
    #[error("The {event} callback failed: {source}")]
    Callback {
        event: EventKind,
        #[source]
        source: HandlerError,
    },
}

impl TreeError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check whether this is a filesystem failure.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Errors returned by tag extraction backends.
#[derive(Debug, Error)]
pub enum TagError {
    /// The file could not be opened or parsed.
    #[error("Failed to read tags from {path}: {message}")]
    Read { path: PathBuf, message: String },
}

/// Errors that can occur during scanning.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Building the node tree failed.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Kind of scan warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Error reading a directory entry.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// Entry whose parent directory was never registered.
    Orphaned,
}

/// Non-fatal warning encountered during scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new scan warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a read error warning.
    pub fn read_error(path: impl Into<PathBuf>, error: impl std::fmt::Display) -> Self {
        Self::new(path, format!("Read error: {error}"), WarningKind::ReadError)
    }
}
