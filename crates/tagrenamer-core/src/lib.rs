//! Core types for tagrenamer.
//!
//! This crate provides the in-memory filesystem tree that the scanner builds
//! and the renamer mutates: nodes for generic entries, plain files and music
//! files, the event table that keeps reporting decoupled from mutation, and
//! the metadata pipeline (extract, sanitize, validate, hash) that gives every
//! music file its content identity.

mod config;
mod error;
mod event;
mod music;
mod node;
mod shell;
mod tree;

pub use config::{ScanConfig, ScanConfigBuilder, Settings, SettingsBuilder};
pub use error::{ScanError, ScanWarning, TagError, TreeError, WarningKind};
pub use event::{Callbacks, Event, EventKind, Handler, HandlerError};
pub use music::{
    MUSIC_EXTENSIONS, MetadataField, MusicFile, SanitizedTags, Sanitizer, TagMap, TagReader,
    TrackTags, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_TITLE, UNKNOWN_TRACK, content_hash,
    is_music_extension, keys,
};
pub use node::{ContentHash, Node, NodeId, NodeKind};
pub use shell::{
    MKDIR_COMMAND, MOVE_COMMAND, REMOVE_COMMAND, ShellScript, escape_argument,
    record_shell_equivalent, render_command,
};
pub use tree::{MoveOptions, NodeTree, TreeStats, resolve_path};
