//! Concrete collaborators for the tagrenamer core.
//!
//! - [`LoftyTagReader`] reads embedded tags from mp3, ogg and flac files
//! - [`SafeString`] turns tag values into names safe for a single path component

mod reader;
mod safe_string;

pub use reader::{LoftyTagReader, tag_map};
pub use safe_string::{MAX_COMPONENT_LEN, SafeString, safe_string};
