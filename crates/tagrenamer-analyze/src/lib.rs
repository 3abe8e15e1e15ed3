//! Analysis over a sanitized tagrenamer tree.
//!
//! Two music files whose sanitized artist, album, title, track and extension
//! are equal share a content hash and would be renamed onto the same path.
//! [`DuplicateFinder`] groups them so the renamer can keep one and skip or
//! remove the rest.
//!
//! ```rust,ignore
//! use tagrenamer_analyze::DuplicateFinder;
//!
//! let report = DuplicateFinder::new().find_duplicates(&tree);
//! for group in &report.groups {
//!     println!("{}: {} copies", group.hash_hex, group.count());
//! }
//! ```

mod duplicates;

pub use duplicates::{DuplicateConfig, DuplicateConfigBuilder, DuplicateFinder, DuplicateGroup, DuplicateReport};
