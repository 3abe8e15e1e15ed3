//! Directory scanning for tagrenamer.
//!
//! Walks a music collection with jwalk and builds the node tree the renamer
//! works on. Music files are recognized by extension and have their tags
//! extracted while the tree is built.
//!
//! # Example
//!
//! ```rust,no_run
//! use tagrenamer_scan::{ScanConfig, Settings, TreeScanner};
//! use tagrenamer_tags::LoftyTagReader;
//!
//! let config = ScanConfig::new("/path/to/music");
//! let outcome = TreeScanner::new(&LoftyTagReader).scan(&config, Settings::default()).unwrap();
//!
//! println!("Music files: {}", outcome.stats.total_music_files);
//! ```

mod scanner;

pub use scanner::{ScanOutcome, TreeScanner};

// Re-export core types for convenience
pub use tagrenamer_core::{NodeId, NodeTree, ScanConfig, ScanError, ScanWarning, Settings, TreeStats, WarningKind};
