//! Run settings and scan configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::music::MUSIC_EXTENSIONS;

/// Settings consumed read-only by the node tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), default)]
pub struct Settings {
    /// Plan and report every action without touching the filesystem.
    #[serde(default)]
    pub dry_run: bool,

    /// Let an album artist tag override the track artist.
    #[serde(default)]
    pub album_artist: bool,
}

impl Settings {
    /// Create a new settings builder.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Settings for a dry run.
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }
}

/// Configuration for scanning a music collection.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root path to scan.
    pub root: PathBuf,

    /// Follow symbolic links.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Maximum depth to traverse (None = unlimited).
    #[builder(default)]
    #[serde(default)]
    pub max_depth: Option<u32>,

    /// Exact names, `prefix*` or `*suffix` patterns to skip.
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Include hidden files (starting with .).
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub include_hidden: bool,

    /// Extensions recognized as music files, compared case-sensitively.
    #[builder(default = "default_music_extensions()")]
    #[serde(default = "default_music_extensions")]
    pub music_extensions: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_music_extensions() -> Vec<String> {
    MUSIC_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref root) = self.root {
            if root.as_os_str().is_empty() {
                return Err("Root path cannot be empty".to_string());
            }
        } else {
            return Err("Root path is required".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_symlinks: false,
            max_depth: None,
            ignore_patterns: Vec::new(),
            include_hidden: true,
            music_extensions: default_music_extensions(),
        }
    }

    /// Check if a path should be ignored based on patterns.
    pub fn should_ignore(&self, name: &str) -> bool {
        self.ignore_patterns.iter().any(|pattern| {
            if let Some(prefix) = pattern.strip_suffix('*') {
                name.starts_with(prefix)
            } else if let Some(suffix) = pattern.strip_prefix('*') {
                name.ends_with(suffix)
            } else {
                name == pattern
            }
        })
    }

    /// Check if hidden files should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }

    /// Check whether an extension marks a music file.
    pub fn is_music_extension(&self, extension: &str) -> bool {
        self.music_extensions.iter().any(|ext| ext == extension)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_builder() {
        let settings = Settings::builder()
            .dry_run(true)
            .album_artist(true)
            .build()
            .unwrap();

        assert!(settings.dry_run);
        assert!(settings.album_artist);
        assert_eq!(Settings::builder().build().unwrap(), Settings::default());
    }

    #[test]
    fn test_settings_deserialize_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(!settings.dry_run);
        assert!(!settings.album_artist);
    }

    #[test]
    fn test_config_builder_requires_root() {
        assert!(ScanConfig::builder().build().is_err());
        assert!(ScanConfig::builder().root("").build().is_err());

        let config = ScanConfig::builder()
            .root("/music")
            .max_depth(Some(2u32))
            .build()
            .unwrap();
        assert_eq!(config.root, PathBuf::from("/music"));
        assert_eq!(config.max_depth, Some(2));
        assert!(config.include_hidden);
    }

    #[test]
    fn test_music_extensions_are_case_sensitive() {
        let config = ScanConfig::new("/music");
        assert!(config.is_music_extension("mp3"));
        assert!(config.is_music_extension("FLAC"));
        assert!(!config.is_music_extension("Mp3"));
        assert!(!config.is_music_extension("wav"));
    }

    #[test]
    fn test_should_ignore() {
        let config = ScanConfig::builder()
            .root("/test")
            .ignore_patterns(vec!["Thumbs.db".to_string(), "*.log".to_string(), "tmp*".to_string()])
            .build()
            .unwrap();

        assert!(config.should_ignore("Thumbs.db"));
        assert!(config.should_ignore("rip.log"));
        assert!(config.should_ignore("tmp-files"));
        assert!(!config.should_ignore("cover.jpg"));
    }

    #[test]
    fn test_should_skip_hidden() {
        let mut config = ScanConfig::new("/test");
        assert!(!config.should_skip_hidden(".stfolder"));

        config.include_hidden = false;
        assert!(config.should_skip_hidden(".stfolder"));
        assert!(!config.should_skip_hidden("Artist"));
    }
}
