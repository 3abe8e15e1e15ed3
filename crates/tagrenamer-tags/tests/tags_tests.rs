use std::fs;
use std::path::Path;
use std::sync::Arc;

use tagrenamer_core::{NodeTree, Settings, TagError, TagMap, TagReader, TreeError, keys};
use tagrenamer_tags::{LoftyTagReader, SafeString};
use tempfile::TempDir;

struct FixedTags(TagMap);

impl TagReader for FixedTags {
    fn read_tags(&self, _path: &Path) -> Result<TagMap, TagError> {
        Ok(self.0.clone())
    }
}

#[test]
fn test_unreadable_file_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.mp3");
    fs::write(&path, b"definitely not audio").unwrap();

    let err = LoftyTagReader::new().read_tags(&path).unwrap_err();
    match err {
        TagError::Read { path: reported, .. } => assert_eq!(reported, path),
    }
}

#[test]
fn test_missing_file_is_a_tree_error() {
    let dir = TempDir::new().unwrap();
    let mut tree = NodeTree::new(Settings::default());
    let root = tree.add_node(dir.path(), None, Arc::default()).unwrap();

    let err = tree
        .add_music_file(dir.path().join("gone.flac"), Some(root), "flac", Arc::default(), &LoftyTagReader)
        .unwrap_err();
    assert!(matches!(err, TreeError::Tags(TagError::Read { .. })));
    assert!(tree.children(root).unwrap().is_empty());
}

#[test]
fn test_safe_string_through_sanitize() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.ogg"), b"x").unwrap();
    let reader = FixedTags(
        TagMap::new()
            .with(keys::ARTIST, " AC/DC ")
            .with(keys::ALBUM, "Who Made Who?")
            .with(keys::TITLE, "...Ride On")
            .with(keys::TRACKNUMBER, "7/9"),
    );

    let mut tree = NodeTree::new(Settings::default());
    let root = tree.add_node(dir.path(), None, Arc::default()).unwrap();
    let song = tree
        .add_music_file(dir.path().join("a.ogg"), Some(root), "ogg", Arc::default(), &reader)
        .unwrap();

    let sanitized = tree.sanitize(song, &SafeString).unwrap();
    assert_eq!(sanitized.artist, "AC-DC");
    assert_eq!(sanitized.album, "Who Made Who");
    assert_eq!(sanitized.title, "Ride On");
    assert_eq!(sanitized.track, "7-9");
}

#[test]
fn test_title_of_only_reserved_characters_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.mp3"), b"x").unwrap();
    let reader = FixedTags(TagMap::new().with(keys::ARTIST, "Foo").with(keys::TITLE, "???"));

    let mut tree = NodeTree::new(Settings::default());
    let root = tree.add_node(dir.path(), None, Arc::default()).unwrap();
    let song = tree
        .add_music_file(dir.path().join("a.mp3"), Some(root), "mp3", Arc::default(), &reader)
        .unwrap();

    let err = tree.sanitize(song, &SafeString).unwrap_err();
    assert!(err.to_string().contains("title"));
}
