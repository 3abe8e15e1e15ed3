//! Music metadata: extraction, sanitizing and content identity.
//!
//! Raw tags come from a [`TagReader`] and are reduced to four fields. A
//! [`Sanitizer`] later turns them into filesystem-safe strings, and the
//! sanitized fields plus the extension are hashed into a [`ContentHash`].
//! Two files with equal sanitized metadata and extension share that hash.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::error::{TagError, TreeError};
use crate::node::ContentHash;

/// Extensions recognized as music files. Matching is case-sensitive.
pub const MUSIC_EXTENSIONS: [&str; 6] = ["mp3", "MP3", "ogg", "OGG", "flac", "FLAC"];

pub const UNKNOWN_ARTIST: &str = "unknown_artist";
pub const UNKNOWN_ALBUM: &str = "unknown_album";
pub const UNKNOWN_TITLE: &str = "unknown_title";
pub const UNKNOWN_TRACK: &str = "unknown_track";

/// Tag names understood by the extraction step.
pub mod keys {
    pub const ARTIST: &str = "ARTIST";
    pub const ALBUMARTIST: &str = "ALBUMARTIST";
    pub const ALBUM: &str = "ALBUM";
    pub const TITLE: &str = "TITLE";
    pub const TRACKNUMBER: &str = "TRACKNUMBER";
}

/// Check whether `extension` is one of [`MUSIC_EXTENSIONS`].
pub fn is_music_extension(extension: &str) -> bool {
    MUSIC_EXTENSIONS.contains(&extension)
}

/// Raw tag values keyed by tag name. A tag may carry several values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    tags: HashMap<String, Vec<String>>,
}

impl TagMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to `key`.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.entry(key.into()).or_default().push(value.into());
    }

    /// Append a value to `key`, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Replace all values of `key`.
    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.tags.insert(key.into(), values);
    }

    /// Values of `key`, if the tag is present.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.tags.get(key).map(Vec::as_slice)
    }

    /// Values of `key` joined with a single space.
    pub fn joined(&self, key: &str) -> Option<String> {
        self.get(key).map(|values| values.join(" "))
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Check whether no tag is present.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.push(key, value);
        }
        map
    }
}

/// Reads the raw tags of a file.
pub trait TagReader {
    /// Return every tag found in the file at `path`.
    fn read_tags(&self, path: &Path) -> Result<TagMap, TagError>;
}

/// Turns arbitrary text into a string safe for a single path component.
pub trait Sanitizer {
    fn sanitize(&self, input: &str) -> String;
}

impl<F> Sanitizer for F
where
    F: Fn(&str) -> String,
{
    fn sanitize(&self, input: &str) -> String {
        self(input)
    }
}

/// The metadata fields a music file is identified by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataField {
    Artist,
    Album,
    Title,
    Track,
}

impl MetadataField {
    /// All fields in hashing order.
    pub const ALL: [MetadataField; 4] = [Self::Artist, Self::Album, Self::Title, Self::Track];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Artist => "artist",
            Self::Album => "album",
            Self::Title => "title",
            Self::Track => "track",
        }
    }
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata as extracted, before sanitizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTags {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub track: String,
    /// The artist was taken from the album artist tag.
    pub from_album_artist: bool,
}

impl TrackTags {
    /// Reduce raw tags to the four identifying fields.
    ///
    /// Missing tags fall back to the `unknown_*` sentinels. An album artist
    /// tag replaces the artist in album artist mode; outside of it, its
    /// presence is a fatal usage error.
    pub fn extract(tags: &TagMap, album_artist_mode: bool, relpath: &Path) -> Result<Self, TreeError> {
        let mut artist = tags
            .joined(keys::ARTIST)
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        let album_artist = tags.joined(keys::ALBUMARTIST).unwrap_or_default();

        let from_album_artist = !album_artist.is_empty();
        if from_album_artist {
            if !album_artist_mode {
                return Err(TreeError::AlbumArtistTag {
                    relpath: relpath.to_path_buf(),
                    artist,
                    album_artist,
                });
            }
            artist = album_artist;
        }

        Ok(Self {
            artist,
            album: tags
                .joined(keys::ALBUM)
                .unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            title: tags
                .joined(keys::TITLE)
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            track: tags
                .joined(keys::TRACKNUMBER)
                .unwrap_or_else(|| UNKNOWN_TRACK.to_string()),
            from_album_artist,
        })
    }

    /// Value of a single field.
    pub fn get(&self, field: MetadataField) -> &str {
        match field {
            MetadataField::Artist => &self.artist,
            MetadataField::Album => &self.album,
            MetadataField::Title => &self.title,
            MetadataField::Track => &self.track,
        }
    }
}

/// Filesystem-safe metadata and the content hash derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedTags {
    pub artist: String,
    pub album: String,
    pub title: String,
    pub track: String,
    pub hash: ContentHash,
    pub hash_hex: String,
}

impl SanitizedTags {
    /// Sanitize `tags`, validate the result and hash it together with `extension`.
    pub fn compute(
        tags: &TrackTags,
        extension: &str,
        sanitizer: &dyn Sanitizer,
        path: &Path,
    ) -> Result<Self, TreeError> {
        let artist = sanitizer.sanitize(tags.artist.trim());
        let album = sanitizer.sanitize(tags.album.trim());
        let title = sanitizer.sanitize(tags.title.trim());
        // "1/12" style track numbers must not become directories.
        let track = sanitizer.sanitize(tags.track.trim()).replace('/', "-");

        for (field, value) in MetadataField::ALL.into_iter().zip([&artist, &album, &title, &track]) {
            if value.is_empty() {
                return Err(TreeError::EmptyField {
                    path: path.to_path_buf(),
                    field,
                    raw: tags.get(field).to_string(),
                });
            }
        }

        let hash = content_hash(&artist, &album, &title, &track, extension);
        Ok(Self {
            hash_hex: hash.to_hex(),
            artist,
            album,
            title,
            track,
            hash,
        })
    }

    /// Value of a single sanitized field.
    pub fn get(&self, field: MetadataField) -> &str {
        match field {
            MetadataField::Artist => &self.artist,
            MetadataField::Album => &self.album,
            MetadataField::Title => &self.title,
            MetadataField::Track => &self.track,
        }
    }
}

/// Hash the ordered concatenation of the sanitized fields and the extension.
pub fn content_hash(artist: &str, album: &str, title: &str, track: &str, extension: &str) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    for part in [artist, album, title, track, extension] {
        hasher.update(part.as_bytes());
    }
    ContentHash::new(*hasher.finalize().as_bytes())
}

/// Data carried by a music file node.
#[derive(Debug, Clone)]
pub struct MusicFile {
    extension: CompactString,
    tags: TrackTags,
    sanitized: Option<SanitizedTags>,
}

impl MusicFile {
    pub(crate) fn new(extension: CompactString, tags: TrackTags) -> Self {
        Self {
            extension,
            tags,
            sanitized: None,
        }
    }

    /// File extension, empty when the name has no dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Raw extracted metadata.
    pub fn tags(&self) -> &TrackTags {
        &self.tags
    }

    /// Sanitized metadata, once sanitizing succeeded.
    pub fn sanitized(&self) -> Option<&SanitizedTags> {
        self.sanitized.as_ref()
    }

    /// Check whether sanitizing already happened.
    pub fn is_sanitized(&self) -> bool {
        self.sanitized.is_some()
    }

    /// Content hash as hex, once sanitized.
    pub fn hash_hex(&self) -> Option<&str> {
        self.sanitized.as_ref().map(|s| s.hash_hex.as_str())
    }

    pub(crate) fn set_sanitized(&mut self, sanitized: SanitizedTags) {
        self.sanitized = Some(sanitized);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn identity(input: &str) -> String {
        input.to_string()
    }

    fn tags(artist: &str, album: &str, title: &str, track: &str) -> TrackTags {
        TrackTags {
            artist: artist.into(),
            album: album.into(),
            title: title.into(),
            track: track.into(),
            from_album_artist: false,
        }
    }

    #[test]
    fn test_extract_defaults_to_sentinels() {
        let extracted = TrackTags::extract(&TagMap::new(), false, Path::new("a.mp3")).unwrap();
        assert_eq!(extracted.artist, UNKNOWN_ARTIST);
        assert_eq!(extracted.album, UNKNOWN_ALBUM);
        assert_eq!(extracted.title, UNKNOWN_TITLE);
        assert_eq!(extracted.track, UNKNOWN_TRACK);
        assert!(!extracted.from_album_artist);
    }

    #[test]
    fn test_extract_joins_multiple_values() {
        let map = TagMap::new()
            .with(keys::ARTIST, "Simon")
            .with(keys::ARTIST, "Garfunkel")
            .with(keys::TITLE, "The Boxer");
        let extracted = TrackTags::extract(&map, false, Path::new("a.mp3")).unwrap();
        assert_eq!(extracted.artist, "Simon Garfunkel");
        assert_eq!(extracted.title, "The Boxer");
    }

    #[test]
    fn test_extract_rejects_album_artist_outside_album_artist_mode() {
        let map = TagMap::new()
            .with(keys::ARTIST, "Foo")
            .with(keys::ALBUMARTIST, "Various Artists");
        let err = TrackTags::extract(&map, false, Path::new("va/01.mp3")).unwrap_err();
        match err {
            TreeError::AlbumArtistTag {
                relpath,
                artist,
                album_artist,
            } => {
                assert_eq!(relpath, PathBuf::from("va/01.mp3"));
                assert_eq!(artist, "Foo");
                assert_eq!(album_artist, "Various Artists");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extract_album_artist_overrides_artist() {
        let map = TagMap::new()
            .with(keys::ARTIST, "Foo")
            .with(keys::ALBUMARTIST, "Various Artists");
        let extracted = TrackTags::extract(&map, true, Path::new("va/01.mp3")).unwrap();
        assert_eq!(extracted.artist, "Various Artists");
        assert!(extracted.from_album_artist);
    }

    #[test]
    fn test_extract_ignores_empty_album_artist() {
        let map = TagMap::new().with(keys::ARTIST, "Foo").with(keys::ALBUMARTIST, "");
        let extracted = TrackTags::extract(&map, false, Path::new("a.mp3")).unwrap();
        assert_eq!(extracted.artist, "Foo");
    }

    #[test]
    fn test_sanitize_replaces_track_slash() {
        let sanitized =
            SanitizedTags::compute(&tags(" Foo ", "Bar", "Baz", "3/12"), "mp3", &identity, Path::new("/m/a.mp3"))
                .unwrap();
        assert_eq!(sanitized.artist, "Foo");
        assert_eq!(sanitized.track, "3-12");
        assert_eq!(sanitized.hash_hex.len(), 64);
        assert_eq!(sanitized.hash_hex, sanitized.hash.to_hex());
    }

    #[test]
    fn test_sanitize_reports_first_empty_field() {
        let strip_all = |input: &str| input.replace('?', "");
        let err = SanitizedTags::compute(&tags("Foo", "Bar", "???", ""), "mp3", &strip_all, Path::new("/m/a.mp3"))
            .unwrap_err();
        match err {
            TreeError::EmptyField { field, raw, .. } => {
                assert_eq!(field, MetadataField::Title);
                assert_eq!(raw, "???");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sentinels_pass_validation() {
        let extracted = TrackTags::extract(&TagMap::new(), false, Path::new("a.mp3")).unwrap();
        let sanitized = SanitizedTags::compute(&extracted, "mp3", &identity, Path::new("/m/a.mp3")).unwrap();
        assert_eq!(sanitized.artist, UNKNOWN_ARTIST);
    }

    #[test]
    fn test_content_hash_is_deterministic_and_sensitive() {
        let base = content_hash("Foo", "Bar", "Baz", "3-12", "mp3");
        assert_eq!(base, content_hash("Foo", "Bar", "Baz", "3-12", "mp3"));

        assert_ne!(base, content_hash("Fox", "Bar", "Baz", "3-12", "mp3"));
        assert_ne!(base, content_hash("Foo", "Baz", "Baz", "3-12", "mp3"));
        assert_ne!(base, content_hash("Foo", "Bar", "Bat", "3-12", "mp3"));
        assert_ne!(base, content_hash("Foo", "Bar", "Baz", "4-12", "mp3"));
        assert_ne!(base, content_hash("Foo", "Bar", "Baz", "3-12", "ogg"));
    }

    #[test]
    fn test_is_music_extension() {
        assert!(is_music_extension("ogg"));
        assert!(is_music_extension("OGG"));
        assert!(!is_music_extension("Ogg"));
        assert!(!is_music_extension("m4a"));
    }

    #[test]
    fn test_tag_map_from_iter() {
        let map: TagMap = [(keys::ARTIST, "A"), (keys::ARTIST, "B")].into_iter().collect();
        assert_eq!(map.len(), 1);
        assert_eq!(map.joined(keys::ARTIST).as_deref(), Some("A B"));
        assert!(map.get(keys::TITLE).is_none());
    }
}
