//! Tag reading backed by `lofty`.

use std::path::Path;

use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{ItemKey, Tag};
use tagrenamer_core::{TagError, TagMap, TagReader, keys};
use tracing::trace;

/// Reads the primary tag of a file, falling back to the first one found.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

impl LoftyTagReader {
    pub fn new() -> Self {
        Self
    }
}

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<TagMap, TagError> {
        let read_error = |e: lofty::error::LoftyError| TagError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let tagged_file = Probe::open(path)
            .map_err(read_error)?
            .read()
            .map_err(read_error)?;

        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            trace!(path = %path.display(), "no tags found");
            return Ok(TagMap::new());
        };

        let map = tag_map(tag);
        trace!(path = %path.display(), tags = map.len(), "read tags");
        Ok(map)
    }
}

/// Convert a `lofty` tag into the tag names the core extracts from.
///
/// A separate track total is folded back into the track number as
/// `N/TOTAL`, the form ID3 and Vorbis comments conventionally carry.
pub fn tag_map(tag: &Tag) -> TagMap {
    let mut map = TagMap::new();
    for (key, name) in [
        (ItemKey::TrackArtist, keys::ARTIST),
        (ItemKey::AlbumArtist, keys::ALBUMARTIST),
        (ItemKey::AlbumTitle, keys::ALBUM),
        (ItemKey::TrackTitle, keys::TITLE),
    ] {
        let values: Vec<String> = tag.get_strings(key).map(str::to_string).collect();
        if !values.is_empty() {
            map.insert(name, values);
        }
    }

    if let Some(track) = tag.get_string(ItemKey::TrackNumber) {
        let track = match tag.get_string(ItemKey::TrackTotal) {
            Some(total) if !track.contains('/') && !total.is_empty() => format!("{track}/{total}"),
            _ => track.to_string(),
        };
        map.push(keys::TRACKNUMBER, track);
    }
    map
}

#[cfg(test)]
mod tests {
    use lofty::tag::{ItemValue, TagItem, TagType};

    use super::*;

    fn vorbis() -> Tag {
        Tag::new(TagType::VorbisComments)
    }

    #[test]
    fn test_tag_map_maps_known_keys() {
        let mut tag = vorbis();
        tag.insert_text(ItemKey::TrackArtist, "Foo".to_string());
        tag.insert_text(ItemKey::AlbumTitle, "Bar".to_string());
        tag.insert_text(ItemKey::TrackTitle, "Baz".to_string());
        tag.insert_text(ItemKey::TrackNumber, "3".to_string());

        let map = tag_map(&tag);
        assert_eq!(map.joined(keys::ARTIST).as_deref(), Some("Foo"));
        assert_eq!(map.joined(keys::ALBUM).as_deref(), Some("Bar"));
        assert_eq!(map.joined(keys::TITLE).as_deref(), Some("Baz"));
        assert_eq!(map.joined(keys::TRACKNUMBER).as_deref(), Some("3"));
        assert!(map.get(keys::ALBUMARTIST).is_none());
    }

    #[test]
    fn test_tag_map_joins_track_total() {
        let mut tag = vorbis();
        tag.insert_text(ItemKey::TrackNumber, "3".to_string());
        tag.insert_text(ItemKey::TrackTotal, "12".to_string());

        let map = tag_map(&tag);
        assert_eq!(map.joined(keys::TRACKNUMBER).as_deref(), Some("3/12"));
    }

    #[test]
    fn test_tag_map_keeps_multiple_artists() {
        let mut tag = vorbis();
        tag.push(TagItem::new(ItemKey::TrackArtist, ItemValue::Text("Simon".to_string())));
        tag.push(TagItem::new(ItemKey::TrackArtist, ItemValue::Text("Garfunkel".to_string())));

        let map = tag_map(&tag);
        assert_eq!(map.get(keys::ARTIST).map(<[String]>::len), Some(2));
        assert_eq!(map.joined(keys::ARTIST).as_deref(), Some("Simon Garfunkel"));
    }

    #[test]
    fn test_empty_tag_gives_empty_map() {
        assert!(tag_map(&vorbis()).is_empty());
    }
}
