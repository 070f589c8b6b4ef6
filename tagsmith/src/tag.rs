//! The host-side tag model.
//!
//! The ID3v2 reader does not hand back frames; it routes every frame it
//! understands into a semantic field on a [`TagData`] and keeps the rest
//! as generic additional fields. The writer consumes the same model, so a
//! `TagData` can travel between tag standards.

use crate::id3v2::Field;
use indexmap::map::IndexMap;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

/// The tag standards a host can hold fields for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagStandard {
    Id3v1,
    Id3v2,
    Ape,
    VorbisComment,
}

impl Display for TagStandard {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let name = match self {
            TagStandard::Id3v1 => "ID3v1",
            TagStandard::Id3v2 => "ID3v2",
            TagStandard::Ape => "APE",
            TagStandard::VorbisComment => "Vorbis",
        };

        write!(f, "{}", name)
    }
}

/// The picture roles the model distinguishes. Every other ID3v2 picture
/// type is kept as [`PicType::Unsupported`] with its native code intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PicType {
    Generic,
    Front,
    Back,
    Cd,
    Unsupported,
}

impl PicType {
    pub fn parse(code: u8) -> Self {
        match code {
            0 => PicType::Generic,
            3 => PicType::Front,
            4 => PicType::Back,
            6 => PicType::Cd,
            _ => PicType::Unsupported,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            PicType::Front => 3,
            PicType::Back => 4,
            PicType::Cd => 6,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Unsupported,
}

impl ImageFormat {
    /// Resolve a MIME type. Unrecognized types default to JPEG, the most
    /// common payload in the wild.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();

        if mime.contains("png") {
            ImageFormat::Png
        } else if mime.contains("gif") {
            ImageFormat::Gif
        } else if mime.contains("bmp") {
            ImageFormat::Bmp
        } else {
            ImageFormat::Jpeg
        }
    }

    /// Resolve an ID3v2.2 three-character image format tag.
    pub fn from_v22_format(format: &[u8; 3]) -> Self {
        match format {
            b"PNG" => ImageFormat::Png,
            b"GIF" => ImageFormat::Gif,
            b"BMP" => ImageFormat::Bmp,
            _ => ImageFormat::Jpeg,
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Unsupported => "image/",
        }
    }
}

/// An embedded picture.
#[derive(Debug, Clone)]
pub struct Picture {
    pub pic_type: PicType,
    /// The tag standard's own picture-type code, preserved even when the
    /// type is not one the model distinguishes.
    pub native_code: u8,
    pub format: ImageFormat,
    pub description: String,
    pub data: Vec<u8>,
    pub standard: TagStandard,
    /// Ordinal among pictures of the same role, for duplicate handling.
    pub position: usize,
    pub deleted: bool,
}

impl Picture {
    pub fn new(pic_type: PicType, format: ImageFormat, data: Vec<u8>) -> Self {
        Picture {
            pic_type,
            native_code: pic_type.code(),
            format,
            description: String::new(),
            data,
            standard: TagStandard::Id3v2,
            position: 1,
            deleted: false,
        }
    }

    /// Whether this picture belongs in output of the given standard.
    pub(crate) fn writable_in(&self, standard: TagStandard) -> bool {
        !self.deleted && (self.standard == standard || self.pic_type != PicType::Unsupported)
    }
}

/// A frame the reader did not understand, kept generically.
#[derive(Debug, Clone)]
pub struct AdditionalField {
    pub standard: TagStandard,
    pub id: String,
    pub value: String,
    pub deleted: bool,
}

impl AdditionalField {
    pub fn new(standard: TagStandard, id: impl Into<String>, value: impl Into<String>) -> Self {
        AdditionalField {
            standard,
            id: id.into(),
            value: value.into(),
            deleted: false,
        }
    }
}

/// Insertion-ordered additional fields, deduplicated by frame ID within a
/// standard. A later occurrence replaces the value of an earlier one.
#[derive(Debug, Clone, Default)]
pub struct AdditionalFields {
    map: IndexMap<(TagStandard, String), AdditionalField>,
}

impl AdditionalFields {
    pub fn upsert(&mut self, field: AdditionalField) {
        self.map
            .insert((field.standard, field.id.clone()), field);
    }

    pub fn get(&self, standard: TagStandard, id: &str) -> Option<&AdditionalField> {
        self.map.get(&(standard, id.to_string()))
    }

    pub fn contains(&self, standard: TagStandard, id: &str) -> bool {
        self.map.contains_key(&(standard, id.to_string()))
    }

    pub fn remove(&mut self, standard: TagStandard, id: &str) -> Option<AdditionalField> {
        self.map.shift_remove(&(standard, id.to_string()))
    }

    /// Keep the entry but exclude it from future writes.
    pub fn mark_deleted(&mut self, standard: TagStandard, id: &str) {
        if let Some(field) = self.map.get_mut(&(standard, id.to_string())) {
            field.deleted = true;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdditionalField> + '_ {
        self.map.values()
    }

    delegate::delegate! {
        to self.map {
            pub fn len(&self) -> usize;
            pub fn is_empty(&self) -> bool;
            pub fn clear(&mut self);
        }
    }
}

/// The semantic content of a tag: mapped fields, additional fields, and
/// pictures.
#[derive(Debug, Clone, Default)]
pub struct TagData {
    fields: IndexMap<Field, String>,
    pub additional: AdditionalFields,
    pictures: Vec<Picture>,
    picture_tokens: Vec<(TagStandard, u8)>,
    positions: HashMap<(PicType, u8), usize>,
}

impl TagData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value for a semantic field, replacing any previous value.
    pub fn integrate_value(&mut self, field: Field, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    pub fn field(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        self.fields.iter().map(|(&field, value)| (field, value.as_str()))
    }

    /// The next ordinal for a picture of the given role. Ordinals start
    /// at 1 and count per (role, native code) pair.
    pub fn take_picture_position(&mut self, pic_type: PicType, native_code: u8) -> usize {
        let counter = self.positions.entry((pic_type, native_code)).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn add_picture(&mut self, picture: Picture) {
        self.pictures.push(picture);
    }

    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    pub fn pictures_mut(&mut self) -> &mut Vec<Picture> {
        &mut self.pictures
    }

    /// Native picture-type codes seen for roles the model does not
    /// distinguish.
    pub fn picture_tokens(&self) -> &[(TagStandard, u8)] {
        &self.picture_tokens
    }
}

/// Where extracted pictures go during a read.
///
/// [`TagData`] collects them by default; a host that wants to stream
/// them elsewhere (decode, resize, discard) passes its own sink.
pub trait PictureSink {
    fn handle_picture(&mut self, picture: Picture);

    /// Called before `handle_picture` when the picture's native type code
    /// has no model counterpart.
    fn add_picture_token(&mut self, _standard: TagStandard, _native_code: u8) {}
}

impl PictureSink for TagData {
    fn handle_picture(&mut self, picture: Picture) {
        self.add_picture(picture);
    }

    fn add_picture_token(&mut self, standard: TagStandard, native_code: u8) {
        self.picture_tokens.push((standard, native_code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pic_type_codec() {
        assert_eq!(PicType::parse(0), PicType::Generic);
        assert_eq!(PicType::parse(3), PicType::Front);
        assert_eq!(PicType::parse(4), PicType::Back);
        assert_eq!(PicType::parse(6), PicType::Cd);
        assert_eq!(PicType::parse(0x12), PicType::Unsupported);

        assert_eq!(PicType::Front.code(), 3);
        assert_eq!(PicType::Back.code(), 4);
        assert_eq!(PicType::Cd.code(), 6);
        assert_eq!(PicType::Generic.code(), 0);
        assert_eq!(PicType::Unsupported.code(), 0);
    }

    #[test]
    fn image_format_resolution() {
        assert_eq!(ImageFormat::from_mime("image/png"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_mime("image/jpeg"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_mime("application/pdf"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_v22_format(b"PNG"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_v22_format(b"XXX"), ImageFormat::Jpeg);
    }

    #[test]
    fn additional_fields_dedup() {
        let mut fields = AdditionalFields::default();

        fields.upsert(AdditionalField::new(TagStandard::Id3v2, "TENC", "one"));
        fields.upsert(AdditionalField::new(TagStandard::Id3v2, "TSSE", "lame"));
        fields.upsert(AdditionalField::new(TagStandard::Id3v2, "TENC", "two"));

        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get(TagStandard::Id3v2, "TENC").unwrap().value, "two");

        // Insertion order survives the replacement.
        let ids: Vec<&str> = fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["TENC", "TSSE"]);
    }

    #[test]
    fn picture_positions_count_per_role() {
        let mut data = TagData::new();

        assert_eq!(data.take_picture_position(PicType::Front, 3), 1);
        assert_eq!(data.take_picture_position(PicType::Front, 3), 2);
        assert_eq!(data.take_picture_position(PicType::Back, 4), 1);
        assert_eq!(data.take_picture_position(PicType::Unsupported, 0x12), 1);
        assert_eq!(data.take_picture_position(PicType::Unsupported, 0x13), 1);
    }
}
