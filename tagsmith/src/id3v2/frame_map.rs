//! Frame-ID vocabularies and their mapping to semantic fields.
//!
//! ID3v2.2 uses three-character frame IDs and ID3v2.3/2.4 use four; the
//! three vocabularies are incompatible, so every version carries its own
//! known-ID set and the reader dispatches through the matching map.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display, Formatter};

/// The semantic fields a tag can carry, independent of any one tag
/// standard's frame naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Artist,
    AlbumArtist,
    Conductor,
    OriginalArtist,
    Album,
    OriginalAlbum,
    TrackNumber,
    DiscNumber,
    RecordingDate,
    RecordingYear,
    RecordingDayMonth,
    Comment,
    Composer,
    Rating,
    Genre,
    Copyright,
    Publisher,
    GeneralDescription,
}

impl Field {
    /// Every semantic field, in registry declaration order.
    pub const ALL: &'static [Field] = &[
        Field::Title,
        Field::Artist,
        Field::AlbumArtist,
        Field::Conductor,
        Field::OriginalArtist,
        Field::Album,
        Field::OriginalAlbum,
        Field::TrackNumber,
        Field::DiscNumber,
        Field::RecordingDate,
        Field::RecordingYear,
        Field::RecordingDayMonth,
        Field::Comment,
        Field::Composer,
        Field::Rating,
        Field::Genre,
        Field::Copyright,
        Field::Publisher,
        Field::GeneralDescription,
    ];

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Artist => "artist",
            Field::AlbumArtist => "album_artist",
            Field::Conductor => "conductor",
            Field::OriginalArtist => "original_artist",
            Field::Album => "album",
            Field::OriginalAlbum => "original_album",
            Field::TrackNumber => "track_number",
            Field::DiscNumber => "disc_number",
            Field::RecordingDate => "recording_date",
            Field::RecordingYear => "recording_year",
            Field::RecordingDayMonth => "recording_daymonth",
            Field::Comment => "comment",
            Field::Composer => "composer",
            Field::Rating => "rating",
            Field::Genre => "genre",
            Field::Copyright => "copyright",
            Field::Publisher => "publisher",
            Field::GeneralDescription => "general_description",
        }
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// ID3v2.2 frame codes and the fields they carry. Declaration order is
/// the order the writer emits mapped fields in.
pub(crate) const FIELDS_V22: &[(&str, Field)] = &[
    ("TT2", Field::Title),
    ("TP1", Field::Artist),
    ("TP2", Field::AlbumArtist),
    ("TP3", Field::Conductor),
    ("TOA", Field::OriginalArtist),
    ("TAL", Field::Album),
    ("TOT", Field::OriginalAlbum),
    ("TRK", Field::TrackNumber),
    ("TPA", Field::DiscNumber),
    ("TYE", Field::RecordingYear),
    ("TDA", Field::RecordingDayMonth),
    ("COM", Field::Comment),
    ("TCM", Field::Composer),
    ("POP", Field::Rating),
    ("TCO", Field::Genre),
    ("TCR", Field::Copyright),
    ("TPB", Field::Publisher),
    ("TT1", Field::GeneralDescription),
];

/// ID3v2.3/2.4 frame codes and the fields they carry.
pub(crate) const FIELDS_V23_V24: &[(&str, Field)] = &[
    ("TIT2", Field::Title),
    ("TPE1", Field::Artist),
    ("TPE2", Field::AlbumArtist),
    ("TPE3", Field::Conductor),
    ("TOPE", Field::OriginalArtist),
    ("TALB", Field::Album),
    ("TOAL", Field::OriginalAlbum),
    ("TRCK", Field::TrackNumber),
    ("TPOS", Field::DiscNumber),
    ("TDRC", Field::RecordingDate),
    ("TYER", Field::RecordingYear),
    ("TDAT", Field::RecordingDayMonth),
    ("COMM", Field::Comment),
    ("TCOM", Field::Composer),
    ("POPM", Field::Rating),
    ("TCON", Field::Genre),
    ("TCOP", Field::Copyright),
    ("TPUB", Field::Publisher),
    ("TIT1", Field::GeneralDescription),
];

const KNOWN_V22: &[&str] = &[
    "BUF", "CNT", "COM", "CRA", "CRM", "ETC", "EQU", "GEO", "IPL", "LNK", "MCI", "MLL", "PIC",
    "POP", "REV", "RVA", "SLT", "STC", "TAL", "TBP", "TCM", "TCO", "TCR", "TDA", "TDY", "TEN",
    "TFT", "TIM", "TKE", "TLA", "TLE", "TMT", "TOA", "TOF", "TOL", "TOR", "TOT", "TP1", "TP2",
    "TP3", "TP4", "TPA", "TPB", "TRC", "TRD", "TRK", "TSI", "TSS", "TT1", "TT2", "TT3", "TXT",
    "TXX", "TYE", "UFI", "ULT", "WAF", "WAR", "WAS", "WCM", "WCP", "WPB", "WXX",
];

const KNOWN_V23: &[&str] = &[
    "AENC", "APIC", "COMM", "COMR", "ENCR", "EQUA", "ETCO", "GEOB", "GRID", "IPLS", "LINK",
    "MCDI", "MLLT", "OWNE", "PCNT", "POPM", "POSS", "PRIV", "RBUF", "RVAD", "RVRB", "SYLT",
    "SYTC", "TALB", "TBPM", "TCOM", "TCON", "TCOP", "TDAT", "TDLY", "TENC", "TEXT", "TFLT",
    "TIME", "TIT1", "TIT2", "TIT3", "TKEY", "TLAN", "TLEN", "TMED", "TOAL", "TOFN", "TOLY",
    "TOPE", "TORY", "TOWN", "TPE1", "TPE2", "TPE3", "TPE4", "TPOS", "TPUB", "TRCK", "TRDA",
    "TRSN", "TRSO", "TSIZ", "TSRC", "TSSE", "TXXX", "TYER", "UFID", "USER", "USLT", "WCOM",
    "WCOP", "WOAF", "WOAR", "WOAS", "WORS", "WPAY", "WPUB", "WXXX",
];

const KNOWN_V24: &[&str] = &[
    "AENC", "APIC", "ASPI", "COMM", "COMR", "ENCR", "EQU2", "ETCO", "GEOB", "GRID", "LINK",
    "MCDI", "MLLT", "OWNE", "PCNT", "POPM", "POSS", "PRIV", "RBUF", "RVA2", "RVRB", "SEEK",
    "SIGN", "SYLT", "SYTC", "TALB", "TBPM", "TCOM", "TCON", "TCOP", "TDEN", "TDLY", "TDOR",
    "TDRC", "TDRL", "TDTG", "TENC", "TEXT", "TFLT", "TIPL", "TIT1", "TIT2", "TIT3", "TKEY",
    "TLAN", "TLEN", "TMCL", "TMED", "TMOO", "TOAL", "TOFN", "TOLY", "TOPE", "TOWN", "TPE1",
    "TPE2", "TPE3", "TPE4", "TPOS", "TPRO", "TPUB", "TRCK", "TRSN", "TRSO", "TSOA", "TSOP",
    "TSOT", "TSRC", "TSSE", "TSST", "TXXX", "UFID", "USER", "USLT", "WCOM", "WCOP", "WOAF",
    "WOAR", "WOAS", "WORS", "WPAY", "WPUB", "WXXX",
];

lazy_static! {
    static ref FIELD_BY_ID_V22: HashMap<&'static str, Field> =
        FIELDS_V22.iter().copied().collect();
    static ref FIELD_BY_ID_V23_V24: HashMap<&'static str, Field> =
        FIELDS_V23_V24.iter().copied().collect();
    static ref KNOWN_IDS_V22: HashSet<&'static str> = KNOWN_V22.iter().copied().collect();
    static ref KNOWN_IDS_V23: HashSet<&'static str> = KNOWN_V23.iter().copied().collect();
    static ref KNOWN_IDS_V24: HashSet<&'static str> = KNOWN_V24.iter().copied().collect();
}

/// Resolve a frame code to its semantic field for a given tag version.
pub fn field_for(version: u8, id: &str) -> Option<Field> {
    let map = if version == 2 {
        &*FIELD_BY_ID_V22
    } else {
        &*FIELD_BY_ID_V23_V24
    };

    map.get(id).copied()
}

/// Whether a frame code belongs to a version's standard vocabulary.
pub fn is_known(version: u8, id: &str) -> bool {
    match version {
        2 => KNOWN_IDS_V22.contains(id),
        3 => KNOWN_IDS_V23.contains(id),
        _ => KNOWN_IDS_V24.contains(id),
    }
}

/// Whether a frame code can be emitted as-is by the ID3v2.4 writer.
/// Codes outside the 2.3/2.4 vocabularies fall back to a TXXX frame.
pub(crate) fn is_writable(id: &str) -> bool {
    KNOWN_IDS_V24.contains(id) || KNOWN_IDS_V23.contains(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genre_maps_per_version() {
        assert_eq!(field_for(2, "TCO"), Some(Field::Genre));
        assert_eq!(field_for(3, "TCON"), Some(Field::Genre));
        assert_eq!(field_for(4, "TCON"), Some(Field::Genre));

        // A 2.3 code seen in a 2.2 tag is not a mapped field.
        assert_eq!(field_for(2, "TCON"), None);
        assert_eq!(field_for(4, "TCO"), None);
    }

    #[test]
    fn recording_date_is_v4_only() {
        assert_eq!(field_for(4, "TDRC"), Some(Field::RecordingDate));
        assert_eq!(field_for(2, "TDR"), None);
    }

    #[test]
    fn vocabulary_membership() {
        assert!(is_known(2, "PIC"));
        assert!(!is_known(2, "APIC"));
        assert!(is_known(3, "TYER"));
        assert!(!is_known(4, "TYER"));
        assert!(is_known(4, "TDRC"));
        assert!(!is_known(4, "REPLAYGAIN_TRACK_GAIN"));
    }

    #[test]
    fn writable_covers_both_modern_vocabularies() {
        // 2.3-only codes stay writable so year/date fields round-trip.
        assert!(is_writable("TYER"));
        assert!(is_writable("TDRC"));
        assert!(!is_writable("TT2"));
        assert!(!is_writable("CUSTOM"));
    }
}
