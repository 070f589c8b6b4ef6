//! Reading and writing of ID3v2 tag containers.
//!
//! Tags of versions 2.2, 2.3 and 2.4 are read; output is always 2.4.
//! The reader routes frames into a [`TagData`](crate::tag::TagData)
//! rather than exposing raw frames, and the writer regenerates frames
//! from the same model.
//!
//! ```no_run
//! use std::fs::File;
//! use tagsmith::id3v2;
//! use tagsmith::tag::TagData;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut file = File::open("song.mp3")?;
//! let mut data = TagData::new();
//!
//! if let Some(header) = id3v2::read_tag(&mut file, 0, &Default::default(), &mut data)? {
//!     println!("ID3v2.{}, {} bytes", header.version(), header.total_size());
//! }
//! # Ok(())
//! # }
//! ```

pub(crate) mod frame_map;
mod genre;
mod header;
mod read;
pub(crate) mod syncdata;
mod write;

pub use frame_map::{field_for, is_known, Field};
pub use genre::{extract as extract_genre, GENRES};
pub use header::{
    ExtendedHeader, ImageSizeRestriction, SizeRestriction, TagHeader, TagRestrictions,
    TextLengthRestriction,
};
pub use read::{read_tag, read_tag_with};
pub use write::{write_tag, write_tag_with, ImageService, NoopImageService};

/// Knobs for the read path.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Capture frames with no semantic mapping as additional fields.
    pub read_all_meta_frames: bool,
}

/// Knobs for the write path.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Reproduce the historical POPM rating computation, which floored
    /// the byte at 255 instead of capping it there.
    pub legacy_popm_rating: bool,
}
