#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use tagsmith::id3v2::{self, ParseOptions};
use tagsmith::tag::TagData;

fuzz_target!(|data: &[u8]| {
    // The reader works over any seekable byte source, so arbitrary bytes
    // can be fed to it directly. Anything except a panic is fine here.
    let options = ParseOptions {
        read_all_meta_frames: true,
    };

    let mut tag_data = TagData::new();
    let _ = id3v2::read_tag(&mut Cursor::new(data), 0, &options, &mut tag_data);
});
