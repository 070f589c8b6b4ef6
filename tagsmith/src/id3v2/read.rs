//! The ID3v2 frame reader.
//!
//! Reading is permissive by design: a malformed frame stops the loop but
//! keeps everything parsed so far, restriction violations are advisory,
//! and only truncated input is a hard error.

use crate::core::io::BufStream;
use crate::err::ParseResult;
use crate::id3v2::header::{ExtendedHeader, TagHeader, ID_MAGIC};
use crate::id3v2::frame_map::{self, Field};
use crate::id3v2::{genre, syncdata, ParseOptions};
use crate::string::{self, Encoding};
use crate::tag::{
    AdditionalField, ImageFormat, PicType, Picture, PictureSink, TagData, TagStandard,
};
use log::{error, warn};
use std::io::{Read, Seek, SeekFrom};

/// Frames at least this large are treated as pictures, everything below
/// as text. The threshold is load-bearing for compatibility; do not tune
/// it.
const PICTURE_THRESHOLD: usize = 500;

/// Reborrows an `Option<&mut dyn PictureSink>` for a single call without
/// moving it, so the caller can keep using it on the next loop iteration.
fn reborrow_sink<'a>(
    sink: &'a mut Option<&mut dyn PictureSink>,
) -> Option<&'a mut dyn PictureSink> {
    match sink {
        Some(s) => Some(&mut **s),
        None => None,
    }
}

/// Read the ID3v2 tag at `offset` into `data`, collecting pictures into
/// `data` as well.
///
/// Returns `Ok(None)` when no tag starts at the offset; the probe leaves
/// the source positioned right past the three magic bytes. A tag of an
/// unsupported version yields its header with no fields parsed.
pub fn read_tag<S: Read + Seek>(
    src: &mut S,
    offset: u64,
    options: &ParseOptions,
    data: &mut TagData,
) -> ParseResult<Option<TagHeader>> {
    read_impl(src, offset, options, data, None)
}

/// Like [`read_tag`], but streams extracted pictures into `sink` instead
/// of collecting them.
pub fn read_tag_with<S: Read + Seek>(
    src: &mut S,
    offset: u64,
    options: &ParseOptions,
    data: &mut TagData,
    sink: &mut dyn PictureSink,
) -> ParseResult<Option<TagHeader>> {
    read_impl(src, offset, options, data, Some(sink))
}

fn read_impl<S: Read + Seek>(
    src: &mut S,
    offset: u64,
    options: &ParseOptions,
    data: &mut TagData,
    mut sink: Option<&mut dyn PictureSink>,
) -> ParseResult<Option<TagHeader>> {
    let file_size = src.seek(SeekFrom::End(0))?;
    src.seek(SeekFrom::Start(offset))?;

    // Probe the magic before committing to a full header read.
    let mut magic = [0; 3];
    if read_up_to(src, &mut magic)? < 3 || magic != *ID_MAGIC {
        return Ok(None);
    }

    let mut raw = [0; 10];
    raw[..3].copy_from_slice(&magic);
    src.read_exact(&mut raw[3..])?;

    let mut header = TagHeader::parse(raw)?;
    header.set_bounds(offset, file_size);

    if !(2..=4).contains(&header.version()) {
        error!(
            target: "id3v2",
            "unsupported tag version 2.{}.{}", header.version(), header.revision()
        );
        return Ok(Some(header));
    }

    let total = header.total_size();
    if total == 0 {
        warn!(target: "id3v2", "tag size exceeds file size, treating tag as empty");
        return Ok(Some(header));
    }

    let mut body_len = total - 10;
    if header.has_footer() {
        body_len -= 10;
    }

    let mut body = vec![0; body_len as usize];
    src.read_exact(&mut body)?;

    let mut stream = BufStream::new(&body);

    if header.has_extended() {
        let ext = ExtendedHeader::parse(&mut stream)?;
        header.set_extended(Some(ext));
    }

    read_frames(&header, &mut stream, options, data, reborrow_sink(&mut sink))?;

    Ok(Some(header))
}

fn read_up_to<S: Read>(src: &mut S, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;

    while total < buf.len() {
        let n = src.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }

    Ok(total)
}

fn read_frames(
    header: &TagHeader,
    stream: &mut BufStream,
    options: &ParseOptions,
    data: &mut TagData,
    mut sink: Option<&mut dyn PictureSink>,
) -> ParseResult<()> {
    let version = header.version();
    let (id_len, header_len) = if version == 2 { (3, 6) } else { (4, 10) };

    while stream.remaining() >= header_len {
        let first = stream.peek(1)[0];

        if first == 0 {
            // Padding.
            break;
        }

        if !first.is_ascii_uppercase() {
            error!(
                target: "id3v2",
                "invalid frame ID byte {:#04X} at offset {}, stopping", first, stream.pos()
            );
            break;
        }

        let frame_id = string::decode(Encoding::Latin1, stream.slice(id_len)?);

        let size = match version {
            2 => stream.read_u24()? as usize,
            3 => stream.read_u32()? as usize,
            _ => syncdata::to_u28(stream.read_array()?) as usize,
        };

        let mut remaining = size;

        if version > 2 {
            let flags = stream.read_u16()?;

            // Bit 0 signals a four-byte data-size indicator before the
            // actual content.
            if flags & 0x0001 != 0 && stream.remaining() >= 4 {
                stream.skip(4)?;
                remaining = remaining.saturating_sub(4);
            }
        }

        let frame_end = usize::min(stream.pos() + remaining, stream.len());

        if header.unsync() {
            // The stuffing covers every payload byte, frame headers and
            // the data-size indicator excepted, so the body is de-stuffed
            // as a whole before any parsing looks at it.
            let decoded = syncdata::decode(stream.slice(frame_end - stream.pos())?);
            let mut body = BufStream::new(&decoded);

            read_payload(
                header,
                &mut body,
                &frame_id,
                decoded.len(),
                decoded.len(),
                options,
                data,
                reborrow_sink(&mut sink),
            )?;
        } else {
            read_payload(
                header,
                stream,
                &frame_id,
                remaining,
                frame_end,
                options,
                data,
                reborrow_sink(&mut sink),
            )?;
        }

        // Frames never leave the cursor mid-payload, whatever their shape.
        stream.goto(frame_end);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn read_payload(
    header: &TagHeader,
    stream: &mut BufStream,
    frame_id: &str,
    size: usize,
    frame_end: usize,
    options: &ParseOptions,
    data: &mut TagData,
    sink: Option<&mut dyn PictureSink>,
) -> ParseResult<()> {
    let version = header.version();
    let mut remaining = size;

    if remaining == 0 || stream.remaining() == 0 {
        return Ok(());
    }

    // The encoding marker. A value outside the marker range belongs to
    // the content: give the byte back and fall back to ISO-8859-1.
    let marker = stream.read_u8()?;
    let mut encoding = match Encoding::parse(marker) {
        Some(encoding) => {
            remaining -= 1;
            encoding
        }
        None => {
            stream.rewind(1);
            Encoding::Latin1
        }
    };

    if frame_id == "COM" || frame_id == "COMM" {
        if remaining < 3 {
            return Ok(());
        }

        stream.skip(3)?;
        remaining -= 3;

        if version > 2 && encoding == Encoding::Utf16 {
            let after_lang = stream.pos();

            match string::read_bom(stream) {
                // Only 2-byte UTF-16 marks exist; a longer run would mean
                // we already read into the comment body.
                Some(bom) if bom.size <= 3 => {
                    encoding = bom.encoding;
                    remaining = remaining.saturating_sub(bom.size);

                    let desc_start = stream.pos();
                    let _short_desc = string::read_terminated(encoding, stream);
                    remaining = remaining.saturating_sub(stream.pos() - desc_start);
                }

                Some(_) => {
                    stream.goto(after_lang);
                }

                None => {
                    let desc_start = stream.pos();
                    let _short_desc = string::read_terminated(encoding, stream);
                    remaining = remaining.saturating_sub(stream.pos() - desc_start);
                }
            }
        }
    } else if version > 2 && encoding == Encoding::Utf16 {
        let before = stream.pos();

        if let Some(bom) = string::read_bom(stream) {
            if bom.size > remaining {
                // Not actually a mark, just content that looks like one.
                stream.goto(before);
            } else {
                encoding = bom.encoding;
                remaining -= bom.size;
            }
        }
    }

    if remaining == 0 {
        return Ok(());
    }

    if remaining < PICTURE_THRESHOLD {
        read_text(stream, frame_id, encoding, remaining, version, options, data)?;
    } else {
        read_picture(stream, encoding, marker, frame_end, version, data, sink)?;
    }

    Ok(())
}

fn read_text(
    stream: &mut BufStream,
    frame_id: &str,
    encoding: Encoding,
    remaining: usize,
    version: u8,
    options: &ParseOptions,
    data: &mut TagData,
) -> ParseResult<()> {
    let len = usize::min(remaining, stream.remaining());

    if frame_id.starts_with("POP") {
        // Popularimeter: a mail address nobody cares about, then the
        // rating byte. The play counter behind it is ignored.
        let _email = string::read_terminated(Encoding::Latin1, stream);
        let rating = stream.read_u8()?;

        set_field(data, version, frame_id, &rating.to_string(), options);
        return Ok(());
    }

    if frame_id.starts_with("TXX") {
        // User-defined frame: the payload is a described name/value pair,
        // and the name takes over as the frame ID.
        let raw = string::read_exact(encoding, stream, len)?;
        let raw = string::strip_nuls(&raw);

        let (name, value) = match raw.find('\u{0}') {
            Some(at) => (&raw[..at], &raw[at + 1..]),
            None => (raw, ""),
        };

        let name = trim_marks(name);
        let value = trim_marks(value);

        if !name.is_empty() {
            set_field(data, version, name, value, options);
        }

        return Ok(());
    }

    let text = string::read_exact(encoding, stream, len)?;
    set_field(data, version, frame_id, trim_marks(&text), options);

    Ok(())
}

/// Trim stray NULs and byte order marks off a decoded string piece.
fn trim_marks(s: &str) -> &str {
    s.trim_matches(|ch| ch == '\u{0}' || ch == '\u{FEFF}' || ch == '\u{FFFE}')
}

fn set_field(data: &mut TagData, version: u8, frame_id: &str, value: &str, options: &ParseOptions) {
    let id = frame_id.to_ascii_uppercase();

    match frame_map::field_for(version, &id) {
        Some(Field::Genre) => {
            data.integrate_value(Field::Genre, genre::extract(value));
        }

        Some(field) => {
            data.integrate_value(field, value);
        }

        None if options.read_all_meta_frames => {
            data.additional
                .upsert(AdditionalField::new(TagStandard::Id3v2, id, value));
        }

        None => {}
    }
}

fn read_picture(
    stream: &mut BufStream,
    encoding: Encoding,
    marker: u8,
    frame_end: usize,
    version: u8,
    data: &mut TagData,
    sink: Option<&mut dyn PictureSink>,
) -> ParseResult<()> {
    let format = if version == 2 {
        ImageFormat::from_v22_format(&stream.read_array()?)
    } else {
        let mime = string::read_terminated(Encoding::Latin1, stream);
        ImageFormat::from_mime(&mime)
    };

    let native_code = stream.read_u8()?;
    let pic_type = PicType::parse(native_code);

    if version > 2 && marker == 1 {
        // The description carries its own mark.
        let _ = string::read_bom(stream);
    }

    let description = string::read_terminated(encoding, stream);

    // Any stuffing was already reversed over the whole frame body.
    let bytes = stream.slice(frame_end.saturating_sub(stream.pos()))?.to_vec();

    let position = data.take_picture_position(pic_type, native_code);

    let picture = Picture {
        pic_type,
        native_code,
        format,
        description,
        data: bytes,
        standard: TagStandard::Id3v2,
        position,
        deleted: false,
    };

    match sink {
        Some(sink) => {
            if pic_type == PicType::Unsupported {
                sink.add_picture_token(TagStandard::Id3v2, native_code);
            }
            sink.handle_picture(picture);
        }

        None => {
            if pic_type == PicType::Unsupported {
                data.add_picture_token(TagStandard::Id3v2, native_code);
            }
            data.add_picture(picture);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn tag(version: u8, flags: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![b'I', b'D', b'3', version, 0, flags];
        out.extend(syncdata::from_u28(body.len() as u32));
        out.extend(body);
        out
    }

    fn frame_v4(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend(syncdata::from_u28(payload.len() as u32));
        out.extend([0, 0]);
        out.extend(payload);
        out
    }

    fn frame_v2(id: &[u8; 3], payload: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend(&(payload.len() as u32).to_be_bytes()[1..]);
        out.extend(payload);
        out
    }

    fn parse(bytes: &[u8]) -> (Option<TagHeader>, TagData) {
        parse_with(bytes, &ParseOptions::default())
    }

    fn parse_with(bytes: &[u8], options: &ParseOptions) -> (Option<TagHeader>, TagData) {
        let mut data = TagData::new();
        let header = read_tag(&mut Cursor::new(bytes), 0, options, &mut data).unwrap();
        (header, data)
    }

    #[test]
    fn absent_tag_consumes_only_the_probe() {
        let mut src = Cursor::new(b"MP3 audio data, no container".to_vec());
        let mut data = TagData::new();

        let header = read_tag(&mut src, 0, &ParseOptions::default(), &mut data).unwrap();

        assert!(header.is_none());
        assert_eq!(src.position(), 3);
    }

    #[test]
    fn short_input_is_not_a_tag() {
        let (header, _) = parse(b"ID");
        assert!(header.is_none());
    }

    #[test]
    fn unsupported_version_keeps_the_header() {
        let bytes = tag(5, 0, &frame_v4(b"TIT2", b"\x00Title"));
        let (header, data) = parse(&bytes);

        let header = header.unwrap();
        assert_eq!(header.version(), 5);
        assert_eq!(data.fields().count(), 0);
    }

    #[test]
    fn oversized_tag_parses_no_frames() {
        let mut bytes = tag(4, 0, &frame_v4(b"TIT2", b"\x00Title"));
        // Lie about the size so the tag runs past the end of the file.
        bytes[6..10].copy_from_slice(&syncdata::from_u28(100_000));

        let (header, data) = parse(&bytes);

        assert_eq!(header.unwrap().total_size(), 0);
        assert_eq!(data.fields().count(), 0);
    }

    #[test]
    fn text_frame_v4() {
        let bytes = tag(4, 0, &frame_v4(b"TIT2", b"\x00My Title"));
        let (_, data) = parse(&bytes);

        assert_eq!(data.field(Field::Title), Some("My Title"));
    }

    #[test]
    fn text_frame_v2() {
        let mut body = frame_v2(b"TT2", b"\x00Old Title");
        body.extend(frame_v2(b"TCO", b"\x00(17)"));

        let (_, data) = parse(&tag(2, 0, &body));

        assert_eq!(data.field(Field::Title), Some("Old Title"));
        assert_eq!(data.field(Field::Genre), Some("Rock"));
    }

    #[test]
    fn text_frame_v3_plain_size() {
        let mut body = b"TIT2".to_vec();
        body.extend(&9u32.to_be_bytes());
        body.extend([0, 0]);
        body.extend(b"\x00My Title");

        let (_, data) = parse(&tag(3, 0, &body));

        assert_eq!(data.field(Field::Title), Some("My Title"));
    }

    #[test]
    fn invalid_frame_id_stops_without_discarding() {
        let mut body = frame_v4(b"TIT2", b"\x00Kept");
        body.push(0x01);
        body.extend([0xAA; 16]);

        let (_, data) = parse(&tag(4, 0, &body));

        assert_eq!(data.field(Field::Title), Some("Kept"));
    }

    #[test]
    fn padding_stops_the_loop() {
        let mut body = frame_v4(b"TIT2", b"\x00Kept");
        body.extend([0u8; 64]);

        let (_, data) = parse(&tag(4, 0, &body));

        assert_eq!(data.field(Field::Title), Some("Kept"));
    }

    #[test]
    fn absent_encoding_marker_falls_back_to_latin1() {
        // The first payload byte is an uppercase 'A', not a marker; it
        // belongs to the text.
        let bytes = tag(4, 0, &frame_v4(b"TPE1", b"ABBA"));
        let (_, data) = parse(&bytes);

        assert_eq!(data.field(Field::Artist), Some("ABBA"));
    }

    #[test]
    fn utf16_bom_switches_endianness() {
        let le = tag(4, 0, &frame_v4(b"TIT2", b"\x01\xFF\xFE\x48\x00\x69\x00"));
        let (_, data) = parse(&le);
        assert_eq!(data.field(Field::Title), Some("Hi"));

        let be = tag(4, 0, &frame_v4(b"TIT2", b"\x01\xFE\xFF\x00\x48\x00\x69"));
        let (_, data) = parse(&be);
        assert_eq!(data.field(Field::Title), Some("Hi"));
    }

    #[test]
    fn comment_with_short_description() {
        let payload = b"\x01eng\xFF\xFE\x64\x00\x00\x00\xFF\xFE\x74\x00";
        let (_, data) = parse(&tag(4, 0, &frame_v4(b"COMM", payload)));

        assert_eq!(data.field(Field::Comment), Some("t"));
    }

    #[test]
    fn comment_latin1_keeps_payload() {
        let payload = b"\x00engGreat track";
        let (_, data) = parse(&tag(4, 0, &frame_v4(b"COMM", payload)));

        assert_eq!(data.field(Field::Comment), Some("Great track"));
    }

    #[test]
    fn rating_from_popularimeter() {
        let mut payload = b"someone@example.com\x00".to_vec();
        payload.push(204);
        payload.extend(&[0, 0, 0, 5]);

        let (_, data) = parse(&tag(4, 0, &frame_v4(b"POPM", &payload)));

        assert_eq!(data.field(Field::Rating), Some("204"));
    }

    #[test]
    fn user_defined_frame_takes_its_own_name() {
        let payload = b"\x00REPLAYGAIN_TRACK_GAIN\x00-6.5 dB";
        let options = ParseOptions {
            read_all_meta_frames: true,
        };

        let (_, data) = parse_with(&tag(4, 0, &frame_v4(b"TXXX", payload)), &options);

        let field = data
            .additional
            .get(TagStandard::Id3v2, "REPLAYGAIN_TRACK_GAIN")
            .unwrap();
        assert_eq!(field.value, "-6.5 dB");
    }

    #[test]
    fn unmapped_frames_need_opt_in() {
        let bytes = tag(4, 0, &frame_v4(b"TENC", b"\x00LAME"));

        let (_, data) = parse(&bytes);
        assert!(data.additional.is_empty());

        let options = ParseOptions {
            read_all_meta_frames: true,
        };
        let (_, data) = parse_with(&bytes, &options);
        assert_eq!(data.additional.get(TagStandard::Id3v2, "TENC").unwrap().value, "LAME");
    }

    #[test]
    fn duplicate_additional_frames_keep_the_later_value() {
        let mut body = frame_v4(b"TENC", b"\x00first");
        body.extend(frame_v4(b"TENC", b"\x00second"));

        let options = ParseOptions {
            read_all_meta_frames: true,
        };
        let (_, data) = parse_with(&tag(4, 0, &body), &options);

        assert_eq!(data.additional.len(), 1);
        assert_eq!(
            data.additional.get(TagStandard::Id3v2, "TENC").unwrap().value,
            "second"
        );
    }

    #[test]
    fn data_size_indicator_is_skipped() {
        let mut payload = vec![0, 0, 0, 9];
        payload.extend(b"\x00My Title");

        let mut body = b"TIT2".to_vec();
        body.extend(syncdata::from_u28(payload.len() as u32));
        body.extend(&[0x00, 0x01]);
        body.extend(&payload);

        let (_, data) = parse(&tag(4, 0, &body));

        assert_eq!(data.field(Field::Title), Some("My Title"));
    }

    #[test]
    fn large_frame_is_a_picture() {
        let mut payload = vec![0x00];
        payload.extend(b"image/png\x00");
        payload.push(3);
        payload.push(0);
        payload.extend(vec![0xAB; 600]);

        let (_, data) = parse(&tag(4, 0, &frame_v4(b"APIC", &payload)));

        let picture = &data.pictures()[0];
        assert_eq!(picture.pic_type, PicType::Front);
        assert_eq!(picture.format, ImageFormat::Png);
        assert_eq!(picture.data.len(), 600);
        assert_eq!(picture.position, 1);
    }

    #[test]
    fn v2_picture_format_tag() {
        let mut payload = vec![0x00];
        payload.extend(b"PNG");
        payload.push(4);
        payload.push(0);
        payload.extend(vec![0xCD; 512]);

        let (_, data) = parse(&tag(2, 0, &frame_v2(b"PIC", &payload)));

        let picture = &data.pictures()[0];
        assert_eq!(picture.pic_type, PicType::Back);
        assert_eq!(picture.format, ImageFormat::Png);
        assert_eq!(picture.data.len(), 512);
    }

    #[test]
    fn unsupported_picture_type_keeps_its_code() {
        let mut payload = vec![0x00];
        payload.extend(b"image/jpeg\x00");
        payload.push(0x12);
        payload.push(0);
        payload.extend(vec![0xEE; 700]);

        let (_, data) = parse(&tag(4, 0, &frame_v4(b"APIC", &payload)));

        let picture = &data.pictures()[0];
        assert_eq!(picture.pic_type, PicType::Unsupported);
        assert_eq!(picture.native_code, 0x12);
        assert_eq!(data.picture_tokens(), &[(TagStandard::Id3v2, 0x12)]);
    }

    #[test]
    fn unsync_picture_payload_is_decoded() {
        let image: Vec<u8> = [0xFF, 0x00, 0x13, 0xFF, 0xE2]
            .iter()
            .copied()
            .cycle()
            .take(600)
            .collect();

        let mut payload = vec![0x00];
        payload.extend(b"image/jpeg\x00");
        payload.push(3);
        payload.push(0);
        payload.extend(syncdata::encode(&image));

        let (_, data) = parse(&tag(4, 0x80, &frame_v4(b"APIC", &payload)));

        assert_eq!(data.pictures()[0].data, image);
    }

    #[test]
    fn unsync_text_payload_is_decoded() {
        // A Latin-1 y-umlaut pair is FF FF on disk, which the transform
        // stuffs into FF 00 FF.
        let wire = syncdata::encode(b"\x00\xFF\xFF");
        assert_eq!(wire, b"\x00\xFF\x00\xFF");

        let (_, data) = parse(&tag(4, 0x80, &frame_v4(b"TIT2", &wire)));

        assert_eq!(data.field(Field::Title), Some("\u{FF}\u{FF}"));
    }

    #[test]
    fn tag_at_offset() {
        let mut bytes = vec![0xAA; 100];
        bytes.extend(tag(4, 0, &frame_v4(b"TIT2", b"\x00Shifted")));
        let file_len = bytes.len() as u64;

        let mut data = TagData::new();
        let header = read_tag(
            &mut Cursor::new(bytes),
            100,
            &ParseOptions::default(),
            &mut data,
        )
        .unwrap()
        .unwrap();

        assert_eq!(header.zone(), (100, file_len - 100));
        assert_eq!(data.field(Field::Title), Some("Shifted"));
    }

    #[test]
    fn oversized_tag_at_offset_parses_no_frames() {
        let mut bytes = vec![0xAA; 100];
        bytes.extend(tag(4, 0, &frame_v4(b"TIT2", b"\x00Title")));
        // A size that fits the whole file but not the bytes past the
        // tag's offset must clamp, not error.
        bytes[106..110].copy_from_slice(&syncdata::from_u28(50));

        let mut data = TagData::new();
        let header = read_tag(
            &mut Cursor::new(bytes),
            100,
            &ParseOptions::default(),
            &mut data,
        )
        .unwrap()
        .unwrap();

        assert_eq!(header.total_size(), 0);
        assert_eq!(data.fields().count(), 0);
    }

    #[test]
    fn extended_header_is_carried() {
        let mut body = Vec::new();
        body.extend(syncdata::from_u28(7));
        body.extend(&[0x01, 0x10, 0xE4]);
        body.extend(frame_v4(b"TIT2", b"\x00Restricted"));

        let bytes = tag(4, 0x40, &body);
        let (header, data) = parse(&bytes);

        let header = header.unwrap();
        let ext = header.extended_header().unwrap();
        assert_eq!(ext.restrictions_byte(), Some(0xE4));
        assert_eq!(data.field(Field::Title), Some("Restricted"));
    }
}
