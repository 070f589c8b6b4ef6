//! The ID3v2.4 writer.
//!
//! Output is always ID3v2.4, whatever version was read. The flags byte
//! and the extended header of the previously parsed tag are echoed into
//! the new output, so a tag that used unsynchronization keeps using it.
//! All sizes are backfilled once the content is in place; until then the
//! buffer holds placeholders, so nothing partial is ever observable.

use crate::err::{SaveError, SaveResult};
use crate::id3v2::frame_map;
use crate::id3v2::header::{TagHeader, TagRestrictions};
use crate::id3v2::{syncdata, SaveOptions};
use crate::string::{self, Encoding};
use crate::tag::{PicType, Picture, TagData, TagStandard};
use log::{info, warn};

const FRAME_FLAG_UNSYNC: u16 = 0x0002;
const FRAME_FLAG_DATA_LENGTH: u16 = 0x0001;

/// Turns pictures that violate tag restrictions into compliant ones.
///
/// Image decoding is not this crate's business, so the default service
/// does nothing and the writer logs that the restriction went unmet.
pub trait ImageService {
    /// Return replacement bytes for a picture that needs re-encoding or
    /// resizing, or `None` to leave it untouched.
    fn constrain(&self, picture: &Picture, restrictions: &TagRestrictions) -> Option<Vec<u8>> {
        let _ = (picture, restrictions);
        None
    }
}

/// The default, do-nothing image service.
pub struct NoopImageService;

impl ImageService for NoopImageService {}

/// Render `data` as a complete ID3v2.4 tag.
///
/// `previous` is the header state of the tag being replaced; its flags,
/// extended header and restrictions carry over. Pass `None` when writing
/// a fresh tag.
pub fn write_tag(
    data: &TagData,
    previous: Option<&TagHeader>,
    options: &SaveOptions,
) -> SaveResult<Vec<u8>> {
    write_tag_with(data, previous, options, &NoopImageService)
}

/// Like [`write_tag`], with a caller-supplied image service for picture
/// restriction handling.
pub fn write_tag_with(
    data: &TagData,
    previous: Option<&TagHeader>,
    options: &SaveOptions,
    images: &dyn ImageService,
) -> SaveResult<Vec<u8>> {
    let mut flags = previous.map(TagHeader::flags).unwrap_or(0);
    let extended = previous.and_then(TagHeader::extended_header);

    // The extended-header bit has to agree with what actually follows.
    if extended.is_some() {
        flags |= 0x40;
    } else {
        flags &= !0x40;
    }

    let unsync = flags & 0x80 != 0;
    let restrictions = extended.and_then(|ext| ext.restrictions());

    let mut out = Vec::new();

    out.extend(b"ID3");
    out.push(4);
    out.push(0);
    out.push(flags);

    let tag_size_pos = out.len();
    out.extend([0; 4]);

    if let Some(ext) = extended {
        out.extend(ext.render());
    }

    let mut frame_count = 0u32;

    for &(code, field) in frame_map::FIELDS_V23_V24 {
        if let Some(value) = data.field(field) {
            write_text_frame(&mut out, code, value, unsync, options, restrictions.as_ref())?;
            frame_count += 1;
        }
    }

    for additional in data.additional.iter() {
        if additional.deleted || additional.standard != TagStandard::Id3v2 {
            continue;
        }

        write_text_frame(
            &mut out,
            &additional.id,
            &additional.value,
            unsync,
            options,
            restrictions.as_ref(),
        )?;
        frame_count += 1;
    }

    for picture in data.pictures() {
        if !picture.writable_in(TagStandard::Id3v2) {
            continue;
        }

        write_picture_frame(&mut out, picture, unsync, restrictions.as_ref(), images)?;
        frame_count += 1;
    }

    let body_len = out.len() - tag_size_pos - 4;

    if body_len >= 1 << 28 {
        return Err(SaveError::TooLarge);
    }

    out[tag_size_pos..tag_size_pos + 4].copy_from_slice(&syncdata::from_u28(body_len as u32));

    if let Some(restrictions) = restrictions {
        let max_kb = restrictions.size.max_kb() as usize;

        if body_len / 1024 > max_kb {
            warn!(
                target: "id3v2",
                "tag size {}KB exceeds the declared restriction of {}KB", body_len / 1024, max_kb
            );
        }

        if frame_count > restrictions.size.max_frames() {
            warn!(
                target: "id3v2",
                "{} frames exceed the declared restriction of {}",
                frame_count,
                restrictions.size.max_frames()
            );
        }
    }

    Ok(out)
}

fn write_text_frame(
    out: &mut Vec<u8>,
    code: &str,
    value: &str,
    unsync: bool,
    options: &SaveOptions,
    restrictions: Option<&TagRestrictions>,
) -> SaveResult<()> {
    let code = code.to_ascii_uppercase();

    let mut value = value;
    let truncated;

    if let Some(cap) = restrictions.and_then(|r| r.text_length.cap()) {
        if value.chars().count() > cap {
            info!(
                target: "id3v2",
                "truncating {} to the declared restriction of {} characters", code, cap
            );
            truncated = value.chars().take(cap).collect::<String>();
            value = &truncated;
        }
    }

    // Codes outside the modern vocabularies travel as user-defined
    // frames, with the code itself serialized as the description.
    let (emit, user_name) = if frame_map::is_writable(&code) {
        (code.as_str(), None)
    } else {
        ("TXXX", Some(code.as_str()))
    };

    out.extend(emit.as_bytes());

    let size_pos = out.len();
    out.extend([0; 4]);

    let frame_flags = if unsync { FRAME_FLAG_UNSYNC } else { 0 };
    out.extend(frame_flags.to_be_bytes());

    let mut body = Vec::new();

    match (emit, user_name) {
        ("COMM", _) => {
            // The comment convention (language, described text) only
            // round-trips cleanly in UTF-16, so comments always use it.
            body.push(Encoding::Utf16.render());
            body.extend(b"eng");
            body.extend(string::render_terminated(Encoding::Utf16, ""));
            body.extend(string::render(Encoding::Utf16, value));
        }

        ("POPM", _) => {
            body.push(0);
            body.push(rating_byte(value, options));
            body.extend([0; 4]);
        }

        (_, Some(name)) => {
            let encoding = pick_encoding(&[name, value]);
            body.push(encoding.render());
            body.extend(string::render_terminated(encoding, name));
            body.extend(string::render_terminated(encoding, value));
        }

        _ => {
            let encoding = pick_encoding(&[value]);
            body.push(encoding.render());
            body.extend(string::render(encoding, value));
        }
    }

    if unsync {
        body = syncdata::encode(&body);
    }

    patch_size(out, size_pos, body.len())?;
    out.extend(body);

    Ok(())
}

/// ISO-8859-1 when it fits, UTF-16 with a BOM otherwise.
fn pick_encoding(values: &[&str]) -> Encoding {
    if values.iter().all(|v| string::is_latin1(v)) {
        Encoding::Latin1
    } else {
        Encoding::Utf16
    }
}

/// Map a stored rating value to the POPM byte.
fn rating_byte(value: &str, options: &SaveOptions) -> u8 {
    let rating: u32 = value.trim().parse().unwrap_or(0);

    if options.legacy_popm_rating {
        // The historical computation: a floor of 255 with byte wrap-around,
        // instead of the ceiling that was plainly intended.
        (u32::max(255, rating.saturating_mul(51)) & 0xFF) as u8
    } else {
        u32::min(255, rating.saturating_mul(51)) as u8
    }
}

fn write_picture_frame(
    out: &mut Vec<u8>,
    picture: &Picture,
    unsync: bool,
    restrictions: Option<&TagRestrictions>,
    images: &dyn ImageService,
) -> SaveResult<()> {
    let mut payload = &picture.data;
    let converted;

    if let Some(restrictions) = restrictions {
        if restrictions.image_encoding || restrictions.image_size.max_edge().is_some() {
            match images.constrain(picture, restrictions) {
                Some(bytes) => {
                    converted = bytes;
                    payload = &converted;
                }
                None => {
                    warn!(
                        target: "id3v2",
                        "picture restrictions declared but no image service is available"
                    );
                }
            }
        }
    }

    out.extend(b"APIC");

    let size_pos = out.len();
    out.extend([0; 4]);

    let frame_flags = FRAME_FLAG_DATA_LENGTH | if unsync { FRAME_FLAG_UNSYNC } else { 0 };
    out.extend(frame_flags.to_be_bytes());

    let raw_size_pos = out.len();
    out.extend([0; 4]);

    // Mime and description are kept ISO-8859-1.
    let mut body = Vec::new();
    body.push(Encoding::Latin1.render());
    body.extend(string::render_terminated(Encoding::Latin1, picture.format.mime()));

    body.push(match picture.pic_type {
        PicType::Unsupported => picture.native_code,
        other => other.code(),
    });

    body.extend(string::render_terminated(Encoding::Latin1, &picture.description));
    body.extend(payload.iter());

    let raw_len = body.len();

    if unsync {
        body = syncdata::encode(&body);
    }

    // Two sizes: the on-wire frame size after the transform, and the raw
    // content size before it.
    patch_size(out, size_pos, 4 + body.len())?;
    patch_size(out, raw_size_pos, raw_len)?;

    out.extend(body);

    Ok(())
}

fn patch_size(out: &mut [u8], pos: usize, size: usize) -> SaveResult<()> {
    if size >= 1 << 28 {
        warn!(target: "id3v2", "frame size {} exceeds the representable maximum", size);
        return Err(SaveError::TooLarge);
    }

    out[pos..pos + 4].copy_from_slice(&syncdata::from_u28(size as u32));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id3v2::frame_map::Field;
    use crate::tag::ImageFormat;

    fn options() -> SaveOptions {
        SaveOptions::default()
    }

    #[test]
    fn rating_computation() {
        let corrected = options();
        assert_eq!(rating_byte("0", &corrected), 0);
        assert_eq!(rating_byte("4", &corrected), 204);
        assert_eq!(rating_byte("5", &corrected), 255);
        assert_eq!(rating_byte("204", &corrected), 255);
        assert_eq!(rating_byte("junk", &corrected), 0);

        let legacy = SaveOptions {
            legacy_popm_rating: true,
            ..SaveOptions::default()
        };
        // The floor forces 255 for small ratings and wraps large ones.
        assert_eq!(rating_byte("4", &legacy), 255);
        assert_eq!(rating_byte("6", &legacy), (306u32 & 0xFF) as u8);
    }

    #[test]
    fn text_frame_layout() {
        let mut out = Vec::new();
        write_text_frame(&mut out, "TIT2", "Title", false, &options(), None).unwrap();

        assert_eq!(&out[..4], b"TIT2");
        assert_eq!(&out[4..8], &syncdata::from_u28(6)[..]);
        assert_eq!(&out[8..10], &[0, 0]);
        assert_eq!(&out[10..], b"\x00Title");
    }

    #[test]
    fn unknown_code_becomes_user_defined() {
        let mut out = Vec::new();
        write_text_frame(
            &mut out,
            "REPLAYGAIN_TRACK_GAIN",
            "-6.5 dB",
            false,
            &options(),
            None,
        )
        .unwrap();

        assert_eq!(&out[..4], b"TXXX");
        assert_eq!(&out[10..], b"\x00REPLAYGAIN_TRACK_GAIN\x00-6.5 dB\x00");
    }

    #[test]
    fn comment_frame_uses_utf16() {
        let mut out = Vec::new();
        write_text_frame(&mut out, "COMM", "t", false, &options(), None).unwrap();

        assert_eq!(&out[..4], b"COMM");
        assert_eq!(
            &out[10..],
            b"\x01eng\xFF\xFE\x00\x00\xFF\xFE\x74\x00" as &[u8]
        );
    }

    #[test]
    fn rating_frame_layout() {
        let mut out = Vec::new();
        write_text_frame(&mut out, "POPM", "4", false, &options(), None).unwrap();

        assert_eq!(&out[..4], b"POPM");
        // Empty mail, the rating byte, four bytes of play count.
        assert_eq!(&out[10..], &[0x00, 204, 0, 0, 0, 0]);
    }

    #[test]
    fn text_truncation_restriction() {
        let restrictions = TagRestrictions::parse(0x18);
        assert_eq!(restrictions.text_length.cap(), Some(30));

        let mut out = Vec::new();
        let long = "x".repeat(64);
        write_text_frame(&mut out, "TIT2", &long, false, &options(), Some(&restrictions))
            .unwrap();

        // Encoding byte plus the capped value.
        assert_eq!(out.len(), 10 + 1 + 30);
    }

    #[test]
    fn picture_frame_sizes() {
        let picture = Picture::new(
            PicType::Front,
            ImageFormat::Jpeg,
            vec![0xFF, 0x00, 0xAB, 0xFF, 0xE1],
        );

        // Without the transform both sizes agree.
        let mut plain = Vec::new();
        write_picture_frame(&mut plain, &picture, false, None, &NoopImageService).unwrap();

        let prefix = 1 + "image/jpeg".len() + 1 + 1 + 1;
        let outer = syncdata::to_u28([plain[4], plain[5], plain[6], plain[7]]) as usize;
        let inner = syncdata::to_u28([plain[10], plain[11], plain[12], plain[13]]) as usize;
        assert_eq!(inner, prefix + 5);
        assert_eq!(outer, 4 + prefix + 5);

        // With it, the wire size grows past the raw size.
        let mut stuffed = Vec::new();
        write_picture_frame(&mut stuffed, &picture, true, None, &NoopImageService).unwrap();

        let outer = syncdata::to_u28([stuffed[4], stuffed[5], stuffed[6], stuffed[7]]) as usize;
        let inner = syncdata::to_u28([stuffed[10], stuffed[11], stuffed[12], stuffed[13]]) as usize;
        assert_eq!(inner, prefix + 5);
        assert_eq!(outer, 4 + prefix + 5 + 2);
    }

    #[test]
    fn deterministic_field_order() {
        let mut data = TagData::new();
        data.integrate_value(Field::Genre, "Rock");
        data.integrate_value(Field::Title, "First");

        let out = write_tag(&data, None, &options()).unwrap();

        // Registry order puts the title frame before the genre frame no
        // matter the insertion order.
        let tit2 = out.windows(4).position(|w| w == b"TIT2").unwrap();
        let tcon = out.windows(4).position(|w| w == b"TCON").unwrap();
        assert!(tit2 < tcon);
    }
}
