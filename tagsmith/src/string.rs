//! Text encodings used by ID3v2 frames.
//!
//! ID3v2 text content is tagged with a one-byte encoding marker: `0` is
//! ISO-8859-1, `1` is UTF-16 with a BOM, `2` is UTF-16BE without a BOM and
//! `3` is UTF-8. Anything else means the marker is absent and the content
//! is read as ISO-8859-1.

use crate::core::io::BufStream;
use std::io;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Encoding {
    Latin1,
    Utf16,
    Utf16Be,
    Utf16Le,
    Utf8,
}

impl Encoding {
    /// Map an on-disk encoding marker to an encoding. `None` means the
    /// byte is not a marker at all and belongs to the content.
    pub(crate) fn parse(byte: u8) -> Option<Encoding> {
        match byte {
            0 => Some(Encoding::Latin1),
            1 => Some(Encoding::Utf16),
            2 => Some(Encoding::Utf16Be),
            3 => Some(Encoding::Utf8),
            _ => None,
        }
    }

    pub(crate) fn render(self) -> u8 {
        match self {
            Encoding::Latin1 => 0,
            Encoding::Utf16 | Encoding::Utf16Le => 1,
            Encoding::Utf16Be => 2,
            Encoding::Utf8 => 3,
        }
    }

    /// The size of this encoding's NUL terminator.
    pub(crate) fn nul_size(self) -> usize {
        match self {
            Encoding::Latin1 | Encoding::Utf8 => 1,
            _ => 2,
        }
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Latin1
    }
}

/// A detected UTF-16 byte order mark.
///
/// Only the two-byte `FF FE`/`FE FF` marks exist for UTF-16; longer
/// sequences seen in the wild are content, not marks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bom {
    pub size: usize,
    pub encoding: Encoding,
}

/// Probe the stream for a UTF-16 BOM. Consumes the mark when one is
/// found and nothing otherwise.
pub(crate) fn read_bom(stream: &mut BufStream) -> Option<Bom> {
    let bom = match stream.peek(2) {
        [0xFF, 0xFE] => Bom {
            size: 2,
            encoding: Encoding::Utf16Le,
        },
        [0xFE, 0xFF] => Bom {
            size: 2,
            encoding: Encoding::Utf16Be,
        },
        _ => return None,
    };

    stream.skip(bom.size).ok()?;

    Some(bom)
}

pub(crate) fn decode(encoding: Encoding, data: &[u8]) -> String {
    match encoding {
        Encoding::Latin1 => decode_latin1(data),
        Encoding::Utf16 => decode_utf16(data),
        Encoding::Utf16Be => decode_utf16be(data),
        Encoding::Utf16Le => decode_utf16le(data),
        Encoding::Utf8 => String::from_utf8_lossy(data).into_owned(),
    }
}

/// Read `size` bytes and decode them in the given encoding.
pub(crate) fn read_exact(
    encoding: Encoding,
    stream: &mut BufStream,
    size: usize,
) -> io::Result<String> {
    Ok(decode(encoding, stream.slice(size)?))
}

/// Read up to the encoding-specific NUL terminator and decode.
pub(crate) fn read_terminated(encoding: Encoding, stream: &mut BufStream) -> String {
    decode(encoding, stream.take_terminated(encoding.nul_size()))
}

/// Drop trailing NUL characters. Fixed-size text payloads are padded with
/// them and they are never part of the value.
pub(crate) fn strip_nuls(s: &str) -> &str {
    s.trim_end_matches('\u{0}')
}

pub(crate) fn render(encoding: Encoding, string: &str) -> Vec<u8> {
    match encoding {
        Encoding::Latin1 => encode_latin1(string),
        Encoding::Utf16 => {
            // UTF-16 with a BOM is always written little-endian.
            let mut result = vec![0xFF, 0xFE];
            result.extend(string.encode_utf16().flat_map(|cp| cp.to_le_bytes()));
            result
        }
        Encoding::Utf16Be => string.encode_utf16().flat_map(|cp| cp.to_be_bytes()).collect(),
        Encoding::Utf16Le => string.encode_utf16().flat_map(|cp| cp.to_le_bytes()).collect(),
        Encoding::Utf8 => string.as_bytes().to_vec(),
    }
}

pub(crate) fn render_terminated(encoding: Encoding, string: &str) -> Vec<u8> {
    let mut result = render(encoding, string);
    result.resize(result.len() + encoding.nul_size(), 0);
    result
}

/// Whether a string survives an ISO-8859-1 round trip unharmed.
pub(crate) fn is_latin1(string: &str) -> bool {
    string.chars().all(|ch| (ch as u32) <= 0xFF)
}

fn decode_latin1(data: &[u8]) -> String {
    // Bytes above 0x7F become two UTF-8 bytes, so a direct reinterpretation
    // is not possible. Going through chars keeps the codepoints lined up.
    data.iter().map(|&byte| byte as char).collect()
}

fn decode_utf16(data: &[u8]) -> String {
    // No marker means big-endian, per the ID3v2 informal standard.
    match data {
        [0xFF, 0xFE, rest @ ..] => decode_utf16le(rest),
        [0xFE, 0xFF, rest @ ..] => decode_utf16be(rest),
        _ => decode_utf16be(data),
    }
}

fn decode_utf16be(data: &[u8]) -> String {
    String::from_utf16_lossy(
        data.chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect::<Vec<u16>>()
            .as_slice(),
    )
}

fn decode_utf16le(data: &[u8]) -> String {
    String::from_utf16_lossy(
        data.chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect::<Vec<u16>>()
            .as_slice(),
    )
}

fn encode_latin1(string: &str) -> Vec<u8> {
    string
        .chars()
        .map(|ch| if ch as u32 > 0xFF { b'?' } else { ch as u8 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_encoding_markers() {
        assert_eq!(Encoding::parse(0), Some(Encoding::Latin1));
        assert_eq!(Encoding::parse(1), Some(Encoding::Utf16));
        assert_eq!(Encoding::parse(2), Some(Encoding::Utf16Be));
        assert_eq!(Encoding::parse(3), Some(Encoding::Utf8));
        assert_eq!(Encoding::parse(0x41), None);
    }

    #[test]
    fn render_encoding_markers() {
        assert_eq!(Encoding::Latin1.render(), 0);
        assert_eq!(Encoding::Utf16.render(), 1);
        assert_eq!(Encoding::Utf16Le.render(), 1);
        assert_eq!(Encoding::Utf16Be.render(), 2);
        assert_eq!(Encoding::Utf8.render(), 3);
    }

    #[test]
    fn sniff_bom_le() {
        let mut stream = BufStream::new(b"\xFF\xFE\x48\x00\x69\x00");
        let bom = read_bom(&mut stream).unwrap();

        assert_eq!(bom.size, 2);
        assert_eq!(bom.encoding, Encoding::Utf16Le);
        assert_eq!(decode(bom.encoding, stream.take_rest()), "Hi");
    }

    #[test]
    fn sniff_bom_be() {
        let mut stream = BufStream::new(b"\xFE\xFF\x00\x48\x00\x69");
        let bom = read_bom(&mut stream).unwrap();

        assert_eq!(bom.size, 2);
        assert_eq!(bom.encoding, Encoding::Utf16Be);
        assert_eq!(decode(bom.encoding, stream.take_rest()), "Hi");
    }

    #[test]
    fn sniff_bom_absent() {
        let mut stream = BufStream::new(b"image/png\0");

        assert!(read_bom(&mut stream).is_none());
        assert_eq!(stream.pos(), 0);
    }

    #[test]
    fn decode_latin1_high_bytes() {
        assert_eq!(
            decode(Encoding::Latin1, b"L\xEEke \xE2 loop"),
            "L\u{ee}ke \u{e2} loop"
        );
    }

    #[test]
    fn render_latin1_lossy() {
        assert_eq!(render(Encoding::Latin1, "na\u{ef}ve \u{2551}"), b"na\xefve ?");
    }

    #[test]
    fn round_trip_utf16() {
        let text = "\u{2551} L\u{ee}ke \u{e2} loop \u{2551}";
        let data = render(Encoding::Utf16, text);

        assert_eq!(&data[..2], &[0xFF, 0xFE]);
        assert_eq!(decode(Encoding::Utf16, &data), text);
    }

    #[test]
    fn strip_trailing_nuls() {
        assert_eq!(strip_nuls("Rock\u{0}\u{0}"), "Rock");
        assert_eq!(strip_nuls("Rock"), "Rock");
        assert_eq!(strip_nuls(""), "");
    }
}
