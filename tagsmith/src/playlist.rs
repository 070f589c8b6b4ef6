//! The playlist format registry.
//!
//! A small, process-wide table mapping file extensions to playlist
//! format descriptors. Dispatch never fails: a path with an unknown
//! extension gets a stub handle whose reader and writer do nothing.

use lazy_static::lazy_static;
use std::io;
use std::path::{Path, PathBuf};

/// The playlist formats the registry knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistFormat {
    M3u,
    Pls,
    Fpl,
    Xspf,
    Smil,
    Asx,
    B4s,
}

/// How a format prefers its entry locations spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriStyle {
    Undefined,
    MsUri,
    RfcUri,
    WinampUri,
}

/// A registered playlist format.
#[derive(Debug, Clone, Copy)]
pub struct FormatDescriptor {
    pub format: PlaylistFormat,
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pub uri_style: UriStyle,
}

const FORMATS: &[FormatDescriptor] = &[
    FormatDescriptor {
        format: PlaylistFormat::M3u,
        name: "M3U",
        extensions: &["m3u", "m3u8"],
        uri_style: UriStyle::Undefined,
    },
    FormatDescriptor {
        format: PlaylistFormat::Pls,
        name: "PLS",
        extensions: &["pls"],
        uri_style: UriStyle::Undefined,
    },
    FormatDescriptor {
        format: PlaylistFormat::Fpl,
        name: "FPL (experimental)",
        extensions: &["fpl"],
        uri_style: UriStyle::MsUri,
    },
    FormatDescriptor {
        format: PlaylistFormat::Xspf,
        name: "XSPF (spiff)",
        extensions: &["xspf"],
        uri_style: UriStyle::Undefined,
    },
    FormatDescriptor {
        format: PlaylistFormat::Smil,
        name: "SMIL",
        extensions: &["smil", "smi", "zpl", "wpl"],
        uri_style: UriStyle::RfcUri,
    },
    FormatDescriptor {
        format: PlaylistFormat::Asx,
        name: "ASX",
        extensions: &["asx", "wax", "wvx"],
        uri_style: UriStyle::MsUri,
    },
    FormatDescriptor {
        format: PlaylistFormat::B4s,
        name: "B4S",
        extensions: &["b4s"],
        uri_style: UriStyle::WinampUri,
    },
];

lazy_static! {
    static ref REGISTRY: PlaylistRegistry = PlaylistRegistry {
        formats: FORMATS.to_vec(),
    };
}

/// The process-wide format table.
pub struct PlaylistRegistry {
    formats: Vec<FormatDescriptor>,
}

impl PlaylistRegistry {
    pub fn global() -> &'static PlaylistRegistry {
        &REGISTRY
    }

    pub fn descriptors(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    /// All descriptors whose extension list matches the path, in
    /// registration order.
    pub fn matches<P: AsRef<Path>>(&self, path: P) -> Vec<&FormatDescriptor> {
        let ext = match path.as_ref().extension() {
            Some(ext) => ext.to_string_lossy().to_ascii_lowercase(),
            None => return Vec::new(),
        };

        self.formats
            .iter()
            .filter(|desc| desc.extensions.contains(&ext.as_str()))
            .collect()
    }

    /// The IO handle for a path, taking the first matching format. An
    /// unknown extension yields a stub handle rather than an error.
    pub fn io_for_path<P: AsRef<Path>>(&self, path: P) -> PlaylistIo {
        self.io_for_path_nth(path, 0, None)
    }

    /// Like [`io_for_path`](Self::io_for_path), picking the `n`th match
    /// and optionally overriding the format's URI style.
    pub fn io_for_path_nth<P: AsRef<Path>>(
        &self,
        path: P,
        n: usize,
        uri_style: Option<UriStyle>,
    ) -> PlaylistIo {
        match self.matches(path).into_iter().nth(n) {
            Some(desc) => PlaylistIo {
                descriptor: Some(*desc),
                uri_style: uri_style.unwrap_or(desc.uri_style),
            },
            None => PlaylistIo {
                descriptor: None,
                uri_style: uri_style.unwrap_or(UriStyle::Undefined),
            },
        }
    }

    /// The IO handle for a known format.
    pub fn io_for_format(&self, format: PlaylistFormat) -> PlaylistIo {
        let descriptor = self
            .formats
            .iter()
            .find(|desc| desc.format == format)
            .copied();

        PlaylistIo {
            uri_style: descriptor.map(|d| d.uri_style).unwrap_or(UriStyle::Undefined),
            descriptor,
        }
    }
}

/// A dispatched reader/writer for one playlist file.
///
/// Concrete per-format parsing lives outside this crate; the handle
/// fixes the dispatch contract and stubs the IO itself.
pub struct PlaylistIo {
    descriptor: Option<FormatDescriptor>,
    uri_style: UriStyle,
}

impl PlaylistIo {
    pub fn format(&self) -> Option<PlaylistFormat> {
        self.descriptor.map(|d| d.format)
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.map(|d| d.name).unwrap_or("Unknown")
    }

    /// The URI style this handle operates with: the descriptor default
    /// unless the caller overrode it at dispatch time.
    pub fn uri_style(&self) -> UriStyle {
        self.uri_style
    }

    pub fn is_stub(&self) -> bool {
        self.descriptor.is_none()
    }

    pub fn read_paths<P: AsRef<Path>>(&self, _path: P) -> io::Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    pub fn write_paths<P: AsRef<Path>>(&self, _path: P, _entries: &[PathBuf]) -> io::Result<()> {
        Ok(())
    }
}
