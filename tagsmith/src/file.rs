use std::error;
use std::fmt::{self, Display, Formatter};
use std::fs::{self, Metadata};
use std::io::{self, Error, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

use crate::err::ParseResult;
use crate::id3v2::{self, ParseOptions, TagHeader};
use crate::tag::TagData;

/// A file that metadata can be read from.
pub struct SourceFile {
    metadata: Metadata,
    handle: fs::File,
}

impl SourceFile {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<SourceFile> {
        let metadata = path.as_ref().metadata()?;

        // Directories aren't supported
        if metadata.is_dir() {
            return Err(Error::new(ErrorKind::InvalidInput, SourceFileError::IsDir));
        }

        let handle = fs::File::open(path)?;

        Ok(SourceFile { metadata, handle })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn handle(&mut self) -> &mut fs::File {
        &mut self.handle
    }

    /// Read the ID3v2 tag at the start of this file into `data`.
    pub fn id3v2(
        &mut self,
        options: &ParseOptions,
        data: &mut TagData,
    ) -> ParseResult<Option<TagHeader>> {
        id3v2::read_tag(&mut self.handle, 0, options, data)
    }
}

impl Read for SourceFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.handle.read(buf)
    }
}

impl Seek for SourceFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.handle.seek(pos)
    }
}

#[derive(Debug)]
enum SourceFileError {
    IsDir,
}

impl Display for SourceFileError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            SourceFileError::IsDir => write!(f, "Is a directory"),
        }
    }
}

impl error::Error for SourceFileError {}
