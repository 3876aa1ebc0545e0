//! Zero-copy walking of PNG chunks.
//!
//! A PNG container is the 8-byte signature followed by chunks laid out as
//! `length (u32, big-endian) | type (4 bytes) | data (length bytes) | crc (4 bytes)`.
//! Nothing here decodes image data; chunks are only located and sliced.

use std::fmt::{self, Debug, Display};
use std::str::Utf8Error;

use exn::OptionExt;
use memchr::memchr;

use crate::consts::{CRC_SIZE, END, HEADER_SIZE, SIGNATURE, TEXT};
use crate::error::{ErrorKind, Result};

/// Four-byte chunk type tag, such as `IHDR`, `tEXt` or `IEND`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);
impl ChunkType {
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}
impl Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}
impl Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkType({self})")
    }
}

/// A single chunk borrowed from the container bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    offset: usize,
    kind: ChunkType,
    data: &'a [u8],
    crc: Option<u32>,
}
impl<'a> Chunk<'a> {
    /// Byte offset of the chunk's length field within the container.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn kind(&self) -> ChunkType {
        self.kind
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Declared checksum, or `None` if the input ends before it.
    pub fn crc(&self) -> Option<u32> {
        self.crc
    }

    /// Compares the declared checksum against the CRC32 of type + data.
    ///
    /// Returns `None` when there is no declared checksum to compare against.
    pub fn crc_matches(&self) -> Option<bool> {
        self.crc.map(|declared| checksum(self.kind, self.data) == declared)
    }

    pub fn is_end(&self) -> bool {
        self.kind == END
    }

    /// Keyword/value pair of a `tEXt` chunk. `None` for any other chunk
    /// type, or for text chunks missing the keyword's null terminator.
    pub fn text(&self) -> Option<TextEntry<'a>> {
        if self.kind != TEXT {
            return None;
        }
        TextEntry::parse(self.data)
    }
}

/// CRC32 over the chunk type and data, as stored in the trailing checksum.
pub fn checksum(kind: ChunkType, data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind.as_bytes());
    hasher.update(data);
    hasher.finalize()
}

/// Null-separated keyword/value pair stored in a `tEXt` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEntry<'a> {
    pub keyword: &'a [u8],
    pub value: &'a [u8],
}
impl<'a> TextEntry<'a> {
    /// Splits chunk data at the first null byte.
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        let terminator = memchr(0, data)?;
        Some(Self { keyword: &data[..terminator], value: &data[terminator + 1..] })
    }

    /// Keywords are restricted to printable Latin-1 by the PNG format, anything
    /// else is replaced for display purposes.
    pub fn keyword_lossy(&self) -> String {
        String::from_utf8_lossy(self.keyword).into_owned()
    }

    pub fn value_str(&self) -> std::result::Result<&'a str, Utf8Error> {
        std::str::from_utf8(self.value)
    }

    pub fn matches(&self, keyword: &str) -> bool {
        self.keyword == keyword.as_bytes()
    }
}

/// Iterator over the chunks of an in-memory PNG container.
///
/// Iteration ends after the `IEND` chunk, or when the input ends cleanly on a
/// chunk boundary. An inconsistent length yields a single
/// [`ParseError`](ErrorKind::ParseError) and then ends.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    bytes: &'a [u8],
    offset: usize,
    state: State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Reading,
    /// The previous chunk was yielded without its checksum.
    Truncated(usize),
    Done,
}

impl<'a> Chunks<'a> {
    /// Verifies the signature and positions the iterator on the first chunk.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        if !bytes.starts_with(&SIGNATURE) {
            exn::bail!(ErrorKind::InvalidFormat);
        }
        Ok(Self { bytes, offset: SIGNATURE.len(), state: State::Reading })
    }

    fn read_chunk(&mut self) -> Result<Option<Chunk<'a>>> {
        let start = self.offset;
        if start >= self.bytes.len() {
            return Ok(None);
        }
        let header = self
            .bytes
            .get(start..start + HEADER_SIZE)
            .ok_or_raise(|| parse_error(start, "chunk header runs past end of input"))?;
        let &[l0, l1, l2, l3, t0, t1, t2, t3] = header else {
            exn::bail!(parse_error(start, "chunk header runs past end of input"));
        };
        let length = u32::from_be_bytes([l0, l1, l2, l3]) as usize;
        let kind = ChunkType([t0, t1, t2, t3]);

        let data_start = start + HEADER_SIZE;
        let data = data_start.checked_add(length).and_then(|data_end| self.bytes.get(data_start..data_end));
        let Some(data) = data else {
            if kind == END {
                // Nothing after the end marker is read, so its length doesn't matter.
                let data = self.bytes.get(data_start..).unwrap_or_default();
                return Ok(Some(Chunk { offset: start, kind, data, crc: None }));
            }
            exn::bail!(parse_error(start, "chunk length runs past end of input"));
        };
        let data_end = data_start + length;

        let crc = match self.bytes.get(data_end..data_end + CRC_SIZE) {
            Some(&[c0, c1, c2, c3]) => Some(u32::from_be_bytes([c0, c1, c2, c3])),
            _ => None,
        };
        self.offset = data_end + CRC_SIZE;
        Ok(Some(Chunk { offset: start, kind, data, crc }))
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Result<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::Done => None,
            State::Truncated(offset) => {
                self.state = State::Done;
                Some(Err(parse_error(offset, "chunk checksum runs past end of input").into()))
            },
            State::Reading => match self.read_chunk() {
                Ok(Some(chunk)) => {
                    if chunk.is_end() {
                        self.state = State::Done;
                    } else if chunk.crc.is_none() {
                        self.state = State::Truncated(chunk.offset);
                    }
                    Some(Ok(chunk))
                },
                Ok(None) => {
                    self.state = State::Done;
                    None
                },
                Err(e) => {
                    self.state = State::Done;
                    Some(Err(e))
                },
            },
        }
    }
}

impl std::iter::FusedIterator for Chunks<'_> {}

pub(crate) fn parse_error(offset: usize, reason: &'static str) -> ErrorKind {
    ErrorKind::ParseError { offset: offset as u64, reason }
}
