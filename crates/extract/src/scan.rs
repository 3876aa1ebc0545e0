//! Keyword lookup across the text chunks of a PNG container.

use std::io::{self, Read};

use exn::ResultExt;
use tracing::{debug, instrument, warn};

use crate::chunk::{ChunkType, Chunks, TextEntry, parse_error};
use crate::consts::{CRC_SIZE, END, HEADER_SIZE, SIGNATURE, TEXT};
use crate::document;
use crate::error::{ErrorKind, Result};

/// Locates the first `tEXt` chunk whose keyword is `keyword` and returns its
/// value, provided the value is a well-formed JSON object.
///
/// Scanning is forward-only and stops at the first exact keyword match: a
/// malformed value is reported as
/// [`MalformedContent`](ErrorKind::MalformedContent) even if a later chunk
/// carries the same keyword. Chunks of any other type are skipped without
/// checking their checksums.
///
/// # Errors
///
/// - [`InvalidFormat`](ErrorKind::InvalidFormat) if the PNG signature is missing,
/// - [`KeywordAbsent`](ErrorKind::KeywordAbsent) if `IEND` (or the end of the
///   input) is reached first,
/// - [`MalformedContent`](ErrorKind::MalformedContent) if the value isn't a JSON object,
/// - [`ParseError`](ErrorKind::ParseError) if a chunk length overruns the input.
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub fn extract(bytes: &[u8], keyword: &str) -> Result<String> {
    for chunk in Chunks::new(bytes)? {
        let chunk = chunk?;
        if chunk.is_end() {
            debug!("reached IEND chunk without finding keyword");
            break;
        }
        if chunk.kind() != TEXT {
            continue;
        }
        let Some(entry) = chunk.text() else {
            warn!(offset = chunk.offset(), "tEXt chunk has no null terminator for its keyword, skipping");
            continue;
        };
        if !entry.matches(keyword) {
            continue;
        }
        debug!(offset = chunk.offset(), "found matching tEXt chunk");
        if chunk.crc_matches() == Some(false) {
            warn!(offset = chunk.offset(), "tEXt chunk checksum does not match its contents");
        }
        return document::decode(entry.value, keyword);
    }
    exn::bail!(ErrorKind::KeywordAbsent(keyword.to_string()))
}

/// Every keyword/value pair stored in the container's `tEXt` chunks, in file
/// order. Text chunks without a keyword terminator are left out.
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub fn text_entries(bytes: &[u8]) -> Result<Vec<TextEntry<'_>>> {
    let mut entries = Vec::new();
    for chunk in Chunks::new(bytes)? {
        if let Some(entry) = chunk?.text() {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Streaming counterpart of [`extract`].
///
/// Reads the container chunk by chunk from `reader`; only `tEXt` chunk data is
/// buffered, everything else is discarded as it is read. Results are
/// identical to [`extract`] on the same bytes.
#[instrument(skip(reader))]
pub fn extract_from_reader<R: Read>(mut reader: R, keyword: &str) -> Result<String> {
    let mut signature = [0u8; SIGNATURE.len()];
    match reader.read_exact(&mut signature) {
        Ok(()) if signature == SIGNATURE => {},
        Ok(()) => exn::bail!(ErrorKind::InvalidFormat),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => exn::bail!(ErrorKind::InvalidFormat),
        Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
    }

    let mut offset = SIGNATURE.len();
    while let Some((length, kind)) = read_header(&mut reader, offset)? {
        if kind == END {
            debug!("reached IEND chunk without finding keyword");
            break;
        }
        let data_offset = offset + HEADER_SIZE;
        if kind == TEXT {
            let mut data = Vec::new();
            let read = (&mut reader).take(length).read_to_end(&mut data).or_raise(|| ErrorKind::Io)?;
            if (read as u64) < length {
                exn::bail!(parse_error(offset, "chunk length runs past end of input"));
            }
            match TextEntry::parse(&data) {
                Some(entry) if entry.matches(keyword) => {
                    debug!(offset, "found matching tEXt chunk");
                    return document::decode(entry.value, keyword);
                },
                Some(_) => {},
                None => warn!(offset, "tEXt chunk has no null terminator for its keyword, skipping"),
            }
            skip(&mut reader, CRC_SIZE as u64, offset, "chunk checksum runs past end of input")?;
        } else {
            skip(&mut reader, length + CRC_SIZE as u64, offset, "chunk length runs past end of input")?;
        }
        offset = data_offset + length as usize + CRC_SIZE;
    }
    exn::bail!(ErrorKind::KeywordAbsent(keyword.to_string()))
}

/// Reads a chunk header, or `None` if the input ends exactly before it.
fn read_header<R: Read>(reader: &mut R, offset: usize) -> Result<Option<(u64, ChunkType)>> {
    let mut header = [0u8; HEADER_SIZE];
    let mut filled = 0;
    while filled < HEADER_SIZE {
        match reader.read(&mut header[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
        }
    }
    match filled {
        0 => Ok(None),
        HEADER_SIZE => {
            let [l0, l1, l2, l3, t0, t1, t2, t3] = header;
            Ok(Some((u64::from(u32::from_be_bytes([l0, l1, l2, l3])), ChunkType([t0, t1, t2, t3]))))
        },
        _ => exn::bail!(parse_error(offset, "chunk header runs past end of input")),
    }
}

fn skip<R: Read>(reader: &mut R, bytes: u64, offset: usize, reason: &'static str) -> Result<()> {
    let skipped = io::copy(&mut reader.take(bytes), &mut io::sink()).or_raise(|| ErrorKind::Io)?;
    if skipped < bytes {
        exn::bail!(parse_error(offset, reason));
    }
    Ok(())
}
