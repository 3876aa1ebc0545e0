//! Extraction of embedded workflow JSON from PNG images.
//!
//! Image generators such as ComfyUI store the graph that produced an image in
//! a `tEXt` chunk of the PNG itself. This crate walks the chunk structure of
//! a PNG container (without decoding any image data) to find that chunk and
//! hand back its JSON payload.

mod chunk;
mod consts;
mod document;
pub mod error;
mod scan;

use tracing::instrument;

pub use crate::chunk::{Chunk, ChunkType, Chunks, TextEntry, checksum};
pub use crate::consts::{SIGNATURE, WORKFLOW_KEYWORD};
pub use crate::document::is_document;
use crate::error::Result;
pub use crate::scan::{extract, extract_from_reader, text_entries};

/// Easy, top-level entrypoint for pulling the workflow JSON out of raw PNG
/// bytes. Equivalent to [`extract`] with the [`WORKFLOW_KEYWORD`].
///
/// # Examples
///
/// ```rust
/// use wisp_extract::{error::ErrorKind, extract_workflow};
/// let err = extract_workflow(b"definitely not a PNG").unwrap_err();
/// assert_eq!(*err, ErrorKind::InvalidFormat);
/// ```
#[instrument(skip(png), fields(png_size = png.as_ref().len()))]
pub fn extract_workflow(png: impl AsRef<[u8]>) -> Result<String> {
    extract(png.as_ref(), WORKFLOW_KEYWORD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::tests::{png, text};

    #[test]
    fn extracts_workflow_keyword_only() {
        let bytes = png(&[(b"tEXt", &text("prompt", r#"{"p":1}"#)), (b"tEXt", &text("workflow", r#"{"w":1}"#))]);
        assert_eq!(extract_workflow(&bytes).unwrap(), r#"{"w":1}"#);
    }
}
