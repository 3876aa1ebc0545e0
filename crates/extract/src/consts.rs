use crate::chunk::ChunkType;

/// Every PNG file starts with these eight bytes.
pub const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];
/// Keyword under which ComfyUI embeds the editable workflow graph.
pub const WORKFLOW_KEYWORD: &str = "workflow";

/// Length field + type tag.
pub(crate) const HEADER_SIZE: usize = 8;
/// Trailing CRC32 of every chunk.
pub(crate) const CRC_SIZE: usize = 4;

pub(crate) const TEXT: ChunkType = ChunkType(*b"tEXt");
pub(crate) const END: ChunkType = ChunkType(*b"IEND");
