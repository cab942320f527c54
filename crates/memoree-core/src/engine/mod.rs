//! Write and erase engines

pub mod erase;
pub mod write;

pub use erase::{EraseStrategy, PageErase, ERASED, SECTOR_SIZE_4K};
pub use write::{write_paged, Chunk, ChunkSink, PageChunks};
