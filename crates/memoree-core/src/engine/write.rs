//! Paged write engine
//!
//! Splits a write into chunks that never cross a page boundary, handles
//! wraparound at the top of the array and waits the page-write time after
//! every chunk.

use core::ops::Range;

use crate::error::{Error, PartialWrite};
use crate::variant::Geometry;

/// One page-bounded piece of a write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Array address of the first byte
    pub addr: u32,
    /// Offset of the first byte in the caller's buffer
    pub offset: usize,
    /// Number of bytes
    pub len: usize,
}

impl Chunk {
    /// Range of the caller's buffer covered by this chunk
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Iterator over the page-bounded chunks of a write
///
/// The first chunk runs up to the next page boundary (or the end of the
/// data), every following chunk is a full page except possibly the last.
#[derive(Debug, Clone)]
pub struct PageChunks {
    addr: u32,
    offset: usize,
    remaining: usize,
    page_size: u32,
}

impl PageChunks {
    /// Chunks for `len` bytes at `addr`
    pub fn new(addr: u32, len: usize, page_size: u32) -> Self {
        Self {
            addr,
            offset: 0,
            remaining: len,
            page_size: page_size.max(1),
        }
    }
}

impl Iterator for PageChunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        if self.remaining == 0 {
            return None;
        }
        let to_boundary = (self.page_size - self.addr % self.page_size) as usize;
        let len = to_boundary.min(self.remaining);
        let chunk = Chunk {
            addr: self.addr,
            offset: self.offset,
            len,
        };
        self.addr = self.addr.wrapping_add(len as u32);
        self.offset += len;
        self.remaining -= len;
        Some(chunk)
    }
}

/// Destination of page-bounded chunks
///
/// Implemented by the memory handle for each family; `program` frames and
/// sends one chunk, `settle` waits for the part to commit it.
pub trait ChunkSink {
    /// Write one chunk that does not cross a page boundary
    fn program(&mut self, addr: u32, data: &[u8]) -> crate::error::Result<()>;

    /// Wait for the last chunk to be committed
    fn settle(&mut self);
}

/// Write `data` at `addr`, split into pages
///
/// Returns the number of bytes written. A write running past the end of the
/// array continues at address 0 when `wrap` is set, and is truncated at the
/// end of the array otherwise. The first failing chunk stops the write.
pub fn write_paged<S: ChunkSink + ?Sized>(
    sink: &mut S,
    geometry: &Geometry,
    addr: u32,
    data: &[u8],
    wrap: bool,
) -> Result<usize, PartialWrite> {
    if data.is_empty() {
        return Ok(0);
    }
    if !geometry.is_populated() || !geometry.is_valid_address(addr) {
        return Err(Error::InvalidArgument.into());
    }

    let to_end = (geometry.size - addr) as usize;
    if data.len() <= to_end {
        return write_span(sink, geometry, addr, data);
    }

    let (head, tail) = data.split_at(to_end);
    if !wrap {
        log::warn!(
            "Write of {} bytes at {:#x} truncated to {} bytes at end of array",
            data.len(),
            addr,
            to_end
        );
        return write_span(sink, geometry, addr, head);
    }

    log::debug!(
        "Write wraps: {} bytes at {:#x}, {} bytes at 0x0",
        head.len(),
        addr,
        tail.len()
    );
    let written = write_span(sink, geometry, addr, head)?;
    match write_paged(sink, geometry, 0, tail, false) {
        Ok(n) => Ok(written + n),
        Err(partial) => Err(PartialWrite::new(written + partial.written, partial.error)),
    }
}

fn write_span<S: ChunkSink + ?Sized>(
    sink: &mut S,
    geometry: &Geometry,
    addr: u32,
    data: &[u8],
) -> Result<usize, PartialWrite> {
    let mut written = 0;
    for chunk in PageChunks::new(addr, data.len(), geometry.page_size as u32) {
        log::trace!("Program {} bytes at {:#x}", chunk.len, chunk.addr);
        sink.program(chunk.addr, &data[chunk.range()])
            .map_err(|e| PartialWrite::new(written, e))?;
        sink.settle();
        written += chunk.len;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Program(u32, usize),
        Settle,
    }

    struct MockSink {
        ops: Vec<Op, 64>,
        mem: [u8; 256],
        fail_at: Option<usize>,
    }

    impl MockSink {
        fn new() -> Self {
            Self {
                ops: Vec::new(),
                mem: [0xFF; 256],
                fail_at: None,
            }
        }

        fn programs(&self) -> usize {
            self.ops.iter().filter(|op| matches!(op, Op::Program(..))).count()
        }
    }

    impl ChunkSink for MockSink {
        fn program(&mut self, addr: u32, data: &[u8]) -> crate::error::Result<()> {
            if self.fail_at == Some(self.programs()) {
                return Err(Error::Timeout);
            }
            self.ops.push(Op::Program(addr, data.len())).unwrap();
            let start = addr as usize;
            self.mem[start..start + data.len()].copy_from_slice(data);
            Ok(())
        }

        fn settle(&mut self) {
            self.ops.push(Op::Settle).unwrap();
        }
    }

    const GEOMETRY: Geometry = Geometry::new(256, 8, 16, 5);

    #[test]
    fn test_chunks_from_mid_page() {
        let chunks: Vec<Chunk, 8> = PageChunks::new(10, 40, 16).collect();
        assert_eq!(
            chunks.as_slice(),
            &[
                Chunk { addr: 10, offset: 0, len: 6 },
                Chunk { addr: 16, offset: 6, len: 16 },
                Chunk { addr: 32, offset: 22, len: 16 },
                Chunk { addr: 48, offset: 38, len: 2 },
            ]
        );
    }

    #[test]
    fn test_short_write_inside_one_page() {
        let chunks: Vec<Chunk, 8> = PageChunks::new(3, 4, 16).collect();
        assert_eq!(chunks.as_slice(), &[Chunk { addr: 3, offset: 0, len: 4 }]);
    }

    #[test]
    fn test_three_pages_mid_page_sequence() {
        let mut sink = MockSink::new();
        let data = [0x11u8; 42];
        assert_eq!(write_paged(&mut sink, &GEOMETRY, 0x08, &data, false), Ok(42));
        assert_eq!(
            sink.ops.as_slice(),
            &[
                Op::Program(0x08, 8),
                Op::Settle,
                Op::Program(0x10, 16),
                Op::Settle,
                Op::Program(0x20, 16),
                Op::Settle,
                Op::Program(0x30, 2),
                Op::Settle,
            ]
        );
        assert!(sink.mem[0x08..0x32].iter().all(|&b| b == 0x11));
        assert_eq!(sink.mem[0x32], 0xFF);
    }

    #[test]
    fn test_wrap_matches_two_writes() {
        let data: [u8; 20] = core::array::from_fn(|i| i as u8);

        let mut wrapped = MockSink::new();
        assert_eq!(write_paged(&mut wrapped, &GEOMETRY, 250, &data, true), Ok(20));

        let mut split = MockSink::new();
        assert_eq!(write_paged(&mut split, &GEOMETRY, 250, &data[..6], false), Ok(6));
        assert_eq!(write_paged(&mut split, &GEOMETRY, 0, &data[6..], false), Ok(14));

        assert_eq!(wrapped.ops, split.ops);
        assert_eq!(wrapped.mem, split.mem);
        assert_eq!(&wrapped.mem[250..], &data[..6]);
        assert_eq!(&wrapped.mem[..14], &data[6..]);
    }

    #[test]
    fn test_overflow_without_wrap_truncates() {
        let mut sink = MockSink::new();
        let data = [0xA5u8; 20];
        assert_eq!(write_paged(&mut sink, &GEOMETRY, 250, &data, false), Ok(6));
        assert_eq!(sink.mem[0], 0xFF);
    }

    #[test]
    fn test_failure_reports_partial_count() {
        let mut sink = MockSink::new();
        sink.fail_at = Some(2);
        let data = [0u8; 48];
        assert_eq!(
            write_paged(&mut sink, &GEOMETRY, 0, &data, false),
            Err(PartialWrite::new(32, Error::Timeout))
        );
        // Nothing after the failing chunk, not even a delay
        assert_eq!(sink.ops.last(), Some(&Op::Settle));
        assert_eq!(sink.programs(), 2);
    }

    #[test]
    fn test_failure_in_wrapped_tail() {
        let mut sink = MockSink::new();
        sink.fail_at = Some(1);
        let data = [0u8; 20];
        assert_eq!(
            write_paged(&mut sink, &GEOMETRY, 250, &data, true),
            Err(PartialWrite::new(6, Error::Timeout))
        );
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let mut sink = MockSink::new();
        assert_eq!(write_paged(&mut sink, &GEOMETRY, 0, &[], false), Ok(0));
        assert_eq!(
            write_paged(&mut sink, &GEOMETRY, 256, &[1], false),
            Err(PartialWrite::from(Error::InvalidArgument))
        );
        let empty = Geometry::default();
        assert_eq!(
            write_paged(&mut sink, &empty, 0, &[1], false),
            Err(PartialWrite::from(Error::InvalidArgument))
        );
        assert!(sink.ops.is_empty());
    }

    #[test]
    fn test_byte_pages() {
        let mut sink = MockSink::new();
        let geometry = Geometry::new(128, 7, 1, 10);
        assert_eq!(write_paged(&mut sink, &geometry, 5, &[1, 2, 3], false), Ok(3));
        assert_eq!(sink.programs(), 3);
        assert_eq!(sink.ops.len(), 6);
    }
}
