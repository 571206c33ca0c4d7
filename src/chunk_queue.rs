use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

/// The needle the decoder ever looks for. Kept as a constant so
/// [`ChunkQueue::index_of_crlf`] doesn't need to take a generic needle.
const CRLF: [u8; 2] = [b'\r', b'\n'];

/// An ordered, append-only run of byte chunks with a cached total length.
///
/// Incoming TCP reads land here as-is (no copy on append); [`take`] only
/// copies when a caller asks for a prefix that straddles more than one
/// chunk, or that ends partway through one.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    chunks: VecDeque<Bytes>,
    len: usize,
}

impl ChunkQueue {
    pub fn new() -> ChunkQueue {
        ChunkQueue::default()
    }

    /// Appends a chunk of bytes arriving from the wire.
    pub fn append(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.len += chunk.len();
        self.chunks.push_back(chunk);
    }

    /// Total number of bytes currently buffered.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the absolute offset of the first `\r\n`, if any is fully
    /// buffered yet.
    pub fn index_of_crlf(&self) -> Option<usize> {
        let mut offset = 0;
        let mut prev_byte: Option<u8> = None;

        for chunk in &self.chunks {
            if let Some(prev) = prev_byte {
                // A CRLF may straddle the boundary between this chunk and
                // the previous one.
                if prev == CRLF[0] && chunk.first() == Some(&CRLF[1]) {
                    return Some(offset - 1);
                }
            }

            if let Some(pos) = find_subslice(chunk, &CRLF) {
                return Some(offset + pos);
            }

            offset += chunk.len();
            prev_byte = chunk.last().copied();
        }

        None
    }

    /// Detaches the first `n` bytes as a single contiguous buffer and
    /// advances the head past them.
    ///
    /// # Panics
    /// Panics if `n` exceeds [`len`](Self::len). This is a precondition
    /// violation, per the component contract.
    pub fn take(&mut self, n: usize) -> Bytes {
        assert!(n <= self.len, "ChunkQueue::take: not enough buffered bytes");

        if n == 0 {
            return Bytes::new();
        }

        // Zero-copy fast path: the whole head chunk, and only the head
        // chunk, is being requested.
        if let Some(front) = self.chunks.front() {
            if front.len() == n {
                self.len -= n;
                return self.chunks.pop_front().unwrap();
            }
        }

        let mut out = BytesMut::with_capacity(n);
        let mut remaining = n;
        while remaining > 0 {
            let front = self.chunks.front_mut().expect("len invariant violated");
            if front.len() <= remaining {
                remaining -= front.len();
                out.extend_from_slice(front);
                self.chunks.pop_front();
            } else {
                out.extend_from_slice(&front[..remaining]);
                *front = front.split_off(remaining);
                remaining = 0;
            }
        }

        self.len -= n;
        out.freeze()
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_zero_copy_when_whole_chunk() {
        let mut q = ChunkQueue::new();
        q.append(Bytes::from_static(b"hello"));
        let out = q.take(5);
        assert_eq!(&out[..], b"hello");
        assert_eq!(q.len(), 0);
    }

    #[test]
    fn take_splits_head_chunk() {
        let mut q = ChunkQueue::new();
        q.append(Bytes::from_static(b"hello world"));
        let out = q.take(5);
        assert_eq!(&out[..], b"hello");
        assert_eq!(q.len(), 6);
        let rest = q.take(6);
        assert_eq!(&rest[..], b" world");
    }

    #[test]
    fn take_spans_multiple_chunks() {
        let mut q = ChunkQueue::new();
        q.append(Bytes::from_static(b"ab"));
        q.append(Bytes::from_static(b"cd"));
        q.append(Bytes::from_static(b"ef"));
        let out = q.take(5);
        assert_eq!(&out[..], b"abcde");
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn index_of_crlf_within_single_chunk() {
        let mut q = ChunkQueue::new();
        q.append(Bytes::from_static(b"+OK\r\nmore"));
        assert_eq!(q.index_of_crlf(), Some(3));
    }

    #[test]
    fn index_of_crlf_across_boundary() {
        let mut q = ChunkQueue::new();
        q.append(Bytes::from_static(b"+OK\r"));
        q.append(Bytes::from_static(b"\nmore"));
        assert_eq!(q.index_of_crlf(), Some(3));
    }

    #[test]
    fn index_of_crlf_byte_by_byte() {
        let mut q = ChunkQueue::new();
        for b in b"+OK\r\n" {
            q.append(Bytes::copy_from_slice(&[*b]));
        }
        assert_eq!(q.index_of_crlf(), Some(3));
    }

    #[test]
    fn index_of_crlf_absent() {
        let mut q = ChunkQueue::new();
        q.append(Bytes::from_static(b"no terminator here"));
        assert_eq!(q.index_of_crlf(), None);
    }

    #[test]
    #[should_panic]
    fn take_beyond_length_panics() {
        let mut q = ChunkQueue::new();
        q.append(Bytes::from_static(b"ab"));
        let _ = q.take(3);
    }
}
