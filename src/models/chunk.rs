//! Chunk model.
//!
//! A chunk is an indivisible, sequential piece of a job produced by the
//! splitter. Chunks of the same job are totally ordered: chunk `k` must
//! finish no later than chunk `k+1` starts, wherever the two are placed.

use serde::{Deserialize, Serialize};

/// One sequential piece of a job.
///
/// Created once per solve by the chunker and immutable thereafter.
/// `seq` is 1-based; `total` is the number of sibling chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Owning job identifier.
    pub job_id: u32,
    /// Position within the job (1..=total).
    pub seq: u32,
    /// Number of chunks the job was split into.
    pub total: u32,
    /// Work units carried by this chunk.
    pub size: u32,
}

impl Chunk {
    /// Creates a new chunk.
    pub fn new(job_id: u32, seq: u32, total: u32, size: u32) -> Self {
        Self {
            job_id,
            seq,
            total,
            size,
        }
    }

    /// Whether this is the first chunk of its job.
    ///
    /// Only first chunks wait on the owning job's dependencies; later
    /// chunks wait on their predecessor sibling.
    #[inline]
    pub fn is_first(&self) -> bool {
        self.seq == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_ordering_flags() {
        let first = Chunk::new(1, 1, 3, 4);
        let last = Chunk::new(1, 3, 3, 4);
        assert!(first.is_first());
        assert!(!last.is_first());
    }

    #[test]
    fn test_chunk_roundtrip() {
        let chunk = Chunk::new(9, 2, 4, 3);
        let json = serde_json::to_string(&chunk).unwrap();
        let back: Chunk = serde_json::from_str(&json).unwrap();
        assert_eq!(back, chunk);
    }
}
