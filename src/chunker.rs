//! Job-to-chunk decomposition.
//!
//! Long jobs are split into sequential, near-equal chunks so they can
//! interleave with other work on the machines. Chunks are the atomic
//! unit both solvers place; splitting bounds worst-case assignment
//! granularity.
//!
//! # Splitting Rule
//!
//! A job at or below [`SPLIT_THRESHOLD`] stays whole. Above it, the job
//! is cut into `ceil(duration / min_chunk_size)` pieces of near-equal
//! size, the last piece absorbing the remainder. Sizes always sum to the
//! job's duration and every piece is at least one unit.

use std::collections::BTreeMap;

use crate::models::{Chunk, Job};

/// Jobs longer than this many work units are split into chunks.
pub const SPLIT_THRESHOLD: u32 = 5;

/// Splits a job into its ordered chunk sequence.
pub fn split(job: &Job) -> Vec<Chunk> {
    if job.duration <= SPLIT_THRESHOLD {
        return vec![Chunk::new(job.id, 1, 1, job.duration)];
    }

    // A zero min_chunk_size would mean infinitely many chunks; treat it
    // as the documented default of 1.
    let min_size = job.min_chunk_size.max(1);
    let count = job.duration.div_ceil(min_size);
    let base = job.duration / count;
    let remainder = job.duration % count;

    (1..=count)
        .map(|seq| {
            let size = if seq == count { base + remainder } else { base };
            Chunk::new(job.id, seq, count, size)
        })
        .collect()
}

/// Splits every job and flattens the chunks in the given job order.
///
/// The input must already be dependency-ordered (see
/// [`crate::validation::validate_jobs`]); the flattened sequence then
/// respects precedence: every chunk appears after all chunks of the jobs
/// its owner depends on, and after its own earlier siblings.
///
/// Also returns the splits map (job id → chunk count) reported to
/// callers.
pub fn chunk_jobs(ordered_jobs: &[&Job]) -> (Vec<Chunk>, BTreeMap<u32, u32>) {
    let mut chunks = Vec::with_capacity(ordered_jobs.len());
    let mut splits = BTreeMap::new();

    for job in ordered_jobs {
        let job_chunks = split(job);
        splits.insert(job.id, job_chunks.len() as u32);
        chunks.extend(job_chunks);
    }

    (chunks, splits)
}
