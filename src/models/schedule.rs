//! Schedule (solution) model.
//!
//! A schedule is a complete assignment of chunks to machines and time
//! slots. Both solvers produce one `Schedule` per run and hand it to the
//! evaluator for scoring.

use serde::{Deserialize, Serialize};

/// A chunk-machine-time assignment.
///
/// Records that a specific chunk of a job runs on a specific machine
/// during `[start, end)`. The interval length always equals the chunk
/// size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Owning job identifier.
    pub job_id: u32,
    /// Chunk position within the job (1-based).
    pub chunk_seq: u32,
    /// Machine index (0-based).
    pub machine: usize,
    /// Start time (work units).
    pub start: u32,
    /// End time (work units).
    pub end: u32,
}

impl Assignment {
    /// Creates a new assignment.
    pub fn new(job_id: u32, chunk_seq: u32, machine: usize, start: u32, end: u32) -> Self {
        Self {
            job_id,
            chunk_seq,
            machine,
            start,
            end,
        }
    }

    /// Work units covered (end - start).
    #[inline]
    pub fn size(&self) -> u32 {
        self.end - self.start
    }
}

/// A complete schedule: one assignment per chunk of every job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    /// Chunk assignments in placement order.
    pub assignments: Vec<Assignment>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty schedule with room for `n` assignments.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            assignments: Vec::with_capacity(n),
        }
    }

    /// Adds an assignment.
    pub fn push(&mut self, assignment: Assignment) {
        self.assignments.push(assignment);
    }

    /// Makespan: latest end time across all assignments.
    pub fn makespan(&self) -> u32 {
        self.assignments.iter().map(|a| a.end).max().unwrap_or(0)
    }

    /// Returns all assignments on a given machine.
    pub fn assignments_for_machine(&self, machine: usize) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.machine == machine)
            .collect()
    }

    /// Returns all assignments of a given job.
    pub fn assignments_for_job(&self, job_id: u32) -> Vec<&Assignment> {
        self.assignments
            .iter()
            .filter(|a| a.job_id == job_id)
            .collect()
    }

    /// Completion time of a job (latest end of its chunks).
    pub fn job_completion_time(&self, job_id: u32) -> Option<u32> {
        self.assignments_for_job(job_id)
            .iter()
            .map(|a| a.end)
            .max()
    }

    /// Work units placed on each machine.
    pub fn machine_work(&self, machine_count: usize) -> Vec<u32> {
        let mut work = vec![0u32; machine_count];
        for a in &self.assignments {
            if let Some(slot) = work.get_mut(a.machine) {
                *slot += a.size();
            }
        }
        work
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether the schedule has no assignments.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
