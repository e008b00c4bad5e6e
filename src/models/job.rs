//! Job model.
//!
//! A job is a unit of work with a duration, precedence dependencies on
//! other jobs, and a minimum chunk size governing how it may be split
//! across machines.
//!
//! # Time Representation
//! All durations are abstract work units relative to a scheduling epoch
//! (t=0). The consumer defines what one unit means (minutes, slots, ...).

use serde::{Deserialize, Serialize};

/// A job to be scheduled.
///
/// Jobs longer than the splitting threshold are decomposed into
/// sequential chunks (see [`crate::chunker`]); dependencies are on whole
/// jobs, never on individual chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier.
    pub id: u32,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Processing time in work units. Must be positive.
    pub duration: u32,
    /// IDs of jobs that must complete before this one starts.
    #[serde(default)]
    pub dependencies: Vec<u32>,
    /// Minimum size of each chunk when the job is split (default: 1).
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: u32,
}

fn default_min_chunk_size() -> u32 {
    1
}

impl Job {
    /// Creates a new job with the given ID and duration.
    pub fn new(id: u32, duration: u32) -> Self {
        Self {
            id,
            name: String::new(),
            duration,
            dependencies: Vec::new(),
            min_chunk_size: default_min_chunk_size(),
        }
    }

    /// Sets the job name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a dependency on another job.
    pub fn with_dependency(mut self, job_id: u32) -> Self {
        self.dependencies.push(job_id);
        self
    }

    /// Replaces the dependency list.
    pub fn with_dependencies(mut self, dependencies: Vec<u32>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Sets the minimum chunk size.
    pub fn with_min_chunk_size(mut self, size: u32) -> Self {
        self.min_chunk_size = size;
        self
    }

    /// Whether this job depends on the given job.
    pub fn depends_on(&self, job_id: u32) -> bool {
        self.dependencies.contains(&job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_builder() {
        let job = Job::new(1, 12)
            .with_name("assemble")
            .with_dependency(2)
            .with_dependency(3)
            .with_min_chunk_size(4);

        assert_eq!(job.id, 1);
        assert_eq!(job.name, "assemble");
        assert_eq!(job.duration, 12);
        assert_eq!(job.dependencies, vec![2, 3]);
        assert_eq!(job.min_chunk_size, 4);
        assert!(job.depends_on(2));
        assert!(!job.depends_on(4));
    }

    #[test]
    fn test_job_defaults() {
        let job = Job::new(7, 3);
        assert!(job.name.is_empty());
        assert!(job.dependencies.is_empty());
        assert_eq!(job.min_chunk_size, 1);
    }

    #[test]
    fn test_job_deserialize_defaults() {
        let job: Job = serde_json::from_str(r#"{"id": 5, "duration": 9}"#).unwrap();
        assert_eq!(job.id, 5);
        assert_eq!(job.duration, 9);
        assert!(job.dependencies.is_empty());
        assert_eq!(job.min_chunk_size, 1);
    }

    #[test]
    fn test_job_roundtrip() {
        let job = Job::new(2, 8).with_name("paint").with_dependency(1);
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, job.id);
        assert_eq!(back.name, job.name);
        assert_eq!(back.dependencies, job.dependencies);
    }
}
