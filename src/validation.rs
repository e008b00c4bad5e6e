//! Input validation and dependency ordering.
//!
//! Checks structural integrity of a job set before any solver runs and
//! produces the topological order both solvers schedule in. Detects:
//! - Empty job sets
//! - Duplicate job IDs
//! - Zero durations
//! - References to non-existent jobs
//! - Circular precedence dependencies (DAG validation)
//! - Jobs longer than the per-machine capacity
//!
//! Every failure is terminal for the request: the inputs are wrong and
//! retrying without changing them reproduces the same error.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
//! (Topological Sort)

use std::collections::{HashMap, HashSet};

use crate::models::Job;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The request contains no jobs.
    EmptyJobSet,
    /// Two jobs share the same ID.
    DuplicateId,
    /// A job has a zero duration.
    InvalidDuration,
    /// A job references a dependency that doesn't exist.
    UnknownDependency,
    /// The precedence graph contains a cycle.
    CyclicDependency,
    /// A job is longer than the per-machine capacity.
    JobExceedsCapacity,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a job set and returns it in dependency order.
///
/// Checks, in order:
/// 1. The set is non-empty
/// 2. No duplicate job IDs
/// 3. Every duration is positive
/// 4. All dependency references point to existing jobs
/// 5. No job's duration exceeds `machine_capacity`
/// 6. The precedence graph is acyclic
///
/// On success the returned order places every job after all of its
/// dependencies; ties are broken by original input order, so the result
/// is deterministic.
pub fn validate_jobs(jobs: &[Job], machine_capacity: u32) -> Result<Vec<&Job>, ValidationError> {
    if jobs.is_empty() {
        return Err(ValidationError::new(
            ValidationErrorKind::EmptyJobSet,
            "no jobs to schedule",
        ));
    }

    let mut by_id: HashMap<u32, &Job> = HashMap::with_capacity(jobs.len());
    for job in jobs {
        if by_id.insert(job.id, job).is_some() {
            return Err(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("duplicate job id: {}", job.id),
            ));
        }
    }

    for job in jobs {
        if job.duration == 0 {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidDuration,
                format!("job '{}' (id {}) has zero duration", job.name, job.id),
            ));
        }

        for &dep in &job.dependencies {
            if !by_id.contains_key(&dep) {
                return Err(ValidationError::new(
                    ValidationErrorKind::UnknownDependency,
                    format!("job '{}' (id {}) depends on unknown job {dep}", job.name, job.id),
                ));
            }
        }

        if job.duration > machine_capacity {
            return Err(ValidationError::new(
                ValidationErrorKind::JobExceedsCapacity,
                format!(
                    "job '{}' ({} units) exceeds the {machine_capacity}-unit machine capacity",
                    job.name, job.duration
                ),
            ));
        }
    }

    topological_order(jobs, &by_id)
}

/// Orders jobs so that every job follows its dependencies.
///
/// # Algorithm
/// Tagged-state DFS: a node reached while still on the recursion stack
/// signals a back edge, hence a cycle. Visiting jobs in input order and
/// appending each after its dependencies yields a topological order with
/// input-order tie-breaking.
fn topological_order<'a>(
    jobs: &'a [Job],
    by_id: &HashMap<u32, &'a Job>,
) -> Result<Vec<&'a Job>, ValidationError> {
    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();
    let mut order = Vec::with_capacity(jobs.len());

    for job in jobs {
        visit(job.id, by_id, &mut visited, &mut in_stack, &mut order)?;
    }

    Ok(order)
}

fn visit<'a>(
    job_id: u32,
    by_id: &HashMap<u32, &'a Job>,
    visited: &mut HashSet<u32>,
    in_stack: &mut HashSet<u32>,
    order: &mut Vec<&'a Job>,
) -> Result<(), ValidationError> {
    if visited.contains(&job_id) {
        return Ok(());
    }
    if !in_stack.insert(job_id) {
        return Err(ValidationError::new(
            ValidationErrorKind::CyclicDependency,
            format!("circular dependency detected involving job {job_id}"),
        ));
    }

    // Unknown references were rejected earlier, so the lookup cannot miss.
    if let Some(&job) = by_id.get(&job_id) {
        for &dep in &job.dependencies {
            visit(dep, by_id, visited, in_stack, order)?;
        }
        order.push(job);
    }

    in_stack.remove(&job_id);
    visited.insert(job_id);
    Ok(())
}
