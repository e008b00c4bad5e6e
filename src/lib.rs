//! Precedence-aware parallel-machine scheduler.
//!
//! Assigns interdependent jobs to a fixed number of identical machines
//! to minimize makespan. Long jobs are split into sequential chunks so
//! they can interleave with other work; two solving strategies are
//! offered behind one request/result surface.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Job`, `Chunk`, `Assignment`, `Schedule`
//! - **`validation`**: Input integrity checks and dependency ordering
//! - **`chunker`**: Job-to-chunk decomposition
//! - **`evaluator`**: Makespan, load, efficiency, and violation metrics
//! - **`solver`**: The backtracking and cultural solvers plus the router
//!
//! # Example
//!
//! ```
//! use parsched::models::Job;
//! use parsched::solver::{solve, ScheduleRequest};
//!
//! let request = ScheduleRequest::new(vec![
//!     Job::new(1, 5).with_name("prepare"),
//!     Job::new(2, 3).with_name("finish").with_dependency(1),
//! ]);
//! let result = solve(&request);
//! assert!(result.success);
//! assert_eq!(result.makespan, 8);
//! ```
//!
//! # Concurrency
//!
//! Each solve call is single-threaded and synchronous, owns all of its
//! state (including the cultural solver's belief space), and is bounded
//! deterministically by iteration and generation caps. Concurrent
//! requests simply use separate invocations.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Reynolds (1994), "An Introduction to Cultural Algorithms"

pub mod chunker;
pub mod evaluator;
pub mod models;
pub mod solver;
pub mod validation;
