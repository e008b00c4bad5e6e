//! Solver selection and the uniform request/result surface.
//!
//! The router re-validates the request, decomposes jobs into chunks,
//! dispatches to the selected algorithm, and wraps whatever the solver
//! produced into one result shape. The two algorithms form a closed set
//! selected at this boundary:
//!
//! - [`BacktrackingSolver`]: exact/pruned search for small instances
//! - [`CulturalSolver`]: population-based heuristic for larger ones
//!
//! Validation failures surface as a structured failure result
//! (`success: false` plus a message), never as a panic; callers that
//! want a `Result` use [`try_solve`].

mod backtracking;
mod cultural;

pub use backtracking::{BacktrackingOutcome, BacktrackingSolver, DEFAULT_NODE_BUDGET};
pub use cultural::{CulturalOutcome, CulturalSolver, DEFAULT_GENERATIONS, DEFAULT_POPULATION};

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Instant;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::chunker;
use crate::evaluator::{self, CapacityViolation};
use crate::models::{Chunk, Job, Schedule};
use crate::validation::{self, ValidationError};

/// Per-machine capacity used when the request doesn't name one.
pub const DEFAULT_MACHINE_CAPACITY: u32 = 40;
/// Machine count used when the request doesn't name one.
pub const DEFAULT_MACHINE_COUNT: usize = 3;

/// The closed set of solving strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Exact/pruned depth-first search.
    Backtracking,
    /// Population-based cultural algorithm.
    Cultural,
}

impl Algorithm {
    /// Wire name of the algorithm.
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Backtracking => "backtracking",
            Algorithm::Cultural => "cultural",
        }
    }
}

impl FromStr for Algorithm {
    type Err = SolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backtracking" => Ok(Algorithm::Backtracking),
            "cultural" => Ok(Algorithm::Cultural),
            other => Err(SolveError::InvalidAlgorithm(other.to_string())),
        }
    }
}

/// Why a solve request was rejected before any search ran.
///
/// All variants are deterministic for a given input: retrying without
/// changing the request reproduces the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolveError {
    /// The job set failed structural validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The requested algorithm name is not in the closed set.
    #[error("unknown algorithm '{0}'; expected \"backtracking\" or \"cultural\"")]
    InvalidAlgorithm(String),
    /// The request asked for zero machines.
    #[error("machine count must be positive")]
    InvalidMachineCount,
}

/// A validated scheduling request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Jobs to schedule.
    pub jobs: Vec<Job>,
    /// Solving strategy by wire name (default: "backtracking").
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Per-machine capacity in work units (default: 40).
    #[serde(default = "default_machine_capacity")]
    pub machine_capacity: u32,
    /// Number of identical machines (default: 3).
    #[serde(default = "default_machine_count")]
    pub machine_count: usize,
    /// RNG seed for reproducible heuristic runs.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Override for the backtracking node budget.
    #[serde(default)]
    pub node_budget: Option<u64>,
}

fn default_algorithm() -> String {
    Algorithm::Backtracking.as_str().to_string()
}

fn default_machine_capacity() -> u32 {
    DEFAULT_MACHINE_CAPACITY
}

fn default_machine_count() -> usize {
    DEFAULT_MACHINE_COUNT
}

impl ScheduleRequest {
    /// Creates a request with default algorithm, capacity, and machine
    /// count.
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            jobs,
            algorithm: default_algorithm(),
            machine_capacity: DEFAULT_MACHINE_CAPACITY,
            machine_count: DEFAULT_MACHINE_COUNT,
            seed: None,
            node_budget: None,
        }
    }

    /// Selects the solving strategy.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm.as_str().to_string();
        self
    }

    /// Sets the per-machine capacity.
    pub fn with_machine_capacity(mut self, capacity: u32) -> Self {
        self.machine_capacity = capacity;
        self
    }

    /// Sets the machine count.
    pub fn with_machine_count(mut self, count: usize) -> Self {
        self.machine_count = count;
        self
    }

    /// Seeds the heuristic solver's RNG.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Overrides the backtracking node budget.
    pub fn with_node_budget(mut self, budget: u64) -> Self {
        self.node_budget = Some(budget);
        self
    }
}

/// One scheduled chunk in the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkAssignment {
    /// Owning job identifier.
    pub job_id: u32,
    /// Owning job name.
    pub job_name: String,
    /// Machine index (0-based).
    pub machine: usize,
    /// Start time.
    pub start: u32,
    /// End time.
    pub end: u32,
    /// Chunk position within the job (1-based).
    pub chunk_id: u32,
    /// Number of chunks the job was split into.
    pub total_chunks: u32,
    /// Work units carried by this chunk.
    pub size: u32,
}

/// Uniform result of a solve call, success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResult {
    /// Whether a schedule was produced.
    pub success: bool,
    /// Completion time of the last-finishing chunk (0 on failure).
    pub makespan: u32,
    /// Wall-clock seconds spent in the solve call.
    pub execution_time: f64,
    /// Per-machine chunk assignments, each list ordered by start time.
    pub schedule: Vec<Vec<ChunkAssignment>>,
    /// Human-readable trace of the run.
    pub logs: Vec<String>,
    /// Search nodes expanded (backtracking only).
    #[serde(default)]
    pub iterations: Option<u64>,
    /// Job id → number of chunks it was split into.
    pub splits_info: BTreeMap<u32, u32>,
    /// Total work ÷ total machine time (0.0..=1.0).
    pub efficiency: f64,
    /// Sum of all chunk sizes.
    pub total_work: u32,
    /// Machine time not spent working.
    pub total_idle_time: u32,
    /// Machine count × makespan.
    pub total_machine_time: u32,
    /// Per-machine work ÷ capacity × 100.
    pub machine_loads: Vec<f64>,
    /// Chunks whose size exceeds the capacity.
    pub capacity_violations: Vec<CapacityViolation>,
    /// Populated when `success` is false.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ScheduleResult {
    fn failure(error: &SolveError, execution_time: f64) -> Self {
        Self {
            success: false,
            makespan: 0,
            execution_time,
            schedule: Vec::new(),
            logs: vec![error.to_string()],
            iterations: None,
            splits_info: BTreeMap::new(),
            efficiency: 0.0,
            total_work: 0,
            total_idle_time: 0,
            total_machine_time: 0,
            machine_loads: Vec::new(),
            capacity_violations: Vec::new(),
            error_message: Some(error.to_string()),
        }
    }
}

/// Solves a request, folding any pre-search error into the result.
pub fn solve(request: &ScheduleRequest) -> ScheduleResult {
    let started = Instant::now();
    match run(request, started) {
        Ok(result) => result,
        Err(error) => {
            warn!("solve rejected: {error}");
            ScheduleResult::failure(&error, started.elapsed().as_secs_f64())
        }
    }
}

/// Solves a request, surfacing pre-search errors as `Err`.
pub fn try_solve(request: &ScheduleRequest) -> Result<ScheduleResult, SolveError> {
    run(request, Instant::now())
}

fn run(request: &ScheduleRequest, started: Instant) -> Result<ScheduleResult, SolveError> {
    let algorithm: Algorithm = request.algorithm.parse()?;
    if request.machine_count == 0 {
        return Err(SolveError::InvalidMachineCount);
    }

    let ordered = validation::validate_jobs(&request.jobs, request.machine_capacity)?;
    let (chunks, splits_info) = chunker::chunk_jobs(&ordered);
    let total_duration: u32 = ordered.iter().map(|j| j.duration).sum();

    let mut logs = vec![
        format!("{} solver selected", algorithm.as_str()),
        format!("{} jobs, {} total work units", ordered.len(), total_duration),
        format!(
            "{} machines, capacity {} units each",
            request.machine_count, request.machine_capacity
        ),
    ];
    for job in &ordered {
        if let Some(&count) = splits_info.get(&job.id) {
            if count > 1 {
                logs.push(format!(
                    "job '{}' ({} units) split into {count} chunks",
                    job.name, job.duration
                ));
            }
        }
    }

    let (schedule, iterations, solver_logs) = match algorithm {
        Algorithm::Backtracking => {
            let solver = BacktrackingSolver::new(request.machine_count)
                .with_node_budget(request.node_budget.unwrap_or(DEFAULT_NODE_BUDGET));
            let outcome = solver.solve(&ordered, &chunks);
            (outcome.schedule, Some(outcome.nodes_expanded), outcome.logs)
        }
        Algorithm::Cultural => {
            let mut solver = CulturalSolver::new(request.machine_count, request.machine_capacity);
            if let Some(seed) = request.seed {
                solver = solver.with_seed(seed);
            }
            let outcome = solver.solve(&ordered, &chunks);
            (outcome.schedule, None, outcome.logs)
        }
    };
    logs.extend(solver_logs);

    let report = evaluator::evaluate(&schedule, request.machine_count, request.machine_capacity);
    let lanes = per_machine_lanes(&schedule, &ordered, &chunks, request.machine_count);

    for (machine, work) in schedule.machine_work(request.machine_count).iter().enumerate() {
        logs.push(format!(
            "machine {}: {work} work units, load {:.1}%, {} chunks",
            machine + 1,
            report.machine_loads[machine],
            lanes[machine].len()
        ));
    }
    logs.push(format!(
        "final makespan: {}, efficiency {:.1}%",
        report.makespan,
        report.efficiency * 100.0
    ));
    info!(
        "{} solve finished: makespan {}",
        algorithm.as_str(),
        report.makespan
    );

    Ok(ScheduleResult {
        success: true,
        makespan: report.makespan,
        execution_time: started.elapsed().as_secs_f64(),
        schedule: lanes,
        logs,
        iterations,
        splits_info,
        efficiency: report.efficiency,
        total_work: report.total_work,
        total_idle_time: report.total_idle_time,
        total_machine_time: report.total_machine_time,
        machine_loads: report.machine_loads,
        capacity_violations: report.violations,
        error_message: None,
    })
}

/// Groups a schedule into per-machine lanes ordered by start time.
fn per_machine_lanes(
    schedule: &Schedule,
    jobs: &[&Job],
    chunks: &[Chunk],
    machine_count: usize,
) -> Vec<Vec<ChunkAssignment>> {
    let names: HashMap<u32, &str> = jobs.iter().map(|j| (j.id, j.name.as_str())).collect();
    let totals: HashMap<u32, u32> = chunks.iter().map(|c| (c.job_id, c.total)).collect();

    let mut lanes = vec![Vec::new(); machine_count];
    for a in &schedule.assignments {
        if let Some(lane) = lanes.get_mut(a.machine) {
            lane.push(ChunkAssignment {
                job_id: a.job_id,
                job_name: (*names.get(&a.job_id).unwrap_or(&"")).to_string(),
                machine: a.machine,
                start: a.start,
                end: a.end,
                chunk_id: a.chunk_seq,
                total_chunks: totals.get(&a.job_id).copied().unwrap_or(1),
                size: a.size(),
            });
        }
    }
    for lane in &mut lanes {
        lane.sort_by_key(|c| (c.start, c.job_id, c.chunk_id));
    }
    lanes
}
