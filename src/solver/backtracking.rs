//! Exact backtracking solver.
//!
//! Depth-first search over chunk→machine assignments in dependency
//! order, pruned against the best complete makespan found so far. Exact
//! on small instances; on larger ones a node-expansion budget caps the
//! exponential blowup and the best schedule found so far is returned.
//!
//! # Search
//!
//! At chunk `i` every machine is tried in index order. The earliest
//! feasible start on a machine is the later of the machine's free time
//! and the chunk's ready time (previous sibling's end, or the completion
//! of every dependency job for a first chunk). A branch is cut as soon
//! as its start time reaches the best known makespan — it can no longer
//! improve on it. Deterministic by construction: no randomness, fixed
//! machine order, strict improvement required to replace the best.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::models::{Assignment, Chunk, Job, Schedule};

/// Default cap on search-tree node expansions.
pub const DEFAULT_NODE_BUDGET: u64 = 5000;

/// Pruned depth-first search over chunk assignments.
#[derive(Debug, Clone)]
pub struct BacktrackingSolver {
    machine_count: usize,
    node_budget: u64,
}

/// What a backtracking run produced.
#[derive(Debug, Clone)]
pub struct BacktrackingOutcome {
    /// Best complete schedule found.
    pub schedule: Schedule,
    /// Its makespan.
    pub makespan: u32,
    /// Search-tree nodes expanded.
    pub nodes_expanded: u64,
    /// Whether the node budget ended the search early.
    pub truncated: bool,
    /// Human-readable trace of the run.
    pub logs: Vec<String>,
}

impl BacktrackingSolver {
    /// Creates a solver for the given machine count.
    pub fn new(machine_count: usize) -> Self {
        Self {
            machine_count,
            node_budget: DEFAULT_NODE_BUDGET,
        }
    }

    /// Overrides the node-expansion budget.
    pub fn with_node_budget(mut self, budget: u64) -> Self {
        self.node_budget = budget;
        self
    }

    /// Runs the search.
    ///
    /// `jobs` must be dependency-ordered and `chunks` must be their
    /// flattened decomposition (see [`crate::chunker::chunk_jobs`]).
    pub fn solve(&self, jobs: &[&Job], chunks: &[Chunk]) -> BacktrackingOutcome {
        let deps: HashMap<u32, &[u32]> = jobs
            .iter()
            .map(|j| (j.id, j.dependencies.as_slice()))
            .collect();

        let mut logs = Vec::new();
        logs.push(format!(
            "backtracking search started: {} jobs, {} chunks, {} machines, node budget {}",
            jobs.len(),
            chunks.len(),
            self.machine_count,
            self.node_budget
        ));
        info!(
            "backtracking: {} chunks on {} machines, budget {}",
            chunks.len(),
            self.machine_count,
            self.node_budget
        );

        let mut search = Search {
            chunks,
            deps: &deps,
            machine_free: vec![0; self.machine_count],
            job_tail: HashMap::with_capacity(jobs.len()),
            assignments: Vec::with_capacity(chunks.len()),
            best_makespan: u32::MAX,
            best: None,
            nodes: 0,
            budget: self.node_budget,
            out_of_budget: false,
        };
        search.descend(0);

        let (schedule, makespan) = match search.best.take() {
            Some(assignments) => {
                if search.out_of_budget {
                    warn!(
                        "backtracking node budget ({}) exhausted; returning best schedule found",
                        self.node_budget
                    );
                    logs.push(format!(
                        "node budget ({}) exhausted; best schedule found so far returned",
                        self.node_budget
                    ));
                } else {
                    logs.push(format!(
                        "search space exhausted after {} node expansions",
                        search.nodes
                    ));
                }
                (Schedule { assignments }, search.best_makespan)
            }
            None => {
                // Budget smaller than the chunk count: the search never
                // reached a leaf. Fall back to earliest-free-machine
                // placement so a schedule is still returned.
                warn!("backtracking budget too small for a full descent; completing greedily");
                logs.push(format!(
                    "node budget ({}) too small to place all {} chunks; greedy completion used",
                    self.node_budget,
                    chunks.len()
                ));
                let schedule = greedy_completion(chunks, &deps, self.machine_count);
                let makespan = schedule.makespan();
                (schedule, makespan)
            }
        };

        logs.push(format!("best makespan: {makespan}"));
        BacktrackingOutcome {
            schedule,
            makespan,
            nodes_expanded: search.nodes,
            truncated: search.out_of_budget,
            logs,
        }
    }
}

struct Search<'a> {
    chunks: &'a [Chunk],
    deps: &'a HashMap<u32, &'a [u32]>,
    machine_free: Vec<u32>,
    /// End time of the most recently placed chunk per job.
    job_tail: HashMap<u32, u32>,
    assignments: Vec<Assignment>,
    best_makespan: u32,
    best: Option<Vec<Assignment>>,
    nodes: u64,
    budget: u64,
    out_of_budget: bool,
}

impl Search<'_> {
    /// Earliest time the chunk may start, from precedence alone.
    fn ready_time(&self, chunk: &Chunk) -> u32 {
        if chunk.is_first() {
            self.deps
                .get(&chunk.job_id)
                .into_iter()
                .flat_map(|deps| deps.iter())
                .filter_map(|dep| self.job_tail.get(dep).copied())
                .max()
                .unwrap_or(0)
        } else {
            // Later siblings wait on the previous chunk, which the
            // chunk ordering guarantees is already placed.
            self.job_tail.get(&chunk.job_id).copied().unwrap_or(0)
        }
    }

    fn descend(&mut self, index: usize) {
        if index == self.chunks.len() {
            let makespan = self.machine_free.iter().copied().max().unwrap_or(0);
            if makespan < self.best_makespan {
                debug!("improved makespan {makespan} after {} nodes", self.nodes);
                self.best_makespan = makespan;
                self.best = Some(self.assignments.clone());
            }
            return;
        }

        let chunk = self.chunks[index];
        let ready = self.ready_time(&chunk);

        for machine in 0..self.machine_free.len() {
            if self.out_of_budget {
                return;
            }
            if self.nodes >= self.budget {
                self.out_of_budget = true;
                return;
            }
            self.nodes += 1;

            let start = ready.max(self.machine_free[machine]);
            if start >= self.best_makespan {
                // This branch can no longer beat the best complete
                // schedule.
                continue;
            }
            let end = start + chunk.size;

            let prev_free = self.machine_free[machine];
            let prev_tail = self.job_tail.insert(chunk.job_id, end);
            self.machine_free[machine] = end;
            self.assignments
                .push(Assignment::new(chunk.job_id, chunk.seq, machine, start, end));

            self.descend(index + 1);

            self.assignments.pop();
            self.machine_free[machine] = prev_free;
            match prev_tail {
                Some(t) => {
                    self.job_tail.insert(chunk.job_id, t);
                }
                None => {
                    self.job_tail.remove(&chunk.job_id);
                }
            }
        }
    }
}

/// Places every chunk on the machine that frees up first.
fn greedy_completion(
    chunks: &[Chunk],
    deps: &HashMap<u32, &[u32]>,
    machine_count: usize,
) -> Schedule {
    let mut machine_free = vec![0u32; machine_count];
    let mut job_tail: HashMap<u32, u32> = HashMap::new();
    let mut schedule = Schedule::with_capacity(chunks.len());

    for chunk in chunks {
        let ready = if chunk.is_first() {
            deps.get(&chunk.job_id)
                .into_iter()
                .flat_map(|deps| deps.iter())
                .filter_map(|dep| job_tail.get(dep).copied())
                .max()
                .unwrap_or(0)
        } else {
            job_tail.get(&chunk.job_id).copied().unwrap_or(0)
        };

        let machine = machine_free
            .iter()
            .enumerate()
            .min_by_key(|(_, &free)| free)
            .map(|(m, _)| m)
            .unwrap_or(0);
        let start = ready.max(machine_free[machine]);
        let end = start + chunk.size;

        machine_free[machine] = end;
        job_tail.insert(chunk.job_id, end);
        schedule.push(Assignment::new(chunk.job_id, chunk.seq, machine, start, end));
    }

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker;
    use crate::validation::validate_jobs;

    fn solve(jobs: &[Job], machines: usize, budget: u64) -> BacktrackingOutcome {
        let ordered = validate_jobs(jobs, 40).unwrap();
        let (chunks, _) = chunker::chunk_jobs(&ordered);
        BacktrackingSolver::new(machines)
            .with_node_budget(budget)
            .solve(&ordered, &chunks)
    }

    #[test]
    fn test_two_independent_jobs_run_in_parallel() {
        let jobs = vec![Job::new(1, 5), Job::new(2, 3)];
        let outcome = solve(&jobs, 2, DEFAULT_NODE_BUDGET);
        assert_eq!(outcome.makespan, 5);
        assert!(!outcome.truncated);
    }

    #[test]
    fn test_dependent_chain_on_one_machine() {
        let jobs = vec![Job::new(1, 4), Job::new(2, 4).with_dependency(1)];
        let outcome = solve(&jobs, 1, DEFAULT_NODE_BUDGET);
        assert_eq!(outcome.makespan, 8);

        let a_end = outcome.schedule.job_completion_time(1).unwrap();
        let b_start = outcome
            .schedule
            .assignments_for_job(2)
            .iter()
            .map(|a| a.start)
            .min()
            .unwrap();
        assert_eq!(b_start, a_end);
    }

    #[test]
    fn test_dependency_respected_across_machines() {
        let jobs = vec![Job::new(1, 3), Job::new(2, 3).with_dependency(1)];
        let outcome = solve(&jobs, 2, DEFAULT_NODE_BUDGET);
        // Job 2 cannot overlap job 1 no matter how many machines exist.
        assert_eq!(outcome.makespan, 6);
    }

    #[test]
    fn test_deterministic_across_runs() {
        let jobs = vec![
            Job::new(1, 7),
            Job::new(2, 4).with_dependency(1),
            Job::new(3, 3),
        ];
        let first = solve(&jobs, 2, 200);
        let second = solve(&jobs, 2, 200);
        assert_eq!(first.makespan, second.makespan);
        assert_eq!(first.schedule.assignments, second.schedule.assignments);
    }

    #[test]
    fn test_larger_budget_never_worse() {
        let jobs = vec![
            Job::new(1, 8),
            Job::new(2, 6),
            Job::new(3, 4).with_dependency(1),
            Job::new(4, 5),
        ];
        let mut previous = u32::MAX;
        for budget in [20, 200, 2000, 20_000] {
            let outcome = solve(&jobs, 2, budget);
            assert!(
                outcome.makespan <= previous,
                "budget {budget} worsened makespan"
            );
            previous = outcome.makespan;
        }
    }

    #[test]
    fn test_tiny_budget_still_places_everything() {
        let jobs = vec![Job::new(1, 8), Job::new(2, 6), Job::new(3, 7)];
        let ordered = validate_jobs(&jobs, 40).unwrap();
        let (chunks, _) = chunker::chunk_jobs(&ordered);

        let outcome = solve(&jobs, 2, 1);
        assert!(outcome.truncated);
        assert_eq!(outcome.schedule.len(), chunks.len());
        assert_eq!(outcome.makespan, outcome.schedule.makespan());
    }

    #[test]
    fn test_no_overlap_on_any_machine() {
        let jobs = vec![
            Job::new(1, 9),
            Job::new(2, 7).with_dependency(1),
            Job::new(3, 6),
            Job::new(4, 2),
        ];
        let outcome = solve(&jobs, 3, DEFAULT_NODE_BUDGET);

        for machine in 0..3 {
            let mut spans: Vec<(u32, u32)> = outcome
                .schedule
                .assignments_for_machine(machine)
                .iter()
                .map(|a| (a.start, a.end))
                .collect();
            spans.sort_unstable();
            for pair in spans.windows(2) {
                assert!(pair[0].1 <= pair[1].0, "overlap on machine {machine}");
            }
        }
    }

    #[test]
    fn test_split_job_chunks_stay_sequential() {
        let jobs = vec![Job::new(1, 12).with_min_chunk_size(4)];
        let outcome = solve(&jobs, 3, DEFAULT_NODE_BUDGET);

        let mut ends: Vec<(u32, u32, u32)> = outcome
            .schedule
            .assignments_for_job(1)
            .iter()
            .map(|a| (a.chunk_seq, a.start, a.end))
            .collect();
        ends.sort_unstable();
        assert_eq!(ends.len(), 3);
        for pair in ends.windows(2) {
            assert!(pair[0].2 <= pair[1].1, "sibling chunks overlap");
        }
        // Sequential chunks cannot parallelize: makespan is the duration.
        assert_eq!(outcome.makespan, 12);
    }
}
