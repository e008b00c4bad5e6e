//! Schedule evaluation.
//!
//! Turns a complete schedule into the metrics callers consume: makespan,
//! per-machine load, efficiency, idle time, and capacity violations.
//! Pure and allocation-light — both solvers call it on every candidate,
//! so it stays a single pass over the assignments.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan | Latest end time across all assignments |
//! | Machine load | Work on the machine ÷ capacity × 100 |
//! | Efficiency | Total work ÷ (machine count × makespan), 0.0..=1.0 |
//! | Idle time | Machine count × makespan − total work |
//!
//! # Capacity Violations
//!
//! A violation is a single chunk whose own size exceeds the per-machine
//! capacity — not a sliding-window check, since a machine never runs two
//! chunks concurrently by construction. Input validation rejects jobs
//! longer than the capacity before solving, so for chunker-produced
//! schedules this list is normally empty; the check is kept because it
//! is cheap and callers surface it as a warning, not a failure.

use serde::{Deserialize, Serialize};

use crate::models::Schedule;

/// A chunk whose size exceeds the per-machine capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityViolation {
    /// Owning job identifier.
    pub job_id: u32,
    /// Machine the chunk was placed on.
    pub machine: usize,
    /// Size of the offending chunk.
    pub chunk_size: u32,
    /// Work units above the capacity limit.
    pub exceeded_by: u32,
    /// Scheduled start time.
    pub start: u32,
    /// Scheduled end time.
    pub end: u32,
}

/// Derived, read-only metrics for one schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Completion time of the last-finishing chunk.
    pub makespan: u32,
    /// Sum of all chunk sizes.
    pub total_work: u32,
    /// Machine count × makespan.
    pub total_machine_time: u32,
    /// Machine time not spent working.
    pub total_idle_time: u32,
    /// Total work ÷ total machine time (0.0..=1.0).
    pub efficiency: f64,
    /// Per-machine work ÷ capacity × 100.
    pub machine_loads: Vec<f64>,
    /// Chunks whose size exceeds the capacity.
    pub violations: Vec<CapacityViolation>,
}

/// Evaluates a complete schedule.
pub fn evaluate(schedule: &Schedule, machine_count: usize, capacity: u32) -> EvaluationReport {
    let mut makespan = 0u32;
    let mut machine_work = vec![0u32; machine_count];
    let mut violations = Vec::new();

    for a in &schedule.assignments {
        makespan = makespan.max(a.end);
        let size = a.size();
        if let Some(work) = machine_work.get_mut(a.machine) {
            *work += size;
        }
        if size > capacity {
            violations.push(CapacityViolation {
                job_id: a.job_id,
                machine: a.machine,
                chunk_size: size,
                exceeded_by: size - capacity,
                start: a.start,
                end: a.end,
            });
        }
    }

    let total_work: u32 = machine_work.iter().sum();
    let total_machine_time = makespan * machine_count as u32;
    let efficiency = if total_machine_time > 0 {
        f64::from(total_work) / f64::from(total_machine_time)
    } else {
        0.0
    };
    let machine_loads = machine_work
        .iter()
        .map(|&work| {
            if capacity > 0 {
                f64::from(work) / f64::from(capacity) * 100.0
            } else {
                0.0
            }
        })
        .collect();

    EvaluationReport {
        makespan,
        total_work,
        total_machine_time,
        total_idle_time: total_machine_time.saturating_sub(total_work),
        efficiency,
        machine_loads,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Assignment;

    fn two_machine_schedule() -> Schedule {
        let mut s = Schedule::new();
        s.push(Assignment::new(1, 1, 0, 0, 5));
        s.push(Assignment::new(2, 1, 1, 0, 3));
        s
    }

    #[test]
    fn test_basic_metrics() {
        let report = evaluate(&two_machine_schedule(), 2, 40);
        assert_eq!(report.makespan, 5);
        assert_eq!(report.total_work, 8);
        assert_eq!(report.total_machine_time, 10);
        assert_eq!(report.total_idle_time, 2);
        assert!((report.efficiency - 0.8).abs() < 1e-10);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_machine_loads() {
        let report = evaluate(&two_machine_schedule(), 2, 40);
        assert!((report.machine_loads[0] - 12.5).abs() < 1e-10); // 5/40
        assert!((report.machine_loads[1] - 7.5).abs() < 1e-10); // 3/40
    }

    #[test]
    fn test_capacity_violation_detection() {
        // Hand-built oversized assignment; the chunker never produces one
        // because validation rejects jobs longer than the capacity.
        let mut s = Schedule::new();
        s.push(Assignment::new(1, 1, 0, 0, 45));
        let report = evaluate(&s, 1, 40);

        assert_eq!(report.violations.len(), 1);
        let v = &report.violations[0];
        assert_eq!(v.job_id, 1);
        assert_eq!(v.machine, 0);
        assert_eq!(v.chunk_size, 45);
        assert_eq!(v.exceeded_by, 5);
        assert_eq!((v.start, v.end), (0, 45));
    }

    #[test]
    fn test_chunk_at_capacity_is_not_a_violation() {
        let mut s = Schedule::new();
        s.push(Assignment::new(1, 1, 0, 0, 40));
        let report = evaluate(&s, 1, 40);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_empty_schedule() {
        let report = evaluate(&Schedule::new(), 3, 40);
        assert_eq!(report.makespan, 0);
        assert_eq!(report.total_work, 0);
        assert!((report.efficiency - 0.0).abs() < 1e-10);
        assert_eq!(report.machine_loads, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_report_roundtrip() {
        let report = evaluate(&two_machine_schedule(), 2, 40);
        let json = serde_json::to_string(&report).unwrap();
        let back: EvaluationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.makespan, report.makespan);
        assert_eq!(back.machine_loads, report.machine_loads);
    }
}
