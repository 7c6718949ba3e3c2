//! Diffing of two independently computed allocations for the same problem.
//!
//! The point of comparing is to confirm that two solvers (or a solver and a
//! recorded plan) agree on the same instance, so the diff works on the
//! structured [`Allocation`] values themselves rather than on any rendered
//! output. Ties between optimal allocations are real, so two runs can match
//! on cost while differing on individual routes; both signals are reported.

use itertools::Itertools;
use serde::Serialize;

use crate::domain::{Allocation, Flow, NodeId};

/// One route whose quantity differs between the two allocations by more than
/// the tolerance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowDelta {
    pub from: NodeId,
    pub to: NodeId,
    pub left: f64,
    pub right: f64,
}

impl FlowDelta {
    pub fn delta(&self) -> f64 {
        self.right - self.left
    }
}

/// Result of [`diff`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationDiff {
    /// Quantity tolerance the diff was taken at.
    pub tolerance: f64,
    pub raw: Vec<FlowDelta>,
    pub finished: Vec<FlowDelta>,
    pub raw_cost_delta: f64,
    pub finished_cost_delta: f64,
    pub total_cost_delta: f64,
}

impl AllocationDiff {
    /// True when every route carries the same quantity within the tolerance.
    /// Cost deltas follow from the quantities, so they are reported but not
    /// judged separately.
    pub fn is_match(&self) -> bool {
        self.raw.is_empty() && self.finished.is_empty()
    }
}

/// Compares two allocations route by route. Routes present on one side only
/// are treated as zero on the other.
pub fn diff(left: &Allocation, right: &Allocation, tolerance: f64) -> AllocationDiff {
    AllocationDiff {
        tolerance,
        raw: diff_flows(&left.raw, &right.raw, tolerance),
        finished: diff_flows(&left.finished, &right.finished, tolerance),
        raw_cost_delta: right.raw_cost - left.raw_cost,
        finished_cost_delta: right.finished_cost - left.finished_cost,
        total_cost_delta: right.total_cost - left.total_cost,
    }
}

fn diff_flows(left: &[Flow], right: &[Flow], tolerance: f64) -> Vec<FlowDelta> {
    let quantity = |flows: &[Flow], from: &str, to: &str| -> f64 {
        flows
            .iter()
            .filter(|f| f.from == from && f.to == to)
            .map(|f| f.quantity)
            .sum()
    };

    left.iter()
        .chain(right.iter())
        .map(|f| (f.from.clone(), f.to.clone()))
        .unique()
        .sorted()
        .filter_map(|(from, to)| {
            let l = quantity(left, &from, &to);
            let r = quantity(right, &from, &to);
            ((l - r).abs() > tolerance).then(|| FlowDelta {
                from,
                to,
                left: l,
                right: r,
            })
        })
        .collect()
}
