//! Problem definition for the two-stage distribution network.
//!
//! Raw material flows from supply nodes into processing nodes, is converted
//! at a fixed yield, and the finished product flows on to demand nodes. Only
//! the routes listed in the cost tables exist; everything else is forbidden.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::allocation::{Allocation, Flow};
use crate::optimizer::SolveError;

pub type NodeId = String;

/// A directed route between two nodes, keyed as (origin, destination).
pub type Route = (NodeId, NodeId);

/// Full description of one optimization instance. Ordered maps keep
/// iteration, logging and solver variable order deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionProblem {
    /// Supply node id -> maximum raw output capacity.
    pub supply: BTreeMap<NodeId, f64>,
    /// Processing node id -> maximum raw throughput capacity.
    pub processing: BTreeMap<NodeId, f64>,
    /// Demand node id -> required minimum delivered finished quantity.
    pub demand: BTreeMap<NodeId, f64>,
    /// (supply, processing) -> per-unit transport cost. Defines the valid raw arcs.
    pub raw_costs: BTreeMap<Route, f64>,
    /// (processing, demand) -> per-unit transport cost. Defines the valid finished arcs.
    pub finished_costs: BTreeMap<Route, f64>,
    /// Finished output per unit of raw input, identical for every processing node.
    pub yield_rate: f64,
}

/// A constraint broken by a concrete allocation, found by
/// [`DistributionProblem::violations`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("negative quantity {quantity} on route {from} -> {to}")]
    NegativeQuantity { from: NodeId, to: NodeId, quantity: f64 },
    #[error("supply node {node} ships {shipped}, capacity is {capacity}")]
    SupplyCapacity { node: NodeId, shipped: f64, capacity: f64 },
    #[error("processing node {node} receives {received}, capacity is {capacity}")]
    ProcessingCapacity { node: NodeId, received: f64, capacity: f64 },
    #[error("processing node {node} ships {finished_out} finished but {raw_in} raw in yields {expected}")]
    MaterialBalance {
        node: NodeId,
        raw_in: f64,
        finished_out: f64,
        expected: f64,
    },
    #[error("demand node {node} receives {delivered}, requires {required}")]
    DemandShortfall { node: NodeId, delivered: f64, required: f64 },
}

impl DistributionProblem {
    /// Checks the static input constraints: finite non-negative capacities,
    /// requirements and costs, a positive yield, and routes whose endpoints
    /// actually exist.
    pub fn validate(&self) -> Result<(), SolveError> {
        if !self.yield_rate.is_finite() || self.yield_rate <= 0.0 {
            return Err(SolveError::InvalidInput(format!(
                "yield rate must be a positive number, got {}",
                self.yield_rate
            )));
        }

        for (kind, nodes) in [
            ("supply capacity", &self.supply),
            ("processing capacity", &self.processing),
            ("demand requirement", &self.demand),
        ] {
            for (node, value) in nodes {
                if !value.is_finite() || *value < 0.0 {
                    return Err(SolveError::InvalidInput(format!(
                        "{kind} for {node} must be finite and non-negative, got {value}"
                    )));
                }
            }
        }

        for ((from, to), cost) in &self.raw_costs {
            if !cost.is_finite() || *cost < 0.0 {
                return Err(SolveError::InvalidInput(format!(
                    "raw route {from} -> {to} has invalid cost {cost}"
                )));
            }
            if !self.supply.contains_key(from) {
                return Err(SolveError::InvalidInput(format!(
                    "raw route references unknown supply node {from}"
                )));
            }
            if !self.processing.contains_key(to) {
                return Err(SolveError::InvalidInput(format!(
                    "raw route references unknown processing node {to}"
                )));
            }
        }

        for ((from, to), cost) in &self.finished_costs {
            if !cost.is_finite() || *cost < 0.0 {
                return Err(SolveError::InvalidInput(format!(
                    "finished route {from} -> {to} has invalid cost {cost}"
                )));
            }
            if !self.processing.contains_key(from) {
                return Err(SolveError::InvalidInput(format!(
                    "finished route references unknown processing node {from}"
                )));
            }
            if !self.demand.contains_key(to) {
                return Err(SolveError::InvalidInput(format!(
                    "finished route references unknown demand node {to}"
                )));
            }
        }

        Ok(())
    }

    /// Prices a set of per-route quantities against this problem's cost
    /// tables and packages them as an [`Allocation`]. The total is the sum
    /// of quantity x cost over every route, so an allocation built here
    /// always satisfies the cost identity by construction.
    ///
    /// Quantities on routes that are not in the cost tables are rejected as
    /// `InvalidInput`; routes without a quantity are treated as zero.
    pub fn price(&self, raw: Vec<Flow>, finished: Vec<Flow>) -> Result<Allocation, SolveError> {
        let raw_cost = price_side(&raw, &self.raw_costs, "raw")?;
        let finished_cost = price_side(&finished, &self.finished_costs, "finished")?;

        let mut raw = raw;
        let mut finished = finished;
        raw.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        finished.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

        Ok(Allocation {
            raw,
            finished,
            raw_cost,
            finished_cost,
            total_cost: raw_cost + finished_cost,
        })
    }

    /// Checks an allocation against every constraint of this problem and
    /// returns the broken ones. An empty result means the allocation is
    /// feasible within `tolerance`.
    pub fn violations(&self, allocation: &Allocation, tolerance: f64) -> Vec<Violation> {
        let mut found = Vec::new();

        for flow in allocation.raw.iter().chain(allocation.finished.iter()) {
            if flow.quantity < -tolerance {
                found.push(Violation::NegativeQuantity {
                    from: flow.from.clone(),
                    to: flow.to.clone(),
                    quantity: flow.quantity,
                });
            }
        }

        for (node, capacity) in &self.supply {
            let shipped = allocation.shipped_from(node);
            if shipped > capacity + tolerance {
                found.push(Violation::SupplyCapacity {
                    node: node.clone(),
                    shipped,
                    capacity: *capacity,
                });
            }
        }

        for (node, capacity) in &self.processing {
            let received = allocation.received_by(node);
            if received > capacity + tolerance {
                found.push(Violation::ProcessingCapacity {
                    node: node.clone(),
                    received,
                    capacity: *capacity,
                });
            }
        }

        for node in self.processing.keys() {
            let raw_in = allocation.received_by(node);
            let finished_out = allocation.produced_by(node);
            let expected = self.yield_rate * raw_in;
            // Balance is an equality, so scale the tolerance with the flow size.
            let slack = tolerance * (1.0 + raw_in.abs() + finished_out.abs());
            if (finished_out - expected).abs() > slack {
                found.push(Violation::MaterialBalance {
                    node: node.clone(),
                    raw_in,
                    finished_out,
                    expected,
                });
            }
        }

        for (node, required) in &self.demand {
            let delivered = allocation.delivered_to(node);
            if delivered < required - tolerance {
                found.push(Violation::DemandShortfall {
                    node: node.clone(),
                    delivered,
                    required: *required,
                });
            }
        }

        found
    }

    /// Total finished quantity required across all demand nodes.
    pub fn total_demand(&self) -> f64 {
        self.demand.values().sum()
    }
}

fn price_side(
    flows: &[Flow],
    costs: &BTreeMap<Route, f64>,
    kind: &str,
) -> Result<f64, SolveError> {
    let mut total = 0.0;
    for flow in flows {
        let Some(cost) = costs.get(&(flow.from.clone(), flow.to.clone())) else {
            return Err(SolveError::InvalidInput(format!(
                "{kind} quantity on unknown route {} -> {}",
                flow.from, flow.to
            )));
        };
        total += cost * flow.quantity;
    }
    Ok(total)
}
