use serde::{Deserialize, Serialize};

use crate::domain::problem::NodeId;

/// Quantities below this are treated as "no shipment on this route" when an
/// allocation is presented. Purely a display concern, the solver itself works
/// at full float precision.
pub const DISPLAY_EPSILON: f64 = 0.01;

/// A quantity assigned to one directed route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub from: NodeId,
    pub to: NodeId,
    pub quantity: f64,
}

impl Flow {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>, quantity: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            quantity,
        }
    }
}

/// The optimizer's output: the chosen quantity on every valid route plus the
/// resulting costs. Immutable once produced; everything below is read-only
/// reporting over it.
///
/// `total_cost` is always `raw_cost + finished_cost`, and each subtotal is
/// the sum of quantity x per-unit cost over its routes (see
/// [`DistributionProblem::price`](crate::domain::DistributionProblem::price),
/// the only constructor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Raw shipments, supply node -> processing node, sorted by route.
    pub raw: Vec<Flow>,
    /// Finished shipments, processing node -> demand node, sorted by route.
    pub finished: Vec<Flow>,
    pub raw_cost: f64,
    pub finished_cost: f64,
    pub total_cost: f64,
}

impl Allocation {
    /// Total raw quantity leaving a supply node.
    pub fn shipped_from(&self, supply: &str) -> f64 {
        sum_where(&self.raw, |f| f.from == supply)
    }

    /// Total raw quantity arriving at a processing node.
    pub fn received_by(&self, processing: &str) -> f64 {
        sum_where(&self.raw, |f| f.to == processing)
    }

    /// Total finished quantity leaving a processing node.
    pub fn produced_by(&self, processing: &str) -> f64 {
        sum_where(&self.finished, |f| f.from == processing)
    }

    /// Total finished quantity arriving at a demand node.
    pub fn delivered_to(&self, demand: &str) -> f64 {
        sum_where(&self.finished, |f| f.to == demand)
    }

    /// Quantity on one raw route, zero when the route carries nothing.
    pub fn raw_quantity(&self, from: &str, to: &str) -> f64 {
        sum_where(&self.raw, |f| f.from == from && f.to == to)
    }

    /// Quantity on one finished route, zero when the route carries nothing.
    pub fn finished_quantity(&self, from: &str, to: &str) -> f64 {
        sum_where(&self.finished, |f| f.from == from && f.to == to)
    }

    /// Raw shipments worth displaying.
    pub fn active_raw(&self, epsilon: f64) -> impl Iterator<Item = &Flow> {
        self.raw.iter().filter(move |f| f.quantity > epsilon)
    }

    /// Finished shipments worth displaying.
    pub fn active_finished(&self, epsilon: f64) -> impl Iterator<Item = &Flow> {
        self.finished.iter().filter(move |f| f.quantity > epsilon)
    }
}

fn sum_where(flows: &[Flow], pred: impl Fn(&Flow) -> bool) -> f64 {
    flows.iter().filter(|f| pred(f)).map(|f| f.quantity).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Allocation {
        Allocation {
            raw: vec![
                Flow::new("A", "P1", 40.0),
                Flow::new("A", "P2", 0.0078125),
                Flow::new("B", "P2", 25.0),
            ],
            finished: vec![
                Flow::new("P1", "D1", 20.0),
                Flow::new("P2", "D1", 5.0),
                Flow::new("P2", "D2", 7.5),
            ],
            raw_cost: 100.0,
            finished_cost: 50.0,
            total_cost: 150.0,
        }
    }

    #[test]
    fn node_summaries_aggregate_routes() {
        let allocation = sample();
        assert_eq!(allocation.shipped_from("A"), 40.0078125);
        assert_eq!(allocation.received_by("P2"), 25.0078125);
        assert_eq!(allocation.produced_by("P2"), 12.5);
        assert_eq!(allocation.delivered_to("D1"), 25.0);
        assert_eq!(allocation.raw_quantity("B", "P2"), 25.0);
        assert_eq!(allocation.finished_quantity("P1", "D2"), 0.0);
    }

    #[test]
    fn display_epsilon_hides_trace_quantities() {
        let allocation = sample();
        let visible: Vec<_> = allocation.active_raw(DISPLAY_EPSILON).collect();
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|f| f.quantity > DISPLAY_EPSILON));
    }
}
