//! Linear-program formulation of the distribution problem.
//!
//! One non-negative continuous variable per valid route, a linear cost
//! objective, and linear capacity / balance / demand constraints. The solve
//! itself is delegated to `good_lp` with the pure-Rust microlp backend; any
//! LP solver handed this formulation returns a globally optimal allocation
//! (the feasible region is a polytope, there are no local optima).

use std::collections::BTreeMap;

use good_lp::variable::ProblemVariables;
use good_lp::{
    constraint, default_solver, variable, Expression, ResolutionError, Solution, SolverModel,
    Variable,
};
use tracing::debug;

use crate::domain::{Allocation, DistributionProblem, Flow, NodeId, Route};
use crate::optimizer::SolveError;

/// Computes the minimum-cost allocation for `problem`.
///
/// Pure and synchronous: no side effects beyond tracing, no retries (the
/// solve is deterministic, retrying cannot change the outcome). Ties between
/// equally cheap allocations may be broken arbitrarily; the optimal cost
/// itself is unique.
pub fn solve(problem: &DistributionProblem) -> Result<Allocation, SolveError> {
    problem.validate()?;

    // A demand node that must receive something but has no inbound route can
    // never be satisfied. Report it without bothering the solver.
    for (node, required) in &problem.demand {
        if *required > 0.0 && !problem.finished_costs.keys().any(|(_, to)| to == node) {
            debug!(%node, required, "demand node has no inbound routes");
            return Err(SolveError::InfeasibleModel);
        }
    }

    let mut vars = ProblemVariables::new();
    let raw_vars: BTreeMap<&Route, Variable> = problem
        .raw_costs
        .keys()
        .map(|route| (route, vars.add(variable().min(0.0))))
        .collect();
    let finished_vars: BTreeMap<&Route, Variable> = problem
        .finished_costs
        .keys()
        .map(|route| (route, vars.add(variable().min(0.0))))
        .collect();

    let mut objective = Expression::default();
    for (route, cost) in &problem.raw_costs {
        objective += *cost * raw_vars[route];
    }
    for (route, cost) in &problem.finished_costs {
        objective += *cost * finished_vars[route];
    }

    // Per-node flow sums, assembled route by route.
    let mut supply_out: BTreeMap<&NodeId, Expression> = BTreeMap::new();
    let mut raw_in: BTreeMap<&NodeId, Expression> = BTreeMap::new();
    let mut finished_out: BTreeMap<&NodeId, Expression> = BTreeMap::new();
    let mut delivered: BTreeMap<&NodeId, Expression> = BTreeMap::new();

    for (route, var) in &raw_vars {
        let (from, to) = (&route.0, &route.1);
        *supply_out.entry(from).or_default() += *var;
        *raw_in.entry(to).or_default() += *var;
    }
    for (route, var) in &finished_vars {
        let (from, to) = (&route.0, &route.1);
        *finished_out.entry(from).or_default() += *var;
        *delivered.entry(to).or_default() += *var;
    }

    debug!(
        variables = raw_vars.len() + finished_vars.len(),
        supplies = problem.supply.len(),
        plants = problem.processing.len(),
        demands = problem.demand.len(),
        "building LP model"
    );

    let mut model = vars.minimise(objective).using(default_solver);

    for (node, capacity) in &problem.supply {
        if let Some(out) = supply_out.get(node) {
            model = model.with(constraint!(out.clone() <= *capacity));
        }
    }

    for (node, capacity) in &problem.processing {
        if let Some(inflow) = raw_in.get(node) {
            model = model.with(constraint!(inflow.clone() <= *capacity));
        }
    }

    // Material balance: finished out of a plant is exactly yield x raw in.
    let yield_rate = problem.yield_rate;
    for node in problem.processing.keys() {
        let inflow = raw_in.get(node).cloned().unwrap_or_default();
        let outflow = finished_out.get(node).cloned().unwrap_or_default();
        if raw_in.contains_key(node) || finished_out.contains_key(node) {
            model = model.with(constraint!(outflow == yield_rate * inflow));
        }
    }

    for (node, required) in &problem.demand {
        if let Some(received) = delivered.get(node) {
            model = model.with(constraint!(received.clone() >= *required));
        }
    }

    let solution = model.solve().map_err(|err| match err {
        ResolutionError::Infeasible => SolveError::InfeasibleModel,
        ResolutionError::Unbounded => SolveError::UnboundedModel,
        other => SolveError::SolverFailure(other.to_string()),
    })?;

    // Solvers may report values a hair below zero; clamp so the allocation
    // invariant holds exactly.
    let raw_flows = raw_vars
        .iter()
        .map(|(route, var)| {
            Flow::new(
                route.0.clone(),
                route.1.clone(),
                solution.value(*var).max(0.0),
            )
        })
        .collect();
    let finished_flows = finished_vars
        .iter()
        .map(|(route, var)| {
            Flow::new(
                route.0.clone(),
                route.1.clone(),
                solution.value(*var).max(0.0),
            )
        })
        .collect();

    let allocation = problem.price(raw_flows, finished_flows)?;
    debug!(
        total_cost = allocation.total_cost,
        raw_cost = allocation.raw_cost,
        finished_cost = allocation.finished_cost,
        "optimal allocation found"
    );
    Ok(allocation)
}
