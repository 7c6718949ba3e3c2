//! End-to-end scenarios on the reference distribution network: three
//! supply estates, two processing plants, four distribution centers,
//! yield 0.22, with the historical cost tables.

use std::collections::BTreeMap;

use distribution_optimizer::config::Config;
use distribution_optimizer::domain::{DistributionProblem, Violation};
use distribution_optimizer::optimizer::{solve, SolveError};
use float_eq::assert_float_eq;

fn reference_problem(p1_capacity: f64, p2_capacity: f64) -> DistributionProblem {
    let route = |from: &str, to: &str, cost: f64| ((from.to_string(), to.to_string()), cost);
    DistributionProblem {
        supply: [
            ("A".to_string(), 5000.0),
            ("B".to_string(), 4000.0),
            ("C".to_string(), 3500.0),
        ]
        .into(),
        processing: [
            ("P1".to_string(), p1_capacity),
            ("P2".to_string(), p2_capacity),
        ]
        .into(),
        demand: [
            ("D1".to_string(), 600.0),
            ("D2".to_string(), 800.0),
            ("D3".to_string(), 500.0),
            ("D4".to_string(), 650.0),
        ]
        .into(),
        raw_costs: BTreeMap::from([
            route("A", "P1", 50_000.0),
            route("A", "P2", 80_000.0),
            route("B", "P1", 70_000.0),
            route("B", "P2", 40_000.0),
            route("C", "P1", 60_000.0),
            route("C", "P2", 55_000.0),
        ]),
        finished_costs: BTreeMap::from([
            route("P1", "D1", 100_000.0),
            route("P1", "D2", 120_000.0),
            route("P1", "D3", 90_000.0),
            route("P1", "D4", 110_000.0),
            route("P2", "D1", 130_000.0),
            route("P2", "D2", 80_000.0),
            route("P2", "D3", 95_000.0),
            route("P2", "D4", 85_000.0),
        ]),
        yield_rate: 0.22,
    }
}

/// The historical plant capacities cannot carry the demand: 11000 raw units
/// of throughput yield at most 2420 finished units against 2550 required.
/// Aggregate-throughput shortfalls must surface as infeasibility.
#[test]
fn historical_capacities_are_infeasible() {
    let problem = reference_problem(6000.0, 5000.0);
    let throughput: f64 = problem.processing.values().sum();
    assert!(throughput * problem.yield_rate < problem.total_demand());
    assert_eq!(solve(&problem), Err(SolveError::InfeasibleModel));
}

/// With plant 2 widened to 7000 the instance is feasible and the optimum is
/// known in closed form: plant 1 serves D1 and D3 (1100 finished, 5000 raw,
/// all from A), plant 2 serves D2 and D4 (1450 finished, 6590.91 raw from B
/// and C), for a total of exactly 776,750,000.
#[test]
fn widened_instance_reaches_known_optimum() {
    let problem = reference_problem(6000.0, 7000.0);
    let allocation = solve(&problem).unwrap();

    assert_float_eq!(allocation.total_cost, 776_750_000.0, abs <= 1.0);
    assert_float_eq!(allocation.raw_cost, 552_500_000.0, abs <= 1.0);
    assert_float_eq!(allocation.finished_cost, 224_250_000.0, abs <= 1.0);

    assert_float_eq!(allocation.raw_quantity("A", "P1"), 5000.0, abs <= 1e-3);
    assert_float_eq!(allocation.raw_quantity("B", "P2"), 4000.0, abs <= 1e-3);
    assert_float_eq!(
        allocation.raw_quantity("C", "P2"),
        28_500.0 / 11.0,
        abs <= 1e-3
    );
    assert_float_eq!(allocation.raw_quantity("A", "P2"), 0.0, abs <= 1e-3);
    assert_float_eq!(allocation.raw_quantity("B", "P1"), 0.0, abs <= 1e-3);
    assert_float_eq!(allocation.raw_quantity("C", "P1"), 0.0, abs <= 1e-3);

    for (node, required) in &problem.demand {
        // Over-delivery only costs money, so demand is met with equality.
        assert_float_eq!(allocation.delivered_to(node), *required, abs <= 1e-6);
    }

    assert!(problem.violations(&allocation, 1e-6).is_empty());
}

/// The spreadsheet plan of record prices out to the published 910,275,252.49
/// total (its quantities were published rounded to whole units, hence the
/// relative tolerance), but under the historical capacities it overloads
/// plant 2 with 6591 raw units against a capacity of 5000.
#[test]
fn spreadsheet_plan_reprices_to_published_total_but_overloads_plant_2() {
    let problem = reference_problem(6000.0, 5000.0);
    let config: Config =
        toml::from_str(&std::fs::read_to_string("config/default.toml").unwrap()).unwrap();
    let baseline = config.baseline.unwrap();
    let (raw, finished) = baseline.flows();

    let priced = problem.price(raw, finished).unwrap();
    assert_float_eq!(priced.total_cost, 910_275_252.49, rmax <= 5e-5);
    assert_float_eq!(priced.raw_cost, 686_045_000.0, abs <= 1e-3);
    assert_float_eq!(priced.finished_cost, 224_250_000.0, abs <= 1e-3);

    let violations = problem.violations(&priced, 1.0);
    assert!(violations.iter().any(|v| matches!(
        v,
        Violation::ProcessingCapacity { node, .. } if node == "P2"
    )));
}

#[test]
fn raising_a_demand_never_lowers_the_cost() {
    let base = reference_problem(6000.0, 7000.0);
    let base_cost = solve(&base).unwrap().total_cost;

    for bump in [1.0, 50.0, 150.0] {
        let mut problem = base.clone();
        problem.demand.insert("D2".into(), 800.0 + bump);
        let cost = solve(&problem).unwrap().total_cost;
        assert!(
            cost >= base_cost - 1e-6,
            "raising D2 by {bump} lowered the cost from {base_cost} to {cost}"
        );
    }
}

#[test]
fn solving_twice_gives_the_same_optimal_cost() {
    let problem = reference_problem(6000.0, 7000.0);
    let first = solve(&problem).unwrap();
    let second = solve(&problem).unwrap();
    assert_eq!(first.total_cost, second.total_cost);
}

#[test]
fn zero_requirement_is_satisfied_without_disturbing_the_rest() {
    let mut problem = reference_problem(6000.0, 7000.0);
    let full_cost = solve(&problem).unwrap().total_cost;

    problem.demand.insert("D1".into(), 0.0);
    let allocation = solve(&problem).unwrap();

    assert!(problem.violations(&allocation, 1e-6).is_empty());
    assert!(allocation.total_cost < full_cost);
    for (node, required) in &problem.demand {
        assert!(allocation.delivered_to(node) >= required - 1e-6);
    }
}

/// The shipped default configuration parses into the widened reference
/// instance and solves to the same optimum.
#[test]
fn default_config_roundtrips_through_the_solver() {
    let config: Config =
        toml::from_str(&std::fs::read_to_string("config/default.toml").unwrap()).unwrap();
    let problem = config.problem.into_problem().unwrap();
    assert_eq!(problem, reference_problem(6000.0, 7000.0));

    let allocation = solve(&problem).unwrap();
    assert_float_eq!(allocation.total_cost, 776_750_000.0, abs <= 1.0);
}
