use anyhow::{Context, Result};
use distribution_optimizer::{
    compare,
    config::Config,
    domain::{Allocation, DistributionProblem},
    optimizer, telemetry,
};
use tracing::{info, warn};

fn main() -> Result<()> {
    telemetry::init_tracing();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());
    let cfg = Config::load(&path).with_context(|| format!("loading configuration from {path}"))?;
    let epsilon = cfg.output.display_epsilon;

    let problem = cfg
        .problem
        .clone()
        .into_problem()
        .context("invalid problem definition")?;
    info!(
        supplies = problem.supply.len(),
        plants = problem.processing.len(),
        demands = problem.demand.len(),
        yield_rate = problem.yield_rate,
        total_demand = problem.total_demand(),
        "problem loaded"
    );

    let allocation = optimizer::solve(&problem).context("optimization failed")?;
    log_allocation(&problem, &allocation, epsilon);

    if let Some(baseline) = &cfg.baseline {
        let (raw, finished) = baseline.flows();
        let priced = problem
            .price(raw, finished)
            .with_context(|| format!("baseline '{}' references unknown routes", baseline.label))?;

        for violation in problem.violations(&priced, 1e-6) {
            warn!(baseline = %baseline.label, %violation, "baseline plan breaks a constraint");
        }

        let diff = compare::diff(&allocation, &priced, epsilon);
        if diff.is_match() {
            info!(
                baseline = %baseline.label,
                total_cost = priced.total_cost,
                "baseline matches the optimal allocation"
            );
        } else {
            warn!(
                baseline = %baseline.label,
                baseline_cost = priced.total_cost,
                optimal_cost = allocation.total_cost,
                cost_delta = diff.total_cost_delta,
                "baseline differs from the optimal allocation"
            );
            for delta in diff.raw.iter().chain(diff.finished.iter()) {
                info!(
                    from = %delta.from,
                    to = %delta.to,
                    optimal = delta.left,
                    baseline = delta.right,
                    "route quantity differs"
                );
            }
        }
    }

    if let Some(json_path) = &cfg.output.json_path {
        let json = serde_json::to_string_pretty(&allocation)?;
        std::fs::write(json_path, json)
            .with_context(|| format!("writing result to {}", json_path.display()))?;
        info!(path = %json_path.display(), "result written");
    }

    Ok(())
}

fn log_allocation(problem: &DistributionProblem, allocation: &Allocation, epsilon: f64) {
    info!(
        total_cost = allocation.total_cost,
        raw_cost = allocation.raw_cost,
        finished_cost = allocation.finished_cost,
        "optimal allocation found"
    );

    for flow in allocation.active_raw(epsilon) {
        let cost = problem.raw_costs[&(flow.from.clone(), flow.to.clone())];
        info!(
            from = %flow.from,
            to = %flow.to,
            quantity = flow.quantity,
            unit_cost = cost,
            route_cost = cost * flow.quantity,
            "raw shipment"
        );
    }

    for (plant, capacity) in &problem.processing {
        let received = allocation.received_by(plant);
        if received <= epsilon {
            continue;
        }
        info!(
            plant = %plant,
            raw_in = received,
            finished_out = allocation.produced_by(plant),
            utilisation_pct = 100.0 * received / capacity,
            "plant throughput"
        );
    }

    for flow in allocation.active_finished(epsilon) {
        let cost = problem.finished_costs[&(flow.from.clone(), flow.to.clone())];
        info!(
            from = %flow.from,
            to = %flow.to,
            quantity = flow.quantity,
            unit_cost = cost,
            route_cost = cost * flow.quantity,
            "finished shipment"
        );
    }

    for (node, required) in &problem.demand {
        let delivered = allocation.delivered_to(node);
        info!(
            demand = %node,
            required = *required,
            delivered,
            fulfilment_pct = if *required > 0.0 {
                100.0 * delivered / required
            } else {
                100.0
            },
            "demand fulfilment"
        );
    }
}
