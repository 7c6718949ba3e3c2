use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use tracing::warn;

use crate::domain::{DistributionProblem, Flow, NodeId, DISPLAY_EPSILON};
use crate::optimizer::SolveError;

/// Runtime configuration: the problem instance itself plus presentation
/// settings and an optional baseline plan to compare the solution against.
/// Problem data is external configuration, never hardcoded, so the optimizer
/// is reusable across instances.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub problem: ProblemConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub baseline: Option<BaselineConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProblemConfig {
    pub yield_rate: f64,
    pub supply: BTreeMap<NodeId, f64>,
    pub processing: BTreeMap<NodeId, f64>,
    pub demand: BTreeMap<NodeId, f64>,
    pub raw_routes: Vec<RouteConfig>,
    pub finished_routes: Vec<RouteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub from: NodeId,
    pub to: NodeId,
    pub cost: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Quantities at or below this are not shown as routes.
    #[serde(default = "default_display_epsilon")]
    pub display_epsilon: f64,
    /// When set, the structured result is also written here as JSON.
    pub json_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            display_epsilon: default_display_epsilon(),
            json_path: None,
        }
    }
}

fn default_display_epsilon() -> f64 {
    DISPLAY_EPSILON
}

/// A previously computed allocation for the same instance, e.g. a plan
/// produced by another solver. Priced against the problem's own cost tables
/// before comparison, so only quantities are recorded here.
#[derive(Debug, Clone, Deserialize)]
pub struct BaselineConfig {
    pub label: String,
    #[serde(default)]
    pub raw: Vec<FlowConfig>,
    #[serde(default)]
    pub finished: Vec<FlowConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlowConfig {
    pub from: NodeId,
    pub to: NodeId,
    pub quantity: f64,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("DISTOPT__").split("__"));
        Ok(figment.extract()?)
    }
}

impl ProblemConfig {
    /// Builds the domain problem, rejecting duplicate route entries. The
    /// remaining input constraints are checked by
    /// [`DistributionProblem::validate`] at solve time.
    pub fn into_problem(self) -> Result<DistributionProblem, SolveError> {
        if self.yield_rate > 1.0 {
            warn!(
                yield_rate = self.yield_rate,
                "yield above 1.0: each raw unit produces more than one finished unit"
            );
        }

        let mut raw_costs = BTreeMap::new();
        for route in self.raw_routes {
            if raw_costs
                .insert((route.from.clone(), route.to.clone()), route.cost)
                .is_some()
            {
                return Err(SolveError::InvalidInput(format!(
                    "duplicate raw route {} -> {}",
                    route.from, route.to
                )));
            }
        }

        let mut finished_costs = BTreeMap::new();
        for route in self.finished_routes {
            if finished_costs
                .insert((route.from.clone(), route.to.clone()), route.cost)
                .is_some()
            {
                return Err(SolveError::InvalidInput(format!(
                    "duplicate finished route {} -> {}",
                    route.from, route.to
                )));
            }
        }

        Ok(DistributionProblem {
            supply: self.supply,
            processing: self.processing,
            demand: self.demand,
            raw_costs,
            finished_costs,
            yield_rate: self.yield_rate,
        })
    }
}

impl BaselineConfig {
    pub fn flows(&self) -> (Vec<Flow>, Vec<Flow>) {
        let convert = |flows: &[FlowConfig]| {
            flows
                .iter()
                .map(|f| Flow::new(f.from.clone(), f.to.clone(), f.quantity))
                .collect()
        };
        (convert(&self.raw), convert(&self.finished))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [problem]
        yield_rate = 0.5

        [problem.supply]
        A = 100.0

        [problem.processing]
        P = 80.0

        [problem.demand]
        D = 10.0

        [[problem.raw_routes]]
        from = "A"
        to = "P"
        cost = 2.0

        [[problem.finished_routes]]
        from = "P"
        to = "D"
        cost = 3.0

        [baseline]
        label = "spreadsheet"

        [[baseline.raw]]
        from = "A"
        to = "P"
        quantity = 20.0
    "#;

    #[test]
    fn sample_config_parses_and_converts() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.output.display_epsilon, DISPLAY_EPSILON);

        let baseline = config.baseline.clone().unwrap();
        assert_eq!(baseline.label, "spreadsheet");
        let (raw, finished) = baseline.flows();
        assert_eq!(raw.len(), 1);
        assert!(finished.is_empty());

        let problem = config.problem.into_problem().unwrap();
        assert_eq!(problem.supply["A"], 100.0);
        assert_eq!(problem.raw_costs[&("A".to_string(), "P".to_string())], 2.0);
        assert!(problem.validate().is_ok());
    }

    #[test]
    fn duplicate_routes_are_rejected() {
        let mut config: Config = toml::from_str(SAMPLE).unwrap();
        config.problem.raw_routes.push(RouteConfig {
            from: "A".into(),
            to: "P".into(),
            cost: 9.0,
        });
        assert!(matches!(
            config.problem.into_problem(),
            Err(SolveError::InvalidInput(_))
        ));
    }
}
