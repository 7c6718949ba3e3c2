use thiserror::Error;

/// Failure modes of one optimization run. Solving is deterministic, so none
/// of these are retryable: the caller either fixes the input or gives up.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    /// No allocation satisfies every capacity, balance and demand constraint.
    #[error("no allocation satisfies all constraints")]
    InfeasibleModel,

    /// The objective can decrease without limit. Cannot happen for a
    /// well-formed instance (every route is capacity- or demand-bounded),
    /// but malformed input must be detected rather than produce garbage.
    #[error("objective is unbounded, input is malformed")]
    UnboundedModel,

    /// Negative capacity, requirement or cost, non-positive yield, or a
    /// route referencing a node that does not exist.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The LP backend failed for a reason that is neither infeasibility nor
    /// unboundedness.
    #[error("solver failure: {0}")]
    SolverFailure(String),
}
