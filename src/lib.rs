pub mod compare;
pub mod config;
pub mod domain;
pub mod optimizer;
pub mod telemetry;
