pub mod allocation;
pub mod problem;

pub use allocation::*;
pub use problem::*;
