pub mod error;
pub mod lp;

pub use error::*;
pub use lp::*;
