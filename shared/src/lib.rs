pub mod scenario;
pub mod stats;

pub use scenario::*;
pub use stats::*;
