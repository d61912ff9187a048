pub mod bid;
pub mod entities;
pub mod metrics;
pub mod report;

pub use bid::*;
pub use entities::*;
pub use metrics::*;
pub use report::*;
