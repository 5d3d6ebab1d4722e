pub mod config;
pub mod error;
pub mod ids;

pub use config::BalancerConfig;
pub use error::*;
pub use ids::*;
