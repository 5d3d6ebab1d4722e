//! Adaptive load balancing for a fixed-size fleet of simulated nodes.
//!
//! Each node holds a bounded circular queue of tasks. The [`Fleet`] routes
//! arriving tasks to the lowest-load powered node, classifies every node's
//! load against adaptive bounds, migrates work off overloaded nodes,
//! consolidates idle nodes into powered-off reserves, and powers a reserve
//! back on when none is left.

pub mod classifier;
pub mod error;
pub mod fleet;
pub mod metrics;
pub mod node;
pub mod queue;
pub mod registry;
pub mod task_book;
pub mod thresholds;
pub mod tick;
pub mod types;

pub use classifier::classify;
pub use error::BalancerError;
pub use fleet::{
    new_shared_fleet, Consolidation, EstimateDrift, Fleet, FleetSnapshot, Migration,
    RebalanceOutcome, SharedFleet,
};
pub use metrics::Counters;
pub use node::{Node, NodeSnapshot};
pub use queue::{QueueError, TaskQueue};
pub use registry::{NodeIdx, NodeRegistry};
pub use task_book::TaskBook;
pub use thresholds::{HistoryBuffer, ThresholdAdapter};
pub use tick::TickScheduler;
pub use types::{Completion, LoadState, SubmitOutcome, Task, Thresholds};
