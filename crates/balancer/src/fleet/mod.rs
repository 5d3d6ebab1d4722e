//! The fleet context: every node, the load-ordered registry, bounds,
//! counters and the task book, owned by one value and passed by reference.
//!
//! Split into focused submodules:
//! - `core`: construction, submission, ticking, thresholds and snapshots
//! - `migration`: overload relief, underload consolidation, task moves
//! - `power`: restoring a powered-on reserve

mod core;
mod migration;
mod power;

use std::sync::{Arc, Mutex};

pub use self::core::{EstimateDrift, Fleet, FleetSnapshot};
pub use self::migration::{Consolidation, Migration, RebalanceOutcome};

/// Thread-safe handle to a fleet. One lock covers the registry and every
/// queue, so a migration or reposition is observed as a single step.
pub type SharedFleet = Arc<Mutex<Fleet>>;

/// Wrap a fleet for use from several threads.
pub fn new_shared_fleet(fleet: Fleet) -> SharedFleet {
    Arc::new(Mutex::new(fleet))
}
