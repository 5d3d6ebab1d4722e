use serde::{Deserialize, Serialize};

use elastic_core::{BalancerConfig, NodeId, TaskId};

/// Load state of a node. Ordered from idle to saturated, so
/// `state >= LoadState::Balanced` selects every node that is not a reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoadState {
    /// Powered off by consolidation. Only the power manager brings it back.
    Off,
    /// Below the underload bound; candidate reserve and migration target.
    Underloaded,
    Balanced,
    /// Above the overload bound but not at capacity.
    Overloaded,
    /// Queue at capacity; further submissions are lost.
    Full,
}

/// A synthetic unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub size: u8,
}

impl Task {
    pub fn new(id: TaskId, size: u8) -> Self {
        Self { id, size }
    }

    /// Service time needed to complete this task, independent of node power.
    pub fn service_threshold(&self) -> u64 {
        service_threshold(self.size)
    }

    /// Contribution to a node's completion-time estimate.
    pub fn cost_on(&self, computing_power: f64) -> f64 {
        task_cost(self.size, computing_power)
    }
}

/// `size³`, the service time a task needs at the head of a queue.
pub fn service_threshold(size: u8) -> u64 {
    (size as u64).pow(3)
}

/// `size³ × (2 − computing_power)`.
pub fn task_cost(size: u8, computing_power: f64) -> f64 {
    service_threshold(size) as f64 * (2.0 - computing_power)
}

/// Overload/underload bounds, as fractions of queue capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub overload_bound: f64,
    pub underload_bound: f64,
}

impl Thresholds {
    pub fn new(overload_bound: f64, underload_bound: f64) -> Self {
        Self { overload_bound, underload_bound }
    }

    pub fn from_config(config: &BalancerConfig) -> Self {
        Self::new(config.overload_bound, config.underload_bound)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(0.95, 0.3)
    }
}

/// A task retired by the tick scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub node: NodeId,
    pub task: TaskId,
}

/// Result of routing a task into the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmitOutcome {
    Accepted { node: NodeId },
    /// The chosen node's queue was full; the task was discarded.
    Lost,
}

impl SubmitOutcome {
    pub fn is_lost(&self) -> bool {
        matches!(self, SubmitOutcome::Lost)
    }
}
