use serde::Serialize;

use elastic_core::{NodeId, TaskId};

use crate::classifier::classify;
use crate::queue::{QueueError, TaskQueue};
use crate::types::{task_cost, LoadState, Thresholds};

/// A simulated worker with a bounded queue.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    computing_power: f64,
    state: LoadState,
    queue: TaskQueue,
    /// Sum of the costs of all queued tasks. Maintained incrementally.
    completion_estimate: f64,
    /// Service time accumulated toward the head task.
    timer: u64,
}

impl Node {
    pub fn new(id: NodeId, computing_power: f64, queue_capacity: usize) -> Self {
        Self {
            id,
            computing_power,
            state: LoadState::Underloaded,
            queue: TaskQueue::new(queue_capacity),
            completion_estimate: 0.0,
            timer: 0,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn computing_power(&self) -> f64 {
        self.computing_power
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_off(&self) -> bool {
        self.state == LoadState::Off
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn occupancy(&self) -> usize {
        self.queue.len()
    }

    pub fn completion_estimate(&self) -> f64 {
        self.completion_estimate
    }

    pub fn timer(&self) -> u64 {
        self.timer
    }

    /// Cost this node charges for a task of `size`.
    pub fn cost_of(&self, size: u8) -> f64 {
        task_cost(size, self.computing_power)
    }

    /// Queue a task and charge its cost to the estimate.
    pub fn push_task(&mut self, task: TaskId, size: u8) -> Result<(), QueueError> {
        self.queue.enqueue(task)?;
        self.completion_estimate += self.cost_of(size);
        Ok(())
    }

    /// Remove the newest task. `size_of` resolves the task's size so its
    /// cost can be refunded.
    pub fn pop_newest<F>(&mut self, size_of: F) -> Result<(TaskId, u8), QueueError>
    where
        F: FnOnce(TaskId) -> u8,
    {
        let task = self.queue.dequeue_tail()?;
        let size = size_of(task);
        self.completion_estimate -= self.cost_of(size);
        Ok((task, size))
    }

    /// Remove the head task and reset the service timer.
    pub fn pop_oldest<F>(&mut self, size_of: F) -> Result<(TaskId, u8), QueueError>
    where
        F: FnOnce(TaskId) -> u8,
    {
        let task = self.queue.dequeue_front()?;
        let size = size_of(task);
        self.completion_estimate -= self.cost_of(size);
        self.timer = 0;
        Ok((task, size))
    }

    /// Add service time; returns the new timer value.
    pub(crate) fn add_service_time(&mut self, tick: u64) -> u64 {
        self.timer = self.timer.saturating_add(tick);
        self.timer
    }

    /// Re-run the classifier against the current occupancy.
    pub fn reclassify(&mut self, thresholds: &Thresholds) -> LoadState {
        self.state = classify(self.queue.len(), self.queue.capacity(), thresholds, self.state);
        self.state
    }

    /// Consolidation is the only way into Off.
    pub(crate) fn power_off(&mut self) {
        debug_assert!(self.queue.is_empty(), "powering off node {} with queued tasks", self.id);
        self.state = LoadState::Off;
        self.timer = 0;
    }

    /// The power manager is the only way out of Off.
    pub(crate) fn power_on(&mut self) {
        debug_assert_eq!(self.state, LoadState::Off);
        self.state = LoadState::Underloaded;
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            state: self.state,
            queue_depth: self.queue.len(),
            completion_estimate: self.completion_estimate,
        }
    }
}

/// Read-only view of a node for observability exports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub state: LoadState,
    pub queue_depth: usize,
    pub completion_estimate: f64,
}
