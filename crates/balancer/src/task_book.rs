use std::collections::HashMap;

use elastic_core::TaskId;

/// Sizes of the tasks currently queued anywhere in the fleet.
///
/// An entry exists exactly while its task sits in some node's queue: it is
/// recorded on acceptance, survives migration, and is forgotten on
/// completion. Lost tasks are never recorded, so the book never holds more
/// than `node_count × queue_capacity` entries.
#[derive(Debug, Clone, Default)]
pub struct TaskBook {
    sizes: HashMap<TaskId, u8>,
}

impl TaskBook {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { sizes: HashMap::with_capacity(capacity) }
    }

    /// Record a queued task. The fleet rejects ids that are already queued
    /// before calling this.
    pub fn record(&mut self, task: TaskId, size: u8) {
        self.sizes.insert(task, size);
    }

    pub fn size_of(&self, task: TaskId) -> Option<u8> {
        self.sizes.get(&task).copied()
    }

    pub fn forget(&mut self, task: TaskId) -> Option<u8> {
        self.sizes.remove(&task)
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Size lookup for a task known to be queued. A missing entry means the
    /// book and the queues disagree, which is a bookkeeping bug.
    pub(crate) fn queued_size(&self, task: TaskId) -> u8 {
        let size = self.size_of(task);
        debug_assert!(size.is_some(), "task {task} is queued but has no recorded size");
        size.unwrap_or(0)
    }
}
