//! Fixed-capacity circular task queue owned by each node.
//!
//! `tail` points at the most recently enqueued slot and `head` at the oldest.
//! An empty queue keeps `head == tail`, so a non-empty queue always holds
//! `(tail - head) mod capacity + 1` tasks.

use elastic_core::TaskId;

/// Errors from queue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("queue is full")]
    Full,
    #[error("queue is empty")]
    Empty,
}

#[derive(Debug, Clone)]
pub struct TaskQueue {
    slots: Box<[TaskId]>,
    head: usize,
    tail: usize,
    len: usize,
}

impl TaskQueue {
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "queue capacity must be at least 1");
        Self {
            slots: vec![0; capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// The task that has been queued longest.
    pub fn front(&self) -> Option<TaskId> {
        (!self.is_empty()).then(|| self.slots[self.head])
    }

    /// The most recently enqueued task.
    pub fn back(&self) -> Option<TaskId> {
        (!self.is_empty()).then(|| self.slots[self.tail])
    }

    pub fn enqueue(&mut self, task: TaskId) -> Result<(), QueueError> {
        if self.is_full() {
            return Err(QueueError::Full);
        }
        if !self.is_empty() {
            self.tail = self.wrap_forward(self.tail);
        }
        self.slots[self.tail] = task;
        self.len += 1;
        self.debug_check();
        Ok(())
    }

    pub fn dequeue_front(&mut self) -> Result<TaskId, QueueError> {
        if self.is_empty() {
            return Err(QueueError::Empty);
        }
        let task = self.slots[self.head];
        self.len -= 1;
        if !self.is_empty() {
            self.head = self.wrap_forward(self.head);
        }
        self.debug_check();
        Ok(task)
    }

    /// Remove the most recently enqueued task. Migration uses this so the
    /// in-progress head task stays where its service timer is.
    pub fn dequeue_tail(&mut self) -> Result<TaskId, QueueError> {
        if self.is_empty() {
            return Err(QueueError::Empty);
        }
        let task = self.slots[self.tail];
        self.len -= 1;
        if !self.is_empty() {
            self.tail = self.wrap_backward(self.tail);
        }
        self.debug_check();
        Ok(task)
    }

    /// Tasks from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = TaskId> + '_ {
        let cap = self.capacity();
        (0..self.len).map(move |offset| self.slots[(self.head + offset) % cap])
    }

    /// Whether the occupancy count agrees with the head/tail indices.
    pub fn is_consistent(&self) -> bool {
        let cap = self.capacity();
        if self.head >= cap || self.tail >= cap || self.len > cap {
            return false;
        }
        if self.len == 0 {
            return self.head == self.tail;
        }
        (self.tail + cap - self.head) % cap + 1 == self.len
    }

    fn wrap_forward(&self, idx: usize) -> usize {
        if idx + 1 == self.capacity() { 0 } else { idx + 1 }
    }

    fn wrap_backward(&self, idx: usize) -> usize {
        if idx == 0 { self.capacity() - 1 } else { idx - 1 }
    }

    fn debug_check(&self) {
        debug_assert!(
            self.is_consistent(),
            "queue bookkeeping mismatch: len={}, head={}, tail={}, capacity={}",
            self.len,
            self.head,
            self.tail,
            self.capacity()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut q = TaskQueue::new(4);
        for id in 1..=3 {
            q.enqueue(id).unwrap();
        }
        assert_eq!(q.dequeue_front(), Ok(1));
        assert_eq!(q.dequeue_front(), Ok(2));
        assert_eq!(q.dequeue_front(), Ok(3));
        assert_eq!(q.dequeue_front(), Err(QueueError::Empty));
    }

    #[test]
    fn full_queue_rejects_and_keeps_state() {
        let mut q = TaskQueue::new(2);
        q.enqueue(1).unwrap();
        q.enqueue(2).unwrap();
        assert_eq!(q.enqueue(3), Err(QueueError::Full));
        assert_eq!(q.len(), 2);
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn tail_removal_takes_newest() {
        let mut q = TaskQueue::new(3);
        q.enqueue(10).unwrap();
        q.enqueue(11).unwrap();
        q.enqueue(12).unwrap();
        assert_eq!(q.dequeue_tail(), Ok(12));
        assert_eq!(q.front(), Some(10));
        assert_eq!(q.back(), Some(11));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn wraps_around_capacity() {
        let mut q = TaskQueue::new(3);
        for id in 0..3 {
            q.enqueue(id).unwrap();
        }
        q.dequeue_front().unwrap();
        q.dequeue_front().unwrap();
        q.enqueue(3).unwrap();
        q.enqueue(4).unwrap();
        assert!(q.is_full());
        assert!(q.is_consistent());
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn draining_from_tail_leaves_empty_consistent_queue() {
        let mut q = TaskQueue::new(5);
        for id in 0..5 {
            q.enqueue(id).unwrap();
        }
        while q.dequeue_tail().is_ok() {}
        assert!(q.is_empty());
        assert!(q.is_consistent());
        q.enqueue(99).unwrap();
        assert_eq!(q.front(), Some(99));
        assert_eq!(q.back(), Some(99));
    }

    #[test]
    fn capacity_one() {
        let mut q = TaskQueue::new(1);
        q.enqueue(7).unwrap();
        assert!(q.is_full());
        assert_eq!(q.enqueue(8), Err(QueueError::Full));
        assert_eq!(q.dequeue_tail(), Ok(7));
        assert_eq!(q.dequeue_tail(), Err(QueueError::Empty));
    }
}
