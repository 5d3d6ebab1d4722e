use tracing::debug;

use crate::node::Node;
use crate::task_book::TaskBook;
use crate::types::{service_threshold, Completion};

/// Advances per-node service timers and retires finished head tasks.
#[derive(Debug, Clone, Copy)]
pub struct TickScheduler;

impl TickScheduler {
    /// Add `tick` service time to every busy node.
    ///
    /// A node whose timer reaches its head task's `size³` retires that one
    /// task. At most one task completes per node per call even if the timer
    /// overshoots the next task's threshold too. Callers must reclassify
    /// and reposition nodes afterwards.
    pub fn advance(nodes: &mut [Node], book: &mut TaskBook, tick: u64) -> Vec<Completion> {
        nodes
            .iter_mut()
            .filter_map(|node| Self::advance_node(node, book, tick))
            .collect()
    }

    /// Advance a single node. Returns the task it completed, if any.
    pub fn advance_node(node: &mut Node, book: &mut TaskBook, tick: u64) -> Option<Completion> {
        let head = node.queue().front()?;
        let timer = node.add_service_time(tick);
        if timer < service_threshold(book.queued_size(head)) {
            return None;
        }
        let (task, _) = node.pop_oldest(|t| book.queued_size(t)).ok()?;
        book.forget(task);
        debug!(node = node.id(), task, "task completed");
        Some(Completion { node: node.id(), task })
    }
}
