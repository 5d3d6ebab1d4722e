use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use elastic_core::{BalancerConfig, NodeId, TaskId};

use crate::error::BalancerError;
use crate::metrics::Counters;
use crate::node::{Node, NodeSnapshot};
use crate::registry::{NodeIdx, NodeRegistry};
use crate::task_book::TaskBook;
use crate::thresholds::ThresholdAdapter;
use crate::tick::TickScheduler;
use crate::types::{task_cost, Completion, LoadState, SubmitOutcome, Task, Thresholds};

/// A fixed-size fleet of nodes under management.
#[derive(Debug, Clone)]
pub struct Fleet {
    /// Node arena. A node's index equals its id and never changes.
    pub(super) nodes: Vec<Node>,
    pub(super) registry: NodeRegistry,
    pub(super) thresholds: Thresholds,
    pub(super) adapter: ThresholdAdapter,
    pub(super) book: TaskBook,
    pub(super) counters: Counters,
    pub(super) queue_capacity: usize,
}

/// Point-in-time export of the fleet, nodes in registry order.
#[derive(Debug, Clone, Serialize)]
pub struct FleetSnapshot {
    pub taken_at: DateTime<Utc>,
    pub thresholds: Thresholds,
    pub counters: Counters,
    pub nodes: Vec<NodeSnapshot>,
}

/// A node whose incrementally maintained estimate disagrees with the sum
/// of its queued task costs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateDrift {
    pub node: NodeId,
    pub recorded: f64,
    pub recomputed: f64,
}

impl Fleet {
    /// Build a fleet with every node at computing power 1.
    pub fn new(config: &BalancerConfig) -> Result<Self, BalancerError> {
        Self::initialize(config, |_| 1.0)
    }

    /// Build `config.node_count` nodes, all starting Underloaded with
    /// empty queues.
    pub fn initialize<F>(
        config: &BalancerConfig,
        computing_power_of: F,
    ) -> Result<Self, BalancerError>
    where
        F: Fn(NodeId) -> f64,
    {
        config.validate()?;
        let nodes: Vec<Node> = (0..config.node_count)
            .map(|i| {
                let id = i as NodeId;
                Node::new(id, computing_power_of(id), config.queue_capacity)
            })
            .collect();
        info!(
            nodes = nodes.len(),
            queue_capacity = config.queue_capacity,
            "fleet initialized"
        );
        Ok(Self {
            registry: NodeRegistry::new(nodes.len()),
            nodes,
            thresholds: Thresholds::from_config(config),
            adapter: ThresholdAdapter::new(config.history_len, config.underload_ceiling),
            book: TaskBook::with_capacity(config.node_count * config.queue_capacity),
            counters: Counters::default(),
            queue_capacity: config.queue_capacity,
        })
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn task_book(&self) -> &TaskBook {
        &self.book
    }

    pub fn adapter(&self) -> &ThresholdAdapter {
        &self.adapter
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    /// Nodes from lowest to highest completion estimate.
    pub fn nodes_by_load(&self) -> impl Iterator<Item = &Node> + '_ {
        self.registry.iter().map(move |idx| &self.nodes[idx])
    }

    /// Tasks queued across the whole fleet.
    pub fn total_queued(&self) -> usize {
        self.nodes.iter().map(Node::occupancy).sum()
    }

    pub fn count_in_state(&self, state: LoadState) -> usize {
        self.nodes.iter().filter(|n| n.state() == state).count()
    }

    /// Whether the registry is ascending by completion estimate.
    pub fn is_ordered(&self) -> bool {
        self.registry.is_sorted_by(|i| self.nodes[i].completion_estimate())
    }

    // ── Submission ───────────────────────────────────────────────

    /// Route a task to the lowest-load powered node.
    ///
    /// A task whose id is still queued somewhere in the fleet is counted as
    /// lost and never placed.
    pub fn submit_task(&mut self, task: Task) -> SubmitOutcome {
        if self.is_queued(task.id) {
            warn!(task = task.id, "duplicate task id rejected");
            return self.record_loss(task, None);
        }
        let target = self.registry.iter().find(|&idx| !self.nodes[idx].is_off());
        match target {
            Some(idx) => self.place(idx, task),
            None => self.record_loss(task, None),
        }
    }

    /// Place a task on a specific node, with the same accounting as
    /// [`Fleet::submit_task`]. Fails without counting anything if the node
    /// is off or the task id is already queued.
    pub fn submit_to(
        &mut self,
        node: NodeId,
        task: Task,
    ) -> Result<SubmitOutcome, BalancerError> {
        let idx = self.index_of(node)?;
        if self.nodes[idx].is_off() {
            return Err(BalancerError::NodeOff(node));
        }
        if self.is_queued(task.id) {
            return Err(BalancerError::DuplicateTask(task.id));
        }
        Ok(self.place(idx, task))
    }

    /// Whether a task with this id sits in some node's queue.
    pub fn is_queued(&self, task: TaskId) -> bool {
        self.book.size_of(task).is_some()
    }

    fn place(&mut self, idx: NodeIdx, task: Task) -> SubmitOutcome {
        debug_assert!(!self.is_queued(task.id), "task {} placed twice", task.id);
        if self.nodes[idx].push_task(task.id, task.size).is_err() {
            return self.record_loss(task, Some(self.nodes[idx].id()));
        }
        self.book.record(task.id, task.size);
        self.counters.tasks_accepted += 1;
        self.refresh(idx);
        SubmitOutcome::Accepted { node: self.nodes[idx].id() }
    }

    fn record_loss(&mut self, task: Task, node: Option<NodeId>) -> SubmitOutcome {
        self.counters.tasks_lost += 1;
        debug!(task = task.id, ?node, lost = self.counters.tasks_lost, "task lost");
        SubmitOutcome::Lost
    }

    // ── Time ─────────────────────────────────────────────────────

    /// Advance every node's service timer, then reclassify and reposition
    /// the whole fleet. Nodes that completed a task are repositioned as one
    /// batch first, since their estimates all dropped at once.
    pub fn advance_tick(&mut self, tick: u64) -> Vec<Completion> {
        let completed = TickScheduler::advance(&mut self.nodes, &mut self.book, tick);
        let moved: Vec<NodeIdx> = completed.iter().map(|c| c.node as NodeIdx).collect();
        let nodes = &self.nodes;
        self.registry
            .reposition_many(&moved, |i| nodes[i].completion_estimate());

        self.counters.tasks_completed += completed.len() as u64;
        self.reclassify_all();
        completed
    }

    // ── Thresholds ───────────────────────────────────────────────

    /// Feed one utilization sample into the history window.
    pub fn record_utilization(&mut self, sample: f64) {
        self.adapter.record(sample);
    }

    /// Record the mean queue occupancy fraction of powered nodes and
    /// return it.
    pub fn sample_utilization(&mut self) -> f64 {
        let powered: Vec<&Node> = self.nodes.iter().filter(|n| !n.is_off()).collect();
        let sample = if powered.is_empty() {
            0.0
        } else {
            let used: usize = powered.iter().map(|n| n.occupancy()).sum();
            used as f64 / (powered.len() * self.queue_capacity) as f64
        };
        self.adapter.record(sample);
        sample
    }

    /// Recompute the bounds from the history window and reclassify every
    /// node against them.
    pub fn recalculate_thresholds(
        &mut self,
        sensitivity: f64,
    ) -> Result<Thresholds, BalancerError> {
        let thresholds = self
            .adapter
            .recalculate(sensitivity)
            .ok_or(BalancerError::EmptyHistory)?;
        self.thresholds = thresholds;
        self.reclassify_all();
        Ok(thresholds)
    }

    // ── Observability ────────────────────────────────────────────

    pub fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot {
            taken_at: Utc::now(),
            thresholds: self.thresholds,
            counters: self.counters,
            nodes: self.nodes_by_load().map(Node::snapshot).collect(),
        }
    }

    /// Recompute every estimate from queue contents and report the nodes
    /// whose recorded estimate drifted.
    pub fn reconcile(&self) -> Vec<EstimateDrift> {
        self.nodes
            .iter()
            .filter_map(|node| {
                let recomputed: f64 = node
                    .queue()
                    .iter()
                    .map(|t| task_cost(self.book.size_of(t).unwrap_or(0), node.computing_power()))
                    .sum();
                let recorded = node.completion_estimate();
                let tolerance = 1e-9 * recomputed.abs().max(1.0);
                ((recorded - recomputed).abs() > tolerance).then(|| EstimateDrift {
                    node: node.id(),
                    recorded,
                    recomputed,
                })
            })
            .collect()
    }

    // ── Internals ────────────────────────────────────────────────

    pub(super) fn index_of(&self, id: NodeId) -> Result<NodeIdx, BalancerError> {
        let idx = id as usize;
        if idx < self.nodes.len() {
            Ok(idx)
        } else {
            Err(BalancerError::UnknownNode(id))
        }
    }

    /// Reclassify one node and move it to its sorted position.
    pub(super) fn refresh(&mut self, idx: NodeIdx) {
        self.nodes[idx].reclassify(&self.thresholds);
        let nodes = &self.nodes;
        self.registry
            .reposition(idx, |i| nodes[i].completion_estimate());
    }

    pub(super) fn reclassify_all(&mut self) {
        let order: Vec<NodeIdx> = self.registry.iter().collect();
        for idx in order {
            self.refresh(idx);
        }
        debug_assert!(self.is_ordered(), "registry out of order after reclassification");
    }
}
