use serde::Serialize;
use tracing::{debug, info};

use elastic_core::{NodeId, TaskId};

use crate::error::BalancerError;
use crate::queue::QueueError;
use crate::registry::NodeIdx;
use crate::types::LoadState;

use super::Fleet;

/// One task relocated from one queue to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Migration {
    pub source: NodeId,
    pub destination: NodeId,
    pub task: TaskId,
}

/// An underloaded node drained into another node and powered off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Consolidation {
    pub source: NodeId,
    pub destination: NodeId,
    pub moved: usize,
}

/// What a rebalance pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RebalanceOutcome {
    /// Neither an overloaded source nor a pair of underloaded nodes existed.
    Idle,
    Relieved(Migration),
    Consolidated(Consolidation),
    /// A source existed but no destination qualified. Nothing was mutated.
    NoTarget { source: NodeId },
}

impl Fleet {
    /// Relieve overload if there is any; otherwise try to consolidate
    /// underloaded nodes.
    pub fn run_rebalance_pass(&mut self) -> Result<RebalanceOutcome, BalancerError> {
        let outcome = match self.relieve_overloaded() {
            Ok(Some(migration)) => RebalanceOutcome::Relieved(migration),
            Ok(None) => match self.consolidate_underloaded() {
                Ok(Some(consolidation)) => RebalanceOutcome::Consolidated(consolidation),
                Ok(None) => RebalanceOutcome::Idle,
                Err(BalancerError::NoTarget { source_node }) => {
                    RebalanceOutcome::NoTarget { source: source_node }
                }
                Err(e) => return Err(e),
            },
            Err(BalancerError::NoTarget { source_node }) => {
                RebalanceOutcome::NoTarget { source: source_node }
            }
            Err(e) => return Err(e),
        };
        Ok(outcome)
    }

    /// Move one task off the lowest-load node that is Overloaded or Full.
    ///
    /// Destination preference over a full registry scan: the first
    /// Underloaded node, else the first Balanced, else the first other
    /// Overloaded. Returns `Ok(None)` when no node needs relief.
    pub fn relieve_overloaded(&mut self) -> Result<Option<Migration>, BalancerError> {
        let Some(src) = self
            .registry
            .iter()
            .find(|&idx| matches!(self.nodes[idx].state(), LoadState::Overloaded | LoadState::Full))
        else {
            return Ok(None);
        };

        let mut underloaded = None;
        let mut balanced = None;
        let mut overloaded = None;
        for idx in self.registry.iter().filter(|&idx| idx != src) {
            match self.nodes[idx].state() {
                LoadState::Underloaded => {
                    underloaded = Some(idx);
                    break;
                }
                LoadState::Balanced => {
                    balanced.get_or_insert(idx);
                }
                LoadState::Overloaded => {
                    overloaded.get_or_insert(idx);
                }
                LoadState::Off | LoadState::Full => {}
            }
        }

        let dst = underloaded
            .or(balanced)
            .or(overloaded)
            .ok_or(BalancerError::NoTarget { source_node: self.nodes[src].id() })?;
        self.migrate(src, dst).map(Some)
    }

    /// Drain the lowest-load Underloaded node into another node and power
    /// it off. Only runs when at least two nodes are Underloaded.
    ///
    /// The destination is the first Balanced node that can take the whole
    /// queue while staying strictly below the overload bound. Failing that,
    /// another Underloaded node is used, but only when more than two exist
    /// in total; merging one of exactly two reserves would leave none and
    /// force a node back on.
    pub fn consolidate_underloaded(&mut self) -> Result<Option<Consolidation>, BalancerError> {
        let mut first = None;
        let mut source = None;
        for idx in self.registry.iter() {
            if self.nodes[idx].state() != LoadState::Underloaded {
                continue;
            }
            match first {
                None => first = Some(idx),
                Some(f) => {
                    source = Some(f);
                    break;
                }
            }
        }
        let Some(src) = source else {
            return Ok(None);
        };

        let dst = self
            .absorbing_balanced(src)
            .or_else(|| self.merging_underloaded(src))
            .ok_or(BalancerError::NoTarget { source_node: self.nodes[src].id() })?;

        let mut moved = 0;
        while !self.nodes[src].queue().is_empty() {
            self.migrate(src, dst)?;
            moved += 1;
        }
        self.nodes[src].power_off();
        self.counters.off_nodes += 1;
        self.refresh(src);

        let consolidation = Consolidation {
            source: self.nodes[src].id(),
            destination: self.nodes[dst].id(),
            moved,
        };
        info!(
            source = consolidation.source,
            destination = consolidation.destination,
            moved,
            off_nodes = self.counters.off_nodes,
            "node consolidated and powered off"
        );
        Ok(Some(consolidation))
    }

    /// Move the newest task from `source` to `destination`.
    pub fn move_one_task(
        &mut self,
        source: NodeId,
        destination: NodeId,
    ) -> Result<Migration, BalancerError> {
        let src = self.index_of(source)?;
        let dst = self.index_of(destination)?;
        if src == dst {
            return Err(BalancerError::NoTarget { source_node: source });
        }
        if self.nodes[dst].is_off() {
            return Err(BalancerError::NodeOff(destination));
        }
        self.migrate(src, dst)
    }

    fn absorbing_balanced(&self, src: NodeIdx) -> Option<NodeIdx> {
        let incoming = self.nodes[src].occupancy();
        let limit = self.queue_capacity as f64 * self.thresholds.overload_bound;
        self.registry.iter().find(|&idx| {
            let node = &self.nodes[idx];
            let combined = node.occupancy() + incoming;
            idx != src
                && node.state() == LoadState::Balanced
                && (combined as f64) < limit
                && combined <= self.queue_capacity
        })
    }

    fn merging_underloaded(&self, src: NodeIdx) -> Option<NodeIdx> {
        if self.count_in_state(LoadState::Underloaded) <= 2 {
            return None;
        }
        let incoming = self.nodes[src].occupancy();
        self.registry.iter().find(|&idx| {
            let node = &self.nodes[idx];
            idx != src
                && node.state() == LoadState::Underloaded
                && node.occupancy() + incoming <= self.queue_capacity
        })
    }

    /// Relocate the tail task of `src` into `dst`. Checks for room first so
    /// a failed move leaves both nodes untouched. Each node is repositioned
    /// right after its own estimate changes.
    fn migrate(&mut self, src: NodeIdx, dst: NodeIdx) -> Result<Migration, BalancerError> {
        if self.nodes[dst].queue().is_full() {
            return Err(QueueError::Full.into());
        }

        let book = &self.book;
        let (task, size) = self.nodes[src].pop_newest(|t| book.queued_size(t))?;
        self.refresh(src);

        self.nodes[dst].push_task(task, size)?;
        self.refresh(dst);

        self.counters.migrations += 1;
        let migration = Migration {
            source: self.nodes[src].id(),
            destination: self.nodes[dst].id(),
            task,
        };
        debug!(
            source = migration.source,
            destination = migration.destination,
            task,
            migrations = self.counters.migrations,
            "task migrated"
        );
        Ok(migration)
    }
}
