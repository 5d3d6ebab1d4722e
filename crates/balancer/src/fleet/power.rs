use elastic_core::NodeId;
use tracing::info;

use crate::types::LoadState;

use super::Fleet;

impl Fleet {
    /// Number of powered-off nodes.
    pub fn off_count(&self) -> usize {
        self.counters.off_nodes
    }

    /// Whether at least one powered node sits in the Underloaded reserve.
    pub fn has_reserve(&self) -> bool {
        self.nodes.iter().any(|n| n.state() == LoadState::Underloaded)
    }

    /// Driver hook run after each reclassification pass. Only consults
    /// the power manager while some node is off.
    pub fn maintain_power(&mut self) -> Option<NodeId> {
        if self.counters.off_nodes == 0 {
            return None;
        }
        self.restore_reserve_if_needed()
    }

    /// Power a node back on when no Underloaded reserve is left.
    ///
    /// Fires when every node is either Off or at least Balanced and an Off
    /// node exists. The last Off node in registry order is turned on as an
    /// empty Underloaded reserve. Returns the id of the node powered on.
    pub fn restore_reserve_if_needed(&mut self) -> Option<NodeId> {
        debug_assert_eq!(
            self.counters.off_nodes,
            self.count_in_state(LoadState::Off),
            "off-node counter out of sync"
        );
        if self.counters.off_nodes == 0 {
            return None;
        }
        let busy = self
            .nodes
            .iter()
            .filter(|n| n.state() >= LoadState::Balanced)
            .count();
        if self.counters.off_nodes + busy != self.nodes.len() {
            return None;
        }

        let candidate = self
            .registry
            .iter()
            .filter(|&idx| self.nodes[idx].is_off())
            .last()?;
        self.nodes[candidate].power_on();
        self.counters.off_nodes -= 1;
        self.refresh(candidate);

        let id = self.nodes[candidate].id();
        info!(node = id, off_nodes = self.counters.off_nodes, "reserve node powered on");
        Some(id)
    }
}
