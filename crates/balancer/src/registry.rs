//! Load-ordered node registry.
//!
//! An intrusive doubly-linked list over fleet arena indices, kept ascending
//! by each node's completion-time estimate. The registry only owns links;
//! estimates are read through a key function supplied by the caller.
//!
//! Estimates change by one task's cost per event, so [`NodeRegistry::reposition`]
//! is a single insertion-sort step rather than a full resort.

/// Index of a node in the fleet arena.
pub type NodeIdx = usize;

#[derive(Debug, Clone, Copy, Default)]
struct Link {
    prev: Option<NodeIdx>,
    next: Option<NodeIdx>,
}

#[derive(Debug, Clone)]
pub struct NodeRegistry {
    links: Vec<Link>,
    head: Option<NodeIdx>,
    tail: Option<NodeIdx>,
}

impl NodeRegistry {
    /// Link `len` nodes in arena order. Callers start every node with the
    /// same estimate, which makes arena order a sorted order.
    pub fn new(len: usize) -> Self {
        let links = (0..len)
            .map(|idx| Link {
                prev: idx.checked_sub(1),
                next: (idx + 1 < len).then_some(idx + 1),
            })
            .collect();
        Self {
            links,
            head: (len > 0).then_some(0),
            tail: len.checked_sub(1),
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Lowest-load node.
    pub fn first(&self) -> Option<NodeIdx> {
        self.head
    }

    /// Highest-load node.
    pub fn last(&self) -> Option<NodeIdx> {
        self.tail
    }

    pub fn next(&self, idx: NodeIdx) -> Option<NodeIdx> {
        self.links[idx].next
    }

    pub fn prev(&self, idx: NodeIdx) -> Option<NodeIdx> {
        self.links[idx].prev
    }

    /// Iterate from the lowest-load node to the highest.
    pub fn iter(&self) -> Iter<'_> {
        Iter { registry: self, cursor: self.head }
    }

    /// Move `idx` to its sorted position after its key changed.
    ///
    /// Returns `true` if the node was relinked.
    pub fn reposition<F>(&mut self, idx: NodeIdx, key: F) -> bool
    where
        F: Fn(NodeIdx) -> f64,
    {
        let own = key(idx);
        let Link { prev, next } = self.links[idx];
        let after_prev = prev.map_or(true, |p| key(p) <= own);
        let before_next = next.map_or(true, |n| own <= key(n));
        if after_prev && before_next {
            return false;
        }

        self.unlink(idx);
        self.insert_sorted(idx, &key);
        true
    }

    /// Reposition several nodes whose keys changed at the same time.
    ///
    /// Every moved node is unlinked before any is reinserted, so the scan
    /// for each insertion point only sees nodes whose keys are in order.
    pub fn reposition_many<F>(&mut self, moved: &[NodeIdx], key: F)
    where
        F: Fn(NodeIdx) -> f64,
    {
        for &idx in moved {
            self.unlink(idx);
        }
        for &idx in moved {
            self.insert_sorted(idx, &key);
        }
    }

    /// Whether the sequence is ascending under `key`.
    pub fn is_sorted_by<F>(&self, key: F) -> bool
    where
        F: Fn(NodeIdx) -> f64,
    {
        let keys: Vec<f64> = self.iter().map(&key).collect();
        keys.windows(2).all(|w| w[0] <= w[1])
    }

    fn unlink(&mut self, idx: NodeIdx) {
        let Link { prev, next } = self.links[idx];
        match prev {
            Some(p) => self.links[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.links[n].prev = prev,
            None => self.tail = prev,
        }
        self.links[idx] = Link::default();
    }

    /// Link an unlinked node before the first node whose key is not lower.
    fn insert_sorted<F>(&mut self, idx: NodeIdx, key: &F)
    where
        F: Fn(NodeIdx) -> f64,
    {
        let own = key(idx);
        let mut cursor = self.head;
        while let Some(candidate) = cursor {
            if key(candidate) >= own {
                break;
            }
            cursor = self.links[candidate].next;
        }
        match cursor {
            Some(before) => self.insert_before(idx, before),
            None => self.push_back(idx),
        }
    }

    fn insert_before(&mut self, idx: NodeIdx, before: NodeIdx) {
        let prev = self.links[before].prev;
        self.links[idx] = Link { prev, next: Some(before) };
        self.links[before].prev = Some(idx);
        match prev {
            Some(p) => self.links[p].next = Some(idx),
            None => self.head = Some(idx),
        }
    }

    fn push_back(&mut self, idx: NodeIdx) {
        self.links[idx] = Link { prev: self.tail, next: None };
        match self.tail {
            Some(t) => self.links[t].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }
}

/// Forward iterator over a [`NodeRegistry`].
pub struct Iter<'a> {
    registry: &'a NodeRegistry,
    cursor: Option<NodeIdx>,
}

impl Iterator for Iter<'_> {
    type Item = NodeIdx;

    fn next(&mut self) -> Option<NodeIdx> {
        let current = self.cursor?;
        self.cursor = self.registry.links[current].next;
        Some(current)
    }
}
