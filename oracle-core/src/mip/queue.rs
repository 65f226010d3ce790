//! Open-node pool.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::SearchNode;
use crate::settings::NodeSelection;

/// Heap entry. The heap pops the greatest key, so best-bound stores the
/// negated bound and depth-first stores the depth.
struct Entry {
    key: f64,
    node: SearchNode,
}

impl Entry {
    fn order(&self, other: &Self) -> Ordering {
        // Equal keys: the node created first wins
        self.key
            .total_cmp(&other.key)
            .then_with(|| other.node.id.cmp(&self.node.id))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.order(other).is_eq()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.order(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order(other)
    }
}

/// Nodes waiting to be solved, ordered by the configured [`NodeSelection`].
pub struct NodeQueue {
    selection: NodeSelection,
    open: BinaryHeap<Entry>,
}

impl NodeQueue {
    pub fn new(selection: NodeSelection) -> Self {
        Self {
            selection,
            open: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, node: SearchNode) {
        let key = match self.selection {
            NodeSelection::BestBound => -node.dual_bound,
            NodeSelection::DepthFirst => node.depth as f64,
        };
        self.open.push(Entry { key, node });
    }

    pub fn pop(&mut self) -> Option<SearchNode> {
        self.open.pop().map(|entry| entry.node)
    }

    /// Smallest parent bound of any open node, `+inf` when none are open.
    pub fn best_bound(&self) -> f64 {
        self.open
            .iter()
            .map(|entry| entry.node.dual_bound)
            .min_by(f64::total_cmp)
            .unwrap_or(f64::INFINITY)
    }

    /// Discard open nodes whose bound cannot improve on `incumbent_obj`.
    /// Returns the number discarded.
    pub fn prune_by_bound(&mut self, incumbent_obj: f64, tol: f64) -> usize {
        let open = self.open.len();
        self.open.retain(|entry| !entry.node.can_prune(incumbent_obj, tol));
        open - self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(id: u64, depth: usize, bound: f64) -> SearchNode {
        SearchNode {
            id,
            depth,
            bound_changes: Vec::new(),
            dual_bound: bound,
        }
    }

    fn drain(queue: &mut NodeQueue) -> Vec<u64> {
        std::iter::from_fn(|| queue.pop()).map(|n| n.id).collect()
    }

    #[test]
    fn test_lowest_bound_first() {
        let mut queue = NodeQueue::new(NodeSelection::BestBound);
        for (id, bound) in [(1, -3.0), (2, -7.5), (3, 4.0), (4, -7.5)] {
            queue.push(open(id, 1, bound));
        }
        assert_eq!(queue.best_bound(), -7.5);
        // 2 and 4 tie; 2 is older
        assert_eq!(drain(&mut queue), vec![2, 4, 1, 3]);
        assert_eq!(queue.best_bound(), f64::INFINITY);
    }

    #[test]
    fn test_deepest_first() {
        let mut queue = NodeQueue::new(NodeSelection::DepthFirst);
        for (id, depth) in [(5, 1), (6, 3), (7, 2), (8, 3)] {
            queue.push(open(id, depth, 0.0));
        }
        assert_eq!(drain(&mut queue), vec![6, 8, 7, 5]);
    }

    #[test]
    fn test_prune_keeps_competitive_nodes() {
        let mut queue = NodeQueue::new(NodeSelection::BestBound);
        for (id, bound) in [(1, -10.0), (2, -4.0), (3, -2.0), (4, 1.0)] {
            queue.push(open(id, 1, bound));
        }
        // Incumbent at -3: only bounds below it survive
        assert_eq!(queue.prune_by_bound(-3.0, 1e-9), 2);
        assert_eq!(queue.len(), 2);
        assert_eq!(drain(&mut queue), vec![1, 2]);
    }
}
