use std::cmp::Ordering;

use petgraph::graph::NodeIndex;

use crate::Minutes;

#[derive(Copy, Clone, Debug)]
pub(super) struct State {
    pub(super) cost: Minutes,
    pub(super) node: NodeIndex,
}

// Implement Ord for State to use in BinaryHeap
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by cost (reversed from standard Rust BinaryHeap),
        // equal costs pop the lower node index first
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;

    #[test]
    fn heap_pops_cheapest_then_lowest_node() {
        let mut heap = BinaryHeap::new();
        heap.push(State {
            cost: 2.0,
            node: NodeIndex::new(0),
        });
        heap.push(State {
            cost: 1.0,
            node: NodeIndex::new(5),
        });
        heap.push(State {
            cost: 1.0,
            node: NodeIndex::new(3),
        });

        let order: Vec<usize> = std::iter::from_fn(|| heap.pop())
            .map(|s| s.node.index())
            .collect();
        assert_eq!(order, vec![3, 5, 0]);
    }
}
