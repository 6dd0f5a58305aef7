//! Tree algebra over [`Filter`]: depth, breadth-first traversal and
//! type-occurrence counting.

use crate::filter::{Filter, FilterKind};
use std::collections::VecDeque;

/// A node visited during traversal, with its distance from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterableNode<'a> {
    pub node: &'a Filter,
    /// Root is at depth 0.
    pub depth: usize,
}

/// Breadth-first iterator over a filter tree, see [`Filter::traverse`].
#[derive(Debug, Clone)]
pub struct Traverse<'a> {
    queue: VecDeque<IterableNode<'a>>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = IterableNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.queue.pop_front()?;
        for child in current.node.operands() {
            self.queue.push_back(IterableNode {
                node: child,
                depth: current.depth + 1,
            });
        }
        Some(current)
    }
}

impl Filter {
    /// 0 for a leaf, otherwise one more than the deepest operand.
    pub fn depth(&self) -> usize {
        self.operands()
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Visits the root, then its operands left to right, then grandchildren.
    ///
    /// Every call returns an independent iterator; depths yielded are
    /// non-decreasing.
    pub fn traverse(&self) -> Traverse<'_> {
        let mut queue = VecDeque::new();
        queue.push_back(IterableNode {
            node: self,
            depth: 0,
        });
        Traverse { queue }
    }

    /// Number of nodes at depth `<= max_depth` whose kind is in `kinds`.
    pub fn count_matching_types(&self, max_depth: usize, kinds: &[FilterKind]) -> usize {
        self.traverse()
            .take_while(|visited| visited.depth <= max_depth)
            .filter(|visited| kinds.contains(&visited.node.kind()))
            .count()
    }

    pub fn contains_exactly(&self, n: usize, max_depth: usize, kinds: &[FilterKind]) -> bool {
        self.count_matching_types(max_depth, kinds) == n
    }

    pub fn contains_min(&self, n: usize, max_depth: usize, kinds: &[FilterKind]) -> bool {
        self.count_matching_types(max_depth, kinds) >= n
    }

    pub fn contains_max(&self, n: usize, max_depth: usize, kinds: &[FilterKind]) -> bool {
        self.count_matching_types(max_depth, kinds) <= n
    }

    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.traverse().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{CompOp, Field};
    use uuid::Uuid;

    fn owner(n: u128) -> Filter {
        Filter::owner(Uuid::from_u128(n))
    }

    fn category(values: &[&str]) -> Filter {
        Filter::field_any_of(Field::Category, values.iter().copied()).unwrap()
    }

    // or(and(owner1, category[a]), owner2, and(owner3, or(category[b], quantity > 1)))
    fn sample() -> Filter {
        Filter::or(vec![
            Filter::and(vec![owner(1), category(&["a"])]).unwrap(),
            owner(2),
            Filter::and(vec![
                owner(3),
                Filter::or(vec![category(&["b"]), Filter::quantity(CompOp::Gt, 1)]).unwrap(),
            ])
            .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_depth() {
        assert_eq!(owner(1).depth(), 0);
        assert_eq!(Filter::and(vec![owner(1)]).unwrap().depth(), 1);
        assert_eq!(sample().depth(), 3);
    }

    #[test]
    fn test_traverse_is_breadth_first() {
        let tree = sample();
        let visited: Vec<(FilterKind, usize)> = tree
            .traverse()
            .map(|n| (n.node.kind(), n.depth))
            .collect();

        assert_eq!(
            visited,
            vec![
                (FilterKind::Or, 0),
                (FilterKind::And, 1),
                (FilterKind::Owner, 1),
                (FilterKind::And, 1),
                (FilterKind::Owner, 2),
                (FilterKind::FieldAnyOf, 2),
                (FilterKind::Owner, 2),
                (FilterKind::Or, 2),
                (FilterKind::FieldAnyOf, 3),
                (FilterKind::QuantityCompare, 3),
            ]
        );
    }

    #[test]
    fn test_traverse_is_restartable() {
        let tree = sample();
        let first: Vec<_> = tree.traverse().collect();
        let mut partial = tree.traverse();
        partial.next();
        let second: Vec<_> = tree.traverse().collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), tree.node_count());
    }

    #[test]
    fn test_count_matching_types_respects_max_depth() {
        let tree = sample();
        assert_eq!(tree.count_matching_types(0, &[FilterKind::Owner]), 0);
        assert_eq!(tree.count_matching_types(1, &[FilterKind::Owner]), 1);
        assert_eq!(tree.count_matching_types(2, &[FilterKind::Owner]), 3);
        assert_eq!(
            tree.count_matching_types(usize::MAX, &[FilterKind::Or, FilterKind::And]),
            4
        );
        assert_eq!(tree.count_matching_types(usize::MAX, &[]), 0);
    }

    #[test]
    fn test_contains_family() {
        let tree = sample();
        let kinds = [FilterKind::FieldAnyOf];
        assert!(tree.contains_exactly(2, 3, &kinds));
        assert!(!tree.contains_exactly(1, 3, &kinds));
        assert!(tree.contains_min(1, 2, &kinds));
        assert!(!tree.contains_min(2, 2, &kinds));
        assert!(tree.contains_max(1, 2, &kinds));
        assert!(!tree.contains_max(0, 2, &kinds));
    }
}
