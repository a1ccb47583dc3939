//! Transposition tree shared by all search workers.
//!
//! Nodes live in a concurrent map keyed by [`NodeKey`], so the same state
//! reached along different paths is a single node. The only structural write
//! is insert-if-absent; nodes are never removed while a decision is searched.

use crate::key::NodeKey;
use crate::node::TreeNode;
use dashmap::DashMap;
use engine_core::Domain;
use std::sync::Arc;

/// Transposition tree for one decision.
#[derive(Debug)]
pub struct Tree<A> {
    nodes: DashMap<NodeKey, Arc<TreeNode<A>>>,
    root: Arc<TreeNode<A>>,
    max_size: usize,
}

impl<A> Tree<A> {
    /// Create a tree holding only the node for `root`.
    pub fn new<D>(root: &D, max_players: usize, max_size: usize) -> Self
    where
        D: Domain<Action = A>,
    {
        let root = Arc::new(TreeNode::from_domain(root, max_players));
        let nodes = DashMap::new();
        nodes.insert(root.key().clone(), Arc::clone(&root));
        Self {
            nodes,
            root,
            max_size,
        }
    }

    #[inline]
    pub fn root(&self) -> &Arc<TreeNode<A>> {
        &self.root
    }

    pub fn get(&self, key: &NodeKey) -> Option<Arc<TreeNode<A>>> {
        self.nodes.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Insert `node` unless its key is already present. Returns the node that
    /// is live in the table; callers must continue with the returned handle.
    pub fn put_if_absent(&self, node: TreeNode<A>) -> Arc<TreeNode<A>> {
        let entry = self
            .nodes
            .entry(node.key().clone())
            .or_insert_with(|| Arc::new(node));
        Arc::clone(entry.value())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Whether expansion should stop adding nodes.
    #[inline]
    pub fn is_over_capacity(&self) -> bool {
        self.nodes.len() > self.max_size
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let player = self.root.current_player();
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: self.root.visits(),
            root_value: self.root.mean_return(player).unwrap_or(0.0),
            root_children: self.root.edges().map_or(0, |e| e.len()),
        }
    }
}

/// Statistics about a search tree.
#[derive(Debug, Clone)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    /// Mean return of the root for the player to move there.
    pub root_value: f64,
    pub root_children: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::ActionList;
    use std::thread;

    #[derive(Debug, Clone)]
    struct Cell(i32);

    impl Domain for Cell {
        type Action = i32;

        fn current_player(&self) -> usize {
            (self.0 % 2) as usize
        }
        fn is_terminal(&self) -> bool {
            self.0 >= 10
        }
        fn winner(&self) -> Option<usize> {
            None
        }
        fn apply_action(&mut self, action: &i32, _sampled: bool) {
            self.0 += action;
        }
        fn legal_actions(&self, _sample: bool) -> ActionList<i32> {
            ActionList::new(vec![1, 2])
        }
        fn state_key(&self) -> Vec<i32> {
            vec![self.0]
        }
    }

    #[test]
    fn test_new_tree() {
        let tree = Tree::new(&Cell(0), 2, 100);
        assert_eq!(tree.len(), 1);
        assert!(!tree.is_empty());

        let root = tree.root();
        assert_eq!(root.key().state(), &[0]);
        assert!(root.is_leaf());
        assert!(tree.get(root.key()).is_some());
    }

    #[test]
    fn test_put_if_absent_keeps_first() {
        let tree = Tree::new(&Cell(0), 2, 100);

        let first = tree.put_if_absent(TreeNode::from_domain(&Cell(3), 2));
        first.update(&[1.0, 0.0], 1);

        let second = tree.put_if_absent(TreeNode::from_domain(&Cell(3), 2));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.visits(), 1);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_get_missing() {
        let tree = Tree::new(&Cell(0), 2, 100);
        assert!(tree.get(&NodeKey::new(vec![42], None)).is_none());
    }

    #[test]
    fn test_capacity() {
        let tree = Tree::new(&Cell(0), 2, 2);
        tree.put_if_absent(TreeNode::from_domain(&Cell(1), 2));
        assert!(!tree.is_over_capacity());
        tree.put_if_absent(TreeNode::from_domain(&Cell(2), 2));
        assert!(tree.is_over_capacity());
    }

    #[test]
    fn test_concurrent_inserts_yield_single_node() {
        let tree = Arc::new(Tree::new(&Cell(0), 2, 1000));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tree = Arc::clone(&tree);
                thread::spawn(move || {
                    (1..50)
                        .map(|i| tree.put_if_absent(TreeNode::from_domain(&Cell(i), 2)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(tree.len(), 50);
        for per_thread in &results[1..] {
            for (a, b) in results[0].iter().zip(per_thread) {
                assert!(Arc::ptr_eq(a, b));
            }
        }
    }

    #[test]
    fn test_tree_stats() {
        let tree = Tree::new(&Cell(0), 2, 100);
        tree.root().update(&[2.0, 0.0], 4);
        let stats = tree.stats();
        assert_eq!(stats.total_nodes, 1);
        assert_eq!(stats.root_visits, 4);
        assert!((stats.root_value - 0.5).abs() < 1e-12);
        assert_eq!(stats.root_children, 0);
    }
}
