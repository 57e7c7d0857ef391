//! Depth-first navigation over a tree that grows while it is walked.
//!
//! "Next" is computed from the tree's current shape every time, so children
//! an effect inserted a moment ago are visited right after their parent.
//! "Previous" is never recomputed from the shape: it is the top of a
//! history stack pushed at visit time, which insertions cannot disturb.

use crate::tree::{NodeId, StepTree};

/// Forward/backward movement over a [`StepTree`].
#[derive(Debug, Default)]
pub struct Navigator {
    history: Vec<NodeId>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-order successor of `current` over the live tree.
    ///
    /// First child if any, otherwise the next sibling of the nearest
    /// ancestor (or `current` itself) that has one, otherwise `None`.
    pub fn next(&self, tree: &StepTree, current: NodeId) -> Option<NodeId> {
        if let Some(first) = tree[current].children.first() {
            return Some(*first);
        }
        let mut node = current;
        while let Some(parent) = tree[node].parent {
            let siblings = &tree[parent].children;
            if let Some(pos) = siblings.iter().position(|s| *s == node) {
                if let Some(sibling) = siblings.get(pos + 1) {
                    return Some(*sibling);
                }
            }
            node = parent;
        }
        None
    }

    /// Record that `id` was completed and is being left behind.
    pub fn record(&mut self, id: NodeId) {
        self.history.push(id);
    }

    /// The step completed most recently before the current one.
    pub fn previous(&self) -> Option<NodeId> {
        self.history.last().copied()
    }

    /// Pop the most recent entry, to resume there.
    pub fn rewind(&mut self) -> Option<NodeId> {
        self.history.pop()
    }

    /// Forget nodes that were dropped from the tree.
    pub fn retain_attached(&mut self, tree: &StepTree) {
        self.history.retain(|id| tree[*id].attached);
    }

    pub fn history(&self) -> &[NodeId] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Scope;
    use crate::step::{FnStep, RootStep};

    fn add(tree: &mut StepTree, parent: NodeId, name: &str) -> NodeId {
        tree.insert_front(parent, Box::new(FnStep::new(name)), Scope::Root)
    }

    #[test]
    fn next_walks_preorder_and_climbs_back_up() {
        let mut tree = StepTree::new(Box::new(RootStep));
        let root = tree.root();
        let c = add(&mut tree, root, "c");
        let a = add(&mut tree, root, "a");
        let a2 = add(&mut tree, a, "a2");
        let a1 = add(&mut tree, a, "a1");
        let nav = Navigator::new();

        let mut order = Vec::new();
        let mut cur = Some(root);
        while let Some(id) = cur {
            order.push(tree[id].name().to_string());
            cur = nav.next(&tree, id);
        }
        assert_eq!(order, ["Root", "a", "a1", "a2", "c"]);
        assert_eq!(nav.next(&tree, a2), Some(c));
        assert_eq!(nav.next(&tree, c), None);
        assert_eq!(nav.next(&tree, a1), Some(a2));
    }

    #[test]
    fn children_inserted_mid_walk_come_before_old_siblings() {
        let mut tree = StepTree::new(Box::new(RootStep));
        let root = tree.root();
        let b = add(&mut tree, root, "b");
        let a = add(&mut tree, root, "a");
        let nav = Navigator::new();
        assert_eq!(nav.next(&tree, a), Some(b));

        let new_child = add(&mut tree, a, "a.new");
        assert_eq!(nav.next(&tree, a), Some(new_child));
        assert_eq!(nav.next(&tree, new_child), Some(b));
    }

    #[test]
    fn history_survives_insertions_and_drops_detached_nodes() {
        let mut tree = StepTree::new(Box::new(RootStep));
        let root = tree.root();
        let b = add(&mut tree, root, "b");
        let a = add(&mut tree, root, "a");
        let mut nav = Navigator::new();
        nav.record(root);
        nav.record(a);
        let child = add(&mut tree, a, "a.1");
        assert_eq!(nav.previous(), Some(a));

        nav.record(child);
        tree.detach(child);
        nav.retain_attached(&tree);
        assert_eq!(nav.history(), [root, a]);
        assert_eq!(nav.next(&tree, a), Some(b));
        assert_eq!(nav.rewind(), Some(a));
        assert_eq!(nav.previous(), Some(root));
    }
}
