//! Arena storage for the step tree.
//!
//! Nodes are addressed by [`NodeId`] and never move or get freed while the
//! tour lives. Inserting or discarding children only rewrites `children`
//! lists and the `attached` flag, so ids held by the navigation history stay
//! valid however the tree changes under them.

use std::ops::{Index, IndexMut};

use crate::state::{Answer, Scope};
use crate::step::Step;

/// Stable handle to a node of a [`StepTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A step plus the engine's bookkeeping for it.
pub struct Node {
    pub(crate) step: Box<dyn Step>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Direct children inserted by this node's own effect. Discarded on undo.
    pub(crate) grown: Vec<NodeId>,
    /// Direct children this node's effect dropped. Restored on undo.
    pub(crate) cleared: Vec<NodeId>,
    pub(crate) scope: Scope,
    pub(crate) response: Option<Answer>,
    pub(crate) completed: bool,
    pub(crate) validation_failures: u32,
    pub(crate) attached: bool,
}

impl Node {
    pub fn name(&self) -> &str {
        self.step.name()
    }

    pub fn step(&self) -> &dyn Step {
        self.step.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// The last accepted answer; `None` while pending.
    pub fn response(&self) -> Option<&Answer> {
        self.response.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn validation_failures(&self) -> u32 {
        self.validation_failures
    }

    /// False once an ancestor dropped this node from the tree.
    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

/// The question tree of one tour.
pub struct StepTree {
    nodes: Vec<Node>,
}

impl StepTree {
    pub(crate) fn new(root: Box<dyn Step>) -> Self {
        let root = Node {
            step: root,
            parent: None,
            children: Vec::new(),
            grown: Vec::new(),
            cleared: Vec::new(),
            scope: Scope::Root,
            response: None,
            completed: false,
            validation_failures: 0,
            attached: true,
        };
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Allocate `step` and link it as the first child of `parent`.
    pub(crate) fn insert_front(
        &mut self,
        parent: NodeId,
        step: Box<dyn Step>,
        scope: Scope,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            step,
            parent: Some(parent),
            children: Vec::new(),
            grown: Vec::new(),
            cleared: Vec::new(),
            scope,
            response: None,
            completed: false,
            validation_failures: 0,
            attached: true,
        });
        self[parent].children.insert(0, id);
        id
    }

    /// Unlink `child` from its parent and mark its whole subtree detached.
    pub(crate) fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self[child].parent {
            let parent = &mut self[parent];
            parent.children.retain(|c| *c != child);
            parent.grown.retain(|c| *c != child);
        }
        let mut stack = vec![child];
        while let Some(id) = stack.pop() {
            let node = &mut self[id];
            node.attached = false;
            stack.extend(node.children.iter().copied());
        }
    }

    /// Detach every child of `parent`, returning them in their old order.
    pub(crate) fn detach_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        let children = self[parent].children.clone();
        for child in &children {
            self.detach(*child);
        }
        children
    }

    /// Link previously detached `children` back under `parent`, after its
    /// current children, and mark their subtrees live again.
    pub(crate) fn reattach(&mut self, parent: NodeId, children: &[NodeId]) {
        for child in children {
            self[*child].parent = Some(parent);
            self[parent].children.push(*child);
            let mut stack = vec![*child];
            while let Some(id) = stack.pop() {
                let node = &mut self[id];
                node.attached = true;
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Live nodes in pre-order, starting at the root.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self[id].children.iter().rev().copied());
        }
        out
    }

    /// Live descendants of `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self[id].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self[next].children.iter().rev().copied());
        }
        out
    }

    /// First live node named `name`, in pre-order.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.preorder().into_iter().find(|id| self[*id].name() == name)
    }

    /// Live nodes other than `except` that share `name` and `scope`.
    pub(crate) fn namesakes(&self, name: &str, scope: &Scope, except: NodeId) -> usize {
        self.preorder()
            .into_iter()
            .filter(|id| *id != except)
            .filter(|id| self[*id].name() == name && self[*id].scope == *scope)
            .count()
    }
}

impl Index<NodeId> for StepTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for StepTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}
