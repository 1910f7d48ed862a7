use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::scope::node::ScopeNode;

/// Identifies a node of a forest. Ids increase monotonically and are never
/// reused, so an id outliving its node can't address a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct Arena {
    slots: HashMap<NodeId, ArenaSlot>,
    next_id: u64,
}

#[derive(Debug)]
struct ArenaSlot {
    node: Arc<ScopeNode>,
    children: Vec<NodeId>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Adds `node` and links it under its parent, which must be present.
    pub fn insert(&mut self, node: Arc<ScopeNode>) {
        let id = node.id();
        if let Some(parent) = node.parent() {
            match self.slots.get_mut(&parent.id) {
                Some(slot) => slot.children.push(id),
                None => unreachable!("the parent of a new node should be in the arena"),
            }
        }
        self.slots.insert(
            id,
            ArenaSlot {
                node,
                children: Vec::new(),
            },
        );
    }

    pub fn get(&self, id: NodeId) -> Option<&Arc<ScopeNode>> {
        self.slots.get(&id).map(|slot| &slot.node)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slots
            .get(&id)
            .map(|slot| slot.children.as_slice())
            .unwrap_or_default()
    }

    pub fn roots(&self) -> Vec<&Arc<ScopeNode>> {
        let mut roots: Vec<_> = self
            .slots
            .values()
            .filter(|slot| slot.node.parent().is_none())
            .map(|slot| &slot.node)
            .collect();
        roots.sort_by_key(|node| node.id());
        roots
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Unlinks `id` from its parent and removes it with all its descendants.
    /// Descendants come before their ancestors in the returned list.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<Arc<ScopeNode>> {
        let Some(slot) = self.slots.get(&id) else {
            return Vec::new();
        };
        if let Some(parent) = slot.node.parent() {
            let parent = parent.id;
            if let Some(parent) = self.slots.get_mut(&parent) {
                parent.children.retain(|&child| child != id);
            }
        }

        let mut removed = Vec::new();
        self.remove_recursively(id, &mut removed);
        removed
    }

    fn remove_recursively(&mut self, id: NodeId, removed: &mut Vec<Arc<ScopeNode>>) {
        if let Some(slot) = self.slots.remove(&id) {
            for child in slot.children {
                self.remove_recursively(child, removed);
            }
            removed.push(slot.node);
        }
    }
}
