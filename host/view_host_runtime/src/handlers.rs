//! Per-node update handler slots.
//!
//! Each node has at most one owner: the render instance that currently
//! absorbs patches for it. Removal only succeeds for the current owner, so a
//! stale instance tearing down late cannot clear a newer instance's slot.

use crate::tree::NodeId;
use std::collections::HashMap;

#[derive(Debug)]
pub struct HandlerRegistry<O> {
    slots: HashMap<NodeId, O>,
}

impl<O> Default for HandlerRegistry<O> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }
}

impl<O: Copy + Eq + std::fmt::Debug> HandlerRegistry<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `owner` the handler for `node`, returning the owner it displaced.
    pub fn install(&mut self, node: NodeId, owner: O) -> Option<O> {
        let previous = self.slots.insert(node, owner);
        if let Some(previous) = previous.filter(|previous| *previous != owner) {
            log::debug!("handler slot for {node} moved from {previous:?} to {owner:?}");
            return Some(previous);
        }
        None
    }

    /// Clears the slot only if `owner` still holds it.
    pub fn remove(&mut self, node: NodeId, owner: O) -> bool {
        match self.slots.get(&node) {
            Some(current) if *current == owner => {
                self.slots.remove(&node);
                true
            }
            Some(current) => {
                log::debug!("{owner:?} left handler slot for {node} alone; owned by {current:?}");
                false
            }
            None => false,
        }
    }

    pub fn owner(&self, node: NodeId) -> Option<O> {
        self.slots.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
