//! Node arena for the remote-owned view tree.
//!
//! Nodes are addressed by [`NodeId`]. A patch mutates a node's fields in
//! place, so the id a render instance holds keeps pointing at "its" node.
//! Ids are never reused.

use crate::error::PathError;
use crate::model::{EventTarget, ExternalSource, Model, ModelChild};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// How a child is matched across updates: by its identity when it has one,
/// otherwise by position in the children list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChildKey {
    Identity(String),
    Position(usize),
}

impl ChildKey {
    pub fn new(identity: Option<&str>, position: usize) -> Self {
        match identity {
            Some(identity) => ChildKey::Identity(identity.to_string()),
            None => ChildKey::Position(position),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Text(String),
    Node(NodeId),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeData {
    /// Rendered primitive. Empty means a transparent group.
    pub kind: String,
    pub attributes: Map<String, Value>,
    pub children: Vec<Child>,
    pub event_handlers: BTreeMap<String, EventTarget>,
    pub identity: Option<String>,
    pub error: Option<Value>,
    pub external_source: Option<ExternalSource>,
}

impl NodeData {
    /// First literal text child, if any.
    pub fn text_payload(&self) -> Option<&str> {
        self.children.iter().find_map(|child| match child {
            Child::Text(text) => Some(text.as_str()),
            Child::Node(_) => None,
        })
    }
}

#[derive(Debug)]
pub struct ViewTree {
    nodes: HashMap<NodeId, NodeData>,
    root: NodeId,
    next_id: u64,
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTree {
    pub fn new() -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, NodeData::default());

        Self {
            nodes,
            root,
            next_id: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Copies `model` into the arena as a detached subtree.
    pub fn insert(&mut self, model: &Model) -> NodeId {
        let id = self.allocate();
        let mut data = NodeData::default();
        self.assign(&mut data, model, true);
        self.nodes.insert(id, data);
        id
    }

    /// Overwrites every field of `id`; fields `model` omits are cleared.
    pub fn replace(&mut self, id: NodeId, model: &Model) -> bool {
        self.update(id, model, true)
    }

    /// Overwrites only the fields `model` carries.
    pub fn merge(&mut self, id: NodeId, model: &Model) -> bool {
        self.update(id, model, false)
    }

    /// Drops `id` and everything below it.
    pub fn remove(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(data) = self.nodes.remove(&next) {
                pending.extend(child_ids(&data.children));
            }
        }
    }

    pub fn resolve(&self, path: &str) -> Result<NodeId, PathError> {
        let steps = parse_path(path)?;
        let mut current = self.root;
        let mut iter = steps.iter();

        while let Some(step) = iter.next() {
            if step != "children" {
                return Err(PathError::UnknownField {
                    step: step.clone(),
                    path: path.to_string(),
                });
            }

            let index_step = iter.next().ok_or_else(|| PathError::Incomplete {
                path: path.to_string(),
            })?;
            let index = index_step
                .parse::<usize>()
                .map_err(|_| PathError::InvalidIndex {
                    step: index_step.clone(),
                    path: path.to_string(),
                })?;

            let data = self.nodes.get(&current).ok_or_else(|| PathError::Incomplete {
                path: path.to_string(),
            })?;

            current = match data.children.get(index) {
                Some(Child::Node(child)) => *child,
                Some(Child::Text(_)) => {
                    return Err(PathError::TextChild {
                        index,
                        path: path.to_string(),
                    });
                }
                None => {
                    return Err(PathError::IndexOutOfBounds {
                        index,
                        path: path.to_string(),
                    });
                }
            };
        }

        Ok(current)
    }

    /// Rebuilds the wire form of `id` and its subtree.
    pub fn to_model(&self, id: NodeId) -> Option<Model> {
        let data = self.nodes.get(&id)?;
        let children = data
            .children
            .iter()
            .filter_map(|child| match child {
                Child::Text(text) => Some(ModelChild::Text(text.clone())),
                Child::Node(node) => self.to_model(*node).map(ModelChild::Node),
            })
            .collect::<Vec<_>>();

        Some(Model {
            tag_name: Some(data.kind.clone()),
            key: data.identity.clone(),
            attributes: (!data.attributes.is_empty()).then(|| data.attributes.clone()),
            children: (!children.is_empty()).then_some(children),
            event_handlers: (!data.event_handlers.is_empty())
                .then(|| data.event_handlers.clone()),
            error: data.error.clone(),
            import_source: data.external_source.clone(),
        })
    }

    /// Whether `id` can be reached from the root through children.
    pub fn is_reachable(&self, id: NodeId) -> bool {
        let mut pending = vec![self.root];
        while let Some(next) = pending.pop() {
            if next == id {
                return true;
            }
            if let Some(data) = self.nodes.get(&next) {
                pending.extend(child_ids(&data.children));
            }
        }
        false
    }

    fn update(&mut self, id: NodeId, model: &Model, reset_absent: bool) -> bool {
        let Some(mut data) = self.nodes.remove(&id) else {
            return false;
        };

        self.assign(&mut data, model, reset_absent);
        self.nodes.insert(id, data);
        true
    }

    fn assign(&mut self, data: &mut NodeData, model: &Model, reset_absent: bool) {
        if let Some(kind) = &model.tag_name {
            data.kind = kind.clone();
        } else if reset_absent {
            data.kind.clear();
        }

        if model.key.is_some() || reset_absent {
            data.identity = model.key.clone();
        }

        if let Some(attributes) = &model.attributes {
            data.attributes = attributes.clone();
        } else if reset_absent {
            data.attributes.clear();
        }

        if let Some(handlers) = &model.event_handlers {
            data.event_handlers = handlers.clone();
        } else if reset_absent {
            data.event_handlers.clear();
        }

        if model.error.is_some() || reset_absent {
            data.error = model.error.clone();
        }

        if model.import_source.is_some() || reset_absent {
            data.external_source = model.import_source.clone();
        }

        if model.children.is_some() || reset_absent {
            let previous = child_ids(&data.children).collect::<Vec<_>>();
            let mut reusable = self.keyed_children(&data.children);

            data.children = model
                .children
                .iter()
                .flatten()
                .enumerate()
                .map(|(position, child)| match child {
                    ModelChild::Text(text) => Child::Text(text.clone()),
                    ModelChild::Node(node) => {
                        let key = ChildKey::new(node.key.as_deref(), position);
                        match reusable.remove(&key) {
                            Some(existing) => {
                                self.update(existing, node, true);
                                Child::Node(existing)
                            }
                            None => Child::Node(self.insert(node)),
                        }
                    }
                })
                .collect();

            let kept = child_ids(&data.children).collect::<HashSet<_>>();
            for stale in previous.into_iter().filter(|id| !kept.contains(id)) {
                self.remove(stale);
            }
        }
    }

    fn keyed_children(&self, children: &[Child]) -> HashMap<ChildKey, NodeId> {
        children
            .iter()
            .enumerate()
            .filter_map(|(position, child)| match child {
                Child::Node(id) => {
                    let identity = self.nodes.get(id).and_then(|n| n.identity.as_deref());
                    Some((ChildKey::new(identity, position), *id))
                }
                Child::Text(_) => None,
            })
            .collect()
    }

    fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }
}

fn child_ids(children: &[Child]) -> impl Iterator<Item = NodeId> + '_ {
    children.iter().filter_map(|child| match child {
        Child::Node(id) => Some(*id),
        Child::Text(_) => None,
    })
}

fn parse_path(path: &str) -> Result<Vec<String>, PathError> {
    if path.is_empty() {
        return Ok(vec![]);
    }

    path.strip_prefix('/')
        .unwrap_or(path)
        .split('/')
        .map(unescape_step)
        .collect()
}

fn unescape_step(step: &str) -> Result<String, PathError> {
    let mut out = String::with_capacity(step.len());
    let mut chars = step.chars();

    while let Some(ch) = chars.next() {
        if ch == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                Some(other) => return Err(PathError::InvalidEscape(other)),
                None => return Err(PathError::TrailingEscape),
            }
        } else {
            out.push(ch);
        }
    }

    Ok(out)
}
