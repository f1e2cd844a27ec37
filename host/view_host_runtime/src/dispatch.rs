use crate::tree::NodeData;

/// Interactive primitives that buffer their displayed value locally.
pub const STATEFUL_KINDS: [&str; 3] = ["input", "textarea", "select"];

pub const SCRIPT_KIND: &str = "script";

/// Rendering strategy for a node, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Error,
    Stateful,
    Script,
    External,
    Standard,
}

pub fn classify(node: &NodeData) -> ViewKind {
    if node.error.is_some() {
        ViewKind::Error
    } else if STATEFUL_KINDS.contains(&node.kind.as_str()) {
        ViewKind::Stateful
    } else if node.kind == SCRIPT_KIND {
        ViewKind::Script
    } else if node.external_source.is_some() {
        ViewKind::External
    } else {
        ViewKind::Standard
    }
}
