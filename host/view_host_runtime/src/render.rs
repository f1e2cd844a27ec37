//! Render instances and the views they produce.
//!
//! Every mounted instance represents one node and owns that node's handler
//! slot while mounted. A patch that reaches a node re-renders only the
//! owning instance and what sits below it.

use crate::attributes::{self, ElementProps};
use crate::client::EventSender;
use crate::dispatch::{self, ViewKind};
use crate::external::{ExternalState, Resolution};
use crate::handlers::HandlerRegistry;
use crate::host::HostBindings;
use crate::model::{self, Model, ModelChild};
use crate::script::ScriptState;
use crate::stateful::StatefulState;
use crate::tree::{Child, ChildKey, NodeData, NodeId, ViewTree};
use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures_executor::{LocalPool, LocalSpawner};
use serde_json::Value;
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

/// Snapshot of what the layout currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Empty,
    Text(String),
    Error(String),
    /// Children of a node with an empty kind, without a wrapper.
    Group(Vec<View>),
    Element {
        tag: String,
        key: Option<String>,
        props: ElementProps,
        children: Vec<View>,
    },
    /// Mount point owned by a script or external element.
    Container {
        instance: InstanceId,
        content: Option<Box<View>>,
    },
}

pub(crate) struct Instance {
    pub(crate) node: NodeId,
    pub(crate) renders: u64,
    pub(crate) strategy: Strategy,
}

pub(crate) enum Strategy {
    Unrendered,
    /// `None` when the node's error is present but falsy.
    Error(Option<String>),
    Standard(ElementState),
    Stateful(StatefulState),
    Script(ScriptState),
    External(ExternalState),
}

impl Strategy {
    fn kind(&self) -> Option<ViewKind> {
        match self {
            Strategy::Unrendered => None,
            Strategy::Error(_) => Some(ViewKind::Error),
            Strategy::Standard(_) => Some(ViewKind::Standard),
            Strategy::Stateful(_) => Some(ViewKind::Stateful),
            Strategy::Script(_) => Some(ViewKind::Script),
            Strategy::External(_) => Some(ViewKind::External),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ElementState {
    pub(crate) tag: String,
    pub(crate) key: Option<String>,
    pub(crate) props: ElementProps,
    pub(crate) children: Vec<Slot>,
}

#[derive(Debug)]
pub(crate) enum Slot {
    Text(String),
    Instance { key: ChildKey, id: InstanceId },
}

pub struct Layout<H> {
    pub(crate) host: H,
    pub(crate) tree: ViewTree,
    pub(crate) handlers: HandlerRegistry<InstanceId>,
    pub(crate) instances: HashMap<InstanceId, Instance>,
    pub(crate) events: EventSender,
    pub(crate) pool: LocalPool,
    pub(crate) spawner: LocalSpawner,
    pub(crate) resolved_tx: UnboundedSender<Resolution>,
    pub(crate) resolved_rx: UnboundedReceiver<Resolution>,
    pub(crate) loads_in_flight: Rc<Cell<usize>>,
    root_instance: InstanceId,
    next_instance: u64,
}

impl<H: HostBindings> Layout<H> {
    /// Creates an empty tree with the top-level instance mounted on its root.
    pub fn new(host: H, events: EventSender) -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        let (resolved_tx, resolved_rx) = mpsc::unbounded();
        let tree = ViewTree::new();
        let root_node = tree.root();

        let mut layout = Self {
            host,
            tree,
            handlers: HandlerRegistry::new(),
            instances: HashMap::new(),
            events,
            pool,
            spawner,
            resolved_tx,
            resolved_rx,
            loads_in_flight: Rc::new(Cell::new(0)),
            root_instance: InstanceId(0),
            next_instance: 0,
        };
        layout.root_instance = layout.mount_instance(root_node);
        layout
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    pub fn root_instance(&self) -> InstanceId {
        self.root_instance
    }

    /// The instance currently holding `node`'s handler slot.
    pub fn instance_for(&self, node: NodeId) -> Option<InstanceId> {
        self.handlers.owner(node)
    }

    pub fn node_of(&self, instance: InstanceId) -> Option<NodeId> {
        self.instances.get(&instance).map(|instance| instance.node)
    }

    pub fn is_mounted(&self, instance: InstanceId) -> bool {
        self.instances.contains_key(&instance)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// How many times `instance` has rendered since it mounted.
    pub fn render_count(&self, instance: InstanceId) -> u64 {
        self.instances
            .get(&instance)
            .map_or(0, |instance| instance.renders)
    }

    pub fn view(&self) -> View {
        self.view_of(self.root_instance)
    }

    /// Fires the remote callback `name` attached to `instance`'s element.
    pub fn dispatch_event(&self, instance: InstanceId, name: &str, data: Vec<Value>) -> bool {
        let props = match self.instances.get(&instance).map(|i| &i.strategy) {
            Some(Strategy::Standard(element)) => &element.props,
            Some(Strategy::Stateful(state)) => &state.element.props,
            _ => return false,
        };

        match props.event(name) {
            Some(binding) => {
                binding.fire(&self.events, data);
                true
            }
            None => false,
        }
    }

    /// Unmounts every instance, releasing external bindings.
    pub fn shutdown(&mut self) {
        let root = self.root_instance;
        self.unmount_instance(root);
    }

    pub(crate) fn mount_instance(&mut self, node: NodeId) -> InstanceId {
        let id = InstanceId(self.next_instance);
        self.next_instance += 1;

        self.instances.insert(
            id,
            Instance {
                node,
                renders: 0,
                strategy: Strategy::Unrendered,
            },
        );
        self.handlers.install(node, id);
        log::trace!("mounted {id} for {node}");

        self.render_instance(id);
        id
    }

    pub(crate) fn unmount_instance(&mut self, id: InstanceId) {
        let Some(instance) = self.instances.remove(&id) else {
            return;
        };

        self.teardown(id, instance.strategy);
        self.handlers.remove(instance.node, id);
        log::trace!("unmounted {id}");
    }

    /// Handler effect: merge `model` into the instance's node, then
    /// re-render that instance alone.
    pub(crate) fn update_instance(&mut self, id: InstanceId, model: &Model) -> bool {
        let Some(node) = self.node_of(id) else {
            return false;
        };

        self.tree.merge(node, model);
        self.render_instance(id);
        true
    }

    pub(crate) fn render_instance(&mut self, id: InstanceId) {
        let Some(instance) = self.instances.get_mut(&id) else {
            return;
        };
        let node = instance.node;
        let previous = mem::replace(&mut instance.strategy, Strategy::Unrendered);

        let Some(data) = self.tree.get(node).cloned() else {
            log::warn!("{id} refers to missing node {node}");
            self.teardown(id, previous);
            return;
        };

        let kind = dispatch::classify(&data);
        let previous = if previous.kind() == Some(kind) {
            previous
        } else {
            self.teardown(id, previous);
            Strategy::Unrendered
        };

        let next = match (kind, previous) {
            (ViewKind::Error, _) => Strategy::Error(error_message(&data)),
            (ViewKind::Standard, Strategy::Standard(element)) => {
                Strategy::Standard(self.render_element(&data, element))
            }
            (ViewKind::Standard, _) => {
                Strategy::Standard(self.render_element(&data, ElementState::default()))
            }
            (ViewKind::Stateful, Strategy::Stateful(state)) => {
                Strategy::Stateful(self.render_stateful(&data, state))
            }
            (ViewKind::Stateful, _) => {
                Strategy::Stateful(self.render_stateful(&data, StatefulState::default()))
            }
            (ViewKind::Script, Strategy::Script(state)) => {
                Strategy::Script(self.render_script(&data, state))
            }
            (ViewKind::Script, _) => {
                Strategy::Script(self.render_script(&data, ScriptState::new(id)))
            }
            (ViewKind::External, previous) => match &data.external_source {
                Some(source) => {
                    let previous = match previous {
                        Strategy::External(state) => Some(state),
                        _ => None,
                    };
                    Strategy::External(self.render_external(id, node, &data, source, previous))
                }
                None => Strategy::Unrendered,
            },
        };

        if let Some(instance) = self.instances.get_mut(&id) {
            instance.strategy = next;
            instance.renders += 1;
            log::trace!("rendered {id} ({kind:?}) pass {}", instance.renders);
        }
    }

    /// Renders a plain element, reusing child instances whose key (identity
    /// or position) is still present.
    pub(crate) fn render_element(&mut self, data: &NodeData, previous: ElementState) -> ElementState {
        let props = self.host.element_props(data);

        let mut reusable = HashMap::new();
        let mut stale = Vec::new();
        for slot in previous.children {
            if let Slot::Instance { key, id } = slot {
                if let Some(duplicate) = reusable.insert(key, id) {
                    stale.push(duplicate);
                }
            }
        }

        let mut children = Vec::with_capacity(data.children.len());
        for (position, child) in data.children.iter().enumerate() {
            match child {
                Child::Text(text) => children.push(Slot::Text(text.clone())),
                Child::Node(node) => {
                    let identity = self.tree.get(*node).and_then(|n| n.identity.clone());
                    let key = ChildKey::new(identity.as_deref(), position);
                    let id = match reusable.remove(&key) {
                        Some(id) => {
                            self.retarget(id, *node);
                            self.render_instance(id);
                            id
                        }
                        None => self.mount_instance(*node),
                    };
                    children.push(Slot::Instance { key, id });
                }
            }
        }

        stale.extend(reusable.into_values());
        for id in stale {
            self.unmount_instance(id);
        }

        ElementState {
            tag: data.kind.clone(),
            key: data.identity.clone(),
            props,
            children,
        }
    }

    pub(crate) fn element_view(&self, element: &ElementState) -> View {
        let children = element
            .children
            .iter()
            .map(|slot| match slot {
                Slot::Text(text) => View::Text(text.clone()),
                Slot::Instance { id, .. } => self.view_of(*id),
            })
            .collect();

        if element.tag.is_empty() {
            View::Group(children)
        } else {
            View::Element {
                tag: element.tag.clone(),
                key: element.key.clone(),
                props: element.props.clone(),
                children,
            }
        }
    }

    fn view_of(&self, id: InstanceId) -> View {
        let Some(instance) = self.instances.get(&id) else {
            return View::Empty;
        };

        match &instance.strategy {
            Strategy::Unrendered | Strategy::Error(None) => View::Empty,
            Strategy::Error(Some(message)) => View::Error(message.clone()),
            Strategy::Standard(element) => self.element_view(element),
            Strategy::Stateful(state) => self.stateful_view(state),
            Strategy::Script(state) => View::Container {
                instance: id,
                content: state.container.content().map(Box::new),
            },
            Strategy::External(state) => self.external_view(id, state),
        }
    }

    fn retarget(&mut self, id: InstanceId, node: NodeId) {
        let Some(instance) = self.instances.get_mut(&id) else {
            return;
        };
        if instance.node == node {
            return;
        }

        let previous = mem::replace(&mut instance.node, node);
        self.handlers.remove(previous, id);
        self.handlers.install(node, id);
    }

    fn teardown(&mut self, id: InstanceId, strategy: Strategy) {
        match strategy {
            Strategy::Standard(element) => self.unmount_children(element.children),
            Strategy::Stateful(state) => self.unmount_children(state.element.children),
            Strategy::Script(state) => state.container.clear(),
            Strategy::External(state) => {
                log::trace!("releasing external binding of {id}");
                state.release();
            }
            Strategy::Unrendered | Strategy::Error(_) => {}
        }
    }

    fn unmount_children(&mut self, children: Vec<Slot>) {
        for slot in children {
            if let Slot::Instance { id, .. } = slot {
                self.unmount_instance(id);
            }
        }
    }
}

/// Renders a model that has no live instance behind it, such as a
/// structured fallback.
pub fn static_view(model: &Model) -> View {
    let tag = model.tag_name.clone().unwrap_or_default();
    let children = model
        .children
        .iter()
        .flatten()
        .map(|child| match child {
            ModelChild::Text(text) => View::Text(text.clone()),
            ModelChild::Node(node) => static_view(node),
        })
        .collect();

    if tag.is_empty() {
        return View::Group(children);
    }

    let props = attributes::element_props(
        &model.attributes.clone().unwrap_or_default(),
        &model.event_handlers.clone().unwrap_or_default(),
    );

    View::Element {
        tag,
        key: model.key.clone(),
        props,
        children,
    }
}

fn error_message(data: &NodeData) -> Option<String> {
    let error = data.error.as_ref()?;
    if !model::is_truthy(error) {
        return None;
    }

    Some(match error {
        Value::String(message) => message.clone(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::LayoutUpdate;
    use crate::testing::{TestHost, layout, text_of};
    use serde_json::json;

    #[test]
    fn root_replacement_renders_new_children() {
        let mut layout = layout(TestHost::default());
        layout.apply_update(&LayoutUpdate::new("", Model::element("div").with_text("a")));
        layout.apply_update(&LayoutUpdate::new("", Model::element("div").with_text("b")));

        match layout.view() {
            View::Element { tag, children, .. } => {
                assert_eq!(tag, "div");
                assert_eq!(children, vec![View::Text("b".to_string())]);
            }
            other => panic!("expected div, got {other:?}"),
        }
    }

    #[test]
    fn empty_kind_renders_children_without_wrapper() {
        let mut layout = layout(TestHost::default());
        layout.apply_update(&LayoutUpdate::new(
            "",
            Model::default()
                .with_text("x")
                .with_child(Model::element("b").with_text("y")),
        ));

        match layout.view() {
            View::Group(children) => {
                assert_eq!(children.len(), 2);
                assert_eq!(children[0], View::Text("x".to_string()));
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn error_field_controls_rendering() {
        let mut layout = layout(TestHost::default());

        layout.apply_update(&LayoutUpdate::new("", Model::element("div").with_error("boom")));
        assert_eq!(layout.view(), View::Error("boom".to_string()));

        layout.apply_update(&LayoutUpdate::new("", Model::element("div").with_error(false)));
        assert_eq!(layout.view(), View::Empty);

        layout.apply_update(&LayoutUpdate::new("", Model::element("div").with_text("ok")));
        assert_eq!(text_of(&layout.view()), "ok");
    }

    #[test]
    fn keyed_children_keep_instances_across_reorder() {
        let mut layout = layout(TestHost::default());
        let item = |key: &str| Model::element("li").with_key(key).with_text(key);

        layout.apply_update(&LayoutUpdate::new(
            "",
            Model::element("ul").with_child(item("a")).with_child(item("b")),
        ));
        let node_a = layout.tree().resolve("/children/0").expect("a");
        let instance_a = layout.instance_for(node_a).expect("a mounted");

        layout.apply_update(&LayoutUpdate::new(
            "",
            Model::element("ul")
                .with_child(item("c"))
                .with_child(item("b"))
                .with_child(item("a")),
        ));

        let moved = layout.tree().resolve("/children/2").expect("a moved");
        assert_eq!(moved, node_a);
        assert_eq!(layout.instance_for(moved), Some(instance_a));
        assert!(layout.is_mounted(instance_a));
        assert_eq!(text_of(&layout.view()), "cba");
    }

    #[test]
    fn removed_children_are_unmounted_and_release_slots() {
        let mut layout = layout(TestHost::default());
        layout.apply_update(&LayoutUpdate::new(
            "",
            Model::element("div")
                .with_child(Model::element("p").with_text("1"))
                .with_child(Model::element("p").with_text("2")),
        ));
        let second = layout.tree().resolve("/children/1").expect("second");
        let instance = layout.instance_for(second).expect("mounted");

        layout.apply_update(&LayoutUpdate::new(
            "",
            Model::element("div").with_child(Model::element("p").with_text("1")),
        ));

        assert!(!layout.is_mounted(instance));
        assert_eq!(layout.instance_for(second), None);
        assert_eq!(layout.instance_count(), 2);
    }

    #[test]
    fn second_instance_keeps_slot_when_first_unmounts() {
        let mut layout = layout(TestHost::default());
        layout.apply_update(&LayoutUpdate::new(
            "",
            Model::element("div").with_child(Model::element("p").with_key("x")),
        ));
        let node = layout.tree().resolve("/children/0").expect("p");
        let first = layout.instance_for(node).expect("first instance");

        let second = layout.mount_instance(node);
        assert_eq!(layout.instance_for(node), Some(second));

        layout.unmount_instance(first);
        assert_eq!(layout.instance_for(node), Some(second));

        layout.unmount_instance(second);
        assert_eq!(layout.instance_for(node), None);
    }

    #[test]
    fn events_fire_through_sender() {
        let host = TestHost::default();
        let sent = host.sent.clone();
        let mut layout = layout(host);
        layout.apply_update(&LayoutUpdate::new(
            "",
            Model::element("button").with_event("onClick", "click-1"),
        ));

        let root = layout.root_instance();
        assert!(layout.dispatch_event(root, "onClick", vec![json!({"button": 0})]));
        assert!(!layout.dispatch_event(root, "onHover", vec![]));
        assert_eq!(sent.borrow().len(), 1);
    }

    #[test]
    fn static_view_renders_structured_model() {
        let view = static_view(&Model::element("em").with_attribute("class", "x").with_text("wait"));
        match view {
            View::Element { tag, props, children, .. } => {
                assert_eq!(tag, "em");
                assert_eq!(props.attributes.get("class"), Some(&json!("x")));
                assert_eq!(children, vec![View::Text("wait".to_string())]);
            }
            other => panic!("expected element, got {other:?}"),
        }
    }
}
