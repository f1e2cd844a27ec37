//! Default conversion of node attributes into element props.
//!
//! Plain attributes pass through unchanged. Event callbacks come from the
//! node's `eventHandlers` table and from attributes named like DOM events
//! (`onClick`, `onChange`, ...) whose value is a callback identifier.

use crate::client::EventSender;
use crate::model::EventTarget;
use crate::protocol::event_envelope;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementProps {
    pub attributes: Map<String, Value>,
    pub events: Vec<EventBinding>,
}

impl ElementProps {
    pub fn event(&self, name: &str) -> Option<&EventBinding> {
        self.events.iter().find(|binding| binding.name == name)
    }
}

/// A locally callable handle for a remote event callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub name: String,
    pub target: String,
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventBinding {
    fn from_target(name: &str, target: &EventTarget) -> Self {
        Self {
            name: name.to_string(),
            target: target.target.clone(),
            prevent_default: target.prevent_default,
            stop_propagation: target.stop_propagation,
        }
    }

    pub fn fire(&self, events: &EventSender, data: Vec<Value>) {
        log::trace!("firing {} -> {}", self.name, self.target);
        events(event_envelope(self.target.clone(), data));
    }
}

pub fn element_props(
    attributes: &Map<String, Value>,
    event_handlers: &BTreeMap<String, EventTarget>,
) -> ElementProps {
    let mut props = ElementProps::default();

    for (name, value) in attributes {
        match value {
            Value::String(target) if is_event_name(name) => {
                if !event_handlers.contains_key(name) {
                    let target = EventTarget::new(target.clone());
                    props.events.push(EventBinding::from_target(name, &target));
                }
            }
            _ => {
                props.attributes.insert(name.clone(), value.clone());
            }
        }
    }

    props.events.extend(
        event_handlers
            .iter()
            .map(|(name, target)| EventBinding::from_target(name, target)),
    );
    props.events.sort_by(|a, b| a.name.cmp(&b.name));
    props
}

fn is_event_name(name: &str) -> bool {
    name.strip_prefix("on")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|first| first.is_ascii_uppercase())
}
