//! Interactive elements that show a locally buffered value.
//!
//! Keystrokes update the local copy immediately; the remote value wins again
//! whenever the remote side sends a different one.

use crate::host::HostBindings;
use crate::render::{ElementState, InstanceId, Layout, Strategy, View};
use crate::tree::NodeData;
use serde_json::{Value, json};
use std::mem;

const VALUE_ATTRIBUTE: &str = "value";
const CHANGE_EVENT: &str = "onChange";

#[derive(Debug, Default)]
pub(crate) struct StatefulState {
    pub(crate) element: ElementState,
    remote_value: Option<Value>,
    local_value: Option<Value>,
}

impl<H: HostBindings> Layout<H> {
    pub(crate) fn render_stateful(&mut self, data: &NodeData, mut state: StatefulState) -> StatefulState {
        let element = mem::take(&mut state.element);
        state.element = self.render_element(data, element);

        let remote = data.attributes.get(VALUE_ATTRIBUTE).cloned();
        if remote != state.remote_value {
            state.local_value = remote.clone();
            state.remote_value = remote;
        }
        state
    }

    pub(crate) fn stateful_view(&self, state: &StatefulState) -> View {
        let mut view = self.element_view(&state.element);
        if let View::Element { props, .. } = &mut view {
            match &state.local_value {
                Some(value) => {
                    props
                        .attributes
                        .insert(VALUE_ATTRIBUTE.to_string(), value.clone());
                }
                None => {
                    props.attributes.remove(VALUE_ATTRIBUTE);
                }
            }
        }
        view
    }

    /// Applies a local edit: the displayed value changes at once, then the
    /// remote `onChange` callback (if any) hears about it.
    pub fn input_changed(&mut self, instance: InstanceId, value: Value) -> bool {
        let Some(entry) = self.instances.get_mut(&instance) else {
            return false;
        };
        let Strategy::Stateful(state) = &mut entry.strategy else {
            return false;
        };

        state.local_value = Some(value.clone());
        let on_change = state.element.props.event(CHANGE_EVENT).cloned();
        entry.renders += 1;

        if let Some(binding) = on_change {
            binding.fire(&self.events, vec![json!({ "target": { "value": value } })]);
        }
        true
    }

    pub fn local_value(&self, instance: InstanceId) -> Option<Value> {
        match self.instances.get(&instance).map(|entry| &entry.strategy) {
            Some(Strategy::Stateful(state)) => state.local_value.clone(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::Model;
    use crate::protocol::{HostEnvelope, LayoutUpdate};
    use crate::render::View;
    use crate::testing::{TestHost, layout};
    use serde_json::json;

    fn input(value: &str) -> Model {
        Model::element("input")
            .with_attribute("value", value)
            .with_event("onChange", "change-1")
    }

    #[test]
    fn local_edit_shows_before_remote_round_trip() {
        let host = TestHost::default();
        let sent = host.sent.clone();
        let mut layout = layout(host);
        layout.apply_update(&LayoutUpdate::new("", input("a")));
        let root = layout.root_instance();
        let renders = layout.render_count(root);

        assert!(layout.input_changed(root, json!("ab")));

        assert_eq!(layout.local_value(root), Some(json!("ab")));
        assert_eq!(layout.render_count(root), renders + 1);
        match layout.view() {
            View::Element { props, .. } => assert_eq!(props.attributes["value"], json!("ab")),
            other => panic!("expected input, got {other:?}"),
        }
        assert_eq!(
            sent.borrow().as_slice(),
            &[HostEnvelope::LayoutEvent {
                target: "change-1".to_string(),
                data: vec![json!({"target": {"value": "ab"}})],
            }]
        );
    }

    #[test]
    fn remote_value_change_resyncs_local_copy() {
        let mut layout = layout(TestHost::default());
        layout.apply_update(&LayoutUpdate::new("", input("a")));
        let root = layout.root_instance();

        layout.input_changed(root, json!("abc"));
        layout.apply_update(&LayoutUpdate::new("", input("AB")));

        assert_eq!(layout.local_value(root), Some(json!("AB")));
    }

    #[test]
    fn unchanged_remote_value_keeps_local_edit() {
        let mut layout = layout(TestHost::default());
        layout.apply_update(&LayoutUpdate::new("", input("a")));
        let root = layout.root_instance();

        layout.input_changed(root, json!("abc"));
        layout.apply_update(&LayoutUpdate::new(
            "",
            input("a").with_attribute("placeholder", "type here"),
        ));

        assert_eq!(layout.local_value(root), Some(json!("abc")));
    }

    #[test]
    fn edits_without_change_callback_stay_local() {
        let host = TestHost::default();
        let sent = host.sent.clone();
        let mut layout = layout(host);
        layout.apply_update(&LayoutUpdate::new(
            "",
            Model::element("textarea").with_attribute("value", "x"),
        ));
        let root = layout.root_instance();

        assert!(layout.input_changed(root, json!("xy")));
        assert!(sent.borrow().is_empty());
    }

    #[test]
    fn non_stateful_instances_ignore_input() {
        let mut layout = layout(TestHost::default());
        layout.apply_update(&LayoutUpdate::new("", Model::element("div")));
        let root = layout.root_instance();
        assert!(!layout.input_changed(root, json!("x")));
    }
}
