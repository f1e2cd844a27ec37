use crate::host::{Container, HostBindings};
use crate::render::{InstanceId, Layout};
use crate::tree::NodeData;

pub(crate) struct ScriptState {
    pub(crate) container: Container,
    /// Identity the script last ran for; `None` until the first run.
    ran_for: Option<Option<String>>,
}

impl ScriptState {
    pub(crate) fn new(instance: InstanceId) -> Self {
        Self {
            container: Container::new(instance),
            ran_for: None,
        }
    }
}

impl<H: HostBindings> Layout<H> {
    /// Runs the script once per mount and again whenever the node's
    /// identity changes. Attribute-only updates do not re-run it.
    pub(crate) fn render_script(&mut self, data: &NodeData, mut state: ScriptState) -> ScriptState {
        if state.ran_for.as_ref() == Some(&data.identity) {
            return state;
        }

        let text = data.text_payload();
        if !data.attributes.is_empty() {
            state.container.clear();
            self.host.insert_script(&state.container, &data.attributes, text);
        } else if let Some(source) = text {
            log::debug!("running inline script ({} bytes)", source.len());
            if let Some(callable) = self.host.run_script(source) {
                callable();
            }
        }

        state.ran_for = Some(data.identity.clone());
        state
    }
}

#[cfg(test)]
mod tests {
    use crate::model::Model;
    use crate::protocol::LayoutUpdate;
    use crate::render::View;
    use crate::testing::{TestHost, layout};

    #[test]
    fn inline_script_runs_once_and_invokes_callable() {
        let host = TestHost::default();
        let calls = host.calls.clone();
        let mut layout = layout(host);

        layout.apply_update(&LayoutUpdate::new("", Model::element("script").with_text("init()")));
        layout.apply_update(&LayoutUpdate::new("", Model::element("script").with_text("init()")));

        assert_eq!(
            calls.borrow().as_slice(),
            &["run init()".to_string(), "callable init()".to_string()]
        );
    }

    #[test]
    fn identity_change_reruns_script() {
        let host = TestHost::default();
        let calls = host.calls.clone();
        let mut layout = layout(host);
        let script = |key: &str| Model::element("script").with_key(key).with_text("go()");

        layout.apply_update(&LayoutUpdate::new("", script("1")));
        layout.apply_update(&LayoutUpdate::new("", script("2")));

        let runs = calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with("run "))
            .count();
        assert_eq!(runs, 2);
    }

    #[test]
    fn attributed_script_is_inserted_into_container() {
        let host = TestHost::default();
        let calls = host.calls.clone();
        let mut layout = layout(host);

        layout.apply_update(&LayoutUpdate::new(
            "",
            Model::element("script").with_attribute("src", "/static/app.js"),
        ));

        assert_eq!(calls.borrow().as_slice(), &["insert src".to_string()]);
        match layout.view() {
            View::Container { content, .. } => assert!(content.is_some()),
            other => panic!("expected container, got {other:?}"),
        }

        layout.apply_update(&LayoutUpdate::new(
            "",
            Model::element("script")
                .with_attribute("src", "/static/app.js")
                .with_attribute("defer", true),
        ));
        assert_eq!(calls.borrow().len(), 1);
    }
}
