//! Recording doubles shared by the unit tests.

use crate::client::EventSender;
use crate::host::{
    Binding, BindingFactory, BindingRegistry, Container, HostBindings, LoadFuture, ScriptCallable,
};
use crate::model::{ExternalSource, Model};
use crate::protocol::HostEnvelope;
use crate::render::{Layout, View};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

#[derive(Default)]
pub(crate) struct TestHost {
    pub(crate) calls: Log,
    pub(crate) sent: Rc<RefCell<Vec<HostEnvelope>>>,
    registry: BindingRegistry,
}

impl TestHost {
    pub(crate) fn with_component(mut self, key: &str) -> Self {
        self.registry.register(
            key,
            Rc::new(RecordingFactory {
                key: key.to_string(),
                calls: self.calls.clone(),
            }),
        );
        self
    }
}

impl HostBindings for TestHost {
    fn load_external(&self, name: &str, source: &ExternalSource) -> LoadFuture {
        self.registry.resolve(name, source)
    }

    fn insert_script(&self, container: &Container, attributes: &Map<String, Value>, text: Option<&str>) {
        let names = attributes.keys().cloned().collect::<Vec<_>>().join(",");
        self.calls.borrow_mut().push(format!("insert {names}"));
        container.set_content(View::Text(text.unwrap_or_default().to_string()));
    }

    fn run_script(&self, source: &str) -> Option<ScriptCallable> {
        self.calls.borrow_mut().push(format!("run {source}"));
        let calls = self.calls.clone();
        let source = source.to_string();
        Some(Box::new(move || {
            calls.borrow_mut().push(format!("callable {source}"));
        }))
    }
}

struct RecordingFactory {
    key: String,
    calls: Log,
}

impl BindingFactory for RecordingFactory {
    fn mount(&self, container: &Container) -> Box<dyn Binding> {
        self.calls.borrow_mut().push(format!("mount {}", self.key));
        Box::new(RecordingBinding {
            key: self.key.clone(),
            calls: self.calls.clone(),
            container: container.clone(),
        })
    }
}

struct RecordingBinding {
    key: String,
    calls: Log,
    container: Container,
}

impl Binding for RecordingBinding {
    fn render(&mut self, model: &Model) {
        let tag = model.tag_name.clone().unwrap_or_default();
        self.calls.borrow_mut().push(format!("render {tag}"));
        self.container.set_content(View::Text(tag));
    }

    fn unmount(&mut self) {
        self.calls.borrow_mut().push(format!("unmount {}", self.key));
        self.container.clear();
    }
}

pub(crate) fn layout(host: TestHost) -> Layout<TestHost> {
    let sent = host.sent.clone();
    let events: EventSender = Rc::new(move |envelope: HostEnvelope| sent.borrow_mut().push(envelope));
    Layout::new(host, events)
}

/// All text in a view, concatenated in render order.
pub(crate) fn text_of(view: &View) -> String {
    match view {
        View::Empty => String::new(),
        View::Text(text) | View::Error(text) => text.clone(),
        View::Group(children) | View::Element { children, .. } => {
            children.iter().map(text_of).collect()
        }
        View::Container { content, .. } => content.as_deref().map(text_of).unwrap_or_default(),
    }
}
