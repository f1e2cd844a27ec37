//! Host collaborators for a terminal session: a registry of built-in
//! external components and a script surface without an engine.

use remote_view_runtime::serde_json::{self, Map, Value};
use remote_view_runtime::{
    Binding, BindingFactory, BindingRegistry, Container, ExternalSource, HostBindings, LoadFuture,
    Model, ScriptCallable, View,
};
use std::rc::Rc;

pub const JSON_VIEWER: &str = "json-viewer";

pub struct TerminalHost {
    registry: BindingRegistry,
}

impl TerminalHost {
    pub fn new() -> Self {
        let mut registry = BindingRegistry::new();
        registry.register(JSON_VIEWER, Rc::new(JsonViewerFactory));
        Self { registry }
    }
}

impl Default for TerminalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBindings for TerminalHost {
    fn load_external(&self, name: &str, source: &ExternalSource) -> LoadFuture {
        self.registry.resolve(name, source)
    }

    fn insert_script(&self, container: &Container, attributes: &Map<String, Value>, _text: Option<&str>) {
        let src = attributes
            .get("src")
            .and_then(Value::as_str)
            .unwrap_or("inline");
        log::info!("script element inserted ({src}); not executed by terminal host");
        container.set_content(View::Text(format!("[script {src}]")));
    }

    fn run_script(&self, source: &str) -> Option<ScriptCallable> {
        log::warn!("terminal host cannot execute scripts; skipped {} bytes", source.len());
        None
    }
}

/// Shows the attributes of its node as pretty-printed JSON.
struct JsonViewerFactory;

impl BindingFactory for JsonViewerFactory {
    fn mount(&self, container: &Container) -> Box<dyn Binding> {
        log::debug!("json viewer mounted into {}", container.instance());
        Box::new(JsonViewer {
            container: container.clone(),
        })
    }
}

struct JsonViewer {
    container: Container,
}

impl Binding for JsonViewer {
    fn render(&mut self, model: &Model) {
        let attributes = Value::Object(model.attributes.clone().unwrap_or_default());
        let text = serde_json::to_string_pretty(&attributes)
            .unwrap_or_else(|err| format!("<unprintable attributes: {err}>"));
        self.container.set_content(View::Text(text));
    }

    fn unmount(&mut self) {
        self.container.clear();
    }
}
