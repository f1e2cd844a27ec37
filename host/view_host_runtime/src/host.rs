//! Collaborators the layout drives but does not implement: attribute
//! conversion, external component loading and script execution.

use crate::attributes::{self, ElementProps};
use crate::error::LoadError;
use crate::model::{ExternalSource, Model, SourceType};
use crate::render::{InstanceId, View};
use crate::tree::NodeData;
use futures_util::future::{self, FutureExt, LocalBoxFuture};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type LoadFuture = LocalBoxFuture<'static, Result<Rc<dyn BindingFactory>, LoadError>>;

/// Callable produced by an inline script; invoked once right after the
/// script runs.
pub type ScriptCallable = Box<dyn FnOnce()>;

pub trait HostBindings {
    fn element_props(&self, node: &NodeData) -> ElementProps {
        attributes::element_props(&node.attributes, &node.event_handlers)
    }

    /// Starts resolving the external component `name` described by `source`.
    fn load_external(&self, name: &str, source: &ExternalSource) -> LoadFuture;

    /// Inserts a script-bearing element into `container`.
    fn insert_script(&self, container: &Container, attributes: &Map<String, Value>, text: Option<&str>);

    /// Executes `source` as a code body. Errors are the host's to report.
    fn run_script(&self, source: &str) -> Option<ScriptCallable>;
}

pub trait BindingFactory {
    fn mount(&self, container: &Container) -> Box<dyn Binding>;
}

/// A mounted foreign component, driven by the node's current state.
pub trait Binding {
    fn render(&mut self, model: &Model);
    fn unmount(&mut self);
}

/// Mount point handed to script and external elements. Whatever a
/// collaborator places here shows up in the layout's view snapshot.
#[derive(Debug, Clone)]
pub struct Container {
    instance: InstanceId,
    surface: Rc<RefCell<Option<View>>>,
}

impl Container {
    pub(crate) fn new(instance: InstanceId) -> Self {
        Self {
            instance,
            surface: Rc::new(RefCell::new(None)),
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn set_content(&self, view: View) {
        *self.surface.borrow_mut() = Some(view);
    }

    pub fn clear(&self) {
        self.surface.borrow_mut().take();
    }

    pub fn content(&self) -> Option<View> {
        self.surface.borrow().clone()
    }
}

/// Resolves external components registered under a key.
#[derive(Default, Clone)]
pub struct BindingRegistry {
    factories: HashMap<String, Rc<dyn BindingFactory>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: impl Into<String>, factory: Rc<dyn BindingFactory>) {
        self.factories.insert(key.into(), factory);
    }

    pub fn resolve(&self, name: &str, source: &ExternalSource) -> LoadFuture {
        let result = match source.source_type {
            SourceType::Name => self
                .factories
                .get(&source.source)
                .or_else(|| self.factories.get(name))
                .cloned()
                .ok_or_else(|| LoadError::NotFound(source.source.clone())),
            SourceType::Url => Err(LoadError::Unsupported(source.source.clone())),
        };
        future::ready(result).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_executor::block_on;

    struct Noop;

    impl Binding for Noop {
        fn render(&mut self, _model: &Model) {}
        fn unmount(&mut self) {}
    }

    struct NoopFactory;

    impl BindingFactory for NoopFactory {
        fn mount(&self, _container: &Container) -> Box<dyn Binding> {
            Box::new(Noop)
        }
    }

    #[test]
    fn registry_resolves_by_key_then_name() {
        let mut registry = BindingRegistry::new();
        registry.register("chart", Rc::new(NoopFactory));

        assert!(block_on(registry.resolve("Other", &ExternalSource::named("chart"))).is_ok());
        assert!(block_on(registry.resolve("chart", &ExternalSource::named("pkg"))).is_ok());
        assert!(matches!(
            block_on(registry.resolve("Other", &ExternalSource::named("missing"))),
            Err(LoadError::NotFound(key)) if key == "missing"
        ));
    }

    #[test]
    fn url_sources_are_unsupported() {
        let registry = BindingRegistry::new();
        let mut source = ExternalSource::named("https://cdn.example/x.js");
        source.source_type = SourceType::Url;

        assert!(matches!(
            block_on(registry.resolve("X", &source)),
            Err(LoadError::Unsupported(_))
        ));
    }

    #[test]
    fn container_surface_is_shared_between_clones() {
        let container = Container::new(InstanceId::from_raw(3));
        let clone = container.clone();

        clone.set_content(View::Text("hi".to_string()));
        assert_eq!(container.content(), Some(View::Text("hi".to_string())));

        container.clear();
        assert_eq!(clone.content(), None);
    }
}
