//! Lifecycle of nodes backed by externally loaded component code.
//!
//! `Unbound -> Loading -> Bound -> Unmounted`. Loading runs on the layout's
//! local pool; the only cancellation is the `unmounted` flag captured when
//! the load starts, checked again when the result arrives.

use crate::host::{Binding, BindingFactory, Container, HostBindings};
use crate::model::{ExternalSource, Fallback};
use crate::render::{InstanceId, Layout, Strategy, View, static_view};
use crate::tree::{NodeData, NodeId};
use futures_util::task::LocalSpawnExt;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unbound,
    Loading,
    Bound,
    Unmounted,
}

pub(crate) struct ExternalState {
    source: ExternalSource,
    container: Container,
    unmounted: Rc<Cell<bool>>,
    binding: Option<Box<dyn Binding>>,
}

impl ExternalState {
    fn state(&self) -> BindingState {
        if self.unmounted.get() {
            BindingState::Unmounted
        } else if self.binding.is_some() {
            BindingState::Bound
        } else {
            BindingState::Loading
        }
    }

    /// Marks the mount dead before anything else so a late resolution is
    /// ignored. Bindings that unmount after every render are not unmounted
    /// again here.
    pub(crate) fn release(mut self) {
        self.unmounted.set(true);
        if let Some(mut binding) = self.binding.take() {
            if !self.source.unmount_before_update {
                binding.unmount();
            }
        }
        self.container.clear();
    }
}

/// A finished load waiting to be bound.
pub(crate) struct Resolution {
    instance: InstanceId,
    unmounted: Rc<Cell<bool>>,
    factory: Rc<dyn BindingFactory>,
}

impl<H: HostBindings> Layout<H> {
    pub(crate) fn render_external(
        &mut self,
        id: InstanceId,
        node: NodeId,
        data: &NodeData,
        source: &ExternalSource,
        previous: Option<ExternalState>,
    ) -> ExternalState {
        let mut state = match previous {
            Some(state) if state.source == *source => state,
            Some(stale) => {
                log::debug!("external source of {id} changed; remounting");
                stale.release();
                self.begin_load(id, &data.kind, source)
            }
            None => self.begin_load(id, &data.kind, source),
        };

        self.render_binding(node, &mut state);
        state
    }

    pub(crate) fn external_view(&self, id: InstanceId, state: &ExternalState) -> View {
        if state.binding.is_some() {
            return View::Container {
                instance: id,
                content: state.container.content().map(Box::new),
            };
        }

        match &state.source.fallback {
            Some(Fallback::Text(text)) => View::Text(text.clone()),
            Some(Fallback::Model(model)) => static_view(model),
            None => View::Empty,
        }
    }

    pub fn binding_state(&self, instance: InstanceId) -> Option<BindingState> {
        let entry = self.instances.get(&instance)?;
        Some(match &entry.strategy {
            Strategy::External(state) => state.state(),
            _ => BindingState::Unbound,
        })
    }

    /// Whether any external component load is still outstanding.
    pub fn has_pending_loads(&self) -> bool {
        self.loads_in_flight.get() > 0
    }

    /// Drives pending loads as far as they can go without blocking and binds
    /// every result whose mount is still alive. Returns how many bound.
    pub fn run_until_stalled(&mut self) -> usize {
        self.pool.run_until_stalled();

        let mut bound = 0;
        while let Ok(Some(resolution)) = self.resolved_rx.try_next() {
            if self.bind(resolution) {
                bound += 1;
            }
        }
        bound
    }

    fn begin_load(&mut self, id: InstanceId, kind: &str, source: &ExternalSource) -> ExternalState {
        let unmounted = Rc::new(Cell::new(false));
        let name = source.name.clone().unwrap_or_else(|| kind.to_string());
        let load = self.host.load_external(&name, source);

        let flag = unmounted.clone();
        let resolved = self.resolved_tx.clone();
        let in_flight = self.loads_in_flight.clone();
        in_flight.set(in_flight.get() + 1);

        let task = async move {
            let result = load.await;
            in_flight.set(in_flight.get() - 1);

            match result {
                Ok(_) if flag.get() => {
                    log::debug!("'{name}' resolved after {id} unmounted; ignoring");
                }
                Ok(factory) => {
                    let resolution = Resolution {
                        instance: id,
                        unmounted: flag,
                        factory,
                    };
                    if resolved.unbounded_send(resolution).is_err() {
                        log::debug!("layout dropped before '{name}' resolved");
                    }
                }
                Err(err) => log::warn!("external component '{name}' for {id} failed: {err}"),
            }
        };

        if let Err(err) = self.spawner.spawn_local(task) {
            log::warn!("could not schedule external load for {id}: {err}");
        }

        ExternalState {
            source: source.clone(),
            container: Container::new(id),
            unmounted,
            binding: None,
        }
    }

    fn bind(&mut self, resolution: Resolution) -> bool {
        if resolution.unmounted.get() {
            return false;
        }

        let Some(entry) = self.instances.get_mut(&resolution.instance) else {
            return false;
        };
        let Strategy::External(state) = &mut entry.strategy else {
            return false;
        };
        if !Rc::ptr_eq(&state.unmounted, &resolution.unmounted) || state.binding.is_some() {
            return false;
        }

        state.binding = Some(resolution.factory.mount(&state.container));
        log::debug!("{} bound", resolution.instance);

        self.render_instance(resolution.instance);
        true
    }

    fn render_binding(&self, node: NodeId, state: &mut ExternalState) {
        let Some(binding) = state.binding.as_mut() else {
            return;
        };
        let Some(model) = self.tree.to_model(node) else {
            return;
        };

        binding.render(&model);
        if state.source.unmount_before_update {
            binding.unmount();
        }
    }
}
