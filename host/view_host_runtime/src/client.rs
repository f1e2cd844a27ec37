use crate::host::HostBindings;
use crate::protocol::{HostEnvelope, LAYOUT_UPDATE, RemoteEnvelope};
use crate::render::Layout;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Outbound path for envelopes produced while rendering (event callbacks).
pub type EventSender = Rc<dyn Fn(HostEnvelope)>;

type MessageHandler = Rc<dyn Fn(&RemoteEnvelope)>;

/// The host side of the transport: fans inbound envelopes out to
/// subscribers by message type and forwards outbound envelopes to a sink.
#[derive(Clone)]
pub struct Client {
    inner: Rc<ClientInner>,
}

struct ClientInner {
    handlers: RefCell<Vec<(u64, String, MessageHandler)>>,
    next_subscription: Cell<u64>,
    sink: EventSender,
}

impl Client {
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(HostEnvelope) + 'static,
    {
        Self {
            inner: Rc::new(ClientInner {
                handlers: RefCell::new(Vec::new()),
                next_subscription: Cell::new(1),
                sink: Rc::new(sink),
            }),
        }
    }

    pub fn on_message<F>(&self, event_name: &str, handler: F) -> Subscription
    where
        F: Fn(&RemoteEnvelope) + 'static,
    {
        let id = self.inner.next_subscription.get();
        self.inner.next_subscription.set(id + 1);
        self.inner
            .handlers
            .borrow_mut()
            .push((id, event_name.to_string(), Rc::new(handler)));

        Subscription {
            id,
            client: Rc::downgrade(&self.inner),
        }
    }

    /// Delivers `envelope` to every handler subscribed to its type and
    /// returns how many ran.
    pub fn dispatch(&self, envelope: &RemoteEnvelope) -> usize {
        let name = envelope.event_name();
        let matching = self
            .inner
            .handlers
            .borrow()
            .iter()
            .filter(|(_, event_name, _)| event_name == name)
            .map(|(_, _, handler)| handler.clone())
            .collect::<Vec<_>>();

        if matching.is_empty() {
            log::debug!("no subscribers for {name}");
        }

        for handler in &matching {
            handler(envelope);
        }
        matching.len()
    }

    pub fn send(&self, envelope: HostEnvelope) {
        (self.inner.sink)(envelope);
    }

    pub fn sender(&self) -> EventSender {
        self.inner.sink.clone()
    }
}

/// Keeps a handler registered; dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    client: Weak<ClientInner>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(client) = self.client.upgrade() {
            client
                .handlers
                .borrow_mut()
                .retain(|(id, _, _)| *id != self.id);
        }
    }
}

/// Root mounting entry point: routes every `layout-update` the client
/// receives into `layout`.
pub fn mount_layout<H>(client: &Client, layout: Rc<RefCell<Layout<H>>>) -> Subscription
where
    H: HostBindings + 'static,
{
    client.on_message(LAYOUT_UPDATE, move |envelope| match envelope {
        RemoteEnvelope::LayoutUpdate(update) => {
            layout.borrow_mut().apply_update(update);
        }
    })
}
