pub mod attributes;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod external;
pub mod handlers;
pub mod host;
pub mod model;
pub mod protocol;
pub mod render;
pub mod router;
pub mod script;
pub mod stateful;
pub mod tree;

#[cfg(test)]
mod testing;

use crate::protocol::{reader_loop, ready_envelope, writer_loop};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::thread;
use std::time::Duration;

pub use crate::client::{Client, EventSender, Subscription, mount_layout};
pub use crate::config::HostConfig;
pub use crate::error::{ConfigError, LoadError, PathError, ProtocolError};
pub use crate::external::BindingState;
pub use crate::host::{
    Binding, BindingFactory, BindingRegistry, Container, HostBindings, LoadFuture, ScriptCallable,
};
pub use crate::model::{ExternalSource, Fallback, Model, ModelChild, SourceType};
pub use crate::protocol::{HostEnvelope, LayoutUpdate, RemoteEnvelope};
pub use crate::render::{InstanceId, Layout, View};
pub use crate::router::PatchOutcome;
pub use crate::tree::{NodeData, NodeId, ViewTree};
pub use serde_json;

/// How often pending external loads are polled while no update arrives.
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Runs a host session over stdio: announces itself, then applies every
/// inbound update in arrival order on this thread and hands each changed
/// view to `present`.
pub fn run<H, P>(host: H, config: HostConfig, mut present: P) -> Result<(), Box<dyn std::error::Error>>
where
    H: HostBindings + 'static,
    P: FnMut(&View),
{
    let queue_capacity = config.outbound_queue_cap;
    let dropped_event_count = Arc::new(AtomicU64::new(0));
    let (tx, rx) = mpsc::sync_channel(queue_capacity);

    let writer_handle = thread::spawn(move || writer_loop(rx));

    tx.send(ready_envelope(config.sid.clone()))
        .map_err(|_| "failed to queue ready envelope")?;

    let (inbound_tx, inbound_rx) = mpsc::channel();
    let reader_handle = thread::spawn(move || {
        let read_result = reader_loop(|envelope| {
            if inbound_tx.send(envelope).is_err() {
                log::debug!("layout loop gone; discarding inbound envelope");
            }
        });

        if let Err(err) = &read_result {
            log::error!("reader loop terminated with error: {err}");
        }

        read_result
    });

    let sink_tx = tx.clone();
    let sink_drop_count = dropped_event_count.clone();
    let client = Client::new(move |envelope| {
        send_envelope(&sink_tx, envelope, &sink_drop_count, queue_capacity);
    });
    let layout = Rc::new(RefCell::new(Layout::new(host, client.sender())));
    let subscription = mount_layout(&client, layout.clone());
    log::info!("session {} ready", config.sid);

    let mut last_view = None;
    loop {
        let pending_loads = layout.borrow().has_pending_loads();
        let next = if pending_loads {
            match inbound_rx.recv_timeout(LOAD_POLL_INTERVAL) {
                Ok(envelope) => Some(envelope),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match inbound_rx.recv() {
                Ok(envelope) => Some(envelope),
                Err(_) => break,
            }
        };

        if let Some(envelope) = next {
            client.dispatch(&envelope);
        }
        layout.borrow_mut().run_until_stalled();

        let view = layout.borrow().view();
        if last_view.as_ref() != Some(&view) {
            present(&view);
            last_view = Some(view);
        }
    }

    log::info!("inbound stream closed; shutting down");

    // Release every clone of the outbound sender so the writer loop ends.
    drop(subscription);
    layout.borrow_mut().shutdown();
    drop(layout);
    drop(client);
    drop(tx);

    if reader_handle.is_finished() {
        match reader_handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::error!("reader thread returned error: {err}"),
            Err(err) => log::error!("reader thread join failed: {err:?}"),
        }
    } else {
        log::warn!("reader thread still active during shutdown; skipping join");
    }

    match writer_handle.join() {
        Ok(Ok(())) => {}
        Ok(Err(err)) => log::error!("writer thread returned error: {err}"),
        Err(err) => log::error!("writer thread join failed: {err:?}"),
    }

    let dropped = dropped_event_count.load(Ordering::Relaxed);
    if dropped > 0 {
        log::warn!("{dropped} outbound envelope(s) were dropped this session");
    }

    Ok(())
}

fn send_envelope(
    tx: &SyncSender<HostEnvelope>,
    envelope: HostEnvelope,
    dropped_count: &AtomicU64,
    queue_capacity: usize,
) {
    match tx.try_send(envelope) {
        Ok(()) => {}
        Err(TrySendError::Full(_envelope)) => {
            let dropped = dropped_count.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped == 1 || dropped.is_power_of_two() {
                log::warn!("outbound queue full (cap={queue_capacity}); dropped {dropped} envelope(s)");
            }
        }
        Err(TrySendError::Disconnected(_envelope)) => {
            log::warn!("failed to queue outbound envelope: writer is gone");
        }
    }
}
