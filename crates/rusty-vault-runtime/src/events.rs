use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::domain::{ListenerId, NodeId, Notification, NotificationHandler};
use crate::ports::{HostTree, PortError};

type ListenerSlot = Arc<Mutex<Option<ListenerId>>>;

fn take_listener(slot: &ListenerSlot) -> Option<ListenerId> {
    match slot.lock() {
        Ok(mut g) => g.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

/// Handle to a host listener. Dropping it unsubscribes, unless it already fired.
pub struct Subscription<H: HostTree> {
    host: H,
    slot: ListenerSlot,
}

impl<H: HostTree> Subscription<H> {
    pub fn is_active(&self) -> bool {
        match self.slot.lock() {
            Ok(g) => g.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}

impl<H: HostTree> Drop for Subscription<H> {
    fn drop(&mut self) {
        if let Some(id) = take_listener(&self.slot) {
            if let Err(e) = self.host.unsubscribe(id) {
                tracing::debug!(listener = id.0, error = %e, "unsubscribe on release failed");
            }
        }
    }
}

pub fn emit<H: HostTree>(
    host: &H,
    node: NodeId,
    name: &str,
    detail: Value,
    bubbles: bool,
) -> Result<(), PortError> {
    host.dispatch(
        Notification::new(name, node)
            .with_detail(detail)
            .bubbling(bubbles),
    )
}

pub fn listen_once<H, F>(
    host: &H,
    target: NodeId,
    name: &str,
    callback: F,
) -> Result<Subscription<H>, PortError>
where
    H: HostTree + Clone + Send + Sync + 'static,
    F: FnOnce(&Notification) + Send + 'static,
{
    listen_once_where(host, target, name, |_| true, callback)
}

/// Like [`listen_once`], but notifications rejected by `accept` are ignored and
/// do not consume the listener.
///
/// The listener is removed before `callback` runs, so a panicking callback
/// cannot leave it registered.
pub fn listen_once_where<H, P, F>(
    host: &H,
    target: NodeId,
    name: &str,
    accept: P,
    callback: F,
) -> Result<Subscription<H>, PortError>
where
    H: HostTree + Clone + Send + Sync + 'static,
    P: Fn(&Notification) -> bool + Send + Sync + 'static,
    F: FnOnce(&Notification) + Send + 'static,
{
    let slot: ListenerSlot = Arc::new(Mutex::new(None));
    let callback = Mutex::new(Some(callback));
    let handler_host = host.clone();
    let handler_slot = Arc::clone(&slot);

    let handler: NotificationHandler = Arc::new(move |notification: &Notification| {
        if !accept(notification) {
            return;
        }
        let Some(id) = take_listener(&handler_slot) else {
            return;
        };
        if let Err(e) = handler_host.unsubscribe(id) {
            tracing::warn!(listener = id.0, error = %e, "one-shot listener removal failed");
        }
        let callback = match callback.lock() {
            Ok(mut g) => g.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(callback) = callback {
            callback(notification);
        }
    });

    let id = host.subscribe(target, name, handler)?;
    match slot.lock() {
        Ok(mut g) => *g = Some(id),
        Err(poisoned) => *poisoned.into_inner() = Some(id),
    }
    Ok(Subscription {
        host: host.clone(),
        slot,
    })
}
