//! # In-Memory Transport
//!
//! Same-process implementation of both transport ports, standing in for a
//! process channel between isolated contexts.
//!
//! Each context owns an inbound FIFO queue. Sending never runs a listener
//! directly: it enqueues a delivery for the receiving context, which runs
//! its listeners when it is pumped ([`InMemoryHub::pump`] /
//! [`InMemoryPort::pump`]) or while its [`run`](InMemoryHub::run) loop is
//! active. Deliveries from one sender arrive in send order.
//!
//! Payloads are `serde_json::Value`, so nothing but plain data crosses a
//! context boundary.

use crate::error::TransportError;
use crate::listener::{InboundMessage, Listener, ListenerId, ListenerTable};
use crate::ports::{
    HandlerId, HostTransport, ListenerRegistry, RequestHandler, SubordinateTransport, SyncRequest,
    SyncRequestHandler,
};
use crate::registry::ChannelRegistrations;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use shared_types::EndpointId;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Weak};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

/// Work queued for the host context.
enum HostDelivery {
    Message(InboundMessage),
    Invoke {
        message: InboundMessage,
        reply: oneshot::Sender<Result<Value, TransportError>>,
    },
    InvokeSync {
        message: InboundMessage,
        reply: std_mpsc::SyncSender<Result<Value, TransportError>>,
    },
}

struct HubShared {
    listeners: Mutex<ListenerTable>,
    handlers: Mutex<HashMap<String, (HandlerId, RequestHandler)>>,
    sync_handlers: Mutex<HashMap<String, (HandlerId, SyncRequestHandler)>>,
    next_handler: AtomicU64,
    endpoints: RwLock<BTreeMap<EndpointId, mpsc::UnboundedSender<InboundMessage>>>,
    inbound_tx: mpsc::UnboundedSender<HostDelivery>,
    next_endpoint: AtomicU32,
    registrations: ChannelRegistrations,
    shutdown: watch::Sender<bool>,
}

impl HubShared {
    fn deliver(&self, delivery: HostDelivery) {
        match delivery {
            HostDelivery::Message(message) => emit(&self.listeners, &message),
            HostDelivery::Invoke { message, reply } => {
                let result = self.answer(&message);
                if reply.send(result).is_err() {
                    debug!(channel = %message.channel, "Requester went away before reply");
                }
            }
            HostDelivery::InvokeSync { message, reply } => {
                let channel = message.channel.clone();
                let result = self.answer_sync(message);
                if reply.send(result).is_err() {
                    debug!(channel = %channel, "Blocking requester went away before reply");
                }
            }
        }
    }

    fn answer(&self, message: &InboundMessage) -> Result<Value, TransportError> {
        let handler = self
            .handlers
            .lock()
            .get(&message.channel)
            .map(|(_, handler)| handler.clone());
        match handler {
            Some(handler) => handler(message),
            None => Err(TransportError::NoHandler {
                channel: message.channel.clone(),
            }),
        }
    }

    fn answer_sync(&self, message: InboundMessage) -> Result<Value, TransportError> {
        let handler = self
            .sync_handlers
            .lock()
            .get(&message.channel)
            .map(|(_, handler)| handler.clone());
        let Some(handler) = handler else {
            return Err(TransportError::NoHandler {
                channel: message.channel,
            });
        };
        let mut request = SyncRequest::new(message);
        handler(&mut request);
        Ok(request.into_return_value())
    }

    fn next_handler_id(&self) -> HandlerId {
        HandlerId(self.next_handler.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn disconnect(&self, endpoint: EndpointId) {
        if self.endpoints.write().remove(&endpoint).is_some() {
            debug!(%endpoint, "Endpoint disconnected");
        }
    }
}

/// Remove `channel`'s entry if `id` still owns it.
fn release_if_owned<H>(
    table: &Mutex<HashMap<String, (HandlerId, H)>>,
    channel: &str,
    id: HandlerId,
) -> bool {
    let mut table = table.lock();
    match table.get(channel) {
        Some((installed, _)) if *installed == id => table.remove(channel).is_some(),
        _ => false,
    }
}

/// Run every listener registered for the message's channel.
///
/// The table lock is released before listeners run, so a listener may add or
/// remove listeners without deadlocking.
fn emit(listeners: &Mutex<ListenerTable>, message: &InboundMessage) {
    let targets = listeners.lock().listeners_for(&message.channel);
    if targets.is_empty() {
        debug!(channel = %message.channel, sender = %message.sender, "No listeners for message");
    }
    for listener in targets {
        listener(message);
    }
}

/// Host end of the in-memory transport.
///
/// Cheap to clone; clones share the same queue and tables.
#[derive(Clone)]
pub struct InMemoryHub {
    shared: Arc<HubShared>,
    inbound_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<HostDelivery>>>,
}

impl InMemoryHub {
    #[must_use]
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        Self {
            shared: Arc::new(HubShared {
                listeners: Mutex::new(ListenerTable::new()),
                handlers: Mutex::new(HashMap::new()),
                sync_handlers: Mutex::new(HashMap::new()),
                next_handler: AtomicU64::new(0),
                endpoints: RwLock::new(BTreeMap::new()),
                inbound_tx,
                next_endpoint: AtomicU32::new(1),
                registrations: ChannelRegistrations::new(),
                shutdown,
            }),
            inbound_rx: Arc::new(tokio::sync::Mutex::new(inbound_rx)),
        }
    }

    /// Attach a new subordinate context.
    #[must_use]
    pub fn connect(&self) -> InMemoryPort {
        let id = EndpointId(self.shared.next_endpoint.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.endpoints.write().insert(id, tx);
        debug!(endpoint = %id, "Endpoint connected");
        InMemoryPort::new(id, self.shared.inbound_tx.clone(), Arc::downgrade(&self.shared), rx)
    }

    /// Deliver everything currently queued for the host.
    ///
    /// Returns the number of deliveries processed. Returns `0` without
    /// draining if a [`run`](Self::run) loop currently owns the queue.
    pub fn pump(&self) -> usize {
        let Ok(mut rx) = self.inbound_rx.try_lock() else {
            return 0;
        };
        let mut delivered = 0;
        while let Ok(delivery) = rx.try_recv() {
            self.shared.deliver(delivery);
            delivered += 1;
        }
        delivered
    }

    /// Deliver queued work until [`close`](Self::close) is called.
    pub async fn run(&self) {
        let mut shutdown = self.shared.shutdown.subscribe();
        let mut rx = self.inbound_rx.lock().await;
        if *shutdown.borrow() {
            return;
        }
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                delivery = rx.recv() => match delivery {
                    Some(delivery) => self.shared.deliver(delivery),
                    None => break,
                },
            }
        }
        debug!("Host delivery loop stopped");
    }

    /// Stop any running [`run`](Self::run) loop.
    pub fn close(&self) {
        self.shared.shutdown.send_replace(true);
    }

    /// Listeners registered on the host for `channel`.
    #[must_use]
    pub fn listener_count(&self, channel: &str) -> usize {
        self.shared.listeners.lock().count(channel)
    }

    #[must_use]
    pub fn has_handler(&self, channel: &str) -> bool {
        self.shared.handlers.lock().contains_key(channel)
            || self.shared.sync_handlers.lock().contains_key(channel)
    }
}

impl Default for InMemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerRegistry for InMemoryHub {
    fn add_listener(&self, channel: &str, listener: Listener) -> ListenerId {
        self.shared.listeners.lock().add(channel, listener)
    }

    fn remove_listener(&self, channel: &str, id: ListenerId) -> bool {
        self.shared.listeners.lock().remove(channel, id)
    }

    fn registrations(&self) -> &ChannelRegistrations {
        &self.shared.registrations
    }
}

impl HostTransport for InMemoryHub {
    fn endpoints(&self) -> Vec<EndpointId> {
        self.shared
            .endpoints
            .read()
            .iter()
            .filter(|(_, tx)| !tx.is_closed())
            .map(|(id, _)| *id)
            .collect()
    }

    fn send_to(
        &self,
        endpoint: EndpointId,
        channel: &str,
        payload: Value,
    ) -> Result<(), TransportError> {
        let endpoints = self.shared.endpoints.read();
        let tx = endpoints
            .get(&endpoint)
            .ok_or(TransportError::UnknownEndpoint(endpoint))?;
        tx.send(InboundMessage {
            sender: EndpointId::HOST,
            channel: channel.to_string(),
            payload,
        })
        .map_err(|_| TransportError::Disconnected { endpoint })
    }

    fn handle(&self, channel: &str, handler: RequestHandler) -> HandlerId {
        let id = self.shared.next_handler_id();
        if self
            .shared
            .handlers
            .lock()
            .insert(channel.to_string(), (id, handler))
            .is_some()
        {
            warn!(channel, "Replaced an existing request handler");
        }
        id
    }

    fn handle_sync(&self, channel: &str, handler: SyncRequestHandler) -> HandlerId {
        let id = self.shared.next_handler_id();
        if self
            .shared
            .sync_handlers
            .lock()
            .insert(channel.to_string(), (id, handler))
            .is_some()
        {
            warn!(channel, "Replaced an existing blocking request handler");
        }
        id
    }

    fn remove_handler(&self, channel: &str) -> bool {
        let removed_async = self.shared.handlers.lock().remove(channel).is_some();
        let removed_sync = self.shared.sync_handlers.lock().remove(channel).is_some();
        removed_async || removed_sync
    }

    fn release_handler(&self, channel: &str, id: HandlerId) -> bool {
        let released = release_if_owned(&self.shared.handlers, channel, id)
            || release_if_owned(&self.shared.sync_handlers, channel, id);
        if !released {
            debug!(channel, "Handler already replaced, nothing released");
        }
        released
    }
}

struct PortShared {
    id: EndpointId,
    listeners: Mutex<ListenerTable>,
    registrations: ChannelRegistrations,
    hub_tx: mpsc::UnboundedSender<HostDelivery>,
    hub: Weak<HubShared>,
    connected: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl PortShared {
    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            if let Some(hub) = self.hub.upgrade() {
                hub.disconnect(self.id);
            }
            self.shutdown.send_replace(true);
        }
    }

    fn enqueue(&self, delivery: HostDelivery) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected {
                endpoint: EndpointId::HOST,
            });
        }
        self.hub_tx
            .send(delivery)
            .map_err(|_| TransportError::Disconnected {
                endpoint: EndpointId::HOST,
            })
    }

    fn message(&self, channel: &str, payload: Value) -> InboundMessage {
        InboundMessage {
            sender: self.id,
            channel: channel.to_string(),
            payload,
        }
    }
}

impl Drop for PortShared {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Subordinate end of the in-memory transport.
///
/// Cheap to clone. The endpoint disconnects when [`disconnect`] is called or
/// the last clone is dropped.
///
/// [`disconnect`]: InMemoryPort::disconnect
#[derive(Clone)]
pub struct InMemoryPort {
    shared: Arc<PortShared>,
    inbound_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<InboundMessage>>>,
}

impl InMemoryPort {
    fn new(
        id: EndpointId,
        hub_tx: mpsc::UnboundedSender<HostDelivery>,
        hub: Weak<HubShared>,
        inbound_rx: mpsc::UnboundedReceiver<InboundMessage>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shared: Arc::new(PortShared {
                id,
                listeners: Mutex::new(ListenerTable::new()),
                registrations: ChannelRegistrations::new(),
                hub_tx,
                hub,
                connected: AtomicBool::new(true),
                shutdown,
            }),
            inbound_rx: Arc::new(tokio::sync::Mutex::new(inbound_rx)),
        }
    }

    /// Deliver everything currently queued for this context.
    pub fn pump(&self) -> usize {
        let Ok(mut rx) = self.inbound_rx.try_lock() else {
            return 0;
        };
        let mut delivered = 0;
        while let Ok(message) = rx.try_recv() {
            emit(&self.shared.listeners, &message);
            delivered += 1;
        }
        delivered
    }

    /// Deliver queued messages until disconnected.
    pub async fn run(&self) {
        let mut shutdown = self.shared.shutdown.subscribe();
        let mut rx = self.inbound_rx.lock().await;
        if *shutdown.borrow() {
            return;
        }
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                message = rx.recv() => match message {
                    Some(message) => emit(&self.shared.listeners, &message),
                    None => break,
                },
            }
        }
        debug!(endpoint = %self.shared.id, "Subordinate delivery loop stopped");
    }

    /// Detach from the host. Later sends fail with `Disconnected`.
    pub fn disconnect(&self) {
        self.shared.disconnect();
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn listener_count(&self, channel: &str) -> usize {
        self.shared.listeners.lock().count(channel)
    }
}

impl ListenerRegistry for InMemoryPort {
    fn add_listener(&self, channel: &str, listener: Listener) -> ListenerId {
        self.shared.listeners.lock().add(channel, listener)
    }

    fn remove_listener(&self, channel: &str, id: ListenerId) -> bool {
        self.shared.listeners.lock().remove(channel, id)
    }

    fn registrations(&self) -> &ChannelRegistrations {
        &self.shared.registrations
    }
}

#[async_trait]
impl SubordinateTransport for InMemoryPort {
    fn endpoint_id(&self) -> EndpointId {
        self.shared.id
    }

    fn send(&self, channel: &str, payload: Value) -> Result<(), TransportError> {
        self.shared
            .enqueue(HostDelivery::Message(self.shared.message(channel, payload)))
    }

    fn send_sync(&self, channel: &str, payload: Value) -> Result<Value, TransportError> {
        let (reply, response) = std_mpsc::sync_channel(1);
        self.shared.enqueue(HostDelivery::InvokeSync {
            message: self.shared.message(channel, payload),
            reply,
        })?;
        response.recv().map_err(|_| TransportError::ReplyDropped {
            channel: channel.to_string(),
        })?
    }

    async fn invoke(&self, channel: &str, payload: Value) -> Result<Value, TransportError> {
        let (reply, response) = oneshot::channel();
        self.shared.enqueue(HostDelivery::Invoke {
            message: self.shared.message(channel, payload),
            reply,
        })?;
        response.await.map_err(|_| TransportError::ReplyDropped {
            channel: channel.to_string(),
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn recording_listener() -> (Listener, Arc<Mutex<Vec<InboundMessage>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (Arc::new(move |m: &InboundMessage| sink.lock().push(m.clone())), seen)
    }

    #[test]
    fn test_connect_assigns_sequential_ids() {
        let hub = InMemoryHub::new();
        let a = hub.connect();
        let b = hub.connect();
        assert_eq!(a.endpoint_id(), EndpointId(1));
        assert_eq!(b.endpoint_id(), EndpointId(2));
        assert_eq!(hub.endpoints(), vec![EndpointId(1), EndpointId(2)]);
    }

    #[test]
    fn test_send_is_queued_until_pump() {
        let hub = InMemoryHub::new();
        let port = hub.connect();
        let (listener, seen) = recording_listener();
        hub.add_listener("ch", listener);

        port.send("ch", json!(1)).unwrap();
        port.send("ch", json!(2)).unwrap();
        assert!(seen.lock().is_empty());

        assert_eq!(hub.pump(), 2);
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].payload, json!(1));
        assert_eq!(seen[1].payload, json!(2));
        assert_eq!(seen[0].sender, port.endpoint_id());
    }

    #[test]
    fn test_send_to_reaches_only_target() {
        let hub = InMemoryHub::new();
        let a = hub.connect();
        let b = hub.connect();
        let (la, seen_a) = recording_listener();
        let (lb, seen_b) = recording_listener();
        a.add_listener("ch", la);
        b.add_listener("ch", lb);

        hub.send_to(b.endpoint_id(), "ch", json!("hi")).unwrap();
        a.pump();
        b.pump();

        assert!(seen_a.lock().is_empty());
        assert_eq!(seen_b.lock().len(), 1);
        assert_eq!(seen_b.lock()[0].sender, EndpointId::HOST);
    }

    #[test]
    fn test_send_to_unknown_endpoint() {
        let hub = InMemoryHub::new();
        assert_eq!(
            hub.send_to(EndpointId(9), "ch", Value::Null),
            Err(TransportError::UnknownEndpoint(EndpointId(9)))
        );
    }

    #[test]
    fn test_disconnect_removes_endpoint() {
        let hub = InMemoryHub::new();
        let port = hub.connect();
        port.disconnect();

        assert!(hub.endpoints().is_empty());
        assert!(matches!(
            port.send("ch", Value::Null),
            Err(TransportError::Disconnected { .. })
        ));
    }

    #[test]
    fn test_drop_disconnects() {
        let hub = InMemoryHub::new();
        {
            let _port = hub.connect();
            assert_eq!(hub.endpoints().len(), 1);
        }
        assert!(hub.endpoints().is_empty());
    }

    #[test]
    fn test_removed_listener_does_not_fire() {
        let hub = InMemoryHub::new();
        let port = hub.connect();
        let (listener, seen) = recording_listener();
        let id = hub.add_listener("ch", listener);

        assert!(hub.remove_listener("ch", id));
        port.send("ch", Value::Null).unwrap();
        hub.pump();
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_round_trip() {
        let hub = InMemoryHub::new();
        let port = hub.connect();
        hub.handle(
            "double",
            Arc::new(|m: &InboundMessage| {
                let n = m.payload.as_i64().unwrap_or_default();
                Ok::<_, TransportError>(json!(n * 2))
            }),
        );

        let host = hub.clone();
        let runner = tokio::spawn(async move { host.run().await });

        let answer = tokio::time::timeout(Duration::from_secs(1), port.invoke("double", json!(21)))
            .await
            .expect("timeout")
            .expect("answer");
        assert_eq!(answer, json!(42));

        hub.close();
        runner.await.unwrap();
    }

    #[tokio::test]
    async fn test_invoke_without_handler() {
        let hub = InMemoryHub::new();
        let port = hub.connect();
        let host = hub.clone();
        let runner = tokio::spawn(async move { host.run().await });

        let result = port.invoke("missing", Value::Null).await;
        assert_eq!(
            result,
            Err(TransportError::NoHandler {
                channel: "missing".to_string()
            })
        );

        hub.close();
        runner.await.unwrap();
    }

    #[test]
    fn test_send_sync_blocks_until_host_answers() {
        let hub = InMemoryHub::new();
        let port = hub.connect();
        hub.handle_sync(
            "state",
            Arc::new(|request: &mut SyncRequest| request.set_return_value(json!({"count": 7}))),
        );

        let caller = std::thread::spawn(move || port.send_sync("state", Value::Null));

        // Answer from this thread once the request is queued.
        let mut answered = 0;
        while answered == 0 {
            answered = hub.pump();
            std::thread::yield_now();
        }

        assert_eq!(caller.join().unwrap(), Ok(json!({"count": 7})));
    }

    #[test]
    fn test_sync_handler_without_write_returns_null() {
        let hub = InMemoryHub::new();
        let port = hub.connect();
        hub.handle_sync("noop", Arc::new(|_request: &mut SyncRequest| {}));

        let caller = std::thread::spawn(move || port.send_sync("noop", Value::Null));
        while hub.pump() == 0 {
            std::thread::yield_now();
        }
        assert_eq!(caller.join().unwrap(), Ok(Value::Null));
    }

    #[test]
    fn test_remove_handler() {
        let hub = InMemoryHub::new();
        hub.handle(
            "a",
            Arc::new(|_: &InboundMessage| Ok::<_, TransportError>(Value::Null)),
        );
        hub.handle_sync("b", Arc::new(|_: &mut SyncRequest| {}));

        assert!(hub.has_handler("a"));
        assert!(hub.remove_handler("a"));
        assert!(hub.remove_handler("b"));
        assert!(!hub.remove_handler("a"));
        assert!(!hub.has_handler("b"));
    }

    #[test]
    fn test_release_handler_only_removes_own_install() {
        let hub = InMemoryHub::new();
        let first = hub.handle_sync("state", Arc::new(|_: &mut SyncRequest| {}));
        let second = hub.handle_sync(
            "state",
            Arc::new(|request: &mut SyncRequest| request.set_return_value(json!(2))),
        );
        assert_ne!(first, second);

        assert!(!hub.release_handler("state", first));
        assert!(hub.has_handler("state"));

        assert!(hub.release_handler("state", second));
        assert!(!hub.has_handler("state"));
        assert!(!hub.release_handler("state", second));
    }

    #[tokio::test]
    async fn test_port_run_delivers_host_messages() {
        let hub = InMemoryHub::new();
        let port = hub.connect();
        let (listener, seen) = recording_listener();
        port.add_listener("ch", listener);

        let subordinate = port.clone();
        let runner = tokio::spawn(async move { subordinate.run().await });

        hub.send_to(port.endpoint_id(), "ch", json!(5)).unwrap();
        for _ in 0..50 {
            if !seen.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(seen.lock().len(), 1);

        port.disconnect();
        runner.await.unwrap();
    }
}
