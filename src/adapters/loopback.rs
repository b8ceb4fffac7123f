//! In-process cloud transport.
//!
//! Stands in for the hub client on a development host and in tests:
//!
//! - outbound events are kept in a fixed-size ring (the last
//!   [`SENT_HISTORY`] messages) and counted;
//! - direct methods are invoked locally through [`LoopbackTransport::invoke`],
//!   from any thread, exactly as a hub would call them;
//! - cloud-to-device messages are queued with [`LoopbackTransport::inject`]
//!   and drained by [`CloudTransport::receive`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use heapless::HistoryBuffer;
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::error::CommsError;
use crate::rpc::transport::{
    CloudTransport, InboundMessage, MethodHandler, MethodResponse, OutboundMessage,
};

/// Outbound messages retained for inspection.
pub const SENT_HISTORY: usize = 32;

pub struct LoopbackTransport {
    open: AtomicBool,
    methods: Mutex<HashMap<String, MethodHandler>>,
    sent: Mutex<HistoryBuffer<OutboundMessage, SENT_HISTORY>>,
    sent_total: AtomicU64,
    fail_sends: AtomicBool,
    inbound_tx: Sender<InboundMessage>,
    inbound_rx: Receiver<InboundMessage>,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackTransport {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = channel::unbounded();
        Self {
            open: AtomicBool::new(false),
            methods: Mutex::new(HashMap::new()),
            sent: Mutex::new(HistoryBuffer::new()),
            sent_total: AtomicU64::new(0),
            fail_sends: AtomicBool::new(false),
            inbound_tx,
            inbound_rx,
        }
    }

    /// Call a registered direct method as the hub would.
    pub fn invoke(&self, name: &str, payload: &[u8]) -> Result<MethodResponse, CommsError> {
        if !self.is_open() {
            return Err(CommsError::NotConnected);
        }
        // Clone out of the map so a slow handler does not block registration.
        let handler = self.methods.lock().get(name).cloned();
        let Some(handler) = handler else {
            warn!("LOOPBACK | no method named {}", name);
            return Ok(MethodResponse::not_found());
        };
        let response = handler(payload);
        debug!("LOOPBACK | {} -> {}", name, response.status);
        Ok(response)
    }

    /// Queue a cloud-to-device message.
    pub fn inject(&self, message_id: Option<&str>, body: &[u8]) {
        let message = InboundMessage {
            message_id: message_id.map(str::to_string),
            body: body.to_vec(),
        };
        // The receiver lives as long as `self`, so the send cannot fail.
        let _ = self.inbound_tx.send(message);
    }

    /// Cloud-to-device messages not yet received.
    pub fn pending_inbound(&self) -> usize {
        self.inbound_rx.len()
    }

    /// Retained outbound messages, oldest first.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().oldest_ordered().cloned().collect()
    }

    /// Outbound messages accepted since creation.
    pub fn sent_total(&self) -> u64 {
        self.sent_total.load(Ordering::Relaxed)
    }

    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Make `send_event` fail, as if the link dropped.
    pub fn set_failing_sends(&self, failing: bool) {
        self.fail_sends.store(failing, Ordering::Relaxed);
    }
}

impl CloudTransport for LoopbackTransport {
    fn open(&self) -> Result<(), CommsError> {
        self.open.store(true, Ordering::Release);
        info!("LOOPBACK | connected");
        Ok(())
    }

    fn register_method(&self, name: &str, handler: MethodHandler) -> Result<(), CommsError> {
        if !self.is_open() {
            return Err(CommsError::NotConnected);
        }
        let mut methods = self.methods.lock();
        if methods.contains_key(name) {
            return Err(CommsError::MethodAlreadyRegistered(name.to_string()));
        }
        methods.insert(name.to_string(), handler);
        debug!("LOOPBACK | method {} registered", name);
        Ok(())
    }

    fn send_event(&self, message: OutboundMessage) -> Result<(), CommsError> {
        if !self.is_open() {
            return Err(CommsError::NotConnected);
        }
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(CommsError::SendFailed("link down".into()));
        }
        debug!("LOOPBACK | event {} ({} bytes)", message.correlation_id, message.body.len());
        self.sent.lock().write(message);
        self.sent_total.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn receive(&self, timeout: Duration) -> Result<Option<InboundMessage>, CommsError> {
        if !self.is_open() {
            return Err(CommsError::NotConnected);
        }
        match self.inbound_rx.recv_timeout(timeout) {
            Ok(message) => {
                debug!("LOOPBACK | message {:?} completed", message.message_id);
                Ok(Some(message))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(CommsError::NotConnected),
        }
    }

    fn close(&self) -> Result<(), CommsError> {
        if self.open.swap(false, Ordering::AcqRel) {
            self.methods.lock().clear();
            info!("LOOPBACK | closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}
