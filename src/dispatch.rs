//! Fan-out of inbound messages to pending waits.
//!
//! Every operation that expects replies registers a predicate here before it
//! sends anything. The read loop hands each decoded message to
//! [`Dispatcher::dispatch`], which offers it to every registered wait in
//! registration order. A message may match several waits; each gets its own
//! copy.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use log::debug;

use crate::errors::Error;
use crate::message::Message;

type Result<T> = std::result::Result<T, Error>;

/// An inbound message and the address it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub message: Message,
    pub addr: SocketAddr,
}

impl Response {
    /// Identity of the responding device, taken from the header target.
    pub fn identity(&self) -> u64 {
        self.message.header.target
    }
}

pub(crate) type Predicate = Box<dyn Fn(&Response) -> bool + Send>;

struct PendingWait {
    predicate: Predicate,
    tx: UnboundedSender<Result<Response>>,
}

#[derive(Default)]
struct Waits {
    next_id: u64,
    pending: BTreeMap<u64, PendingWait>,
    /// Set once the read loop has stopped; carries the reason.
    closed: Option<Error>,
}

/// Registry of pending waits shared between callers and the read loop.
#[derive(Default)]
pub(crate) struct Dispatcher {
    waits: Mutex<Waits>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Waits> {
        self.waits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register interest in messages matching `predicate`.
    ///
    /// Fails with [`Error::Closed`] once the read loop has stopped.
    pub fn register(self: &Arc<Self>, predicate: Predicate) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded();

        let mut waits = self.lock();
        if waits.closed.is_some() {
            return Err(Error::Closed);
        }
        let id = waits.next_id;
        waits.next_id += 1;
        waits.pending.insert(id, PendingWait { predicate, tx });

        Ok(Subscription {
            id,
            rx,
            dispatcher: Arc::clone(self),
        })
    }

    /// Offer `response` to every pending wait. Returns how many matched.
    ///
    /// Predicates are called with the waits locked; one that registers, deregisters
    /// or queries this dispatcher would deadlock.
    pub fn dispatch(&self, response: &Response) -> usize {
        let waits = self.lock();
        let mut matched = 0;
        for wait in waits.pending.values() {
            if (wait.predicate)(response) {
                // A dropped receiver only means the waiter is on its way out.
                let _ = wait.tx.unbounded_send(Ok(response.clone()));
                matched += 1;
            }
        }
        matched
    }

    /// Deliver `err` to every pending wait and refuse new registrations.
    pub fn fail_all(&self, err: Error) {
        let mut waits = self.lock();
        debug!("failing {} pending waits: {}", waits.pending.len(), err);
        for (_, wait) in std::mem::take(&mut waits.pending) {
            let _ = wait.tx.unbounded_send(Err(err.clone()));
        }
        waits.closed.get_or_insert(err);
    }

    /// The error that closed the dispatcher, if any.
    pub fn closed(&self) -> Option<Error> {
        self.lock().closed.clone()
    }

    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    fn deregister(&self, id: u64) {
        self.lock().pending.remove(&id);
    }
}

/// A registered wait. Deregisters itself when dropped.
pub(crate) struct Subscription {
    id: u64,
    rx: UnboundedReceiver<Result<Response>>,
    dispatcher: Arc<Dispatcher>,
}

impl Subscription {
    pub fn receiver(&mut self) -> &mut UnboundedReceiver<Result<Response>> {
        &mut self.rx
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispatcher.deregister(self.id);
    }
}
