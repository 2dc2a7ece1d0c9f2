//! Session membership: the two controller slots and the open-ended observer set
//!
//! This module tracks who is connected to the session and what they have asked for:
//! - Per-controller control cells (latest intent, rematch-ready flag)
//! - Controller slots binding a role and identity label to an outgoing sink
//! - The observer registry shared between the acceptor and the broadcaster
//!
//! Control cells are single-writer (the controller's ingest task) and
//! single-reader (the simulation loop), so they are plain atomics. The observer
//! registry is inserted into and pruned from different tasks and always sits
//! behind a mutex.

use log::info;
use shared::{Intent, Role};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Latest control state received from one controller
///
/// Reads may observe a value that is one tick stale; intents are ephemeral
/// control signals and last-writer-wins is the intended semantics.
#[derive(Debug, Default)]
pub struct ControlCell {
    intent: AtomicU8,
    ready: AtomicBool,
}

impl ControlCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_intent(&self, intent: Intent) {
        self.intent.store(intent.as_u8(), Ordering::Release);
    }

    pub fn intent(&self) -> Intent {
        Intent::from_u8(self.intent.load(Ordering::Acquire))
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn clear_ready(&self) {
        self.ready.store(false, Ordering::Release);
    }
}

/// One of the two mandatory participants
///
/// Each slot holds:
/// - The side it controls and the identity label credited on a win
/// - The control cell its ingest task writes into
/// - The outgoing half of its connection, written once per tick
#[derive(Debug)]
pub struct ControllerSlot<W> {
    pub role: Role,
    pub identity: String,
    pub control: Arc<ControlCell>,
    pub sink: W,
}

impl<W> ControllerSlot<W> {
    pub fn new(role: Role, identity: impl Into<String>, sink: W) -> Self {
        Self {
            role,
            identity: identity.into(),
            control: Arc::new(ControlCell::new()),
            sink,
        }
    }
}

/// A receive-only connection
#[derive(Debug)]
pub struct Observer<W> {
    /// Registry-assigned identifier, used for logging only
    pub id: u32,
    pub addr: SocketAddr,
    pub sink: W,
}

/// All currently enrolled observers
///
/// There is no capacity limit; an unbounded audience is allowed. Observers
/// leave the registry only when a send to them fails or the session ends.
#[derive(Debug)]
pub struct ObserverRegistry<W> {
    observers: Vec<Observer<W>>,
    next_observer_id: u32,
}

/// Registry handle shared by the acceptor and the broadcaster.
pub type SharedObservers<W> = Arc<Mutex<ObserverRegistry<W>>>;

impl<W> Default for ObserverRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> ObserverRegistry<W> {
    /// Creates an empty registry. Observer IDs start from 1.
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
            next_observer_id: 1,
        }
    }

    pub fn shared() -> SharedObservers<W> {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Enrolls a new observer and returns its ID
    pub fn enroll(&mut self, addr: SocketAddr, sink: W) -> u32 {
        let observer_id = self.next_observer_id;
        self.next_observer_id += 1;

        self.observers.push(Observer {
            id: observer_id,
            addr,
            sink,
        });
        info!(
            "Observer {} joined from {} ({} watching)",
            observer_id,
            addr,
            self.observers.len()
        );

        observer_id
    }

    /// Removes the given observers, dropping (and so closing) their sinks.
    /// Returns how many were actually removed.
    pub fn remove(&mut self, observer_ids: &[u32]) -> usize {
        let before = self.observers.len();
        self.observers.retain(|observer| !observer_ids.contains(&observer.id));
        before - self.observers.len()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Observer<W>> {
        self.observers.iter_mut()
    }

    pub fn ids(&self) -> Vec<u32> {
        self.observers.iter().map(|observer| observer.id).collect()
    }

    /// Takes every observer out of the registry for teardown
    pub fn drain(&mut self) -> Vec<Observer<W>> {
        std::mem::take(&mut self.observers)
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}
