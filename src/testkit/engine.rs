//! Engine fixture over in-memory collaborators.

use std::sync::Arc;

use chrono::Duration;

use super::clock::ManualClock;
use super::domain;
use crate::adapter::outbound::memory::MemoryStore;
use crate::application::event::{self, EventReceiver};
use crate::application::{Engine, EngineSettings};
use crate::domain::{Market, UserId};
use crate::port::{Event, Notifier};

/// An engine wired to a [`MemoryStore`], a [`ManualClock`] and an event
/// receiver the test can drain.
pub struct TestEngine {
    pub engine: Engine,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub events: EventReceiver,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let (tx, rx) = event::channel(1_000);
        let engine = Engine::new(settings, store.clone(), tx).with_clock(clock.clone());
        Self {
            engine,
            store,
            clock,
            events: rx,
        }
    }

    /// Open accounts for `ids` with the signup bonus.
    ///
    /// # Panics
    ///
    /// Panics if any account already exists.
    pub fn accounts(&self, ids: &[&str]) -> Vec<UserId> {
        ids.iter()
            .map(|id| {
                let user = domain::user(id);
                self.engine.open_account(&user).expect("open account");
                user
            })
            .collect()
    }

    /// Create a market closing one week from the clock's now.
    ///
    /// # Panics
    ///
    /// Panics if the market cannot be created.
    pub fn market(&self, id: &str, probabilities: &[f64]) -> Market {
        let closes_at = self.engine.now() + Duration::days(7);
        self.engine
            .create_market(domain::market_with(id, probabilities, closes_at))
            .expect("create market")
    }

    /// Drain queued events into a vector.
    pub fn take_events(&mut self) -> Vec<Event> {
        let sink = Collector::default();
        self.events.drain(&sink);
        sink.0.into_inner()
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct Collector(parking_lot::Mutex<Vec<Event>>);

impl Notifier for Collector {
    fn notify(&self, event: Event) {
        self.0.lock().push(event);
    }
}
