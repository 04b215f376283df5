//! A notifier that keeps every event for later assertions.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::port::{Event, Notifier, NotifierRegistry};

/// Records broadcast events. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding only this recorder.
    pub fn registry(&self) -> Arc<NotifierRegistry> {
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(self.clone()));
        Arc::new(registry)
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Event names in broadcast order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(Event::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events.lock().push(event);
    }
}
