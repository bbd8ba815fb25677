use foundation::time::Time;

/// Outbound event stamped with the loop time it was emitted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<E> {
    pub at: Time,
    pub payload: E,
}

/// Queue of outbound events that the host drains after each call into the engine.
#[derive(Debug)]
pub struct EventBus<E> {
    events: Vec<Event<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, at: Time, payload: E) {
        self.events.push(Event { at, payload });
    }

    pub fn events(&self) -> &[Event<E>] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Event<E>> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;
    use foundation::time::Time;

    #[test]
    fn records_events_with_time() {
        let mut bus = EventBus::new();
        bus.emit(Time(2), "hello");
        assert_eq!(bus.events().len(), 1);
        assert_eq!(bus.events()[0].at, Time(2));
        assert_eq!(bus.events()[0].payload, "hello");
    }

    #[test]
    fn drain_clears_events() {
        let mut bus = EventBus::new();
        bus.emit(Time(0), 7);
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.is_empty());
    }
}
