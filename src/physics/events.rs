//! Synchronous step notifications.

use std::fmt;

use super::contact::{CandidatePair, Contact};

/// A notification emitted during a fixed tick, in tick order.
#[derive(Debug, Clone, Copy)]
pub enum StepEvent<'a> {
    VelocitiesIntegrated { dt: f64 },
    CandidatesProduced(&'a [CandidatePair]),
    ContactsDetected(&'a [Contact]),
    PositionsIntegrated { dt: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepEventKind {
    VelocitiesIntegrated,
    CandidatesProduced,
    ContactsDetected,
    PositionsIntegrated,
}

impl StepEvent<'_> {
    pub fn kind(&self) -> StepEventKind {
        match self {
            StepEvent::VelocitiesIntegrated { .. } => StepEventKind::VelocitiesIntegrated,
            StepEvent::CandidatesProduced(_) => StepEventKind::CandidatesProduced,
            StepEvent::ContactsDetected(_) => StepEventKind::ContactsDetected,
            StepEvent::PositionsIntegrated { .. } => StepEventKind::PositionsIntegrated,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&StepEvent<'_>)>;

struct Subscriber {
    id: SubscriptionId,
    filter: Option<StepEventKind>,
    handler: Handler,
}

/// Subscribers are called in subscription order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every event.
    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&StepEvent<'_>) + 'static,
    {
        self.insert(None, Box::new(handler))
    }

    /// Subscribe to events of a single kind.
    pub fn subscribe_to<F>(&mut self, kind: StepEventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&StepEvent<'_>) + 'static,
    {
        self.insert(Some(kind), Box::new(handler))
    }

    fn insert(&mut self, filter: Option<StepEventKind>, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            filter,
            handler,
        });
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, event: &StepEvent<'_>) {
        let kind = event.kind();
        for subscriber in &mut self.subscribers {
            if subscriber.filter.is_none_or(|f| f == kind) {
                (subscriber.handler)(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_subscribers_receive_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();

        let first = Rc::clone(&log);
        bus.subscribe(move |e| first.borrow_mut().push((1, e.kind())));
        let second = Rc::clone(&log);
        bus.subscribe(move |e| second.borrow_mut().push((2, e.kind())));

        bus.emit(&StepEvent::VelocitiesIntegrated { dt: 0.1 });

        assert_eq!(
            *log.borrow(),
            vec![
                (1, StepEventKind::VelocitiesIntegrated),
                (2, StepEventKind::VelocitiesIntegrated)
            ]
        );
    }

    #[test]
    fn test_filtered_subscription() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        let seen = Rc::clone(&count);
        bus.subscribe_to(StepEventKind::PositionsIntegrated, move |_| {
            *seen.borrow_mut() += 1
        });

        bus.emit(&StepEvent::VelocitiesIntegrated { dt: 0.1 });
        bus.emit(&StepEvent::ContactsDetected(&[]));
        bus.emit(&StepEvent::PositionsIntegrated { dt: 0.1 });

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        let seen = Rc::clone(&count);
        let id = bus.subscribe(move |_| *seen.borrow_mut() += 1);

        bus.emit(&StepEvent::PositionsIntegrated { dt: 0.1 });
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(&StepEvent::PositionsIntegrated { dt: 0.1 });

        assert_eq!(*count.borrow(), 1);
        assert!(bus.is_empty());
    }
}
