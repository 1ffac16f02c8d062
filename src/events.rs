pub const CHANGE: &str = "change";

/// A notification delivered to handlers. `checked` carries the control state for `change`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event<'a> {
    pub target: &'a str,
    pub name: &'a str,
    pub checked: Option<bool>,
}

impl<'a> Event<'a> {
    pub fn change(target: &'a str, checked: bool) -> Self {
        Self {
            target,
            name: CHANGE,
            checked: Some(checked),
        }
    }
}

pub type Handler = Box<dyn FnMut(&Event<'_>)>;

/// Somewhere handlers can be registered for a named event on a named target.
pub trait EventSource {
    fn on(&mut self, target: &str, event: &str, handler: Handler);
}

struct Listener {
    target: String,
    event: String,
    handler: Handler,
}

/// Synchronous in-process event source. Handlers run to completion in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listener_count(&self, target: &str, event: &str) -> usize {
        self.listeners
            .iter()
            .filter(|l| l.target == target && l.event == event)
            .count()
    }

    /// Returns how many handlers ran.
    pub fn dispatch(&mut self, event: &Event<'_>) -> usize {
        let mut ran = 0;
        for listener in &mut self.listeners {
            if listener.target == event.target && listener.event == event.name {
                (listener.handler)(event);
                ran += 1;
            }
        }
        tracing::debug!(
            target_id = event.target,
            event = event.name,
            handlers = ran,
            "dispatched"
        );
        ran
    }
}

impl EventSource for EventBus {
    fn on(&mut self, target: &str, event: &str, handler: Handler) {
        self.listeners.push(Listener {
            target: target.to_string(),
            event: event.to_string(),
            handler,
        });
    }
}
