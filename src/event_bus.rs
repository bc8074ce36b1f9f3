//! Buffered publish/subscribe event bus (spec.md §4.1).
//!
//! `publish` appends to a *next-step* buffer. At the step boundary the
//! buffer is swapped into a *current-step* buffer that subscribers read
//! from for the duration of the step. An event published in step `t` is
//! therefore observed starting step `t+1`, never in the step it was
//! published: versioned, explicitly-applied updates rather than
//! immediate mutation.

use crate::models::{Event, Topic};
use log::{debug, error};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

#[derive(Default)]
pub struct EventBus {
    next_step: BTreeMap<Topic, Vec<Event>>,
    current_step: BTreeMap<Topic, Vec<Event>>,
}

impl EventBus {
    pub fn new() -> Self {
        EventBus::default()
    }

    pub fn publish(&mut self, event: Event) {
        let topic = event.topic();
        debug!("event_bus: publish {:?}", topic);
        self.next_step.entry(topic).or_default().push(event);
    }

    /// Step boundary: swap the next-step buffer into the current-step
    /// buffer. Must be called exactly once, before any sector reads events
    /// for the new step.
    pub fn advance(&mut self) {
        self.current_step = std::mem::take(&mut self.next_step);
    }

    pub fn events(&self, topic: Topic) -> &[Event] {
        self.current_step
            .get(&topic)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn all_current(&self) -> impl Iterator<Item = &Event> {
        self.current_step.values().flatten()
    }

    /// Delivers all current-step events to `subscriber`. A subscriber that
    /// panics mid-delivery is caught and logged; the event is not
    /// redelivered, and the bus moves on (the caller is expected to invoke
    /// this once per subscriber sector).
    pub fn deliver_to<F>(&self, subscriber_name: &str, mut subscriber: F)
    where
        F: FnMut(&Event),
    {
        for event in self.all_current() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| subscriber(event)));
            if result.is_err() {
                error!(
                    "event delivery error: subscriber {} raised on {:?}",
                    subscriber_name,
                    event.topic()
                );
            }
        }
    }
}
