//! Bounded fan-out of produced samples.

use core::fmt;

use crate::error::{SensorError, SensorResult};
use crate::sample::Sample;

/// Default number of subscriber slots.
pub const MAX_SUBSCRIBERS: usize = 4;

/// Callback invoked once per produced sample.
pub type Subscriber = Box<dyn FnMut(&Sample)>;

/// Fixed-capacity list of sample subscribers.
///
/// Subscribers are called synchronously in registration order. Registering
/// past capacity is an error returned to the caller.
pub struct SubscriberRegistry<const N: usize = MAX_SUBSCRIBERS> {
    slots: heapless::Vec<Subscriber, N>,
}

impl<const N: usize> Default for SubscriberRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SubscriberRegistry<N> {
    pub fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
        }
    }

    /// Register a callback, returning its slot index.
    pub fn subscribe<F>(&mut self, callback: F) -> SensorResult<usize>
    where
        F: FnMut(&Sample) + 'static,
    {
        self.slots
            .push(Box::new(callback))
            .map_err(|_| SensorError::RegistryFull { capacity: N })?;
        Ok(self.slots.len() - 1)
    }

    pub fn notify(&mut self, sample: &Sample) {
        for subscriber in self.slots.iter_mut() {
            subscriber(sample);
        }
    }
}

impl<const N: usize> fmt::Debug for SubscriberRegistry<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("len", &self.slots.len())
            .field("capacity", &N)
            .finish()
    }
}
