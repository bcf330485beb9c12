use super::{Handler, Measurement};
use std::sync::Mutex;

/// Keeps every measurement in memory, in arrival order.
#[derive(Debug, Default)]
pub struct SavingHandler {
    events: Mutex<Vec<Measurement>>,
}

impl SavingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events seen so far.
    pub fn measurements(&self) -> Vec<Measurement> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Removes and returns the events seen so far.
    pub fn drain(&self) -> Vec<Measurement> {
        self.events.lock().map(|mut events| std::mem::take(&mut *events)).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remote addresses of every connect attempt, in order.
    pub fn connect_targets(&self) -> Vec<String> {
        self.measurements()
            .into_iter()
            .filter_map(|m| match m {
                Measurement::Connect { remote_address, .. } => Some(remote_address),
                _ => None,
            })
            .collect()
    }
}

impl Handler for SavingHandler {
    fn on_measurement(&self, measurement: Measurement) {
        if let Ok(mut events) = self.events.lock() {
            events.push(measurement);
        }
    }
}
