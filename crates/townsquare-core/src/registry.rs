//! Explicit table of event sources feeding the dashboard.

use crate::error::Result;
use crate::events::Event;
use crate::provider::{AggregatorContext, EventProvider, EventSource};

/// Registered event sources, called in registration order.
#[derive(Default)]
pub struct ProviderRegistry {
    sources: Vec<Box<dyn EventSource>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the ratingallocate provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(EventProvider::ratingallocate()));
        registry
    }

    /// Add a source. A source with the same name replaces the earlier one.
    pub fn register(&mut self, source: Box<dyn EventSource>) {
        self.sources.retain(|s| s.name() != source.name());
        self.sources.push(source);
    }

    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn EventSource> {
        self.sources
            .iter()
            .find(|s| s.name() == name)
            .map(|s| &**s)
    }

    /// Events from every source, merged and ordered by start time, latest first.
    ///
    /// # Errors
    /// The first failing source aborts the collection.
    pub fn collect_events(&self, host: &dyn AggregatorContext) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for source in &self.sources {
            let batch = source.get_events(host)?;
            tracing::debug!(source = source.name(), count = batch.len(), "source returned events");
            events.extend(batch);
        }
        events.sort_by(|a, b| b.timestart.cmp(&a.timestart));
        Ok(events)
    }
}
