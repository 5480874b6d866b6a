use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub struct DebounceConfig {
    pub delay: Duration,
    /// Queries shorter than this (after trimming, in characters) never search.
    pub min_len: usize,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            min_len: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// The query is too short; any previous results should be cleared.
    Cleared,
    /// A search is scheduled for the given instant.
    Scheduled(Instant),
}

/// Trailing-edge debouncer for search input.
///
/// Each keystroke replaces the pending query and restarts the delay; only
/// the last query of a burst is released by [`Debouncer::poll`].
#[derive(Debug, Clone)]
pub struct Debouncer {
    config: DebounceConfig,
    pending: Option<(String, Instant)>,
}

impl Debouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            pending: None,
        }
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    pub fn is_searchable(&self, query: &str) -> bool {
        query.trim().chars().count() >= self.config.min_len
    }

    pub fn on_input(&mut self, query: &str, now: Instant) -> InputOutcome {
        if !self.is_searchable(query) {
            self.pending = None;
            return InputOutcome::Cleared;
        }
        let due = now + self.config.delay;
        self.pending = Some((query.trim().to_string(), due));
        InputOutcome::Scheduled(due)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, due)| *due)
    }

    /// Releases the pending query once its delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, due)) if *due <= now => self.pending.take().map(|(q, _)| q),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DebounceConfig::default())
    }
}
