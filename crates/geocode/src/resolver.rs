use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::debounce::{DebounceConfig, Debouncer, InputOutcome};
use crate::place::{GeocodeError, Geocoder, Place};

/// What the search box should show after an input settles.
#[derive(Debug)]
pub enum Resolution {
    /// Query too short: hide results.
    Cleared,
    Found { query: String, places: Vec<Place> },
    Failed { query: String, error: GeocodeError },
}

/// Debounced query → places pipeline over any [`Geocoder`].
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    config: DebounceConfig,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, config: DebounceConfig) -> Self {
        Self { geocoder, config }
    }

    /// One-shot search that skips the debounce but still enforces the
    /// minimum query length.
    pub async fn resolve(&self, query: &str) -> Result<Vec<Place>, GeocodeError> {
        let query = query.trim();
        if !Debouncer::new(self.config.clone()).is_searchable(query) {
            return Err(GeocodeError::QueryTooShort(query.to_string()));
        }
        self.geocoder.search(query).await
    }

    /// Consumes keystrokes from `inputs` and reports settled searches on
    /// `out` until `inputs` closes or `out` is dropped.
    pub async fn run(
        self,
        mut inputs: mpsc::UnboundedReceiver<String>,
        out: mpsc::UnboundedSender<Resolution>,
    ) {
        let mut debouncer = Debouncer::new(self.config.clone());
        loop {
            let deadline = debouncer.deadline();
            tokio::select! {
                input = inputs.recv() => {
                    let Some(query) = input else { break };
                    if debouncer.on_input(&query, Instant::now()) == InputOutcome::Cleared
                        && out.send(Resolution::Cleared).is_err()
                    {
                        break;
                    }
                }
                _ = async { sleep_until(deadline.unwrap_or_else(Instant::now)).await }, if deadline.is_some() => {
                    let Some(query) = debouncer.poll(Instant::now()) else { continue };
                    debug!(%query, "search settled");
                    let resolution = match self.geocoder.search(&query).await {
                        Ok(places) => Resolution::Found { query, places },
                        Err(error) => {
                            warn!(%query, "geocoding failed: {error}");
                            Resolution::Failed { query, error }
                        }
                    };
                    if out.send(resolution).is_err() {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::BoxFuture;
    use foundation::geo::LatLng;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records queries and answers with a single place named after the query.
    #[derive(Default)]
    struct FakeGeocoder {
        queries: Mutex<Vec<String>>,
    }

    impl Geocoder for FakeGeocoder {
        fn search<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Vec<Place>, GeocodeError>> {
            Box::pin(async move {
                self.queries.lock().unwrap().push(query.to_string());
                if query == "fail" {
                    return Err(GeocodeError::Status(503));
                }
                Ok(vec![Place {
                    display_name: query.to_string(),
                    coord: LatLng::new(1.0, 2.0),
                    kind: "city".into(),
                }])
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_keystrokes_searches_once() {
        let geocoder = Arc::new(FakeGeocoder::default());
        let resolver = LocationResolver::new(geocoder.clone(), DebounceConfig::default());
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(resolver.run(in_rx, out_tx));

        for q in ["Ber", "Berl", "Berli", "Berlin"] {
            in_tx.send(q.to_string()).unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let Some(Resolution::Found { query, places }) = out_rx.recv().await else {
            panic!("expected results");
        };
        assert_eq!(query, "Berlin");
        assert_eq!(places.len(), 1);
        assert_eq!(*geocoder.queries.lock().unwrap(), vec!["Berlin".to_string()]);

        drop(in_tx);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn short_input_clears_and_never_searches() {
        let geocoder = Arc::new(FakeGeocoder::default());
        let resolver = LocationResolver::new(geocoder.clone(), DebounceConfig::default());
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(resolver.run(in_rx, out_tx));

        in_tx.send("Rome".to_string()).unwrap();
        in_tx.send("Ro".to_string()).unwrap();
        assert!(matches!(out_rx.recv().await, Some(Resolution::Cleared)));
        tokio::time::sleep(Duration::from_secs(2)).await;

        drop(in_tx);
        task.await.unwrap();
        assert!(geocoder.queries.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_reported_not_fatal() {
        let resolver = LocationResolver::new(Arc::new(FakeGeocoder::default()), DebounceConfig::default());
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        tokio::spawn(resolver.run(in_rx, out_tx));

        in_tx.send("fail".to_string()).unwrap();
        assert!(matches!(
            out_rx.recv().await,
            Some(Resolution::Failed { error: GeocodeError::Status(503), .. })
        ));
        in_tx.send("Oslo".to_string()).unwrap();
        assert!(matches!(out_rx.recv().await, Some(Resolution::Found { .. })));
    }

    #[tokio::test]
    async fn resolve_enforces_min_length() {
        let resolver = LocationResolver::new(Arc::new(FakeGeocoder::default()), DebounceConfig::default());
        assert!(matches!(
            resolver.resolve(" ab ").await,
            Err(GeocodeError::QueryTooShort(q)) if q == "ab"
        ));
        assert_eq!(resolver.resolve("Madrid").await.unwrap()[0].display_name, "Madrid");
    }
}
