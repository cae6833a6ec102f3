//! Background weather fetching with last-request-wins delivery.
//! Network work runs on a tokio runtime; results come back over an unbounded
//! mpsc channel. Async front ends `recv().await` on it, UI loops poll `try_recv`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::provider::WeatherClient;
use crate::types::{WeatherError, WeatherSnapshot};

/// A finished fetch, tagged with the ticket issued by [`WeatherDispatcher::request`].
#[derive(Debug)]
pub struct WeatherUpdate {
    pub ticket: u64,
    pub area_code: String,
    pub result: Result<WeatherSnapshot, WeatherError>,
}

impl WeatherUpdate {
    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        self.result.as_ref().ok()
    }
}

/// Issues fetches off the caller's thread and lets the receiver drop results
/// that a newer request has superseded. In-flight requests are not cancelled.
#[derive(Debug, Clone)]
pub struct WeatherDispatcher {
    client: WeatherClient,
    runtime: Handle,
    latest: Arc<AtomicU64>,
    tx: UnboundedSender<WeatherUpdate>,
}

impl WeatherDispatcher {
    pub fn new(client: WeatherClient, runtime: Handle) -> (Self, UnboundedReceiver<WeatherUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            client,
            runtime,
            latest: Arc::new(AtomicU64::new(0)),
            tx,
        };
        (dispatcher, rx)
    }

    /// Start a fetch and return its ticket. Sends a [`WeatherUpdate`] when done.
    pub fn request(&self, area_code: &str, api_key: &str) -> u64 {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let client = self.client.clone();
        let tx = self.tx.clone();
        let area_code = area_code.to_string();
        let api_key = api_key.to_string();

        tracing::debug!("Weather request #{} for {}", ticket, area_code);
        self.runtime.spawn(async move {
            let result = client.try_fetch_live_weather(&area_code, &api_key).await;
            // Receiver gone means the front end shut down.
            let _ = tx.send(WeatherUpdate {
                ticket,
                area_code,
                result,
            });
        });

        ticket
    }

    /// Ticket of the most recently issued request (0 before any request).
    pub fn latest_ticket(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        ticket == self.latest_ticket()
    }

    /// Pass `update` through only if no newer request has been issued.
    pub fn accept(&self, update: WeatherUpdate) -> Option<WeatherUpdate> {
        if self.is_current(update.ticket) {
            Some(update)
        } else {
            tracing::debug!(
                "Discarding stale weather result #{} (latest #{})",
                update.ticket,
                self.latest_ticket()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_tickets_increase() {
        let rt = runtime();
        let client = WeatherClient::with_base_url("http://127.0.0.1:9").unwrap();
        let (dispatcher, mut rx) = WeatherDispatcher::new(client, rt.handle().clone());

        assert_eq!(dispatcher.latest_ticket(), 0);
        let first = dispatcher.request("440306", "");
        let second = dispatcher.request("440300", "");
        assert!(second > first);
        assert!(dispatcher.is_current(second));
        assert!(!dispatcher.is_current(first));

        // Blank keys fail fast without touching the network.
        for _ in 0..2 {
            let update = rt
                .block_on(async { tokio::time::timeout(Duration::from_secs(5), rx.recv()).await })
                .unwrap()
                .unwrap();
            assert!(matches!(update.result, Err(WeatherError::MissingApiKey)));
        }
    }

    #[test]
    fn test_polling_receiver_sees_finished_fetch() {
        let rt = runtime();
        let client = WeatherClient::with_base_url("http://127.0.0.1:9").unwrap();
        let (dispatcher, mut rx) = WeatherDispatcher::new(client, rt.handle().clone());

        assert!(rx.try_recv().is_err());
        let ticket = dispatcher.request("440306", "");

        let mut polled = None;
        for _ in 0..100 {
            if let Ok(update) = rx.try_recv() {
                polled = Some(update);
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        let update = dispatcher.accept(polled.unwrap()).unwrap();
        assert_eq!(update.ticket, ticket);
    }

    #[test]
    fn test_stale_update_is_discarded() {
        let rt = runtime();
        let client = WeatherClient::with_base_url("http://127.0.0.1:9").unwrap();
        let (dispatcher, _rx) = WeatherDispatcher::new(client, rt.handle().clone());

        let old = dispatcher.request("440306", "");
        let _new = dispatcher.request("440300", "");

        let stale = WeatherUpdate {
            ticket: old,
            area_code: "440306".into(),
            result: Err(WeatherError::NoData),
        };
        assert!(dispatcher.accept(stale).is_none());
    }
}
