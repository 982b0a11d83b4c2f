use std::time::Duration;

use nyc_rw_core::map::{select_backend, ActiveBackend, Connectivity, TileBackend};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use super::fetch::{check_connectivity, Fetch, HttpFetcher};

pub const CONNECTIVITY_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Receives connectivity changes from the background connectivity check and turns them into map backends.
pub struct ConnectivityMonitor {
    receiver: UnboundedReceiver<Connectivity>,
    tiles: TileBackend,
}

impl ConnectivityMonitor {
    pub const fn new(receiver: UnboundedReceiver<Connectivity>, tiles: TileBackend) -> Self {
        Self { receiver, tiles }
    }

    /// Starts probing `status_url` every `interval` on the tokio runtime.
    pub fn spawn(
        fetcher: HttpFetcher,
        status_url: String,
        initial: Connectivity,
        interval: Duration,
        tiles: TileBackend,
    ) -> Self {
        let (sender, receiver) = unbounded_channel();
        tokio::spawn(watch_connectivity(fetcher, status_url, initial, interval, sender));
        Self::new(receiver, tiles)
    }

    /// Latest backend when connectivity changed since the last call. Never blocks.
    pub fn poll(&mut self) -> Option<ActiveBackend> {
        let mut latest = None;
        while let Ok(connectivity) = self.receiver.try_recv() {
            latest = Some(connectivity);
        }
        latest.map(|connectivity| select_backend(connectivity, self.tiles.clone()))
    }
}

/// Sends each change of connectivity; stops once the receiver is gone.
pub async fn watch_connectivity<F: Fetch>(
    fetcher: F,
    status_url: String,
    initial: Connectivity,
    interval: Duration,
    sender: UnboundedSender<Connectivity>,
) {
    let mut last = initial;
    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately and startup already checked
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if sender.is_closed() {
            debug!("connectivity monitor stopped");
            return;
        }
        let current = check_connectivity(&fetcher, &status_url).await;
        if current != last {
            info!(?current, "connectivity changed");
            if sender.send(current).is_err() {
                return;
            }
            last = current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CachedResponse;
    use crate::offline::{CacheRequest, FetchError};

    struct Unreachable;

    impl Fetch for Unreachable {
        async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, FetchError> {
            Err(FetchError::Network {
                url: request.url.clone(),
                reason: "offline".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_losing_the_network_switches_to_the_schematic_map() {
        let (sender, receiver) = unbounded_channel();
        let mut monitor = ConnectivityMonitor::new(receiver, TileBackend::default());
        assert!(monitor.poll().is_none());

        tokio::spawn(watch_connectivity(
            Unreachable,
            "https://status.example/".to_string(),
            Connectivity::Online,
            Duration::from_millis(10),
            sender,
        ));

        let mut switched = None;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            switched = monitor.poll();
            if switched.is_some() {
                break;
            }
        }
        let backend = switched.expect("connectivity change");
        assert!(matches!(backend, ActiveBackend::Schematic(_)));

        // Still offline: nothing new to report
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(monitor.poll().is_none());
    }

    #[test]
    fn test_only_the_latest_change_counts() {
        let (sender, receiver) = unbounded_channel();
        let mut monitor = ConnectivityMonitor::new(receiver, TileBackend::default());
        sender.send(Connectivity::Offline).unwrap();
        sender.send(Connectivity::Online).unwrap();
        assert!(matches!(monitor.poll(), Some(ActiveBackend::Tiles(_))));
        assert!(monitor.poll().is_none());
    }
}
