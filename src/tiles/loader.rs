use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::{
    core::{config::TileLoadingConfig, geo::TileKey},
    prelude::Arc,
    runtime::AsyncHandle,
    tiles::image::{ImageFetcher, ImageLoader, LoadOutcome},
};

/// Completion of one image of one tile
#[derive(Debug)]
pub struct LoadEvent {
    pub key: TileKey,
    /// Load generation of the tile when the request was issued
    pub generation: u64,
    /// Index of the URL template the image belongs to
    pub slot: usize,
    pub outcome: LoadOutcome,
}

/// Starts image loads and collects their completions.
///
/// Loads run in the background; finished ones queue up as [`LoadEvent`]s until
/// the owner drains them with [`TileLoader::try_recv_events`].
pub struct TileLoader {
    fetcher: Arc<dyn ImageFetcher>,
    config: TileLoadingConfig,
    event_tx: Sender<LoadEvent>,
    event_rx: Receiver<LoadEvent>,
}

impl TileLoader {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, config: TileLoadingConfig) -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            fetcher,
            config,
            event_tx,
            event_rx,
        }
    }

    /// Start one load per URL, tagged with `key` and `generation`
    pub fn start(&self, key: TileKey, generation: u64, urls: &[String]) -> Vec<Box<dyn AsyncHandle>> {
        urls.iter()
            .enumerate()
            .map(|(slot, url)| {
                let tx = self.event_tx.clone();
                ImageLoader::new(url.clone(), self.fetcher.clone(), &self.config).spawn(
                    move |outcome| {
                        let event = LoadEvent {
                            key,
                            generation,
                            slot,
                            outcome,
                        };
                        if tx.send(event).is_err() {
                            log::debug!("tile {} finished after its layer was dropped", key);
                        }
                    },
                )
            })
            .collect()
    }

    /// Take every completion that has arrived so far (non-blocking)
    pub fn try_recv_events(&self) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn has_pending_events(&self) -> bool {
        !self.event_rx.is_empty()
    }

    pub fn config(&self) -> &TileLoadingConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::image::test_fetchers::FlakyFetcher;
    use std::time::Duration;

    #[tokio::test]
    async fn test_events_carry_key_and_slot() {
        let loader = TileLoader::new(Arc::new(FlakyFetcher::new(0)), TileLoadingConfig::for_testing());
        let key = TileKey::new(4, 5, 6);
        let urls = vec!["a".to_string(), "b".to_string()];
        let handles = loader.start(key, 3, &urls);
        assert_eq!(handles.len(), 2);

        let mut events = Vec::new();
        for _ in 0..100 {
            events.extend(loader.try_recv_events());
            if events.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(events.len(), 2);
        events.sort_by_key(|e| e.slot);
        assert_eq!(events[0].outcome.url, "a");
        assert_eq!(events[1].outcome.url, "b");
        assert!(events.iter().all(|e| e.key == key && e.generation == 3));
        assert!(events.iter().all(|e| e.outcome.is_loaded()));
        assert!(!loader.has_pending_events());
    }
}
