//! Single-image loading with timeout-driven retry.
//!
//! An [`ImageLoader`] runs `Loading -> {Loaded, Retrying -> Loading}*` until an
//! image decodes or the attempt cap is reached, and reports exactly one
//! [`LoadOutcome`].

use async_trait::async_trait;
use image::RgbaImage;
use once_cell::sync::Lazy;
use std::fmt;
use std::time::Duration;

use crate::{
    core::config::TileLoadingConfig,
    prelude::Arc,
    runtime::{self, AsyncHandle},
    MapError, Result,
};

/// Shared async HTTP client for tile fetching
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(concat!("tilelet/", env!("CARGO_PKG_VERSION")))
        .tcp_keepalive(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(16)
        .build()
        .expect("failed to build reqwest async client")
});

/// A decoded raster tile, cheap to clone
#[derive(Clone)]
pub struct TileImage(Arc<RgbaImage>);

impl TileImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self(Arc::new(pixels))
    }

    /// Decode PNG/JPEG bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self::new(decoded.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.0
    }
}

impl fmt::Debug for TileImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TileImage({}x{})", self.width(), self.height())
    }
}

/// Fetches and decodes one image.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<TileImage>;
}

/// Fetches tiles over HTTP(S) with the shared client
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpImageFetcher;

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<TileImage> {
        let response = HTTP_CLIENT.get(url).send().await?;
        if !response.status().is_success() {
            return Err(MapError::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        let bytes = response.bytes().await?;
        TileImage::decode(&bytes)
    }
}

/// Terminal result of an image load; `image` is `None` once attempts ran out
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub url: String,
    pub image: Option<TileImage>,
    pub attempts: u32,
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// The error describing a failed outcome
    pub fn error(&self) -> Option<MapError> {
        match self.image {
            Some(_) => None,
            None => Some(MapError::TileLoadExhausted {
                url: self.url.clone(),
                attempts: self.attempts,
            }),
        }
    }
}

/// One image request with bounded retry
pub struct ImageLoader {
    url: String,
    fetcher: Arc<dyn ImageFetcher>,
    timeout: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl ImageLoader {
    pub fn new(url: impl Into<String>, fetcher: Arc<dyn ImageFetcher>, config: &TileLoadingConfig) -> Self {
        Self {
            url: url.into(),
            fetcher,
            timeout: config.load_timeout(),
            max_attempts: config.max_attempts.max(1),
            attempts: 0,
        }
    }

    /// Drive the request to completion.
    ///
    /// A fetch error restarts immediately; a fetch that outlives the timeout is
    /// dropped and restarted. After `max_attempts` the outcome carries no image.
    pub async fn run(mut self) -> LoadOutcome {
        while self.attempts < self.max_attempts {
            self.attempts += 1;
            log::debug!("load {} attempt {}", self.url, self.attempts);

            let error = match tokio::time::timeout(self.timeout, self.fetcher.fetch(&self.url)).await {
                Ok(Ok(image)) => return self.finish(Some(image)),
                Ok(Err(e)) => e,
                Err(_) => MapError::TileLoadTimeout {
                    url: self.url.clone(),
                    after: self.timeout,
                },
            };

            log::warn!("load {} failed on attempt {}: {}", self.url, self.attempts, error);
        }

        log::warn!("giving up on {} after {} attempts", self.url, self.attempts);
        self.finish(None)
    }

    fn finish(self, image: Option<TileImage>) -> LoadOutcome {
        LoadOutcome {
            url: self.url,
            image,
            attempts: self.attempts,
        }
    }

    /// Start the load in the background and invoke `on_complete` once it settles.
    ///
    /// The callback runs at most once: exactly once if the task is left alone,
    /// never if it is cancelled through the returned handle.
    pub fn spawn<F>(self, on_complete: F) -> Box<dyn AsyncHandle>
    where
        F: FnOnce(LoadOutcome) + Send + 'static,
    {
        runtime::spawn(async move {
            let outcome = self.run().await;
            on_complete(outcome);
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_fetchers::*;
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_loads_on_first_attempt() {
        let fetcher = Arc::new(FlakyFetcher::new(0));
        let outcome = ImageLoader::new("a", fetcher.clone(), &TileLoadingConfig::default())
            .run()
            .await;
        assert!(outcome.is_loaded());
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.error().is_none());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_errors() {
        let fetcher = Arc::new(FlakyFetcher::new(3));
        let outcome = ImageLoader::new("b", fetcher.clone(), &TileLoadingConfig::default())
            .run()
            .await;
        assert!(outcome.is_loaded());
        assert_eq!(outcome.attempts, 4);
    }

    #[tokio::test]
    async fn test_always_failing_gives_up_after_five_attempts() {
        let fetcher = Arc::new(FlakyFetcher::new(u32::MAX));
        let outcome = ImageLoader::new("c", fetcher.clone(), &TileLoadingConfig::default())
            .run()
            .await;
        assert!(outcome.image.is_none());
        assert_eq!(outcome.attempts, 5);
        assert_eq!(fetcher.calls(), 5);
        assert!(matches!(
            outcome.error(),
            Some(MapError::TileLoadExhausted { attempts: 5, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_count_as_attempts() {
        let fetcher = Arc::new(HangingFetcher::default());
        let started = tokio::time::Instant::now();
        let outcome = ImageLoader::new("d", fetcher.clone(), &TileLoadingConfig::default())
            .run()
            .await;

        assert!(outcome.image.is_none());
        assert_eq!(outcome.attempts, 5);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 5);
        // One second per attempt
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_spawned_callback_fires_exactly_once() {
        let fetcher = Arc::new(FlakyFetcher::new(u32::MAX));
        let fired = Arc::new(AtomicU32::new(0));
        let (tx, rx) = crossbeam_channel::unbounded();

        let counter = fired.clone();
        let handle = ImageLoader::new("e", fetcher.clone(), &TileLoadingConfig::default()).spawn(
            move |outcome| {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(outcome);
            },
        );

        let mut outcome = None;
        for _ in 0..100 {
            if let Ok(received) = rx.try_recv() {
                outcome = Some(received);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        let outcome = outcome.expect("loader never completed");
        assert!(outcome.image.is_none());
        assert_eq!(outcome.attempts, 5);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(handle.is_finished());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_load_never_calls_back() {
        let fetcher = Arc::new(HangingFetcher::default());
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();

        let handle = ImageLoader::new("f", fetcher, &TileLoadingConfig::default())
            .spawn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            TileImage::decode(b"definitely not a png"),
            Err(MapError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_png() {
        let mut bytes = Vec::new();
        blank_image()
            .pixels()
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        let decoded = TileImage::decode(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (256, 256));
    }
}
