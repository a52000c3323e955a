use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tilelet::{
    prelude::Instant, DrawCommand, ImageFetcher, LngLat, MapError, MapSource, RenderContext, Result,
    TileImage, TileKey, TileLayer, TileLoadingConfig, TileState, Viewport,
};
use tokio::sync::Semaphore;

fn solid_tile() -> TileImage {
    TileImage::new(RgbaImage::from_pixel(256, 256, Rgba([200, 180, 160, 255])))
}

/// Succeeds immediately and remembers every requested URL
#[derive(Default)]
struct RecordingFetcher {
    urls: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageFetcher for RecordingFetcher {
    async fn fetch(&self, url: &str) -> Result<TileImage> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(solid_tile())
    }
}

/// Fails every request whose URL contains `needle`
struct FailingFetcher {
    needle: &'static str,
    calls: AtomicUsize,
}

impl FailingFetcher {
    fn new(needle: &'static str) -> Self {
        Self {
            needle,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ImageFetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> Result<TileImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains(self.needle) {
            Err(MapError::Http {
                status: 404,
                url: url.to_string(),
            })
        } else {
            Ok(solid_tile())
        }
    }
}

/// Holds every request until the test releases permits
struct GatedFetcher {
    gate: Semaphore,
}

#[async_trait]
impl ImageFetcher for GatedFetcher {
    async fn fetch(&self, _url: &str) -> Result<TileImage> {
        let permit = self.gate.acquire().await;
        drop(permit);
        Ok(solid_tile())
    }
}

fn hangzhou() -> Viewport {
    Viewport::new(LngLat::new(120.19, 30.26), 15, 800.0, 600.0)
}

fn layer_with(source: MapSource, fetcher: Arc<dyn ImageFetcher>, config: TileLoadingConfig) -> TileLayer {
    TileLayer::new("test", source, fetcher, config)
}

async fn settle_at(layer: &mut TileLayer, ctx: &mut RenderContext, now: Instant) {
    for _ in 0..400 {
        layer.process_load_results_at(ctx, now);
        if layer.is_settled() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("{} loads never settled", layer.pending_loads());
}

async fn settle(layer: &mut TileLayer, ctx: &mut RenderContext) {
    settle_at(layer, ctx, Instant::now()).await
}

fn needed_keys(layer: &TileLayer) -> Vec<TileKey> {
    layer.last_tile_set().unwrap().needed().into_iter().collect()
}

fn image_opacities(ctx: &RenderContext) -> Vec<f32> {
    ctx.image_draws().map(|(_, opacity)| opacity).collect()
}

#[tokio::test]
async fn test_cached_tiles_keep_their_identity() {
    let mut layer = layer_with(
        MapSource::default(),
        Arc::new(RecordingFetcher::default()),
        TileLoadingConfig::for_testing(),
    );
    let mut ctx = RenderContext::new(800, 600).unwrap();

    layer.render(&hangzhou(), &mut ctx, false).unwrap();
    let keys = needed_keys(&layer);
    let before: Vec<*const _> = keys.iter().map(|k| layer.tile(k).unwrap() as *const _).collect();
    settle(&mut layer, &mut ctx).await;

    // Visit somewhere else so the cache grows, then come back
    let elsewhere = Viewport::new(LngLat::new(-0.12, 51.5), 14, 800.0, 600.0);
    layer.render(&elsewhere, &mut ctx, false).unwrap();
    settle(&mut layer, &mut ctx).await;
    assert!(layer.cache_len() > keys.len());

    layer.render(&hangzhou(), &mut ctx, false).unwrap();
    for (key, ptr) in keys.iter().zip(before) {
        assert!(std::ptr::eq(layer.tile(key).unwrap(), ptr), "tile {key} was rebuilt");
    }
}

#[tokio::test]
async fn test_second_pass_reuses_cache_and_draws_every_tile() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut layer = layer_with(MapSource::default(), fetcher.clone(), TileLoadingConfig::for_testing());
    let mut ctx = RenderContext::new(800, 600).unwrap();

    layer.render(&hangzhou(), &mut ctx, false).unwrap();
    settle(&mut layer, &mut ctx).await;
    let fetched = fetcher.urls.lock().unwrap().len();
    assert_eq!(fetched, layer.needed_len());

    ctx.begin_frame();
    layer.render(&hangzhou(), &mut ctx, false).unwrap();
    assert_eq!(ctx.image_draws().count(), layer.needed_len());
    // Nothing new was requested
    assert_eq!(fetcher.urls.lock().unwrap().len(), fetched);
}

#[tokio::test]
async fn test_pan_moves_cached_tiles() {
    let mut layer = layer_with(
        MapSource::default(),
        Arc::new(RecordingFetcher::default()),
        TileLoadingConfig::for_testing(),
    );
    let mut ctx = RenderContext::new(800, 600).unwrap();
    layer.render(&hangzhou(), &mut ctx, false).unwrap();
    settle(&mut layer, &mut ctx).await;

    let panned = Viewport::new(LngLat::new(120.191, 30.2605), 15, 800.0, 600.0);
    layer.render(&panned, &mut ctx, false).unwrap();
    for placement in &layer.last_tile_set().unwrap().placements {
        assert_eq!(layer.tile(&placement.key).unwrap().position(), placement.position);
    }
}

#[tokio::test]
async fn test_tiles_loaded_after_moving_away_stay_hidden() {
    let fetcher = Arc::new(GatedFetcher {
        gate: Semaphore::new(0),
    });
    let mut layer = layer_with(MapSource::default(), fetcher.clone(), TileLoadingConfig::no_fade());
    let mut ctx = RenderContext::new(800, 600).unwrap();

    layer.render(&hangzhou(), &mut ctx, false).unwrap();
    let stale = needed_keys(&layer);

    let elsewhere = Viewport::new(LngLat::new(2.35, 48.85), 15, 800.0, 600.0);
    layer.render(&elsewhere, &mut ctx, false).unwrap();
    assert_eq!(layer.cache_len(), stale.len() + layer.needed_len());

    fetcher.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    settle(&mut layer, &mut ctx).await;

    for key in &stale {
        assert_eq!(layer.tile(key).unwrap().state(), TileState::Loaded);
        assert!(!layer.is_needed(key));
    }
    // Only the tiles of the current viewport were drawn
    assert_eq!(ctx.image_draws().count(), layer.needed_len());
}

#[tokio::test]
async fn test_exhausted_tiles_fail_without_drawing() {
    let fetcher = Arc::new(FailingFetcher::new("openstreetmap"));
    let mut layer = layer_with(MapSource::default(), fetcher.clone(), TileLoadingConfig::for_testing());
    let mut ctx = RenderContext::new(400, 300).unwrap();

    layer.render(&hangzhou(), &mut ctx, false).unwrap();
    settle(&mut layer, &mut ctx).await;

    let keys = needed_keys(&layer);
    for key in &keys {
        assert_eq!(layer.tile(key).unwrap().state(), TileState::Failed);
    }
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), keys.len() * 5);
    assert_eq!(ctx.image_draws().count(), 0);

    // A later pass still draws nothing and does not refetch
    layer.render(&hangzhou(), &mut ctx, false).unwrap();
    assert_eq!(ctx.image_draws().count(), 0);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), keys.len() * 5);
}

#[tokio::test]
async fn test_multi_url_tiles_draw_each_image_in_order() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut layer = layer_with(
        MapSource::autonavi_satellite(),
        fetcher.clone(),
        TileLoadingConfig::for_testing(),
    );
    let mut ctx = RenderContext::new(800, 600).unwrap();

    layer.render(&hangzhou(), &mut ctx, false).unwrap();
    settle(&mut layer, &mut ctx).await;

    let keys = needed_keys(&layer);
    assert_eq!(fetcher.urls.lock().unwrap().len(), keys.len() * 2);
    assert_eq!(ctx.image_draws().count(), keys.len() * 2);
    for key in &keys {
        let tile = layer.tile(key).unwrap();
        assert_eq!(tile.urls().len(), 2);
        assert!(tile.urls()[0].contains("style=6"));
        assert_eq!(tile.images().count(), 2);
    }
}

#[tokio::test]
async fn test_one_failed_overlay_still_loads_tile() {
    let fetcher = Arc::new(FailingFetcher::new("style=6"));
    let mut layer = layer_with(
        MapSource::autonavi_satellite(),
        fetcher,
        TileLoadingConfig::for_testing(),
    );
    let mut ctx = RenderContext::new(512, 512).unwrap();

    layer.render(&hangzhou(), &mut ctx, false).unwrap();
    settle(&mut layer, &mut ctx).await;

    for key in needed_keys(&layer) {
        let tile = layer.tile(&key).unwrap();
        assert_eq!(tile.state(), TileState::Loaded);
        assert_eq!(tile.images().count(), 1);
    }
    assert_eq!(ctx.image_draws().count(), layer.needed_len());
}

#[tokio::test]
async fn test_shards_spread_over_subdomains() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut layer = layer_with(MapSource::autonavi(), fetcher.clone(), TileLoadingConfig::for_testing());
    let mut ctx = RenderContext::new(1024, 1024).unwrap();
    let viewport = Viewport::new(LngLat::new(120.19, 30.26), 12, 1024.0, 1024.0);

    layer.render(&viewport, &mut ctx, false).unwrap();
    settle(&mut layer, &mut ctx).await;

    let urls = fetcher.urls.lock().unwrap();
    assert!(urls.len() >= 16);
    for shard in 1..=4 {
        let host = format!("https://webrd0{shard}.");
        assert!(urls.iter().any(|u| u.starts_with(&host)), "no request to {host}");
    }
    assert!(urls.iter().all(|u| !u.contains('{')));
}

#[tokio::test]
async fn test_fade_runs_to_opaque() {
    let mut layer = layer_with(
        MapSource::default(),
        Arc::new(RecordingFetcher::default()),
        TileLoadingConfig::default(),
    );
    let mut ctx = RenderContext::new(800, 600).unwrap();
    let t0 = Instant::now();

    layer.render_at(&hangzhou(), &mut ctx, false, t0).unwrap();
    settle_at(&mut layer, &mut ctx, t0).await;
    let needed = layer.needed_len();
    assert!(image_opacities(&ctx).iter().all(|&o| o == 0.0));
    assert!(layer.is_animating());

    ctx.begin_frame();
    assert!(layer.tick(t0 + Duration::from_millis(200), &mut ctx));
    let halfway = image_opacities(&ctx);
    assert_eq!(halfway.len(), needed);
    assert!(halfway.iter().all(|&o| (o - 0.5).abs() < 1e-3));

    ctx.begin_frame();
    assert!(!layer.tick(t0 + Duration::from_millis(400), &mut ctx));
    assert!(image_opacities(&ctx).iter().all(|&o| o == 1.0));
    assert!(!layer.is_animating());

    // Forcing a fade hides visible tiles and starts over
    let t1 = t0 + Duration::from_secs(1);
    ctx.begin_frame();
    layer.render_at(&hangzhou(), &mut ctx, true, t1).unwrap();
    assert!(image_opacities(&ctx).iter().all(|&o| o == 0.0));
    assert!(layer.is_animating());
    assert!(!layer.tick(t1 + Duration::from_millis(400), &mut ctx));
}

#[tokio::test]
async fn test_layer_from_json_source() {
    let source = MapSource::from_json(
        r#"{ "name": "json", "urls": ["https://tiles.example.com/{z}/{x}/{y}.png"], "maxZoom": 16 }"#,
    )
    .unwrap();
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut layer = layer_with(source, fetcher.clone(), TileLoadingConfig::for_testing());
    let mut ctx = RenderContext::new(256, 256).unwrap();

    layer.render(&Viewport::new(LngLat::new(0.0, 0.0), 2, 256.0, 256.0), &mut ctx, false).unwrap();
    settle(&mut layer, &mut ctx).await;

    let urls = fetcher.urls.lock().unwrap();
    assert!(urls.contains(&"https://tiles.example.com/2/2/2.png".to_string()));
    assert!(ctx
        .get_drawing_queue()
        .iter()
        .any(|cmd| matches!(cmd, DrawCommand::Image { .. })));
}
