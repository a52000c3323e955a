use anyhow::{bail, Context};
use std::time::{Duration, Instant};
use tilelet::{
    LngLat, MapSource, RasterSurface, TileLayer, TileLoadingConfig, Viewport,
};

const USAGE: &str = "usage: tilelet-app <lon> <lat> <zoom> <width> <height> <out.png> [osm|autonavi|autonavi-satellite|<source.json>]";

/// How long to wait for tiles before writing whatever has arrived
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

struct Args {
    center: LngLat,
    zoom: u8,
    width: u32,
    height: u32,
    output: String,
    source: MapSource,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 6 {
        bail!(USAGE);
    }

    let lon: f64 = args[0].parse().context("invalid longitude")?;
    let lat: f64 = args[1].parse().context("invalid latitude")?;
    let zoom: u8 = args[2].parse().context("invalid zoom")?;
    let width: u32 = args[3].parse().context("invalid width")?;
    let height: u32 = args[4].parse().context("invalid height")?;

    let source = match args.get(6).map(String::as_str) {
        None | Some("osm") => MapSource::openstreetmap(),
        Some("autonavi") => MapSource::autonavi(),
        Some("autonavi-satellite") => MapSource::autonavi_satellite(),
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading source definition {path}"))?;
            MapSource::from_json(&json)?
        }
    };

    Ok(Args {
        center: LngLat::new(lon, lat),
        zoom,
        width,
        height,
        output: args[5].clone(),
        source,
    })
}

/// Render one viewport to a PNG file
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let zoom = args.zoom.min(args.source.max_zoom());
    let viewport = Viewport::new(args.center, zoom, args.width as f64, args.height as f64);
    log::info!(
        "rendering {} at ({}, {}) z{} into {}x{}",
        args.source.name,
        viewport.center.lng,
        viewport.center.lat,
        viewport.zoom,
        args.width,
        args.height
    );

    let mut surface = RasterSurface::new(args.width, args.height)?;
    let mut layer = TileLayer::with_http("base", args.source, TileLoadingConfig::default());
    layer.render(&viewport, &mut surface, false)?;

    let started = Instant::now();
    while !layer.is_settled() {
        if started.elapsed() > SETTLE_TIMEOUT {
            log::warn!("{} loads still pending after {:?}", layer.pending_loads(), SETTLE_TIMEOUT);
            break;
        }
        layer.process_load_results(&mut surface);
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    layer.process_load_results(&mut surface);

    // Let the fade-in run to completion
    while layer.tick(tilelet::prelude::Instant::now(), &mut surface) {
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    surface.save(&args.output)?;
    log::info!(
        "wrote {} ({} tiles, {} cached)",
        args.output,
        layer.needed_len(),
        layer.cache_len()
    );
    Ok(())
}
