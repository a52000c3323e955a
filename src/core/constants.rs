//! Engine-wide constants for Web Mercator tile addressing and tile loading.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

use std::f64::consts::PI;
use std::time::Duration;

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Spherical Earth radius used by Web Mercator (EPSG:3857), in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Equatorial circumference of the projected sphere, in meters.
pub const EARTH_CIRCUMFERENCE: f64 = 2.0 * PI * EARTH_RADIUS;

/// Highest zoom level present in the default resolution table.
pub const MAX_ZOOM: u8 = 18;

/// Largest viewport side accepted, in pixels.
pub const MAX_VIEWPORT_SIZE: f64 = 16_384.0;

/// Most tiles a single render pass may cover.
pub const MAX_TILES_PER_VIEW: usize = 1 << 16;

/// Latitude at which the Mercator world becomes square; inputs are clamped to it.
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

/// How long a single image load may take before it is restarted.
pub const LOAD_TIMEOUT: Duration = Duration::from_millis(1000);

/// Attempts an image load makes before resolving with no image.
pub const MAX_LOAD_ATTEMPTS: u32 = 5;

/// Duration of the tile fade-in from its current opacity to fully opaque.
pub const FADE_IN_DURATION: Duration = Duration::from_millis(400);
