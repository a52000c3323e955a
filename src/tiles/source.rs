//! Map source descriptors: where tiles come from and how their grid is laid out.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    core::{
        constants::{MAX_ZOOM, TILE_SIZE},
        geo::{LngLat, TileKey},
        projection::{Projection, ResolutionTable, SphericalMercator},
    },
    prelude::Arc,
    tiles::addressing::{Origin, TileGrid},
    MapError, Result,
};

/// Remaps an internal tile key into a provider's own numbering scheme.
pub type TileTransform = Arc<dyn Fn(TileKey) -> TileKey + Send + Sync>;

/// Builds a complete tile URL, bypassing the templates.
pub type UrlBuilder = Arc<dyn Fn(TileKey) -> String + Send + Sync>;

/// Converts the viewport center into the datum the provider's tiles are registered in.
pub type LngLatTransform = Arc<dyn Fn(LngLat) -> LngLat + Send + Sync>;

/// Immutable description of a raster tile provider.
///
/// Fixed for the lifetime of the layer that uses it.
#[derive(Clone)]
pub struct MapSource {
    pub name: String,
    pub urls: Vec<String>,
    pub origin: Origin,
    pub axis_y_up: bool,
    pub tile_size: u32,
    pub projection: Arc<dyn Projection>,
    pub resolutions: Arc<ResolutionTable>,
    pub tile_transform: Option<TileTransform>,
    pub url_builder: Option<UrlBuilder>,
    pub lng_lat_transform: Option<LngLatTransform>,
}

impl fmt::Debug for MapSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapSource")
            .field("name", &self.name)
            .field("urls", &self.urls)
            .field("origin", &self.origin)
            .field("axis_y_up", &self.axis_y_up)
            .field("tile_size", &self.tile_size)
            .field("projection", &self.projection)
            .field("max_zoom", &self.resolutions.max_zoom())
            .field("tile_transform", &self.tile_transform.is_some())
            .field("url_builder", &self.url_builder.is_some())
            .field("lng_lat_transform", &self.lng_lat_transform.is_some())
            .finish()
    }
}

impl MapSource {
    pub fn builder() -> MapSourceBuilder {
        MapSourceBuilder::new()
    }

    /// OpenStreetMap standard tiles
    pub fn openstreetmap() -> Self {
        Self::builder()
            .name("openstreetmap")
            .url("https://tile.openstreetmap.org/{z}/{x}/{y}.png")
            .build_unchecked()
    }

    /// AutoNavi street map, sharded over `webrd01`..`webrd04`
    pub fn autonavi() -> Self {
        Self::builder()
            .name("autonavi")
            .url("https://webrd0{1-4}.is.autonavi.com/appmaptile?x={x}&y={y}&z={z}&lang=zh_cn&size=1&scale=1&style=8")
            .build_unchecked()
    }

    /// AutoNavi imagery with a road/label overlay drawn on top
    pub fn autonavi_satellite() -> Self {
        Self::builder()
            .name("autonavi-satellite")
            .urls([
                "https://webst0{1-4}.is.autonavi.com/appmaptile?style=6&x={x}&y={y}&z={z}",
                "https://webst0{1-4}.is.autonavi.com/appmaptile?x={x}&y={y}&z={z}&lang=zh_cn&size=1&scale=1&style=8",
            ])
            .build_unchecked()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: MapSourceConfig = serde_json::from_str(json)?;
        config.into_source()
    }

    /// Addressing parameters derived from this source
    pub fn grid(&self) -> TileGrid {
        TileGrid {
            projection: self.projection.clone(),
            resolutions: self.resolutions.clone(),
            origin: self.origin,
            tile_size: self.tile_size,
        }
    }

    pub fn max_zoom(&self) -> u8 {
        self.resolutions.max_zoom()
    }
}

impl Default for MapSource {
    fn default() -> Self {
        Self::openstreetmap()
    }
}

/// Builder for [`MapSource`]; every field has an explicit default.
pub struct MapSourceBuilder {
    name: String,
    urls: Vec<String>,
    origin: Origin,
    axis_y_up: bool,
    tile_size: u32,
    projection: Arc<dyn Projection>,
    resolutions: Option<Arc<ResolutionTable>>,
    tile_transform: Option<TileTransform>,
    url_builder: Option<UrlBuilder>,
    lng_lat_transform: Option<LngLatTransform>,
}

impl Default for MapSourceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MapSourceBuilder {
    pub fn new() -> Self {
        Self {
            name: "custom".to_string(),
            urls: Vec::new(),
            origin: Origin::TopLeft,
            axis_y_up: false,
            tile_size: TILE_SIZE,
            projection: Arc::new(SphericalMercator),
            resolutions: None,
            tile_transform: None,
            url_builder: None,
            lng_lat_transform: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append one URL template
    pub fn url(mut self, template: impl Into<String>) -> Self {
        self.urls.push(template.into());
        self
    }

    /// Append several URL templates; each produces one image per tile, drawn in order
    pub fn urls<I, S>(mut self, templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.urls.extend(templates.into_iter().map(Into::into));
        self
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Tile rows count upwards while screen y counts downwards
    pub fn axis_y_up(mut self, axis_y_up: bool) -> Self {
        self.axis_y_up = axis_y_up;
        self
    }

    pub fn tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn projection(mut self, projection: Arc<dyn Projection>) -> Self {
        self.projection = projection;
        self
    }

    pub fn resolutions(mut self, resolutions: ResolutionTable) -> Self {
        self.resolutions = Some(Arc::new(resolutions));
        self
    }

    pub fn tile_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(TileKey) -> TileKey + Send + Sync + 'static,
    {
        self.tile_transform = Some(Arc::new(transform));
        self
    }

    pub fn url_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(TileKey) -> String + Send + Sync + 'static,
    {
        self.url_builder = Some(Arc::new(builder));
        self
    }

    pub fn lng_lat_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(LngLat) -> LngLat + Send + Sync + 'static,
    {
        self.lng_lat_transform = Some(Arc::new(transform));
        self
    }

    pub fn build(self) -> Result<MapSource> {
        if self.tile_size == 0 {
            return Err(MapError::Config("tile_size must be positive".to_string()));
        }
        if self.urls.is_empty() && self.url_builder.is_none() {
            return Err(MapError::Config(format!(
                "map source '{}' has neither url templates nor a url builder",
                self.name
            )));
        }
        if self.url_builder.is_none() {
            if let Some(template) = self
                .urls
                .iter()
                .find(|t| !["{x}", "{y}", "{z}"].iter().all(|p| t.contains(p)))
            {
                return Err(MapError::InvalidTemplate(template.clone()));
            }
        }
        Ok(self.build_unchecked())
    }

    fn build_unchecked(self) -> MapSource {
        let resolutions = self.resolutions.unwrap_or_else(|| {
            Arc::new(ResolutionTable::web_mercator(self.tile_size.max(1), MAX_ZOOM))
        });
        MapSource {
            name: self.name,
            urls: self.urls,
            origin: self.origin,
            axis_y_up: self.axis_y_up,
            tile_size: self.tile_size,
            projection: self.projection,
            resolutions,
            tile_transform: self.tile_transform,
            url_builder: self.url_builder,
            lng_lat_transform: self.lng_lat_transform,
        }
    }
}

/// Serializable subset of [`MapSource`], for sources defined in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapSourceConfig {
    pub name: String,
    pub urls: Vec<String>,
    pub origin: Origin,
    pub axis_y_up: bool,
    pub tile_size: u32,
    pub max_zoom: u8,
}

impl Default for MapSourceConfig {
    fn default() -> Self {
        Self {
            name: "custom".to_string(),
            urls: Vec::new(),
            origin: Origin::TopLeft,
            axis_y_up: false,
            tile_size: TILE_SIZE,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl MapSourceConfig {
    pub fn into_source(self) -> Result<MapSource> {
        if self.tile_size == 0 {
            return Err(MapError::Config("tile_size must be positive".to_string()));
        }
        MapSource::builder()
            .name(self.name)
            .urls(self.urls)
            .origin(self.origin)
            .axis_y_up(self.axis_y_up)
            .tile_size(self.tile_size)
            .resolutions(ResolutionTable::web_mercator(self.tile_size, self.max_zoom))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let source = MapSource::builder()
            .url("https://example.com/{z}/{x}/{y}.png")
            .build()
            .unwrap();
        assert_eq!(source.origin, Origin::TopLeft);
        assert!(!source.axis_y_up);
        assert_eq!(source.tile_size, 256);
        assert_eq!(source.max_zoom(), 18);
        assert!(source.tile_transform.is_none());
    }

    #[test]
    fn test_builder_requires_a_way_to_build_urls() {
        assert!(matches!(MapSource::builder().build(), Err(MapError::Config(_))));
        assert!(MapSource::builder()
            .url_builder(|key| format!("tile://{key}"))
            .build()
            .is_ok());
        assert!(MapSource::builder().url("x").tile_size(0).build().is_err());
    }

    #[test]
    fn test_template_needs_every_placeholder() {
        assert!(matches!(
            MapSource::builder().url("https://example.com/{z}/{x}.png").build(),
            Err(MapError::InvalidTemplate(_))
        ));
        // A url builder makes the template irrelevant
        assert!(MapSource::builder()
            .url("unused")
            .url_builder(|key| format!("tile://{key}"))
            .build()
            .is_ok());
    }

    #[test]
    fn test_presets() {
        assert_eq!(MapSource::openstreetmap().urls.len(), 1);
        assert!(MapSource::autonavi().urls[0].contains("{1-4}"));
        assert_eq!(MapSource::autonavi_satellite().urls.len(), 2);
    }

    #[test]
    fn test_from_json() {
        let source = MapSource::from_json(
            r#"{
                "name": "flipped",
                "urls": ["https://tiles.example.com/{z}/{x}/{y}.png"],
                "origin": "center",
                "axisYUp": true,
                "maxZoom": 12
            }"#,
        )
        .unwrap();

        assert_eq!(source.name, "flipped");
        assert_eq!(source.origin, Origin::Center);
        assert!(source.axis_y_up);
        assert_eq!(source.max_zoom(), 12);
        assert_eq!(source.grid().origin, Origin::Center);
    }

    #[test]
    fn test_from_json_without_urls_fails() {
        assert!(MapSource::from_json(r#"{ "name": "empty" }"#).is_err());
    }
}
