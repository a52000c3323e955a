//! Tile URL resolution: template placeholders, domain sharding and provider hooks.
//!
//! Templates use `{x}`, `{y}` and `{z}` for the tile row, column and zoom. A
//! bracketed numeric range such as `{1-4}` is a domain-shard marker and is replaced
//! by one integer of that inclusive range, spreading requests across subdomains.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{core::geo::TileKey, tiles::source::MapSource};

/// A parsed `{lo-hi}` shard marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardPattern {
    /// Byte range of the marker, braces included
    pub span: (usize, usize),
    pub low: u32,
    pub high: u32,
}

impl ShardPattern {
    /// Find the first shard marker in `template`
    pub fn find(template: &str) -> Option<Self> {
        let bytes = template.as_bytes();
        let mut search_from = 0;
        while let Some(rel) = template[search_from..].find('{') {
            let start = search_from + rel;
            let end = match template[start..].find('}') {
                Some(close) => start + close,
                None => return None,
            };
            if let Some((low, high)) = parse_range(&template[start + 1..end]) {
                return Some(Self {
                    span: (start, end + 1),
                    low,
                    high,
                });
            }
            search_from = start + 1;
            if search_from >= bytes.len() {
                break;
            }
        }
        None
    }

    /// Number of shards in the range
    pub fn len(&self) -> usize {
        usize::try_from(self.span_len()).unwrap_or(usize::MAX)
    }

    fn span_len(&self) -> u64 {
        u64::from(self.high) - u64::from(self.low) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The `n`-th shard, wrapping around the range
    pub fn nth(&self, n: usize) -> u32 {
        // `n % span_len` is below `high - low + 1`, so the sum stays within `low..=high`
        (u64::from(self.low) + n as u64 % self.span_len()) as u32
    }

    pub fn substitute(&self, template: &str, shard: u32) -> String {
        let mut url = String::with_capacity(template.len());
        url.push_str(&template[..self.span.0]);
        url.push_str(&shard.to_string());
        url.push_str(&template[self.span.1..]);
        url
    }
}

/// `"1-4"`, `"1 - 4"` or `"3"`; reversed bounds are normalized
fn parse_range(inner: &str) -> Option<(u32, u32)> {
    if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_digit() || c == '-' || c == ' ') {
        return None;
    }
    let mut parts = inner.split('-').map(str::trim);
    let low: u32 = parts.next()?.parse().ok()?;
    let high: u32 = match parts.next() {
        Some(part) => part.parse().ok()?,
        None => low,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((low.min(high), low.max(high)))
}

/// Builds fetch URLs for tiles.
///
/// Shard markers are filled round-robin, so consecutive requests cycle through
/// every subdomain evenly.
#[derive(Debug, Default)]
pub struct UrlResolver {
    next_shard: AtomicUsize,
}

impl UrlResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// One URL for `key` from `template`, honouring the source's hooks.
    ///
    /// A URL builder takes precedence over the template; otherwise the optional
    /// tile transform remaps the key before the placeholders are filled.
    pub fn resolve(&self, key: TileKey, template: &str, source: &MapSource) -> String {
        let template = match ShardPattern::find(template) {
            Some(pattern) => {
                let n = self.next_shard.fetch_add(1, Ordering::Relaxed);
                pattern.substitute(template, pattern.nth(n))
            }
            None => template.to_string(),
        };

        if let Some(builder) = &source.url_builder {
            return builder(key);
        }

        let key = match &source.tile_transform {
            Some(transform) => transform(key),
            None => key,
        };

        template
            .replace("{x}", &key.row.to_string())
            .replace("{y}", &key.col.to_string())
            .replace("{z}", &key.zoom.to_string())
    }

    /// One URL per configured template, in template order
    pub fn resolve_all(&self, key: TileKey, source: &MapSource) -> Vec<String> {
        if source.urls.is_empty() {
            return source
                .url_builder
                .as_ref()
                .map(|builder| vec![builder(key)])
                .unwrap_or_default();
        }
        source
            .urls
            .iter()
            .map(|template| self.resolve(key, template, source))
            .collect()
    }
}
