//! Boundary geometry, fetched once and kept on disk.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

use crate::config::{GeoConfig, GeoLayerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoLayer {
    Provinces,
    Municipalities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub geometry: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Feature {
    /// The `name` property, which is what choropleths key on.
    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureCollection {
    pub fn names(&self) -> Vec<&str> {
        self.features.iter().filter_map(Feature::name).collect()
    }
}

pub struct GeoCache {
    client: Client,
    cache_dir: PathBuf,
    layers: GeoConfig,
}

impl GeoCache {
    pub fn new(client: Client, cache_dir: impl Into<PathBuf>, layers: GeoConfig) -> Self {
        Self {
            client,
            cache_dir: cache_dir.into(),
            layers,
        }
    }

    fn layer(&self, layer: GeoLayer) -> &GeoLayerConfig {
        match layer {
            GeoLayer::Provinces => &self.layers.provinces,
            GeoLayer::Municipalities => &self.layers.municipalities,
        }
    }

    pub fn cache_path(&self, layer: GeoLayer) -> PathBuf {
        self.cache_dir.join(&self.layer(layer).cache_file)
    }

    /// The cached document when present, otherwise one GET whose body is
    /// validated, written to the cache and returned.
    #[instrument(level = "info", skip(self))]
    pub async fn load(&self, layer: GeoLayer) -> Result<FeatureCollection> {
        let path = self.cache_path(layer);
        if fs::try_exists(&path).await.unwrap_or(false) {
            return read_cached(&path).await;
        }

        let url = Url::parse(&self.layer(layer).url)
            .with_context(|| format!("parsing geometry url for {:?}", layer))?;
        info!(%url, "downloading geometry");
        let resp = self
            .client
            .get(url.as_str())
            .send()
            .await
            .with_context(|| format!("GET {}", url))?
            .error_for_status()?;
        let bytes = resp.bytes().await?;
        let collection: FeatureCollection = serde_json::from_slice(&bytes)
            .with_context(|| format!("decoding geometry from {}", url))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;
        info!(path = %path.display(), features = collection.features.len(), "cached geometry");
        Ok(collection)
    }
}

async fn read_cached(path: &Path) -> Result<FeatureCollection> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let collection: FeatureCollection = serde_json::from_slice(&bytes)
        .with_context(|| format!("decoding cached geometry {}", path.display()))?;
    if collection.features.is_empty() {
        return Err(anyhow!("cached geometry {} has no features", path.display()));
    }
    Ok(collection)
}
