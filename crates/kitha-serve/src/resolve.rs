//! Finding the bundle to serve: a local directory, or a remote repository
//! mirrored into the cache.

use crate::config::ServeConfig;
use crate::error::{ServeError, ServeResult};
use kitha_model::bundle::{MODEL_JSON, TOKENIZER_CONFIG_JSON, VOCAB_JSON};
use kitha_model::BundleManifest;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    Local(PathBuf),
    Remote { id: String, dir: PathBuf },
}

impl ModelSource {
    #[must_use]
    pub fn dir(&self) -> &Path {
        match self {
            Self::Local(dir) | Self::Remote { dir, .. } => dir,
        }
    }
}

#[must_use]
pub fn file_url(hub_url: &str, repo: &str, file: &str) -> String {
    format!("{}/{repo}/resolve/main/{file}", hub_url.trim_end_matches('/'))
}

/// Cache directory for one remote repository.
#[must_use]
pub fn cache_dir_for(cache_root: &Path, repo: &str) -> PathBuf {
    cache_root.join(repo.replace('/', "--"))
}

pub async fn resolve(config: &ServeConfig) -> ServeResult<ModelSource> {
    if config.model_path.join(MODEL_JSON).is_file() {
        info!(path = %config.model_path.display(), "Loading model from local path");
        return Ok(ModelSource::Local(config.model_path.clone()));
    }

    info!(model_id = %config.model_id, "Local bundle not found, using remote model");
    let dir = cache_dir_for(&config.cache_dir, &config.model_id);
    if dir.join(MODEL_JSON).is_file() {
        debug!(dir = %dir.display(), "Remote model already cached");
    } else {
        download(&config.hub_url, &config.model_id, &dir).await?;
    }
    Ok(ModelSource::Remote { id: config.model_id.clone(), dir })
}

/// Mirror a bundle into `dir`. `model.json` is written last so an
/// interrupted download is never mistaken for a cached one.
pub async fn download(hub_url: &str, repo: &str, dir: &Path) -> ServeResult<()> {
    let client = reqwest::Client::new();
    tokio::fs::create_dir_all(dir).await?;

    let manifest_url = file_url(hub_url, repo, MODEL_JSON);
    let manifest_bytes = fetch(&client, &manifest_url).await?;
    let manifest: BundleManifest = serde_json::from_slice(&manifest_bytes)?;
    let shards = manifest
        .shard_paths()
        .map_err(|e| ServeError::Download { url: manifest_url.clone(), reason: e.to_string() })?;

    let mut files: Vec<&str> = vec![VOCAB_JSON, TOKENIZER_CONFIG_JSON];
    files.extend(shards);

    for file in files {
        let bytes = fetch(&client, &file_url(hub_url, repo, file)).await?;
        tokio::fs::write(dir.join(file), &bytes).await?;
        debug!(file, bytes = bytes.len(), "Downloaded");
    }
    tokio::fs::write(dir.join(MODEL_JSON), &manifest_bytes).await?;

    info!(repo, dir = %dir.display(), shards = manifest.shard_count(), "Model downloaded");
    Ok(())
}

async fn fetch(client: &reqwest::Client, url: &str) -> ServeResult<Vec<u8>> {
    let failed = |reason: String| ServeError::Download { url: url.to_string(), reason };
    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| failed(e.to_string()))?;
    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    Ok(bytes.to_vec())
}
