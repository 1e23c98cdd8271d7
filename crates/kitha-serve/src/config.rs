use crate::error::{ServeError, ServeResult};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL_ID: &str = "kitha-ai/tweet-detector";
pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";

/// Prediction service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServeConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Local bundle directory, used when it contains `model.json`.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Remote repository fetched when the local bundle is absent.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_hub_url")]
    pub hub_url: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_model_path() -> PathBuf {
    PathBuf::from("./model")
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".cache/kitha/models")
}

fn default_hub_url() -> String {
    DEFAULT_HUB_URL.to_string()
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            model_path: default_model_path(),
            model_id: default_model_id(),
            cache_dir: default_cache_dir(),
            hub_url: default_hub_url(),
        }
    }
}

impl ServeConfig {
    /// Apply `MODEL_PATH`, `HF_MODEL_ID`, `KITHA_MODEL_CACHE` and `PORT`.
    pub fn apply_env<F>(mut self, lookup: F) -> ServeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("MODEL_PATH") {
            self.model_path = PathBuf::from(path);
        }
        if let Some(id) = lookup("HF_MODEL_ID") {
            self.model_id = id;
        }
        if let Some(cache) = lookup("KITHA_MODEL_CACHE") {
            self.cache_dir = PathBuf::from(cache);
        }
        if let Some(port) = lookup("PORT") {
            self.port = port.trim().parse().map_err(|_| ServeError::Config(format!("PORT '{port}' is not a port")))?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
