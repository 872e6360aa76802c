use async_trait::async_trait;
use std::path::PathBuf;
use url::Url;

use crate::error::DataError;

/// Where a static feed lives: a local file or an HTTP(S) resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Http(Url),
}

impl DataSource {
    pub fn parse(location: &str) -> Result<Self, DataError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(DataError::Source("empty location".to_string()));
        }
        match Url::parse(location) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(DataSource::Http(url)),
                "file" => url
                    .to_file_path()
                    .map(DataSource::File)
                    .map_err(|_| DataError::Source(location.to_string())),
                // Windows drive letters parse as one-letter schemes.
                s if s.len() == 1 => Ok(DataSource::File(PathBuf::from(location))),
                other => Err(DataError::Source(format!(
                    "unsupported scheme \"{}\" in {}",
                    other, location
                ))),
            },
            Err(_) => Ok(DataSource::File(PathBuf::from(location))),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            DataSource::File(path) => path.display().to_string(),
            DataSource::Http(url) => url.to_string(),
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source: &DataSource) -> Result<Vec<u8>, DataError>;
}

/// Reads local files with tokio and remote ones with reqwest. One attempt, no retry.
pub struct StaticFetcher {
    client: reqwest::Client,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for StaticFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, source: &DataSource) -> Result<Vec<u8>, DataError> {
        match source {
            DataSource::File(path) => tokio::fs::read(path).await.map_err(|e| DataError::Io {
                source: source.describe(),
                message: e.to_string(),
            }),
            DataSource::Http(url) => {
                let http_err = |e: reqwest::Error| DataError::Http {
                    source: source.describe(),
                    message: e.to_string(),
                };
                let resp = self
                    .client
                    .get(url.clone())
                    .send()
                    .await
                    .map_err(http_err)?
                    .error_for_status()
                    .map_err(http_err)?;
                let body = resp.bytes().await.map_err(http_err)?;
                Ok(body.to_vec())
            }
        }
    }
}
