// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Content fetching capability

use crate::error::FetchError;
use async_trait::async_trait;

pub use reqwest::Url;

/// Retrieves replacement markup for container elements
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Perform a GET-style request and return the response body
    ///
    /// # Arguments
    /// * `url` - Content source taken from the winning rule
    ///
    /// # Returns
    /// * `Result<String, FetchError>` - Body text, or why it could not be read
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// [`ContentFetcher`] backed by `reqwest`
///
/// Relative content sources are joined onto `base_url` when one is set.
/// Timeouts come from the configured client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    base_url: Option<Url>,
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher that requests absolute URLs as-is
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Create a fetcher using a preconfigured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            base_url: None,
            client,
        }
    }

    /// Resolve relative content sources against `base_url`
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        let parsed = match &self.base_url {
            Some(base) => base.join(url),
            None => Url::parse(url),
        };
        parsed.map_err(|err| FetchError::Transport {
            message: format!("invalid URL '{url}': {err}"),
        })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let url = self.resolve(url)?;
        log::debug!("GET {url}");
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
