//! Hugging Face datasets-server connector.
//!
//! Pages through `GET {endpoint}/rows` lazily: a page is only requested when
//! the caller has consumed the previous one.

use super::{RawRow, RowStream, SourceConnector};
use crate::error::{DatasetError, DatasetResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

/// The rows API never returns more than this many rows per request.
pub const MAX_PAGE_SIZE: usize = 100;

const DEFAULT_ENDPOINT: &str = "https://datasets-server.huggingface.co";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bearer token for gated datasets.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for HubSettings {
    fn default() -> Self {
        Self { endpoint: default_endpoint(), token: None, timeout_secs: default_timeout_secs() }
    }
}

#[derive(Debug, Deserialize)]
struct RowsPage {
    rows: Vec<RowEntry>,
    #[serde(default)]
    num_rows_total: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row: RawRow,
}

pub struct HubConnector {
    id: String,
    endpoint: String,
    token: Option<String>,
    dataset: String,
    config: String,
    split: String,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for HubConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubConnector")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("dataset", &self.dataset)
            .field("config", &self.config)
            .field("split", &self.split)
            .finish_non_exhaustive()
    }
}

impl HubConnector {
    pub fn new(
        id: &str,
        settings: &HubSettings,
        dataset: &str,
        config: Option<&str>,
        split: &str,
    ) -> DatasetResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("kitha-dataset/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| DatasetError::unavailable(id, format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            id: id.to_string(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            dataset: dataset.to_string(),
            config: config.unwrap_or("default").to_string(),
            split: split.to_string(),
            client,
        })
    }

    fn fetch_page(&self, offset: usize, length: usize) -> DatasetResult<RowsPage> {
        debug!(source = %self.id, offset, length, "fetching rows page");

        let mut request = self.client.get(format!("{}/rows", self.endpoint)).query(&[
            ("dataset", self.dataset.as_str()),
            ("config", self.config.as_str()),
            ("split", self.split.as_str()),
            ("offset", &offset.to_string()),
            ("length", &length.to_string()),
        ]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| DatasetError::unavailable(&self.id, e))?;

        response.json::<RowsPage>().map_err(|e| {
            DatasetError::schema(&self.id, format!("unexpected rows response: {e}"))
        })
    }
}

impl SourceConnector for HubConnector {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self, limit_hint: Option<usize>) -> DatasetResult<RowStream<'_>> {
        let page_size = limit_hint.map_or(MAX_PAGE_SIZE, |n| n.clamp(1, MAX_PAGE_SIZE));
        // The first page is fetched eagerly so an unreachable source fails here.
        let first = self.fetch_page(0, page_size)?;

        let mut pager = HubPager {
            connector: self,
            page_size,
            offset: 0,
            total: None,
            buffer: VecDeque::new(),
            exhausted: false,
        };
        pager.absorb(first);
        Ok(Box::new(pager))
    }
}

struct HubPager<'a> {
    connector: &'a HubConnector,
    page_size: usize,
    offset: usize,
    total: Option<usize>,
    buffer: VecDeque<RawRow>,
    exhausted: bool,
}

impl HubPager<'_> {
    fn absorb(&mut self, page: RowsPage) {
        if page.num_rows_total.is_some() {
            self.total = page.num_rows_total;
        }
        if page.rows.is_empty() {
            self.exhausted = true;
        }
        self.offset += page.rows.len();
        if self.total.is_some_and(|total| self.offset >= total) {
            self.exhausted = true;
        }
        self.buffer.extend(page.rows.into_iter().map(|entry| entry.row));
    }
}

impl Iterator for HubPager<'_> {
    type Item = DatasetResult<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            match self.connector.fetch_page(self.offset, self.page_size) {
                Ok(page) => self.absorb(page),
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
