// src/fetch/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use url::Url;

pub mod links;
pub mod pdf;

pub use links::{discover_links, DocumentLink};

/// Supplies the markup of a listing page.
#[allow(async_fn_in_trait)]
pub trait LinkSource {
    async fn fetch_markup(&self, url: &Url) -> Result<String>;
}

/// `LinkSource` over plain HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl LinkSource for HttpSource {
    async fn fetch_markup(&self, url: &Url) -> Result<String> {
        self.client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {}", url))?
            .error_for_status()?
            .text()
            .await
            .with_context(|| format!("reading body from {}", url))
    }
}
