use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;

use crate::config::Config;

/// Authenticated GET access to the conference system. `path` is either
/// relative to the base URL or an absolute URL.
pub trait PageSource {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String>;
}

pub struct PentaClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl PentaClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }
}

impl PageSource for PentaClient {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = self.url_for(path);
        debug!("GET {}", url);

        let mut request = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password));
        if !query.is_empty() {
            request = request.query(query);
        }

        let body = request
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .with_context(|| format!("Request to {} failed", url))?
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;
        Ok(body)
    }
}
