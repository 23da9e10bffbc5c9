use anyhow::Context;
use reqwest::{
    Method, Url,
    blocking::{Client, RequestBuilder},
};
use serde_json::Value as Json;

use crate::config::InstanceConfig;

/// Raw document exchange with an instance.
///
/// Paths are relative to the API root, e.g. `blocks/counter`.
pub trait Transport {
    /// `GET` a document.
    fn fetch(&self, path: &str) -> anyhow::Result<Json>;

    /// `PUT` a document, returning the response body.
    fn send(&self, path: &str, payload: &Json) -> anyhow::Result<Json>;

    /// `DELETE` a document.
    fn remove(&self, path: &str) -> anyhow::Result<()>;
}

/// Blocking REST client authenticating with HTTP basic auth.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
}

impl RestClient {
    pub fn new(config: &InstanceConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url())
            .with_context(|| format!("invalid instance address {}", config.base_url()))?;
        let client = Client::builder()
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {e}"))?;

        Ok(Self {
            client,
            base_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Point the client at an explicit base URL, keeping the credentials.
    pub fn with_base_url(mut self, base_url: &str) -> anyhow::Result<Self> {
        self.base_url = Url::parse(base_url)?;
        Ok(self)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> anyhow::Result<RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("invalid request path: {path}"))?;
        Ok(self
            .client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password)))
    }

    fn execute(&self, method: Method, path: &str, builder: RequestBuilder) -> anyhow::Result<Json> {
        debug!("{method} {path}");
        let response = builder
            .send()
            .with_context(|| format!("{method} {path} failed"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{method} {path} returned {status}");
        }

        let body = response
            .text()
            .with_context(|| format!("{method} {path}: can not read response body"))?;
        if body.trim().is_empty() {
            return Ok(Json::Null);
        }
        serde_json::from_str(&body).with_context(|| format!("{method} {path}: response is not JSON"))
    }
}

impl Transport for RestClient {
    fn fetch(&self, path: &str) -> anyhow::Result<Json> {
        let builder = self.request(Method::GET, path)?;
        self.execute(Method::GET, path, builder)
    }

    fn send(&self, path: &str, payload: &Json) -> anyhow::Result<Json> {
        let builder = self.request(Method::PUT, path)?.json(payload);
        self.execute(Method::PUT, path, builder)
    }

    fn remove(&self, path: &str) -> anyhow::Result<()> {
        let builder = self.request(Method::DELETE, path)?;
        self.execute(Method::DELETE, path, builder)?;
        Ok(())
    }
}
