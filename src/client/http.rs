//! Single-endpoint client.

use serde_json::Value;
use url::Url;

use crate::client::transport::{parse_endpoint, HttpSettings, Transport};
use crate::client::types::{ClientResult, SearchRequest};

/// Client bound to exactly one endpoint URL (usually a core or collection).
#[derive(Debug)]
pub struct HttpSearchClient {
    base_url: Url,
    transport: Transport,
}

impl HttpSearchClient {
    pub fn new(url: &str, settings: HttpSettings) -> ClientResult<Self> {
        Ok(Self {
            base_url: parse_endpoint(url)?,
            transport: Transport::new(settings)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn settings(&self) -> &HttpSettings {
        self.transport.settings()
    }

    pub async fn request(&self, request: &SearchRequest) -> ClientResult<Value> {
        self.transport.execute(&self.base_url, request).await
    }

    pub fn close(&self) -> ClientResult<()> {
        self.transport.close()
    }
}
