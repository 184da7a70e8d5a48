//! Shared HTTP transport.
//!
//! # Responsibilities
//! - Own one pooled `reqwest::Client` built from [`HttpSettings`]
//! - Cap concurrent requests at `max_total_connections`
//! - Encode request parameters (query string, form body, or multipart)
//! - Turn non-success statuses into [`ClientError::Status`]

use std::collections::BTreeSet;
use std::time::Duration;

use reqwest::redirect::Policy;
use serde_json::Value;
use tokio::sync::Semaphore;
use url::Url;

use crate::client::types::{ClientError, ClientResult, Method, SearchRequest};

const MAX_REDIRECTS: usize = 10;

/// Connection settings of the HTTP transport.
///
/// `Default` carries the client's own built-in values; configuration only
/// ever overrides individual fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    /// `None` waits indefinitely.
    pub connection_timeout: Option<Duration>,
    /// `None` waits indefinitely.
    pub socket_timeout: Option<Duration>,
    /// Parameter names always sent on the URL, even for form-encoded posts.
    pub query_params: BTreeSet<String>,
    pub allow_compression: bool,
    pub max_connections_per_host: usize,
    pub max_total_connections: usize,
    pub follow_redirects: bool,
    pub use_multipart_post: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connection_timeout: Some(Duration::from_secs(60)),
            socket_timeout: Some(Duration::from_secs(600)),
            query_params: BTreeSet::new(),
            allow_compression: false,
            max_connections_per_host: 32,
            max_total_connections: 128,
            follow_redirects: false,
            use_multipart_post: false,
        }
    }
}

/// Pooled HTTP transport shared by every endpoint of one client.
#[derive(Debug)]
pub struct Transport {
    http: reqwest::Client,
    settings: HttpSettings,
    permits: Semaphore,
}

impl Transport {
    pub fn new(settings: HttpSettings) -> ClientResult<Self> {
        let redirect = if settings.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(settings.max_connections_per_host)
            .gzip(settings.allow_compression)
            .redirect(redirect);
        if let Some(timeout) = settings.connection_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = settings.socket_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            permits: Semaphore::new(settings.max_total_connections.max(1)),
            settings,
        })
    }

    pub fn settings(&self) -> &HttpSettings {
        &self.settings
    }

    /// Send `request` to the endpoint at `base`.
    pub async fn execute(&self, base: &Url, request: &SearchRequest) -> ClientResult<Value> {
        let _permit = self.permits.acquire().await.map_err(|_| ClientError::Closed)?;
        let url = request_url(base, request)?;

        let (on_url, in_body): (Vec<_>, Vec<_>) = match (request.method, &request.body) {
            (Method::Post, None) => request
                .params
                .iter()
                .cloned()
                .partition(|(name, _)| self.settings.query_params.contains(name)),
            _ => (request.params.clone(), Vec::new()),
        };

        let builder = match request.method {
            Method::Get => self.http.get(url.clone()),
            Method::Post => self.http.post(url.clone()),
        }
        .query(&[("wt", "json")])
        .query(&on_url);

        let builder = match &request.body {
            Some(body) => builder.json(body),
            None if in_body.is_empty() => builder,
            None if self.settings.use_multipart_post => {
                let form = in_body
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                        form.text(name, value)
                    });
                builder.multipart(form)
            }
            None => builder.form(&in_body),
        };

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: format!("unreadable response body: {}", e),
        })
    }

    /// Refuse new requests. Fails if already closed.
    pub fn close(&self) -> ClientResult<()> {
        if self.permits.is_closed() {
            return Err(ClientError::Closed);
        }
        self.permits.close();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }
}

/// Parse an endpoint URL, keeping the configured string in the error.
pub fn parse_endpoint(raw: &str) -> ClientResult<Url> {
    Url::parse(raw.trim()).map_err(|source| ClientError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

fn request_url(base: &Url, request: &SearchRequest) -> ClientResult<Url> {
    let mut raw = base.as_str().trim_end_matches('/').to_string();
    if let Some(collection) = &request.collection {
        raw.push('/');
        raw.push_str(collection.trim_matches('/'));
    }
    raw.push_str(&request.path);
    parse_endpoint(&raw)
}
