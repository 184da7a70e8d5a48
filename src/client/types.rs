//! Client request types and error definitions.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// The three connection shapes a search resource can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyKind {
    /// One endpoint URL.
    Http,
    /// Client-side round-robin over several endpoint URLs.
    LoadBalancedHttp,
    /// Cluster-coordinated; requests are routed from fetched cluster state.
    Cloud,
}

impl TopologyKind {
    /// Interpret a configured topology tag.
    ///
    /// Tags are matched case-insensitively and `-` is treated as `_`, so
    /// `"LOAD_BALANCED_HTTP"` and `"load-balanced-http"` are the same tag.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "http" | "single" => Some(TopologyKind::Http),
            "load_balanced_http" | "load_balanced" | "lb_http" => Some(TopologyKind::LoadBalancedHttp),
            "cloud" | "clustered" => Some(TopologyKind::Cloud),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyKind::Http => "http",
            TopologyKind::LoadBalancedHttp => "load_balanced_http",
            TopologyKind::Cloud => "cloud",
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the underlying search clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The topology was given no endpoint URL.
    #[error("at least one endpoint url is required")]
    MissingEndpoints,

    /// An endpoint URL could not be parsed.
    #[error("invalid url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Transport level failure (connect, timeout, body decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{url} returned status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    /// Every endpoint was tried and none answered.
    #[error("no live endpoint among {tried} tried; last error: {last}")]
    NoLiveEndpoints { tried: usize, last: Box<ClientError> },

    /// The cluster state could not be fetched or understood.
    #[error("cluster state error: {0}")]
    ClusterState(String),

    /// A collection-less operation was issued to a cluster client without a
    /// default collection.
    #[error("no collection specified and no default collection configured")]
    NoDefaultCollection,

    /// A document lacks the configured id field.
    #[error("document is missing id field '{0}'")]
    MissingId(String),

    /// The client was closed.
    #[error("client is closed")]
    Closed,
}

impl ClientError {
    /// Whether another endpoint may succeed where this attempt failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ClientError::Status { status, .. } => *status >= 500 || *status == 404,
            _ => false,
        }
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// HTTP method of a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// What a request does, which decides how cluster clients route it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Query,
    Update,
    Commit,
    Rollback,
    Admin,
}

/// A request against a search endpoint.
///
/// `path` is relative to the endpoint (or collection) base URL and always
/// starts with `/`. The JSON response writer is always requested.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub method: Method,
    pub kind: RequestKind,
    pub path: String,
    pub collection: Option<String>,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl SearchRequest {
    fn new(method: Method, kind: RequestKind, path: &str) -> Self {
        Self {
            method,
            kind,
            path: path.to_string(),
            collection: None,
            params: Vec::new(),
            body: None,
        }
    }

    pub fn ping() -> Self {
        Self::new(Method::Get, RequestKind::Admin, "/admin/ping")
    }

    pub fn select(query: &str) -> Self {
        Self::new(Method::Get, RequestKind::Query, "/select").param("q", query)
    }

    pub fn add(documents: Vec<Value>) -> Self {
        let mut request = Self::new(Method::Post, RequestKind::Update, "/update");
        request.body = Some(Value::Array(documents));
        request
    }

    pub fn commit() -> Self {
        Self::new(Method::Post, RequestKind::Commit, "/update").param("commit", "true")
    }

    pub fn rollback() -> Self {
        let mut request = Self::new(Method::Post, RequestKind::Rollback, "/update");
        request.body = Some(serde_json::json!({ "rollback": {} }));
        request
    }

    /// Cluster status, optionally restricted to one collection.
    pub fn cluster_status(collection: Option<&str>) -> Self {
        let request = Self::new(Method::Get, RequestKind::Admin, "/admin/collections")
            .param("action", "CLUSTERSTATUS");
        match collection {
            Some(c) => request.param("collection", c),
            None => request,
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn in_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Whether the request lands on shard leaders in a cluster.
    pub fn is_update(&self) -> bool {
        matches!(
            self.kind,
            RequestKind::Update | RequestKind::Commit | RequestKind::Rollback
        )
    }

    /// Whether the request must reach every shard leader.
    pub fn is_broadcast(&self) -> bool {
        matches!(self.kind, RequestKind::Commit | RequestKind::Rollback)
    }
}
