//! Search client subsystem.
//!
//! # Data Flow
//! ```text
//! ResourceConfig
//!     → factory.rs (interpret topology tag)
//!     → tuning.rs (apply-if-present tables over built-in defaults)
//!     → one of:
//!         - http.rs (single endpoint)
//!         - load_balanced.rs (round_robin.rs + endpoint.rs + alive_check.rs)
//!         - cloud.rs (coordinator + collection cache + leader routing)
//!     → SearchClient (closed tagged enum over the three)
//!     → transport.rs carries every request
//! ```
//!
//! # Design Decisions
//! - Topologies are a closed enum; there are exactly three shapes
//! - Transactions only need commit/rollback/close, captured by the
//!   [`ClientHandle`] trait so registries can hold other handles too
//! - Construction never touches the network; cluster clients connect on
//!   first use or through [`CloudSearchClient::connect`]

pub mod alive_check;
pub mod cloud;
pub mod endpoint;
pub mod factory;
pub mod http;
pub mod load_balanced;
pub mod round_robin;
pub mod transport;
pub mod tuning;
pub mod types;

use async_trait::async_trait;
use serde_json::Value;

pub use cloud::{CloudSearchClient, CloudSettings};
pub use factory::ClientFactory;
pub use http::HttpSearchClient;
pub use load_balanced::{LbSearchClient, LbSettings};
pub use transport::HttpSettings;
pub use types::{ClientError, ClientResult, Method, RequestKind, SearchRequest, TopologyKind};

/// The operations a transaction needs from a bound client.
#[async_trait]
pub trait ClientHandle: Send + Sync + 'static {
    /// Make pending updates visible and durable.
    async fn commit(&self) -> ClientResult<()>;

    /// Discard updates since the last commit.
    async fn rollback(&self) -> ClientResult<()>;

    /// Release connections. Closing twice is an error.
    async fn close(&self) -> ClientResult<()>;
}

/// A configured search client, one variant per topology.
#[derive(Debug)]
pub enum SearchClient {
    Single(HttpSearchClient),
    LoadBalanced(LbSearchClient),
    Clustered(CloudSearchClient),
}

impl SearchClient {
    pub fn topology(&self) -> TopologyKind {
        match self {
            SearchClient::Single(_) => TopologyKind::Http,
            SearchClient::LoadBalanced(_) => TopologyKind::LoadBalancedHttp,
            SearchClient::Clustered(_) => TopologyKind::Cloud,
        }
    }

    pub async fn request(&self, request: &SearchRequest) -> ClientResult<Value> {
        match self {
            SearchClient::Single(client) => client.request(request).await,
            SearchClient::LoadBalanced(client) => client.request(request).await,
            SearchClient::Clustered(client) => client.request(request).await,
        }
    }

    pub async fn ping(&self) -> ClientResult<Value> {
        self.request(&SearchRequest::ping()).await
    }

    pub async fn select(&self, collection: Option<&str>, query: &str) -> ClientResult<Value> {
        let request = SearchRequest::select(query);
        let request = match collection {
            Some(c) => request.in_collection(c),
            None => request,
        };
        self.request(&request).await
    }

    pub async fn add(&self, collection: Option<&str>, documents: Vec<Value>) -> ClientResult<Value> {
        let request = SearchRequest::add(documents);
        let request = match collection {
            Some(c) => request.in_collection(c),
            None => request,
        };
        self.request(&request).await
    }

    /// Close without awaiting; no topology needs I/O to close.
    pub fn close_now(&self) -> ClientResult<()> {
        match self {
            SearchClient::Single(client) => client.close(),
            SearchClient::LoadBalanced(client) => client.close(),
            SearchClient::Clustered(client) => client.close(),
        }
    }

    /// Verify connectivity where construction deferred it (cluster clients).
    pub async fn connect(&self) -> ClientResult<()> {
        match self {
            SearchClient::Clustered(client) => client.connect().await,
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ClientHandle for SearchClient {
    async fn commit(&self) -> ClientResult<()> {
        self.request(&SearchRequest::commit()).await.map(drop)
    }

    async fn rollback(&self) -> ClientResult<()> {
        self.request(&SearchRequest::rollback()).await.map(drop)
    }

    async fn close(&self) -> ClientResult<()> {
        self.close_now()
    }
}
