//! Client topology tests against mock search backends.

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use search_binder::client::{ClientError, ClientHandle, SearchClient, TopologyKind};
use search_binder::config::{ResourceConfig, SearchConfig};
use search_binder::{ClassifierTable, SearchRuntime};

mod common;

const PING_OK: &str = r#"{"status":"OK"}"#;

fn runtime(config: &SearchConfig) -> SearchRuntime {
    SearchRuntime::start(config, &ClassifierTable::new()).unwrap()
}

fn client(runtime: &SearchRuntime, name: &str) -> Arc<SearchClient> {
    runtime.registry().get(name).unwrap().client.clone()
}

#[tokio::test]
async fn test_single_commit_params_in_body_by_default() {
    let (addr, recorded) = common::start_mock_backend("{}").await;
    let config = SearchConfig::default().add_client(
        "catalog",
        ResourceConfig::new(TopologyKind::Http).add_url(format!("http://{}/solr/catalog", addr)),
    );
    let runtime = runtime(&config);

    client(&runtime, "catalog").commit().await.unwrap();

    let requests = common::requests(&recorded);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path(), "/solr/catalog/update");
    assert_eq!(requests[0].query(), "wt=json");
    assert_eq!(requests[0].body, "commit=true");
    assert!(runtime.shutdown().await.is_clean());
}

#[tokio::test]
async fn test_single_commit_with_query_params() {
    let (addr, recorded) = common::start_mock_backend("{}").await;
    let mut catalog = ResourceConfig::new(TopologyKind::Http).add_url(format!("http://{}/solr/catalog", addr));
    catalog.http.query_params = Some(BTreeSet::from(["commit".to_string()]));
    let runtime = runtime(&SearchConfig::default().add_client("catalog", catalog));

    client(&runtime, "catalog").commit().await.unwrap();

    let requests = common::requests(&recorded);
    assert_eq!(requests[0].query(), "wt=json&commit=true");
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_single_zero_timeouts_mean_no_timeout() {
    let (addr, recorded) = common::start_mock_backend("{}").await;
    let mut catalog = ResourceConfig::new(TopologyKind::Http).add_url(format!("http://{}/solr/catalog", addr));
    catalog.http.socket_timeout_ms = Some(0);
    catalog.http.connection_timeout_ms = Some(0);
    let runtime = runtime(&SearchConfig::default().add_client("catalog", catalog));

    client(&runtime, "catalog").commit().await.unwrap();
    assert_eq!(common::requests(&recorded).len(), 1);
}

#[tokio::test]
async fn test_single_rollback_sends_json() {
    let (addr, recorded) = common::start_mock_backend("{}").await;
    let config = SearchConfig::default().add_client(
        "catalog",
        ResourceConfig::new(TopologyKind::Http).add_url(format!("http://{}/solr/catalog", addr)),
    );
    let runtime = runtime(&config);

    client(&runtime, "catalog").rollback().await.unwrap();

    let requests = common::requests(&recorded);
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(body, json!({"rollback": {}}));
}

#[tokio::test]
async fn test_single_error_status() {
    let (addr, _) = common::start_programmable_backend(|_| (500, "boom".to_string())).await;
    let config = SearchConfig::default().add_client(
        "catalog",
        ResourceConfig::new(TopologyKind::Http).add_url(format!("http://{}/solr/catalog", addr)),
    );
    let runtime = runtime(&config);

    match client(&runtime, "catalog").ping().await {
        Err(ClientError::Status { status, body, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

fn load_balanced(urls: &[SocketAddr]) -> ResourceConfig {
    urls.iter().fold(ResourceConfig::new(TopologyKind::LoadBalancedHttp), |config, addr| {
        config.add_url(format!("http://{}/solr/catalog", addr))
    })
}

#[tokio::test]
async fn test_load_balanced_round_robin() {
    let (a, a_seen) = common::start_mock_backend(PING_OK).await;
    let (b, b_seen) = common::start_mock_backend(PING_OK).await;
    let runtime = runtime(&SearchConfig::default().add_client("catalog", load_balanced(&[a, b])));
    let client = client(&runtime, "catalog");

    for _ in 0..4 {
        client.ping().await.unwrap();
    }

    assert_eq!(common::requests(&a_seen).len(), 2);
    assert_eq!(common::requests(&b_seen).len(), 2);
}

#[tokio::test]
async fn test_load_balanced_skips_failing_endpoint() {
    let (bad, bad_seen) = common::start_programmable_backend(|_| (503, "down".to_string())).await;
    let (good, good_seen) = common::start_mock_backend(PING_OK).await;
    let runtime = runtime(&SearchConfig::default().add_client("catalog", load_balanced(&[bad, good])));
    let client = client(&runtime, "catalog");

    for _ in 0..4 {
        client.ping().await.unwrap();
    }

    // Once dead, the failing endpoint is only tried after the live one.
    assert_eq!(common::requests(&bad_seen).len(), 1);
    assert_eq!(common::requests(&good_seen).len(), 4);

    let SearchClient::LoadBalanced(lb) = client.as_ref() else {
        panic!("expected load-balanced client");
    };
    assert!(!lb.endpoints()[0].is_alive());
    assert!(lb.endpoints()[1].is_alive());
}

#[tokio::test]
async fn test_load_balanced_fails_over_on_connection_refused() {
    let refused = common::unused_addr().await;
    let (good, good_seen) = common::start_mock_backend(PING_OK).await;
    let runtime = runtime(&SearchConfig::default().add_client("catalog", load_balanced(&[refused, good])));
    let client = client(&runtime, "catalog");

    client.ping().await.unwrap();
    client.ping().await.unwrap();
    assert_eq!(common::requests(&good_seen).len(), 2);
}

#[tokio::test]
async fn test_load_balanced_all_dead() {
    let refused = common::unused_addr().await;
    let runtime = runtime(&SearchConfig::default().add_client("catalog", load_balanced(&[refused])));

    match client(&runtime, "catalog").ping().await {
        Err(ClientError::NoLiveEndpoints { tried, .. }) => assert_eq!(tried, 1),
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn test_load_balanced_alive_check_revives() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let (flaky, _) = common::start_programmable_backend(move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            (503, "warming up".to_string())
        } else {
            (200, PING_OK.to_string())
        }
    })
    .await;

    let mut config = load_balanced(&[flaky]);
    config.lb_http.alive_check_interval_ms = Some(50);
    let runtime = runtime(&SearchConfig::default().add_client("catalog", config));
    let client = client(&runtime, "catalog");

    assert!(client.ping().await.is_err());
    let SearchClient::LoadBalanced(lb) = client.as_ref() else {
        panic!("expected load-balanced client");
    };
    assert!(!lb.endpoints()[0].is_alive());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(lb.endpoints()[0].is_alive());
    assert!(calls.load(Ordering::SeqCst) >= 2);

    assert!(runtime.shutdown().await.is_clean());
}

fn replica(addr: SocketAddr, core: &str, leader: bool) -> serde_json::Value {
    let mut replica = json!({
        "core": core,
        "base_url": format!("http://{}/solr", addr),
        "state": "active",
    });
    if leader {
        replica["leader"] = json!("true");
    }
    replica
}

struct Cluster {
    coordinator: SocketAddr,
    status_calls: Arc<AtomicUsize>,
    leader1: common::Recorded,
    leader2: common::Recorded,
    follower: common::Recorded,
}

async fn start_cluster() -> Cluster {
    start_cluster_with_shard2_leader("active").await
}

async fn start_cluster_with_shard2_leader(state: &str) -> Cluster {
    let (l1, leader1) = common::start_mock_backend("{}").await;
    let (l2, leader2) = common::start_mock_backend("{}").await;
    let (f, follower) = common::start_mock_backend(r#"{"response":{"numFound":0}}"#).await;
    let mut shard2_leader = replica(l2, "products_shard2_replica_n1", true);
    shard2_leader["state"] = json!(state);

    let status = json!({
        "cluster": {
            "collections": {
                "products": {
                    "shards": {
                        "shard1": {
                            "replicas": {
                                "core_node1": replica(l1, "products_shard1_replica_n1", true),
                                "core_node2": replica(f, "products_shard1_replica_n2", false),
                            }
                        },
                        "shard2": {
                            "replicas": {
                                "core_node3": shard2_leader,
                            }
                        }
                    }
                }
            }
        }
    })
    .to_string();

    let status_calls = Arc::new(AtomicUsize::new(0));
    let counter = status_calls.clone();
    let (coordinator, _) = common::start_programmable_backend(move |request| {
        if request.path() == "/solr/admin/collections" && request.query().contains("action=CLUSTERSTATUS") {
            counter.fetch_add(1, Ordering::SeqCst);
            (200, status.clone())
        } else {
            (404, "not found".to_string())
        }
    })
    .await;

    Cluster {
        coordinator,
        status_calls,
        leader1,
        leader2,
        follower,
    }
}

fn cloud(cluster: &Cluster) -> ResourceConfig {
    let mut config = ResourceConfig::new(TopologyKind::Cloud).add_url(format!("http://{}", cluster.coordinator));
    config.cloud.chroot = Some("/solr".to_string());
    config.cloud.default_collection = Some("products".to_string());
    config
}

#[tokio::test]
async fn test_cloud_commit_reaches_every_leader() {
    let cluster = start_cluster().await;
    let runtime = runtime(&SearchConfig::default().add_client("products", cloud(&cluster)));
    let client = client(&runtime, "products");

    client.connect().await.unwrap();
    client.commit().await.unwrap();
    client.commit().await.unwrap();

    let leader1 = common::requests(&cluster.leader1);
    let leader2 = common::requests(&cluster.leader2);
    assert_eq!(leader1.len(), 2);
    assert_eq!(leader2.len(), 2);
    assert_eq!(leader1[0].path(), "/solr/products_shard1_replica_n1/update");
    assert_eq!(leader2[0].path(), "/solr/products_shard2_replica_n1/update");
    assert!(common::requests(&cluster.follower).is_empty());

    // Cached for the default TTL.
    assert_eq!(cluster.status_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cloud_updates_fail_when_a_shard_has_no_leader() {
    let cluster = start_cluster_with_shard2_leader("down").await;
    let runtime = runtime(&SearchConfig::default().add_client("products", cloud(&cluster)));
    let client = client(&runtime, "products");

    let err = client.commit().await.unwrap_err();
    assert!(matches!(err, ClientError::ClusterState(ref msg) if msg == "shard 'shard2' has no active leader"));
    let err = client.add(None, vec![json!({"id": "1"})]).await.unwrap_err();
    assert!(matches!(err, ClientError::ClusterState(_)));
    assert!(common::requests(&cluster.leader1).is_empty());
    assert!(common::requests(&cluster.leader2).is_empty());

    // Queries still reach the active replicas.
    client.select(None, "*:*").await.unwrap();
}

#[tokio::test]
async fn test_cloud_sequential_updates() {
    let cluster = start_cluster().await;
    let mut config = cloud(&cluster);
    config.cloud.parallel_updates = Some(false);
    let runtime = runtime(&SearchConfig::default().add_client("products", config));

    client(&runtime, "products").rollback().await.unwrap();
    assert_eq!(common::requests(&cluster.leader1).len(), 1);
    assert_eq!(common::requests(&cluster.leader2).len(), 1);
}

#[tokio::test]
async fn test_cloud_expired_cache_is_refreshed() {
    let cluster = start_cluster().await;
    let mut config = cloud(&cluster);
    config.cloud.collection_cache_ttl_secs = Some(0);
    let runtime = runtime(&SearchConfig::default().add_client("products", config));
    let client = client(&runtime, "products");

    client.commit().await.unwrap();
    client.commit().await.unwrap();
    assert_eq!(cluster.status_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cloud_query_goes_to_a_replica() {
    let cluster = start_cluster().await;
    let runtime = runtime(&SearchConfig::default().add_client("products", cloud(&cluster)));

    client(&runtime, "products").select(None, "*:*").await.unwrap();

    let selects: usize = [&cluster.leader1, &cluster.leader2, &cluster.follower]
        .iter()
        .map(|r| common::requests(r).iter().filter(|q| q.path().ends_with("/select")).count())
        .sum();
    assert_eq!(selects, 1);
}

#[tokio::test]
async fn test_cloud_requires_collection() {
    let cluster = start_cluster().await;
    let mut config = cloud(&cluster);
    config.cloud.default_collection = None;
    let runtime = runtime(&SearchConfig::default().add_client("products", config));
    let client = client(&runtime, "products");

    assert!(matches!(
        client.select(None, "*:*").await,
        Err(ClientError::NoDefaultCollection)
    ));
    // An explicit collection needs no default.
    client.select(Some("products"), "*:*").await.unwrap();
}

#[tokio::test]
async fn test_cloud_rejects_documents_without_id() {
    let cluster = start_cluster().await;
    let runtime = runtime(&SearchConfig::default().add_client("products", cloud(&cluster)));
    let client = client(&runtime, "products");

    let err = client.add(None, vec![json!({"title": "no id"})]).await.unwrap_err();
    assert!(matches!(err, ClientError::MissingId(ref field) if field == "id"));

    client.add(None, vec![json!({"id": "1", "title": "ok"})]).await.unwrap();
    let updates = common::requests(&cluster.leader1).len() + common::requests(&cluster.leader2).len();
    assert_eq!(updates, 1);
}

#[tokio::test]
async fn test_cloud_with_load_balancer_routes_queries() {
    let cluster = start_cluster().await;
    let (lb, lb_seen) = common::start_mock_backend(r#"{"response":{"numFound":0}}"#).await;
    let mut config = ResourceConfig::new(TopologyKind::Cloud).add_url(format!("http://{}/solr", cluster.coordinator));
    config.cloud.default_collection = Some("products".to_string());
    config.cloud.load_balanced_urls = vec![format!("http://{}/solr", lb)];
    let runtime = runtime(&SearchConfig::default().add_client("products", config));
    let client = client(&runtime, "products");

    client.select(None, "*:*").await.unwrap();
    let seen = common::requests(&lb_seen);
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].path(), "/solr/products/select");

    // Updates still go to the leaders.
    client.commit().await.unwrap();
    assert_eq!(common::requests(&cluster.leader1).len(), 1);
    assert_eq!(common::requests(&lb_seen).len(), 1);
}

#[tokio::test]
async fn test_shutdown_attempts_every_client() {
    let (addr, _) = common::start_mock_backend(PING_OK).await;
    let url = format!("http://{}/solr/catalog", addr);
    let config = SearchConfig::default()
        .add_client("a", ResourceConfig::new(TopologyKind::Http).add_url(&url))
        .add_client("b", ResourceConfig::new(TopologyKind::Http).add_url(&url))
        .add_client("c", ResourceConfig::new(TopologyKind::LoadBalancedHttp).add_url(&url));
    let runtime = runtime(&config);

    // Closing "b" early makes its shutdown close fail.
    client(&runtime, "b").close().await.unwrap();

    let report = runtime.shutdown().await;
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0.as_str(), "b");
    assert!(matches!(report.failures[0].1, ClientError::Closed));
    let closed: Vec<_> = report.closed.iter().map(|n| n.as_str()).collect();
    assert_eq!(closed, vec!["a", "c"]);
}
