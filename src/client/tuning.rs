//! Apply-if-present tuning.
//!
//! Each topology has one table of (field, setter) pairs. A setter returns
//! `None` when its field is unset, leaving the client's built-in default
//! untouched; every table goes through the same [`apply_if_present`].

use std::time::Duration;

use crate::client::cloud::CloudSettings;
use crate::client::load_balanced::LbSettings;
use crate::client::transport::HttpSettings;
use crate::config::schema::{CloudTuning, HttpTuning, LbTuning};

/// One optional field and how to apply it.
pub struct Setter<C, S> {
    pub field: &'static str,
    pub apply: fn(&C, &mut S) -> Option<()>,
}

/// Run every setter of `table`; returns the names of the fields applied.
pub fn apply_if_present<C, S>(tuning: &C, settings: &mut S, table: &[Setter<C, S>]) -> Vec<&'static str> {
    table
        .iter()
        .filter_map(|setter| (setter.apply)(tuning, settings).map(|()| setter.field))
        .collect()
}

/// A zero timeout disables the timeout.
fn timeout(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

pub const HTTP: &[Setter<HttpTuning, HttpSettings>] = &[
    Setter {
        field: "connection_timeout_ms",
        apply: |t, s| {
            s.connection_timeout = timeout(t.connection_timeout_ms?);
            Some(())
        },
    },
    Setter {
        field: "socket_timeout_ms",
        apply: |t, s| {
            s.socket_timeout = timeout(t.socket_timeout_ms?);
            Some(())
        },
    },
    Setter {
        field: "query_params",
        apply: |t, s| {
            s.query_params = t.query_params.clone()?;
            Some(())
        },
    },
    Setter {
        field: "allow_compression",
        apply: |t, s| {
            s.allow_compression = t.allow_compression?;
            Some(())
        },
    },
    Setter {
        field: "max_connections_per_host",
        apply: |t, s| {
            s.max_connections_per_host = t.max_connections_per_host?;
            Some(())
        },
    },
    Setter {
        field: "follow_redirects",
        apply: |t, s| {
            s.follow_redirects = t.follow_redirects?;
            Some(())
        },
    },
    Setter {
        field: "max_total_connections",
        apply: |t, s| {
            s.max_total_connections = t.max_total_connections?;
            Some(())
        },
    },
    Setter {
        field: "use_multipart_post",
        apply: |t, s| {
            s.use_multipart_post = t.use_multipart_post?;
            Some(())
        },
    },
];

pub const LOAD_BALANCED: &[Setter<LbTuning, LbSettings>] = &[
    Setter {
        field: "connection_timeout_ms",
        apply: |t, s| {
            s.http.connection_timeout = timeout(t.connection_timeout_ms?);
            Some(())
        },
    },
    Setter {
        field: "socket_timeout_ms",
        apply: |t, s| {
            s.http.socket_timeout = timeout(t.socket_timeout_ms?);
            Some(())
        },
    },
    Setter {
        field: "query_params",
        apply: |t, s| {
            s.http.query_params = t.query_params.clone()?;
            Some(())
        },
    },
    Setter {
        field: "alive_check_interval_ms",
        apply: |t, s| {
            s.alive_check_interval = Duration::from_millis(t.alive_check_interval_ms?);
            Some(())
        },
    },
];

pub const CLOUD: &[Setter<CloudTuning, CloudSettings>] = &[
    Setter {
        field: "default_collection",
        apply: |t, s| {
            s.default_collection = Some(t.default_collection.clone()?);
            Some(())
        },
    },
    Setter {
        field: "id_field",
        apply: |t, s| {
            s.id_field = t.id_field.clone()?;
            Some(())
        },
    },
    Setter {
        field: "collection_cache_ttl_secs",
        apply: |t, s| {
            s.collection_cache_ttl = Duration::from_secs(t.collection_cache_ttl_secs?);
            Some(())
        },
    },
    Setter {
        field: "parallel_cache_refreshes",
        apply: |t, s| {
            s.parallel_cache_refreshes = t.parallel_cache_refreshes?;
            Some(())
        },
    },
    Setter {
        field: "parallel_updates",
        apply: |t, s| {
            s.parallel_updates = t.parallel_updates?;
            Some(())
        },
    },
    Setter {
        field: "coordinator_client_timeout_ms",
        apply: |t, s| {
            s.coordinator_client_timeout = timeout(t.coordinator_client_timeout_ms?);
            Some(())
        },
    },
    Setter {
        field: "coordinator_connect_timeout_ms",
        apply: |t, s| {
            s.coordinator_connect_timeout = timeout(t.coordinator_connect_timeout_ms?);
            Some(())
        },
    },
];
