// In-memory per-server snapshots of village unit counts.
//
// The crawler uploads a fresh snapshot after each army-overview crawl;
// the planner reads the latest one. Freshness policy is the caller's:
// the store only records when a snapshot was captured.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::support::VillageSupply;

/// The latest known unit counts for one game server's villages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplySnapshot {
    pub server_id: i64,
    pub villages: Vec<VillageSupply>,
    pub captured_at: DateTime<Utc>,
}

impl SupplySnapshot {
    /// Time elapsed since the snapshot was captured.
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.captured_at
    }
}

/// Thread-safe store of the latest snapshot per server.
#[derive(Debug, Clone, Default)]
pub struct SupplyStore {
    inner: Arc<RwLock<HashMap<i64, SupplySnapshot>>>,
}

impl SupplyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot for a server with freshly crawled counts.
    pub fn update(&self, server_id: i64, villages: Vec<VillageSupply>) -> SupplySnapshot {
        let snapshot = SupplySnapshot {
            server_id,
            villages,
            captured_at: Utc::now(),
        };
        let mut map = self.inner.write().unwrap();
        map.insert(server_id, snapshot.clone());
        crate::metrics::TRACKED_SERVERS.set(map.len() as i64);
        snapshot
    }

    /// Latest snapshot for a server, if one was ever uploaded.
    pub fn get(&self, server_id: i64) -> Option<SupplySnapshot> {
        self.inner.read().unwrap().get(&server_id).cloned()
    }

    /// Drop a server's snapshot (e.g. when the server is deleted).
    pub fn remove(&self, server_id: i64) -> bool {
        let mut map = self.inner.write().unwrap();
        let removed = map.remove(&server_id).is_some();
        crate::metrics::TRACKED_SERVERS.set(map.len() as i64);
        removed
    }

    /// Number of servers with a snapshot on record.
    pub fn tracked_servers(&self) -> usize {
        self.inner.read().unwrap().len()
    }
}
