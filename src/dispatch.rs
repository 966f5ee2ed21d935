// FIFO queue of validated support commands awaiting crawler pickup.
//
// The panel never talks to the game itself: the external crawler polls
// the queue and executes commands in-game. Commands carry the unit
// counts they were planned against, so anything that sits here too long
// is stale and must be dropped, not executed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metrics;
use crate::support::VillageAllocation;

/// A validated "send support" order, ready for the crawler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportCommand {
    pub id: String,
    pub server_id: i64,
    pub target_village_id: i64,
    pub allocations: Vec<VillageAllocation>,
    pub total_packages: i64,
    pub package_size: i64,
    pub queued_at: DateTime<Utc>,
}

impl SupportCommand {
    pub fn new(
        server_id: i64,
        target_village_id: i64,
        allocations: Vec<VillageAllocation>,
        total_packages: i64,
        package_size: i64,
    ) -> Self {
        SupportCommand {
            id: Uuid::new_v4().to_string(),
            server_id,
            target_village_id,
            allocations,
            total_packages,
            package_size,
            queued_at: Utc::now(),
        }
    }
}

/// Status of the dispatch queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub depth: usize,
    pub pending_packages: i64,
}

/// Thread-safe FIFO queue of support commands.
#[derive(Debug, Clone, Default)]
pub struct DispatchQueue {
    inner: Arc<Mutex<VecDeque<SupportCommand>>>,
}

impl DispatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command to the back of the queue.
    pub fn enqueue(&self, command: SupportCommand) {
        let mut queue = self.inner.lock().unwrap();
        queue.push_back(command);
        metrics::DISPATCH_QUEUE_DEPTH.set(queue.len() as i64);
    }

    /// Remove and return the next command from the front of the queue.
    pub fn dequeue(&self) -> Option<SupportCommand> {
        let mut queue = self.inner.lock().unwrap();
        let result = queue.pop_front();
        metrics::DISPATCH_QUEUE_DEPTH.set(queue.len() as i64);
        result
    }

    /// Peek at the next command without removing it.
    pub fn peek(&self) -> Option<SupportCommand> {
        let queue = self.inner.lock().unwrap();
        queue.front().cloned()
    }

    /// Current queue depth.
    pub fn depth(&self) -> usize {
        let queue = self.inner.lock().unwrap();
        queue.len()
    }

    pub fn is_empty(&self) -> bool {
        let queue = self.inner.lock().unwrap();
        queue.is_empty()
    }

    /// Queue status for the panel UI.
    pub fn status(&self) -> QueueStatus {
        let queue = self.inner.lock().unwrap();
        QueueStatus {
            depth: queue.len(),
            pending_packages: queue.iter().map(|c| c.total_packages).sum(),
        }
    }

    /// Drop commands queued more than `ttl` ago. Returns how many were
    /// removed.
    pub fn expire_older_than(&self, ttl: chrono::Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut queue = self.inner.lock().unwrap();
        let before = queue.len();
        queue.retain(|c| c.queued_at >= cutoff);
        let expired = before - queue.len();
        if expired > 0 {
            metrics::DISPATCH_QUEUE_DEPTH.set(queue.len() as i64);
            metrics::SUPPORT_COMMANDS_EXPIRED_TOTAL.inc_by(expired as u64);
        }
        expired
    }
}

/// Spawn a background task that periodically drops commands the crawler
/// never picked up. `ttl_secs` comes from configuration.
pub fn spawn_expiry_worker(queue: DispatchQueue, ttl_secs: u64) {
    tokio::spawn(async move {
        let ttl = chrono::Duration::seconds(ttl_secs as i64);
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(30)).await;

            let expired = queue.expire_older_than(ttl);
            if expired > 0 {
                tracing::warn!(
                    "Dropped {expired} stale support command(s) older than {ttl_secs}s"
                );
            }
        }
    });
}
