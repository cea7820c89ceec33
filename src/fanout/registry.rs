use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::limits::MAX_CONNECTIONS_PER_GROUP;
use crate::model::*;

use super::render::render;
use super::{ConnectionState, LiveConnection, PayloadFormat, RegistryError, TransportError};

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Writes that failed; those connections are now closed and removed.
    pub failed: usize,
    /// Connections that closed between the snapshot and their write.
    pub skipped: usize,
}

/// Live connections per chat group.
///
/// Backed by a sharded map; no shard guard is ever held across an `.await`.
pub struct ConnectionRegistry {
    groups: DashMap<ChatGroup, HashMap<ConnectionId, Arc<LiveConnection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }

    /// Add `conn` to its group and open it. Registering the same connection
    /// twice is a no-op.
    pub fn register(&self, conn: &Arc<LiveConnection>) -> Result<(), RegistryError> {
        self.admit(conn, true)
    }

    /// Add `conn` to its group but leave it `Connecting`: it holds a place
    /// in the group and broadcasts skip it until [`Self::activate`].
    pub fn reserve(&self, conn: &Arc<LiveConnection>) -> Result<(), RegistryError> {
        self.admit(conn, false)
    }

    /// Open a reserved connection.
    pub fn activate(&self, conn: &LiveConnection) -> Result<(), RegistryError> {
        if conn.open() || conn.is_open() {
            Ok(())
        } else {
            Err(RegistryError::Closed(conn.id))
        }
    }

    fn admit(&self, conn: &Arc<LiveConnection>, open: bool) -> Result<(), RegistryError> {
        let result = self.insert(conn, open);
        match &result {
            Ok(true) => {
                metrics::gauge!(crate::observability::CONNECTIONS_REGISTERED).increment(1.0);
                debug!(connection = %conn.id, group = %conn.group, user = %conn.user, "registered");
            }
            Ok(false) => {}
            Err(_) => {
                self.groups.remove_if(&conn.group, |_, members| members.is_empty());
            }
        }
        result.map(|_| ())
    }

    /// State check and insert happen under the shard lock, so a concurrent
    /// `deregister` either sees the entry or makes this call fail.
    fn insert(&self, conn: &Arc<LiveConnection>, open: bool) -> Result<bool, RegistryError> {
        let mut members = self.groups.entry(conn.group).or_default();

        if let Some(existing) = members.get(&conn.id) {
            if Arc::ptr_eq(existing, conn) {
                if open {
                    conn.open();
                }
                return Ok(false);
            }
            debug_assert!(false, "connection id {} registered twice", conn.id);
            return Err(RegistryError::AlreadyRegistered(conn.id));
        }
        if conn.state() == ConnectionState::Closed {
            return Err(RegistryError::Closed(conn.id));
        }
        if members.len() >= MAX_CONNECTIONS_PER_GROUP {
            return Err(RegistryError::GroupFull(conn.group));
        }

        if open {
            conn.open();
        }
        members.insert(conn.id, conn.clone());
        Ok(true)
    }

    /// Close `conn` and drop it from its group. Absent connections are ignored.
    pub fn deregister(&self, conn: &LiveConnection) {
        conn.mark_closed();
        let removed = self.remove(conn.group, conn.id);
        if removed {
            debug!(connection = %conn.id, group = %conn.group, "deregistered");
        }
    }

    fn remove(&self, group: ChatGroup, id: ConnectionId) -> bool {
        let removed = match self.groups.get_mut(&group) {
            Some(mut members) => members.remove(&id).is_some(),
            None => false,
        };
        if removed {
            // Only reclaim the group entry if nobody joined in between.
            self.groups.remove_if(&group, |_, members| members.is_empty());
            metrics::gauge!(crate::observability::CONNECTIONS_REGISTERED).decrement(1.0);
        }
        removed
    }

    /// Open connections for `group`, copied out from under the shard lock.
    pub fn snapshot(&self, group: ChatGroup) -> Vec<Arc<LiveConnection>> {
        self.groups
            .get(&group)
            .map(|members| members.values().filter(|c| c.is_open()).cloned().collect())
            .unwrap_or_default()
    }

    /// Deliver `message` to every open connection in `group`. A failed write
    /// closes and removes that connection; the rest still get the message.
    pub async fn broadcast(&self, group: ChatGroup, message: &ChatMessage) -> BroadcastReport {
        let started = std::time::Instant::now();
        let recipients = self.snapshot(group);
        if recipients.is_empty() {
            return BroadcastReport::default();
        }

        let mut frames: HashMap<PayloadFormat, Bytes> = HashMap::new();
        for conn in &recipients {
            if frames.contains_key(&conn.format) {
                continue;
            }
            match render(message, conn.format) {
                Ok(frame) => {
                    frames.insert(conn.format, frame);
                }
                Err(e) => warn!("failed to render message {} as {:?}: {e}", message.id, conn.format),
            }
        }

        let sends = recipients.iter().filter_map(|conn| {
            let frame = frames.get(&conn.format)?.clone();
            Some(async move { (conn, conn.send(frame).await) })
        });
        let results = join_all(sends).await;

        let mut report = BroadcastReport::default();
        let mut evicted = Vec::new();
        for (conn, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(TransportError::Closed) if !conn.is_open() => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!("delivery to {} in group {group} failed: {e}", conn.id);
                    metrics::counter!(crate::observability::DELIVERY_FAILURES_TOTAL).increment(1);
                    self.deregister(conn);
                    evicted.push(conn);
                }
            }
        }
        join_all(evicted.into_iter().map(|conn| conn.shutdown())).await;

        metrics::counter!(crate::observability::BROADCASTS_TOTAL).increment(1);
        metrics::counter!(crate::observability::DELIVERIES_TOTAL).increment(report.delivered as u64);
        metrics::histogram!(crate::observability::BROADCAST_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        debug!(
            group = %group,
            delivered = report.delivered,
            failed = report.failed,
            skipped = report.skipped,
            "broadcast"
        );
        report
    }

    pub fn connection_count(&self, group: ChatGroup) -> usize {
        self.groups.get(&group).map_or(0, |members| members.len())
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
