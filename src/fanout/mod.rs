//! Live chat fan-out: which sockets watch which chat group, and pushing new
//! messages to them.

mod connection;
mod error;
mod registry;
mod render;
mod unread;

pub use connection::{ConnectionState, LiveConnection, PayloadFormat, Transport};
pub use error::{RegistryError, StoreError, TransportError};
pub use registry::{BroadcastReport, ConnectionRegistry};
pub use render::render;
pub use unread::{MemoryUnreadStore, UnreadStore};

use std::sync::Arc;

use tracing::warn;

use crate::model::*;

/// Registry plus unread store: what a message-creation handler talks to.
pub struct ChatHub {
    pub registry: ConnectionRegistry,
    unread: Arc<dyn UnreadStore>,
}

impl ChatHub {
    pub fn new(unread: Arc<dyn UnreadStore>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            unread,
        }
    }

    pub fn register(&self, conn: &Arc<LiveConnection>) -> Result<(), RegistryError> {
        self.registry.register(conn)
    }

    pub fn reserve(&self, conn: &Arc<LiveConnection>) -> Result<(), RegistryError> {
        self.registry.reserve(conn)
    }

    pub fn activate(&self, conn: &LiveConnection) -> Result<(), RegistryError> {
        self.registry.activate(conn)
    }

    pub fn deregister(&self, conn: &LiveConnection) {
        self.registry.deregister(conn)
    }

    pub async fn broadcast(&self, group: ChatGroup, message: &ChatMessage) -> BroadcastReport {
        self.registry.broadcast(group, message).await
    }

    pub async fn increment_unread(&self, group: ChatGroup, excluding: UserId) -> Result<usize, StoreError> {
        self.unread.increment(group, excluding).await
    }

    /// A message was created: push it live and bump unread counters.
    /// The two are independent; a store failure never undoes delivery.
    pub async fn post(&self, message: &ChatMessage) -> BroadcastReport {
        let (report, unread) = tokio::join!(
            self.broadcast(message.group, message),
            self.increment_unread(message.group, message.author),
        );
        if let Err(e) = unread {
            warn!("unread counters not updated for message {}: {e}", message.id);
            metrics::counter!(crate::observability::UNREAD_FAILURES_TOTAL).increment(1);
        }
        report
    }
}
