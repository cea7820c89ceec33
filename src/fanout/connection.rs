use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::model::*;

use super::TransportError;

/// The narrow surface the registry needs from a live socket.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Queue one frame for the client. Frames sent from one task arrive in order.
    async fn send(&self, frame: Bytes) -> Result<(), TransportError>;

    /// Shut the connection down. Must be safe to call more than once.
    async fn close(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            _ => ConnectionState::Closed,
        }
    }
}

/// Payload format a client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadFormat {
    /// Pre-rendered HTML fragment for the site's chat page.
    Html,
    /// Structured JSON for API clients.
    Json,
}

/// One client socket subscribed to a single chat group.
pub struct LiveConnection {
    pub id: ConnectionId,
    pub user: UserId,
    pub group: ChatGroup,
    pub format: PayloadFormat,
    state: AtomicU8,
    transport: Arc<dyn Transport>,
}

impl LiveConnection {
    pub fn new(user: UserId, group: ChatGroup, format: PayloadFormat, transport: Arc<dyn Transport>) -> Arc<Self> {
        Self::with_id(ConnectionId::new(), user, group, format, transport)
    }

    pub(super) fn with_id(
        id: ConnectionId,
        user: UserId,
        group: ChatGroup,
        format: PayloadFormat,
        transport: Arc<dyn Transport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            user,
            group,
            format,
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            transport,
        })
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// `Connecting → Open`. Returns false if the connection is not `Connecting`.
    pub(super) fn open(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Connecting as u8,
                ConnectionState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to `Closed`. Returns true only for the call that made the transition.
    pub(super) fn mark_closed(&self) -> bool {
        self.state.swap(ConnectionState::Closed as u8, Ordering::AcqRel) != ConnectionState::Closed as u8
    }

    pub(super) async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        self.transport.send(frame).await
    }

    pub(super) async fn shutdown(&self) {
        self.transport.close().await;
    }
}

impl std::fmt::Debug for LiveConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveConnection")
            .field("id", &self.id)
            .field("user", &self.user)
            .field("group", &self.group)
            .field("format", &self.format)
            .field("state", &self.state())
            .finish()
    }
}
