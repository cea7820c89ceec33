use crate::model::{ChatGroup, ConnectionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A different connection object already holds this id. Caller bug.
    AlreadyRegistered(ConnectionId),
    /// Closed connections are terminal and never re-registered.
    Closed(ConnectionId),
    GroupFull(ChatGroup),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::AlreadyRegistered(id) => write!(f, "connection already registered: {id}"),
            RegistryError::Closed(id) => write!(f, "connection closed: {id}"),
            RegistryError::GroupFull(group) => {
                write!(f, "too many live connections for group {group}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The remote end is gone.
    Closed,
    /// Outbound queue is full; the client isn't keeping up.
    Backpressure,
    Io(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Closed => write!(f, "transport closed"),
            TransportError::Backpressure => write!(f, "outbound queue full"),
            TransportError::Io(e) => write!(f, "transport I/O error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    UnknownGroup(ChatGroup),
    Backend(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownGroup(group) => write!(f, "unknown chat group: {group}"),
            StoreError::Backend(e) => write!(f, "unread store error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}
