/// Live sockets allowed per chat group.
pub const MAX_CONNECTIONS_PER_GROUP: usize = 4096;

/// Longest line accepted from a client, handshake included.
pub const MAX_LINE_BYTES: usize = 16 * 1024;

/// Longest chat message text, in bytes.
pub const MAX_MESSAGE_BYTES: usize = 2048;

/// Longest display name in a handshake.
pub const MAX_NAME_BYTES: usize = 64;

/// How long a client may take to send its handshake.
pub const HANDSHAKE_TIMEOUT_MS: u64 = 10_000;

/// How long a closing connection may spend flushing frames already queued.
pub const CLOSE_DRAIN_MS: u64 = 500;
