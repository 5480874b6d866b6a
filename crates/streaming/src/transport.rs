use thiserror::Error;

/// Generation number of one physical connection attempt.
///
/// Every open gets a fresh id, so events from a connection the channel has
/// already given up on can be recognised and ignored.
pub type ConnId = u64;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("connection {0} is not open")]
    NotOpen(ConnId),
    #[error("websocket error: {0}")]
    WebSocket(String),
}

/// Side-effect half of the realtime channel.
///
/// Implementations start I/O and report back by calling the channel's
/// `handle_open` / `handle_message` / `handle_close` with the same `ConnId`.
/// A failed open is reported as a close.
pub trait Transport {
    fn open(&mut self, url: &str, conn: ConnId);
    fn send_text(&mut self, conn: ConnId, text: String) -> Result<(), TransportError>;
    fn close(&mut self, conn: ConnId);
}

/// What a [`MemoryTransport`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    Open { url: String, conn: ConnId },
    Send { conn: ConnId, text: String },
    Close { conn: ConnId },
}

/// Transport that performs no I/O and records every call.
///
/// Useful for driving a channel by hand: the test plays the network by
/// calling the channel's `handle_*` methods.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    pub ops: Vec<TransportOp>,
    open_conn: Option<ConnId>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `open` calls so far.
    pub fn opens(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, TransportOp::Open { .. }))
            .count()
    }

    pub fn sent(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                TransportOp::Send { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, url: &str, conn: ConnId) {
        self.open_conn = Some(conn);
        self.ops.push(TransportOp::Open {
            url: url.to_string(),
            conn,
        });
    }

    fn send_text(&mut self, conn: ConnId, text: String) -> Result<(), TransportError> {
        if self.open_conn != Some(conn) {
            return Err(TransportError::NotOpen(conn));
        }
        self.ops.push(TransportOp::Send { conn, text });
        Ok(())
    }

    fn close(&mut self, conn: ConnId) {
        if self.open_conn == Some(conn) {
            self.open_conn = None;
        }
        self.ops.push(TransportOp::Close { conn });
    }
}
