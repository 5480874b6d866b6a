//! tokio-tungstenite transport and the task that drives a [`RealtimeChannel`].

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::channel::{ChannelConfig, RealtimeChannel};
use crate::transport::{ConnId, Transport, TransportError};

/// Connection event reported by a socket task.
#[derive(Debug)]
enum SocketEvent {
    Opened(ConnId),
    Text(ConnId, String),
    Closed(ConnId),
}

enum Outgoing {
    Text(String),
    Close,
}

/// One spawned task per connection; events flow back over an mpsc channel.
pub struct WsTransport {
    runtime: Handle,
    events: mpsc::UnboundedSender<SocketEvent>,
    sockets: HashMap<ConnId, mpsc::UnboundedSender<Outgoing>>,
}

impl WsTransport {
    fn new(runtime: Handle, events: mpsc::UnboundedSender<SocketEvent>) -> Self {
        Self {
            runtime,
            events,
            sockets: HashMap::new(),
        }
    }
}

impl WsTransport {
    /// Connections still tracked; at most the live one.
    pub fn socket_count(&self) -> usize {
        self.sockets.len()
    }
}

impl Transport for WsTransport {
    fn open(&mut self, url: &str, conn: ConnId) {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sockets.insert(conn, tx);
        self.runtime
            .spawn(run_socket(url.to_string(), conn, rx, self.events.clone()));
    }

    fn send_text(&mut self, conn: ConnId, text: String) -> Result<(), TransportError> {
        let socket = self.sockets.get(&conn).ok_or(TransportError::NotOpen(conn))?;
        socket
            .send(Outgoing::Text(text))
            .map_err(|_| TransportError::NotOpen(conn))
    }

    fn close(&mut self, conn: ConnId) {
        if let Some(socket) = self.sockets.remove(&conn) {
            let _ = socket.send(Outgoing::Close);
        }
    }
}

async fn run_socket(
    url: String,
    conn: ConnId,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(conn, "websocket connect to {url} failed: {e}");
            let _ = events.send(SocketEvent::Closed(conn));
            return;
        }
    };
    let _ = events.send(SocketEvent::Opened(conn));
    let (mut ws_tx, mut ws_rx) = stream.split();

    loop {
        tokio::select! {
            out = outgoing.recv() => match out {
                Some(Outgoing::Text(text)) => {
                    if let Err(e) = ws_tx.send(Message::Text(text)).await {
                        warn!(conn, "websocket send failed: {e}");
                        break;
                    }
                }
                Some(Outgoing::Close) | None => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    debug!(conn, "websocket closed locally");
                    break;
                }
            },
            incoming = ws_rx.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(SocketEvent::Text(conn, text));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(conn, ?frame, "websocket closed by server");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn, "websocket receive error: {e}");
                    break;
                }
                None => break,
            },
        }
    }

    let _ = events.send(SocketEvent::Closed(conn));
}

pub type SharedChannel = Arc<Mutex<RealtimeChannel<WsTransport>>>;

/// Runs a [`RealtimeChannel`] over WebSockets.
///
/// The driver task owns the reconnect timer. Callers use [`WsChannel::channel`]
/// to subscribe, send and connect; handlers run on the driver task without the
/// channel lock held. Dropping the handle disconnects and stops the task.
pub struct WsChannel {
    channel: SharedChannel,
    task: Option<JoinHandle<()>>,
}

impl WsChannel {
    /// Must be called from within a tokio runtime. The channel starts closed;
    /// call `connect` on it to open.
    pub fn spawn(config: ChannelConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = WsTransport::new(Handle::current(), events_tx);
        let channel = Arc::new(Mutex::new(RealtimeChannel::new(config, transport)));
        let task = tokio::spawn(drive(channel.clone(), events_rx));
        Self {
            channel,
            task: Some(task),
        }
    }

    pub fn channel(&self) -> &SharedChannel {
        &self.channel
    }

    pub fn connect(&self) {
        self.channel.lock().connect();
    }

    pub fn shutdown(&mut self) {
        self.channel.lock().disconnect();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn drive(channel: SharedChannel, mut events: mpsc::UnboundedReceiver<SocketEvent>) {
    let mut reconnect_at: Option<Instant> = None;
    loop {
        let deadline = reconnect_at;
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    SocketEvent::Opened(conn) => channel.lock().handle_open(conn),
                    SocketEvent::Text(conn, text) => {
                        let dispatch = channel.lock().handle_message(conn, &text);
                        if let Some(dispatch) = dispatch {
                            dispatch.deliver();
                        }
                    }
                    SocketEvent::Closed(conn) => {
                        if let Some(delay) = channel.lock().handle_close(conn) {
                            reconnect_at = Some(Instant::now() + delay);
                        }
                    }
                }
            }
            _ = async { sleep_until(deadline.unwrap_or_else(Instant::now)).await }, if deadline.is_some() => {
                reconnect_at = None;
                if channel.lock().reconnect_due() {
                    debug!("reconnect timer fired");
                }
            }
        }
    }
    info!("realtime driver stopped");
}
