//! Realtime update channel.
//!
//! [`RealtimeChannel`] is a synchronous state machine; it never blocks or
//! sleeps. All I/O goes through a [`Transport`], and the owner feeds
//! connection events back in (see [`crate::ws`] for the tokio driver). When
//! a reconnect is scheduled the owner is told the delay and calls
//! [`RealtimeChannel::reconnect_due`] once it has elapsed.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use runtime::event_bus::EventBus;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::protocol::{self, ChannelMessage, ControlMessage, Topic};
use crate::registry::{Handler, HandlerRegistry, Subscription};
use crate::transport::{ConnId, Transport, TransportError};

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub url: String,
    pub reconnect_base: Duration,
    pub max_reconnect_attempts: u32,
}

impl ChannelConfig {
    pub const DEFAULT_URL: &'static str = "ws://localhost:8000/ws";

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            url: Self::DEFAULT_URL.to_string(),
            reconnect_base: Duration::from_millis(1000),
            max_reconnect_attempts: 5,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChannelState {
    Closed,
    Connecting,
    Open,
}

/// Lifecycle record emitted on the channel's [`EventBus`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connecting { conn: ConnId },
    Opened { conn: ConnId },
    ConnectionLost { conn: ConnId },
    ReconnectScheduled { attempt: u32, delay: Duration },
    PermanentlyFailed { attempts: u32 },
    Disconnected,
    MalformedMessage { error: String },
    SendDropped { state: ChannelState },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChannelError {
    #[error("channel is not open (state: {0:?})")]
    NotOpen(ChannelState),
    #[error("failed to encode control message: {0}")]
    Encode(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Handlers selected for one inbound message.
///
/// Returned by [`RealtimeChannel::handle_message`] so the owner can release
/// any lock around the channel before running user callbacks.
#[must_use = "a Dispatch does nothing until delivered"]
pub struct Dispatch {
    message: ChannelMessage,
    handlers: Vec<Handler>,
}

impl Dispatch {
    pub fn message(&self) -> &ChannelMessage {
        &self.message
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn deliver(self) {
        for handler in &self.handlers {
            handler(&self.message);
        }
    }
}

pub struct RealtimeChannel<T: Transport> {
    config: ChannelConfig,
    transport: T,
    state: ChannelState,
    /// Connection the transport is currently working on, if any.
    live: Option<ConnId>,
    next_conn: ConnId,
    backoff: Backoff,
    reconnect_pending: Option<Duration>,
    permanently_failed: bool,
    malformed: u64,
    handlers: Arc<Mutex<HandlerRegistry>>,
    events: EventBus<ChannelEvent>,
}

impl<T: Transport> RealtimeChannel<T> {
    pub fn new(config: ChannelConfig, transport: T) -> Self {
        let backoff = Backoff::new(config.reconnect_base, config.max_reconnect_attempts);
        Self {
            config,
            transport,
            state: ChannelState::Closed,
            live: None,
            next_conn: 0,
            backoff,
            reconnect_pending: None,
            permanently_failed: false,
            malformed: 0,
            handlers: Arc::new(Mutex::new(HandlerRegistry::new())),
            events: EventBus::new(),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    /// True once the reconnect budget ran out; cleared by [`connect`](Self::connect).
    pub fn permanently_failed(&self) -> bool {
        self.permanently_failed
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.backoff.attempts()
    }

    pub fn reconnect_pending(&self) -> Option<Duration> {
        self.reconnect_pending
    }

    pub fn malformed_count(&self) -> u64 {
        self.malformed
    }

    pub fn events(&self) -> &EventBus<ChannelEvent> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus<ChannelEvent> {
        &mut self.events
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Opens the connection if the channel is closed; otherwise does nothing.
    ///
    /// After a permanent failure this starts a fresh reconnect budget.
    pub fn connect(&mut self) {
        if self.state != ChannelState::Closed {
            debug!(state = ?self.state, "connect ignored");
            return;
        }
        if self.permanently_failed {
            info!("manual connect after permanent failure, resetting reconnect budget");
            self.permanently_failed = false;
        }
        self.backoff.reset();
        self.open_connection();
    }

    fn open_connection(&mut self) {
        let conn = self.next_conn;
        self.next_conn += 1;
        self.live = Some(conn);
        self.state = ChannelState::Connecting;
        debug!(conn, url = %self.config.url, "opening realtime connection");
        self.events.emit(ChannelEvent::Connecting { conn });
        self.transport.open(&self.config.url, conn);
    }

    fn is_live(&self, conn: ConnId) -> bool {
        if self.live == Some(conn) {
            return true;
        }
        debug!(conn, live = ?self.live, "ignoring event from stale connection");
        false
    }

    pub fn handle_open(&mut self, conn: ConnId) {
        if !self.is_live(conn) || self.state != ChannelState::Connecting {
            return;
        }
        info!(conn, "realtime channel connected");
        self.state = ChannelState::Open;
        self.backoff.reset();
        self.events.emit(ChannelEvent::Opened { conn });
    }

    /// Decodes an inbound frame. Malformed frames are counted and dropped;
    /// the connection stays up.
    pub fn handle_message(&mut self, conn: ConnId, text: &str) -> Option<Dispatch> {
        if !self.is_live(conn) || self.state != ChannelState::Open {
            return None;
        }
        let message = match protocol::decode(text) {
            Ok(m) => m,
            Err(e) => {
                self.malformed += 1;
                warn!("dropping malformed realtime message: {e}");
                self.events.emit(ChannelEvent::MalformedMessage {
                    error: e.to_string(),
                });
                return None;
            }
        };
        let handlers = self.handlers.lock().snapshot(message.topic());
        Some(Dispatch { message, handlers })
    }

    /// Records the loss (or failed open) of `conn`. Returns the reconnect
    /// delay when one was scheduled.
    pub fn handle_close(&mut self, conn: ConnId) -> Option<Duration> {
        if !self.is_live(conn) {
            return None;
        }
        self.live = None;
        self.transport.close(conn);
        warn!(conn, state = ?self.state, "realtime connection lost");
        self.events.emit(ChannelEvent::ConnectionLost { conn });

        match self.backoff.next_delay() {
            Some(delay) => {
                let attempt = self.backoff.attempts();
                info!(
                    attempt,
                    max = self.backoff.max_attempts(),
                    "reconnecting in {}ms",
                    delay.as_millis()
                );
                self.state = ChannelState::Connecting;
                self.reconnect_pending = Some(delay);
                self.events
                    .emit(ChannelEvent::ReconnectScheduled { attempt, delay });
                Some(delay)
            }
            None => {
                let attempts = self.backoff.attempts();
                error!(attempts, "max reconnection attempts reached, giving up");
                self.state = ChannelState::Closed;
                self.permanently_failed = true;
                self.events
                    .emit(ChannelEvent::PermanentlyFailed { attempts });
                None
            }
        }
    }

    /// Fires a scheduled reconnect. Returns false when none was pending
    /// (for instance because the channel was disconnected meanwhile).
    pub fn reconnect_due(&mut self) -> bool {
        if self.reconnect_pending.take().is_none() || self.state != ChannelState::Connecting {
            return false;
        }
        self.open_connection();
        true
    }

    pub fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription {
        let id = self.handlers.lock().add(topic, handler);
        debug!(%topic, "handler subscribed");
        Subscription::new(&self.handlers, topic, id)
    }

    /// Sends a control frame if the channel is open. Nothing is queued: a
    /// frame sent while closed or connecting is dropped with a warning.
    pub fn send(&mut self, msg: &ControlMessage) -> Result<(), ChannelError> {
        let conn = match (self.state, self.live) {
            (ChannelState::Open, Some(conn)) => conn,
            (state, _) => {
                warn!(?state, "realtime channel not open, dropping {msg:?}");
                self.events.emit(ChannelEvent::SendDropped { state });
                return Err(ChannelError::NotOpen(state));
            }
        };
        let text = protocol::encode(msg).map_err(|e| ChannelError::Encode(e.to_string()))?;
        self.transport.send_text(conn, text)?;
        Ok(())
    }

    /// Closes the connection, cancels any pending reconnect and drops every
    /// subscription. Idempotent.
    pub fn disconnect(&mut self) {
        if let Some(conn) = self.live.take() {
            self.transport.close(conn);
        }
        self.reconnect_pending = None;
        self.handlers.lock().clear();
        if self.state != ChannelState::Closed {
            info!("realtime channel disconnected");
            self.state = ChannelState::Closed;
            self.events.emit(ChannelEvent::Disconnected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MemoryTransport, TransportOp};
    use foundation::geo::LatLng;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn channel(max_attempts: u32) -> RealtimeChannel<MemoryTransport> {
        let config = ChannelConfig {
            url: "ws://test/ws".into(),
            reconnect_base: Duration::from_millis(1000),
            max_reconnect_attempts: max_attempts,
        };
        RealtimeChannel::new(config, MemoryTransport::new())
    }

    /// Id of the connection the channel is currently waiting on.
    fn live(ch: &RealtimeChannel<MemoryTransport>) -> ConnId {
        ch.live.expect("no live connection")
    }

    fn open(ch: &mut RealtimeChannel<MemoryTransport>) -> ConnId {
        let conn = live(ch);
        ch.handle_open(conn);
        conn
    }

    /// Fails the live connection; fires the reconnect if one was scheduled.
    fn fail(ch: &mut RealtimeChannel<MemoryTransport>) -> Option<Duration> {
        let conn = live(ch);
        let delay = ch.handle_close(conn);
        if delay.is_some() {
            assert!(ch.reconnect_due());
        }
        delay
    }

    fn ms(v: u64) -> Option<Duration> {
        Some(Duration::from_millis(v))
    }

    fn counter(ch: &RealtimeChannel<MemoryTransport>, topic: Topic) -> (Subscription, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let c = hits.clone();
        let sub = ch.subscribe(
            topic,
            Arc::new(move |_: &ChannelMessage| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (sub, hits)
    }

    const ALERT: &str = r#"{"type":"alert","data":{"severity":"high","message":"Ozone"}}"#;

    #[test]
    fn connect_is_idempotent() {
        let mut ch = channel(5);
        ch.connect();
        ch.connect();
        assert_eq!(ch.state(), ChannelState::Connecting);
        open(&mut ch);
        ch.connect();
        assert_eq!(ch.state(), ChannelState::Open);
        assert_eq!(ch.transport().opens(), 1);
    }

    #[test]
    fn failures_back_off_then_stop() {
        let mut ch = channel(3);
        ch.connect();
        open(&mut ch);

        assert_eq!(fail(&mut ch), ms(1000));
        assert_eq!(fail(&mut ch), ms(2000));
        assert_eq!(fail(&mut ch), ms(4000));
        assert_eq!(fail(&mut ch), None);

        assert_eq!(ch.state(), ChannelState::Closed);
        assert!(ch.permanently_failed());
        assert!(!ch.reconnect_due());
        assert_eq!(ch.transport().opens(), 4);
        assert_eq!(
            ch.events().last(),
            Some(&ChannelEvent::PermanentlyFailed { attempts: 3 })
        );
    }

    #[test]
    fn failed_first_open_counts_as_failure() {
        let mut ch = channel(2);
        ch.connect();
        assert_eq!(fail(&mut ch), ms(1000));
        assert_eq!(fail(&mut ch), ms(2000));
        assert_eq!(fail(&mut ch), None);
        assert!(ch.permanently_failed());
    }

    #[test]
    fn successful_open_resets_backoff() {
        let mut ch = channel(5);
        ch.connect();
        open(&mut ch);
        assert_eq!(fail(&mut ch), ms(1000));
        assert_eq!(fail(&mut ch), ms(2000));
        open(&mut ch);
        assert_eq!(ch.attempts(), 0);

        assert_eq!(fail(&mut ch), ms(1000));
        assert_eq!(fail(&mut ch), ms(2000));
    }

    #[test]
    fn manual_connect_after_permanent_failure_gets_fresh_budget() {
        let mut ch = channel(1);
        ch.connect();
        assert_eq!(fail(&mut ch), ms(1000));
        assert_eq!(fail(&mut ch), None);

        ch.connect();
        assert!(!ch.permanently_failed());
        assert_eq!(ch.state(), ChannelState::Connecting);
        assert_eq!(fail(&mut ch), ms(1000));
    }

    #[test]
    fn lost_connections_are_released_before_reconnecting() {
        let mut ch = channel(5);
        ch.connect();
        let first = open(&mut ch);
        assert_eq!(fail(&mut ch), ms(1000));
        let second = live(&ch);
        assert_eq!(fail(&mut ch), ms(2000));

        let ops = &ch.transport().ops;
        let closed = |conn| {
            ops.iter()
                .position(|op| *op == TransportOp::Close { conn })
                .expect("connection never closed")
        };
        let reopened = |conn| {
            ops.iter()
                .position(|op| matches!(op, TransportOp::Open { conn: c, .. } if *c == conn))
                .expect("connection never opened")
        };
        assert!(closed(first) < reopened(second));
        assert!(closed(second) < reopened(live(&ch)));
    }

    #[test]
    fn disconnect_cancels_pending_reconnect() {
        let mut ch = channel(5);
        ch.connect();
        open(&mut ch);
        let conn = live(&ch);
        assert_eq!(ch.handle_close(conn), ms(1000));

        ch.disconnect();
        assert_eq!(ch.state(), ChannelState::Closed);
        assert!(!ch.reconnect_due());
        assert_eq!(ch.transport().opens(), 1);

        ch.disconnect();
        assert_eq!(ch.state(), ChannelState::Closed);
    }

    #[test]
    fn disconnect_is_not_treated_as_failure() {
        let mut ch = channel(5);
        ch.connect();
        let conn = open(&mut ch);
        ch.disconnect();
        assert_eq!(ch.handle_close(conn), None);
        assert!(!ch.permanently_failed());
        assert_eq!(
            ch.transport().ops.last(),
            Some(&TransportOp::Close { conn })
        );
    }

    #[test]
    fn stale_connection_events_are_ignored() {
        let mut ch = channel(5);
        ch.connect();
        let first = open(&mut ch);
        assert_eq!(fail(&mut ch), ms(1000));

        ch.handle_open(first);
        assert_eq!(ch.state(), ChannelState::Connecting);
        assert!(ch.handle_message(first, ALERT).is_none());
        assert_eq!(ch.handle_close(first), None);
    }

    #[test]
    fn messages_reach_topic_and_wildcard_handlers() {
        let mut ch = channel(5);
        let (_alerts, alert_hits) = counter(&ch, Topic::Alert);
        let (_all, all_hits) = counter(&ch, Topic::All);
        let (_air, air_hits) = counter(&ch, Topic::AirQualityUpdate);
        ch.connect();
        let conn = open(&mut ch);

        ch.handle_message(conn, ALERT).unwrap().deliver();
        assert_eq!(alert_hits.load(Ordering::SeqCst), 1);
        assert_eq!(all_hits.load(Ordering::SeqCst), 1);
        assert_eq!(air_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn malformed_messages_are_dropped_and_connection_survives() {
        let mut ch = channel(5);
        let (_sub, hits) = counter(&ch, Topic::All);
        ch.connect();
        let conn = open(&mut ch);

        assert!(ch.handle_message(conn, "{not json").is_none());
        assert!(ch.handle_message(conn, r#"{"type":"mystery","data":1}"#).is_none());
        assert_eq!(ch.malformed_count(), 2);
        assert!(ch.is_open());

        ch.handle_message(conn, ALERT).unwrap().deliver();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let mut ch = channel(5);
        let (first, first_hits) = counter(&ch, Topic::Alert);
        let (_second, second_hits) = counter(&ch, Topic::Alert);
        ch.connect();
        let conn = open(&mut ch);

        first.unsubscribe();
        ch.handle_message(conn, ALERT).unwrap().deliver();
        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_may_unsubscribe_during_delivery() {
        let mut ch = channel(5);
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let inner = slot.clone();
        let sub = ch.subscribe(
            Topic::Alert,
            Arc::new(move |_: &ChannelMessage| {
                inner.lock().take();
            }),
        );
        *slot.lock() = Some(sub);
        ch.connect();
        let conn = open(&mut ch);

        ch.handle_message(conn, ALERT).unwrap().deliver();
        assert_eq!(ch.handler_count(), 0);
    }

    #[test]
    fn disconnect_clears_subscriptions() {
        let mut ch = channel(5);
        counter(&ch, Topic::Alert).0.detach();
        ch.connect();
        ch.disconnect();
        assert_eq!(ch.handler_count(), 0);
    }

    #[test]
    fn send_requires_open_channel() {
        let mut ch = channel(5);
        let msg = ControlMessage::SubscribeLocation {
            location: LatLng::new(40.7, -74.0),
        };
        assert_eq!(ch.send(&msg), Err(ChannelError::NotOpen(ChannelState::Closed)));
        ch.connect();
        assert_eq!(
            ch.send(&msg),
            Err(ChannelError::NotOpen(ChannelState::Connecting))
        );
        open(&mut ch);
        ch.send(&msg).unwrap();
        assert_eq!(
            ch.transport().sent(),
            vec![r#"{"type":"subscribe-location","location":{"lat":40.7,"lng":-74.0}}"#]
        );
    }
}
