//! Websocket connection task for the realtime channel.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use courier_core::config::FeedConfig;
use courier_core::error::FeedError;
use courier_core::types::RecipientId;

use crate::message::{ChangeEvent, Envelope, EVENT_CLOSE, EVENT_ERROR, EVENT_REPLY};
use crate::state::InternalState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsSource = SplitStream<WsStream>;

/// Handle to a live websocket connection task.
///
/// The connection loop runs in its own tokio task; the handle carries the
/// shutdown channel and the task handle so teardown can be both graceful
/// (leave frame) and guaranteed (abort).
pub(crate) struct FeedSocket {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl FeedSocket {
    /// Connects to the realtime endpoint, joins the topic, and spawns the
    /// connection loop.
    pub(crate) async fn connect(
        config: &FeedConfig,
        topic: String,
        recipient: &RecipientId,
        events_tx: mpsc::Sender<ChangeEvent>,
        state: Arc<RwLock<InternalState>>,
    ) -> Result<Self, FeedError> {
        state.write().mark_connecting();

        let connected = timeout(config.connect_timeout(), connect_async(&config.url))
            .await
            .map_err(|_| {
                state.write().mark_disconnected();
                FeedError::Timeout {
                    timeout_ms: config.connect_timeout_ms,
                }
            })?;

        let (ws_stream, _) = connected.map_err(|e| {
            state.write().mark_disconnected();
            FeedError::connection_failed(e.to_string())
        })?;

        let (mut sink, stream) = ws_stream.split();

        // Join before handing the connection to the loop so open() fails
        // fast when the socket is already broken.
        let join = Envelope::join(topic.clone(), recipient, config.api_key.as_deref());
        sink.send(WsMessage::Text(join.encode()?))
            .await
            .map_err(|e| {
                state.write().mark_disconnected();
                FeedError::connection_failed(e.to_string())
            })?;

        state.write().mark_subscribed();
        info!(topic = %topic, "Change-feed subscription opened");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let heartbeat_interval = config.heartbeat_interval();
        let task = tokio::spawn(Self::run_connection(
            sink,
            stream,
            shutdown_rx,
            events_tx,
            state,
            topic,
            heartbeat_interval,
        ));

        Ok(Self { shutdown_tx, task })
    }

    /// Signals the connection loop to leave the channel and close.
    pub(crate) async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }

    async fn run_connection(
        mut sink: WsSink,
        mut stream: WsSource,
        mut shutdown_rx: mpsc::Receiver<()>,
        events_tx: mpsc::Sender<ChangeEvent>,
        state: Arc<RwLock<InternalState>>,
        topic: String,
        heartbeat_period: std::time::Duration,
    ) {
        let mut heartbeat = interval(heartbeat_period);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick of a tokio interval fires immediately; skip it so
        // the join frame is not chased by an instant heartbeat.
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!(topic = %topic, "Shutdown signal received");
                    if let Ok(text) = Envelope::leave(topic.clone()).encode() {
                        let _ = sink.send(WsMessage::Text(text)).await;
                    }
                    let _ = sink.close().await;
                    state.write().mark_closed();
                    break;
                }

                Some(result) = stream.next() => {
                    match result {
                        Ok(WsMessage::Text(text)) => {
                            if Self::handle_frame(&text, &topic, &events_tx, &state).await {
                                break;
                            }
                        }
                        Ok(WsMessage::Ping(data)) => {
                            if let Err(e) = sink.send(WsMessage::Pong(data)).await {
                                warn!(error = %e, "Failed to send pong");
                            }
                        }
                        Ok(WsMessage::Close(_)) => {
                            info!(topic = %topic, "Server closed the feed connection");
                            state.write().mark_disconnected();
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(topic = %topic, error = %e, "Feed connection error");
                            state.write().mark_disconnected();
                            break;
                        }
                    }
                }

                _ = heartbeat.tick() => {
                    match Envelope::heartbeat().encode() {
                        Ok(text) => {
                            if let Err(e) = sink.send(WsMessage::Text(text)).await {
                                warn!(error = %e, "Failed to send heartbeat");
                            } else {
                                state.write().record_heartbeat();
                                debug!(topic = %topic, "Heartbeat sent");
                            }
                        }
                        Err(e) => warn!(error = %e, "Failed to encode heartbeat"),
                    }
                }
            }
        }

        debug!(topic = %topic, "Feed connection loop terminated");
    }

    /// Processes one text frame. Returns true when the loop should stop.
    async fn handle_frame(
        text: &str,
        topic: &str,
        events_tx: &mpsc::Sender<ChangeEvent>,
        state: &Arc<RwLock<InternalState>>,
    ) -> bool {
        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable feed frame");
                return false;
            }
        };

        // Frames for another topic are cross-talk from a previous
        // subscription generation; the channel name embeds the generation
        // precisely so these can be discarded here.
        if envelope.topic != topic && envelope.topic != "phoenix" {
            debug!(
                expected = %topic,
                received = %envelope.topic,
                "Ignoring frame for stale topic"
            );
            return false;
        }

        if envelope.is_error_reply() {
            warn!(topic = %topic, payload = %envelope.payload, "Channel join rejected");
            state.write().mark_disconnected();
            return true;
        }

        match envelope.event.as_str() {
            EVENT_REPLY => {
                debug!(topic = %topic, "Channel reply received");
                false
            }
            EVENT_CLOSE | EVENT_ERROR => {
                warn!(topic = %topic, event = %envelope.event, "Channel closed by server");
                state.write().mark_disconnected();
                true
            }
            _ => match envelope.decode_change() {
                Ok(Some(event)) => {
                    state.write().record_event();
                    if events_tx.send(event).await.is_err() {
                        debug!(topic = %topic, "Event consumer dropped; stopping feed");
                        return true;
                    }
                    false
                }
                Ok(None) => false,
                Err(e) => {
                    warn!(error = %e, "Dropping undecodable change payload");
                    false
                }
            },
        }
    }
}

impl Drop for FeedSocket {
    fn drop(&mut self) {
        // Backstop: the graceful path is shutdown(), but a dropped handle
        // must never leak a live connection task.
        self.task.abort();
    }
}
