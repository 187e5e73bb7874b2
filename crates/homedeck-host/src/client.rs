//! Async WebSocket client for the host application.
//!
//! The [`HostClient`] connects to the host on `ws://127.0.0.1:{port}`,
//! registers the plugin, and then hands the connection to a background task.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        HostClient                         │
//! │                                                           │
//! │  ┌──────────────┐        ┌─────────────────────────────┐  │
//! │  │  HostSender  │──cmd──▶│  Background Task             │  │
//! │  │  (clonable)  │  chan  │                              │  │
//! │  │              │        │  WebSocket read/write loop   │  │
//! │  │  events()  ◀─┼──evt──◀│  text frame → HostFrame      │  │
//! │  └──────────────┘  chan  └─────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no reconnection: the host supervises the plugin process, so when
//! the socket closes the event channel closes too and the caller exits.

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use homedeck_core::prelude::*;

use crate::commands::{registration_frame, HostCommand, HostSender};
use crate::protocol::{parse_host_frame, HostFrame};

/// Capacity of the inbound event channel (bounded, the host can be bursty).
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Maximum length of a malformed frame echoed into the log.
const LOG_SNIPPET_LEN: usize = 120;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;

/// WebSocket connection to the host application.
///
/// Create with [`HostClient::connect`], take a [`HostSender`] with
/// [`HostClient::sender`] and drain inbound frames from
/// [`HostClient::event_receiver`]. The background task exits when the socket
/// closes or when every sender has been dropped.
pub struct HostClient {
    sender: HostSender,
    event_rx: mpsc::Receiver<HostFrame>,
}

impl HostClient {
    /// Connect to the host on `port` and register as `plugin_uuid`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the socket cannot be opened or the
    /// registration frame cannot be written.
    pub async fn connect(port: u16, plugin_uuid: &str, register_event: &str) -> Result<Self> {
        let url = format!("ws://127.0.0.1:{port}");
        info!("Connecting to host at {}", url);

        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|err| Error::transport(format!("Failed to connect to host: {err}")))?;

        let (mut ws_sink, ws_stream) = ws_stream.split();
        let registration = registration_frame(plugin_uuid, register_event).to_string();
        ws_sink
            .send(WsMessage::Text(registration.into()))
            .await
            .map_err(|err| Error::transport(format!("Failed to register plugin: {err}")))?;
        info!("Registered plugin with host");

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<HostCommand>();
        let (event_tx, event_rx) = mpsc::channel::<HostFrame>(EVENT_CHANNEL_CAPACITY);
        let sender = HostSender::new(cmd_tx, plugin_uuid);

        tokio::spawn(run_io_loop(
            ws_sink,
            ws_stream,
            cmd_rx,
            event_tx,
            plugin_uuid.to_string(),
        ));

        Ok(Self { sender, event_rx })
    }

    /// A clonable handle for sending commands to the host.
    pub fn sender(&self) -> HostSender {
        self.sender.clone()
    }

    /// Inbound frames. Yields `None` once the connection is gone.
    pub fn event_receiver(&mut self) -> &mut mpsc::Receiver<HostFrame> {
        &mut self.event_rx
    }

    /// Split into the sender and the inbound receiver.
    pub fn into_parts(self) -> (HostSender, mpsc::Receiver<HostFrame>) {
        (self.sender, self.event_rx)
    }
}

/// Background read/write loop. Returns when the connection ends.
async fn run_io_loop(
    mut ws_sink: WsSink,
    mut ws_stream: futures_util::stream::SplitStream<WsStream>,
    mut cmd_rx: mpsc::UnboundedReceiver<HostCommand>,
    event_tx: mpsc::Sender<HostFrame>,
    plugin_uuid: String,
) {
    let mut requested_global_settings = false;

    loop {
        tokio::select! {
            // ── Incoming WebSocket message ───────────────────────────────
            frame = ws_stream.next() => {
                match frame {
                    Some(Ok(message @ (WsMessage::Text(_) | WsMessage::Binary(_)))) => {
                        if !requested_global_settings {
                            requested_global_settings = true;
                            info!("Requesting global settings");
                            let request = HostCommand::get_global_settings(&plugin_uuid);
                            if !write_command(&mut ws_sink, &request).await {
                                return;
                            }
                        }
                        match message {
                            WsMessage::Text(text) => {
                                if !forward_text(text.as_str(), &event_tx).await {
                                    debug!("Host: event receiver dropped, stopping");
                                    send_close(&mut ws_sink).await;
                                    return;
                                }
                            }
                            _ => debug!("Host: ignoring binary frame"),
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        info!("Host: received Close frame");
                        return;
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong/raw frames: ignored
                    }
                    Some(Err(err)) => {
                        error!("Host: WebSocket read error: {}", err);
                        return;
                    }
                    None => {
                        info!("Host: WebSocket stream ended");
                        return;
                    }
                }
            }

            // ── Outgoing command from a HostSender ───────────────────────
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    send_close(&mut ws_sink).await;
                    return;
                };
                if !write_command(&mut ws_sink, &cmd).await {
                    return;
                }
            }
        }
    }
}

/// Parse a text frame and forward it. Returns `false` if the receiver is gone.
async fn forward_text(text: &str, event_tx: &mpsc::Sender<HostFrame>) -> bool {
    match parse_host_frame(text) {
        Ok(frame) => {
            debug!("<- host: {}", frame.event.name());
            event_tx.send(frame).await.is_ok()
        }
        Err(err) => {
            let end = text
                .char_indices()
                .nth(LOG_SNIPPET_LEN)
                .map_or(text.len(), |(i, _)| i);
            warn!("Host: dropping malformed frame ({}): {}", err, &text[..end]);
            true
        }
    }
}

/// Serialize and write one command. Returns `false` if the socket is broken.
async fn write_command(ws_sink: &mut WsSink, cmd: &HostCommand) -> bool {
    let text = cmd.to_frame().to_string();
    match ws_sink.send(WsMessage::Text(text.into())).await {
        Ok(()) => true,
        Err(err) => {
            error!(
                "Host: failed to send {} ({:?}): {}",
                cmd.event_name(),
                cmd.context(),
                err
            );
            false
        }
    }
}

async fn send_close(ws_sink: &mut WsSink) {
    if let Err(err) = ws_sink.send(WsMessage::Close(None)).await {
        debug!("Host: error sending Close frame: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HostEvent;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    type ServerWs = WebSocketStream<tokio::net::TcpStream>;

    async fn fake_host() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    async fn accept(listener: &TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.unwrap();
        accept_async(stream).await.unwrap()
    }

    async fn next_json(ws: &mut ServerWs) -> Value {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .expect("timed out waiting for plugin frame")
                .expect("stream ended")
                .expect("read error");
            if let WsMessage::Text(text) = msg {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    async fn push(ws: &mut ServerWs, text: &str) {
        ws.send(WsMessage::Text(text.to_string().into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_connect_sends_registration_frame() {
        let (listener, port) = fake_host().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            next_json(&mut ws).await
        });

        let _client = HostClient::connect(port, "uuid-1", "registerPlugin")
            .await
            .unwrap();

        let registration = server.await.unwrap();
        assert_eq!(registration, json!({"uuid": "uuid-1", "event": "registerPlugin"}));
    }

    #[tokio::test]
    async fn test_connect_fails_without_host() {
        let (listener, port) = fake_host().await;
        drop(listener);
        let result = HostClient::connect(port, "uuid-1", "registerPlugin").await;
        assert!(matches!(result, Err(Error::Transport { .. })));
    }

    #[tokio::test]
    async fn test_first_message_requests_global_settings_once() {
        let (listener, port) = fake_host().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let _registration = next_json(&mut ws).await;
            push(&mut ws, r#"{"event":"deviceDidConnect","device":"d"}"#).await;
            push(&mut ws, r#"{"event":"deviceDidConnect","device":"d"}"#).await;
            let request = next_json(&mut ws).await;
            // Nothing else should follow the single request.
            let extra = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
            (request, extra.is_err())
        });

        let mut client = HostClient::connect(port, "uuid-1", "registerPlugin")
            .await
            .unwrap();
        client.event_receiver().recv().await.unwrap();
        client.event_receiver().recv().await.unwrap();

        let (request, nothing_else) = server.await.unwrap();
        assert_eq!(request, json!({"event": "getGlobalSettings", "context": "uuid-1"}));
        assert!(nothing_else);
    }

    #[tokio::test]
    async fn test_binary_first_frame_also_requests_global_settings() {
        let (listener, port) = fake_host().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let _registration = next_json(&mut ws).await;
            ws.send(WsMessage::Binary(vec![0u8, 1, 2].into()))
                .await
                .unwrap();
            let request = next_json(&mut ws).await;
            push(
                &mut ws,
                r#"{"action":"com.example.homedeck.control","event":"keyUp","context":"c1","payload":{}}"#,
            )
            .await;
            let extra = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
            (request, extra.is_err())
        });

        let mut client = HostClient::connect(port, "uuid-1", "registerPlugin")
            .await
            .unwrap();
        // The binary frame is not forwarded; the text frame after it is.
        let frame = client.event_receiver().recv().await.unwrap();
        assert_eq!(frame.event, HostEvent::KeyUp);

        let (request, nothing_else) = server.await.unwrap();
        assert_eq!(request, json!({"event": "getGlobalSettings", "context": "uuid-1"}));
        assert!(nothing_else);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped_and_stream_continues() {
        let (listener, port) = fake_host().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let _registration = next_json(&mut ws).await;
            push(&mut ws, "this is not json").await;
            push(
                &mut ws,
                r#"{"action":"com.example.homedeck.control","event":"keyUp","context":"c1","payload":{}}"#,
            )
            .await;
            // Keep the socket open until the client has read both frames.
            let _ = next_json(&mut ws).await;
        });

        let mut client = HostClient::connect(port, "uuid-1", "registerPlugin")
            .await
            .unwrap();
        let frame = client.event_receiver().recv().await.unwrap();
        assert_eq!(frame.event, HostEvent::KeyUp);
        assert_eq!(frame.context.as_deref(), Some("c1"));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_sender_commands_reach_host() {
        let (listener, port) = fake_host().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let _registration = next_json(&mut ws).await;
            next_json(&mut ws).await
        });

        let client = HostClient::connect(port, "uuid-1", "registerPlugin")
            .await
            .unwrap();
        client.sender().show_ok("ctx-9");

        let frame = server.await.unwrap();
        assert_eq!(frame, json!({"event": "showOk", "context": "ctx-9"}));
    }

    #[tokio::test]
    async fn test_event_stream_ends_when_host_closes() {
        let (listener, port) = fake_host().await;
        let server = tokio::spawn(async move {
            let mut ws = accept(&listener).await;
            let _registration = next_json(&mut ws).await;
            ws.close(None).await.unwrap();
        });

        let mut client = HostClient::connect(port, "uuid-1", "registerPlugin")
            .await
            .unwrap();
        let next = tokio::time::timeout(Duration::from_secs(5), client.event_receiver().recv())
            .await
            .expect("receiver should close");
        assert!(next.is_none());

        server.await.unwrap();
    }
}
