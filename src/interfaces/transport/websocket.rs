//! WebSocket transport adapter
//!
//! One connection per charger at `/ocpp/{chargerId}`, subprotocol
//! `ocpp1.6`, text frames carrying standard OCPP-J arrays. Closing a
//! connection cancels every pending outbound call for that charger.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

use crate::application::session::TransportType;
use crate::support::ocpp_frame::OcppFrame;
use crate::support::shutdown::ShutdownSignal;

use super::{TransportAdapter, TransportContext, TransportError};

/// OCPP 1.6 WebSocket subprotocol
const OCPP_SUBPROTOCOL: &str = "ocpp1.6";

pub struct WebSocketTransport {
    ctx: TransportContext,
    bind_addr: String,
    senders: Arc<DashMap<String, mpsc::UnboundedSender<String>>>,
    shutdown: ShutdownSignal,
}

impl WebSocketTransport {
    pub fn new(ctx: TransportContext, bind_addr: impl Into<String>, shutdown: ShutdownSignal) -> Self {
        Self {
            ctx,
            bind_addr: bind_addr.into(),
            senders: Arc::new(DashMap::new()),
            shutdown,
        }
    }

    /// Extract the charger id from the request path.
    /// Accepts `/ocpp/{id}` and the bare `/{id}` fallback.
    fn extract_charge_point_id(path: &str) -> Option<String> {
        let path = path.trim_start_matches('/');

        if let Some(id) = path.strip_prefix("ocpp/") {
            let id = id.trim_start_matches('/');
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }

        if !path.is_empty() && !path.contains('/') {
            return Some(path.to_string());
        }

        None
    }
}

#[async_trait]
impl TransportAdapter for WebSocketTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::WebSocket
    }

    async fn start(&self) -> Result<(), TransportError> {
        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|e| TransportError::SendFailed(format!("bind {}: {}", self.bind_addr, e)))?;

        info!(
            "OCPP WebSocket transport listening on ws://{}/ocpp/{{charge_point_id}}",
            self.bind_addr
        );

        let ctx = self.ctx.clone();
        let senders = self.senders.clone();
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, addr)) => {
                                let ctx = ctx.clone();
                                let senders = senders.clone();
                                let shutdown = shutdown.clone();
                                tokio::spawn(async move {
                                    if let Err(e) =
                                        handle_connection(stream, addr, ctx, senders, shutdown).await
                                    {
                                        error!("WebSocket connection error from {}: {}", addr, e);
                                    }
                                });
                            }
                            Err(e) => error!("Failed to accept WebSocket connection: {}", e),
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("WebSocket transport received shutdown signal");
                        return;
                    }
                }
            }
        });

        Ok(())
    }

    async fn stop(&self) {
        // Dropping the senders ends every connection's send task; the
        // per-connection cleanup cancels pending calls.
        for entry in self.senders.iter() {
            self.ctx.pending.cancel_for_charger(entry.key());
            self.ctx
                .connections
                .unregister(entry.key(), TransportType::WebSocket);
        }
        self.senders.clear();
    }

    async fn send_message(
        &self,
        charge_point_id: &str,
        action: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        let sender = self
            .senders
            .get(charge_point_id)
            .ok_or_else(|| TransportError::NotConnected(charge_point_id.to_string()))?
            .clone();

        let (unique_id, rx) = self.ctx.pending.register(charge_point_id, action);
        let frame = OcppFrame::Call {
            unique_id: unique_id.clone(),
            action: action.to_string(),
            payload,
        };

        if sender.send(frame.serialize()).is_err() {
            self.ctx.pending.cancel(&unique_id);
            return Err(TransportError::ConnectionClosed);
        }

        self.ctx.pending.await_response(&unique_id, rx, timeout).await
    }

    fn is_connected(&self, charge_point_id: &str) -> bool {
        self.senders.contains_key(charge_point_id)
    }
}

/// Handle a single charger connection end-to-end.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    ctx: TransportContext,
    senders: Arc<DashMap<String, mpsc::UnboundedSender<String>>>,
    shutdown: ShutdownSignal,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut charge_point_id: Option<String> = None;

    let ws_stream =
        tokio_tungstenite::accept_hdr_async(stream, |req: &Request, mut response: Response| {
            let path = req.uri().path();

            let requested_protocols = req
                .headers()
                .get("Sec-WebSocket-Protocol")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            let supports_ocpp16 = requested_protocols
                .split(',')
                .map(|s| s.trim())
                .any(|p| p == OCPP_SUBPROTOCOL);

            if supports_ocpp16 {
                response
                    .headers_mut()
                    .insert("Sec-WebSocket-Protocol", OCPP_SUBPROTOCOL.parse().unwrap());
            } else if !requested_protocols.is_empty() {
                warn!(
                    "Client does not offer {}, requested: {}",
                    OCPP_SUBPROTOCOL, requested_protocols
                );
            }

            charge_point_id = WebSocketTransport::extract_charge_point_id(path);
            Ok(response)
        })
        .await?;

    let Some(charge_point_id) = charge_point_id else {
        warn!("WebSocket handshake from {} without charger id in path, closing", addr);
        return Ok(());
    };

    info!(charge_point_id = charge_point_id.as_str(), %addr, "Charger connected via WebSocket");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let tx_probe = tx.clone();

    // A reconnect replaces the previous session: the evicted sender
    // drops, its send task ends.
    if senders.insert(charge_point_id.clone(), tx).is_some() {
        warn!(
            charge_point_id = charge_point_id.as_str(),
            "Evicting stale WebSocket session"
        );
    }
    ctx.connections
        .register(&charge_point_id, TransportType::WebSocket);

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(Message::Text(msg)).await {
                error!("WebSocket send error: {}", e);
                break;
            }
        }
    });

    let recv_ctx = ctx.clone();
    let recv_senders = senders.clone();
    let cp_id = charge_point_id.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Some(reply) = recv_ctx
                        .handle_incoming(&cp_id, TransportType::WebSocket, &text)
                        .await
                    {
                        let sent = recv_senders
                            .get(&cp_id)
                            .map(|s| s.send(reply.to_wire_text()).is_ok())
                            .unwrap_or(false);
                        if !sent {
                            error!(
                                charge_point_id = cp_id.as_str(),
                                "Failed to queue reply, connection gone"
                            );
                            break;
                        }
                    }
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Pong is sent automatically by tungstenite
                }
                Ok(Message::Close(frame)) => {
                    info!(charge_point_id = cp_id.as_str(), ?frame, "Close frame received");
                    break;
                }
                Ok(Message::Binary(data)) => {
                    warn!(
                        charge_point_id = cp_id.as_str(),
                        bytes = data.len(),
                        "Binary message ignored"
                    );
                }
                Ok(Message::Frame(_)) => {}
                Err(e) => {
                    error!(charge_point_id = cp_id.as_str(), "WebSocket error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
        _ = shutdown.notified().wait() => {
            info!(charge_point_id = charge_point_id.as_str(), "Closing connection for shutdown");
        }
    }

    // Cleanup on every exit path: the charger's claim, its sender, and
    // all in-flight outbound calls. Skipped when this session was
    // evicted by a reconnect, so the replacement session survives.
    let is_current = senders
        .get(&charge_point_id)
        .map(|s| s.same_channel(&tx_probe))
        .unwrap_or(false);
    if is_current {
        senders.remove(&charge_point_id);
        ctx.connections
            .unregister(&charge_point_id, TransportType::WebSocket);
        ctx.pending.cancel_for_charger(&charge_point_id);
    }

    info!(charge_point_id = charge_point_id.as_str(), "Charger disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_charger_id_from_path() {
        assert_eq!(
            WebSocketTransport::extract_charge_point_id("/ocpp/CP001"),
            Some("CP001".to_string())
        );
        assert_eq!(
            WebSocketTransport::extract_charge_point_id("/CP001"),
            Some("CP001".to_string())
        );
        assert_eq!(WebSocketTransport::extract_charge_point_id("/ocpp/"), None);
        assert_eq!(WebSocketTransport::extract_charge_point_id("/a/b/c"), None);
    }
}
