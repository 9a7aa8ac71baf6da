//! WebSocket Game Server
//!
//! Accept loop, per-connection tasks and background maintenance. Each
//! connection gets a reader loop plus a dedicated writer task fed by an
//! unbounded channel of pre-serialized frames; the router never touches
//! a socket directly.
//!
//! A plain-TCP liveness listener answers HTTP GETs with `200 ok` so
//! orchestration probes do not need a WebSocket client.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::network::registry::DEFAULT_PLAYER_CAP;
use crate::network::router::MessageRouter;

/// Interval between debounced profile-flush checks.
const FLUSH_TICK: Duration = Duration::from_secs(1);

/// Canned liveness reply.
const HEALTH_RESPONSE: &[u8] =
    b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok";

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// WebSocket bind address.
    pub bind_addr: String,
    /// Liveness probe bind address.
    pub health_addr: String,
    /// Maximum concurrent players.
    pub max_players: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            health_addr: "0.0.0.0:8081".to_string(),
            max_players: DEFAULT_PLAYER_CAP,
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind a listener.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// The game server: accept loop plus background tasks.
pub struct GameServer {
    config: ServerConfig,
    router: Arc<MessageRouter>,
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Wrap a router with an accept loop and shutdown channel.
    pub fn new(config: ServerConfig, router: MessageRouter) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            router: Arc::new(router),
            shutdown_tx,
        }
    }

    /// Handle used to request shutdown from another task.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Run until shutdown. Flushes profiles before returning.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener =
            TcpListener::bind(&self.config.bind_addr)
                .await
                .map_err(|source| GameServerError::Bind {
                    addr: self.config.bind_addr.clone(),
                    source,
                })?;
        info!(
            addr = %self.config.bind_addr,
            max_players = self.config.max_players,
            "server listening"
        );

        match TcpListener::bind(&self.config.health_addr).await {
            Ok(health) => {
                tokio::spawn(run_health(health, self.shutdown_tx.subscribe()));
            }
            Err(e) => warn!(addr = %self.config.health_addr, error = %e, "liveness listener unavailable"),
        }

        let flush_router = self.router.clone();
        let mut flush_shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut tick = interval(FLUSH_TICK);
            loop {
                tokio::select! {
                    _ = flush_shutdown.recv() => break,
                    _ = tick.tick() => flush_router.flush_profiles(now_ms()).await,
                }
            }
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!(%addr, "incoming connection");
                            tokio::spawn(handle_connection(
                                self.router.clone(),
                                stream,
                                self.shutdown_tx.subscribe(),
                            ));
                        }
                        Err(e) => error!(error = %e, "accept failed"),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received");
                    break;
                }
            }
        }

        self.router.flush_now(now_ms()).await;
        Ok(())
    }
}

/// Drive one WebSocket connection from handshake to teardown.
async fn handle_connection(
    router: Arc<MessageRouter>,
    stream: TcpStream,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let peer = stream.peer_addr().ok();
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            debug!(?peer, error = %e, "websocket handshake failed");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<String>();

    // Writer task: drains the frame channel until every sender is gone.
    let writer = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let Some(id) = router.handle_connect(frame_tx).await else {
        // Capacity refusal: the full notice is already queued and the
        // channel is closed, so the writer drains and exits.
        let _ = writer.await;
        return;
    };
    info!(player = %id, ?peer, "connection established");

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        router.handle_frame(&id, &text, now_ms()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(player = %id, "client disconnected");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(player = %id, error = %e, "websocket read error");
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }

    // Disconnect drops the registered sender, which ends the writer.
    router.handle_disconnect(&id).await;
    let _ = writer.await;
    info!(player = %id, "connection closed");
}

/// Minimal HTTP liveness endpoint on a plain TCP listener.
async fn run_health(listener: TcpListener, mut shutdown_rx: broadcast::Receiver<()>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                if let Ok((mut stream, _)) = accepted {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 512];
                        let _ = stream.read(&mut buf).await;
                        let _ = stream.write_all(HEALTH_RESPONSE).await;
                        let _ = stream.shutdown().await;
                    });
                }
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::catalog::Catalog;
    use crate::game::fishing::FishingEngine;
    use crate::network::protocol::ServerMessage;
    use crate::network::registry::SessionRegistry;
    use crate::persist::ProfileStore;
    use crate::world::tiles::World;

    fn test_router(capacity: usize) -> MessageRouter {
        let store_path = std::env::temp_dir()
            .join(format!("tidepool-server-{}.json", uuid::Uuid::new_v4()));
        MessageRouter::new(
            World::generate(1),
            Catalog::standard(),
            SessionRegistry::new(capacity),
            FishingEngine::new(1),
            ProfileStore::load(store_path).unwrap(),
        )
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_players, DEFAULT_PLAYER_CAP);
        assert!(config.bind_addr.ends_with(":8080"));
    }

    #[test]
    fn test_now_ms_monotonic_enough() {
        let a = now_ms();
        let b = now_ms();
        assert!(b >= a);
        // Sanity: after 2020.
        assert!(a > 1_577_836_800_000);
    }

    #[tokio::test]
    async fn test_health_endpoint_answers_ok() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, _) = broadcast::channel(1);
        tokio::spawn(run_health(listener, shutdown_tx.subscribe()));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /healthz HTTP/1.1\r\nhost: test\r\n\r\n")
            .await
            .unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();

        let text = String::from_utf8_lossy(&response);
        assert!(text.starts_with("HTTP/1.1 200 OK"));
        assert!(text.ends_with("ok"));

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_websocket_session_end_to_end() {
        let router = Arc::new(test_router(4));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, _) = broadcast::channel(1);

        let accept_router = router.clone();
        let accept_shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handle_connection(accept_router, stream, accept_shutdown).await;
        });

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();

        let frame = ws.next().await.unwrap().unwrap();
        let msg = ServerMessage::from_json(frame.to_text().unwrap()).unwrap();
        assert!(matches!(msg, ServerMessage::Init { .. }));

        ws.send(Message::Text(
            r#"{"type":"chat","text":"tight lines"}"#.to_string(),
        ))
        .await
        .unwrap();
        let frame = ws.next().await.unwrap().unwrap();
        let msg = ServerMessage::from_json(frame.to_text().unwrap()).unwrap();
        assert!(matches!(msg, ServerMessage::Chat { text, .. } if text == "tight lines"));

        ws.close(None).await.unwrap();
        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_capacity_refusal_over_websocket() {
        let router = Arc::new(test_router(0));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, _) = broadcast::channel(1);

        let accept_router = router.clone();
        let accept_shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handle_connection(accept_router, stream, accept_shutdown).await;
        });

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
            .await
            .unwrap();
        let frame = ws.next().await.unwrap().unwrap();
        let msg = ServerMessage::from_json(frame.to_text().unwrap()).unwrap();
        assert!(matches!(msg, ServerMessage::Full { .. }));
    }
}
