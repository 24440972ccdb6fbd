//! Transports the runner can hand to the connection loop.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::path::Path;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use tycoon_core::{
    CancellationToken, ChannelTransport, ConnectionState, Snapshot, Transport, TransportError,
    open,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Websocket connection to the game server.
pub struct WsTransport {
    endpoint: String,
    socket: Option<Socket>,
}

impl WsTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            socket: None,
        }
    }

    fn socket(&mut self) -> Result<&mut Socket, TransportError> {
        self.socket.as_mut().ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let (socket, response) = connect_async(self.endpoint.as_str())
            .await
            .map_err(|err| TransportError::Connect(format!("{}: {err}", self.endpoint)))?;
        log::info!(
            "connected to {} ({})",
            self.endpoint,
            response.status()
        );
        self.socket = Some(socket);
        Ok(())
    }

    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.socket()?
            .send(Message::Text(frame))
            .await
            .map_err(|err| TransportError::Send(err.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        let socket = self.socket()?;
        while let Some(message) = socket.next().await {
            match message.map_err(|err| TransportError::Receive(err.to_string()))? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(bytes) => {
                    return String::from_utf8(bytes)
                        .map(Some)
                        .map_err(|err| TransportError::Receive(err.to_string()));
                }
                Message::Close(frame) => {
                    log::info!("server closed the connection: {frame:?}");
                    return Ok(None);
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let Some(mut socket) = self.socket.take() else {
            return Ok(());
        };
        socket
            .close(None)
            .await
            .map_err(|err| TransportError::Send(err.to_string()))
    }
}

/// Read a recorded event stream: one JSON frame per line.
///
/// Blank lines and lines starting with `//` are skipped.
pub fn load_frames(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read events {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("//"))
        .map(str::to_string)
        .collect())
}

/// Outcome of replaying a recorded stream.
#[derive(Debug)]
pub struct Replay {
    pub snapshot: std::sync::Arc<Snapshot>,
    pub frames: usize,
    pub state: ConnectionState,
}

/// Push `frames` through the connection loop over an in-memory channel and
/// return the final snapshot.
pub async fn replay(initial: Snapshot, frames: Vec<String>) -> Result<Replay> {
    let (transport, mut peer) = ChannelTransport::pair();
    let handle = open(transport, initial, "replay", CancellationToken::new());
    let login = peer
        .recv()
        .await
        .context("connection loop ended before logging in")?;
    log::debug!("replay login frame: {login}");

    let count = frames.len();
    for frame in frames {
        peer.send(frame)
            .context("connection loop stopped while replaying")?;
    }
    peer.close();

    let state = handle.closed().await;
    let snapshot = handle.snapshot();
    handle.join().await;
    Ok(Replay {
        snapshot,
        frames: count,
        state,
    })
}
