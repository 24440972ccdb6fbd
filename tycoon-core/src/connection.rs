//! Connection loop: one task per connection feeding the synchronizer.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::event::RawEvent;
use crate::state::Snapshot;
use crate::sync::{ConnectionState, Synchronizer};

/// A bidirectional text-frame channel to the game server.
#[async_trait]
pub trait Transport: Send {
    /// # Errors
    ///
    /// Returns an error if the channel cannot be opened.
    async fn connect(&mut self) -> Result<(), TransportError>;

    /// # Errors
    ///
    /// Returns an error if the frame cannot be delivered.
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// Next inbound frame; `None` once the peer has closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel fails while reading.
    async fn recv(&mut self) -> Result<Option<String>, TransportError>;

    /// # Errors
    ///
    /// Returns an error if the channel fails while closing.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// In-memory transport backed by tokio channels.
#[derive(Debug)]
pub struct ChannelTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
    open: bool,
}

/// The server side of a [`ChannelTransport`].
#[derive(Debug)]
pub struct ChannelPeer {
    to_client: Option<mpsc::UnboundedSender<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ChannelTransport {
    #[must_use]
    pub fn pair() -> (Self, ChannelPeer) {
        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        (
            Self {
                inbound,
                outbound,
                open: false,
            },
            ChannelPeer {
                to_client: Some(to_client),
                from_client,
            },
        )
    }
}

impl ChannelPeer {
    /// Push a frame to the client.
    ///
    /// # Errors
    ///
    /// Returns an error once the client or this peer has closed.
    pub fn send(&self, frame: impl Into<String>) -> Result<(), TransportError> {
        let sender = self.to_client.as_ref().ok_or(TransportError::Closed)?;
        sender
            .send(frame.into())
            .map_err(|_| TransportError::Closed)
    }

    /// Next frame the client sent.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Close the server side; the client sees end of stream.
    pub fn close(&mut self) {
        self.to_client = None;
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        self.open = true;
        Ok(())
    }

    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::Send("not connected".into()));
        }
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Result<Option<String>, TransportError> {
        if !self.open {
            return Err(TransportError::Receive("not connected".into()));
        }
        Ok(self.inbound.recv().await)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        self.inbound.close();
        Ok(())
    }
}

/// Reader side of a running connection.
#[derive(Debug)]
pub struct SyncHandle {
    snapshots: watch::Receiver<Arc<Snapshot>>,
    state: watch::Receiver<ConnectionState>,
    token: CancellationToken,
    task: JoinHandle<ConnectionState>,
}

impl SyncHandle {
    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshots.borrow())
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }

    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the connection to reach `Closed` or `Cancelled`.
    pub async fn closed(&self) -> ConnectionState {
        let mut state = self.state.clone();
        let done = match state.wait_for(|current| current.is_terminal()).await {
            Ok(current) => Some(*current),
            Err(_) => None,
        };
        done.unwrap_or_else(|| *state.borrow())
    }

    /// Wait for the loop task to exit and return its final state.
    pub async fn join(self) -> ConnectionState {
        match self.task.await {
            Ok(state) => state,
            Err(err) => {
                log::error!("connection task failed: {err}");
                ConnectionState::Closed
            }
        }
    }
}

/// Open a connection on the current tokio runtime.
///
/// The loop sends the login frame once the transport is up, then applies
/// inbound frames until the peer closes, the transport fails, or `token` is
/// cancelled. A transport ending on its own also cancels `token`.
pub fn open<T>(
    transport: T,
    initial: Snapshot,
    credential: impl Into<String>,
    token: CancellationToken,
) -> SyncHandle
where
    T: Transport + 'static,
{
    let sync = Synchronizer::new(initial);
    let (snapshot_tx, snapshots) = watch::channel(sync.snapshot());
    let (state_tx, state) = watch::channel(ConnectionState::Disconnected);
    let task = tokio::spawn(run(
        transport,
        sync,
        credential.into(),
        token.clone(),
        snapshot_tx,
        state_tx,
    ));
    SyncHandle {
        snapshots,
        state,
        token,
        task,
    }
}

async fn run<T: Transport>(
    mut transport: T,
    mut sync: Synchronizer,
    credential: String,
    token: CancellationToken,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    state_tx: watch::Sender<ConnectionState>,
) -> ConnectionState {
    let finish = |state: ConnectionState| {
        state_tx.send_replace(state);
        if state == ConnectionState::Closed {
            token.cancel();
        }
        log::info!(
            "connection {state:?}, last snapshot {:016x}",
            snapshot_tx.borrow().fingerprint()
        );
        state
    };

    state_tx.send_replace(ConnectionState::Connecting);
    if token.is_cancelled() {
        return finish(ConnectionState::Cancelled);
    }
    if let Err(err) = transport.connect().await {
        log::warn!("{err}");
        return finish(ConnectionState::Closed);
    }
    state_tx.send_replace(ConnectionState::Open);

    let login = match serde_json::to_string(&RawEvent::login(&credential)) {
        Ok(frame) => frame,
        Err(err) => {
            log::error!("cannot encode login frame: {err}");
            return finish(ConnectionState::Closed);
        }
    };
    if let Err(err) = transport.send(login).await {
        log::warn!("{err}");
        return finish(ConnectionState::Closed);
    }

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => {
                if let Err(err) = transport.close().await {
                    log::warn!("{err}");
                }
                return finish(ConnectionState::Cancelled);
            }
            frame = transport.recv() => match frame {
                Ok(Some(text)) => match sync.apply_message(&text) {
                    Ok(_) => {
                        snapshot_tx.send_if_modified(|current| {
                            let latest = sync.snapshot();
                            let changed = !Arc::ptr_eq(current, &latest);
                            *current = latest;
                            changed
                        });
                    }
                    Err(err) => log::warn!("dropping frame: {err}"),
                },
                Ok(None) => return finish(ConnectionState::Closed),
                Err(err) => {
                    log::warn!("{err}");
                    return finish(ConnectionState::Closed);
                }
            },
        }
    }
}
