//! Observer websocket server. Each connection is registered with the hub and receives one text
//! frame per event; nothing else is ever sent by the application.

use crate::config::ServerConfig;
use crate::error::NidsError;
use crate::hub::HubHandle;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;

/// Lifecycle of one observer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Registered,
    /// Peer closed, or the hub evicted us
    Closing,
    /// Send failure, send timeout or protocol error
    Errored,
    Deregistered,
}

pub struct ObserverServer {
    listener: TcpListener,
    hub: HubHandle,
    send_timeout: Duration,
    observer_queue: usize,
}

impl ObserverServer {
    pub async fn bind(config: &ServerConfig, hub: HubHandle) -> Result<Self, NidsError> {
        let listener = TcpListener::bind(&config.listen_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "observer server listening");
        Ok(Self {
            listener,
            hub,
            send_timeout: Duration::from_millis(config.send_timeout_ms),
            observer_queue: config.observer_queue,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` flips to true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let hub = self.hub.clone();
                        let send_timeout = self.send_timeout;
                        let queue = self.observer_queue;
                        tokio::spawn(async move {
                            let ended = serve_observer(stream, peer, hub, send_timeout, queue).await;
                            tracing::debug!(%peer, ?ended, "observer connection finished");
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
            }
        }
        tracing::info!("observer server stopped");
    }
}

/// Drive one connection to completion. Returns the state that ended it (`Closing` or
/// `Errored`); the hub registration is already released by then.
pub async fn serve_observer(
    stream: TcpStream,
    peer: SocketAddr,
    hub: HubHandle,
    send_timeout: Duration,
    queue: usize,
) -> ConnectionState {
    let mut state = ConnectionState::Connecting;
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!(%peer, ?state, error = %e, "websocket handshake failed");
            return ConnectionState::Errored;
        }
    };
    let Some(mut registration) = hub.register(queue) else {
        tracing::warn!(%peer, "hub stopped; refusing observer");
        return ConnectionState::Errored;
    };
    state = ConnectionState::Registered;
    tracing::info!(%peer, observer = registration.id(), "observer connected");

    let (mut sink, mut inbound) = ws.split();
    while state == ConnectionState::Registered {
        tokio::select! {
            frame = registration.recv() => match frame {
                Some(frame) => {
                    let send = sink.send(Message::Text(frame.to_string()));
                    match tokio::time::timeout(send_timeout, send).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::warn!(%peer, error = %e, "observer send failed");
                            state = ConnectionState::Errored;
                        }
                        Err(_) => {
                            tracing::warn!(%peer, timeout_ms = send_timeout.as_millis() as u64, "observer send timed out");
                            state = ConnectionState::Errored;
                        }
                    }
                }
                None => state = ConnectionState::Closing,
            },
            msg = inbound.next() => match msg {
                Some(Ok(Message::Close(_))) | None => state = ConnectionState::Closing,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(%peer, error = %e, "observer read failed");
                    state = ConnectionState::Errored;
                }
            },
        }
    }

    if state == ConnectionState::Closing {
        let _ = tokio::time::timeout(send_timeout, sink.close()).await;
    }
    let observer = registration.id();
    drop(registration);
    let ended = state;
    state = ConnectionState::Deregistered;
    tracing::info!(%peer, observer, ?ended, ?state, "observer disconnected");
    ended
}
