//! TCP Transport
//!
//! Server and client establishment for the single replay connection, and the
//! two halves the connection is split into.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use super::endpoint::{Endpoint, Role};
use super::traits::PayloadSink;
use crate::error::{ConnectOp, ReplayError, Result};

/// Run an establishment step, optionally bounded by a timeout
async fn bounded<T>(
    limit: Option<Duration>,
    step: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, step).await.map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("no connection within {limit:?}"),
            )
        })?,
        None => step.await,
    }
}

/// A bound listening socket that has not accepted its peer yet
///
/// Split from [`Connection::as_server`] so callers can learn the bound
/// address (port `0`) before blocking on the accept.
pub struct ServerEndpoint {
    listener: TcpListener,
    endpoint: Endpoint,
}

impl ServerEndpoint {
    /// Bind and listen on `endpoint`
    ///
    /// # Errors
    ///
    /// `ReplayError::Connection` with [`ConnectOp::Bind`] if the address is
    /// in use, not permitted or does not resolve.
    pub async fn bind(endpoint: &Endpoint) -> Result<Self> {
        let listener = TcpListener::bind((endpoint.host.as_str(), endpoint.port))
            .await
            .map_err(|source| ReplayError::Connection {
                op: ConnectOp::Bind,
                endpoint: endpoint.to_string(),
                source,
            })?;

        tracing::info!(endpoint = %endpoint, "Listening for connections");

        Ok(Self {
            listener,
            endpoint: endpoint.clone(),
        })
    }

    /// Address the listener is actually bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| ReplayError::io("local_addr", e))
    }

    /// Wait for exactly one peer
    ///
    /// The listener is kept inside the returned connection until the first
    /// cycle closes it; no further accepts happen.
    pub async fn accept(self, timeout: Option<Duration>) -> Result<Connection> {
        let (stream, peer) = bounded(timeout, self.listener.accept())
            .await
            .map_err(|source| ReplayError::Connection {
                op: ConnectOp::Accept,
                endpoint: self.endpoint.to_string(),
                source,
            })?;

        tracing::info!(peer = %peer, "Connection accepted");

        Ok(Connection {
            role: Role::Server,
            peer,
            stream,
            listener: Some(self.listener),
        })
    }
}

/// The single full-duplex connection of the process
#[derive(Debug)]
pub struct Connection {
    role: Role,
    peer: SocketAddr,
    stream: TcpStream,
    listener: Option<TcpListener>,
}

impl Connection {
    /// Bind, listen and accept one peer
    pub async fn as_server(endpoint: &Endpoint, timeout: Option<Duration>) -> Result<Self> {
        ServerEndpoint::bind(endpoint).await?.accept(timeout).await
    }

    /// Connect to a listening peer
    ///
    /// # Errors
    ///
    /// `ReplayError::Connection` with [`ConnectOp::Connect`] on refusal,
    /// resolution failure or timeout.
    pub async fn as_client(endpoint: &Endpoint, timeout: Option<Duration>) -> Result<Self> {
        let connect_err = |source| ReplayError::Connection {
            op: ConnectOp::Connect,
            endpoint: endpoint.to_string(),
            source,
        };

        let stream = bounded(
            timeout,
            TcpStream::connect((endpoint.host.as_str(), endpoint.port)),
        )
        .await
        .map_err(connect_err)?;
        let peer = stream.peer_addr().map_err(connect_err)?;

        tracing::info!(peer = %peer, "Connected");

        Ok(Self {
            role: Role::Client,
            peer,
            stream,
            listener: None,
        })
    }

    /// Establish the connection for `role`
    pub async fn establish(
        role: Role,
        endpoint: &Endpoint,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        match role {
            Role::Server => Self::as_server(endpoint, timeout).await,
            Role::Client => Self::as_client(endpoint, timeout).await,
        }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Split into the receive side and the send side
    ///
    /// A server connection closes its send side after every completed cycle
    /// unless `keep_open` is set. A client connection never does.
    #[must_use]
    pub fn split(self, keep_open: bool) -> (InboundHalf, OutboundHalf) {
        let close_after_cycle = self.role == Role::Server && !keep_open;
        let (reader, writer) = self.stream.into_split();

        let inbound = InboundHalf {
            reader,
            peer: self.peer,
        };
        let outbound = OutboundHalf {
            writer: Some(writer),
            listener: self.listener,
            peer: self.peer,
            close_after_cycle,
        };

        (inbound, outbound)
    }
}

/// Read side of the connection, owned by the receiver task
///
/// Drained through [`PayloadSource::receive`](super::PayloadSource).
#[derive(Debug)]
pub struct InboundHalf {
    reader: OwnedReadHalf,
    peer: SocketAddr,
}

impl InboundHalf {
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl AsyncRead for InboundHalf {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.reader).poll_read(cx, buf)
    }
}

/// Write side of the connection, owned by the replayer
#[derive(Debug)]
pub struct OutboundHalf {
    writer: Option<OwnedWriteHalf>,
    listener: Option<TcpListener>,
    peer: SocketAddr,
    close_after_cycle: bool,
}

impl OutboundHalf {
    /// Drop the listener and shut down the write side
    ///
    /// Idempotent. Later sends fail with `NotConnected`.
    pub async fn close(&mut self) -> Result<()> {
        self.listener.take();

        if let Some(mut writer) = self.writer.take() {
            writer
                .shutdown()
                .await
                .map_err(|e| ReplayError::io("close", e))?;
            tracing::info!(peer = %self.peer, "Closed connection after replay cycle");
        }

        Ok(())
    }
}

#[async_trait]
impl PayloadSink for OutboundHalf {
    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            ReplayError::io(
                "send",
                io::Error::new(io::ErrorKind::NotConnected, "connection already closed"),
            )
        })?;

        writer
            .write_all(payload)
            .await
            .map_err(|e| ReplayError::io("send", e))
    }

    async fn finish_cycle(&mut self) -> Result<()> {
        if self.close_after_cycle {
            self.close().await
        } else {
            Ok(())
        }
    }

    fn is_open(&self) -> bool {
        self.writer.is_some()
    }
}
