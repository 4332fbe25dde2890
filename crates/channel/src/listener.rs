//! Consumer side of the channel.
//!
//! Binds a TCP port (optionally searching upward for a free one), accepts
//! one connection at a time and decodes exactly one message from it.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use tilecast_protocol::{ASSIGNED_IMAGE_ID, DEFAULT_PORT, Message, wire};

use crate::TCP_BUFFER_SIZE;
use crate::error::ChannelError;
use crate::ports::PortRange;
use crate::sender::{Sender, SenderConfig};

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address to bind (IPv4 any-address by default).
    pub host: String,
    /// Requested port (0 = OS-assigned).
    pub port: u16,
    /// Scan the following ports when `port` is taken.
    pub search: bool,
    /// Upper bound for reading one message; `None` waits indefinitely.
    pub receive_timeout: Option<Duration>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            search: true,
            receive_timeout: None,
        }
    }
}

/// One accepted connection, good for a single [`Listener::receive`].
#[derive(Debug)]
pub struct Session {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Session {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

struct Bound {
    socket: TcpListener,
    port: u16,
}

/// Tile listener: `Unbound -> Bound -> Unbound`.
pub struct Listener {
    host: String,
    receive_timeout: Option<Duration>,
    bound: Option<Bound>,
}

impl Listener {
    /// Creates an unbound listener.
    pub fn new(config: &ListenerConfig) -> Self {
        Self {
            host: config.host.clone(),
            receive_timeout: config.receive_timeout,
            bound: None,
        }
    }

    /// Creates a listener and binds it to the configured port.
    pub async fn open(config: ListenerConfig) -> Result<Self, ChannelError> {
        let mut listener = Self::new(&config);
        listener.bind(config.port, config.search).await?;
        Ok(listener)
    }

    /// Binds to `port`, or with `search` to the first free port of
    /// `[port, port + 99)`. Returns the bound port.
    ///
    /// A listener that is already bound is closed first, so this doubles
    /// as "change port".
    pub async fn bind(&mut self, port: u16, search: bool) -> Result<u16, ChannelError> {
        self.close();

        let range = PortRange::candidates(port, search);
        let mut last_error = None;

        for candidate in range.iter() {
            match TcpListener::bind((self.host.as_str(), candidate)).await {
                Ok(socket) => {
                    let bound_port = socket.local_addr()?.port();
                    info!(host = %self.host, port = bound_port, "tile listener bound");
                    self.bound = Some(Bound {
                        socket,
                        port: bound_port,
                    });
                    return Ok(bound_port);
                }
                Err(e) => {
                    debug!(port = candidate, error = %e, "port unavailable");
                    last_error = Some(e);
                }
            }
        }

        Err(ChannelError::Bind {
            range,
            source: last_error
                .unwrap_or_else(|| std::io::Error::from(std::io::ErrorKind::AddrNotAvailable)),
        })
    }

    /// Releases the port. Safe to call when not bound.
    pub fn close(&mut self) {
        if let Some(bound) = self.bound.take() {
            info!(port = bound.port, "tile listener closed");
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// The port actually bound, which may differ from the requested one
    /// after a search.
    pub fn bound_port(&self) -> Option<u16> {
        self.bound.as_ref().map(|b| b.port)
    }

    /// Waits for the next connection.
    pub async fn accept(&self) -> Result<Session, ChannelError> {
        let bound = self.bound.as_ref().ok_or(ChannelError::NotBound)?;
        let (stream, peer) = bound.socket.accept().await?;
        debug!(%peer, "connection accepted");
        Ok(Session { stream, peer })
    }

    /// Reads one message from an accepted connection and closes it.
    ///
    /// OpenImage is answered with the listener's fixed image id. On error
    /// no message is delivered; the caller should go back to [`accept`].
    ///
    /// [`accept`]: Self::accept
    pub async fn receive(&self, session: Session) -> Result<Message, ChannelError> {
        let Session { stream, peer } = session;
        let mut stream = BufReader::with_capacity(TCP_BUFFER_SIZE, stream);

        let result = match self.receive_timeout {
            Some(limit) => {
                match tokio::time::timeout(
                    limit,
                    wire::read_message(&mut stream, ASSIGNED_IMAGE_ID),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => return Err(ChannelError::Timeout(limit)),
                }
            }
            None => wire::read_message(&mut stream, ASSIGNED_IMAGE_ID).await,
        };
        // Dropping the stream closes the connection whatever the outcome.
        drop(stream);

        let message = result?;
        debug!(%peer, kind = %message.kind(), "message received");
        Ok(message)
    }

    /// Accepts one connection and reads its message.
    pub async fn next_message(&self) -> Result<Message, ChannelError> {
        let session = self.accept().await?;
        self.receive(session).await
    }

    /// A sender aimed at this listener's own port, for shutting down its
    /// accept loop from another task.
    pub fn quit_sender(&self) -> Result<Sender, ChannelError> {
        let port = self.bound_port().ok_or(ChannelError::NotBound)?;
        Ok(Sender::new(SenderConfig {
            host: self.loopback_host(),
            port,
            ..SenderConfig::default()
        }))
    }

    /// Sends Quit to this listener's own port.
    pub async fn quit(&self) -> Result<(), ChannelError> {
        self.quit_sender()?.quit().await
    }

    /// Host to dial when talking to ourselves.
    fn loopback_host(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) if ip.is_unspecified() => "127.0.0.1".into(),
            Ok(IpAddr::V6(ip)) if ip.is_unspecified() => "::1".into(),
            _ => self.host.clone(),
        }
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("host", &self.host)
            .field("bound_port", &self.bound_port())
            .finish()
    }
}
