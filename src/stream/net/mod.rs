//! Streams over client socket connections.
//!
//! [`NetworkStream`] connects to a scheme-qualified address and hands the
//! connected socket to a [`Stream`]. Socket options are configured through a
//! [`SocketContext`], in the same way for every connection attempt.
//!
//! Host names may resolve to several addresses. These are attempted one after
//! another, each bounded by the connect timeout, and the error of the last
//! attempt is reported when none succeeds. Failures are never retried.

use std::io;
use std::net::{SocketAddr, TcpStream};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::Duration;

use bitflags::bitflags;
use socket2::{Domain, Protocol, Socket, TcpKeepalive, Type};
use tracing::{debug, trace, warn};

use crate::error::ConnectError;
use crate::handle::Handle;
use crate::info::{ConnectionInfo, Endpoint, HasConnectionInfo};
use crate::{Error, Stream};

pub use self::address::Address;
use self::dns::{IpVersionExt as _, SocketAddrs};

mod address;
mod dns;

/// Connect timeout used when none is given.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

bitflags! {
    /// Flags controlling how a connection is established.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConnectFlags: u32 {
        /// Reuse a persistent connection. Not supported, connections are never pooled.
        const PERSISTENT = 1;
        /// Return before the connection completes. Not supported, all I/O blocks.
        const ASYNC_CONNECT = 2;
        /// Connect and wait for the connection to complete.
        const CONNECT = 4;
    }
}

impl Default for ConnectFlags {
    fn default() -> Self {
        ConnectFlags::CONNECT
    }
}

/// Socket configuration applied before connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct SocketContext {
    /// Local address to bind before connecting. Only applied to candidates of
    /// the same address family; a port of zero picks an ephemeral port.
    pub bind_to: Option<SocketAddr>,

    /// Whether to disable Nagle's algorithm.
    pub nodelay: bool,

    /// Idle time before TCP keep-alive probes are sent.
    pub keepalive: Option<Duration>,

    /// The size of the send buffer.
    pub send_buffer_size: Option<usize>,

    /// The size of the receive buffer.
    pub recv_buffer_size: Option<usize>,
}

impl Default for SocketContext {
    fn default() -> Self {
        Self {
            bind_to: None,
            nodelay: true,
            keepalive: None,
            send_buffer_size: None,
            recv_buffer_size: None,
        }
    }
}

impl SocketContext {
    /// Bind to a local address before connecting.
    pub fn with_bind_to(mut self, addr: SocketAddr) -> Self {
        self.bind_to = Some(addr);
        self
    }

    /// Enable TCP keep-alive with the given idle time.
    pub fn with_keepalive(mut self, idle: Duration) -> Self {
        self.keepalive = Some(idle);
        self
    }
}

/// Factory for streams over client socket connections.
#[derive(Debug, Clone, Copy)]
pub struct NetworkStream;

impl NetworkStream {
    /// Connect to `address` with the default timeout, flags and context.
    pub fn create(address: &str) -> Result<Stream, Error> {
        Self::create_with(
            address,
            None,
            ConnectFlags::default(),
            &SocketContext::default(),
        )
    }

    /// Connect to `address`.
    ///
    /// `timeout` bounds each connection attempt and defaults to
    /// [`DEFAULT_CONNECT_TIMEOUT`]. A malformed address, an unknown transport, a
    /// zero timeout or unsupported flags fail with [`Error::InvalidArgument`].
    /// Failed connections surface as [`Error::Connect`] carrying the OS error.
    pub fn create_with(
        address: &str,
        timeout: Option<Duration>,
        flags: ConnectFlags,
        context: &SocketContext,
    ) -> Result<Stream, Error> {
        if flags.contains(ConnectFlags::ASYNC_CONNECT) {
            return Err(Error::invalid_argument(
                "Asynchronous connections are not supported",
            ));
        }
        if flags.contains(ConnectFlags::PERSISTENT) {
            return Err(Error::invalid_argument(
                "Persistent connections are not supported",
            ));
        }

        let timeout = timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        if timeout.is_zero() {
            return Err(Error::invalid_argument("Connect timeout must be positive"));
        }

        let parsed: Address = address.parse()?;
        let _span = tracing::trace_span!("connect", address = %parsed).entered();

        let handle = match &parsed {
            Address::Tcp { host, port } => {
                let stream = connect_tcp(address, host, *port, timeout, context)?;
                if let Ok(peer_addr) = stream.peer_addr() {
                    trace!(peer.addr = %peer_addr, "tcp connected");
                } else {
                    trace!("tcp connected");
                }
                Handle::tcp(stream)
            }
            #[cfg(unix)]
            Address::Unix(path) => {
                let stream = UnixStream::connect(path).map_err(|error| {
                    debug!(%error, "unix connect failed");
                    ConnectError::build(address, error)
                })?;
                trace!("unix connected");
                Handle::unix(stream)
            }
        };

        Stream::new(handle.with_uri(parsed.to_string()))
    }
}

fn connect_tcp(
    address: &str,
    host: &str,
    port: u16,
    timeout: Duration,
    context: &SocketContext,
) -> Result<TcpStream, ConnectError> {
    let mut candidates = dns::resolve(host, port).map_err(|error| {
        debug!(%error, host, "resolution failed");
        ConnectError::build(address, error)
    })?;
    candidates.sort_preferred(context.bind_to.map(|addr| addr.version()));
    trace!("{} connection candidates", candidates.len());

    attempt_all(address, candidates, timeout, context)
}

fn attempt_all(
    address: &str,
    mut candidates: SocketAddrs,
    timeout: Duration,
    context: &SocketContext,
) -> Result<TcpStream, ConnectError> {
    let mut last_error = None;
    while let Some(candidate) = candidates.pop() {
        let _span = tracing::trace_span!("socket::connect", remote.addr = %candidate).entered();
        match connect(&candidate, timeout, context) {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                debug!(%error, "connection attempt failed");
                last_error = Some(error);
            }
        }
    }

    Err(match last_error {
        Some(error) => ConnectError::build(address, error),
        None => ConnectError::new(address, "No addresses resolved"),
    })
}

fn bind_local_address(
    socket: &Socket,
    dst_addr: &SocketAddr,
    bind_to: Option<SocketAddr>,
) -> io::Result<()> {
    match bind_to {
        Some(local) if local.version() == dst_addr.version() => socket.bind(&local.into()),
        _ => Ok(()),
    }
}

/// Make a single blocking connection attempt.
fn connect(
    addr: &SocketAddr,
    timeout: Duration,
    context: &SocketContext,
) -> io::Result<TcpStream> {
    let domain = Domain::for_address(*addr);
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    trace!("tcp socket opened");

    let guard = tracing::trace_span!("socket::options").entered();

    if let Some(idle) = context.keepalive {
        let conf = TcpKeepalive::new().with_time(idle);
        if let Err(e) = socket.set_tcp_keepalive(&conf) {
            warn!("tcp set_keepalive error: {}", e);
        }
    }

    if let Some(size) = context.send_buffer_size {
        if let Err(e) = socket.set_send_buffer_size(size) {
            warn!("tcp set_send_buffer_size error: {}", e);
        }
    }

    if let Some(size) = context.recv_buffer_size {
        if let Err(e) = socket.set_recv_buffer_size(size) {
            warn!("tcp set_recv_buffer_size error: {}", e);
        }
    }

    bind_local_address(&socket, addr, context.bind_to)?;

    drop(guard);

    socket.connect_timeout(&(*addr).into(), timeout)?;

    if context.nodelay {
        if let Err(e) = socket.set_nodelay(true) {
            warn!("tcp set_nodelay error: {}", e);
        }
    }

    Ok(socket.into())
}

impl Stream {
    /// The textual address of one end of a socket stream: the peer when `remote`
    /// is true, otherwise the local end.
    ///
    /// TCP endpoints are formatted as `ip:port`; unix sockets as their path,
    /// or an empty string when unnamed. Non-socket streams fail with [`Error::Logic`].
    pub fn name(&self, remote: bool) -> Result<String, Error> {
        Ok(self.info()?.endpoint(remote).to_string())
    }

    /// Both endpoints of a socket stream.
    pub fn connection_info(&self) -> Result<ConnectionInfo<Endpoint>, Error> {
        self.info()
    }
}

impl HasConnectionInfo for Stream {
    type Addr = Endpoint;

    fn info(&self) -> Result<ConnectionInfo<Endpoint>, Error> {
        self.resource()
            .ok_or_else(|| Error::logic("Cannot get the endpoint name of a closed stream"))?
            .info()
    }
}
