//! Connection Information

use std::fmt;
use std::net::SocketAddr;
#[cfg(unix)]
use std::path::PathBuf;

use crate::Error;
use crate::handle::Handle;

/// Canonicalize a socket address, converting IPv4-mapped IPv6 addresses
/// into standard IPv4 addresses.
///
/// IPv4 peers of a dual-stack socket appear as `::ffff:192.0.2.1`; this
/// reports them as `192.0.2.1`.
pub(crate) fn make_canonical(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        std::net::IpAddr::V4(_) => addr,
        std::net::IpAddr::V6(ip) => {
            if let Some(ip) = ip.to_ipv4_mapped() {
                SocketAddr::new(std::net::IpAddr::V4(ip), addr.port())
            } else {
                addr
            }
        }
    }
}

/// One end of a socket connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// An IP address and port.
    Inet(SocketAddr),

    /// A unix-domain socket path, `None` for an unnamed socket.
    #[cfg(unix)]
    Unix(Option<PathBuf>),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Inet(addr) => write!(f, "{addr}"),
            #[cfg(unix)]
            Endpoint::Unix(Some(path)) => write!(f, "{}", path.display()),
            #[cfg(unix)]
            Endpoint::Unix(None) => Ok(()),
        }
    }
}

#[cfg(unix)]
impl From<std::os::unix::net::SocketAddr> for Endpoint {
    fn from(addr: std::os::unix::net::SocketAddr) -> Self {
        Endpoint::Unix(addr.as_pathname().map(PathBuf::from))
    }
}

/// Information about a connection to a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo<Addr> {
    /// The local address for this connection.
    pub local_addr: Addr,

    /// The remote address for this connection.
    pub remote_addr: Addr,
}

impl<Addr> ConnectionInfo<Addr> {
    /// The local address for this connection
    pub fn local_addr(&self) -> &Addr {
        &self.local_addr
    }

    /// The remote address for this connection
    pub fn remote_addr(&self) -> &Addr {
        &self.remote_addr
    }

    /// Pick one end of the connection.
    pub fn endpoint(&self, remote: bool) -> &Addr {
        if remote {
            &self.remote_addr
        } else {
            &self.local_addr
        }
    }

    /// Map the addresses in this connection info to a new type.
    pub fn map<T, F>(self, f: F) -> ConnectionInfo<T>
    where
        F: Fn(Addr) -> T,
    {
        ConnectionInfo {
            local_addr: f(self.local_addr),
            remote_addr: f(self.remote_addr),
        }
    }
}

/// Trait for types which can provide connection information.
pub trait HasConnectionInfo {
    /// The address type for this connection.
    type Addr: fmt::Display + fmt::Debug + Send;

    /// Get the connection information, failing for handles which aren't connected sockets.
    fn info(&self) -> Result<ConnectionInfo<Self::Addr>, Error>;
}

impl HasConnectionInfo for Handle {
    type Addr = Endpoint;

    fn info(&self) -> Result<ConnectionInfo<Endpoint>, Error> {
        if let Some(stream) = self.tcp_stream() {
            let local_addr = stream
                .local_addr()
                .map_err(Error::io("Cannot get local socket name"))?;
            let remote_addr = stream
                .peer_addr()
                .map_err(Error::io("Cannot get remote socket name"))?;
            return Ok(ConnectionInfo {
                local_addr: Endpoint::Inet(make_canonical(local_addr)),
                remote_addr: Endpoint::Inet(make_canonical(remote_addr)),
            });
        }

        #[cfg(unix)]
        if let Some(stream) = self.unix_stream() {
            let local_addr = stream
                .local_addr()
                .map_err(Error::io("Cannot get local socket name"))?;
            let remote_addr = stream
                .peer_addr()
                .map_err(Error::io("Cannot get remote socket name"))?;
            return Ok(ConnectionInfo {
                local_addr: local_addr.into(),
                remote_addr: remote_addr.into(),
            });
        }

        Err(Error::logic(format!(
            "Cannot get the endpoint name of a {} stream",
            self.stream_type()
        )))
    }
}
