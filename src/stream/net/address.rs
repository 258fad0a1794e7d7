//! Scheme-qualified socket addresses.

use std::fmt;
#[cfg(unix)]
use std::path::PathBuf;
use std::str::FromStr;

use crate::Error;

/// An address a [`NetworkStream`](super::NetworkStream) can connect to.
///
/// Accepted forms are `tcp://host:port`, bare `host:port` (TCP), IPv6 literals
/// in brackets (`tcp://[::1]:80`), and `unix:///path/to/socket` on unix.
/// Only stream sockets are supported, so datagram schemes such as `udp://` are
/// rejected as unknown transports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    /// A TCP endpoint; the host may be a name or an IP literal.
    Tcp {
        /// Host name or IP literal, without brackets.
        host: String,
        /// Port number.
        port: u16,
    },

    /// A unix-domain stream socket path.
    #[cfg(unix)]
    Unix(PathBuf),
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = match address.split_once("://") {
            Some((scheme, rest)) => (scheme, rest),
            None => ("tcp", address),
        };

        match scheme {
            "tcp" => parse_host_port(rest)
                .map(|(host, port)| Address::Tcp { host, port })
                .ok_or_else(|| Error::invalid_argument(format!("Invalid address \"{address}\""))),
            #[cfg(unix)]
            "unix" if !rest.is_empty() => Ok(Address::Unix(PathBuf::from(rest))),
            #[cfg(unix)]
            "unix" => Err(Error::invalid_argument(format!(
                "Invalid address \"{address}\""
            ))),
            _ => Err(Error::invalid_argument(format!(
                "Unable to find the socket transport \"{scheme}\""
            ))),
        }
    }
}

fn parse_host_port(rest: &str) -> Option<(String, u16)> {
    let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
        let (host, port) = bracketed.split_once("]:")?;
        (host, port)
    } else {
        let (host, port) = rest.rsplit_once(':')?;
        if host.contains(':') {
            return None;
        }
        (host, port)
    };

    if host.is_empty() {
        return None;
    }

    let port = port.parse().ok()?;
    Some((host.to_owned(), port))
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Tcp { host, port } if host.contains(':') => {
                write!(f, "tcp://[{host}]:{port}")
            }
            Address::Tcp { host, port } => write!(f, "tcp://{host}:{port}"),
            #[cfg(unix)]
            Address::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}
