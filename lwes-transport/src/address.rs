//! ## lwes-transport::address
//! Parses `[scheme://]host:port[/path]` into a transport endpoint.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Address family restriction carried by the `udp4`/`udp6` schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Any,
    V4,
    V6,
}

impl Family {
    pub fn admits(self, addr: &SocketAddr) -> bool {
        match self {
            Family::Any => true,
            Family::V4 => addr.is_ipv4(),
            Family::V6 => addr.is_ipv6(),
        }
    }
}

/// Where a transport points, before any resolution or binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Udp { family: Family, host_port: String },
    Unixgram { path: PathBuf },
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| TransportError::InvalidAddress {
            address: address.to_owned(),
            reason,
        };

        let (scheme, rest) = match address.split_once("://") {
            Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
            None => ("udp".to_owned(), address),
        };
        if rest.is_empty() {
            return Err(invalid("missing host"));
        }

        let family = match scheme.as_str() {
            "udp" => Family::Any,
            "udp4" => Family::V4,
            "udp6" => Family::V6,
            "unixgram" => {
                return Ok(Endpoint::Unixgram {
                    path: PathBuf::from(rest),
                })
            }
            _ => return Err(TransportError::UnsupportedTransport(scheme)),
        };

        if rest.contains('/') {
            return Err(invalid("udp addresses take no path"));
        }
        if !rest.contains(':') {
            return Err(invalid("missing port"));
        }
        Ok(Endpoint::Udp {
            family,
            host_port: rest.to_owned(),
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Udp { family, host_port } => {
                let scheme = match family {
                    Family::Any => "udp",
                    Family::V4 => "udp4",
                    Family::V6 => "udp6",
                };
                write!(f, "{scheme}://{host_port}")
            }
            Endpoint::Unixgram { path } => write!(f, "unixgram://{}", path.display()),
        }
    }
}

/// Network interface used for multicast joins and outgoing multicast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    /// IPv4 address assigned to the interface.
    Addr(Ipv4Addr),
    /// OS interface index, as used by IPv6 multicast.
    Index(u32),
}

impl FromStr for Interface {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(addr) = s.parse::<Ipv4Addr>() {
            Ok(Interface::Addr(addr))
        } else if let Ok(index) = s.parse::<u32>() {
            Ok(Interface::Index(index))
        } else {
            Err(TransportError::InvalidInterface(s.to_owned()))
        }
    }
}
