//! Network addresses in `network:address` form.
//!
//! [`Addr`] accepts any network tag and keeps both halves verbatim. [`TcpAddr`],
//! [`UdpAddr`] and [`UnixAddr`] restrict the tag to their family and resolve the
//! address half into a concrete socket address. Resolution never opens a socket.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::value::{Settable, settable_serde};

/// Render the `"<network>:<address>"` text form shared by every address type.
pub fn render_addr(network: &str, address: impl fmt::Display) -> String {
    format!("{network}:{address}")
}

fn split_addr(text: &str) -> Result<(&str, &str), ConfigError> {
    text.split_once(':')
        .ok_or_else(|| ConfigError::AddrFormat(text.to_string()))
}

/// A generic network address. The network tag is not validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Addr {
    network: String,
    address: String,
}

impl Addr {
    pub fn new(network: impl Into<String>, address: impl Into<String>) -> Self {
        Addr {
            network: network.into(),
            address: address.into(),
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Settable for Addr {
    fn set(&mut self, text: &str) -> Result<(), ConfigError> {
        let (network, address) = split_addr(text)?;
        *self = Addr::new(network, address);
        Ok(())
    }

    fn to_text(&self) -> Result<String, ConfigError> {
        Ok(render_addr(&self.network, &self.address))
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.network, self.address)
    }
}

settable_serde!(Addr);

/// IP version constraint carried by a network tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IpFamily {
    Any,
    V4,
    V6,
}

macro_rules! network_tags {
    (
        $(#[$meta:meta])*
        $name:ident, $family:literal {
            $($variant:ident => $tag:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            const FAMILY: &'static str = $family;

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }

            fn from_tag(tag: &str) -> Result<Self, ConfigError> {
                match tag {
                    $($tag => Ok($name::$variant),)+
                    _ => Err(ConfigError::InvalidNetwork {
                        family: Self::FAMILY,
                        network: tag.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

network_tags! {
    /// `tcp`, `tcp4` or `tcp6`.
    TcpNetwork, "TCP" { Tcp => "tcp", Tcp4 => "tcp4", Tcp6 => "tcp6" }
}

network_tags! {
    /// `udp`, `udp4` or `udp6`.
    UdpNetwork, "UDP" { Udp => "udp", Udp4 => "udp4", Udp6 => "udp6" }
}

network_tags! {
    /// `unix`, `unixpacket` or `unixgram`.
    UnixNetwork, "Unix" { Unix => "unix", UnixPacket => "unixpacket", UnixGram => "unixgram" }
}

impl TcpNetwork {
    fn ip_family(self) -> IpFamily {
        match self {
            TcpNetwork::Tcp => IpFamily::Any,
            TcpNetwork::Tcp4 => IpFamily::V4,
            TcpNetwork::Tcp6 => IpFamily::V6,
        }
    }
}

impl UdpNetwork {
    fn ip_family(self) -> IpFamily {
        match self {
            UdpNetwork::Udp => IpFamily::Any,
            UdpNetwork::Udp4 => IpFamily::V4,
            UdpNetwork::Udp6 => IpFamily::V6,
        }
    }
}

/// Resolve `host:port` into one socket address of the requested IP family.
///
/// An empty host means the unspecified address. Plain `tcp`/`udp` prefer IPv4
/// when the host resolves to both families.
fn resolve_ip(network: &str, address: &str, family: IpFamily) -> Result<SocketAddr, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidAddress {
        network: network.to_string(),
        address: address.to_string(),
        reason: reason.to_string(),
    };

    if let Some(port) = address.strip_prefix(':') {
        let port: u16 = port.parse().map_err(|_| invalid("invalid port"))?;
        let ip = match family {
            IpFamily::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            IpFamily::Any | IpFamily::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        return Ok(SocketAddr::new(ip, port));
    }

    let candidates: Vec<SocketAddr> = address
        .to_socket_addrs()
        .map_err(|source| ConfigError::Resolve {
            network: network.to_string(),
            address: address.to_string(),
            source,
        })?
        .collect();

    let chosen = match family {
        IpFamily::V4 => candidates.iter().find(|a| a.is_ipv4()),
        IpFamily::V6 => candidates.iter().find(|a| a.is_ipv6()),
        IpFamily::Any => candidates
            .iter()
            .find(|a| a.is_ipv4())
            .or_else(|| candidates.first()),
    };
    chosen
        .copied()
        .ok_or_else(|| invalid("no address of the requested family"))
}

/// A TCP endpoint in the `tcp`, `tcp4` or `tcp6` network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TcpAddr {
    network: TcpNetwork,
    addr: SocketAddr,
}

/// A UDP endpoint in the `udp`, `udp4` or `udp6` network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UdpAddr {
    network: UdpNetwork,
    addr: SocketAddr,
}

macro_rules! ip_addr_type {
    ($ty:ident, $network:ident) => {
        impl $ty {
            pub fn new(network: $network, addr: SocketAddr) -> Self {
                $ty { network, addr }
            }

            pub fn network(&self) -> $network {
                self.network
            }

            pub fn socket_addr(&self) -> SocketAddr {
                self.addr
            }

            pub fn ip(&self) -> IpAddr {
                self.addr.ip()
            }

            pub fn port(&self) -> u16 {
                self.addr.port()
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                $ty::new(
                    $network::default(),
                    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
                )
            }
        }

        impl Settable for $ty {
            fn set(&mut self, text: &str) -> Result<(), ConfigError> {
                let (tag, address) = split_addr(text)?;
                let network = $network::from_tag(tag)?;
                let addr = resolve_ip(tag, address, network.ip_family())?;
                *self = $ty::new(network, addr);
                Ok(())
            }

            fn to_text(&self) -> Result<String, ConfigError> {
                Ok(render_addr(self.network.as_str(), self.addr))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", self.network, self.addr)
            }
        }

        impl From<$ty> for SocketAddr {
            fn from(a: $ty) -> SocketAddr {
                a.addr
            }
        }

        settable_serde!($ty);
    };
}

ip_addr_type!(TcpAddr, TcpNetwork);
ip_addr_type!(UdpAddr, UdpNetwork);

/// A Unix-domain socket path in the `unix`, `unixpacket` or `unixgram` network.
///
/// The default value has no path and renders as the empty string; setting the
/// empty string restores it. A `unix:` tag with an empty path is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UnixAddr {
    network: UnixNetwork,
    path: PathBuf,
}

impl UnixAddr {
    pub fn new(network: UnixNetwork, path: impl Into<PathBuf>) -> Self {
        UnixAddr {
            network,
            path: path.into(),
        }
    }

    pub fn network(&self) -> UnixNetwork {
        self.network
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_unset(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

impl Settable for UnixAddr {
    fn set(&mut self, text: &str) -> Result<(), ConfigError> {
        if text.is_empty() {
            *self = UnixAddr::default();
            return Ok(());
        }
        let (tag, path) = split_addr(text)?;
        let network = UnixNetwork::from_tag(tag)?;
        let reason = if path.is_empty() {
            Some("empty socket path")
        } else if path.contains('\0') {
            Some("socket path contains a NUL byte")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(ConfigError::InvalidAddress {
                network: tag.to_string(),
                address: path.to_string(),
                reason: reason.to_string(),
            });
        }
        *self = UnixAddr::new(network, path);
        Ok(())
    }

    fn to_text(&self) -> Result<String, ConfigError> {
        Ok(self.to_string())
    }
}

impl fmt::Display for UnixAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unset() {
            return Ok(());
        }
        write!(f, "{}:{}", self.network, self.path.display())
    }
}

settable_serde!(UnixAddr);
