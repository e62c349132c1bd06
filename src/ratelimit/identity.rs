//! Client identity derivation.

use std::net::{IpAddr, SocketAddr};

/// The key under which a caller's request history is tracked.
///
/// Derived from the peer's IP address; the port is dropped so every
/// connection from one host shares a budget.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Identity used when the transport does not expose a peer address.
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_ip(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }

    /// Build an identity from an optional peer address.
    pub fn from_peer(peer: Option<SocketAddr>) -> Self {
        match peer {
            Some(addr) => Self::from_ip(addr.ip()),
            None => Self(Self::UNKNOWN.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
