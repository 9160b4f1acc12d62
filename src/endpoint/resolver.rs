//! Multiaddr to `host:port` resolution.
//!
//! # Responsibilities
//! - Expand `/dns`, `/dns4` and `/dns6` segments through a bounded lookup
//! - Pick the first candidate carrying a literal IP
//! - Render IPv6 hosts in bracket notation so they can carry a port

use async_trait::async_trait;
use multiaddr::{Multiaddr, Protocol};
use std::fmt;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::endpoint::types::{ResolveError, ResolveResult};

/// Hostname lookup used for DNS segments.
#[async_trait]
pub trait HostLookup: Send + Sync {
    async fn lookup(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>>;
}

/// System resolver via `tokio::net::lookup_host`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

#[async_trait]
impl HostLookup for SystemLookup {
    async fn lookup(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        Ok(tokio::net::lookup_host((host, port)).await?.collect())
    }
}

/// A concrete dial target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    host: String,
    port: u16,
}

impl ResolvedAddress {
    /// IPv4 literal or bracketed IPv6 literal.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Which answers a DNS segment accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnsFamily {
    Any,
    V4,
    V6,
}

impl DnsFamily {
    fn accepts(self, ip: &IpAddr) -> bool {
        match self {
            DnsFamily::Any => true,
            DnsFamily::V4 => ip.is_ipv4(),
            DnsFamily::V6 => ip.is_ipv6(),
        }
    }
}

/// Resolves multiaddrs into `host:port` targets.
#[derive(Clone)]
pub struct AddressResolver {
    lookup: Arc<dyn HostLookup>,
    dns_timeout: Duration,
}

impl AddressResolver {
    /// Resolver backed by the system DNS.
    pub fn new(dns_timeout: Duration) -> Self {
        Self::with_lookup(Arc::new(SystemLookup), dns_timeout)
    }

    pub fn with_lookup(lookup: Arc<dyn HostLookup>, dns_timeout: Duration) -> Self {
        Self { lookup, dns_timeout }
    }

    /// Convert a multiaddr into a `host:port` target.
    pub async fn resolve(&self, addr: &Multiaddr) -> ResolveResult<ResolvedAddress> {
        let port = tcp_port(addr);

        let host = match dns_segment(addr) {
            Some((name, family)) => self.resolve_dns(&name, family, port.unwrap_or(0)).await?,
            None => ip_from_multiaddr(addr).ok_or_else(|| ResolveError::MissingIp(addr.to_string()))?,
        };

        let port = port.ok_or_else(|| ResolveError::MissingPort(addr.to_string()))?;
        Ok(ResolvedAddress { host, port })
    }

    async fn resolve_dns(&self, name: &str, family: DnsFamily, port: u16) -> ResolveResult<String> {
        let answers = timeout(self.dns_timeout, self.lookup.lookup(name, port))
            .await
            .map_err(|_| ResolveError::DnsTimeout {
                host: name.to_string(),
                timeout_ms: self.dns_timeout.as_millis(),
            })?
            .map_err(|source| ResolveError::Dns {
                host: name.to_string(),
                source,
            })?;

        let candidates: Vec<Multiaddr> = answers
            .into_iter()
            .filter(|sa| family.accepts(&sa.ip()))
            .map(|sa| {
                let mut candidate = Multiaddr::empty();
                match sa.ip() {
                    IpAddr::V4(ip) => candidate.push(Protocol::Ip4(ip)),
                    IpAddr::V6(ip) => candidate.push(Protocol::Ip6(ip)),
                }
                candidate.push(Protocol::Tcp(sa.port()));
                candidate
            })
            .collect();

        tracing::debug!(host = %name, candidates = candidates.len(), "DNS lookup finished");

        candidates
            .iter()
            .find_map(ip_from_multiaddr)
            .ok_or_else(|| ResolveError::NoCandidates { host: name.to_string() })
    }
}

impl fmt::Debug for AddressResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressResolver")
            .field("dns_timeout", &self.dns_timeout)
            .finish()
    }
}

fn dns_segment(addr: &Multiaddr) -> Option<(String, DnsFamily)> {
    addr.iter().find_map(|proto| match proto {
        Protocol::Dns(name) => Some((name.into_owned(), DnsFamily::Any)),
        Protocol::Dns4(name) => Some((name.into_owned(), DnsFamily::V4)),
        Protocol::Dns6(name) => Some((name.into_owned(), DnsFamily::V6)),
        _ => None,
    })
}

/// IPv4 wins over IPv6 when both appear.
fn ip_from_multiaddr(addr: &Multiaddr) -> Option<String> {
    let ip4 = addr.iter().find_map(|proto| match proto {
        Protocol::Ip4(ip) => Some(ip.to_string()),
        _ => None,
    });
    ip4.or_else(|| {
        addr.iter().find_map(|proto| match proto {
            Protocol::Ip6(ip) => Some(format!("[{}]", ip)),
            _ => None,
        })
    })
}

fn tcp_port(addr: &Multiaddr) -> Option<u16> {
    addr.iter().find_map(|proto| match proto {
        Protocol::Tcp(port) => Some(port),
        _ => None,
    })
}
