//! `<token>:<multiaddr>` endpoint descriptors.

use multiaddr::{Multiaddr, Protocol};
use std::fmt;
use std::str::FromStr;

use crate::endpoint::types::EndpointError;

/// Parsed connection credentials for a node API.
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointDescriptor {
    token: String,
    address: Multiaddr,
}

impl EndpointDescriptor {
    /// Bearer token presented to the node.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Self-describing address of the node.
    pub fn address(&self) -> &Multiaddr {
        &self.address
    }
}

impl FromStr for EndpointDescriptor {
    type Err = EndpointError;

    /// Only the first colon separates token from address; IPv6 literals in
    /// the address keep their own colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (token, raw_address) = s.trim().split_once(':').ok_or(EndpointError::MissingSeparator)?;
        if token.is_empty() {
            return Err(EndpointError::EmptyToken);
        }

        let raw_address = raw_address.trim();
        if raw_address.is_empty() {
            return Err(EndpointError::EmptyAddress);
        }
        let parsed = Multiaddr::from_str(raw_address).map_err(|source| EndpointError::InvalidAddress {
            address: raw_address.to_string(),
            source,
        })?;

        // `/http` is a transport hint some nodes advertise; the dialer picks the scheme.
        let address: Multiaddr = parsed.iter().filter(|proto| !matches!(proto, Protocol::Http)).collect();
        if address.is_empty() {
            return Err(EndpointError::EmptyAddress);
        }

        Ok(Self {
            token: token.to_string(),
            address,
        })
    }
}

/// Includes the token. Never log this.
impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.token, self.address)
    }
}

impl fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("token", &"<redacted>")
            .field("address", &self.address.to_string())
            .finish()
    }
}
