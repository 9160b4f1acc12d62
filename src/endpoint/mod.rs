//! Endpoint subsystem.
//!
//! # Data Flow
//! ```text
//! "<token>:/dns4/lotus.local/tcp/1234/http"
//!     → descriptor.rs (split token, parse multiaddr, drop /http segment)
//!     → resolver.rs (DNS expansion, literal IP + port extraction)
//!     → "192.168.1.20:1234"
//! ```

pub mod descriptor;
pub mod resolver;
pub mod types;

pub use descriptor::EndpointDescriptor;
pub use resolver::{AddressResolver, HostLookup, ResolvedAddress, SystemLookup};
pub use types::{EndpointError, ResolveError, ResolveResult};
