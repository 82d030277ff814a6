//! Per-cluster network configuration.
//!
//! The registry stores the configuration as a JSON document under the
//! [`NETWORK_CONFIGURATION_KEY`] variable:
//!
//! ```json
//! {
//!   "netmask": "255.255.255.0",
//!   "router": "10.0.0.1",
//!   "classlessRouteOption": [
//!     { "destination": "10.8.0.0/16", "router": "10.0.0.254" }
//!   ]
//! }
//! ```
//!
//! It is parsed fresh for every packet.

use std::net::Ipv4Addr;

use serde::Deserialize;

use crate::error::NetworkConfigError;

/// Registry variable holding the network configuration.
pub const NETWORK_CONFIGURATION_KEY: &str = "net-conf";

/// Subnet mask, default router and extra routes handed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfiguration {
    pub netmask: Ipv4Addr,
    #[serde(default)]
    pub router: Option<Ipv4Addr>,
    #[serde(default)]
    pub classless_route_option: Vec<ClasslessRoute>,
}

impl NetworkConfiguration {
    pub fn parse(raw: &str) -> Result<Self, NetworkConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Option 121 value, or `None` when no routes are configured.
    pub fn classless_routes_option(&self) -> Option<Vec<u8>> {
        if self.classless_route_option.is_empty() {
            return None;
        }
        Some(encode_routes(&self.classless_route_option))
    }
}

/// One RFC 3442 route: destination prefix and the gateway that reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RouteDocument")]
pub struct ClasslessRoute {
    prefix_len: u8,
    destination: Ipv4Addr,
    gateway: Ipv4Addr,
}

#[derive(Deserialize)]
struct RouteDocument {
    destination: String,
    router: Ipv4Addr,
}

impl TryFrom<RouteDocument> for ClasslessRoute {
    type Error = NetworkConfigError;

    fn try_from(doc: RouteDocument) -> Result<Self, Self::Error> {
        let (addr, len) = doc
            .destination
            .split_once('/')
            .ok_or_else(|| NetworkConfigError::InvalidDestination(doc.destination.clone()))?;
        let destination: Ipv4Addr = addr
            .parse()
            .map_err(|_| NetworkConfigError::InvalidDestination(doc.destination.clone()))?;
        let prefix_len: u8 = len
            .parse()
            .map_err(|_| NetworkConfigError::InvalidDestination(doc.destination.clone()))?;
        ClasslessRoute::new(destination, prefix_len, doc.router)
    }
}

impl ClasslessRoute {
    /// Host bits of `destination` beyond the prefix are cleared.
    pub fn new(
        destination: Ipv4Addr,
        prefix_len: u8,
        gateway: Ipv4Addr,
    ) -> Result<Self, NetworkConfigError> {
        if prefix_len > 32 {
            return Err(NetworkConfigError::PrefixTooLong(prefix_len));
        }
        let mask = u32::MAX.checked_shl(32 - u32::from(prefix_len)).unwrap_or(0);
        Ok(Self {
            prefix_len,
            destination: Ipv4Addr::from(u32::from(destination) & mask),
            gateway,
        })
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn destination(&self) -> Ipv4Addr {
        self.destination
    }

    pub fn gateway(&self) -> Ipv4Addr {
        self.gateway
    }

    /// Number of destination octets carried on the wire.
    fn significant_octets(prefix_len: u8) -> usize {
        (usize::from(prefix_len) + 7) / 8
    }

    /// Prefix length, significant destination octets, then the gateway.
    pub fn to_bytes(&self) -> Vec<u8> {
        let width = Self::significant_octets(self.prefix_len);
        let mut out = Vec::with_capacity(1 + width + 4);
        out.push(self.prefix_len);
        out.extend_from_slice(&self.destination.octets()[..width]);
        out.extend_from_slice(&self.gateway.octets());
        out
    }
}

/// Concatenate routes in configured order.
pub fn encode_routes(routes: &[ClasslessRoute]) -> Vec<u8> {
    routes.iter().flat_map(ClasslessRoute::to_bytes).collect()
}

/// Decode an option 121 value.
pub fn decode_routes(mut data: &[u8]) -> Result<Vec<ClasslessRoute>, NetworkConfigError> {
    let total = data.len();
    let mut routes = Vec::new();

    while let Some((&prefix_len, rest)) = data.split_first() {
        if prefix_len > 32 {
            return Err(NetworkConfigError::PrefixTooLong(prefix_len));
        }
        let width = ClasslessRoute::significant_octets(prefix_len);
        if rest.len() < width + 4 {
            return Err(NetworkConfigError::Truncated(total - data.len()));
        }

        let mut destination = [0u8; 4];
        destination[..width].copy_from_slice(&rest[..width]);
        let gateway = [rest[width], rest[width + 1], rest[width + 2], rest[width + 3]];

        routes.push(ClasslessRoute::new(
            Ipv4Addr::from(destination),
            prefix_len,
            Ipv4Addr::from(gateway),
        )?);
        data = &rest[width + 4..];
    }

    Ok(routes)
}
