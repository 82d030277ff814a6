//! Error types.
//!
//! Startup problems (`ConfigError`, `ServerError::Bind`) are fatal. Everything
//! that can go wrong while answering a single datagram is a `DropReason`: the
//! packet is logged and left unanswered, and the client retransmits.

use std::net::{Ipv4Addr, SocketAddr};

use macaddr::MacAddr6;
use thiserror::Error;

/// Errors from decoding a DHCP datagram.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("packet too short: expected at least {expected} bytes, got {actual}")]
    PacketTooShort { expected: usize, actual: usize },

    #[error("invalid DHCP magic cookie")]
    InvalidMagicCookie,

    #[error("invalid option at offset {offset}: {message}")]
    InvalidOption { offset: usize, message: String },
}

/// Invalid startup configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("lease bounds must satisfy min < max, got {min}..{max} hours")]
    LeaseBounds { min: u32, max: u32 },

    #[error("boot message is {0} bytes, PXE menu entries allow at most 252")]
    BootMessageTooLong(usize),

    #[error("network interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("interface {0} has no IPv4 address")]
    InterfaceWithoutAddress(String),

    #[error("address pool {start}..={end} contains the server address {server_ip}")]
    PoolContainsServer {
        start: Ipv4Addr,
        end: Ipv4Addr,
        server_ip: Ipv4Addr,
    },
}

/// Failures reported by a [`Registry`](crate::registry::Registry).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no machine known for {0}")]
    UnknownMachine(MacAddr6),

    #[error("address pool exhausted while provisioning {0}")]
    PoolExhausted(MacAddr6),

    #[error("address {ip} is already held by {holder}")]
    AddressInUse { ip: Ipv4Addr, holder: MacAddr6 },

    #[error("variable {0} is not set")]
    VariableNotFound(String),

    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// A stored network configuration that cannot be turned into reply options.
#[derive(Error, Debug)]
pub enum NetworkConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid classless route destination {0:?}")]
    InvalidDestination(String),

    #[error("classless route prefix length {0} exceeds 32")]
    PrefixTooLong(u8),

    #[error("classless route option truncated at byte {0}")]
    Truncated(usize),
}

/// Why a DISCOVER or REQUEST was left unanswered.
#[derive(Error, Debug)]
pub enum DropReason {
    #[error("message addressed to server {0}")]
    ForeignServer(Ipv4Addr),

    #[error("failed to get machine for {mac}: {source}")]
    UnresolvableClient {
        mac: MacAddr6,
        #[source]
        source: RegistryError,
    },

    #[error("registry lookup failed: {0}")]
    RegistryUnavailable(#[source] RegistryError),

    #[error("malformed network configuration {raw:?}: {source}")]
    MalformedConfiguration {
        raw: String,
        #[source]
        source: NetworkConfigError,
    },

    #[error("bad requested address {0:02x?}")]
    BadRequestedAddress(Vec<u8>),

    #[error("requested {requested} != assigned {assigned}")]
    AddressMismatch {
        requested: Ipv4Addr,
        assigned: Ipv4Addr,
    },
}

/// Socket layer failures.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to bind to interface {interface}: {source}")]
    BindToDevice {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}
