//! Stateless DHCP lease and PXE boot responder for Blacksmith clusters.
//!
//! Every reply is derived from the registry: the machine bound to the
//! client MAC, the cluster network configuration and the instance list.
//! The responder itself keeps no lease table.

pub mod config;
pub mod domain;
pub mod error;
pub mod registry;
pub mod responder;
pub mod server;
pub mod wire;

pub use config::Config;
pub use domain::{DhcpMessageType, IncomingPacket, ReplyPacket};
pub use error::{ConfigError, DropReason, ParseError, RegistryError, ServerError};
pub use registry::{MemoryRegistry, Registry};
pub use responder::{LeasePolicy, ProtocolHandler, PxeOptionBuilder};
pub use server::{DhcpListener, ListenerConfig};
