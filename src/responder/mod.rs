//! DHCP lease and PXE responder.
//!
//! Given a decoded DISCOVER or REQUEST, resolves the client through the
//! registry and assembles the OFFER or ACK. Nothing here touches sockets.

mod handler;
pub mod lease;
pub mod netconf;
mod options;
pub mod pxe;

pub use handler::{dns_servers_option, ProtocolHandler, MAX_CLUSTER_NAME_LEN};
pub use lease::{validate_requested_address, LeasePolicy};
pub use netconf::{ClasslessRoute, NetworkConfiguration, NETWORK_CONFIGURATION_KEY};
pub use options::ReplyOptions;
pub use pxe::PxeOptionBuilder;
