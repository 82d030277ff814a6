//! Machine and variable registry.
//!
//! The responder only reads from the registry and triggers check-ins; the
//! registry owns assignments and is responsible for their atomicity.

mod memory;
mod reservations;

pub use memory::MemoryRegistry;
pub use reservations::{load_reservations, parse_reservation_line, Reservation};

use std::net::Ipv4Addr;

use macaddr::MacAddr6;

use crate::domain::Machine;
use crate::error::RegistryError;

/// Registry capability injected into the protocol handler.
pub trait Registry: Send + Sync {
    /// Machine bound to `mac`, provisioning one if the registry can.
    fn machine(&self, mac: MacAddr6) -> Result<Machine, RegistryError>;

    /// Variable lookup: the machine's own value first, then the cluster-wide one.
    fn variable(&self, mac: MacAddr6, key: &str) -> Result<String, RegistryError>;

    /// Record that `mac` has just confirmed its address.
    fn check_in(&self, mac: MacAddr6);

    /// Addresses of the service instances, advertised as DNS servers.
    fn instances(&self) -> Result<Vec<Ipv4Addr>, RegistryError>;

    fn cluster_name(&self) -> String;
}
