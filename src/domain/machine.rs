//! Machines known to the registry.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use macaddr::MacAddr6;

/// How a machine got its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineType {
    /// Fixed reservation loaded at startup.
    Reserved,
    /// Assigned from the dynamic pool on first contact.
    Dynamic,
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved => write!(f, "reserved"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

impl FromStr for MachineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reserved" => Ok(Self::Reserved),
            "dynamic" => Ok(Self::Dynamic),
            other => Err(other.to_string()),
        }
    }
}

/// A hardware address bound to an IPv4 address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub mac: MacAddr6,
    pub ip: Ipv4Addr,
    pub machine_type: MachineType,
    pub first_seen: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl Machine {
    pub fn new(mac: MacAddr6, ip: Ipv4Addr, machine_type: MachineType) -> Self {
        Self {
            mac,
            ip,
            machine_type,
            first_seen: Utc::now(),
            last_seen: None,
        }
    }

    /// Hostname handed out in option 12: bare lowercase hex MAC plus cluster suffix.
    pub fn hostname(&self, cluster_name: &str) -> String {
        hostname_for(self.mac, cluster_name)
    }
}

/// `aa:bb:cc:dd:ee:ff` in cluster `c` becomes `aabbccddeeff.c`.
pub fn hostname_for(mac: MacAddr6, cluster_name: &str) -> String {
    let mut hostname: String = mac.as_bytes().iter().map(|b| format!("{b:02x}")).collect();
    hostname.push('.');
    hostname.push_str(cluster_name);
    hostname
}
