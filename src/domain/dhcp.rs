//! DHCP packet domain models.
//!
//! These types represent the logical structure of DHCP packets,
//! independent of wire format parsing.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use macaddr::MacAddr6;

use super::OptionCode;

/// Raw option values keyed by option code.
pub type OptionMap = HashMap<u8, Vec<u8>>;

/// DHCP message types as defined in RFC 2131.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhcpMessageType {
    Discover,
    Offer,
    Request,
    Decline,
    Ack,
    Nak,
    Release,
    Inform,
}

impl DhcpMessageType {
    /// Parse from the DHCP option 53 value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Discover),
            2 => Some(Self::Offer),
            3 => Some(Self::Request),
            4 => Some(Self::Decline),
            5 => Some(Self::Ack),
            6 => Some(Self::Nak),
            7 => Some(Self::Release),
            8 => Some(Self::Inform),
            _ => None,
        }
    }

    /// The option 53 value.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Discover => 1,
            Self::Offer => 2,
            Self::Request => 3,
            Self::Decline => 4,
            Self::Ack => 5,
            Self::Nak => 6,
            Self::Release => 7,
            Self::Inform => 8,
        }
    }
}

impl std::fmt::Display for DhcpMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discover => write!(f, "DISCOVER"),
            Self::Offer => write!(f, "OFFER"),
            Self::Request => write!(f, "REQUEST"),
            Self::Decline => write!(f, "DECLINE"),
            Self::Ack => write!(f, "ACK"),
            Self::Nak => write!(f, "NAK"),
            Self::Release => write!(f, "RELEASE"),
            Self::Inform => write!(f, "INFORM"),
        }
    }
}

/// A decoded client datagram.
#[derive(Debug, Clone)]
pub struct IncomingPacket {
    /// Operation: 1 = BOOTREQUEST, 2 = BOOTREPLY
    pub op: u8,
    /// Hardware type (1 = Ethernet)
    pub htype: u8,
    /// Hardware address length
    pub hlen: u8,
    /// Transaction ID
    pub xid: u32,
    /// Seconds elapsed
    pub secs: u16,
    /// Flags (bit 15 = broadcast)
    pub flags: u16,
    /// Client IP address (if already bound)
    pub ciaddr: Ipv4Addr,
    /// Relay agent IP address
    pub giaddr: Ipv4Addr,
    /// Client hardware address (MAC)
    pub chaddr: MacAddr6,
    /// DHCP options, duplicate codes concatenated per RFC 3396
    pub options: OptionMap,
}

impl IncomingPacket {
    /// Returns true if this is a client request (BOOTREQUEST).
    pub fn is_request(&self) -> bool {
        self.op == 1
    }

    /// Returns true if the client asked for broadcast replies.
    pub fn wants_broadcast(&self) -> bool {
        self.flags & 0x8000 != 0
    }

    /// Raw value of an option, if present.
    pub fn option(&self, code: OptionCode) -> Option<&[u8]> {
        self.options.get(&code.as_u8()).map(Vec::as_slice)
    }

    /// Get the DHCP message type from option 53.
    pub fn message_type(&self) -> Option<DhcpMessageType> {
        self.option(OptionCode::MessageType)
            .and_then(|v| v.first().copied())
            .and_then(DhcpMessageType::from_u8)
    }

    /// Server identifier (option 54), when it is a well-formed address.
    pub fn server_identifier(&self) -> Option<Ipv4Addr> {
        self.option(OptionCode::ServerIdentifier).and_then(ipv4_from_slice)
    }

    /// The address the client asks for: option 50 if present, else `ciaddr`.
    ///
    /// Returned as raw bytes because a malformed option 50 must still be
    /// seen (and rejected) by the caller.
    pub fn requested_address(&self) -> Vec<u8> {
        match self.option(OptionCode::RequestedIpAddress) {
            Some(raw) => raw.to_vec(),
            None => self.ciaddr.octets().to_vec(),
        }
    }

    /// Parameter request list (option 55).
    pub fn parameter_request_list(&self) -> Option<&[u8]> {
        self.option(OptionCode::ParameterRequestList)
    }

    /// Client machine identifier (option 97), present on PXE clients.
    pub fn client_uuid(&self) -> Option<&[u8]> {
        self.option(OptionCode::ClientMachineIdentifier)
    }
}

/// Interpret exactly four bytes as an IPv4 address.
pub fn ipv4_from_slice(bytes: &[u8]) -> Option<Ipv4Addr> {
    let octets: [u8; 4] = bytes.try_into().ok()?;
    Some(Ipv4Addr::from(octets))
}
