//! Outgoing reply models.

use std::net::Ipv4Addr;
use std::time::Duration;

use macaddr::MacAddr6;

use super::{DhcpMessageType, OptionCode};

/// One reply option, encoded as `code, len, value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyOption {
    pub code: OptionCode,
    pub value: Vec<u8>,
}

impl ReplyOption {
    pub fn new(code: OptionCode, value: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }
}

/// An address handed out for a bounded time. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    pub ip: Ipv4Addr,
    pub duration: Duration,
}

impl Lease {
    /// Lease time as carried in option 51, saturating at `u32::MAX` (infinite).
    pub fn seconds(&self) -> u32 {
        u32::try_from(self.duration.as_secs()).unwrap_or(u32::MAX)
    }
}

/// An OFFER or ACK ready to be encoded by the socket layer.
#[derive(Debug, Clone)]
pub struct ReplyPacket {
    pub message_type: DhcpMessageType,
    pub xid: u32,
    pub flags: u16,
    pub giaddr: Ipv4Addr,
    pub chaddr: MacAddr6,
    /// This server's address, sent as `siaddr` and option 54.
    pub server_ip: Ipv4Addr,
    pub lease: Lease,
    pub options: Vec<ReplyOption>,
}

impl ReplyPacket {
    /// The assigned address (`yiaddr`).
    pub fn yiaddr(&self) -> Ipv4Addr {
        self.lease.ip
    }

    pub fn option(&self, code: OptionCode) -> Option<&[u8]> {
        self.options
            .iter()
            .find(|opt| opt.code == code)
            .map(|opt| opt.value.as_slice())
    }

    /// Option codes in wire order.
    pub fn option_codes(&self) -> Vec<OptionCode> {
        self.options.iter().map(|opt| opt.code).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_seconds() {
        let lease = Lease {
            ip: Ipv4Addr::new(10, 0, 0, 2),
            duration: Duration::from_secs(24 * 3600),
        };
        assert_eq!(lease.seconds(), 86_400);
    }

    #[test]
    fn test_lease_seconds_saturates() {
        let lease = Lease {
            ip: Ipv4Addr::new(10, 0, 0, 2),
            duration: Duration::from_secs(u64::from(u32::MAX) + 10),
        };
        assert_eq!(lease.seconds(), u32::MAX);
    }

    #[test]
    fn test_option_lookup() {
        let reply = ReplyPacket {
            message_type: DhcpMessageType::Offer,
            xid: 1,
            flags: 0,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: MacAddr6::nil(),
            server_ip: Ipv4Addr::new(10, 0, 0, 1),
            lease: Lease {
                ip: Ipv4Addr::new(10, 0, 0, 2),
                duration: Duration::from_secs(60),
            },
            options: vec![
                ReplyOption::new(OptionCode::SubnetMask, vec![255, 255, 255, 0]),
                ReplyOption::new(OptionCode::HostName, b"host".to_vec()),
            ],
        };
        assert_eq!(reply.yiaddr(), Ipv4Addr::new(10, 0, 0, 2));
        assert_eq!(reply.option(OptionCode::HostName), Some(&b"host"[..]));
        assert_eq!(reply.option(OptionCode::Router), None);
        assert_eq!(
            reply.option_codes(),
            vec![OptionCode::SubnetMask, OptionCode::HostName]
        );
    }
}
