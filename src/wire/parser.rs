//! DHCP packet parser implementation.
//!
//! Parses raw DHCP packets according to RFC 2131.

use std::net::Ipv4Addr;

use macaddr::MacAddr6;

use crate::domain::{IncomingPacket, OptionCode, OptionMap};
use crate::error::ParseError;

use super::{DHCP_MAGIC_COOKIE, OPTIONS_OFFSET};

/// Minimum BOOTP header size (without cookie and options)
const MIN_DHCP_SIZE: usize = 236;

/// Parser for DHCP packets.
pub struct DhcpParser;

impl DhcpParser {
    /// Create a new DHCP parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse a DHCP packet from raw bytes.
    ///
    /// The input should be the UDP payload (not including IP/UDP headers).
    pub fn parse(&self, data: &[u8]) -> Result<IncomingPacket, ParseError> {
        if data.len() < MIN_DHCP_SIZE {
            return Err(ParseError::PacketTooShort {
                expected: MIN_DHCP_SIZE,
                actual: data.len(),
            });
        }

        let op = data[0];
        let htype = data[1];
        let hlen = data[2];
        // hops at [3]
        let xid = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let secs = u16::from_be_bytes([data[8], data[9]]);
        let flags = u16::from_be_bytes([data[10], data[11]]);

        let ciaddr = Ipv4Addr::new(data[12], data[13], data[14], data[15]);
        let giaddr = Ipv4Addr::new(data[24], data[25], data[26], data[27]);

        // chaddr is 16 bytes at offset 28; Ethernet uses the first 6
        let chaddr = MacAddr6::new(data[28], data[29], data[30], data[31], data[32], data[33]);

        if data.len() < OPTIONS_OFFSET {
            return Err(ParseError::PacketTooShort {
                expected: OPTIONS_OFFSET,
                actual: data.len(),
            });
        }

        if data[MIN_DHCP_SIZE..OPTIONS_OFFSET] != DHCP_MAGIC_COOKIE {
            return Err(ParseError::InvalidMagicCookie);
        }

        let options = self.parse_options(&data[OPTIONS_OFFSET..])?;

        Ok(IncomingPacket {
            op,
            htype,
            hlen,
            xid,
            secs,
            flags,
            ciaddr,
            giaddr,
            chaddr,
            options,
        })
    }

    /// Parse DHCP options from the options section.
    ///
    /// Repeated codes are concatenated in order of appearance (RFC 3396).
    fn parse_options(&self, data: &[u8]) -> Result<OptionMap, ParseError> {
        let mut options = OptionMap::new();
        let mut offset = 0;

        while offset < data.len() {
            let code = data[offset];

            if code == OptionCode::PAD {
                offset += 1;
                continue;
            }

            if code == OptionCode::End.as_u8() {
                break;
            }

            if offset + 1 >= data.len() {
                return Err(ParseError::InvalidOption {
                    offset,
                    message: "option length missing".to_string(),
                });
            }

            let len = data[offset + 1] as usize;

            if offset + 2 + len > data.len() {
                return Err(ParseError::InvalidOption {
                    offset,
                    message: format!(
                        "option data truncated: expected {} bytes, have {}",
                        len,
                        data.len() - offset - 2
                    ),
                });
            }

            options
                .entry(code)
                .or_default()
                .extend_from_slice(&data[offset + 2..offset + 2 + len]);

            offset += 2 + len;
        }

        Ok(options)
    }
}

impl Default for DhcpParser {
    fn default() -> Self {
        Self::new()
    }
}
