//! Reply packet encoding.

use crate::domain::{OptionCode, ReplyPacket};

use super::{DHCP_MAGIC_COOKIE, OPTIONS_OFFSET};

/// BOOTP minimum message size.
const MIN_REPLY_SIZE: usize = 300;

const BOOTREPLY: u8 = 2;
const HTYPE_ETHERNET: u8 = 1;
const HLEN_ETHERNET: u8 = 6;

/// Encode a reply as a UDP payload.
///
/// Options go out as 53, 54, 51, then `reply.options` in order, then END.
pub fn encode_reply(reply: &ReplyPacket) -> Vec<u8> {
    let mut out = vec![0u8; OPTIONS_OFFSET];

    out[0] = BOOTREPLY;
    out[1] = HTYPE_ETHERNET;
    out[2] = HLEN_ETHERNET;
    out[4..8].copy_from_slice(&reply.xid.to_be_bytes());
    out[10..12].copy_from_slice(&reply.flags.to_be_bytes());
    // ciaddr stays zero
    out[16..20].copy_from_slice(&reply.yiaddr().octets());
    out[20..24].copy_from_slice(&reply.server_ip.octets());
    out[24..28].copy_from_slice(&reply.giaddr.octets());
    out[28..34].copy_from_slice(reply.chaddr.as_bytes());
    out[236..OPTIONS_OFFSET].copy_from_slice(&DHCP_MAGIC_COOKIE);

    push_option(
        &mut out,
        OptionCode::MessageType,
        &[reply.message_type.as_u8()],
    );
    push_option(&mut out, OptionCode::ServerIdentifier, &reply.server_ip.octets());
    push_option(
        &mut out,
        OptionCode::IpAddressLeaseTime,
        &reply.lease.seconds().to_be_bytes(),
    );
    for option in &reply.options {
        push_option(&mut out, option.code, &option.value);
    }
    out.push(OptionCode::End.as_u8());

    if out.len() < MIN_REPLY_SIZE {
        out.resize(MIN_REPLY_SIZE, OptionCode::PAD);
    }
    out
}

/// Append one option, splitting values over 255 bytes into consecutive
/// instances of the same code (RFC 3396).
fn push_option(out: &mut Vec<u8>, code: OptionCode, value: &[u8]) {
    if value.is_empty() {
        out.extend_from_slice(&[code.as_u8(), 0]);
        return;
    }
    for chunk in value.chunks(u8::MAX as usize) {
        out.push(code.as_u8());
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use std::time::Duration;

    use macaddr::MacAddr6;

    use super::*;
    use crate::domain::{DhcpMessageType, Lease, ReplyOption};
    use crate::wire::DhcpParser;

    fn reply(options: Vec<ReplyOption>) -> ReplyPacket {
        ReplyPacket {
            message_type: DhcpMessageType::Offer,
            xid: 0xdeadbeef,
            flags: 0x8000,
            giaddr: Ipv4Addr::new(10, 1, 0, 1),
            chaddr: MacAddr6::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff),
            server_ip: Ipv4Addr::new(10, 0, 0, 1),
            lease: Lease {
                ip: Ipv4Addr::new(10, 0, 0, 42),
                duration: Duration::from_secs(90_000),
            },
            options,
        }
    }

    #[test]
    fn test_header_fields() {
        let bytes = encode_reply(&reply(vec![]));

        assert_eq!(bytes.len(), MIN_REPLY_SIZE);
        assert_eq!(bytes[0], BOOTREPLY);
        assert_eq!(&bytes[4..8], &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(&bytes[10..12], &[0x80, 0x00]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
        assert_eq!(&bytes[16..20], &[10, 0, 0, 42]);
        assert_eq!(&bytes[20..24], &[10, 0, 0, 1]);
        assert_eq!(&bytes[24..28], &[10, 1, 0, 1]);
        assert_eq!(&bytes[28..34], &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(&bytes[236..240], &DHCP_MAGIC_COOKIE);
    }

    #[test]
    fn test_option_order() {
        let bytes = encode_reply(&reply(vec![
            ReplyOption::new(OptionCode::SubnetMask, vec![255, 255, 255, 0]),
            ReplyOption::new(OptionCode::HostName, b"h.c".to_vec()),
        ]));

        let options = &bytes[OPTIONS_OFFSET..];
        assert_eq!(&options[0..3], &[53, 1, 2]);
        assert_eq!(&options[3..9], &[54, 4, 10, 0, 0, 1]);
        assert_eq!(&options[9..15], &[51, 4, 0x00, 0x01, 0x5f, 0x90]);
        assert_eq!(&options[15..21], &[1, 4, 255, 255, 255, 0]);
        assert_eq!(&options[21..26], &[12, 3, b'h', b'.', b'c']);
        assert_eq!(options[26], 255);
    }

    #[test]
    fn test_long_option_is_split() {
        let value: Vec<u8> = (0..300u16).map(|i| i as u8).collect();
        let bytes = encode_reply(&reply(vec![ReplyOption::new(
            OptionCode::DomainNameServer,
            value.clone(),
        )]));

        let parsed = DhcpParser::new().parse(&bytes).unwrap();
        assert_eq!(parsed.options.get(&6), Some(&value));
    }

    #[test]
    fn test_encoded_reply_parses() {
        let bytes = encode_reply(&reply(vec![ReplyOption::new(
            OptionCode::VendorClassIdentifier,
            b"PXEClient".to_vec(),
        )]));

        let parsed = DhcpParser::new().parse(&bytes).unwrap();
        assert_eq!(parsed.op, BOOTREPLY);
        assert_eq!(parsed.message_type(), Some(DhcpMessageType::Offer));
        assert_eq!(parsed.server_identifier(), Some(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(parsed.options.get(&60), Some(&b"PXEClient".to_vec()));
    }
}
