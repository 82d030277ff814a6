//! DHCP wire format.
//!
//! Decodes client datagrams into domain types and encodes replies.

mod encoder;
mod parser;

pub use encoder::encode_reply;
pub use parser::DhcpParser;

/// DHCP magic cookie: 0x63825363
const DHCP_MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

/// Options start right after the magic cookie.
const OPTIONS_OFFSET: usize = 240;
