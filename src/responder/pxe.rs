//! PXE vendor options (option 43 payload).
//!
//! The payload points PXE ROMs straight at this server: multicast and
//! broadcast boot server discovery are disabled, a single boot server and
//! a one-entry menu are advertised, and the prompt times out after two
//! seconds.

use std::net::Ipv4Addr;

use crate::error::ConfigError;

/// PXE sub-option codes (PXE 2.1 specification, table 2-1).
mod sub_option {
    pub const DISCOVERY_CONTROL: u8 = 6;
    pub const BOOT_SERVERS: u8 = 8;
    pub const BOOT_MENU: u8 = 9;
    pub const MENU_PROMPT: u8 = 10;
    pub const END: u8 = 255;
}

/// Bit 0 disables broadcast discovery, bit 1 disables multicast discovery.
const DISCOVERY_DISABLE_BROADCAST_AND_MULTICAST: u8 = 3;
/// Boot server type 0x8000: any vendor-specific server.
const BOOT_SERVER_TYPE: [u8; 2] = [0x80, 0x00];
const BOOT_MENU_ITEM_ID: u8 = 9;
const MENU_PROMPT_TIMEOUT_SECS: u8 = 2;

/// Longest boot message whose menu entry still fits a one-byte length.
pub const MAX_BOOT_MESSAGE_LEN: usize = u8::MAX as usize - 3;

/// Builds the vendor-specific-information value sent to PXE clients.
#[derive(Debug, Clone)]
pub struct PxeOptionBuilder {
    server_ip: Ipv4Addr,
    boot_message: String,
}

impl PxeOptionBuilder {
    pub fn new(server_ip: Ipv4Addr, boot_message: impl Into<String>) -> Result<Self, ConfigError> {
        let boot_message = boot_message.into();
        if boot_message.len() > MAX_BOOT_MESSAGE_LEN {
            return Err(ConfigError::BootMessageTooLong(boot_message.len()));
        }
        Ok(Self {
            server_ip,
            boot_message,
        })
    }

    /// The complete option 43 value, terminated by sub-option 255.
    pub fn build(&self) -> Vec<u8> {
        let message = self.boot_message.as_bytes();
        let mut pxe = Vec::with_capacity(20 + 2 * message.len());

        pxe.extend_from_slice(&[
            sub_option::DISCOVERY_CONTROL,
            1,
            DISCOVERY_DISABLE_BROADCAST_AND_MULTICAST,
        ]);

        pxe.extend_from_slice(&[sub_option::BOOT_SERVERS, 7]);
        pxe.extend_from_slice(&BOOT_SERVER_TYPE);
        pxe.push(1);
        pxe.extend_from_slice(&self.server_ip.octets());

        pxe.extend_from_slice(&[sub_option::BOOT_MENU, (3 + message.len()) as u8]);
        pxe.extend_from_slice(&BOOT_SERVER_TYPE);
        pxe.push(BOOT_MENU_ITEM_ID);
        pxe.extend_from_slice(message);

        pxe.extend_from_slice(&[
            sub_option::MENU_PROMPT,
            (1 + message.len()) as u8,
            MENU_PROMPT_TIMEOUT_SECS,
        ]);
        pxe.extend_from_slice(message);

        pxe.push(sub_option::END);
        pxe
    }
}
