//! Domain models for the DHCP responder.
//!
//! These types carry no socket or registry concerns.

mod dhcp;
mod machine;
mod option_code;
mod reply;

pub use dhcp::{ipv4_from_slice, DhcpMessageType, IncomingPacket, OptionMap};
pub use machine::{hostname_for, Machine, MachineType};
pub use option_code::OptionCode;
pub use reply::{Lease, ReplyOption, ReplyPacket};
