//! Network front end: the UDP socket and its receive loop.

mod listener;

pub use listener::{reply_destination, DhcpListener, ListenerConfig};
