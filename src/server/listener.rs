//! UDP listener for DHCP requests.
//!
//! Receives datagrams on the server port, hands each one to the
//! [`ProtocolHandler`] on the blocking pool and transmits whatever reply it
//! produces. A slow registry call delays only its own reply.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, error, info, trace};

use crate::domain::{IncomingPacket, ReplyPacket};
use crate::error::ServerError;
use crate::responder::ProtocolHandler;
use crate::wire::{encode_reply, DhcpParser};

/// Largest datagram accepted.
const MAX_DATAGRAM_SIZE: usize = 1500;

/// Where the listener binds and where replies go.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub bind_ip: Ipv4Addr,
    pub listen_port: u16,
    pub client_port: u16,
    /// Restrict to one interface (`SO_BINDTODEVICE`).
    pub interface: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_ip: Ipv4Addr::UNSPECIFIED,
            listen_port: 67,
            client_port: 68,
            interface: None,
        }
    }
}

pub struct DhcpListener {
    socket: Arc<UdpSocket>,
    handler: Arc<ProtocolHandler>,
    config: ListenerConfig,
}

impl DhcpListener {
    /// Bind the server socket. Must be called inside a tokio runtime.
    pub fn bind(config: ListenerConfig, handler: Arc<ProtocolHandler>) -> Result<Self, ServerError> {
        let addr = SocketAddrV4::new(config.bind_ip, config.listen_port);
        let socket = create_socket(addr, config.interface.as_deref())?;
        Ok(Self {
            socket: Arc::new(socket),
            handler,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.socket.local_addr()?)
    }

    /// Serve until `shutdown` turns true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), ServerError> {
        info!(
            addr = %self.local_addr()?,
            interface = self.config.interface.as_deref().unwrap_or("*"),
            server_ip = %self.handler.server_ip(),
            "DHCP server listening"
        );

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, src)) => self.dispatch(&buf[..len], src),
                        Err(e) => error!(error = %e, "Error receiving packet"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("DHCP server shutting down");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Decode one datagram and answer it on the blocking pool.
    fn dispatch(&self, data: &[u8], src: SocketAddr) {
        let packet = match DhcpParser::new().parse(data) {
            Ok(packet) => packet,
            Err(e) => {
                debug!(error = %e, %src, "Failed to parse DHCP packet");
                return;
            }
        };
        if !packet.is_request() {
            return;
        }
        let Some(message_type) = packet.message_type() else {
            trace!(mac = %packet.chaddr, "BOOTP request without message type ignored");
            return;
        };

        let handler = Arc::clone(&self.handler);
        let socket = Arc::clone(&self.socket);
        let client_port = self.config.client_port;

        tokio::spawn(async move {
            let answer = tokio::task::spawn_blocking(move || {
                let reply = handler.handle(&packet, message_type);
                (packet, reply)
            })
            .await;

            match answer {
                Ok((packet, Some(reply))) => send_reply(&socket, &packet, &reply, client_port).await,
                Ok((_, None)) => {}
                Err(e) => error!(error = %e, "DHCP handler task failed"),
            }
        });
    }
}

async fn send_reply(socket: &UdpSocket, request: &IncomingPacket, reply: &ReplyPacket, client_port: u16) {
    let dest = reply_destination(request, client_port);
    let bytes = encode_reply(reply);
    match socket.send_to(&bytes, dest).await {
        Ok(_) => info!(
            mac = %reply.chaddr,
            ip = %reply.yiaddr(),
            %dest,
            "dhcp {} sent",
            reply.message_type
        ),
        Err(e) => error!(error = %e, %dest, "Failed to send dhcp {}", reply.message_type),
    }
}

/// RFC 2131 §4.1: relay first, then a bound client's own address, else broadcast.
pub fn reply_destination(request: &IncomingPacket, client_port: u16) -> SocketAddr {
    let dest = if !request.giaddr.is_unspecified() {
        SocketAddrV4::new(request.giaddr, 67)
    } else if !request.ciaddr.is_unspecified() && !request.wants_broadcast() {
        SocketAddrV4::new(request.ciaddr, client_port)
    } else {
        SocketAddrV4::new(Ipv4Addr::BROADCAST, client_port)
    };
    SocketAddr::V4(dest)
}

/// Create a UDP socket with broadcast enabled, optionally tied to one interface.
fn create_socket(addr: SocketAddrV4, interface: Option<&str>) -> Result<UdpSocket, ServerError> {
    use socket2::{Domain, Protocol, Socket, Type};

    let bind_err = |source: std::io::Error| ServerError::Bind {
        addr: addr.into(),
        source,
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_err)?;
    socket.set_reuse_address(true).map_err(bind_err)?;
    socket.set_broadcast(true).map_err(bind_err)?;

    if let Some(name) = interface {
        bind_to_device(&socket, name).map_err(|source| ServerError::BindToDevice {
            interface: name.to_string(),
            source,
        })?;
    }

    socket.bind(&addr.into()).map_err(bind_err)?;
    socket.set_nonblocking(true).map_err(bind_err)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(bind_err)
}

#[cfg(target_os = "linux")]
fn bind_to_device(socket: &socket2::Socket, name: &str) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let name = std::ffi::CString::new(name)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let bytes = name.as_bytes_with_nul();
    let result = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            bytes.as_ptr().cast(),
            bytes.len() as libc::socklen_t,
        )
    };
    if result != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn bind_to_device(_socket: &socket2::Socket, name: &str) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("binding to interface {name} is only supported on Linux"),
    ))
}
