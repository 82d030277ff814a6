//! Per-packet decision engine.
//!
//! `handle` answers DISCOVER with OFFER and REQUEST with ACK. Every other
//! message, and every failure along the way, yields no reply.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use super::lease::{validate_requested_address, LeasePolicy};
use super::netconf::{NetworkConfiguration, NETWORK_CONFIGURATION_KEY};
use super::options::ReplyOptions;
use super::pxe::PxeOptionBuilder;
use crate::domain::{
    ipv4_from_slice, DhcpMessageType, IncomingPacket, Lease, Machine, OptionCode,
    ReplyOption, ReplyPacket,
};
use crate::error::{ConfigError, DropReason};
use crate::registry::Registry;

/// A DNS label holds 63 bytes; the hex MAC and the dot take 13 of them.
pub const MAX_CLUSTER_NAME_LEN: usize = 50;

const PXE_VENDOR_CLASS: &[u8] = b"PXEClient";

/// Stateless DHCP responder. Safe to share across threads.
pub struct ProtocolHandler {
    server_ip: Ipv4Addr,
    registry: Arc<dyn Registry>,
    lease_policy: LeasePolicy,
    pxe: PxeOptionBuilder,
}

impl ProtocolHandler {
    pub fn new(
        server_ip: Ipv4Addr,
        registry: Arc<dyn Registry>,
        lease_policy: LeasePolicy,
        boot_message: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let cluster_name = registry.cluster_name();
        if cluster_name.len() > MAX_CLUSTER_NAME_LEN {
            warn!(
                cluster_name = %cluster_name,
                "Cluster name is longer than {} bytes; hostnames may break DHCP clients",
                MAX_CLUSTER_NAME_LEN
            );
        }

        Ok(Self {
            server_ip,
            registry,
            lease_policy,
            pxe: PxeOptionBuilder::new(server_ip, boot_message)?,
        })
    }

    pub fn server_ip(&self) -> Ipv4Addr {
        self.server_ip
    }

    /// Decide the reply for one datagram. `None` means stay silent.
    pub fn handle(
        &self,
        packet: &IncomingPacket,
        message_type: DhcpMessageType,
    ) -> Option<ReplyPacket> {
        match message_type {
            DhcpMessageType::Discover | DhcpMessageType::Request => {
                match self.respond(packet, message_type) {
                    Ok(reply) => Some(reply),
                    Err(reason) => {
                        log_drop(packet, message_type, &reason);
                        None
                    }
                }
            }
            DhcpMessageType::Release | DhcpMessageType::Decline => {
                debug!(mac = %packet.chaddr, "dhcp {} acknowledged, no reply", message_type);
                None
            }
            _ => None,
        }
    }

    fn respond(
        &self,
        packet: &IncomingPacket,
        message_type: DhcpMessageType,
    ) -> Result<ReplyPacket, DropReason> {
        if let Some(server) = packet.option(OptionCode::ServerIdentifier) {
            if ipv4_from_slice(server) != Some(self.server_ip) {
                let foreign = ipv4_from_slice(server).unwrap_or(Ipv4Addr::UNSPECIFIED);
                return Err(DropReason::ForeignServer(foreign));
            }
        }

        let mac = packet.chaddr;
        let machine = self
            .registry
            .machine(mac)
            .map_err(|source| DropReason::UnresolvableClient { mac, source })?;

        let raw = self
            .registry
            .variable(mac, NETWORK_CONFIGURATION_KEY)
            .map_err(DropReason::RegistryUnavailable)?;
        let net_conf = NetworkConfiguration::parse(&raw)
            .map_err(|source| DropReason::MalformedConfiguration { raw, source })?;

        let instances = self
            .registry
            .instances()
            .map_err(DropReason::RegistryUnavailable)?;

        let base = self.base_options(&machine, &net_conf, &instances);

        let response_type = match message_type {
            DhcpMessageType::Request => {
                self.confirm_request(packet, &machine)?;
                self.registry.check_in(mac);
                DhcpMessageType::Ack
            }
            _ => DhcpMessageType::Offer,
        };

        let pxe_uuid = packet.client_uuid();
        debug!(
            mac = %mac,
            assigned = %machine.ip,
            is_pxe = pxe_uuid.is_some(),
            "dhcp {}",
            message_type
        );

        let mut options = base.select_order_or_all(packet.parameter_request_list());
        if let Some(uuid) = pxe_uuid {
            options.extend(self.pxe_options(uuid));
        }

        Ok(ReplyPacket {
            message_type: response_type,
            xid: packet.xid,
            flags: packet.flags,
            giaddr: packet.giaddr,
            chaddr: mac,
            server_ip: self.server_ip,
            lease: Lease {
                ip: machine.ip,
                duration: self.lease_policy.next_lease_duration(),
            },
            options,
        })
    }

    fn base_options(
        &self,
        machine: &Machine,
        net_conf: &NetworkConfiguration,
        instances: &[Ipv4Addr],
    ) -> ReplyOptions {
        let hostname = machine.hostname(&self.registry.cluster_name());

        let mut options = ReplyOptions::new();
        options.insert(OptionCode::SubnetMask, net_conf.netmask.octets());
        // RFC 2132 §3.8: at least one address.
        if !instances.is_empty() {
            options.insert(OptionCode::DomainNameServer, dns_servers_option(instances));
        }
        options.insert(OptionCode::HostName, hostname.into_bytes());
        if let Some(router) = net_conf.router {
            options.insert(OptionCode::Router, router.octets());
        }
        if let Some(routes) = net_conf.classless_routes_option() {
            options.insert(OptionCode::ClasslessStaticRoute, routes);
        }
        options
    }

    fn confirm_request(&self, packet: &IncomingPacket, machine: &Machine) -> Result<(), DropReason> {
        let requested = packet.requested_address();
        if validate_requested_address(&requested, machine.ip) {
            return Ok(());
        }
        match ipv4_from_slice(&requested) {
            Some(ip) if !ip.is_unspecified() => Err(DropReason::AddressMismatch {
                requested: ip,
                assigned: machine.ip,
            }),
            _ => Err(DropReason::BadRequestedAddress(requested)),
        }
    }

    /// Vendor class, echoed client identifier (minus its type byte), PXE menu.
    fn pxe_options(&self, uuid: &[u8]) -> [ReplyOption; 3] {
        [
            ReplyOption::new(OptionCode::VendorClassIdentifier, PXE_VENDOR_CLASS),
            ReplyOption::new(
                OptionCode::ClientMachineIdentifier,
                uuid.get(1..).unwrap_or_default(),
            ),
            ReplyOption::new(OptionCode::VendorSpecificInformation, self.pxe.build()),
        ]
    }
}

/// Option 6 value: raw addresses back to back (RFC 2132 §3.8).
pub fn dns_servers_option(instances: &[Ipv4Addr]) -> Vec<u8> {
    instances.iter().flat_map(|ip| ip.octets()).collect()
}

fn log_drop(packet: &IncomingPacket, message_type: DhcpMessageType, reason: &DropReason) {
    let mac = packet.chaddr;
    match reason {
        DropReason::ForeignServer(_) if message_type == DhcpMessageType::Discover => {
            debug!(mac = %mac, xid = packet.xid, "server identifier in DISCOVER: {}", reason);
        }
        DropReason::ForeignServer(_) => {
            trace!(mac = %mac, "dhcp {} not for us: {}", message_type, reason);
        }
        DropReason::UnresolvableClient { .. } | DropReason::BadRequestedAddress(_) => {
            debug!(mac = %mac, "dhcp {} dropped: {}", message_type, reason);
        }
        DropReason::AddressMismatch { .. } => {
            warn!(mac = %mac, "dhcp {} dropped: {}", message_type, reason);
        }
        DropReason::RegistryUnavailable(_) | DropReason::MalformedConfiguration { .. } => {
            info!(mac = %mac, "dhcp {} dropped: {}", message_type, reason);
        }
    }
}
