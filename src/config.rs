//! Startup configuration.
//!
//! Read from a `key = value` file, then overridden by `BLACKSMITH_*`
//! environment variables. Command line flags are applied by the binary.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pnet::datalink;

use crate::error::ConfigError;
use crate::responder::lease::{DEFAULT_MAX_LEASE_HOURS, DEFAULT_MIN_LEASE_HOURS};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/blacksmith-dhcp.conf";
const DEFAULT_CLUSTER_NAME: &str = "blacksmith";
const DEFAULT_LISTEN_PORT: u16 = 67;
const DEFAULT_CLIENT_PORT: u16 = 68;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_ip: Option<Ipv4Addr>,
    pub interface: Option<String>,
    pub listen_port: u16,
    pub client_port: u16,
    pub cluster_name: String,
    pub version: String,
    pub boot_message: Option<String>,
    pub lease_min_hours: u32,
    pub lease_max_hours: u32,
    pub network_configuration: Option<String>,
    pub dns_servers: Vec<Ipv4Addr>,
    pub pool_start: Option<Ipv4Addr>,
    pub pool_end: Option<Ipv4Addr>,
    pub reservations: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_ip: None,
            interface: None,
            listen_port: DEFAULT_LISTEN_PORT,
            client_port: DEFAULT_CLIENT_PORT,
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            boot_message: None,
            lease_min_hours: DEFAULT_MIN_LEASE_HOURS,
            lease_max_hours: DEFAULT_MAX_LEASE_HOURS,
            network_configuration: None,
            dns_servers: Vec::new(),
            pool_start: None,
            pool_end: None,
            reservations: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Load from `path` if it exists, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Config::default();

        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            config
                .apply_file(&content)
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        }

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, content: &str) -> Result<(), ConfigError> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                self.set(key.trim(), value.trim())?;
            }
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        for (key, var) in ENV_OVERRIDES {
            if let Ok(value) = std::env::var(var) {
                self.set(key, value.trim())?;
            }
        }
        Ok(())
    }

    /// Set one setting by name. Unknown keys are ignored.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "server_ip" => self.server_ip = Some(parse("server_ip", value)?),
            "interface" => self.interface = non_empty(value),
            "listen_port" => self.listen_port = parse("listen_port", value)?,
            "client_port" => self.client_port = parse("client_port", value)?,
            "cluster_name" => self.cluster_name = value.to_string(),
            "version" => self.version = value.to_string(),
            "boot_message" => self.boot_message = non_empty(value),
            "lease_min_hours" => self.lease_min_hours = parse("lease_min_hours", value)?,
            "lease_max_hours" => self.lease_max_hours = parse("lease_max_hours", value)?,
            "network_configuration" => self.network_configuration = non_empty(value),
            "dns_servers" => {
                self.dns_servers = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| parse("dns_servers", s))
                    .collect::<Result<_, _>>()?;
            }
            "pool_start" => self.pool_start = Some(parse("pool_start", value)?),
            "pool_end" => self.pool_end = Some(parse("pool_end", value)?),
            "reservations" => self.reservations = non_empty(value).map(PathBuf::from),
            "log_filter" => self.log_filter = value.to_string(),
            _ => {}
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lease_min_hours >= self.lease_max_hours {
            return Err(ConfigError::LeaseBounds {
                min: self.lease_min_hours,
                max: self.lease_max_hours,
            });
        }
        match (self.pool_start, self.pool_end) {
            (Some(start), Some(end)) if u32::from(start) > u32::from(end) => {
                Err(ConfigError::InvalidValue {
                    key: "pool_end",
                    value: end.to_string(),
                })
            }
            (Some(start), Some(end)) => match self.server_ip {
                Some(server_ip)
                    if (u32::from(start)..=u32::from(end)).contains(&u32::from(server_ip)) =>
                {
                    Err(ConfigError::PoolContainsServer {
                        start,
                        end,
                        server_ip,
                    })
                }
                _ => Ok(()),
            },
            (Some(_), None) => Err(ConfigError::Missing("pool_end")),
            (None, Some(_)) => Err(ConfigError::Missing("pool_start")),
            _ => Ok(()),
        }
    }

    /// Boot menu text shown by PXE ROMs.
    pub fn boot_message(&self) -> String {
        self.boot_message
            .clone()
            .unwrap_or_else(|| format!("Blacksmith ({})", self.version))
    }

    /// The configured server address, or the first IPv4 address of the interface.
    pub fn resolve_server_ip(&self) -> Result<Ipv4Addr, ConfigError> {
        if let Some(ip) = self.server_ip {
            return Ok(ip);
        }
        let name = self
            .interface
            .as_deref()
            .ok_or(ConfigError::Missing("server_ip"))?;
        interface_ipv4(name)
    }
}

const ENV_OVERRIDES: [(&str, &str); 15] = [
    ("server_ip", "BLACKSMITH_SERVER_IP"),
    ("interface", "BLACKSMITH_INTERFACE"),
    ("listen_port", "BLACKSMITH_LISTEN_PORT"),
    ("client_port", "BLACKSMITH_CLIENT_PORT"),
    ("cluster_name", "BLACKSMITH_CLUSTER_NAME"),
    ("version", "BLACKSMITH_VERSION"),
    ("boot_message", "BLACKSMITH_BOOT_MESSAGE"),
    ("lease_min_hours", "BLACKSMITH_LEASE_MIN_HOURS"),
    ("lease_max_hours", "BLACKSMITH_LEASE_MAX_HOURS"),
    ("network_configuration", "BLACKSMITH_NETWORK_CONFIGURATION"),
    ("dns_servers", "BLACKSMITH_DNS_SERVERS"),
    ("pool_start", "BLACKSMITH_POOL_START"),
    ("pool_end", "BLACKSMITH_POOL_END"),
    ("reservations", "BLACKSMITH_RESERVATIONS"),
    ("log_filter", "BLACKSMITH_LOG_FILTER"),
];

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// First IPv4 address assigned to interface `name`.
pub fn interface_ipv4(name: &str) -> Result<Ipv4Addr, ConfigError> {
    let interface = datalink::interfaces()
        .into_iter()
        .find(|iface| iface.name == name)
        .ok_or_else(|| ConfigError::InterfaceNotFound(name.to_string()))?;

    interface
        .ips
        .iter()
        .find_map(|network| match network.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| ConfigError::InterfaceWithoutAddress(name.to_string()))
}

/// Describe every interface, one line each.
pub fn list_interfaces() -> Vec<String> {
    datalink::interfaces()
        .into_iter()
        .map(|iface| {
            let status = if iface.is_up() { "UP" } else { "DOWN" };
            let ips: Vec<_> = iface.ips.iter().map(|ip| ip.to_string()).collect();
            format!(
                "{}: {} [{}]",
                iface.name,
                status,
                if ips.is_empty() {
                    "no IP".to_string()
                } else {
                    ips.join(", ")
                }
            )
        })
        .collect()
}
