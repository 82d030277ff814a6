use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use blacksmith_dhcp::config::{list_interfaces, Config, DEFAULT_CONFIG_PATH};
use blacksmith_dhcp::registry::{load_reservations, MemoryRegistry};
use blacksmith_dhcp::responder::{LeasePolicy, ProtocolHandler, NETWORK_CONFIGURATION_KEY};
use blacksmith_dhcp::server::{DhcpListener, ListenerConfig};

#[derive(Parser)]
#[command(name = "blacksmith-dhcp")]
#[command(about = "Stateless DHCP and PXE responder for Blacksmith clusters")]
#[command(version)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Network interface to serve on (e.g., eth0)
    #[arg(short, long)]
    interface: Option<String>,

    /// Address announced as server identifier and PXE boot server
    #[arg(long)]
    server_ip: Option<String>,

    /// List available network interfaces and exit
    #[arg(long)]
    list_interfaces: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_interfaces {
        for line in list_interfaces() {
            println!("{}", line);
        }
        return ExitCode::SUCCESS;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = Config::load(&args.config)?;
    if let Some(interface) = &args.interface {
        config.set("interface", interface)?;
    }
    if let Some(server_ip) = &args.server_ip {
        config.set("server_ip", server_ip)?;
    }
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::info!("Starting blacksmith-dhcp {}", config.version);
    tracing::info!("Config path: {:?}", args.config);

    let server_ip = config.resolve_server_ip()?;
    let registry = Arc::new(build_registry(&config, server_ip)?);
    let lease_policy = LeasePolicy::from_clock(config.lease_min_hours, config.lease_max_hours)?;
    let handler = Arc::new(ProtocolHandler::new(
        server_ip,
        registry,
        lease_policy,
        config.boot_message(),
    )?);

    let listener_config = ListenerConfig {
        listen_port: config.listen_port,
        client_port: config.client_port,
        interface: config.interface.clone(),
        ..ListenerConfig::default()
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(async move {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        ctrlc::set_handler(move || {
            tracing::info!("Received interrupt, shutting down");
            let _ = shutdown_tx.send(true);
        })
        .context("Failed to set Ctrl-C handler")?;

        let listener = DhcpListener::bind(listener_config, handler)?;
        listener.run(shutdown_rx).await?;

        tracing::info!("Server stopped");
        Ok::<(), anyhow::Error>(())
    })
}

fn build_registry(config: &Config, server_ip: Ipv4Addr) -> Result<MemoryRegistry> {
    let mut registry = MemoryRegistry::new(config.cluster_name.clone())
        .with_instances(config.dns_servers.clone())
        .with_excluded([server_ip]);

    if let (Some(start), Some(end)) = (config.pool_start, config.pool_end) {
        registry = registry.with_pool(start, end);
    }

    if let Some(path) = &config.reservations {
        let reservations = load_reservations(path)?;
        tracing::info!("Loaded {} reservations from {:?}", reservations.len(), path);
        registry = registry.with_reservations(&reservations);
    }

    if let Some(network) = &config.network_configuration {
        registry.set_cluster_variable(NETWORK_CONFIGURATION_KEY, network.clone());
    } else {
        tracing::warn!("No network_configuration set; every request will be dropped");
    }

    Ok(registry)
}
