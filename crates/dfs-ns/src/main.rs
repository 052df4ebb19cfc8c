use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dfs_ns::NsContext;
use dfs_ns::server::{run_client_acceptor, run_server_acceptor};
use dfs_proto::config::{self, NsConfig};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(about = "Naming Service: resolves paths to storage servers")]
struct Cli {
    /// Path to a TOML config file (spec §1 replaces the interactive
    /// startup dialog with this plus CLI overrides).
    #[arg(long, default_value = "ns.toml")]
    config: PathBuf,

    #[arg(long)]
    client_port: Option<u16>,

    #[arg(long)]
    server_port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg: NsConfig = config::load(&cli.config)?;
    if let Some(port) = cli.client_port {
        cfg.client_port = port;
    }
    if let Some(port) = cli.server_port {
        cfg.server_port = port;
    }

    let _guard = dfs_proto::logging::init("ns", &cfg.log_dir);

    let client_addr = SocketAddr::new(cfg.ip.into(), cfg.client_port);
    let server_addr = SocketAddr::new(cfg.ip.into(), cfg.server_port);

    let client_listener = TcpListener::bind(client_addr).await?;
    let server_listener = TcpListener::bind(server_addr).await?;

    info!("naming service listening for clients on {client_addr}, servers on {server_addr}");

    let ctx = Arc::new(NsContext::new(cfg));

    let clients = tokio::spawn(run_client_acceptor(ctx.clone(), client_listener));
    let servers = tokio::spawn(run_server_acceptor(ctx, server_listener));

    let _ = tokio::try_join!(clients, servers)?;
    Ok(())
}
