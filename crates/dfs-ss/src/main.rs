use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dfs_proto::config::{self, SsConfig};
use dfs_ss::SsContext;
use dfs_ss::client_server::run_client_acceptor;
use dfs_ss::ns_link::{register, run_reverse_listener};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(about = "Storage Server: exports one subtree of the file system")]
struct Cli {
    /// Path to a TOML config file (spec §1).
    #[arg(long, default_value = "ss.toml")]
    config: PathBuf,

    /// Overrides the configured mount root.
    #[arg(long)]
    root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg: SsConfig = config::load(&cli.config)?;
    if let Some(root) = cli.root {
        cfg.root = root.to_string_lossy().into_owned();
    }

    let _guard = dfs_proto::logging::init("ss", &cfg.log_dir);

    let root = PathBuf::from(&cfg.root);
    let trie = dfs_ss::scan::scan(&root)?;
    info!("scanned mount root {}", root.display());

    let client_listener = TcpListener::bind(SocketAddr::new(cfg.ip.into(), cfg.client_port)).await?;
    let reverse_listener = TcpListener::bind(SocketAddr::new(cfg.ip.into(), cfg.ns_port)).await?;
    let client_port = client_listener.local_addr()?.port();
    let ns_port = reverse_listener.local_addr()?.port();

    let ctx = Arc::new(SsContext::new(cfg, root, trie));

    register(&ctx, client_port, ns_port).await?;

    info!("storage server serving clients on {client_port}, linked to NS on {ns_port}");

    let reverse = tokio::spawn(run_reverse_listener(ctx.clone(), reverse_listener));
    let clients = tokio::spawn(run_client_acceptor(ctx, client_listener));

    let _ = tokio::try_join!(reverse, clients)?;
    Ok(())
}
