//! Minimal interactive shell over [`dfs_client::Client`], standing in
//! for the out-of-scope CLI `Client/Client.c` implements (spec §1).
//!
//! Commands: `read <path>`, `write <a|o> <path>`, `info <path>`,
//! `list <path>`, `rename <path> <name>`, `exit`.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use dfs_client::Client;
use dfs_proto::RequestFlag;
use dfs_proto::config::{self, ClientConfig};

#[derive(Parser)]
struct Cli {
    #[arg(long, default_value = "client.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg: ClientConfig = config::load(&cli.config)?;
    let client = Client::connect(&cfg).await?;
    println!("connected, client_id={}", client.client_id());

    let stdin = std::io::stdin();
    loop {
        print!("dfs> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or("");
        let rest: Vec<&str> = parts.collect();

        let result = run_command(&client, command, &rest).await;
        if let Err(e) = result {
            eprintln!("error: {e}");
        }
        if command.eq_ignore_ascii_case("exit") {
            break;
        }
    }

    Ok(())
}

async fn run_command(client: &Client, command: &str, args: &[&str]) -> anyhow::Result<()> {
    match command.to_ascii_lowercase().as_str() {
        "read" => {
            let [path] = args else { anyhow::bail!("usage: read <path>") };
            let contents = client.read(path).await?;
            println!("{}", String::from_utf8_lossy(&contents));
        }
        "write" => {
            let [flag, path] = args else { anyhow::bail!("usage: write <a|o> <path>") };
            let flag = match *flag {
                "a" => RequestFlag::Append,
                "o" => RequestFlag::Overwrite,
                _ => anyhow::bail!("flag must be 'a' or 'o'"),
            };
            print!("data> ");
            std::io::stdout().flush()?;
            let mut data = String::new();
            std::io::stdin().lock().read_line(&mut data)?;
            client.write(path, flag, data.as_bytes()).await?;
            println!("wrote {} bytes", data.len());
        }
        "info" => {
            let [path] = args else { anyhow::bail!("usage: info <path>") };
            let info = client.info(path).await?;
            println!("{info:?}");
        }
        "list" => {
            let [path] = args else { anyhow::bail!("usage: list <path>") };
            println!("{}", client.list(path).await?);
        }
        "rename" => {
            let [path, name] = args else { anyhow::bail!("usage: rename <path> <new_name>") };
            println!("{}", client.rename(path, name).await?);
        }
        "exit" => {
            client.close().await?;
        }
        other => anyhow::bail!("unknown command {other:?}"),
    }
    Ok(())
}
