// Copyright 2025 the muxssh developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;

use muxssh::{
    cli::{Cli, Commands},
    config::Config,
    error::Error,
    node::Node,
    remote::RemoteExecutor,
    utils::init_logging,
};

/// Resolve a host argument: a `hosts:` alias when one matches, otherwise a
/// `[user@]host[:port]` literal.
fn resolve_node(config: &Config, host: &str) -> Result<Node> {
    if let Some(host_config) = config.host(host) {
        return Ok(Node::from_config(host, host_config));
    }
    Node::parse(host).with_context(|| format!("Invalid host specification: {host}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load(&cli.config).await?;

    match cli.command {
        Commands::Exec { host, command } => {
            let node = resolve_node(&config, &host)?;
            let executor = RemoteExecutor::new(node, &config.ssh)?;

            match executor.run_command(&command).await {
                Ok(result) => {
                    std::io::stdout().write_all(&result.output)?;
                }
                Err(Error::RemoteCommand {
                    exit_code, output, ..
                }) => {
                    // Surface what the remote side printed, then mirror its
                    // exit code so schedulers see the real failure.
                    std::io::stdout().write_all(&output)?;
                    eprintln!("muxssh: remote command exited with status {exit_code}");
                    std::process::exit(if exit_code > 0 { exit_code } else { 1 });
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Upload {
            host,
            source,
            dest,
            recursive,
        } => {
            let node = resolve_node(&config, &host)?;
            let executor = RemoteExecutor::new(node, &config.ssh)?;
            executor.upload(&source, &dest, recursive).await?;
            tracing::info!("Uploaded {} to {}:{}", source, host, dest);
        }

        Commands::Download {
            host,
            source,
            dest,
            recursive,
        } => {
            let node = resolve_node(&config, &host)?;
            let executor = RemoteExecutor::new(node, &config.ssh)?;
            executor.download(&source, &dest, recursive).await?;
            tracing::info!("Downloaded {}:{} to {}", host, source, dest);
        }

        Commands::Sockets { host } => {
            let node = resolve_node(&config, &host)?;
            let executor = RemoteExecutor::new(node, &config.ssh)?;

            let pool = executor.pool().context(
                "No master_socket_base_path configured; multiplexing is disabled for this host",
            )?;

            println!("{:<50} {:>8} {:>8}", "SOCKET", "OPEN", "SPARE");
            for load in pool.load_report().await {
                let open = match load.open_channels {
                    Some(n) => n.to_string(),
                    None => "probe failed".to_string(),
                };
                println!("{:<50} {:>8} {:>8}", load.socket.to_string(), open, load.spare);
            }
        }
    }

    Ok(())
}
