use std::io::Read;
use std::path::Path;

use anyhow::Context;
use geosync::{canonicalize_document, hash_document, GeoSyncServer, ServerConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::{CanonicalArgs, Cli, Command, HashArgs, ServeArgs};

pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Hash(args) => cmd_hash(args),
        Command::Canonical(args) => cmd_canonical(args),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(digest) = args.digest {
        config.digest = digest;
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async move {
        let server = GeoSyncServer::new(config)?;
        server.serve_with_shutdown(shutdown_signal()).await?;
        Ok::<(), anyhow::Error>(())
    })
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

fn cmd_hash(args: HashArgs) -> anyhow::Result<()> {
    let text = read_input(args.file.as_deref())?;
    let hash = hash_document(&text, args.digest)?;
    println!("{}", hash);
    Ok(())
}

fn cmd_canonical(args: CanonicalArgs) -> anyhow::Result<()> {
    let text = read_input(args.file.as_deref())?;
    println!("{}", canonicalize_document(&text)?);
    Ok(())
}

fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}
