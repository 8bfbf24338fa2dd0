use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use geosync::HashAlgorithm;

#[derive(Parser)]
#[command(
    name = "geosync",
    about = "GeoSync: push dataset updates to WebSocket subscribers",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP/WebSocket server
    Serve(ServeArgs),
    /// Print the content hash of a JSON document
    Hash(HashArgs),
    /// Print the canonical form of a JSON document
    Canonical(CanonicalArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Address to listen on (overrides the config file)
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Content hash algorithm (overrides the config file)
    #[arg(long)]
    pub digest: Option<HashAlgorithm>,
}

#[derive(Args)]
pub struct HashArgs {
    /// JSON file to hash; reads stdin if omitted
    pub file: Option<PathBuf>,
    #[arg(long, default_value = "sha256")]
    pub digest: HashAlgorithm,
}

#[derive(Args)]
pub struct CanonicalArgs {
    /// JSON file; reads stdin if omitted
    pub file: Option<PathBuf>,
}
