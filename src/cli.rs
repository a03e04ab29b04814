use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vidfetch")]
#[command(about = "Highest-quality video downloader (web server and terminal)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server and web page
    Server(ServerArgs),
    /// Download one video in the terminal
    Get(GetArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to [default: server.bind_addr]
    #[arg(long)]
    pub address: Option<SocketAddr>,
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Video URL; prompted for when omitted
    pub url: Option<String>,

    /// Directory to save into [default: downloads.root]
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
