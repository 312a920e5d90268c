use std::net::{IpAddr, Ipv4Addr};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
pub(crate) struct Args {
    /// Maximum number of jobs running at once. Must be at least 1.
    #[arg(short = 'n', long, default_value_t = 2)]
    pub(crate) max_parallel: usize,
    /// Address to listen on.
    #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub(crate) listen: IpAddr,
    /// (TCP) port to listen on.
    #[arg(short, long, default_value_t = 8000)]
    pub(crate) port: u16,
    /// Enables human-friendly logging.
    #[arg(short, long, default_value_t)]
    pub(crate) debug: bool,
}
