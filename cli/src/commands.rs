pub mod snmp;

use clap::{Parser, Subcommand};
use snmpr_common::config::SnmpVersion;

#[derive(Parser)]
#[command(name = "snmpr")]
#[command(about = "A concurrent SNMP network discovery scanner.")]
#[command(version)]
pub struct CommandLine {
    /// Number of concurrent scan workers
    #[arg(long, global = true, default_value_t = 100)]
    pub concurrency: usize,

    /// Also print per-host errors, prefixed with '#'
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a network over SNMP
    #[command(alias = "s")]
    Snmp {
        /// SNMP version: 1 or 2c
        #[arg(long, visible_alias = "sv", default_value = "2c")]
        snmpversion: SnmpVersion,

        /// Community string
        #[arg(short, long, default_value = "public")]
        community: String,

        /// Per-request timeout in seconds
        #[arg(short, long, default_value_t = 1)]
        timeout: u64,

        /// Request attempts per host
        #[arg(short, long, default_value_t = 2)]
        repeats: u32,

        /// Target network in CIDR notation, e.g. 10.0.0.0/24
        cidr: String,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
