mod commands;
mod terminal;

use commands::{CommandLine, Commands, snmp};
use snmpr_common::config::ScanConfig;
use terminal::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init();

    match commands.command {
        Commands::Snmp {
            snmpversion,
            community,
            timeout,
            repeats,
            cidr,
        } => {
            let cfg = ScanConfig::new(
                snmpversion,
                community,
                timeout,
                repeats,
                commands.concurrency,
                commands.verbose,
            );
            snmp::scan(&cidr, cfg).await
        }
    }
}
