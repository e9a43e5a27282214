use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use snmpr_common::config::ScanConfig;
use snmpr_common::network::range;
use snmpr_core::report::StdoutSink;
use snmpr_core::scanner;
use snmpr_protocols::snmp::UdpSnmpClient;

/// Runs one scan against `cidr`. An unparseable CIDR aborts here, before
/// anything is dispatched; per-host failures inside the scan never do.
pub async fn scan(cidr: &str, cfg: ScanConfig) -> anyhow::Result<()> {
    let range = range::parse_cidr(cidr).with_context(|| format!("cannot scan '{cidr}'"))?;

    let mut sink = StdoutSink;
    let summary = scanner::run_scan(cfg, range, Arc::new(UdpSnmpClient), &mut sink).await?;

    debug!(
        "done: {} addresses probed, {} reported",
        summary.addresses, summary.reported
    );
    Ok(())
}
