use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// SNMP protocol version used for every session of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnmpVersion {
    V1,
    V2c,
}

impl FromStr for SnmpVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(SnmpVersion::V1),
            "2c" | "v2c" => Ok(SnmpVersion::V2c),
            other => Err(format!("unsupported SNMP version: {other} (expected 1 or 2c)")),
        }
    }
}

impl fmt::Display for SnmpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnmpVersion::V1 => write!(f, "1"),
            SnmpVersion::V2c => write!(f, "2c"),
        }
    }
}

/// Immutable parameters of one scan run.
///
/// Built once by the CLI before scanning starts and passed by reference
/// into every worker; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub version: SnmpVersion,
    pub community: String,
    /// Per-request deadline inside the SNMP client.
    pub timeout: Duration,
    /// Request attempts the SNMP client makes before giving up on a host.
    pub repeats: u32,
    /// Worker pool size. Always at least 1.
    pub concurrency: usize,
    /// When set, failed hosts are reported as `#<addr>;<error>` lines.
    pub verbose: bool,
}

impl ScanConfig {
    pub fn new(
        version: SnmpVersion,
        community: impl Into<String>,
        timeout_secs: u64,
        repeats: u32,
        concurrency: usize,
        verbose: bool,
    ) -> Self {
        Self {
            version,
            community: community.into(),
            timeout: Duration::from_secs(timeout_secs),
            repeats,
            // A pool of zero workers would stall the run forever.
            concurrency: concurrency.max(1),
            verbose,
        }
    }
}
