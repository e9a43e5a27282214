//! Result model and the output seam of the scan engine.

use std::net::Ipv4Addr;

/// What probing one address produced. Exactly one of these exists per
/// dispatched address, whatever happened on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The host answered; carries the rendered value.
    Success(String),
    /// The probe failed and the run is verbose; carries the error text.
    Failure(String),
    /// The probe failed and failures are not being reported.
    Suppressed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub addr: Ipv4Addr,
    pub outcome: Outcome,
}

impl ScanResult {
    /// Renders the result as its single output line, or `None` when the
    /// result is suppressed. Line breaks inside agent-supplied values are
    /// flattened so one host never spans two lines.
    pub fn render(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Success(value) => Some(flatten(&format!("{};{}", self.addr, value))),
            Outcome::Failure(message) => Some(flatten(&format!("#{};{}", self.addr, message))),
            Outcome::Suppressed => None,
        }
    }
}

fn flatten(line: &str) -> String {
    line.replace('\n', " ").replace('\r', "")
}

/// Where rendered result lines go.
pub trait ReportSink {
    fn report(&mut self, line: &str);
}

/// Production sink: one line per host on stdout, nothing else.
pub struct StdoutSink;

impl ReportSink for StdoutSink {
    fn report(&mut self, line: &str) {
        println!("{line}");
    }
}
