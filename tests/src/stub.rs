//! Scripted SNMP collaborator for engine tests: every address maps to a
//! canned outcome, unmapped addresses refuse the connection.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use snmpr_common::config::ScanConfig;
use snmpr_core::report::ReportSink;
use snmpr_protocols::snmp::{Binding, SYS_DESCR_OID, SnmpClient, SnmpError, SnmpSession};

pub enum Scripted {
    Value(String),
    Bindings(Vec<Binding>),
    ConnectError(String),
    QueryError(String),
}

#[derive(Default)]
pub struct StubClient {
    outcomes: HashMap<Ipv4Addr, Scripted>,
    pub connect_calls: AtomicUsize,
}

impl StubClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, addr: &str, value: &str) -> Self {
        self.outcomes
            .insert(addr.parse().unwrap(), Scripted::Value(value.to_string()));
        self
    }

    pub fn bindings(mut self, addr: &str, bindings: Vec<Binding>) -> Self {
        self.outcomes
            .insert(addr.parse().unwrap(), Scripted::Bindings(bindings));
        self
    }

    pub fn connect_error(mut self, addr: &str, message: &str) -> Self {
        self.outcomes.insert(
            addr.parse().unwrap(),
            Scripted::ConnectError(message.to_string()),
        );
        self
    }

    pub fn query_error(mut self, addr: &str, message: &str) -> Self {
        self.outcomes.insert(
            addr.parse().unwrap(),
            Scripted::QueryError(message.to_string()),
        );
        self
    }
}

#[async_trait]
impl SnmpClient for StubClient {
    async fn connect(
        &self,
        addr: Ipv4Addr,
        _cfg: &ScanConfig,
    ) -> Result<Box<dyn SnmpSession>, SnmpError> {
        self.connect_calls.fetch_add(1, Ordering::Relaxed);

        match self.outcomes.get(&addr) {
            Some(Scripted::Value(value)) => Ok(Box::new(StubSession(Ok(vec![Binding {
                oid: SYS_DESCR_OID.to_string(),
                value: value.clone(),
            }])))),
            Some(Scripted::Bindings(bindings)) => Ok(Box::new(StubSession(Ok(bindings.clone())))),
            Some(Scripted::QueryError(message)) => Ok(Box::new(StubSession(Err(
                SnmpError::QueryFailed(message.clone()),
            )))),
            Some(Scripted::ConnectError(message)) => {
                Err(SnmpError::ConnectFailed(message.clone()))
            }
            None => Err(SnmpError::ConnectFailed("connection refused".to_string())),
        }
    }
}

struct StubSession(Result<Vec<Binding>, SnmpError>);

#[async_trait]
impl SnmpSession for StubSession {
    async fn get(&mut self, _oid: &str) -> Result<Vec<Binding>, SnmpError> {
        self.0.clone()
    }
}

/// Collects rendered lines instead of printing them.
#[derive(Default)]
pub struct VecSink(pub Vec<String>);

impl ReportSink for VecSink {
    fn report(&mut self, line: &str) {
        self.0.push(line.to_string());
    }
}
