//! SNMPv1/v2c GET client over UDP.
//!
//! The scan engine only ever needs "connect, ask one OID, read the
//! varbinds back", so the session surface is exactly that. The wire
//! format is hand-encoded BER; see [`crate::ber`].

use std::net::Ipv4Addr;
use std::time::Duration;

use anyhow::ensure;
use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{debug, trace};

use snmpr_common::config::{ScanConfig, SnmpVersion};

use crate::ber;

/// sysDescr.0, the host-identity descriptor every agent answers.
pub const SYS_DESCR_OID: &str = ".1.3.6.1.2.1.1.1.0";

pub const SNMP_PORT: u16 = 161;

const MAX_DATAGRAM: usize = 4096;

/// Recoverable protocol failures, tagged by the phase they occurred in
/// so callers can match instead of sniffing message strings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnmpError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// One key/value pair returned by an agent, in agent order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub oid: String,
    pub value: String,
}

#[async_trait]
pub trait SnmpSession: Send {
    /// Issues a single GET for `oid` and returns the varbinds in the
    /// order the agent sent them.
    async fn get(&mut self, oid: &str) -> Result<Vec<Binding>, SnmpError>;
}

#[async_trait]
pub trait SnmpClient: Send + Sync {
    async fn connect(
        &self,
        addr: Ipv4Addr,
        cfg: &ScanConfig,
    ) -> Result<Box<dyn SnmpSession>, SnmpError>;
}

/// Production client: one ephemeral UDP socket per session.
#[derive(Debug, Default)]
pub struct UdpSnmpClient;

#[async_trait]
impl SnmpClient for UdpSnmpClient {
    async fn connect(
        &self,
        addr: Ipv4Addr,
        cfg: &ScanConfig,
    ) -> Result<Box<dyn SnmpSession>, SnmpError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| SnmpError::ConnectFailed(e.to_string()))?;
        socket
            .connect((addr, SNMP_PORT))
            .await
            .map_err(|e| SnmpError::ConnectFailed(e.to_string()))?;

        Ok(Box::new(UdpSnmpSession {
            socket,
            version: cfg.version,
            community: cfg.community.clone(),
            timeout: cfg.timeout,
            attempts: cfg.repeats.max(1),
        }))
    }
}

pub struct UdpSnmpSession {
    socket: UdpSocket,
    version: SnmpVersion,
    community: String,
    timeout: Duration,
    attempts: u32,
}

#[async_trait]
impl SnmpSession for UdpSnmpSession {
    async fn get(&mut self, oid: &str) -> Result<Vec<Binding>, SnmpError> {
        let request_id = i64::from(rand::random::<u16>());
        let frame = build_get_request(self.version, &self.community, request_id, oid)
            .map_err(|e| SnmpError::QueryFailed(e.to_string()))?;

        let mut buf = [0u8; MAX_DATAGRAM];
        for attempt in 1..=self.attempts {
            self.socket
                .send(&frame)
                .await
                .map_err(|e| SnmpError::QueryFailed(e.to_string()))?;

            match timeout(self.timeout, self.socket.recv(&mut buf)).await {
                Ok(Ok(len)) => match parse_get_response(&buf[..len]) {
                    Ok(resp) if resp.request_id != request_id => {
                        debug!(
                            "ignoring response with stale request-id {} (want {})",
                            resp.request_id, request_id
                        );
                    }
                    Ok(resp) if resp.error_status != 0 => {
                        return Err(SnmpError::QueryFailed(format!(
                            "{} at index {}",
                            error_status_name(resp.error_status),
                            resp.error_index
                        )));
                    }
                    Ok(resp) => return Ok(resp.bindings),
                    Err(e) => debug!("discarding malformed datagram: {e}"),
                },
                // ICMP port-unreachable surfaces here on connected sockets.
                Ok(Err(e)) => return Err(SnmpError::QueryFailed(e.to_string())),
                Err(_) => trace!("attempt {attempt}/{} timed out", self.attempts),
            }
        }

        Err(SnmpError::QueryFailed(format!(
            "request timeout after {} attempts",
            self.attempts
        )))
    }
}

struct GetResponse {
    request_id: i64,
    error_status: i64,
    error_index: i64,
    bindings: Vec<Binding>,
}

pub(crate) fn build_get_request(
    version: SnmpVersion,
    community: &str,
    request_id: i64,
    oid: &str,
) -> anyhow::Result<Vec<u8>> {
    let oid_bytes = ber::encode_oid(oid)?;

    let mut varbind = Vec::new();
    ber::write_tlv(&mut varbind, ber::OBJECT_IDENTIFIER, &oid_bytes);
    ber::write_tlv(&mut varbind, ber::NULL, &[]);

    let mut varbind_list = Vec::new();
    ber::write_tlv(&mut varbind_list, ber::SEQUENCE, &varbind);

    let mut pdu = Vec::new();
    ber::write_int(&mut pdu, ber::INTEGER, request_id);
    ber::write_int(&mut pdu, ber::INTEGER, 0); // error-status
    ber::write_int(&mut pdu, ber::INTEGER, 0); // error-index
    ber::write_tlv(&mut pdu, ber::SEQUENCE, &varbind_list);

    let mut message = Vec::new();
    ber::write_int(&mut message, ber::INTEGER, wire_version(version));
    ber::write_tlv(&mut message, ber::OCTET_STRING, community.as_bytes());
    ber::write_tlv(&mut message, ber::GET_REQUEST, &pdu);

    let mut frame = Vec::new();
    ber::write_tlv(&mut frame, ber::SEQUENCE, &message);
    Ok(frame)
}

fn parse_get_response(frame: &[u8]) -> anyhow::Result<GetResponse> {
    let mut outer = ber::Reader::new(frame);
    let (tag, message) = outer.read_tlv()?;
    ensure!(tag == ber::SEQUENCE, "not an SNMP message");

    let mut message = ber::Reader::new(message);
    let _version = message.read_int()?;
    let (tag, _community) = message.read_tlv()?;
    ensure!(tag == ber::OCTET_STRING, "missing community string");
    let (tag, pdu) = message.read_tlv()?;
    ensure!(tag == ber::GET_RESPONSE, "unexpected PDU tag {tag:#04x}");

    let mut pdu = ber::Reader::new(pdu);
    let request_id = pdu.read_int()?;
    let error_status = pdu.read_int()?;
    let error_index = pdu.read_int()?;

    let (tag, varbind_list) = pdu.read_tlv()?;
    ensure!(tag == ber::SEQUENCE, "missing varbind list");

    let mut varbind_list = ber::Reader::new(varbind_list);
    let mut bindings = Vec::new();
    while !varbind_list.is_empty() {
        let (tag, varbind) = varbind_list.read_tlv()?;
        ensure!(tag == ber::SEQUENCE, "malformed varbind");

        let mut varbind = ber::Reader::new(varbind);
        let (tag, oid_bytes) = varbind.read_tlv()?;
        ensure!(tag == ber::OBJECT_IDENTIFIER, "varbind without OID");
        let (value_tag, value_bytes) = varbind.read_tlv()?;

        bindings.push(Binding {
            oid: ber::decode_oid(oid_bytes)?,
            value: render_value(value_tag, value_bytes),
        });
    }

    Ok(GetResponse {
        request_id,
        error_status,
        error_index,
        bindings,
    })
}

/// Renders a varbind value as display text, by tag.
fn render_value(tag: u8, content: &[u8]) -> String {
    match tag {
        ber::OCTET_STRING | ber::OPAQUE => String::from_utf8_lossy(content).into_owned(),
        ber::INTEGER => ber::decode_int(content)
            .map(|v| v.to_string())
            .unwrap_or_default(),
        ber::COUNTER32 | ber::GAUGE32 | ber::TIME_TICKS | ber::COUNTER64 => {
            ber::decode_uint(content)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }
        ber::IP_ADDRESS if content.len() == 4 => {
            Ipv4Addr::new(content[0], content[1], content[2], content[3]).to_string()
        }
        ber::OBJECT_IDENTIFIER => ber::decode_oid(content).unwrap_or_default(),
        ber::NULL | ber::NO_SUCH_OBJECT | ber::NO_SUCH_INSTANCE | ber::END_OF_MIB_VIEW => {
            String::new()
        }
        _ => String::from_utf8_lossy(content).into_owned(),
    }
}

fn wire_version(version: SnmpVersion) -> i64 {
    match version {
        SnmpVersion::V1 => 0,
        SnmpVersion::V2c => 1,
    }
}

fn error_status_name(code: i64) -> String {
    match code {
        1 => "tooBig".to_string(),
        2 => "noSuchName".to_string(),
        3 => "badValue".to_string(),
        4 => "readOnly".to_string(),
        5 => "genErr".to_string(),
        other => format!("error status {other}"),
    }
}
