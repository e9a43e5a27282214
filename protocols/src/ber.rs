//! Minimal BER (X.690) encoding for the handful of shapes SNMPv1/v2c
//! GET traffic uses.
//!
//! Only definite lengths are supported; SNMP agents do not emit the
//! indefinite form.

use anyhow::{bail, ensure};

pub const INTEGER: u8 = 0x02;
pub const OCTET_STRING: u8 = 0x04;
pub const NULL: u8 = 0x05;
pub const OBJECT_IDENTIFIER: u8 = 0x06;
pub const SEQUENCE: u8 = 0x30;

// SNMP application types (RFC 2578).
pub const IP_ADDRESS: u8 = 0x40;
pub const COUNTER32: u8 = 0x41;
pub const GAUGE32: u8 = 0x42;
pub const TIME_TICKS: u8 = 0x43;
pub const OPAQUE: u8 = 0x44;
pub const COUNTER64: u8 = 0x46;

// v2c varbind exceptions.
pub const NO_SUCH_OBJECT: u8 = 0x80;
pub const NO_SUCH_INSTANCE: u8 = 0x81;
pub const END_OF_MIB_VIEW: u8 = 0x82;

// PDU tags.
pub const GET_REQUEST: u8 = 0xA0;
pub const GET_RESPONSE: u8 = 0xA2;

/// Appends one tag-length-value triple.
pub fn write_tlv(out: &mut Vec<u8>, tag: u8, content: &[u8]) {
    out.push(tag);
    write_len(out, content.len());
    out.extend_from_slice(content);
}

fn write_len(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = (len as u32).to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.push(0x80 | (4 - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

/// Appends a two's-complement integer with the given tag, using the
/// minimal number of content octets BER requires.
pub fn write_int(out: &mut Vec<u8>, tag: u8, value: i64) {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let cur = bytes[start];
        let sign = bytes[start + 1] & 0x80;
        if (cur == 0x00 && sign == 0) || (cur == 0xFF && sign != 0) {
            start += 1;
        } else {
            break;
        }
    }
    write_tlv(out, tag, &bytes[start..]);
}

pub fn decode_int(content: &[u8]) -> anyhow::Result<i64> {
    ensure!(!content.is_empty(), "empty INTEGER");
    ensure!(content.len() <= 8, "INTEGER wider than 64 bits");
    let mut value: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for &b in content {
        value = (value << 8) | i64::from(b);
    }
    Ok(value)
}

pub fn decode_uint(content: &[u8]) -> anyhow::Result<u64> {
    ensure!(!content.is_empty(), "empty unsigned value");
    // Counters may carry a leading 0x00 to keep the sign bit clear.
    let trimmed = if content[0] == 0 && content.len() > 1 {
        &content[1..]
    } else {
        content
    };
    ensure!(trimmed.len() <= 8, "unsigned value wider than 64 bits");
    let mut value: u64 = 0;
    for &b in trimmed {
        value = (value << 8) | u64::from(b);
    }
    Ok(value)
}

/// Encodes a dotted OID string (leading dot optional) into its BER form.
pub fn encode_oid(oid: &str) -> anyhow::Result<Vec<u8>> {
    let arcs = oid
        .trim_start_matches('.')
        .split('.')
        .map(|part| {
            part.parse::<u32>()
                .map_err(|_| anyhow::anyhow!("invalid OID arc '{part}' in '{oid}'"))
        })
        .collect::<anyhow::Result<Vec<u32>>>()?;

    ensure!(arcs.len() >= 2, "OID '{oid}' needs at least two arcs");
    ensure!(arcs[0] <= 2, "first OID arc must be 0, 1 or 2");
    ensure!(arcs[0] == 2 || arcs[1] < 40, "second OID arc out of range");

    let mut out = Vec::with_capacity(arcs.len() + 1);
    push_base128(&mut out, arcs[0] * 40 + arcs[1]);
    for &arc in &arcs[2..] {
        push_base128(&mut out, arc);
    }
    Ok(out)
}

/// Decodes BER OID content back into leading-dot dotted notation.
pub fn decode_oid(content: &[u8]) -> anyhow::Result<String> {
    ensure!(!content.is_empty(), "empty OID");

    let mut arcs: Vec<u32> = Vec::new();
    let mut acc: u32 = 0;
    for (i, &b) in content.iter().enumerate() {
        acc = acc
            .checked_shl(7)
            .and_then(|v| v.checked_add(u32::from(b & 0x7F)))
            .ok_or_else(|| anyhow::anyhow!("OID arc overflow"))?;
        if b & 0x80 == 0 {
            if arcs.is_empty() {
                let (first, second) = if acc < 80 { (acc / 40, acc % 40) } else { (2, acc - 80) };
                arcs.push(first);
                arcs.push(second);
            } else {
                arcs.push(acc);
            }
            acc = 0;
        } else if i == content.len() - 1 {
            bail!("truncated OID arc");
        }
    }

    let dotted = arcs
        .iter()
        .map(u32::to_string)
        .collect::<Vec<String>>()
        .join(".");
    Ok(format!(".{dotted}"))
}

fn push_base128(out: &mut Vec<u8>, value: u32) {
    let mut chunks = [0u8; 5];
    let mut n = 0;
    let mut v = value;
    loop {
        chunks[n] = (v & 0x7F) as u8;
        v >>= 7;
        n += 1;
        if v == 0 {
            break;
        }
    }
    for i in (0..n).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        out.push(chunks[i] | continuation);
    }
}

/// Cursor over a BER-encoded buffer.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Reads the next tag-length-value triple, returning the tag and a
    /// borrowed view of the content octets.
    pub fn read_tlv(&mut self) -> anyhow::Result<(u8, &'a [u8])> {
        ensure!(self.pos + 2 <= self.buf.len(), "truncated TLV header");
        let tag = self.buf[self.pos];
        self.pos += 1;

        let first = self.buf[self.pos];
        self.pos += 1;
        let len = if first & 0x80 == 0 {
            usize::from(first)
        } else {
            let n = usize::from(first & 0x7F);
            ensure!(n > 0 && n <= 4, "unsupported BER length form");
            ensure!(self.pos + n <= self.buf.len(), "truncated BER length");
            let mut len = 0usize;
            for _ in 0..n {
                len = (len << 8) | usize::from(self.buf[self.pos]);
                self.pos += 1;
            }
            len
        };

        ensure!(self.pos + len <= self.buf.len(), "TLV content overruns buffer");
        let content = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok((tag, content))
    }

    pub fn read_int(&mut self) -> anyhow::Result<i64> {
        let (tag, content) = self.read_tlv()?;
        ensure!(tag == INTEGER, "expected INTEGER, found tag {tag:#04x}");
        decode_int(content)
    }
}
