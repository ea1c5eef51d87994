use std::net::{Ipv4Addr, Ipv6Addr};

use crate::errors::DomainError;
use crate::name::is_domain;
use crate::record_type::RecordType;

/// Maximum length of a single TXT character-string (RFC 1035 §3.3.14).
const MAX_TXT_CHUNK: usize = 255;

/// A single resource record value. The set of shapes is closed, so records
/// are a tagged variant rather than a trait object; address fields are typed
/// and cannot hold malformed literals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    CNAME(String),
    MX { priority: u16, exchange: String },
    NS(String),
    PTR(String),
    TXT(Vec<String>),
}

impl Record {
    /// The tag this record belongs to.
    pub fn rtype(&self) -> RecordType {
        match self {
            Record::A(_) => RecordType::A,
            Record::AAAA(_) => RecordType::AAAA,
            Record::CNAME(_) => RecordType::CNAME,
            Record::MX { .. } => RecordType::MX,
            Record::NS(_) => RecordType::NS,
            Record::PTR(_) => RecordType::PTR,
            Record::TXT(_) => RecordType::TXT,
        }
    }

    /// Validates the per-type constraints: name-valued records must carry a
    /// fully qualified target, TXT data must be non-empty with chunks of
    /// 1-255 octets. Addresses are valid by construction.
    pub fn validate(&self) -> Result<(), DomainError> {
        match self {
            Record::A(_) | Record::AAAA(_) => Ok(()),
            Record::CNAME(target) | Record::NS(target) | Record::PTR(target) => {
                if !is_domain(target, true) {
                    return Err(DomainError::InvalidRecord(format!(
                        "target is not fully qualified: {}",
                        target
                    )));
                }
                Ok(())
            }
            Record::MX { exchange, .. } => {
                if !is_domain(exchange, true) {
                    return Err(DomainError::InvalidRecord(format!(
                        "exchange is not fully qualified: {}",
                        exchange
                    )));
                }
                Ok(())
            }
            Record::TXT(chunks) => {
                if chunks.is_empty() {
                    return Err(DomainError::InvalidRecord("missing TXT data".to_string()));
                }
                for chunk in chunks {
                    if chunk.is_empty() || chunk.len() > MAX_TXT_CHUNK {
                        return Err(DomainError::InvalidRecord(format!(
                            "TXT chunk length out of range: {}",
                            chunk.len()
                        )));
                    }
                }
                Ok(())
            }
        }
    }

    /// Canonical ordering key. TXT records order by their first chunk, MX
    /// records by zero-padded priority then exchange, everything else by the
    /// textual address or target.
    pub fn sort_key(&self) -> String {
        match self {
            Record::A(addr) => addr.to_string(),
            Record::AAAA(addr) => addr.to_string(),
            Record::CNAME(target) | Record::NS(target) | Record::PTR(target) => target.clone(),
            Record::MX { priority, exchange } => format!("{:05} {}", priority, exchange),
            Record::TXT(chunks) => chunks.first().cloned().unwrap_or_default(),
        }
    }
}
