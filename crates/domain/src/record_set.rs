use std::time::Duration;

use crate::errors::DomainError;
use crate::name::is_domain;
use crate::record::Record;
use crate::record_type::RecordType;

/// TTL applied to sets that leave it unset.
const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A group of records sharing an owner name and type. Handlers return these
/// per query; the server validates and normalizes them before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSet {
    /// Fully qualified owner name of the set.
    pub name: String,

    /// Type shared by every record in the set.
    pub rtype: RecordType,

    /// The records. Never empty after validation.
    pub records: Vec<Record>,

    /// TTL of the set. Zero means unset; validation applies the 5 minute
    /// default.
    pub ttl: Duration,
}

impl RecordSet {
    pub fn new(name: impl Into<String>, rtype: RecordType, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            rtype,
            records,
            ttl: Duration::ZERO,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Validates the set, sorts its records into canonical order and applies
    /// the TTL default. The canonical order depends only on record contents,
    /// never on insertion order.
    pub fn validate(&mut self) -> Result<(), DomainError> {
        if !is_domain(&self.name, true) {
            return Err(DomainError::InvalidSet(format!("invalid name: {}", self.name)));
        }

        if !self.rtype.queryable() {
            return Err(DomainError::InvalidSet(format!(
                "unsupported type: {}",
                self.rtype
            )));
        }

        if self.records.is_empty() {
            return Err(DomainError::InvalidSet("missing records".to_string()));
        }

        if self.rtype == RecordType::CNAME && self.records.len() > 1 {
            return Err(DomainError::InvalidSet("multiple CNAME records".to_string()));
        }

        for record in &self.records {
            if record.rtype() != self.rtype {
                return Err(DomainError::InvalidSet(format!(
                    "record type mismatch: {} in {} set",
                    record.rtype(),
                    self.rtype
                )));
            }
            record.validate()?;
        }

        self.records.sort_by_key(Record::sort_key);

        if self.ttl.is_zero() {
            self.ttl = DEFAULT_TTL;
        }

        Ok(())
    }
}
