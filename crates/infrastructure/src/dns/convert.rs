//! Conversion from the domain record model to hickory wire records.

use std::time::Duration;

use anvil_dns_domain::name::email_to_domain;
use anvil_dns_domain::{DomainError, Record, RecordSet, RecordType, Zone};
use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, NS, PTR, SOA, TXT};
use hickory_proto::rr::{Name, RData, Record as WireRecord, RecordType as WireType};

pub(crate) fn ttl_seconds(ttl: Duration) -> u32 {
    ttl.as_secs().min(u32::MAX as u64) as u32
}

pub(crate) fn record_type_from_wire(rtype: WireType) -> Option<RecordType> {
    match rtype {
        WireType::A => Some(RecordType::A),
        WireType::AAAA => Some(RecordType::AAAA),
        WireType::CNAME => Some(RecordType::CNAME),
        WireType::MX => Some(RecordType::MX),
        WireType::NS => Some(RecordType::NS),
        WireType::PTR => Some(RecordType::PTR),
        WireType::SOA => Some(RecordType::SOA),
        WireType::TXT => Some(RecordType::TXT),
        _ => None,
    }
}

fn wire_name(name: &str) -> Result<Name, DomainError> {
    Name::from_utf8(name).map_err(|e| DomainError::InvalidName(format!("{}: {}", name, e)))
}

/// Converts a resolved set into wire records owned by `owner`. The TTL is
/// clamped to the zone's minimum.
pub(crate) fn convert_set(
    zone: &Zone,
    owner: &str,
    set: &RecordSet,
) -> Result<Vec<WireRecord>, DomainError> {
    let name = wire_name(owner)?;
    let ttl = ttl_seconds(set.ttl.max(zone.min_ttl));

    let mut records = Vec::with_capacity(set.records.len());
    for record in &set.records {
        let rdata = match record {
            Record::A(addr) => RData::A(A(*addr)),
            Record::AAAA(addr) => RData::AAAA(AAAA(*addr)),
            Record::CNAME(target) => RData::CNAME(CNAME(wire_name(target)?)),
            Record::MX { priority, exchange } => {
                RData::MX(MX::new(*priority, wire_name(exchange)?))
            }
            Record::NS(target) => RData::NS(NS(wire_name(target)?)),
            Record::PTR(target) => RData::PTR(PTR(wire_name(target)?)),
            Record::TXT(chunks) => RData::TXT(TXT::new(chunks.clone())),
        };
        records.push(WireRecord::from_rdata(name.clone(), ttl, rdata));
    }

    Ok(records)
}

/// Synthesizes the zone SOA: serial fixed at 1, timers from the zone, the
/// MINIMUM field carrying the zone TTL floor for negative caching.
pub(crate) fn soa_record(zone: &Zone, owner: &str) -> Result<WireRecord, DomainError> {
    let soa = SOA::new(
        wire_name(&zone.master_name_server)?,
        wire_name(&email_to_domain(&zone.admin_email))?,
        1,
        ttl_seconds(zone.refresh) as i32,
        ttl_seconds(zone.retry) as i32,
        ttl_seconds(zone.expire) as i32,
        ttl_seconds(zone.min_ttl),
    );

    Ok(WireRecord::from_rdata(
        wire_name(owner)?,
        ttl_seconds(zone.soa_ttl),
        RData::SOA(soa),
    ))
}

/// The zone's NS records under `owner`, with the zone NS TTL.
pub(crate) fn ns_records(zone: &Zone, owner: &str) -> Result<Vec<WireRecord>, DomainError> {
    let name = wire_name(owner)?;
    let ttl = ttl_seconds(zone.ns_ttl);

    zone.all_name_servers
        .iter()
        .map(|ns| {
            Ok(WireRecord::from_rdata(
                name.clone(),
                ttl,
                RData::NS(NS(wire_name(ns)?)),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_dns_domain::zone::RecordHandler;
    use async_trait::async_trait;
    use std::net::Ipv4Addr;
    use std::sync::Arc;

    struct NoRecords;

    #[async_trait]
    impl RecordHandler for NoRecords {
        async fn lookup(
            &self,
            _rtype: Option<RecordType>,
            _name: &str,
        ) -> Result<Vec<RecordSet>, DomainError> {
            Ok(vec![])
        }
    }

    fn zone() -> Zone {
        let mut zone = Zone::new(
            "example.com.",
            "ns1.example.com.",
            vec!["ns1.example.com.".to_string(), "ns2.example.com.".to_string()],
            Arc::new(NoRecords),
        );
        zone.validate().unwrap();
        zone
    }

    #[test]
    fn test_ttl_is_clamped_to_the_zone_minimum() {
        let zone = zone();
        let set = RecordSet::new(
            "api.example.com.",
            RecordType::A,
            vec![Record::A(Ipv4Addr::new(1, 2, 3, 4))],
        )
        .with_ttl(Duration::from_secs(30));

        let records = convert_set(&zone, "api.example.com.", &set).unwrap();
        assert_eq!(records[0].ttl(), 300);

        let set = set.with_ttl(Duration::from_secs(3600));
        let records = convert_set(&zone, "api.example.com.", &set).unwrap();
        assert_eq!(records[0].ttl(), 3600);
    }

    #[test]
    fn test_soa_synthesis() {
        let zone = zone();
        let record = soa_record(&zone, "example.com.").unwrap();
        assert_eq!(record.ttl(), 900);

        let Some(RData::SOA(soa)) = record.data() else {
            panic!("expected SOA rdata");
        };
        assert_eq!(soa.serial(), 1);
        assert_eq!(soa.mname().to_utf8(), "ns1.example.com.");
        assert_eq!(soa.rname().to_utf8(), "hostmaster.example.com.");
        assert_eq!(soa.refresh(), 6 * 3600);
        assert_eq!(soa.retry(), 3600);
        assert_eq!(soa.expire(), 72 * 3600);
        assert_eq!(soa.minimum(), 300);
    }

    #[test]
    fn test_ns_records_carry_the_ns_ttl() {
        let zone = zone();
        let records = ns_records(&zone, "example.com.").unwrap();
        assert_eq!(records.len(), 2);
        for record in records {
            assert_eq!(record.ttl(), 48 * 3600);
        }
    }
}
