//! Query pipeline: accept filtering, zone selection and response assembly.

use std::sync::Arc;

use anvil_dns_application::{LookupRecordsUseCase, QueryFailure, Reporter, ZoneResolver};
use anvil_dns_domain::name::{in_zone, transfer_case};
use anvil_dns_domain::{DomainError, Record, RecordType, Zone};
use hickory_proto::op::{Edns, Message, MessageType, OpCode, ResponseCode};
use hickory_proto::rr::{DNSClass, RecordType as WireType};
use tracing::debug;

use super::convert::{convert_set, ns_records, record_type_from_wire, soa_record};
use super::Protocol;

/// Runs accepted queries through the resolution pipeline and assembles the
/// reply message. One instance serves every connection; it holds only the
/// immutable configuration.
pub struct QueryHandler {
    buffer_size: u16,
    resolver: Arc<dyn ZoneResolver>,
    reporter: Option<Arc<dyn Reporter>>,
    lookup: LookupRecordsUseCase,
}

impl QueryHandler {
    pub(crate) fn new(
        buffer_size: u16,
        resolver: Arc<dyn ZoneResolver>,
        reporter: Option<Arc<dyn Reporter>>,
    ) -> Self {
        Self {
            buffer_size,
            resolver,
            reporter,
            lookup: LookupRecordsUseCase::new(),
        }
    }

    /// Message acceptance: queries only, opcode QUERY, exactly one
    /// question. Anything else is dropped without a reply.
    pub fn accepts(request: &Message) -> bool {
        request.message_type() == MessageType::Query
            && request.op_code() == OpCode::Query
            && request.queries().len() == 1
    }

    /// Handles one accepted query. `None` means no reply is written and the
    /// connection is left alone.
    pub async fn handle(&self, request: &Message) -> Option<Message> {
        let mut response = Message::new();
        response.set_id(request.id());
        response.set_message_type(MessageType::Response);
        response.set_op_code(OpCode::Query);
        response.set_recursion_desired(request.recursion_desired());
        response.set_authoritative(true);

        let query = request.queries().first()?.clone();
        response.add_query(query.clone());

        // echo an OPT carrying our buffer size, reject unknown EDNS versions
        if let Some(req_edns) = request.extensions() {
            let mut edns = Edns::new();
            edns.set_max_payload(self.buffer_size);
            edns.set_version(0);
            edns.set_dnssec_ok(false);

            if req_edns.version() != 0 {
                // the upper rcode bits travel in the OPT record
                let code = ResponseCode::BADVERS;
                edns.set_rcode_high(code.high());
                response.set_edns(edns);
                response.set_response_code(code);
                return Some(response);
            }

            response.set_edns(edns);
        }

        if query.query_class() != DNSClass::IN {
            // unsupported class, leave the connection hanging
            return None;
        }

        if query.query_type() == WireType::ANY {
            response.set_response_code(ResponseCode::NotImp);
            return Some(response);
        }

        let qname = query.name().to_utf8();
        let name = qname.to_ascii_lowercase();

        let zone = match self.resolver.resolve(&name).await {
            Ok(zone) => zone,
            Err(error) => return self.servfail(response, request, error),
        };

        let Some(mut zone) = zone else {
            response.set_authoritative(false);
            response.set_response_code(ResponseCode::Refused);
            return Some(response);
        };

        if let Err(error) = zone.validate() {
            return self.servfail(response, request, error);
        }

        let at_apex = name.eq_ignore_ascii_case(&zone.name);

        // answer apex SOA directly
        if at_apex && query.query_type() == WireType::SOA {
            let soa = match soa_record(&zone, &zone.name) {
                Ok(soa) => soa,
                Err(error) => return self.servfail(response, request, error),
            };
            let ns = match ns_records(&zone, &zone.name) {
                Ok(ns) => ns,
                Err(error) => return self.servfail(response, request, error),
            };

            response.add_answer(soa);
            for record in ns {
                response.add_name_server(record);
            }
            return Some(response);
        }

        // answer apex NS directly
        if at_apex && query.query_type() == WireType::NS {
            let ns = match ns_records(&zone, &zone.name) {
                Ok(ns) => ns,
                Err(error) => return self.servfail(response, request, error),
            };

            for record in ns {
                response.add_answer(record);
            }
            return Some(response);
        }

        let qtype = match record_type_from_wire(query.query_type()) {
            Some(qtype) if qtype.queryable() => qtype,
            _ => return self.negative(response, &zone, request, ResponseCode::NXDomain),
        };

        let lookup = match self.lookup.execute(&zone, &name, &[qtype]).await {
            Ok(lookup) => lookup,
            Err(error) => return self.servfail(response, request, error),
        };

        // a delegation answers with the subzone NS set and glue only
        if let Some(referral) = &lookup.referral {
            let ns = match convert_set(
                &zone,
                &transfer_case(&qname, &referral.ns.owner),
                &referral.ns.set,
            ) {
                Ok(ns) => ns,
                Err(error) => return self.servfail(response, request, error),
            };
            for record in ns {
                response.add_name_server(record);
            }

            for glue in &referral.glue {
                let records =
                    match convert_set(&zone, &transfer_case(&qname, &glue.owner), &glue.set) {
                        Ok(records) => records,
                        Err(error) => return self.servfail(response, request, error),
                    };
                for record in records {
                    response.add_additional(record);
                }
            }
            return Some(response);
        }

        if lookup.answers.is_empty() {
            let code = if lookup.other_types {
                // NODATA: the name exists with other types
                ResponseCode::NoError
            } else {
                ResponseCode::NXDomain
            };
            return self.negative(response, &zone, request, code);
        }

        for resolved in &lookup.answers {
            let records =
                match convert_set(&zone, &transfer_case(&qname, &resolved.owner), &resolved.set) {
                    Ok(records) => records,
                    Err(error) => return self.servfail(response, request, error),
                };
            for record in records {
                response.add_answer(record);
            }
        }

        // MX targets inside the zone get their addresses appended as glue
        for resolved in &lookup.answers {
            if resolved.set.rtype != RecordType::MX {
                continue;
            }
            for record in &resolved.set.records {
                let Record::MX { exchange, .. } = record else { continue };
                if !in_zone(&zone.name, exchange) {
                    continue;
                }

                let glue = match self
                    .lookup
                    .execute(
                        &zone,
                        &exchange.to_ascii_lowercase(),
                        &[RecordType::A, RecordType::AAAA],
                    )
                    .await
                {
                    Ok(glue) => glue,
                    Err(error) => return self.servfail(response, request, error),
                };

                for resolved_glue in &glue.answers {
                    let records = match convert_set(
                        &zone,
                        &transfer_case(&qname, &resolved_glue.owner),
                        &resolved_glue.set,
                    ) {
                        Ok(records) => records,
                        Err(error) => return self.servfail(response, request, error),
                    };
                    for record in records {
                        response.add_additional(record);
                    }
                }
            }
        }

        // the zone NS set closes out the authority section
        let ns = match ns_records(&zone, &transfer_case(&qname, &zone.name)) {
            Ok(ns) => ns,
            Err(error) => return self.servfail(response, request, error),
        };
        for record in ns {
            response.add_name_server(record);
        }

        Some(response)
    }

    /// Serializes a response, truncating UDP replies that exceed the
    /// client's negotiated buffer: every section is cleared and TC set.
    /// TCP never truncates.
    pub fn encode(
        request: &Message,
        response: &mut Message,
        protocol: Protocol,
    ) -> Result<Vec<u8>, DomainError> {
        let wire = response
            .to_vec()
            .map_err(|e| DomainError::IoError(e.to_string()))?;

        if protocol == Protocol::Udp {
            let buffer = request
                .extensions()
                .as_ref()
                .map(|edns| edns.max_payload() as usize)
                .unwrap_or(512);

            if wire.len() > buffer {
                response.set_truncated(true);
                response.take_answers();
                response.take_name_servers();
                response.take_additionals();
                return response
                    .to_vec()
                    .map_err(|e| DomainError::IoError(e.to_string()));
            }
        }

        Ok(wire)
    }

    pub(crate) fn report(&self, request: &Message, error: DomainError) {
        if let Some(reporter) = &self.reporter {
            reporter.report(QueryFailure {
                error,
                request: format!("{:?}", request),
            });
        }
    }

    fn servfail(
        &self,
        mut response: Message,
        request: &Message,
        error: DomainError,
    ) -> Option<Message> {
        debug!(error = %error, "Query failed internally");
        self.report(request, error);
        response.set_response_code(ResponseCode::ServFail);
        Some(response)
    }

    /// A negative answer: the requested code plus the zone SOA in authority
    /// so resolvers can cache the absence.
    fn negative(
        &self,
        mut response: Message,
        zone: &Zone,
        request: &Message,
        code: ResponseCode,
    ) -> Option<Message> {
        match soa_record(zone, &zone.name) {
            Ok(soa) => {
                response.set_response_code(code);
                response.add_name_server(soa);
                Some(response)
            }
            Err(error) => self.servfail(response, request, error),
        }
    }
}
