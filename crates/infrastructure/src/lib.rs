pub mod dns;
pub mod server;

pub use dns::{Protocol, QueryHandler};
pub use server::{Server, ServerConfig, ServerError};

// Re-export the embedding surface so applications depend on one crate.
pub use anvil_dns_application::{
    Lookup, LookupRecordsUseCase, QueryFailure, Referral, Reporter, ResolvedSet, ZoneResolver,
};
pub use anvil_dns_domain::{DomainError, Record, RecordHandler, RecordSet, RecordType, Zone};
