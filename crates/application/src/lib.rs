pub mod ports;
pub mod use_cases;

pub use ports::{QueryFailure, Reporter, ZoneResolver};
pub use use_cases::{Lookup, LookupRecordsUseCase, Referral, ResolvedSet};
