mod lookup_records;

pub use lookup_records::{Lookup, LookupRecordsUseCase, Referral, ResolvedSet};
