//! Core data models for TERYT resolution.

pub mod address;
pub mod admin;
pub mod locality;
pub mod result;

pub use address::{AddressQuery, AddressRecord, PostalCode};
pub use admin::{
    is_code, pad_code, AdminLevel, AdministrativeUnit, MalformedCode, MunicipalityCode, Stage,
};
pub use locality::{Locality, Street};
pub use result::{
    MatchKind, Resolution, ResolutionResult, ResolvedField, StageOutcome, StageOutcomes,
    StreetSuggestion,
};
