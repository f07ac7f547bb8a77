//! TERYT resolver - maps Polish addresses onto TERC/SIMC/ULIC registry codes
//!
//! This library provides the resolver and its registry backends for the serve
//! and batch binaries.

pub mod assemble;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod reference;
pub mod registry;
pub mod resolver;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{RegistryError, ResolveError};
pub use models::{AddressQuery, AddressRecord, MatchKind, PostalCode, ResolutionResult};
pub use service::{AddressLookup, AddressService, LocalityDetails};
