//! Registry adapters: where the resolver gets its candidates from.
//!
//! Two interchangeable backends implement [`RegistryAdapter`]: an in-memory
//! snapshot of the TERC/SIMC/ULIC tables and the TERYT SOAP web service.

mod soap;
mod table;

pub use soap::{HttpTransport, SoapCredentials, SoapRegistry, SoapTransport};
pub use table::{ReferenceTables, TableRegistry};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::RegistryError;
use crate::models::{AdministrativeUnit, Locality, MunicipalityCode, Street};

/// Candidate lookups at each hierarchy level.
///
/// Implementations hold no per-query state and surface failures verbatim;
/// retries and timeouts belong to the transport underneath.
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    async fn list_voivodeships(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<AdministrativeUnit>, RegistryError>;

    async fn list_counties(
        &self,
        voivodeship: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<AdministrativeUnit>, RegistryError>;

    async fn list_municipalities(
        &self,
        voivodeship: &str,
        county: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<AdministrativeUnit>, RegistryError>;

    async fn list_localities_in_municipality(
        &self,
        municipality: &MunicipalityCode,
        as_of: NaiveDate,
    ) -> Result<Vec<Locality>, RegistryError>;

    /// Registry-wide locality search by name. Results are not filtered by
    /// hierarchy; callers match names and parent codes themselves.
    async fn search_localities_by_name(
        &self,
        name: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<Locality>, RegistryError>;

    /// May fail with [`RegistryError::NoStreetsFound`], which callers treat
    /// as an empty list.
    async fn list_streets_for_locality(
        &self,
        municipality: &MunicipalityCode,
        locality_code: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<Street>, RegistryError>;
}
