//! The `resolve` operation and the lookups built around it.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::assemble::assemble;
use crate::clock::{DateProvider, FixedDate, SystemDate};
use crate::config::{Backend, Config};
use crate::error::ResolveError;
use crate::models::{AddressQuery, AddressRecord, PostalCode, ResolutionResult, StreetSuggestion};
use crate::reference::{load_reference_tables, PostalCodeIndex};
use crate::registry::{HttpTransport, RegistryAdapter, SoapRegistry, TableRegistry};
use crate::resolver::{HierarchicalResolver, ResolutionTarget};

/// A resolved query together with the postal row it was resolved from.
#[derive(Debug, Clone, Serialize)]
pub struct AddressLookup {
    pub query: AddressQuery,
    pub record: AddressRecord,
    pub as_of: NaiveDate,
    #[serde(flatten)]
    pub result: ResolutionResult,
}

/// Codes of a locality plus every street registered in it.
#[derive(Debug, Clone, Serialize)]
pub struct LocalityDetails {
    pub record: AddressRecord,
    pub as_of: NaiveDate,
    #[serde(flatten)]
    pub result: ResolutionResult,
    pub streets: Vec<StreetSuggestion>,
    /// Set when the street listing failed; the codes above are still valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streets_error: Option<String>,
}

/// Postal-code index, resolver and clock wired together.
///
/// Cheap to share: everything inside is read-only after construction.
pub struct AddressService {
    postal: Arc<PostalCodeIndex>,
    resolver: HierarchicalResolver,
    clock: Arc<dyn DateProvider>,
}

impl AddressService {
    pub fn new(
        postal: Arc<PostalCodeIndex>,
        registry: Arc<dyn RegistryAdapter>,
        clock: Arc<dyn DateProvider>,
    ) -> Self {
        Self {
            postal,
            resolver: HierarchicalResolver::new(registry),
            clock,
        }
    }

    /// Load the reference data and build the configured registry backend.
    pub fn from_config(config: &Config) -> Result<Self> {
        let postal = PostalCodeIndex::load(&config.data.postal_codes_path())
            .context("Failed to load postal codes")?;
        if postal.is_empty() {
            warn!("Postal-code table is empty");
        }

        let registry: Arc<dyn RegistryAdapter> = match config.registry.backend {
            Backend::Table => {
                let tables = load_reference_tables(
                    &config.data.terc_path(),
                    &config.data.simc_path(),
                    &config.data.ulic_path(),
                )
                .context("Failed to load registry tables")?;
                Arc::new(TableRegistry::new(Arc::new(tables)))
            }
            Backend::Soap => {
                let endpoint = config.soap.endpoint_url()?;
                info!("Using TERYT web service at {}", endpoint);
                let transport = HttpTransport::new(endpoint, config.soap.timeout())?;
                Arc::new(SoapRegistry::new(transport, config.soap.credentials()))
            }
        };

        let clock: Arc<dyn DateProvider> = match config.resolver.as_of {
            Some(date) => {
                info!("Registry snapshot date pinned to {}", date);
                Arc::new(FixedDate(date))
            }
            None => Arc::new(SystemDate),
        };

        Ok(Self::new(Arc::new(postal), registry, clock))
    }

    pub fn backend(&self) -> &'static str {
        self.resolver.backend()
    }

    pub fn postal_index(&self) -> &PostalCodeIndex {
        &self.postal
    }

    pub fn as_of(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Clean locality names served by a postal code.
    pub fn localities(&self, postal_code: &str) -> Result<Vec<String>, ResolveError> {
        let code = PostalCode::parse(postal_code)?;
        let localities = self.postal.localities_for_postal_code(&code);
        if localities.is_empty() {
            return Err(ResolveError::PostalCodeNotFound(code.to_string()));
        }
        Ok(localities)
    }

    /// Resolve a postal code, locality and optional street to registry codes.
    pub async fn resolve(
        &self,
        postal_code: &str,
        locality: &str,
        street: Option<&str>,
    ) -> Result<ResolutionResult, ResolveError> {
        let query = AddressQuery::new(postal_code, locality, street);
        Ok(self.lookup(&query).await?.result)
    }

    pub async fn lookup(&self, query: &AddressQuery) -> Result<AddressLookup, ResolveError> {
        let record = self
            .postal
            .select_record(&query.postal_code, Some(&query.locality))?;
        let target = ResolutionTarget::from_record(record, query.street.as_deref());
        let as_of = self.as_of();

        let outcomes = self.resolver.resolve(&target, as_of).await?;
        let result = assemble(&outcomes);
        info!(
            postal_code = %query.postal_code,
            locality = %record.locality,
            "Resolved TERC {} SIMC {} ULIC {}",
            result.municipality_code().unwrap_or("-"),
            result.locality_code().unwrap_or("-"),
            result.street_code().unwrap_or("-")
        );

        Ok(AddressLookup {
            query: query.clone(),
            record: record.clone(),
            as_of,
            result,
        })
    }

    /// Codes for a locality and its full street list, sorted by name.
    ///
    /// Without a locality the postal code must serve exactly one.
    pub async fn details(
        &self,
        postal_code: &str,
        locality: Option<&str>,
    ) -> Result<LocalityDetails, ResolveError> {
        let record = self.postal.select_record(postal_code, locality)?;
        let target = ResolutionTarget::from_record(record, None);
        let as_of = self.as_of();

        let outcomes = self.resolver.resolve(&target, as_of).await?;
        let (streets, streets_error) =
            match self.resolver.streets_of_locality(&outcomes, as_of).await {
                Ok(streets) => (streets, None),
                Err(e) => {
                    warn!("Street listing for {} failed: {}", record.locality, e);
                    (Vec::new(), Some(e.to_string()))
                }
            };

        let mut streets: Vec<StreetSuggestion> =
            streets.iter().map(StreetSuggestion::from).collect();
        streets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));

        Ok(LocalityDetails {
            record: record.clone(),
            as_of,
            result: assemble(&outcomes),
            streets,
            streets_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use crate::models::{AdministrativeUnit, Locality, MunicipalityCode, Street};
    use crate::testing::{as_of, sample_postal_index, sample_registry};
    use async_trait::async_trait;

    fn service() -> AddressService {
        AddressService::new(
            Arc::new(sample_postal_index()),
            Arc::new(sample_registry()),
            Arc::new(FixedDate(as_of())),
        )
    }

    #[tokio::test]
    async fn test_warszawa_without_street() {
        let result = service().resolve("00-001", "Warszawa", None).await.unwrap();
        assert_eq!(result.voivodeship_code(), Some("14"));
        assert_eq!(result.county_code(), Some("1465"));
        assert_eq!(result.municipality_code(), Some("1465011"));
        assert_eq!(result.locality_code(), Some("0918123"));
        assert!(result.street_code().is_none());
        assert!(result.street_suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_parenthesised_locality_name() {
        let lookup = service()
            .lookup(&AddressQuery::new(
                "05-170",
                "Wólka (Wólka Pietrusza Wola)",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(lookup.record.locality, "Wólka Pietrusza Wola");
        assert_eq!(lookup.result.municipality_code(), Some("1414055"));
        assert_eq!(lookup.result.locality_code(), Some("0578123"));
        assert_eq!(lookup.as_of, as_of());
    }

    #[tokio::test]
    async fn test_gm_prefixed_municipality() {
        let result = service()
            .resolve("05-170", "Wólka Pietrusza Wola", None)
            .await
            .unwrap();
        assert_eq!(
            result.municipality.name.as_deref(),
            Some("Zakroczym")
        );
        assert_eq!(result.municipality_code(), Some("1414055"));
    }

    #[tokio::test]
    async fn test_unknown_locality_keeps_municipality() {
        let result = service().resolve("59-720", "Atlantyda", None).await.unwrap();
        assert_eq!(result.municipality_code(), Some("0201042"));
        assert!(result.locality_code().is_none());
        assert!(result.locality.adapter_error.is_none());
    }

    #[tokio::test]
    async fn test_street_with_suggestions() {
        let result = service()
            .resolve("00-001", "Warszawa", Some("Kwiat"))
            .await
            .unwrap();
        assert!(result.street_code().is_none());
        assert_eq!(result.street_suggestions.len(), 5);

        let result = service()
            .resolve("00-001", "Warszawa", Some("ul. Kwiatowa"))
            .await
            .unwrap();
        assert_eq!(result.street_code(), Some("11111"));
    }

    #[tokio::test]
    async fn test_locality_must_belong_to_postal_code() {
        let err = service()
            .resolve("00-001", "Zakroczym", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::LocalityNotInPostalCode { .. }));
    }

    #[test]
    fn test_localities_for_postal_code() {
        let service = service();
        assert_eq!(
            service.localities("05-170").unwrap(),
            vec!["Wólka Pietrusza Wola".to_string(), "Zakroczym".to_string()]
        );
        assert!(matches!(
            service.localities("99-999"),
            Err(ResolveError::PostalCodeNotFound(_))
        ));
        assert!(matches!(
            service.localities("99999"),
            Err(ResolveError::InvalidPostalCode(_))
        ));
    }

    #[tokio::test]
    async fn test_details_lists_streets_sorted() {
        let details = service().details("00-001", None).await.unwrap();
        assert_eq!(details.result.locality_code(), Some("0918123"));
        let names: Vec<&str> = details.streets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Bankowy", "Bankowy", "Kwiatowa", "Kwiatowa Boczna", "Marszałkowska"]
        );
        assert!(details.streets_error.is_none());
    }

    #[tokio::test]
    async fn test_details_needs_locality_when_ambiguous() {
        let err = service().details("05-170", None).await.unwrap_err();
        assert!(matches!(err, ResolveError::AmbiguousLocality { .. }));

        let details = service().details("05-170", Some("Zakroczym")).await.unwrap();
        assert_eq!(details.result.municipality_code(), Some("1414054"));
        assert!(details.streets.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_serializes_flat() {
        let lookup = service()
            .lookup(&AddressQuery::new("00-001", "Warszawa", None))
            .await
            .unwrap();
        let json = serde_json::to_value(&lookup).unwrap();
        assert_eq!(json["municipality"]["code"], "1465011");
        assert_eq!(json["locality"]["match_kind"], "exact");
        assert_eq!(json["record"]["postal_code"], "00-001");
        assert_eq!(json["as_of"], "2025-06-01");
    }

    struct FailingRegistry;

    #[async_trait]
    impl RegistryAdapter for FailingRegistry {
        fn backend(&self) -> &'static str {
            "failing"
        }

        async fn list_voivodeships(
            &self,
            _as_of: NaiveDate,
        ) -> Result<Vec<AdministrativeUnit>, RegistryError> {
            Err(RegistryError::unavailable("failing", "connection refused"))
        }

        async fn list_counties(
            &self,
            _voivodeship: &str,
            _as_of: NaiveDate,
        ) -> Result<Vec<AdministrativeUnit>, RegistryError> {
            unreachable!()
        }

        async fn list_municipalities(
            &self,
            _voivodeship: &str,
            _county: &str,
            _as_of: NaiveDate,
        ) -> Result<Vec<AdministrativeUnit>, RegistryError> {
            unreachable!()
        }

        async fn list_localities_in_municipality(
            &self,
            _municipality: &MunicipalityCode,
            _as_of: NaiveDate,
        ) -> Result<Vec<Locality>, RegistryError> {
            unreachable!()
        }

        async fn search_localities_by_name(
            &self,
            _name: &str,
            _as_of: NaiveDate,
        ) -> Result<Vec<Locality>, RegistryError> {
            unreachable!()
        }

        async fn list_streets_for_locality(
            &self,
            _municipality: &MunicipalityCode,
            _locality_code: &str,
            _as_of: NaiveDate,
        ) -> Result<Vec<Street>, RegistryError> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_registry_failure_is_fatal() {
        let service = AddressService::new(
            Arc::new(sample_postal_index()),
            Arc::new(FailingRegistry),
            Arc::new(FixedDate(as_of())),
        );
        let err = service.resolve("00-001", "Warszawa", None).await.unwrap_err();
        assert!(matches!(err, ResolveError::RegistryUnavailable(_)));
    }
}
