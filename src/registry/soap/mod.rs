//! Registry adapter over the TERYT web service (TerytWs1, SOAP 1.1).

mod envelope;
mod transport;

pub use envelope::SoapCredentials;
pub use transport::{HttpTransport, SoapTransport};

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{debug, warn};

use self::envelope::{build_envelope, parse_records, EnvelopeError, Record};
use super::RegistryAdapter;
use crate::error::RegistryError;
use crate::models::{pad_code, AdministrativeUnit, Locality, MunicipalityCode, Street};

const BACKEND: &str = "soap";

/// Fault messages the service uses to say a locality has no streets.
const NO_STREETS_FAULTS: &[&str] = &["nie znaleziono ulic", "brak danych", "nie istnieje"];

/// [`RegistryAdapter`] backed by the TERYT SOAP service.
pub struct SoapRegistry<T = HttpTransport> {
    transport: T,
    credentials: Option<SoapCredentials>,
}

impl<T: SoapTransport> SoapRegistry<T> {
    pub fn new(transport: T, credentials: Option<SoapCredentials>) -> Self {
        Self {
            transport,
            credentials,
        }
    }

    async fn call(
        &self,
        operation: &str,
        params: &[(&str, String)],
    ) -> Result<String, RegistryError> {
        let envelope = build_envelope(operation, params, self.credentials.as_ref());
        self.transport.call(operation, envelope).await
    }

    async fn fetch_list(
        &self,
        operation: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<Record>, RegistryError> {
        let body = self.call(operation, params).await?;
        let records = parse_records(&body, operation).map_err(|e| {
            warn!("{} failed: {}", operation, e);
            RegistryError::unavailable(BACKEND, e)
        })?;
        debug!("{} returned {} records", operation, records.len());
        Ok(records)
    }
}

fn date_param(as_of: NaiveDate) -> String {
    as_of.format("%Y-%m-%d").to_string()
}

fn field<'a>(record: &'a Record, name: &str) -> Option<&'a str> {
    record
        .get(name)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn unit_from_record(record: &Record) -> AdministrativeUnit {
    let segment = |name: &str, width: usize| field(record, name).map(|s| pad_code(s, width));
    let name = field(record, "nazwa").unwrap_or_default();
    let voivodeship = segment("woj", 2).unwrap_or_default();

    let mut unit = match (segment("pow", 2), segment("gmi", 2)) {
        (Some(county), Some(municipality)) => AdministrativeUnit::municipality(
            &voivodeship,
            &county,
            &municipality,
            field(record, "rodz").unwrap_or_default(),
            name,
        ),
        (Some(county), None) => AdministrativeUnit::county(&voivodeship, &county, name),
        _ => AdministrativeUnit::voivodeship(&voivodeship, name),
    };
    if unit.kind.as_deref() == Some("") {
        unit.kind = None;
    }
    unit.kind_name = field(record, "nazwa_dod").map(String::from);
    unit.valid_as_of = field(record, "stan_na").map(String::from);
    unit
}

fn is_no_streets_fault(message: &str) -> bool {
    let message = message.to_lowercase();
    NO_STREETS_FAULTS.iter().any(|m| message.contains(m))
}

#[async_trait]
impl<T: SoapTransport> RegistryAdapter for SoapRegistry<T> {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn list_voivodeships(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<AdministrativeUnit>, RegistryError> {
        let records = self
            .fetch_list("PobierzListeWojewodztw", &[("DataStanu", date_param(as_of))])
            .await?;
        Ok(records.iter().map(unit_from_record).collect())
    }

    async fn list_counties(
        &self,
        voivodeship: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<AdministrativeUnit>, RegistryError> {
        let records = self
            .fetch_list(
                "PobierzListePowiatow",
                &[
                    ("Woj", voivodeship.to_string()),
                    ("DataStanu", date_param(as_of)),
                ],
            )
            .await?;
        Ok(records.iter().map(unit_from_record).collect())
    }

    async fn list_municipalities(
        &self,
        voivodeship: &str,
        county: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<AdministrativeUnit>, RegistryError> {
        let records = self
            .fetch_list(
                "PobierzListeGmin",
                &[
                    ("Woj", voivodeship.to_string()),
                    ("Pow", county.to_string()),
                    ("DataStanu", date_param(as_of)),
                ],
            )
            .await?;
        Ok(records.iter().map(unit_from_record).collect())
    }

    async fn list_localities_in_municipality(
        &self,
        municipality: &MunicipalityCode,
        as_of: NaiveDate,
    ) -> Result<Vec<Locality>, RegistryError> {
        let records = self
            .fetch_list(
                "PobierzListeMiejscowosciWGminie",
                &[
                    ("Wojewodztwo", municipality.voivodeship.clone()),
                    ("Powiat", municipality.county.clone()),
                    ("Gmina", municipality.municipality.clone()),
                    ("DataStanu", date_param(as_of)),
                ],
            )
            .await?;

        // The response carries no parent codes; they are the ones we asked for
        let municipality_code = municipality.to_string();
        Ok(records
            .iter()
            .filter_map(|r| {
                let code = field(r, "symbol")?;
                let name = field(r, "nazwa")?;
                Some(Locality::new(&pad_code(code, 7), name, &municipality_code))
            })
            .collect())
    }

    async fn search_localities_by_name(
        &self,
        name: &str,
        _as_of: NaiveDate,
    ) -> Result<Vec<Locality>, RegistryError> {
        let records = self
            .fetch_list(
                "WyszukajMiejscowosc",
                &[("nazwaMiejscowosci", name.to_string())],
            )
            .await?;

        Ok(records
            .iter()
            .filter_map(|r| {
                let code = field(r, "symbol")?;
                let name = field(r, "nazwa")?;
                let municipality_code = format!(
                    "{}{}{}{}",
                    pad_code(field(r, "wojsymbol").unwrap_or_default(), 2),
                    pad_code(field(r, "powsymbol").unwrap_or_default(), 2),
                    pad_code(field(r, "gmisymbol").unwrap_or_default(), 2),
                    field(r, "gmirodzaj").unwrap_or_default(),
                );
                Some(Locality::new(&pad_code(code, 7), name, &municipality_code))
            })
            .collect())
    }

    async fn list_streets_for_locality(
        &self,
        municipality: &MunicipalityCode,
        locality_code: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<Street>, RegistryError> {
        let operation = "PobierzListeUlicDlaMiejscowosci";
        let params = [
            ("woj", municipality.voivodeship.clone()),
            ("pow", municipality.county.clone()),
            ("gmi", municipality.municipality.clone()),
            ("rodzaj", municipality.kind.clone()),
            ("msc", locality_code.to_string()),
            ("czyWersjaUrzedowa", "false".to_string()),
            ("czyWersjaAdresowa", "true".to_string()),
            ("DataStanu", date_param(as_of)),
        ];

        let body = self.call(operation, &params).await?;
        let records = match parse_records(&body, operation) {
            Ok(records) => records,
            Err(EnvelopeError::Fault(message)) if is_no_streets_fault(&message) => {
                debug!("No streets for locality {}: {}", locality_code, message);
                return Err(RegistryError::NoStreetsFound {
                    locality: locality_code.to_string(),
                });
            }
            Err(e) => {
                warn!("{} failed: {}", operation, e);
                return Err(RegistryError::unavailable(BACKEND, e));
            }
        };

        let municipality_code = municipality.to_string();
        let mut seen = HashSet::new();
        let mut streets = Vec::with_capacity(records.len());
        for record in &records {
            let Some(id) = field(record, "identyfikator") else {
                continue;
            };
            if !seen.insert(id.to_string()) {
                continue;
            }
            let Some(name_1) = field(record, "nazwa1") else {
                continue;
            };
            let code = field(record, "symbol").unwrap_or_default();
            streets.push(Street {
                code: pad_code(code, 5),
                locality_code: locality_code.to_string(),
                municipality_code: municipality_code.clone(),
                feature_type: field(record, "cecha").unwrap_or_default().to_string(),
                name_1: name_1.to_string(),
                name_2: field(record, "nazwa2").map(String::from),
                valid_as_of: None,
                orphan: false,
            });
        }
        Ok(streets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Replays canned response bodies per operation and records requests.
    #[derive(Default)]
    struct FakeTransport {
        responses: HashMap<String, Result<String, RegistryError>>,
        requests: Mutex<Vec<(String, String)>>,
    }

    impl FakeTransport {
        fn respond(mut self, operation: &str, inner: &str) -> Self {
            let body = format!(
                r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><{op}Response xmlns="http://tempuri.org/"><{op}Result xmlns:a="http://terytws1.stat.gov.pl/DTO">{inner}</{op}Result></{op}Response></s:Body></s:Envelope>"#,
                op = operation,
                inner = inner
            );
            self.responses.insert(operation.to_string(), Ok(body));
            self
        }

        fn fault(mut self, operation: &str, message: &str) -> Self {
            let body = format!(
                r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>{}</faultstring></s:Fault></s:Body></s:Envelope>"#,
                message
            );
            self.responses.insert(operation.to_string(), Ok(body));
            self
        }
    }

    #[async_trait]
    impl SoapTransport for FakeTransport {
        async fn call(&self, operation: &str, envelope: String) -> Result<String, RegistryError> {
            self.requests
                .lock()
                .unwrap()
                .push((operation.to_string(), envelope));
            self.responses
                .get(operation)
                .cloned()
                .unwrap_or_else(|| Err(RegistryError::unavailable("fake", "no response")))
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn warszawa() -> MunicipalityCode {
        "1465011".parse().unwrap()
    }

    #[tokio::test]
    async fn test_municipalities_from_records() {
        let transport = FakeTransport::default().respond(
            "PobierzListeGmin",
            r#"<a:JednostkaTerytorialna><a:GMI>5</a:GMI><a:NAZWA>Zakroczym</a:NAZWA><a:NAZWA_DOD>gmina miejsko-wiejska</a:NAZWA_DOD><a:POW>14</a:POW><a:RODZ>3</a:RODZ><a:STAN_NA>2025-01-01</a:STAN_NA><a:WOJ>14</a:WOJ></a:JednostkaTerytorialna>
               <a:JednostkaTerytorialna><a:GMI>05</a:GMI><a:NAZWA>Zakroczym</a:NAZWA><a:POW>14</a:POW><a:RODZ/><a:WOJ>14</a:WOJ></a:JednostkaTerytorialna>"#,
        );
        let registry = SoapRegistry::new(transport, None);
        let units = registry
            .list_municipalities("14", "14", as_of())
            .await
            .unwrap();

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].code().unwrap(), "1414053");
        assert_eq!(units[0].kind_name.as_deref(), Some("gmina miejsko-wiejska"));
        assert!(!units[1].has_numeric_kind());

        let requests = registry.transport.requests.lock().unwrap();
        assert!(requests[0].1.contains("<tem:Pow>14</tem:Pow>"));
        assert!(requests[0].1.contains("<tem:DataStanu>2025-06-01</tem:DataStanu>"));
    }

    #[tokio::test]
    async fn test_search_builds_municipality_code() {
        let transport = FakeTransport::default().respond(
            "WyszukajMiejscowosc",
            r#"<a:Miejscowosc><a:GmiRodzaj>5</a:GmiRodzaj><a:GmiSymbol>05</a:GmiSymbol><a:Nazwa>Wólka Pietrusza Wola</a:Nazwa><a:PowSymbol>14</a:PowSymbol><a:Symbol>0578123</a:Symbol><a:WojSymbol>14</a:WojSymbol></a:Miejscowosc>"#,
        );
        let registry = SoapRegistry::new(transport, None);
        let found = registry
            .search_localities_by_name("Wólka Pietrusza Wola", as_of())
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].municipality_code, "1414055");
        assert_eq!(found[0].kind_hint.as_deref(), Some("5"));
    }

    #[tokio::test]
    async fn test_localities_take_parent_from_request() {
        let transport = FakeTransport::default().respond(
            "PobierzListeMiejscowosciWGminie",
            r#"<a:Miejscowosc><a:Nazwa>Warszawa</a:Nazwa><a:Symbol>918123</a:Symbol></a:Miejscowosc>"#,
        );
        let registry = SoapRegistry::new(transport, None);
        let found = registry
            .list_localities_in_municipality(&warszawa(), as_of())
            .await
            .unwrap();
        assert_eq!(found[0].code, "0918123");
        assert_eq!(found[0].municipality_code, "1465011");
    }

    #[tokio::test]
    async fn test_streets_are_deduplicated() {
        let street = |id: &str, symbol: &str, name: &str| {
            format!(
                "<a:UlicaDrzewo><a:Cecha>ul.</a:Cecha><a:Identyfikator>{}</a:Identyfikator><a:Nazwa1>{}</a:Nazwa1><a:Nazwa2/><a:Symbol>{}</a:Symbol></a:UlicaDrzewo>",
                id, name, symbol
            )
        };
        let inner = [
            street("1", "11111", "Kwiatowa"),
            street("1", "11111", "Kwiatowa"),
            street("2", "2222", "Marszałkowska"),
        ]
        .concat();
        let transport =
            FakeTransport::default().respond("PobierzListeUlicDlaMiejscowosci", &inner);
        let registry = SoapRegistry::new(transport, None);

        let streets = registry
            .list_streets_for_locality(&warszawa(), "0918123", as_of())
            .await
            .unwrap();
        assert_eq!(streets.len(), 2);
        assert_eq!(streets[1].code, "02222");
        assert_eq!(streets[1].full_name(), "ul. Marszałkowska");
        assert!(streets[0].name_2.is_none());
    }

    #[tokio::test]
    async fn test_no_streets_fault() {
        let transport = FakeTransport::default()
            .fault("PobierzListeUlicDlaMiejscowosci", "Nie znaleziono ulic dla miejscowości");
        let registry = SoapRegistry::new(transport, None);
        let err = registry
            .list_streets_for_locality(&warszawa(), "0918123", as_of())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::NoStreetsFound {
                locality: "0918123".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_other_faults_are_unavailable() {
        let transport = FakeTransport::default()
            .fault("PobierzListePowiatow", "Błąd uwierzytelnienia")
            .fault("PobierzListeUlicDlaMiejscowosci", "Błąd serwera");
        let registry = SoapRegistry::new(transport, None);

        let err = registry.list_counties("14", as_of()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Unavailable { .. }));

        let err = registry
            .list_streets_for_locality(&warszawa(), "0918123", as_of())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_is_unavailable() {
        let registry = SoapRegistry::new(FakeTransport::default(), None);
        let err = registry.list_voivodeships(as_of()).await.unwrap_err();
        assert!(matches!(err, RegistryError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_credentials_are_sent() {
        let transport = FakeTransport::default().respond("PobierzListeWojewodztw", "");
        let credentials = SoapCredentials {
            username: "TestPubliczny".to_string(),
            password: "secret".to_string(),
        };
        let registry = SoapRegistry::new(transport, Some(credentials));
        assert!(registry.list_voivodeships(as_of()).await.unwrap().is_empty());

        let requests = registry.transport.requests.lock().unwrap();
        assert!(requests[0].1.contains("<wsse:Username>TestPubliczny</wsse:Username>"));
    }
}
