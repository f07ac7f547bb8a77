//! Small in-memory registry snapshot and postal index shared by unit tests.
//!
//! Codes follow the live registry where it matters (Warszawa 1465011 /
//! 0918123, the three parts of Zakroczym 1414053..5) and are invented
//! elsewhere.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::models::{AddressRecord, AdministrativeUnit, Locality, PostalCode, Street};
use crate::reference::{clean_locality_name, PostalCodeIndex};
use crate::registry::{ReferenceTables, TableRegistry};

pub(crate) fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn street(code: &str, locality: &str, feature: &str, name_1: &str) -> Street {
    Street {
        code: code.to_string(),
        locality_code: locality.to_string(),
        municipality_code: "1465011".to_string(),
        feature_type: feature.to_string(),
        name_1: name_1.to_string(),
        name_2: None,
        valid_as_of: Some("2025-01-01".to_string()),
        orphan: false,
    }
}

pub(crate) fn sample_tables() -> ReferenceTables {
    let units = vec![
        AdministrativeUnit::voivodeship("02", "DOLNOŚLĄSKIE"),
        AdministrativeUnit::voivodeship("14", "MAZOWIECKIE"),
        AdministrativeUnit::county("02", "01", "bolesławiecki"),
        AdministrativeUnit::county("14", "14", "nowodworski"),
        AdministrativeUnit::county("14", "65", "Warszawa"),
        AdministrativeUnit::municipality("02", "01", "01", "1", "Bolesławiec"),
        AdministrativeUnit::municipality("02", "01", "02", "2", "Bolesławiec"),
        AdministrativeUnit::municipality("02", "01", "03", "2", "Osiecznica"),
        AdministrativeUnit::municipality("02", "01", "04", "2", "Warta Bolesławiecka"),
        AdministrativeUnit::municipality("02", "01", "05", "5", "Nowogrodziec"),
        AdministrativeUnit::municipality("14", "14", "01", "1", "Nowy Dwór Mazowiecki"),
        AdministrativeUnit::municipality("14", "14", "05", "3", "Zakroczym"),
        AdministrativeUnit::municipality("14", "14", "05", "4", "Zakroczym"),
        AdministrativeUnit::municipality("14", "14", "05", "5", "Zakroczym"),
        AdministrativeUnit::municipality("14", "65", "01", "1", "Warszawa"),
    ];

    let localities = vec![
        Locality::new("0918123", "Warszawa", "1465011"),
        Locality::new("0577000", "Zakroczym", "1414054"),
        Locality::new("0578123", "Wólka Pietrusza Wola", "1414055"),
        Locality::new("0630000", "Nowy Dwór Mazowiecki", "1414011"),
        Locality::new("0935000", "Bolesławiec", "0201011"),
        Locality::new("0999999", "Kruszyn", "0201055"),
        Locality::new("0870001", "Kruszyn", "0201022"),
        Locality::new("0870010", "Kolonia", "0201022"),
        Locality::new("0870011", "Kolonia", "0201022"),
        Locality::new("0870002", "Kliczków", "0201032"),
    ];

    let streets = vec![
        street("11111", "0918123", "ul.", "Kwiatowa"),
        street("11112", "0918123", "ul.", "Kwiatowa Boczna"),
        street("22222", "0918123", "ul.", "Marszałkowska"),
        street("33333", "0918123", "pl.", "Bankowy"),
        street("33334", "0918123", "pl.", "Bankowy"),
        street("44444", "0000001", "ul.", "Zagubiona"),
    ];

    ReferenceTables::new(units, localities, streets)
}

pub(crate) fn sample_registry() -> TableRegistry {
    TableRegistry::new(Arc::new(sample_tables()))
}

fn postal_row(
    code: &str,
    locality: &str,
    municipality: &str,
    county: &str,
    voivodeship: &str,
) -> AddressRecord {
    AddressRecord {
        postal_code: PostalCode::parse(code).unwrap(),
        locality: clean_locality_name(locality),
        raw_locality: locality.to_string(),
        voivodeship: voivodeship.to_string(),
        county: county.to_string(),
        municipality: municipality.to_string(),
        street: None,
        numbers: None,
    }
}

pub(crate) fn sample_postal_index() -> PostalCodeIndex {
    PostalCodeIndex::from_records(vec![
        postal_row("00-001", "Warszawa", "Warszawa", "Warszawa", "mazowieckie"),
        postal_row(
            "59-720",
            "Atlantyda",
            "Warta Bolesławiecka",
            "bolesławiecki",
            "dolnośląskie",
        ),
        postal_row("05-170", "Zakroczym", "Zakroczym", "nowodworski", "mazowieckie"),
        postal_row(
            "05-170",
            "Wólka (Wólka Pietrusza Wola)",
            "gm. Zakroczym",
            "nowodworski",
            "mazowieckie",
        ),
        postal_row("05-170", "Zakroczym", "Zakroczym", "nowodworski", "mazowieckie"),
        postal_row("59-700", "Kliczków", "Bolesławiec", "bolesławiecki", "dolnośląskie"),
        postal_row("64-999", "Pustkowie", "", "", "wielkopolskie"),
    ])
}
