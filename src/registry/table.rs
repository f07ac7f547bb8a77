//! Registry adapter over an in-memory snapshot of the TERC/SIMC/ULIC tables.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use super::RegistryAdapter;
use crate::error::RegistryError;
use crate::models::{AdminLevel, AdministrativeUnit, Locality, MunicipalityCode, Street};
use crate::normalize::normalize;

/// Read-only snapshot of the reference tables with lookup indexes.
///
/// Built once at startup and shared between queries behind an `Arc`.
#[derive(Debug, Default)]
pub struct ReferenceTables {
    units: Vec<AdministrativeUnit>,
    localities: Vec<Locality>,
    streets: Vec<Street>,
    /// 7-digit municipality code -> locality indices
    localities_by_municipality: HashMap<String, Vec<usize>>,
    /// normalised name -> locality indices
    localities_by_name: HashMap<String, Vec<usize>>,
    /// (municipality code, locality code) -> street indices
    streets_by_locality: HashMap<(String, String), Vec<usize>>,
}

impl ReferenceTables {
    /// Index the tables. Streets whose locality is not in SIMC are kept and
    /// flagged as orphans.
    pub fn new(
        units: Vec<AdministrativeUnit>,
        localities: Vec<Locality>,
        mut streets: Vec<Street>,
    ) -> Self {
        let mut localities_by_municipality: HashMap<String, Vec<usize>> = HashMap::new();
        let mut localities_by_name: HashMap<String, Vec<usize>> = HashMap::new();
        let mut known: HashSet<(&str, &str)> = HashSet::new();

        for (idx, locality) in localities.iter().enumerate() {
            localities_by_municipality
                .entry(locality.municipality_code.clone())
                .or_default()
                .push(idx);
            localities_by_name
                .entry(normalize(&locality.name))
                .or_default()
                .push(idx);
            known.insert((locality.municipality_code.as_str(), locality.code.as_str()));
        }

        let mut orphans = 0usize;
        for street in &mut streets {
            street.orphan = !known.contains(&(
                street.municipality_code.as_str(),
                street.locality_code.as_str(),
            ));
            if street.orphan {
                orphans += 1;
            }
        }

        let mut streets_by_locality: HashMap<(String, String), Vec<usize>> = HashMap::new();
        for (idx, street) in streets.iter().enumerate() {
            streets_by_locality
                .entry((street.municipality_code.clone(), street.locality_code.clone()))
                .or_default()
                .push(idx);
        }

        if orphans > 0 {
            warn!("{} streets reference a locality missing from SIMC", orphans);
        }
        info!(
            "Reference snapshot: {} units, {} localities, {} streets",
            units.len(),
            localities.len(),
            streets.len()
        );

        Self {
            units,
            localities,
            streets,
            localities_by_municipality,
            localities_by_name,
            streets_by_locality,
        }
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn locality_count(&self) -> usize {
        self.localities.len()
    }

    pub fn street_count(&self) -> usize {
        self.streets.len()
    }

    fn units_at(&self, level: AdminLevel) -> impl Iterator<Item = &AdministrativeUnit> {
        self.units.iter().filter(move |u| u.level == level)
    }
}

/// Whether a row stamped `valid_as_of` exists in the registry at `as_of`.
/// Rows without a parseable date are always visible.
fn visible_at(valid_as_of: Option<&str>, as_of: NaiveDate) -> bool {
    valid_as_of
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
        .map_or(true, |date| date <= as_of)
}

/// [`RegistryAdapter`] backed by [`ReferenceTables`].
#[derive(Clone)]
pub struct TableRegistry {
    tables: Arc<ReferenceTables>,
}

impl TableRegistry {
    pub fn new(tables: Arc<ReferenceTables>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }
}

#[async_trait]
impl RegistryAdapter for TableRegistry {
    fn backend(&self) -> &'static str {
        "table"
    }

    async fn list_voivodeships(
        &self,
        as_of: NaiveDate,
    ) -> Result<Vec<AdministrativeUnit>, RegistryError> {
        Ok(self
            .tables
            .units_at(AdminLevel::Voivodeship)
            .filter(|u| visible_at(u.valid_as_of.as_deref(), as_of))
            .cloned()
            .collect())
    }

    async fn list_counties(
        &self,
        voivodeship: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<AdministrativeUnit>, RegistryError> {
        Ok(self
            .tables
            .units_at(AdminLevel::County)
            .filter(|u| u.voivodeship == voivodeship)
            .filter(|u| visible_at(u.valid_as_of.as_deref(), as_of))
            .cloned()
            .collect())
    }

    async fn list_municipalities(
        &self,
        voivodeship: &str,
        county: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<AdministrativeUnit>, RegistryError> {
        Ok(self
            .tables
            .units_at(AdminLevel::Municipality)
            .filter(|u| u.voivodeship == voivodeship && u.county.as_deref() == Some(county))
            .filter(|u| visible_at(u.valid_as_of.as_deref(), as_of))
            .cloned()
            .collect())
    }

    async fn list_localities_in_municipality(
        &self,
        municipality: &MunicipalityCode,
        as_of: NaiveDate,
    ) -> Result<Vec<Locality>, RegistryError> {
        let tables = &self.tables;
        Ok(tables
            .localities_by_municipality
            .get(&municipality.to_string())
            .into_iter()
            .flatten()
            .map(|&idx| &tables.localities[idx])
            .filter(|l| visible_at(l.valid_as_of.as_deref(), as_of))
            .cloned()
            .collect())
    }

    async fn search_localities_by_name(
        &self,
        name: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<Locality>, RegistryError> {
        let tables = &self.tables;
        Ok(tables
            .localities_by_name
            .get(&normalize(name))
            .into_iter()
            .flatten()
            .map(|&idx| &tables.localities[idx])
            .filter(|l| visible_at(l.valid_as_of.as_deref(), as_of))
            .cloned()
            .collect())
    }

    async fn list_streets_for_locality(
        &self,
        municipality: &MunicipalityCode,
        locality_code: &str,
        as_of: NaiveDate,
    ) -> Result<Vec<Street>, RegistryError> {
        let tables = &self.tables;
        let key = (municipality.to_string(), locality_code.to_string());
        Ok(tables
            .streets_by_locality
            .get(&key)
            .into_iter()
            .flatten()
            .map(|&idx| &tables.streets[idx])
            .filter(|s| visible_at(s.valid_as_of.as_deref(), as_of))
            .cloned()
            .collect())
    }
}
