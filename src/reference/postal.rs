//! Postal-code reference table (PNA).

use anyhow::Result;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::LazyLock;
use tracing::{info, warn};

use super::{cell, open_table, optional_cell, Columns};
use crate::error::ResolveError;
use crate::models::{AddressRecord, PostalCode};
use crate::normalize::normalize;

static PARENTHESISED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((.*?)\)").expect("parenthesised name pattern"));

/// The locality name a postal row refers to: the parenthesised part of
/// MIEJSCOWOŚĆ when present, else the whole value.
///
/// "Wólka (Wólka Pietrusza Wola)" names the locality "Wólka Pietrusza Wola".
pub fn clean_locality_name(raw: &str) -> String {
    PARENTHESISED_NAME
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| raw.trim())
        .to_string()
}

/// Postal-code rows grouped by code, in file order.
#[derive(Debug, Default)]
pub struct PostalCodeIndex {
    by_code: HashMap<PostalCode, Vec<AddressRecord>>,
    rows: usize,
}

impl PostalCodeIndex {
    pub fn from_records(records: impl IntoIterator<Item = AddressRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index
                .by_code
                .entry(record.postal_code.clone())
                .or_default()
                .push(record);
            index.rows += 1;
        }
        index
    }

    /// Load `PNA;MIEJSCOWOŚĆ;ULICA;NUMERY;GMINA;POWIAT;WOJEWÓDZTWO`.
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading postal codes from {}", path.display());

        let mut reader = open_table(path)?;
        let columns = Columns::read(&mut reader)?;
        let pna = columns.required("PNA")?;
        let miejscowosc = columns.required("MIEJSCOWOŚĆ")?;
        let gmina = columns.required("GMINA")?;
        let powiat = columns.required("POWIAT")?;
        let wojewodztwo = columns.required("WOJEWÓDZTWO")?;
        let ulica = columns.optional("ULICA");
        let numery = columns.optional("NUMERY");

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for (line, result) in reader.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!("Postal row {}: {}", line + 2, e);
                    skipped += 1;
                    continue;
                }
            };

            let Ok(postal_code) = PostalCode::parse(cell(&record, pna)) else {
                warn!(
                    "Postal row {}: invalid postal code '{}'",
                    line + 2,
                    cell(&record, pna)
                );
                skipped += 1;
                continue;
            };
            let raw_locality = cell(&record, miejscowosc);
            if raw_locality.is_empty() {
                skipped += 1;
                continue;
            }

            records.push(AddressRecord {
                postal_code,
                locality: clean_locality_name(raw_locality),
                raw_locality: raw_locality.to_string(),
                voivodeship: cell(&record, wojewodztwo).to_string(),
                county: cell(&record, powiat).to_string(),
                municipality: cell(&record, gmina).to_string(),
                street: optional_cell(&record, ulica).map(String::from),
                numbers: optional_cell(&record, numery).map(String::from),
            });
        }

        if skipped > 0 {
            warn!("Skipped {} malformed postal rows", skipped);
        }
        let index = Self::from_records(records);
        info!(
            "Loaded {} postal rows for {} postal codes",
            index.rows,
            index.by_code.len()
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// All rows for a postal code, in file order.
    pub fn lookup_by_postal_code(&self, postal_code: &PostalCode) -> &[AddressRecord] {
        self.by_code
            .get(postal_code)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Sorted, de-duplicated clean locality names served by a postal code.
    pub fn localities_for_postal_code(&self, postal_code: &PostalCode) -> Vec<String> {
        self.lookup_by_postal_code(postal_code)
            .iter()
            .map(|r| r.locality.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Pick the row for `locality` under `postal_code`.
    ///
    /// Without a locality the row is picked only when the postal code serves
    /// a single locality. Names are compared normalised; the first matching
    /// row wins.
    pub fn select_record(
        &self,
        postal_code: &str,
        locality: Option<&str>,
    ) -> Result<&AddressRecord, ResolveError> {
        let code = PostalCode::parse(postal_code)?;
        let rows = self.lookup_by_postal_code(&code);
        if rows.is_empty() {
            return Err(ResolveError::PostalCodeNotFound(code.to_string()));
        }

        let record = match locality.map(str::trim).filter(|l| !l.is_empty()) {
            Some(wanted) => {
                let wanted_key = normalize(&clean_locality_name(wanted));
                rows.iter()
                    .find(|r| normalize(&r.locality) == wanted_key)
                    .ok_or_else(|| ResolveError::LocalityNotInPostalCode {
                        postal_code: code.to_string(),
                        locality: wanted.to_string(),
                        available: self.localities_for_postal_code(&code),
                    })?
            }
            None => {
                let available = self.localities_for_postal_code(&code);
                if available.len() > 1 {
                    return Err(ResolveError::AmbiguousLocality {
                        postal_code: code.to_string(),
                        available,
                    });
                }
                &rows[0]
            }
        };

        let missing = record.missing_names();
        if !missing.is_empty() {
            return Err(ResolveError::IncompleteRecord {
                postal_code: code.to_string(),
                locality: record.locality.clone(),
                missing,
            });
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_postal_index;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_clean_locality_name() {
        assert_eq!(
            clean_locality_name("Wólka (Wólka Pietrusza Wola)"),
            "Wólka Pietrusza Wola"
        );
        assert_eq!(clean_locality_name(" Warszawa "), "Warszawa");
        assert_eq!(clean_locality_name("Kolonia ()"), "Kolonia ()");
    }

    #[test]
    fn test_load_postal_table() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            "PNA;MIEJSCOWOŚĆ;ULICA;NUMERY;GMINA;POWIAT;WOJEWÓDZTWO\n\
             05-170;Wólka (Wólka Pietrusza Wola);;;Zakroczym;nowodworski;mazowieckie\n\
             00-001;Warszawa;Marszałkowska;1-9(n);Warszawa;Warszawa;mazowieckie\n\
             0000;Nigdzie;;;;;\n"
                .as_bytes(),
        )
        .unwrap();

        let index = PostalCodeIndex::load(file.path()).unwrap();
        assert_eq!(index.len(), 2);

        let code = PostalCode::parse("05-170").unwrap();
        let rows = index.lookup_by_postal_code(&code);
        assert_eq!(rows[0].locality, "Wólka Pietrusza Wola");
        assert_eq!(rows[0].raw_locality, "Wólka (Wólka Pietrusza Wola)");

        let code = PostalCode::parse("00-001").unwrap();
        let row = &index.lookup_by_postal_code(&code)[0];
        assert_eq!(row.street.as_deref(), Some("Marszałkowska"));
        assert_eq!(row.numbers.as_deref(), Some("1-9(n)"));
    }

    #[test]
    fn test_localities_sorted_and_unique() {
        let index = sample_postal_index();
        let code = PostalCode::parse("05-170").unwrap();
        assert_eq!(
            index.localities_for_postal_code(&code),
            vec!["Wólka Pietrusza Wola".to_string(), "Zakroczym".to_string()]
        );
    }

    #[test]
    fn test_select_record_by_locality() {
        let index = sample_postal_index();
        let record = index.select_record("05-170", Some("wólka pietrusza wola")).unwrap();
        assert_eq!(record.municipality, "gm. Zakroczym");

        let record = index
            .select_record("05-170", Some("Wólka (Wólka Pietrusza Wola)"))
            .unwrap();
        assert_eq!(record.locality, "Wólka Pietrusza Wola");
    }

    #[test]
    fn test_select_record_errors() {
        let index = sample_postal_index();

        assert!(matches!(
            index.select_record("00001", Some("Warszawa")),
            Err(ResolveError::InvalidPostalCode(_))
        ));
        assert!(matches!(
            index.select_record("99-999", Some("Warszawa")),
            Err(ResolveError::PostalCodeNotFound(_))
        ));
        match index.select_record("00-001", Some("Kraków")) {
            Err(ResolveError::LocalityNotInPostalCode { available, .. }) => {
                assert_eq!(available, vec!["Warszawa".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            index.select_record("05-170", None),
            Err(ResolveError::AmbiguousLocality { .. })
        ));
    }

    #[test]
    fn test_select_single_locality_without_name() {
        let index = sample_postal_index();
        let record = index.select_record("00-001", None).unwrap();
        assert_eq!(record.locality, "Warszawa");
    }

    #[test]
    fn test_incomplete_record() {
        let index = sample_postal_index();
        match index.select_record("64-999", Some("Pustkowie")) {
            Err(ResolveError::IncompleteRecord { missing, .. }) => {
                assert_eq!(missing, vec!["county", "municipality"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
