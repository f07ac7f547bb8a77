//! TERC, SIMC and ULIC readers.

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use super::{cell, open_table, optional_cell, Columns};
use crate::models::{pad_code, AdministrativeUnit, Locality, Street};
use crate::registry::ReferenceTables;

/// Load the three registry tables and index them.
pub fn load_reference_tables(terc: &Path, simc: &Path, ulic: &Path) -> Result<ReferenceTables> {
    let units = load_terc(terc)?;
    let localities = load_simc(simc)?;
    let streets = load_ulic(ulic)?;
    Ok(ReferenceTables::new(units, localities, streets))
}

/// Load TERC. The unit level follows from which code segments are filled in.
pub fn load_terc(path: &Path) -> Result<Vec<AdministrativeUnit>> {
    info!("Loading TERC from {}", path.display());

    let mut reader = open_table(path)?;
    let columns = Columns::read(&mut reader)?;
    let woj = columns.required("WOJ")?;
    let pow = columns.required("POW")?;
    let gmi = columns.required("GMI")?;
    let rodz = columns.required("RODZ")?;
    let nazwa = columns.required("NAZWA")?;
    let nazwa_dod = columns.optional("NAZWA_DOD");
    let stan_na = columns.optional("STAN_NA");

    let mut units = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("TERC row {}: {}", line + 2, e);
                skipped += 1;
                continue;
            }
        };

        let voivodeship = pad_code(cell(&record, woj), 2);
        let name = cell(&record, nazwa);
        if voivodeship.is_empty() || name.is_empty() {
            warn!("TERC row {}: missing WOJ or NAZWA", line + 2);
            skipped += 1;
            continue;
        }

        let county = pad_code(cell(&record, pow), 2);
        let municipality = pad_code(cell(&record, gmi), 2);
        let mut unit = match (county.is_empty(), municipality.is_empty()) {
            (true, _) => AdministrativeUnit::voivodeship(&voivodeship, name),
            (false, true) => AdministrativeUnit::county(&voivodeship, &county, name),
            (false, false) => {
                let mut unit = AdministrativeUnit::municipality(
                    &voivodeship,
                    &county,
                    &municipality,
                    cell(&record, rodz),
                    name,
                );
                if unit.kind.as_deref() == Some("") {
                    unit.kind = None;
                }
                unit
            }
        };
        unit.kind_name = optional_cell(&record, nazwa_dod).map(String::from);
        unit.valid_as_of = optional_cell(&record, stan_na).map(String::from);
        units.push(unit);
    }

    if skipped > 0 {
        warn!("Skipped {} malformed TERC rows", skipped);
    }
    info!("Loaded {} TERC units", units.len());
    Ok(units)
}

/// Load SIMC.
pub fn load_simc(path: &Path) -> Result<Vec<Locality>> {
    info!("Loading SIMC from {}", path.display());

    let mut reader = open_table(path)?;
    let columns = Columns::read(&mut reader)?;
    let woj = columns.required("WOJ")?;
    let pow = columns.required("POW")?;
    let gmi = columns.required("GMI")?;
    let rodz_gmi = columns.required("RODZ_GMI")?;
    let nazwa = columns.required("NAZWA")?;
    let sym = columns.required("SYM")?;
    let sympod = columns.optional("SYMPOD");
    let stan_na = columns.optional("STAN_NA");

    let mut localities = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("SIMC row {}: {}", line + 2, e);
                skipped += 1;
                continue;
            }
        };

        let code = pad_code(cell(&record, sym), 7);
        let name = cell(&record, nazwa);
        if code.is_empty() || name.is_empty() {
            warn!("SIMC row {}: missing SYM or NAZWA", line + 2);
            skipped += 1;
            continue;
        }

        let municipality_code = format!(
            "{}{}{}{}",
            pad_code(cell(&record, woj), 2),
            pad_code(cell(&record, pow), 2),
            pad_code(cell(&record, gmi), 2),
            cell(&record, rodz_gmi)
        );
        let mut locality = Locality::new(&code, name, &municipality_code);
        locality.parent_code = optional_cell(&record, sympod)
            .map(|s| pad_code(s, 7))
            .filter(|parent| *parent != code);
        locality.valid_as_of = optional_cell(&record, stan_na).map(String::from);
        localities.push(locality);
    }

    if skipped > 0 {
        warn!("Skipped {} malformed SIMC rows", skipped);
    }
    info!("Loaded {} SIMC localities", localities.len());
    Ok(localities)
}

/// Load ULIC. `NAZWA_2` may be absent from the file altogether.
pub fn load_ulic(path: &Path) -> Result<Vec<Street>> {
    info!("Loading ULIC from {}", path.display());

    let mut reader = open_table(path)?;
    let columns = Columns::read(&mut reader)?;
    let woj = columns.required("WOJ")?;
    let pow = columns.required("POW")?;
    let gmi = columns.required("GMI")?;
    let rodz_gmi = columns.required("RODZ_GMI")?;
    let sym = columns.required("SYM")?;
    let sym_ul = columns.required("SYM_UL")?;
    let cecha = columns.required("CECHA")?;
    let nazwa_1 = columns.required("NAZWA_1")?;
    let nazwa_2 = columns.optional("NAZWA_2");
    let stan_na = columns.optional("STAN_NA");
    if nazwa_2.is_none() {
        warn!("ULIC has no NAZWA_2 column, using NAZWA_1 only");
    }

    let mut streets = Vec::new();
    let mut skipped = 0usize;
    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("ULIC row {}: {}", line + 2, e);
                skipped += 1;
                continue;
            }
        };

        let code = pad_code(cell(&record, sym_ul), 5);
        let name_1 = cell(&record, nazwa_1);
        if code.is_empty() || name_1.is_empty() {
            warn!("ULIC row {}: missing SYM_UL or NAZWA_1", line + 2);
            skipped += 1;
            continue;
        }

        streets.push(Street {
            code,
            locality_code: pad_code(cell(&record, sym), 7),
            municipality_code: format!(
                "{}{}{}{}",
                pad_code(cell(&record, woj), 2),
                pad_code(cell(&record, pow), 2),
                pad_code(cell(&record, gmi), 2),
                cell(&record, rodz_gmi)
            ),
            feature_type: cell(&record, cecha).to_string(),
            name_1: name_1.to_string(),
            name_2: optional_cell(&record, nazwa_2).map(String::from),
            valid_as_of: optional_cell(&record, stan_na).map(String::from),
            orphan: false,
        });
    }

    if skipped > 0 {
        warn!("Skipped {} malformed ULIC rows", skipped);
    }
    info!("Loaded {} ULIC streets", streets.len());
    Ok(streets)
}
