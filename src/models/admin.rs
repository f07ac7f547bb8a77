//! Administrative hierarchy types (TERC).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// TERC hierarchy level of an administrative unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AdminLevel {
    /// Województwo (2-digit code)
    Voivodeship,
    /// Powiat (4-digit code)
    County,
    /// Gmina (7-digit code including the kind digit)
    Municipality,
}

impl AdminLevel {
    /// Get all levels in hierarchical order (voivodeship first)
    pub fn all() -> &'static [AdminLevel] {
        &[
            AdminLevel::Voivodeship,
            AdminLevel::County,
            AdminLevel::Municipality,
        ]
    }

    /// Width of the full code at this level
    pub fn code_width(&self) -> usize {
        match self {
            AdminLevel::Voivodeship => 2,
            AdminLevel::County => 4,
            AdminLevel::Municipality => 7,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            AdminLevel::Voivodeship => Stage::Voivodeship,
            AdminLevel::County => Stage::County,
            AdminLevel::Municipality => Stage::Municipality,
        }
    }
}

/// Resolution stage, in the strict order the resolver walks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Voivodeship,
    County,
    Municipality,
    Locality,
    Street,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Voivodeship => "voivodeship",
            Stage::County => "county",
            Stage::Municipality => "municipality",
            Stage::Locality => "locality",
            Stage::Street => "street",
        };
        f.write_str(name)
    }
}

/// A candidate matched by name whose code field is missing or not numeric.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed {stage} code '{raw}'")]
pub struct MalformedCode {
    pub stage: Stage,
    pub raw: String,
}

/// Check that `raw` is exactly `width` ASCII digits.
pub fn is_code(raw: &str, width: usize) -> bool {
    raw.len() == width && raw.bytes().all(|b| b.is_ascii_digit())
}

/// Zero-pad a numeric code segment to `width`.
///
/// Non-numeric or over-long input is returned trimmed but otherwise untouched
/// so that the resolver can report it as malformed.
pub fn pad_code(raw: &str, width: usize) -> String {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.len() <= width && trimmed.bytes().all(|b| b.is_ascii_digit())
    {
        format!("{:0>width$}", trimmed, width = width)
    } else {
        trimmed.to_string()
    }
}

/// A TERC unit at any level, as returned by a registry adapter.
///
/// Code segments are kept separately; the parent prefix of a unit is implied
/// by its leading segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdministrativeUnit {
    pub level: AdminLevel,

    /// WOJ
    pub voivodeship: String,

    /// POW
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,

    /// GMI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,

    /// RODZ: 1 urban, 2 rural, 3 urban-rural, 4/5 town/rural part of an
    /// urban-rural municipality, 8/9 districts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Registry name (NAZWA)
    pub name: String,

    /// Additional name, e.g. "gmina miejsko-wiejska" (NAZWA_DOD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind_name: Option<String>,

    /// STAN_NA
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_as_of: Option<String>,
}

impl AdministrativeUnit {
    pub fn voivodeship(code: &str, name: &str) -> Self {
        Self {
            level: AdminLevel::Voivodeship,
            voivodeship: code.to_string(),
            county: None,
            municipality: None,
            kind: None,
            name: name.to_string(),
            kind_name: None,
            valid_as_of: None,
        }
    }

    pub fn county(voivodeship: &str, county: &str, name: &str) -> Self {
        Self {
            level: AdminLevel::County,
            county: Some(county.to_string()),
            ..Self::voivodeship(voivodeship, name)
        }
    }

    pub fn municipality(
        voivodeship: &str,
        county: &str,
        municipality: &str,
        kind: &str,
        name: &str,
    ) -> Self {
        Self {
            level: AdminLevel::Municipality,
            municipality: Some(municipality.to_string()),
            kind: Some(kind.to_string()),
            ..Self::county(voivodeship, county, name)
        }
    }

    /// Whether the unit carries a usable single-digit kind.
    pub fn has_numeric_kind(&self) -> bool {
        self.kind.as_deref().is_some_and(|k| is_code(k, 1))
    }

    /// Full hierarchical code for this unit's level, validated.
    pub fn code(&self) -> Result<String, MalformedCode> {
        let segments: Vec<(Option<&str>, usize)> = match self.level {
            AdminLevel::Voivodeship => vec![(Some(self.voivodeship.as_str()), 2)],
            AdminLevel::County => vec![
                (Some(self.voivodeship.as_str()), 2),
                (self.county.as_deref(), 2),
            ],
            AdminLevel::Municipality => vec![
                (Some(self.voivodeship.as_str()), 2),
                (self.county.as_deref(), 2),
                (self.municipality.as_deref(), 2),
                (self.kind.as_deref(), 1),
            ],
        };

        let mut code = String::with_capacity(self.level.code_width());
        for (segment, width) in segments {
            match segment {
                Some(s) if is_code(s, width) => code.push_str(s),
                _ => {
                    return Err(MalformedCode {
                        stage: self.level.stage(),
                        raw: self.raw_code(),
                    })
                }
            }
        }
        Ok(code)
    }

    /// Concatenated code segments without validation (for diagnostics).
    pub fn raw_code(&self) -> String {
        [
            Some(self.voivodeship.as_str()),
            self.county.as_deref(),
            self.municipality.as_deref(),
            self.kind.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("")
    }
}

/// A validated 7-digit municipality code: WOJ + POW + GMI + RODZ.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MunicipalityCode {
    pub voivodeship: String,
    pub county: String,
    pub municipality: String,
    pub kind: String,
}

impl MunicipalityCode {
    /// The 4-digit county prefix.
    pub fn county_code(&self) -> String {
        format!("{}{}", self.voivodeship, self.county)
    }
}

impl fmt::Display for MunicipalityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            self.voivodeship, self.county, self.municipality, self.kind
        )
    }
}

impl FromStr for MunicipalityCode {
    type Err = MalformedCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_code(s, 7) {
            return Err(MalformedCode {
                stage: Stage::Municipality,
                raw: s.to_string(),
            });
        }
        Ok(Self {
            voivodeship: s[0..2].to_string(),
            county: s[2..4].to_string(),
            municipality: s[4..6].to_string(),
            kind: s[6..7].to_string(),
        })
    }
}

impl TryFrom<&AdministrativeUnit> for MunicipalityCode {
    type Error = MalformedCode;

    fn try_from(unit: &AdministrativeUnit) -> Result<Self, Self::Error> {
        if unit.level != AdminLevel::Municipality {
            return Err(MalformedCode {
                stage: Stage::Municipality,
                raw: unit.raw_code(),
            });
        }
        unit.code()?.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_code() {
        assert_eq!(pad_code("2", 2), "02");
        assert_eq!(pad_code(" 14 ", 2), "14");
        assert_eq!(pad_code("x1", 2), "x1");
        assert_eq!(pad_code("123", 2), "123");
        assert_eq!(pad_code("", 2), "");
    }

    #[test]
    fn test_municipality_code_concatenates_segments() {
        let unit = AdministrativeUnit::municipality("14", "65", "01", "1", "Warszawa");
        assert_eq!(unit.code().unwrap(), "1465011");

        let code = MunicipalityCode::try_from(&unit).unwrap();
        assert_eq!(code.county_code(), "1465");
        assert_eq!(code.to_string(), "1465011");
    }

    #[test]
    fn test_missing_kind_is_malformed() {
        let mut unit = AdministrativeUnit::municipality("14", "65", "01", "1", "Warszawa");
        unit.kind = None;
        let err = unit.code().unwrap_err();
        assert_eq!(err.stage, Stage::Municipality);
        assert_eq!(err.raw, "146501");
        assert!(!unit.has_numeric_kind());
    }

    #[test]
    fn test_non_numeric_county_is_malformed() {
        let unit = AdministrativeUnit::county("14", "6X", "Warszawa");
        assert!(unit.code().is_err());
    }

    #[test]
    fn test_parse_municipality_code() {
        let code: MunicipalityCode = "1414054".parse().unwrap();
        assert_eq!(code.kind, "4");
        assert!("141405".parse::<MunicipalityCode>().is_err());
    }
}
